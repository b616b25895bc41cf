//! Discover a report's lookup id, read its document catalog, and download
//! each new publication exactly once.

pub mod catalog;
pub mod config;
pub mod lock;
pub mod orchestrator;
pub mod resolver;
pub mod state;
pub mod transport;
pub mod types;

pub use catalog::{parse_catalog, select_latest, DocumentCatalogClient};
pub use config::{FetchConfig, SelectionPolicy};
pub use lock::RunLock;
pub use orchestrator::{FetchOrchestrator, Outcome, RunStage};
pub use resolver::resolve;
pub use state::{is_newer, PublicationState};
pub use transport::{HttpTransport, Transport, TransportError};
pub use types::*;
