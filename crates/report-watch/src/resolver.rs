//! Report Type ID discovery from the companion product page.
//!
//! Two strategies run in order and the first hit wins:
//!
//! 1. **Structured**: find the text node carrying the label, then take the
//!    next `<span>` after it in document order.
//! 2. **Pattern**: match `Report Type ID: <digits>` against the rendered
//!    page text.
//!
//! The identifier is numeric, so a structured hit that is not a digit run
//! (an unrelated span further down the page) falls through to the pattern.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::transport::Transport;
use crate::types::{FetchError, FetchResult, ParameterSource, ResolvedParameter};

/// Label preceding the identifier on the product page. Case-sensitive.
pub const REPORT_TYPE_LABEL: &str = "Report Type ID";

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Report Type ID\s*:\s*(\d+)").expect("label pattern is valid")
    })
}

/// Extract the Report Type ID from a page's HTML or plain text.
pub fn resolve(page: &str) -> FetchResult<ResolvedParameter> {
    let document = Html::parse_document(page);

    if let Some(id) = structured_lookup(&document) {
        tracing::info!("Found Report Type ID {id} via {}", ParameterSource::Structured);
        return Ok(ResolvedParameter::new(id, ParameterSource::Structured));
    }

    let text: String = document.root_element().text().collect();
    if let Some(id) = pattern_lookup(&text) {
        tracing::info!("Found Report Type ID {id} via {}", ParameterSource::Pattern);
        return Ok(ResolvedParameter::new(id, ParameterSource::Pattern));
    }

    tracing::warn!("Report Type ID label not found in {} bytes of page text", page.len());
    Err(FetchError::ParameterNotFound)
}

/// Fetch the discovery page and resolve the identifier from it.
pub fn fetch_and_resolve<T: Transport>(
    transport: &T,
    discovery_url: &str,
) -> FetchResult<ResolvedParameter> {
    tracing::debug!("Fetching discovery page {discovery_url}");
    let page = transport.get_text(discovery_url)?;
    resolve(&page)
}

fn structured_lookup(document: &Html) -> Option<String> {
    let mut nodes = document.tree.root().descendants();

    let labelled = nodes.by_ref().any(|node| {
        node.value()
            .as_text()
            .is_some_and(|text| text.contains(REPORT_TYPE_LABEL))
    });
    if !labelled {
        return None;
    }

    let span = nodes.find_map(|node| ElementRef::wrap(node).filter(|el| el.value().name() == "span"))?;
    let candidate = span.text().collect::<String>().trim().to_string();

    if is_numeric_id(&candidate) {
        Some(candidate)
    } else {
        tracing::debug!("Span after label is not an identifier: {candidate:?}");
        None
    }
}

fn pattern_lookup(text: &str) -> Option<String> {
    label_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
