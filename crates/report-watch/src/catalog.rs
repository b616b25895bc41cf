//! Document listing client and latest-entry selection.
//!
//! The listing endpoint answers with
//! `{"ListDocsByRptTypeRes": {"DocumentList": [{"Document": {...}}]}}`.
//! Every field is optional at the parse boundary; the selected entry is then
//! validated into a [`DocumentDescriptor`], so a missing field becomes
//! `MalformedResponse` instead of a lookup panic.

use std::path::Path;

use serde::Deserialize;

use crate::config::{FetchConfig, SelectionPolicy};
use crate::transport::Transport;
use crate::types::{DocId, DocumentDescriptor, FetchError, FetchResult, PublishTimestamp};

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(rename = "ListDocsByRptTypeRes", default)]
    listing: Option<Listing>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(rename = "DocumentList", default)]
    documents: Option<Vec<CatalogEntry>>,
}

/// One element of `DocumentList`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "Document", default)]
    pub document: Option<RawDocument>,
}

/// Document fields as the endpoint sends them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(rename = "Extension", default)]
    pub extension: Option<String>,
    #[serde(rename = "DocID", default)]
    pub doc_id: Option<RawDocId>,
    #[serde(rename = "ConstructedName", default)]
    pub constructed_name: Option<String>,
    #[serde(rename = "PublishDate", default)]
    pub publish_date: Option<String>,
}

/// `DocID` arrives as either a string or a bare number. Anything else is
/// kept as-is and only rejected if that entry is selected.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDocId {
    Text(String),
    Number(u64),
    Other(serde_json::Value),
}

impl RawDocId {
    fn into_doc_id(self) -> Option<DocId> {
        match self {
            RawDocId::Text(s) if !s.trim().is_empty() => Some(DocId(s.trim().to_string())),
            RawDocId::Text(_) => None,
            RawDocId::Number(n) => Some(DocId(n.to_string())),
            RawDocId::Other(_) => None,
        }
    }
}

/// Parse a listing body into its entries, preserving order.
///
/// An absent or empty `DocumentList` is `EmptyCatalog`; a body that is not
/// JSON of the expected shape is `MalformedResponse`.
pub fn parse_catalog(body: &str) -> FetchResult<Vec<CatalogEntry>> {
    let response: CatalogResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("invalid listing JSON: {e}")))?;

    let entries = response
        .listing
        .and_then(|l| l.documents)
        .unwrap_or_default();

    if entries.is_empty() {
        return Err(FetchError::EmptyCatalog { filter: None });
    }
    Ok(entries)
}

/// Pick the document for this run.
///
/// Candidates are entries whose extension matches `extension`
/// (ASCII case-insensitive), or every entry when no filter is given. List
/// order is preserved. `ListOrder` trusts the endpoint's newest-first order;
/// `NewestPublished` validates every candidate and takes the maximum publish
/// timestamp, keeping the earlier entry on ties.
pub fn select_latest(
    entries: &[CatalogEntry],
    extension: Option<&str>,
    policy: SelectionPolicy,
) -> FetchResult<DocumentDescriptor> {
    let candidates: Vec<(usize, &CatalogEntry)> = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| matches_extension(entry, extension))
        .collect();

    let empty = || FetchError::EmptyCatalog {
        filter: extension.map(str::to_string),
    };

    match policy {
        SelectionPolicy::ListOrder => {
            let (index, entry) = candidates.first().ok_or_else(empty)?;
            describe(*index, entry)
        }
        SelectionPolicy::NewestPublished => candidates
            .iter()
            .map(|(index, entry)| describe(*index, entry))
            .collect::<FetchResult<Vec<_>>>()?
            .into_iter()
            .reduce(|best, next| if next.published > best.published { next } else { best })
            .ok_or_else(empty),
    }
}

/// Queries the listing endpoint for one identifier.
pub struct DocumentCatalogClient<'a, T: Transport> {
    transport: &'a T,
    config: &'a FetchConfig,
}

impl<'a, T: Transport> DocumentCatalogClient<'a, T> {
    pub fn new(transport: &'a T, config: &'a FetchConfig) -> Self {
        Self { transport, config }
    }

    /// Fetch the listing once and select the latest matching document.
    pub fn fetch_latest(&self, identifier: &str) -> FetchResult<DocumentDescriptor> {
        let url = self.config.catalog_query_url(identifier);
        tracing::debug!("Fetching catalog {url}");

        let body = self.transport.get_text(&url)?;
        let entries = parse_catalog(&body)?;
        let descriptor = select_latest(
            &entries,
            self.config.extension.as_deref(),
            self.config.selection,
        )?;

        tracing::info!(
            "Latest document: {} (id {}, published {}) from {} entries",
            descriptor.display_name,
            descriptor.id,
            descriptor.published,
            entries.len()
        );
        Ok(descriptor)
    }
}

fn matches_extension(entry: &CatalogEntry, extension: Option<&str>) -> bool {
    let Some(wanted) = extension else {
        return true;
    };
    entry
        .document
        .as_ref()
        .and_then(|doc| doc.extension.as_deref())
        .is_some_and(|ext| ext.trim().eq_ignore_ascii_case(wanted))
}

fn describe(index: usize, entry: &CatalogEntry) -> FetchResult<DocumentDescriptor> {
    let malformed = |what: &str| FetchError::MalformedResponse(format!("entry {index}: {what}"));

    let doc = entry.document.clone().ok_or_else(|| malformed("missing Document"))?;

    let id = match doc.doc_id {
        Some(RawDocId::Other(value)) => {
            return Err(malformed(&format!("DocID {value} is not a document id")));
        }
        raw => raw
            .and_then(RawDocId::into_doc_id)
            .ok_or_else(|| malformed("missing DocID"))?,
    };

    let name = doc
        .constructed_name
        .ok_or_else(|| malformed("missing ConstructedName"))?;
    let display_name = checked_file_name(&name)
        .ok_or_else(|| malformed(&format!("ConstructedName {name:?} is not a plain file name")))?;

    let raw_published = doc
        .publish_date
        .ok_or_else(|| malformed("missing PublishDate"))?;
    let published = PublishTimestamp::parse(&raw_published)
        .ok_or_else(|| malformed(&format!("PublishDate {raw_published:?} is not a timestamp")))?;

    Ok(DocumentDescriptor {
        id,
        display_name,
        extension: doc.extension.map(|e| e.trim().to_string()),
        published,
    })
}

/// The display name becomes a path inside the downloads directory, so it
/// must be a single normal component.
fn checked_file_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return None;
    }
    let is_plain = Path::new(name).file_name().is_some_and(|f| f == name);
    is_plain.then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(docs: serde_json::Value) -> String {
        json!({ "ListDocsByRptTypeRes": { "DocumentList": docs } }).to_string()
    }

    fn doc(ext: &str, id: &str, name: &str, publish: &str) -> serde_json::Value {
        json!({ "Document": {
            "Extension": ext,
            "DocID": id,
            "ConstructedName": name,
            "PublishDate": publish,
        }})
    }

    #[test]
    fn test_select_first_matching_extension() {
        let body = listing(json!([
            doc("xlsx", "B2", "report.xlsx", "2024-01-02T00:00:00-06:00"),
            doc("docx", "A1", "report.docx", "2024-01-01T00:00:00-06:00"),
            doc("docx", "C3", "older.docx", "2023-12-01T00:00:00-06:00"),
        ]));
        let entries = parse_catalog(&body).unwrap();
        let picked = select_latest(&entries, Some("docx"), SelectionPolicy::ListOrder).unwrap();
        assert_eq!(picked.id.as_str(), "A1");
        assert_eq!(picked.display_name, "report.docx");
        assert_eq!(picked.extension.as_deref(), Some("docx"));
        assert_eq!(picked.published.as_str(), "2024-01-01T00:00:00-06:00");
    }

    #[test]
    fn test_docx_before_xlsx() {
        let body = listing(json!([
            doc("docx", "A1", "report.docx", "2024-01-01T00:00:00-06:00"),
            {"Document": {"Extension": "xlsx", "DocID": "B2"}},
        ]));
        let entries = parse_catalog(&body).unwrap();
        let picked = select_latest(&entries, Some("docx"), SelectionPolicy::ListOrder).unwrap();
        assert_eq!(picked.id.as_str(), "A1");
    }

    #[test]
    fn test_no_filter_takes_first_entry() {
        let body = listing(json!([
            doc("xlsx", "B2", "report.xlsx", "2024-01-02T00:00:00-06:00"),
            doc("docx", "A1", "report.docx", "2024-01-01T00:00:00-06:00"),
        ]));
        let entries = parse_catalog(&body).unwrap();
        let picked = select_latest(&entries, None, SelectionPolicy::ListOrder).unwrap();
        assert_eq!(picked.id.as_str(), "B2");
    }

    #[test]
    fn test_extension_match_ignores_case() {
        let body = listing(json!([doc("DOCX", "A1", "r.docx", "2024-01-01T00:00:00Z")]));
        let entries = parse_catalog(&body).unwrap();
        assert!(select_latest(&entries, Some("docx"), SelectionPolicy::ListOrder).is_ok());
    }

    #[test]
    fn test_newest_published_sorts_candidates() {
        let body = listing(json!([
            doc("docx", "OLD", "old.docx", "2024-01-01T00:00:00-06:00"),
            doc("docx", "NEW", "new.docx", "2024-03-01T00:00:00-06:00"),
            doc("docx", "TIE", "tie.docx", "2024-03-01T06:00:00+00:00"),
        ]));
        let entries = parse_catalog(&body).unwrap();

        let first = select_latest(&entries, Some("docx"), SelectionPolicy::ListOrder).unwrap();
        assert_eq!(first.id.as_str(), "OLD");

        let newest =
            select_latest(&entries, Some("docx"), SelectionPolicy::NewestPublished).unwrap();
        assert_eq!(newest.id.as_str(), "NEW");
    }

    #[test]
    fn test_numeric_doc_id() {
        let body = listing(json!([{ "Document": {
            "Extension": "docx",
            "DocID": 1012345678u64,
            "ConstructedName": "matrix.docx",
            "PublishDate": "2024-06-01T10:00:00-05:00",
        }}]));
        let entries = parse_catalog(&body).unwrap();
        let picked = select_latest(&entries, Some("docx"), SelectionPolicy::ListOrder).unwrap();
        assert_eq!(picked.id.as_str(), "1012345678");
    }

    #[test]
    fn test_odd_doc_id_only_fails_when_selected() {
        let body = listing(json!([
            doc("docx", "A1", "matrix.docx", "2024-06-01T10:00:00-05:00"),
            { "Document": {
                "Extension": "docx",
                "DocID": -7,
                "ConstructedName": "negative.docx",
                "PublishDate": "2024-05-01T10:00:00-05:00",
            }},
            { "Document": {
                "Extension": "xlsx",
                "DocID": 1.5,
                "ConstructedName": "float.xlsx",
                "PublishDate": "2024-05-01T10:00:00-05:00",
            }},
        ]));
        let entries = parse_catalog(&body).unwrap();
        let picked = select_latest(&entries, Some("docx"), SelectionPolicy::ListOrder).unwrap();
        assert_eq!(picked.id.as_str(), "A1");

        let err = select_latest(&entries, Some("xlsx"), SelectionPolicy::ListOrder).unwrap_err();
        assert!(
            matches!(err, FetchError::MalformedResponse(ref m) if m.contains("entry 2") && m.contains("1.5")),
            "{err}"
        );
    }

    #[test]
    fn test_empty_and_absent_lists() {
        for body in [
            listing(json!([])),
            json!({ "ListDocsByRptTypeRes": {} }).to_string(),
            json!({}).to_string(),
        ] {
            let err = parse_catalog(&body).unwrap_err();
            assert!(matches!(err, FetchError::EmptyCatalog { filter: None }), "{body}");
        }
    }

    #[test]
    fn test_no_matching_extension() {
        let body = listing(json!([doc("xlsx", "B2", "r.xlsx", "2024-01-01T00:00:00Z")]));
        let entries = parse_catalog(&body).unwrap();
        let err = select_latest(&entries, Some("docx"), SelectionPolicy::ListOrder).unwrap_err();
        match err {
            FetchError::EmptyCatalog { filter } => assert_eq!(filter.as_deref(), Some("docx")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let body = listing(json!([{ "Document": {
            "Extension": "docx",
            "DocID": "A1",
            "PublishDate": "2024-01-01T00:00:00Z",
        }}]));
        let entries = parse_catalog(&body).unwrap();
        let err = select_latest(&entries, Some("docx"), SelectionPolicy::ListOrder).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(ref m) if m.contains("ConstructedName")));

        let body = listing(json!([{ "NotADocument": {} }]));
        let entries = parse_catalog(&body).unwrap();
        let err = select_latest(&entries, None, SelectionPolicy::ListOrder).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(ref m) if m.contains("missing Document")));
    }

    #[test]
    fn test_bad_timestamp_is_malformed() {
        let body = listing(json!([doc("docx", "A1", "r.docx", "June 1st")]));
        let entries = parse_catalog(&body).unwrap();
        let err = select_latest(&entries, None, SelectionPolicy::ListOrder).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(ref m) if m.contains("PublishDate")));
    }

    #[test]
    fn test_path_like_names_are_rejected() {
        for name in ["../escape.docx", "nested/file.docx", "..", "C:\\x.docx", "  "] {
            let body = listing(json!([doc("docx", "A1", name, "2024-01-01T00:00:00Z")]));
            let entries = parse_catalog(&body).unwrap();
            let err = select_latest(&entries, None, SelectionPolicy::ListOrder).unwrap_err();
            assert!(matches!(err, FetchError::MalformedResponse(_)), "{name}");
        }
    }

    #[test]
    fn test_non_json_body() {
        let err = parse_catalog("<html>maintenance</html>").unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }
}
