//! Service exception detection and classification.
//!
//! Some services answer a failed tile request with HTTP 200 and an
//! XML exception document instead of image bytes. The coordinator
//! sniffs every successful body with [`looks_like_exception`] and, on
//! a match, runs [`classify`] to pull out structured records. A body
//! that matches the sniff but yields no records is undiagnosed and
//! always escalates to a failure.
//!
//! Two document shapes are recognized: WMS `ServiceExceptionReport`
//! (a `code` attribute plus message text per `ServiceException`) and
//! OWS `ExceptionReport` (an `exceptionCode` attribute plus nested
//! `ExceptionText` elements per `Exception`). Namespace prefixes are
//! ignored; matching is on local element names.

use roxmltree::Document;

/// One exception extracted from a service response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRecord {
    /// Service-assigned code, e.g. `LayerNotDefined`
    pub code: Option<String>,
    /// Message text, possibly empty
    pub message: String,
}

/// UTF-8 byte order mark.
const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Whether a response body looks like an XML exception document.
///
/// Checks the first non-whitespace bytes for `<?xml`, `<!DOCTYPE` or
/// `<ServiceException`, case-insensitively. Image bytes never match.
pub fn looks_like_exception(body: &[u8]) -> bool {
    let body = body.strip_prefix(BOM).unwrap_or(body);
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let head = &body[start..];

    starts_with_ci(head, b"<?xml")
        || starts_with_ci(head, b"<!doctype")
        || starts_with_ci(head, b"<serviceexception")
}

fn starts_with_ci(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len()
        && haystack
            .iter()
            .zip(prefix)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

/// Extract every distinct exception record from a sniffed body.
///
/// Returns an empty list when the body is not valid XML or parses but
/// contains no exception elements; callers treat that as undiagnosed.
pub fn classify(body: &[u8]) -> Vec<ExceptionRecord> {
    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(_) => return Vec::new(),
    };
    let doc = match Document::parse(text) {
        Ok(doc) => doc,
        Err(_) => return Vec::new(),
    };

    let mut records: Vec<ExceptionRecord> = Vec::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        let name = node.tag_name().name();

        let record = if name.eq_ignore_ascii_case("ServiceException") {
            Some(ExceptionRecord {
                code: node.attribute("code").map(str::to_string),
                message: node.text().unwrap_or("").trim().to_string(),
            })
        } else if name.eq_ignore_ascii_case("Exception") {
            let message = node
                .children()
                .find(|c| c.is_element() && c.tag_name().name().eq_ignore_ascii_case("ExceptionText"))
                .and_then(|c| c.text())
                .or_else(|| node.text())
                .unwrap_or("")
                .trim()
                .to_string();
            Some(ExceptionRecord {
                code: node
                    .attribute("exceptionCode")
                    .or_else(|| node.attribute("code"))
                    .map(str::to_string),
                message,
            })
        } else {
            None
        };

        if let Some(record) = record {
            if !records.contains(&record) {
                records.push(record);
            }
        }
    }

    records
}
