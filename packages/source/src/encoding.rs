//! Text decoding with an ordered list of candidate encodings.
//!
//! Incident exports are not reliably UTF-8. Candidates are tried in order
//! and the first one that decodes without malformed sequences wins. A
//! single-byte encoding such as `windows-1252` accepts every byte, so
//! putting one last guarantees a result.

use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::SourceError;

/// Resolves WHATWG encoding labels (`"UTF-8"`, `"latin1"`,
/// `"ISO-8859-1"`, ...) to encodings, preserving order.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if a label is unknown or the list is
/// empty.
pub fn resolve_encodings(labels: &[String]) -> Result<Vec<&'static Encoding>, SourceError> {
    if labels.is_empty() {
        return Err(SourceError::Config {
            message: "at least one candidate encoding is required".to_string(),
        });
    }

    labels
        .iter()
        .map(|label| {
            Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| SourceError::Config {
                message: format!("unknown encoding label '{label}'"),
            })
        })
        .collect()
}

/// Decodes `bytes` with the first candidate that produces no malformed
/// sequences. A leading byte-order mark is stripped.
///
/// Returns `None` when every candidate fails.
#[must_use]
pub fn decode_with_fallback<'a>(
    bytes: &'a [u8],
    candidates: &[&'static Encoding],
) -> Option<(Cow<'a, str>, &'static Encoding)> {
    candidates.iter().find_map(|encoding| {
        let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
        if had_errors {
            log::debug!("Input is not valid {}, trying next encoding", encoding.name());
            None
        } else {
            Some((text, *encoding))
        }
    })
}
