//! Structured error types for the Folio editing engine.
//!
//! Most engine anomalies are recovered locally (degenerate geometry, detached
//! surfaces, unsupported drops) and never reach this type. What remains are
//! the failures a caller can act on: unparseable markup, undecodable images,
//! malformed configuration, and stale node handles.

use thiserror::Error;

use crate::surface::NodeId;

/// The unified error type returned by the public Folio API.
#[derive(Debug, Error)]
pub enum FolioError {
    /// Document markup could not be read into a surface.
    #[error("Failed to parse markup at byte {position}: {source}")]
    Markup {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    /// A dropped or embedded image could not be decoded.
    #[error("Image error: {0}")]
    Image(#[from] crate::image_loader::ImageError),

    /// Layout configuration JSON failed to parse.
    #[error("Failed to parse layout config: {source}{}", hint_suffix(.hint))]
    Config {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// The node handle does not refer to a live element of the surface.
    #[error("Node {0:?} is not a live element")]
    NotAnElement(NodeId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the layout config schema. Check field names (camelCase) and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        FolioError::Config { source: e, hint }
    }
}

pub type Result<T, E = FolioError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_carries_hint() {
        let err: FolioError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.contains("Hint: Check for trailing commas"), "{msg}");
    }

    #[test]
    fn eof_hint() {
        let err: FolioError = serde_json::from_str::<serde_json::Value>("{\"a\":")
            .unwrap_err()
            .into();
        assert!(err.to_string().contains("truncated"));
    }
}
