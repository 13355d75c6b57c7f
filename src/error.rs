use std::fmt::Display;
use thiserror::Error;

/// Coarse classification of a failed load, used to pick the message shown to
/// the consumer of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    NotFound,
    Parse,
    Other,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source file `{path}` not found")]
    NotFound { path: String },

    #[error("failed to parse `{path}`: {message}")]
    Parse { path: String, message: String },

    #[error("unsupported file type for `{path}` (expected xlsx, xlsm, xls, ods or csv)")]
    Unsupported { path: String },

    #[error("failed to load `{path}`: {message}")]
    Other { path: String, message: String },
}

impl LoadError {
    /// Build an error from an arbitrary collaborator failure by inspecting its
    /// description. I/O not-found errors should be mapped before reaching here.
    pub fn from_failure(path: &str, err: impl Display) -> Self {
        let message = err.to_string();
        let path = path.to_string();
        match classify_failure(&message) {
            LoadErrorKind::NotFound => LoadError::NotFound { path },
            LoadErrorKind::Parse => LoadError::Parse { path, message },
            LoadErrorKind::Other => LoadError::Other { path, message },
        }
    }

    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound { path: path.to_string() }
        } else {
            LoadError::from_failure(path, err)
        }
    }

    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::NotFound { .. } => LoadErrorKind::NotFound,
            LoadError::Parse { .. } | LoadError::Unsupported { .. } => LoadErrorKind::Parse,
            LoadError::Other { .. } => LoadErrorKind::Other,
        }
    }

    /// Message for the presentation layer. Details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::NotFound { path } => format!("File {} was not found", path),
            LoadError::Parse { .. } | LoadError::Unsupported { .. } => {
                "Could not parse the spreadsheet. Check the file format".to_string()
            }
            LoadError::Other { .. } => "Error while loading sales data".to_string(),
        }
    }
}

const NOT_FOUND_MARKERS: &[&str] = &["404", "not found", "no such file", "os error 2", "cannot find"];
const PARSE_MARKERS: &[&str] = &[
    "failed to parse",
    "parse",
    "invalid",
    "unexpected eof",
    "zip",
    "xml",
    "cfb",
    "unrecognized",
    "file format",
];

/// Best-effort classification of a failure description by known substrings.
/// Matching is case-insensitive; not-found markers win over parse markers.
pub fn classify_failure(description: &str) -> LoadErrorKind {
    let lower = description.to_lowercase();
    if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
        LoadErrorKind::NotFound
    } else if PARSE_MARKERS.iter().any(|m| lower.contains(m)) {
        LoadErrorKind::Parse
    } else {
        LoadErrorKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_substrings() {
        assert_eq!(classify_failure("HTTP 404"), LoadErrorKind::NotFound);
        assert_eq!(
            classify_failure("No such file or directory (os error 2)"),
            LoadErrorKind::NotFound
        );
        assert_eq!(
            classify_failure("Failed to parse workbook"),
            LoadErrorKind::Parse
        );
        assert_eq!(classify_failure("Zip error: invalid archive"), LoadErrorKind::Parse);
        assert_eq!(
            classify_failure("Cannot detect file format"),
            LoadErrorKind::Parse
        );
        assert_eq!(classify_failure("disk on fire"), LoadErrorKind::Other);
    }

    #[test]
    fn io_not_found_maps_directly() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e = LoadError::from_io("sales_data.xlsx", err);
        assert_eq!(e.kind(), LoadErrorKind::NotFound);
        assert!(e.user_message().contains("sales_data.xlsx"));
    }

    #[test]
    fn user_messages_differ_by_kind() {
        let parse = LoadError::from_failure("a.xlsx", "Failed to parse sheet");
        let other = LoadError::from_failure("a.xlsx", "permission denied");
        assert_eq!(parse.kind(), LoadErrorKind::Parse);
        assert_eq!(other.kind(), LoadErrorKind::Other);
        assert_ne!(parse.user_message(), other.user_message());
    }
}
