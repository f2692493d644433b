//! Error types for CVAT annotation processing.
//!
//! Only the parsing boundary produces errors; the layout algorithms are
//! total over well-formed input and never fail.

/// Result type alias for annotation processing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading a CVAT annotation file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// XML syntax or structure error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required attribute is missing from an annotation tag
    #[error("Missing attribute '{attribute}' on <{tag}>")]
    MissingAttribute {
        /// Tag the attribute was expected on
        tag: String,
        /// Name of the missing attribute
        attribute: String,
    },

    /// An attribute value failed to parse as a number
    #[error("Invalid numeric value '{value}' for attribute '{attribute}'")]
    InvalidNumber {
        /// Name of the attribute
        attribute: String,
        /// The unparseable value
        value: String,
    },

    /// A polyline had fewer than two points
    #[error("Polyline {id} has fewer than 2 points")]
    DegeneratePath {
        /// Id assigned to the offending polyline
        id: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_attribute_message() {
        let err = Error::MissingAttribute {
            tag: "box".to_string(),
            attribute: "xtl".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("xtl"));
        assert!(msg.contains("box"));
    }

    #[test]
    fn test_invalid_number_message() {
        let err = Error::InvalidNumber {
            attribute: "rotation".to_string(),
            value: "ninety".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("rotation"));
        assert!(msg.contains("ninety"));
    }
}
