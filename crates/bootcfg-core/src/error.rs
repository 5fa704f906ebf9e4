//! Error types for the bootcfg core library

use bootcfg_platform::PlatformError;
use thiserror::Error;

/// Main error type for configuration store operations
#[derive(Error, Debug)]
pub enum Error {
    /// File store or register bus failure
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// The text document could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// A single option value was rejected
    #[error("Invalid value: {0}")]
    Value(#[from] ValueError),

    /// Document does not fit in the bounded text buffer
    #[error("Document is {size} bytes, limit is {max} bytes")]
    DocumentTooLarge {
        /// Size of the document in bytes
        size: usize,
        /// Largest accepted size
        max: usize,
    },

    /// Document is not valid UTF-8
    #[error("Document is not valid UTF-8 (first bad byte at offset {0})")]
    Encoding(usize),

    /// Persisting the text document failed
    #[error("Failed to write the configuration file {name}: {source}")]
    TextStoreWrite {
        /// File name in the store
        name: String,
        /// The underlying error
        source: PlatformError,
    },

    /// Setter called with a value the option does not accept
    #[error("Invalid option {option}: {message}")]
    InvalidOption {
        /// Option name
        option: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// Result type alias using the bootcfg error type
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a single option token is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// No characters where at least one digit or name was required
    #[error("empty value")]
    Empty,

    /// Character that is not valid for the number base
    #[error("invalid digit '{0}'")]
    InvalidDigit(char),

    /// Accumulated number overflowed 64 bits
    #[error("number too large")]
    Overflow,

    /// Number outside the option's bounds
    #[error("{value} is outside {min}..={max}")]
    OutOfRange {
        /// Parsed value
        value: i128,
        /// Lower bound
        min: i128,
        /// Upper bound
        max: i128,
    },

    /// Boolean other than `0` or `1`
    #[error("expected 0 or 1, got \"{0}\"")]
    InvalidBool(String),

    /// Button name not in the key table
    #[error("unknown button \"{0}\"")]
    UnknownKey(String),

    /// Reserved (`?`) slot of the key table
    #[error("reserved button name")]
    ReservedKey,

    /// Same button listed twice
    #[error("button \"{0}\" listed twice")]
    DuplicateKey(String),

    /// Empty name between `+` delimiters or at either end
    #[error("empty button name in combo")]
    EmptyComboToken,

    /// Enumerated option with an unlisted value
    #[error("unknown choice \"{0}\"")]
    UnknownChoice(String),
}

/// What went wrong on a document line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Line is not a section header, key/value pair or comment
    #[error("malformed line")]
    Syntax,

    /// Section the codec does not know
    #[error("unknown section")]
    UnknownSection,

    /// Key the section does not have
    #[error("unknown key")]
    UnknownKey,

    /// Value rejected by the option's parser
    #[error("{0}")]
    InvalidValue(ValueError),
}

/// Document parse failure, attributed to its source line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line} [{section}] {key}: {kind}")]
pub struct ParseError {
    /// 1-based line number
    pub line: usize,
    /// Section the line belongs to (empty before the first header)
    pub section: String,
    /// Key on the line (empty for syntax errors)
    pub key: String,
    /// Failure detail
    pub kind: ParseErrorKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DocumentTooLarge {
            size: 9000,
            max: 8191,
        };
        assert!(err.to_string().contains("9000"));
        assert!(err.to_string().contains("8191"));

        let err = Error::InvalidOption {
            option: "volume_slider_override",
            message: "must be -1..=100".to_string(),
        };
        assert!(err.to_string().contains("volume_slider_override"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            line: 12,
            section: "boot".to_string(),
            key: "brightness_level".to_string(),
            kind: ParseErrorKind::InvalidValue(ValueError::OutOfRange {
                value: 5,
                min: 1,
                max: 4,
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 12"));
        assert!(msg.contains("[boot]"));
        assert!(msg.contains("brightness_level"));
        assert!(msg.contains("1..=4"));
    }

    #[test]
    fn test_error_from_platform() {
        let err: Error = PlatformError::NotFound("config.ini".to_string()).into();
        assert!(matches!(err, Error::Platform(_)));
    }

    #[test]
    fn test_error_from_value() {
        let err: Error = ValueError::ReservedKey.into();
        assert!(matches!(err, Error::Value(ValueError::ReservedKey)));
    }
}
