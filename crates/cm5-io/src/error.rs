//! Error types for the file codecs.

use std::fmt;
use std::io;

use cm5_core::StateError;

/// Broad class of a [`CodecError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecErrorClass {
    /// The filesystem or stream failed.
    Io,
    /// The bytes (or the value being written) are not a valid encoding.
    Serialization,
}

/// Errors from encoding, decoding, or writing step and viz files.
#[derive(Debug)]
pub enum CodecError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The file does not start with the expected magic bytes.
    InvalidMagic {
        /// Magic the codec expects.
        expected: [u8; 4],
        /// Bytes found instead.
        found: [u8; 4],
    },
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// The stored checksum does not match the content.
    ChecksumMismatch {
        /// Checksum recorded in the file.
        stored: u64,
        /// Checksum computed over the bytes read.
        computed: u64,
    },
    /// The content is structurally invalid (truncated fields excluded).
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The decoded state violates a state invariant.
    InvalidState(StateError),
    /// A value cannot be represented in the format.
    Serialization {
        /// Human-readable description of what went wrong.
        detail: String,
    },
}

impl CodecError {
    /// Whether this is an I/O failure or a format failure.
    pub fn class(&self) -> CodecErrorClass {
        match self {
            Self::Io(e) if e.kind() != io::ErrorKind::UnexpectedEof => CodecErrorClass::Io,
            _ => CodecErrorClass::Serialization,
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic { expected, found } => write!(
                f,
                "invalid magic bytes {:?} (expected {:?})",
                String::from_utf8_lossy(found),
                String::from_utf8_lossy(expected)
            ),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::ChecksumMismatch { stored, computed } => write!(
                f,
                "checksum mismatch: stored={stored:#018x}, computed={computed:#018x}"
            ),
            Self::Malformed { detail } => write!(f, "malformed file: {detail}"),
            Self::InvalidState(e) => write!(f, "invalid state: {e}"),
            Self::Serialization { detail } => write!(f, "cannot serialize: {detail}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::InvalidState(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<StateError> for CodecError {
    fn from(e: StateError) -> Self {
        Self::InvalidState(e)
    }
}
