//! Centralized error handling for Stasis.
//!
//! All failure conditions are propagated through the [`Result`] type; the
//! library never panics (enforced by clippy lints at the crate root).
//!
//! ## Error Categories
//!
//! Three kinds are user-visible outcomes of the engine algorithms:
//!
//! - **Serialization** ([`StasisError::Serialization`]): a handler or custom
//!   override raised while extracting state — the value could not be
//!   represented at all.
//! - **Deserialization** ([`StasisError::Deserialization`]): missing or
//!   malformed state, a handler/override lookup miss, or a failure inside
//!   reconstruction.
//! - **Unsupported** ([`StasisError::Unsupported`]): no handler, no override,
//!   not a primitive or container. Outside debug mode this degrades to an
//!   opaque node instead of raising.
//!
//! The remaining variants cover the envelope boundary (I/O, codec, format,
//! compression) and internal invariant violations.
//!
//! ## Path Trails
//!
//! `Serialization`, `Deserialization` and `Unsupported` carry a path trail:
//! the chain of category/type labels from the root down to the failing node.
//! The trail is populated when the operation runs in debug mode and left
//! empty otherwise, so non-debug errors stay terse.

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for Stasis operations.
pub type Result<T> = std::result::Result<T, StasisError>;

/// The master error enum covering all failure domains in Stasis.
///
/// This type is `Clone` so errors can be stored for later analysis or carried
/// across threads; I/O errors are wrapped in `Arc` to keep cloning cheap.
#[derive(Debug, Clone)]
pub enum StasisError {
    /// A handler or custom override failed while extracting state.
    Serialization {
        /// Runtime type label of the value that failed to serialize.
        type_name: String,
        /// Identity of the handler involved, when one was dispatched.
        handler: Option<String>,
        /// Category/type labels from the root to the failing node.
        /// Empty unless the operation ran in debug mode.
        path: Vec<String>,
        /// The underlying cause.
        message: String,
    },

    /// Reconstruction failed: malformed state, an unknown handler or origin
    /// tag, an unresolved slot reference, or an error raised inside a
    /// handler's `reconstruct`.
    Deserialization {
        /// What went wrong.
        detail: String,
        /// Identity of the handler or origin tag involved, if any.
        handler: Option<String>,
        /// Category/type labels from the root to the failing node.
        /// Empty unless the operation ran in debug mode.
        path: Vec<String>,
    },

    /// A value with no handler, no override and no structural representation.
    ///
    /// Raised only in debug mode; otherwise the builder degrades the value to
    /// an opaque node and continues.
    Unsupported {
        /// Runtime type label of the offending value.
        type_name: String,
        /// Category/type labels from the root to the failing node.
        path: Vec<String>,
    },

    /// The binary codec could not encode or decode the IR payload.
    Codec(String),

    /// The envelope is invalid: wrong magic bytes, unsupported version,
    /// truncated input or a checksum mismatch.
    Format(String),

    /// Compression or decompression failure, or an unknown algorithm ID.
    Compression(String),

    /// Low-level I/O failure from the file convenience operations.
    Io(Arc<io::Error>),

    /// Logic error in the engine itself. Should not occur in production.
    Internal(String),
}

impl StasisError {
    /// Fills in the path trail on the path-carrying variants, leaving an
    /// already-populated trail untouched. Other variants pass through.
    pub(crate) fn with_path(mut self, trail: &[String]) -> Self {
        match &mut self {
            Self::Serialization { path, .. }
            | Self::Deserialization { path, .. }
            | Self::Unsupported { path, .. } => {
                if path.is_empty() {
                    *path = trail.to_vec();
                }
            }
            _ => {}
        }
        self
    }

    /// Returns the path trail carried by this error, if any.
    pub fn path(&self) -> &[String] {
        match self {
            Self::Serialization { path, .. }
            | Self::Deserialization { path, .. }
            | Self::Unsupported { path, .. } => path,
            _ => &[],
        }
    }
}

fn fmt_trail(f: &mut fmt::Formatter<'_>, path: &[String]) -> fmt::Result {
    if !path.is_empty() {
        write!(f, " (at {})", path.join(" / "))?;
    }
    Ok(())
}

impl fmt::Display for StasisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization {
                type_name,
                handler,
                path,
                message,
            } => {
                write!(f, "Serialization Error: {type_name}: {message}")?;
                if let Some(h) = handler {
                    write!(f, " [handler: {h}]")?;
                }
                fmt_trail(f, path)
            }
            Self::Deserialization {
                detail,
                handler,
                path,
            } => {
                write!(f, "Deserialization Error: {detail}")?;
                if let Some(h) = handler {
                    write!(f, " [handler: {h}]")?;
                }
                fmt_trail(f, path)
            }
            Self::Unsupported { type_name, path } => {
                write!(f, "Unsupported Value: {type_name}")?;
                fmt_trail(f, path)
            }
            Self::Codec(s) => write!(f, "Codec Error: {s}"),
            Self::Format(s) => write!(f, "Format Error: {s}"),
            Self::Compression(s) => write!(f, "Compression Error: {s}"),
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Internal(s) => write!(f, "Internal Logic Error: {s}"),
        }
    }
}

impl std::error::Error for StasisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StasisError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
