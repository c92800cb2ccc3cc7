//! # Stasis
//!
//! An object-graph serialization engine: it converts arbitrary,
//! possibly-cyclic in-memory value graphs — including live resources that
//! have no meaningful byte representation on their own (sockets, locks,
//! database handles, open files) — into a self-describing intermediate
//! representation, and reconstructs that IR back into live values,
//! restoring identity relationships (shared references, cycles) exactly.
//!
//! ## Overview
//!
//! Stasis is fundamentally different from schema-driven serialization
//! libraries. Instead of deriving code for a closed set of types, it walks a
//! dynamic value graph at runtime and dispatches each value to the first
//! thing that knows how to represent it: the value's own custom override, a
//! registered [`Handler`], or the built-in structural treatment of
//! containers. What none of those can represent degrades to an explicit
//! opaque marker rather than an error.
//!
//! ### Key Features
//!
//! *   **Identity-exact round-trips:** two fields holding the same object
//!     before serialization hold the same object after reconstruction — the
//!     identical allocation, not an equal copy.
//! *   **Cycle-safe:** self-referential and mutually-referential graphs
//!     serialize in bounded space and reconstruct correctly, via an
//!     arena-of-slots identity model on both sides.
//! *   **Pluggable handlers:** each category of live resource (a connection
//!     pool, a file handle, a compiled pattern) is handled by a small unit
//!     implementing [`Handler`]; registration order is dispatch priority.
//! *   **Reconnectable placeholders:** a handler that cannot safely recreate
//!     its resource from stored metadata returns a [`Reconnector`] — an
//!     inert stand-in the caller can later revive with credentials through
//!     [`Stasis::reconnect_all`].
//! *   **Introspectable failures:** debug mode attaches the full path trail
//!     (root to failing node) to every error; verbose mode records a trace
//!     event per visited value for localizing problems in deep graphs.
//! *   **JSON export:** any IR tree can be exported as a JSON-safe
//!     structure for tooling or cross-language consumers, slots and
//!     references preserved as plain fields.
//!
//! ## Architecture
//!
//! ### The IR
//!
//! Serialization produces an [`IrNode`] tree: a tagged, self-describing
//! structure overlaid with back-references. The first visit to a shared
//! value defines a node under an integer slot; every later visit emits a
//! reference to that slot. Raw cycles never appear in the tree.
//!
//! ### Two-phase reconstruction
//!
//! The read side allocates an empty shell for every slot-carrying node
//! *before* populating its children, so a reference that points back at an
//! ancestor resolves to the same allocation every other reference resolves
//! to — even while that ancestor is still being filled in.
//!
//! ### The envelope
//!
//! [`Stasis::serialize`] frames the bincode-encoded IR with a small header:
//! magic bytes, format version, a flag byte carrying the compression
//! algorithm ID, and an XxHash64 payload checksum verified on load.
//!
//! ## Usage Patterns
//!
//! ### Basic round-trip
//!
//! ```rust
//! use stasis::{Options, Stasis, Value};
//!
//! let engine = Stasis::new();
//!
//! let shared = Value::list(vec![Value::from(1), Value::from(2)]);
//! let root = Value::map([("a", shared.clone()), ("b", shared)]);
//!
//! let bytes = engine.serialize(&root, Options::default())?;
//! let restored = engine.deserialize(&bytes, Options::default())?;
//!
//! // Identity survives: both fields hold the same list.
//! assert!(restored.key("a").unwrap().ptr_eq(&restored.key("b").unwrap()));
//! # Ok::<(), stasis::StasisError>(())
//! ```
//!
//! ### A handler for a live resource
//!
//! ```rust,ignore
//! use stasis::{Handler, Rebuilt, Stasis, Value};
//!
//! struct TcpClientHandler;
//!
//! impl Handler for TcpClientHandler {
//!     fn id(&self) -> &'static str { "tcp.client" }
//!     fn matches(&self, value: &Value) -> bool {
//!         value.as_resource::<TcpClient>().is_some()
//!     }
//!     // extract() lowers host/port metadata; reconstruct() returns
//!     // Rebuilt::Reconnect with a connector closure, because an open
//!     // socket cannot be conjured from data alone.
//!     # fn extract(&self, _: &Value, _: &mut stasis::Encoder) -> stasis::Result<stasis::IrNode> { unimplemented!() }
//!     # fn reconstruct(&self, _: &stasis::IrNode, _: Option<&Value>, _: &mut stasis::Decoder) -> stasis::Result<Rebuilt> { unimplemented!() }
//! }
//!
//! let engine = Stasis::builder().handler(TcpClientHandler).build();
//! ```
//!
//! ### Debugging a deep graph
//!
//! ```rust,ignore
//! // Errors carry the root-to-failure path in debug mode:
//! let err = engine.serialize(&root, Options::debug()).unwrap_err();
//! eprintln!("{err}"); // Serialization Error: ... (at map / list / pg.pool)
//!
//! // Or trace every visited node:
//! let (_ir, trace) = engine.trace_serialize(&root)?;
//! println!("{trace}");
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **No Panics:** no `unwrap()` or `panic!()` in the library (enforced by
//!   clippy lints).
//! * **Comprehensive Errors:** every failure is a [`StasisError`] carrying
//!   the offending type and, in debug mode, the exact path.
//! * **Run-to-completion:** a `serialize`/`deserialize` call either returns
//!   a complete result or an error — never a partial graph.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod codec;
pub mod compression;
pub mod decode;
pub mod encode;
pub mod error;
pub mod handler;
pub mod ir;
pub mod json;
pub mod reconnect;
pub mod trace;
pub mod value;

// --- INTERNAL MODULES ---
mod slots;

// --- RE-EXPORTS ---

pub use api::{Options, Stasis, StasisBuilder};
pub use decode::Decoder;
pub use encode::Encoder;
pub use error::{Result, StasisError};
pub use handler::{CustomReconstructor, Handler, HandlerRegistry, Rebuilt};
pub use ir::{IrNode, IrSummary, Scalar};
pub use json::{ir_to_json, ir_to_jsonable};
pub use reconnect::{
    reconnect_all, Credentials, ReconnectOptions, ReconnectRequest, Reconnector,
};
pub use slots::SlotId;
pub use trace::{TraceEvent, TraceLog};
pub use value::{CustomState, Resource, Value};

#[cfg(feature = "lz4_flex")]
pub use compression::Lz4Compressor;
pub use compression::{Compressor, NoCompression};
