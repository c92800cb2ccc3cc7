//! The main entry point for serializing and reconstructing object graphs.

use std::path::Path;

use crate::codec;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::Result;
use crate::handler::{CustomReconstructor, CustomRegistry, Handler, HandlerRegistry};
use crate::ir::IrNode;
use crate::json;
use crate::reconnect::{self, ReconnectOptions};
use crate::trace::TraceLog;
use crate::value::Value;

/// Per-call mode flags, threaded explicitly through every recursive step.
///
/// There is no ambient debug state: two concurrent calls with different
/// options cannot interfere with each other's tracing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Escalate unsupported values to errors and attach the full path trail
    /// to every failure.
    pub debug: bool,
    /// Record a trace event for every visited value.
    pub verbose: bool,
}

impl Options {
    /// Options with `debug` set.
    pub fn debug() -> Self {
        Self {
            debug: true,
            verbose: false,
        }
    }

    /// Options with `verbose` set.
    pub fn verbose() -> Self {
        Self {
            debug: false,
            verbose: true,
        }
    }
}

/// The engine: a handler registry, a custom-override registry and the
/// envelope configuration, bundled behind the operation surface.
///
/// An engine is an explicit, constructed value — build one with
/// [`Stasis::builder`], share it freely (`&Stasis` is all any operation
/// needs), and drop it when done. The only interior mutability is the
/// dispatch cache, which is a pure memoization. A process-wide singleton is
/// acceptable but is the caller's choice, not the library's.
#[derive(Debug)]
pub struct Stasis {
    handlers: HandlerRegistry,
    customs: CustomRegistry,
    compression_id: u8,
}

impl Stasis {
    /// An engine with no handlers, no custom reconstructors and no
    /// compression. Enough for scalar/container graphs.
    pub fn new() -> Self {
        Self {
            handlers: HandlerRegistry::new(),
            customs: CustomRegistry::new(),
            compression_id: 0,
        }
    }

    /// Starts building a configured engine.
    pub fn builder() -> StasisBuilder {
        StasisBuilder::default()
    }

    /// The handler registry backing dispatch.
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// The custom-override reconstructors, keyed by origin tag.
    pub fn customs(&self) -> &CustomRegistry {
        &self.customs
    }

    /// Serializes a value graph to bytes.
    ///
    /// Builds the IR, encodes it with the binary codec and frames it in the
    /// envelope (magic, version, flags, checksum).
    pub fn serialize(&self, value: &Value, opts: Options) -> Result<Vec<u8>> {
        let ir = self.serialize_ir(value, opts)?;
        codec::encode_ir(&ir, self.compression_id)
    }

    /// Reconstructs a value graph from bytes produced by [`Stasis::serialize`].
    pub fn deserialize(&self, bytes: &[u8], opts: Options) -> Result<Value> {
        let ir = codec::decode_ir(bytes)?;
        self.deserialize_ir(&ir, opts)
    }

    /// Serializes a value graph to IR, skipping the final encode step.
    /// The inspection/tooling path.
    pub fn serialize_ir(&self, value: &Value, opts: Options) -> Result<IrNode> {
        let mut enc = Encoder::new(self, opts);
        enc.build(value)
    }

    /// Reconstructs a value graph from IR, skipping the envelope decode.
    pub fn deserialize_ir(&self, ir: &IrNode, opts: Options) -> Result<Value> {
        let mut dec = Decoder::new(self, opts);
        dec.rebuild(ir)
    }

    /// Serializes with tracing on and returns the walk log alongside the IR.
    pub fn trace_serialize(&self, value: &Value) -> Result<(IrNode, TraceLog)> {
        let mut enc = Encoder::new(
            self,
            Options {
                debug: false,
                verbose: true,
            },
        );
        let ir = enc.build(value)?;
        Ok((ir, enc.finish()))
    }

    /// Serializes a value graph and exports the IR as a JSON-safe structure.
    pub fn to_jsonable(&self, value: &Value, opts: Options) -> Result<serde_json::Value> {
        Ok(json::ir_to_jsonable(&self.serialize_ir(value, opts)?))
    }

    /// Serializes a value graph and renders the IR as pretty JSON text
    /// (two-space indent, sorted keys). Use [`json::ir_to_json`] directly
    /// for a different indent.
    pub fn to_json(&self, value: &Value, opts: Options) -> Result<String> {
        json::ir_to_json(&self.serialize_ir(value, opts)?, 2)
    }

    /// Walks an already-reconstructed graph and attempts to replace every
    /// reconnector placeholder with a live resource. Individual failures
    /// leave the placeholder in place; see [`reconnect::reconnect_all`].
    pub fn reconnect_all(&self, value: Value, opts: &ReconnectOptions) -> Value {
        reconnect::reconnect_all(value, opts)
    }

    /// Serializes a value graph straight to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P, value: &Value) -> Result<()> {
        let bytes = self.serialize(value, Options::default())?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Reconstructs a value graph from a file written by [`Stasis::save`].
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Value> {
        let bytes = std::fs::read(path)?;
        self.deserialize(&bytes, Options::default())
    }
}

impl Default for Stasis {
    fn default() -> Self {
        Self::new()
    }
}

/// Configures and builds a [`Stasis`] engine.
#[derive(Debug, Default)]
pub struct StasisBuilder {
    handlers: HandlerRegistry,
    customs: CustomRegistry,
    compression: bool,
}

impl StasisBuilder {
    /// Appends a handler. Registration order is dispatch priority: register
    /// the more specific handler before the more general one.
    pub fn handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.register(Box::new(handler));
        self
    }

    /// Registers the reconstructor consuming `custom` nodes with this
    /// origin tag.
    pub fn custom(mut self, origin: impl Into<String>, rec: CustomReconstructor) -> Self {
        self.customs.register(origin, rec);
        self
    }

    /// Enables LZ4 payload compression (requires the `lz4_flex` feature;
    /// serialization fails with a `Compression` error otherwise).
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Finishes the engine.
    pub fn build(self) -> Stasis {
        Stasis {
            handlers: self.handlers,
            customs: self.customs,
            compression_id: u8::from(self.compression),
        }
    }
}
