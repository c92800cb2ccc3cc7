//! JSON export of already-built IR.
//!
//! A pure structural transform: node tags become a `"kind"` discriminator,
//! slots and handler/origin metadata become plain fields, nested IR becomes
//! nested JSON. No handler is invoked and no identity is resolved —
//! `slot`/`reference` tags are preserved verbatim so a downstream consumer
//! (possibly in another language) can interpret the sharing structure
//! itself.
//!
//! Keys are emitted in sorted order; byte-strings become arrays of numbers
//! so the output contains only JSON-safe leaf types.

use serde_json::json;

use crate::error::{Result, StasisError};
use crate::ir::{IrNode, Scalar};

fn scalar_to_json(scalar: &Scalar) -> serde_json::Value {
    match scalar {
        Scalar::Null => serde_json::Value::Null,
        Scalar::Bool(b) => json!(b),
        Scalar::Int(i) => json!(i),
        // Non-finite floats have no JSON representation; they degrade to
        // null, matching serde_json's own lossy behavior.
        Scalar::Float(x) => serde_json::Number::from_f64(*x)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Scalar::Str(s) => json!(s),
        Scalar::Bytes(b) => json!(b),
    }
}

/// Transforms an IR tree into a JSON-safe structure.
pub fn ir_to_jsonable(ir: &IrNode) -> serde_json::Value {
    match ir {
        IrNode::Primitive(scalar) => json!({
            "kind": "primitive",
            "value": scalar_to_json(scalar),
        }),
        IrNode::Reference { slot } => json!({
            "kind": "reference",
            "slot": slot.as_u32(),
        }),
        IrNode::Sequence { slot, items } => json!({
            "kind": "sequence",
            "slot": slot.as_u32(),
            "items": items.iter().map(ir_to_jsonable).collect::<Vec<_>>(),
        }),
        IrNode::Mapping { slot, entries } => {
            let entries: serde_json::Map<String, serde_json::Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), ir_to_jsonable(v)))
                .collect();
            json!({
                "kind": "mapping",
                "slot": slot.as_u32(),
                "entries": entries,
            })
        }
        IrNode::Handled {
            slot,
            handler,
            type_name,
            state,
        } => json!({
            "kind": "handled",
            "slot": slot.as_u32(),
            "handler": handler,
            "type": type_name,
            "state": ir_to_jsonable(state),
        }),
        IrNode::Custom {
            slot,
            origin,
            state,
        } => json!({
            "kind": "custom",
            "slot": slot.as_u32(),
            "origin": origin,
            "state": ir_to_jsonable(state),
        }),
        IrNode::Opaque { slot, type_name } => json!({
            "kind": "opaque",
            "slot": slot.as_u32(),
            "type": type_name,
        }),
    }
}

/// Renders an IR tree as JSON text.
///
/// `indent` of 0 produces compact output; anything else pretty-prints with
/// that many spaces per level. Keys are always sorted.
pub fn ir_to_json(ir: &IrNode, indent: usize) -> Result<String> {
    let structural = ir_to_jsonable(ir);
    if indent == 0 {
        return serde_json::to_string(&structural).map_err(|e| StasisError::Codec(e.to_string()));
    }

    let pad = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&pad);
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    serde::Serialize::serialize(&structural, &mut ser)
        .map_err(|e| StasisError::Codec(e.to_string()))?;
    String::from_utf8(out).map_err(|e| StasisError::Codec(e.to_string()))
}
