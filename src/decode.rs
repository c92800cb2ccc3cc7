//! The deserialization walk: rebuilding live values from IR.
//!
//! Cycle resolution is two-phase. **Phase A** allocates an empty shell for
//! every node that carries a slot — the engine does this itself for
//! containers, and a handler or custom override can opt in through its
//! shell hook — and binds it in the shell table *before* any state is
//! populated. **Phase B** then rebuilds children; a `reference` node
//! resolves through the table and may legitimately receive a shell that is
//! still being filled in, because every other reference to that slot
//! resolves to the very same object.
//!
//! Deserialization is not transactional: on error, partially-built shells
//! from earlier siblings are not rolled back, and callers must discard the
//! whole result.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::api::{Options, Stasis};
use crate::error::{Result, StasisError};
use crate::handler::Rebuilt;
use crate::ir::IrNode;
use crate::reconnect::Reconnector;
use crate::slots::{ShellTable, SlotId};
use crate::value::Value;

/// Deserialization context: one per `deserialize` call.
pub struct Decoder<'e> {
    engine: &'e Stasis,
    opts: Options,
    shells: ShellTable,
    path: Vec<String>,
}

impl<'e> Decoder<'e> {
    pub(crate) fn new(engine: &'e Stasis, opts: Options) -> Self {
        Self {
            engine,
            opts,
            shells: ShellTable::new(),
            path: Vec::new(),
        }
    }

    /// Rebuilds the value described by an IR node.
    ///
    /// Handlers and custom overrides call back into this for their state;
    /// that keeps references inside handler state on the same shell table as
    /// the rest of the graph.
    pub fn rebuild(&mut self, node: &IrNode) -> Result<Value> {
        match node {
            IrNode::Primitive(scalar) => Ok(Value::from(scalar.clone())),

            IrNode::Reference { slot } => self.shells.resolve(*slot).ok_or_else(|| {
                self.failure(format!("reference to undefined slot {slot}"), None)
            }),

            IrNode::Sequence { slot, items } => {
                self.path.push("sequence".into());
                let out = self.rebuild_sequence(*slot, items);
                self.path.pop();
                out
            }

            IrNode::Mapping { slot, entries } => {
                self.path.push("mapping".into());
                let out = self.rebuild_mapping(*slot, entries);
                self.path.pop();
                out
            }

            IrNode::Handled {
                slot,
                handler,
                type_name,
                state,
            } => {
                self.path.push(type_name.clone());
                let out = self.rebuild_handled(*slot, handler, state);
                self.path.pop();
                out
            }

            IrNode::Custom {
                slot,
                origin,
                state,
            } => {
                self.path.push(origin.clone());
                let out = self.rebuild_custom(*slot, origin, state);
                self.path.pop();
                out
            }

            IrNode::Opaque { slot, type_name } => {
                log::debug!("opaque node for {type_name}; producing inert placeholder");
                let value = Value::Reconnector(Rc::new(Reconnector::opaque(type_name.clone())));
                self.bind(*slot, value.clone())?;
                Ok(value)
            }
        }
    }

    /// True when this walk runs in debug mode.
    pub fn debug(&self) -> bool {
        self.opts.debug
    }

    /// The current path trail, root first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    fn rebuild_sequence(&mut self, slot: SlotId, items: &[IrNode]) -> Result<Value> {
        // Phase A: the shell exists and is bound before any child runs.
        let cell = Rc::new(RefCell::new(Vec::with_capacity(items.len())));
        self.bind(slot, Value::List(cell.clone()))?;

        // Phase B.
        for item in items {
            let child = self.rebuild(item)?;
            cell.borrow_mut().push(child);
        }
        Ok(Value::List(cell))
    }

    fn rebuild_mapping(&mut self, slot: SlotId, entries: &[(String, IrNode)]) -> Result<Value> {
        let cell = Rc::new(RefCell::new(BTreeMap::new()));
        self.bind(slot, Value::Map(cell.clone()))?;

        for (key, entry) in entries {
            let child = self.rebuild(entry)?;
            cell.borrow_mut().insert(key.clone(), child);
        }
        Ok(Value::Map(cell))
    }

    fn rebuild_handled(&mut self, slot: SlotId, handler_id: &str, state: &IrNode) -> Result<Value> {
        let handler = self.engine.handlers().by_id(handler_id).ok_or_else(|| {
            self.failure(
                format!("no handler registered for id {handler_id:?}"),
                Some(handler_id),
            )
        })?;

        // Phase A, opt-in: a handler whose state can point back at the value
        // under reconstruction pre-binds an empty shell here.
        let shell = handler.shell(state);
        if let Some(sh) = &shell {
            self.bind(slot, sh.clone())?;
        }

        let rebuilt = handler
            .reconstruct(state, shell.as_ref(), self)
            .map_err(|e| self.reconstruction_error(handler_id, e))?;

        let value = match rebuilt {
            Rebuilt::Live(v) => v,
            // Silent substitution: the parent stores whatever comes back.
            // The placeholder keeps the handled state so the graph
            // re-serializes the way it was written.
            Rebuilt::Reconnect(rc) => {
                Value::Reconnector(Rc::new(rc.retaining(handler_id, state.clone())))
            }
        };

        if shell.is_some() {
            self.shells.rebind(slot, value.clone());
        } else {
            self.bind(slot, value.clone())?;
        }
        Ok(value)
    }

    fn rebuild_custom(&mut self, slot: SlotId, origin: &str, state: &IrNode) -> Result<Value> {
        let rec = self.engine.customs().get(origin).ok_or_else(|| {
            self.failure(
                format!("no custom reconstructor registered for origin {origin:?}"),
                Some(origin),
            )
        })?;

        let shell = rec.allocate_shell();
        if let Some(sh) = &shell {
            self.bind(slot, sh.clone())?;
        }

        let value = rec
            .rebuild(state, shell.as_ref(), self)
            .map_err(|e| self.reconstruction_error(origin, e))?;

        if shell.is_some() {
            self.shells.rebind(slot, value.clone());
        } else {
            self.bind(slot, value.clone())?;
        }
        Ok(value)
    }

    fn bind(&mut self, slot: SlotId, value: Value) -> Result<()> {
        self.shells
            .bind(slot, value)
            .map_err(|e| self.attach_path(e))
    }

    fn failure(&self, detail: String, handler: Option<&str>) -> StasisError {
        self.attach_path(StasisError::Deserialization {
            detail,
            handler: handler.map(String::from),
            path: Vec::new(),
        })
    }

    /// Normalizes an error raised inside `reconstruct`: it becomes a
    /// `Deserialization` failure naming the handler or origin, with the path
    /// trail attached in debug mode.
    fn reconstruction_error(&self, handler: &str, err: StasisError) -> StasisError {
        let base = match err {
            StasisError::Deserialization {
                detail,
                handler: inner,
                path,
            } => StasisError::Deserialization {
                detail,
                handler: inner.or_else(|| Some(handler.to_string())),
                path,
            },
            other => StasisError::Deserialization {
                detail: other.to_string(),
                handler: Some(handler.to_string()),
                path: Vec::new(),
            },
        };
        self.attach_path(base)
    }

    fn attach_path(&self, err: StasisError) -> StasisError {
        if self.opts.debug {
            err.with_path(&self.path)
        } else {
            err
        }
    }
}
