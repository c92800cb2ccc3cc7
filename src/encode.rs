//! The serialization walk: lowering a value graph into IR.
//!
//! The [`Encoder`] owns everything one `serialize` call needs: the identity
//! tracker, the path trail for diagnostics, the mode flags and the verbose
//! trace. It is created per call and never shared, so concurrent
//! serializations cannot interfere with each other.
//!
//! ## Dispatch order
//!
//! For every non-scalar value, after the identity check:
//!
//! 1. a custom override, when the value exposes one;
//! 2. the handler registry;
//! 3. structural copy for containers;
//! 4. an opaque node (or, in debug mode, an `Unsupported` error).
//!
//! The identity slot is allocated *before* any recursion, which is the
//! entire cycle-termination story: a child that points back at an ancestor
//! finds the ancestor's slot already registered and emits a reference node
//! instead of recursing forever.

use std::collections::HashMap;

use crate::api::{Options, Stasis};
use crate::error::{Result, StasisError};
use crate::handler::Handler;
use crate::ir::IrNode;
use crate::slots::{SlotAllocator, SlotId};
use crate::trace::TraceLog;
use crate::value::Value;

/// Serialization context: one per `serialize` call.
pub struct Encoder<'e> {
    engine: &'e Stasis,
    opts: Options,
    slots: SlotAllocator,
    path: Vec<String>,
    trace: TraceLog,
}

impl<'e> Encoder<'e> {
    pub(crate) fn new(engine: &'e Stasis, opts: Options) -> Self {
        Self {
            engine,
            opts,
            slots: SlotAllocator::new(),
            path: Vec::new(),
            trace: TraceLog::new(),
        }
    }

    /// Lowers a value (and everything reachable from it) into an IR node.
    ///
    /// Handlers and custom overrides call back into this for each child
    /// value inside their state, which is what keeps shared structure inside
    /// handler state on the same identity map as the rest of the graph.
    pub fn build(&mut self, value: &Value) -> Result<IrNode> {
        // Primitives are value types: no identity, no tracking.
        if let Some(scalar) = value.as_scalar() {
            return Ok(IrNode::Primitive(scalar));
        }

        let addr = value
            .identity()
            .ok_or_else(|| StasisError::Internal("non-scalar value without identity".into()))?;

        // Revisit: the sole mechanism for shared structure and cycles.
        if let Some(slot) = self.slots.lookup(addr) {
            return Ok(IrNode::Reference { slot });
        }

        // Register before recursing, or a self-referential value would never
        // hit the branch above.
        let slot = self.slots.allocate(addr);

        let label = value.type_label().to_string();
        self.path.push(label.clone());
        if self.opts.verbose {
            self.trace.record(self.path.len(), &label, Some(slot));
        }
        let node = self.dispatch(value, slot, &label);
        self.path.pop();
        node
    }

    /// True when this walk runs in debug mode.
    pub fn debug(&self) -> bool {
        self.opts.debug
    }

    /// The current path trail, root first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub(crate) fn finish(self) -> TraceLog {
        self.trace
    }

    fn dispatch(&mut self, value: &Value, slot: SlotId, label: &str) -> Result<IrNode> {
        match value {
            Value::Resource(r) => {
                if let Some(custom) = r.as_custom() {
                    let origin = custom.origin().to_string();
                    let state = custom
                        .capture(self)
                        .map_err(|e| self.extraction_error(label, None, e))?;
                    return Ok(IrNode::Custom {
                        slot,
                        origin,
                        state: Box::new(state),
                    });
                }
                if let Some(handler) = self.engine.handlers().find(value) {
                    let id = handler.id();
                    let state = handler
                        .extract(value, self)
                        .map_err(|e| self.extraction_error(label, Some(id), e))?;
                    return Ok(IrNode::Handled {
                        slot,
                        handler: id.to_string(),
                        type_name: label.to_string(),
                        state: Box::new(state),
                    });
                }
                self.unsupported(slot, label)
            }

            Value::List(cell) => {
                // A registered handler may claim a container ahead of the
                // structural fallback.
                if let Some(handler) = self.engine.handlers().find(value) {
                    return self.build_handled(value, slot, label, handler);
                }
                let mut items = Vec::with_capacity(cell.borrow().len());
                for item in cell.borrow().iter() {
                    items.push(self.build(item)?);
                }
                Ok(IrNode::Sequence { slot, items })
            }

            Value::Map(cell) => {
                if let Some(handler) = self.engine.handlers().find(value) {
                    return self.build_handled(value, slot, label, handler);
                }
                let mut entries = Vec::with_capacity(cell.borrow().len());
                for (key, entry) in cell.borrow().iter() {
                    entries.push((key.clone(), self.build(entry)?));
                }
                Ok(IrNode::Mapping { slot, entries })
            }

            Value::Reconnector(rc) => {
                // A placeholder still carrying its original handled state is
                // re-emitted as that state, so a disconnected graph
                // serializes the same way the connected one did.
                if let (Some(handler), Some(retained)) = (rc.handler(), rc.retained_state()) {
                    match self.renumber(retained) {
                        Ok(state) => {
                            return Ok(IrNode::Handled {
                                slot,
                                handler: handler.to_string(),
                                type_name: rc.type_tag().to_string(),
                                state: Box::new(state),
                            });
                        }
                        Err(err) => log::warn!(
                            "cannot re-emit retained state for {}: {err}; writing opaque node",
                            rc.type_tag()
                        ),
                    }
                }
                Ok(IrNode::Opaque {
                    slot,
                    type_name: rc.type_tag().to_string(),
                })
            }

            // Scalars were short-circuited in build().
            _ => Err(StasisError::Internal(format!(
                "scalar {label} reached dispatch"
            ))),
        }
    }

    fn build_handled(
        &mut self,
        value: &Value,
        slot: SlotId,
        label: &str,
        handler: &dyn Handler,
    ) -> Result<IrNode> {
        let id = handler.id();
        let state = handler
            .extract(value, self)
            .map_err(|e| self.extraction_error(label, Some(id), e))?;
        Ok(IrNode::Handled {
            slot,
            handler: id.to_string(),
            type_name: label.to_string(),
            state: Box::new(state),
        })
    }

    fn unsupported(&self, slot: SlotId, label: &str) -> Result<IrNode> {
        if self.opts.debug {
            return Err(StasisError::Unsupported {
                type_name: label.to_string(),
                path: self.path.clone(),
            });
        }
        log::debug!("no handler for {label}; degrading to opaque node");
        Ok(IrNode::Opaque {
            slot,
            type_name: label.to_string(),
        })
    }

    /// Normalizes an error raised during state extraction: it becomes a
    /// `Serialization` failure naming the offending type and handler, with
    /// the path trail attached in debug mode.
    fn extraction_error(
        &self,
        type_name: &str,
        handler: Option<&str>,
        err: StasisError,
    ) -> StasisError {
        let base = match err {
            StasisError::Serialization {
                type_name,
                handler: inner,
                path,
                message,
            } => StasisError::Serialization {
                type_name,
                handler: inner.or_else(|| handler.map(String::from)),
                path,
                message,
            },
            other => StasisError::Serialization {
                type_name: type_name.to_string(),
                handler: handler.map(String::from),
                path: Vec::new(),
                message: other.to_string(),
            },
        };
        if self.opts.debug {
            base.with_path(&self.path)
        } else {
            base
        }
    }

    /// Grafts a retained IR subtree into this tree under fresh slot ids.
    ///
    /// Only references resolving within the subtree are supported; retained
    /// handler state is self-contained by construction.
    fn renumber(&mut self, node: &IrNode) -> Result<IrNode> {
        let mut remap = HashMap::new();
        self.renumber_inner(node, &mut remap)
    }

    fn renumber_inner(
        &mut self,
        node: &IrNode,
        remap: &mut HashMap<SlotId, SlotId>,
    ) -> Result<IrNode> {
        match node {
            IrNode::Primitive(s) => Ok(IrNode::Primitive(s.clone())),
            IrNode::Reference { slot } => remap
                .get(slot)
                .map(|fresh| IrNode::Reference { slot: *fresh })
                .ok_or_else(|| {
                    StasisError::Internal(format!(
                        "retained state references slot {slot} outside its subtree"
                    ))
                }),
            IrNode::Sequence { slot, items } => {
                let fresh = self.remap_slot(*slot, remap);
                let items = items
                    .iter()
                    .map(|item| self.renumber_inner(item, remap))
                    .collect::<Result<Vec<_>>>()?;
                Ok(IrNode::Sequence { slot: fresh, items })
            }
            IrNode::Mapping { slot, entries } => {
                let fresh = self.remap_slot(*slot, remap);
                let entries = entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.renumber_inner(v, remap)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(IrNode::Mapping {
                    slot: fresh,
                    entries,
                })
            }
            IrNode::Handled {
                slot,
                handler,
                type_name,
                state,
            } => {
                let fresh = self.remap_slot(*slot, remap);
                Ok(IrNode::Handled {
                    slot: fresh,
                    handler: handler.clone(),
                    type_name: type_name.clone(),
                    state: Box::new(self.renumber_inner(state, remap)?),
                })
            }
            IrNode::Custom {
                slot,
                origin,
                state,
            } => {
                let fresh = self.remap_slot(*slot, remap);
                Ok(IrNode::Custom {
                    slot: fresh,
                    origin: origin.clone(),
                    state: Box::new(self.renumber_inner(state, remap)?),
                })
            }
            IrNode::Opaque { slot, type_name } => Ok(IrNode::Opaque {
                slot: self.remap_slot(*slot, remap),
                type_name: type_name.clone(),
            }),
        }
    }

    fn remap_slot(&mut self, old: SlotId, remap: &mut HashMap<SlotId, SlotId>) -> SlotId {
        let fresh = self.slots.reserve();
        remap.insert(old, fresh);
        fresh
    }
}
