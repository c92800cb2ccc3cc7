//! The intermediate representation produced by serialization.
//!
//! An [`IrNode`] tree is what the builder emits and the reconstructor
//! consumes. Structurally it is a tree overlaid with back-references:
//! shared values and cycles are never embedded twice — the first visit
//! defines a node carrying a [`SlotId`], every later visit emits a
//! [`IrNode::Reference`] pointing at that slot. The tree is therefore always
//! finite, no matter what the source graph looked like.
//!
//! The IR is self-describing and codec-agnostic: every variant derives
//! `serde::{Serialize, Deserialize}`, so any tagged-value codec (bincode in
//! the default envelope, JSON through the boundary transform) can round-trip
//! it without knowing anything about handlers.

use serde::{Deserialize, Serialize};

use crate::slots::SlotId;

/// An atomic leaf value.
///
/// Scalars are value types: they carry no identity, are never tracked in the
/// slot table and can never participate in a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// The absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

/// A single node of the intermediate representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrNode {
    /// An atomic leaf. No slot: primitives are identity-free.
    Primitive(Scalar),

    /// A back-reference to a node defined elsewhere in the same tree.
    ///
    /// This is the sole mechanism for representing shared structure and
    /// cycles.
    Reference {
        /// The slot the referenced node was registered under.
        slot: SlotId,
    },

    /// An ordered sequence of child nodes.
    Sequence {
        /// Identity slot of the originating value.
        slot: SlotId,
        /// Child nodes in order.
        items: Vec<IrNode>,
    },

    /// A string-keyed mapping.
    Mapping {
        /// Identity slot of the originating value.
        slot: SlotId,
        /// Entries in key order.
        entries: Vec<(String, IrNode)>,
    },

    /// State extracted by a registered handler.
    Handled {
        /// Identity slot of the originating value.
        slot: SlotId,
        /// Identity of the handler that produced (and must consume) this
        /// node.
        handler: String,
        /// Runtime type label of the originating value, for diagnostics.
        type_name: String,
        /// Handler-produced payload: nested IR built through the recursion
        /// callback.
        state: Box<IrNode>,
    },

    /// State produced by a value's own custom override.
    Custom {
        /// Identity slot of the originating value.
        slot: SlotId,
        /// Origin type tag used to find the matching reconstructor.
        origin: String,
        /// Override-produced payload.
        state: Box<IrNode>,
    },

    /// A value the engine could not represent: no handler, no override, not
    /// a primitive or container. Data, not an error — reconstruction yields
    /// an inert placeholder.
    Opaque {
        /// Identity slot of the originating value.
        slot: SlotId,
        /// Runtime type label of the value that was skipped.
        type_name: String,
    },
}

/// Aggregate statistics over an IR tree. Produced by [`IrNode::summary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IrSummary {
    /// Total node count, references included.
    pub nodes: usize,
    /// Number of back-reference nodes.
    pub references: usize,
    /// Depth of the deepest node (the root is depth 1).
    pub max_depth: usize,
}

impl IrNode {
    /// The category label of this node, as used in path trails.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Reference { .. } => "reference",
            Self::Sequence { .. } => "sequence",
            Self::Mapping { .. } => "mapping",
            Self::Handled { .. } => "handled",
            Self::Custom { .. } => "custom",
            Self::Opaque { .. } => "opaque",
        }
    }

    /// The identity slot carried by this node, if it has one.
    pub fn slot(&self) -> Option<SlotId> {
        match self {
            Self::Primitive(_) => None,
            Self::Reference { slot }
            | Self::Sequence { slot, .. }
            | Self::Mapping { slot, .. }
            | Self::Handled { slot, .. }
            | Self::Custom { slot, .. }
            | Self::Opaque { slot, .. } => Some(*slot),
        }
    }

    /// Walks the tree and returns node/reference counts and the maximum
    /// depth. Cheap enough for tooling and test assertions.
    pub fn summary(&self) -> IrSummary {
        fn walk(node: &IrNode, depth: usize, acc: &mut IrSummary) {
            acc.nodes += 1;
            acc.max_depth = acc.max_depth.max(depth);
            match node {
                IrNode::Primitive(_) | IrNode::Opaque { .. } => {}
                IrNode::Reference { .. } => acc.references += 1,
                IrNode::Sequence { items, .. } => {
                    for item in items {
                        walk(item, depth + 1, acc);
                    }
                }
                IrNode::Mapping { entries, .. } => {
                    for (_, child) in entries {
                        walk(child, depth + 1, acc);
                    }
                }
                IrNode::Handled { state, .. } | IrNode::Custom { state, .. } => {
                    walk(state, depth + 1, acc);
                }
            }
        }

        let mut acc = IrSummary {
            nodes: 0,
            references: 0,
            max_depth: 0,
        };
        walk(self, 1, &mut acc);
        acc
    }
}
