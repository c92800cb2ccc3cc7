//! Identity slots and the per-call trackers built on them.
//!
//! A [`SlotId`] stands in for "this particular object instance" across the
//! IR. Both sides of the engine use an independent integer-keyed map: the
//! serializer maps object addresses to slots, the deserializer maps slots to
//! partially-built shells. Trackers are call-scoped — one per
//! `serialize`/`deserialize` invocation, never shared between concurrent
//! calls.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StasisError};
use crate::value::Value;

/// A strong type identifying one object instance within a single IR tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(u32); // u32 is sufficient for 4 billion distinct objects per tree.

impl SlotId {
    /// Creates a new SlotId.
    /// Restricted to the crate to prevent arbitrary creation.
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Serialization-side identity tracker: object address to slot.
///
/// A slot is allocated for a value the first time it is visited, *before*
/// the builder recurses into its children. A child that points back at an
/// ancestor therefore finds the ancestor's slot already present and emits a
/// reference node instead of recursing forever.
#[derive(Debug, Default)]
pub(crate) struct SlotAllocator {
    by_addr: HashMap<usize, SlotId>,
    next: u32,
}

impl SlotAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the slot previously allocated for this address, if any.
    pub(crate) fn lookup(&self, addr: usize) -> Option<SlotId> {
        self.by_addr.get(&addr).copied()
    }

    /// Allocates a fresh slot and binds it to the address.
    pub(crate) fn allocate(&mut self, addr: usize) -> SlotId {
        let slot = self.reserve();
        self.by_addr.insert(addr, slot);
        slot
    }

    /// Allocates a fresh slot with no address binding. Used when grafting
    /// retained IR subtrees into a new tree.
    pub(crate) fn reserve(&mut self) -> SlotId {
        let slot = SlotId::new(self.next);
        self.next = self.next.wrapping_add(1);
        slot
    }
}

/// Deserialization-side identity tracker: slot to live shell.
///
/// Every node carrying a slot must have its shell bound here before any of
/// its children are populated, so a child's reference back to that slot
/// resolves to the very object every other reference resolves to. Identity
/// is preserved, not merely value-equality.
#[derive(Debug, Default)]
pub(crate) struct ShellTable {
    shells: HashMap<SlotId, Value>,
}

impl ShellTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Binds a shell to a slot. A slot may only be defined once per tree.
    pub(crate) fn bind(&mut self, slot: SlotId, shell: Value) -> Result<()> {
        if self.shells.insert(slot, shell).is_some() {
            return Err(StasisError::Deserialization {
                detail: format!("slot {slot} defined more than once"),
                handler: None,
                path: Vec::new(),
            });
        }
        Ok(())
    }

    /// Replaces the binding for a slot. Used when a handler finishes a value
    /// it previously registered a shell for.
    pub(crate) fn rebind(&mut self, slot: SlotId, value: Value) {
        self.shells.insert(slot, value);
    }

    /// Resolves a slot to its shell. The shell may still be incompletely
    /// populated; that is expected while the overall graph is under
    /// construction.
    pub(crate) fn resolve(&self, slot: SlotId) -> Option<Value> {
        self.shells.get(&slot).cloned()
    }
}
