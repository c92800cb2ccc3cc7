//! Verbose walk instrumentation.
//!
//! When an operation runs with `verbose` set, every entry into the
//! serialization dispatch appends a [`TraceEvent`] naming the value's type
//! and depth. The log is append-only and never read back by the engine; it
//! exists to localize failures in deep object graphs after the fact. Events
//! are mirrored to `log::trace!` so an installed logger sees them live.

use std::fmt;

use crate::slots::SlotId;

/// One entry of the verbose walk log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// Nesting depth of the visited value (the root is depth 1).
    pub depth: usize,
    /// Runtime type label of the visited value.
    pub label: String,
    /// Identity slot allocated for the value, when it has identity.
    pub slot: Option<SlotId>,
}

/// Append-only sequence of walk events.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    events: Vec<TraceEvent>,
}

impl TraceLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, depth: usize, label: &str, slot: Option<SlotId>) {
        log::trace!(
            "visit depth={depth} type={label}{}",
            slot.map(|s| format!(" slot={s}")).unwrap_or_default()
        );
        self.events.push(TraceEvent {
            depth,
            label: label.to_string(),
            slot,
        });
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The recorded events, in visit order.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Depth of the deepest visited value.
    pub fn max_depth(&self) -> usize {
        self.events.iter().map(|e| e.depth).max().unwrap_or(0)
    }
}

impl fmt::Display for TraceLog {
    /// Renders the visit order as an indented tree, one event per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== SERIALIZATION TRACE ===")?;
        for event in &self.events {
            let indent = "  ".repeat(event.depth.saturating_sub(1));
            match event.slot {
                Some(slot) => writeln!(f, "{indent}{} {slot}", event.label)?,
                None => writeln!(f, "{indent}{}", event.label)?,
            }
        }
        Ok(())
    }
}
