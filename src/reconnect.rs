//! Reconnectable placeholders for live resources.
//!
//! Some resources cannot be safely or completely recreated from stored
//! metadata alone — an open socket, a connected database session, a running
//! worker. Their handlers return a [`Reconnector`] instead of a live value:
//! an inert stand-in carrying the non-secret metadata needed to attempt
//! recreation, plus (when the handler supplied one) the capability to do so
//! once credentials are available.
//!
//! [`reconnect_all`] is the post-deserialization pass that walks a
//! reconstructed graph and tries to replace every placeholder it finds.
//! Partial success is the expected steady state: a placeholder whose
//! recreation fails — or that never had the capability — is left in place
//! and the walk continues.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::ir::{IrNode, Scalar};
use crate::value::Value;

/// The recreation capability of a reconnector.
pub type ConnectFn = Box<dyn Fn(&ReconnectRequest<'_>) -> Result<Value>>;

/// An inert placeholder for a live resource that could not be reconstructed
/// from data alone.
///
/// Created only during deserialization — by a handler that declined to fully
/// recreate its resource, or by the engine for opaque nodes (in which case
/// there is no recreation capability at all). Owned by the caller after
/// deserialization returns.
pub struct Reconnector {
    type_tag: String,
    metadata: BTreeMap<String, Scalar>,
    handler: Option<String>,
    retained: Option<IrNode>,
    connector: Option<ConnectFn>,
}

impl Reconnector {
    /// Creates a placeholder for the given resource category.
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            metadata: BTreeMap::new(),
            handler: None,
            retained: None,
            connector: None,
        }
    }

    /// Creates the capability-less placeholder standing in for an opaque
    /// node.
    pub(crate) fn opaque(type_name: impl Into<String>) -> Self {
        Self::new(type_name)
    }

    /// Attaches a piece of non-secret recreation metadata (an address, a
    /// file path, a target description).
    pub fn with_metadata(mut self, key: impl Into<String>, value: Scalar) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attaches the recreation capability.
    pub fn with_connector<F>(mut self, connect: F) -> Self
    where
        F: Fn(&ReconnectRequest<'_>) -> Result<Value> + 'static,
    {
        self.connector = Some(Box::new(connect));
        self
    }

    /// Records the handled state this placeholder was built from, so
    /// re-serializing the graph reproduces the original node.
    pub(crate) fn retaining(mut self, handler: &str, state: IrNode) -> Self {
        self.handler = Some(handler.to_string());
        self.retained = Some(state);
        self
    }

    /// The resource category tag, used as the credential lookup key.
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// The non-secret recreation metadata.
    pub fn metadata(&self) -> &BTreeMap<String, Scalar> {
        &self.metadata
    }

    /// Identity of the handler that produced this placeholder, if any.
    pub fn handler(&self) -> Option<&str> {
        self.handler.as_deref()
    }

    /// The retained handled state, when re-serialization is possible.
    pub(crate) fn retained_state(&self) -> Option<&IrNode> {
        self.retained.as_ref()
    }

    /// Whether this placeholder carries a recreation capability.
    pub fn can_reconnect(&self) -> bool {
        self.connector.is_some()
    }

    /// Attempts to recreate the live resource.
    ///
    /// Fails when no capability was attached, or when the connector itself
    /// fails (missing credentials, unreachable endpoint).
    pub fn reconnect(&self, request: &ReconnectRequest<'_>) -> Result<Value> {
        match &self.connector {
            Some(connect) => connect(request),
            None => Err(crate::error::StasisError::Deserialization {
                detail: format!("{} placeholder has no reconnect capability", self.type_tag),
                handler: self.handler.clone(),
                path: Vec::new(),
            }),
        }
    }
}

impl fmt::Debug for Reconnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconnector")
            .field("type_tag", &self.type_tag)
            .field("metadata", &self.metadata)
            .field("handler", &self.handler)
            .field("can_reconnect", &self.connector.is_some())
            .finish()
    }
}

/// What a connector receives when a reconnection is attempted.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectRequest<'r> {
    /// The credential entry selected for this placeholder, if any was
    /// supplied.
    pub secrets: Option<&'r BTreeMap<String, String>>,
    /// Whether background resources (workers, listeners) should be started
    /// as part of recreation.
    pub start_background: bool,
}

/// Credentials for one resource category.
///
/// The default entry applies to every instance of the type; a per-field
/// override takes precedence for placeholders reached through a mapping
/// entry of that name.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    default: BTreeMap<String, String>,
    per_field: BTreeMap<String, BTreeMap<String, String>>,
}

impl Credentials {
    /// Creates an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret to the type-wide default entry.
    pub fn secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default.insert(key.into(), value.into());
        self
    }

    /// Adds a secret that applies only to placeholders stored under the
    /// given field name.
    pub fn field_secret(
        mut self,
        field: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.per_field
            .entry(field.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    fn select(&self, field: Option<&str>) -> &BTreeMap<String, String> {
        field
            .and_then(|f| self.per_field.get(f))
            .unwrap_or(&self.default)
    }
}

/// Configuration for a [`reconnect_all`] pass.
#[derive(Debug, Clone, Default)]
pub struct ReconnectOptions {
    credentials: BTreeMap<String, Credentials>,
    start_background: bool,
}

impl ReconnectOptions {
    /// Creates an empty configuration: every placeholder is attempted with
    /// no secrets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies credentials for one resource category (the reconnector's
    /// type tag).
    pub fn credentials(mut self, type_tag: impl Into<String>, creds: Credentials) -> Self {
        self.credentials.insert(type_tag.into(), creds);
        self
    }

    /// Requests that background resources be started during recreation.
    pub fn start_background(mut self, start: bool) -> Self {
        self.start_background = start;
        self
    }

    fn secrets_for<'r>(
        &'r self,
        type_tag: &str,
        field: Option<&str>,
    ) -> Option<&'r BTreeMap<String, String>> {
        self.credentials.get(type_tag).map(|c| c.select(field))
    }
}

/// Walks an already-reconstructed object graph and attempts to replace every
/// [`Reconnector`] with a live value.
///
/// Individual failures are swallowed: the placeholder stays in place and the
/// walk continues. Some live resources being unavailable is the normal case,
/// not an error. A placeholder aliased in several fields is recreated once
/// and every occurrence receives the same live value.
pub fn reconnect_all(root: Value, opts: &ReconnectOptions) -> Value {
    let mut state = WalkState::default();
    match attempt(&root, None, opts, &mut state) {
        Some(replacement) => replacement,
        None => root,
    }
}

#[derive(Default)]
struct WalkState {
    visited: HashSet<usize>,
    replaced: HashMap<usize, Value>,
    failed: HashSet<usize>,
}

/// Returns `Some(replacement)` when this value should be swapped out in its
/// parent slot.
fn attempt(
    value: &Value,
    field: Option<&str>,
    opts: &ReconnectOptions,
    state: &mut WalkState,
) -> Option<Value> {
    match value {
        Value::Reconnector(rc) => {
            let addr = Rc::as_ptr(rc) as usize;
            if let Some(live) = state.replaced.get(&addr) {
                return Some(live.clone());
            }
            if state.failed.contains(&addr) {
                return None;
            }
            let request = ReconnectRequest {
                secrets: opts.secrets_for(rc.type_tag(), field),
                start_background: opts.start_background,
            };
            match rc.reconnect(&request) {
                Ok(live) => {
                    state.replaced.insert(addr, live.clone());
                    Some(live)
                }
                Err(err) => {
                    log::warn!("reconnect failed for {}: {err}", rc.type_tag());
                    state.failed.insert(addr);
                    None
                }
            }
        }
        Value::List(cell) => {
            // Cycle guard: each container identity is entered once.
            if !state.visited.insert(Rc::as_ptr(cell) as usize) {
                return None;
            }
            let mut items = cell.borrow_mut();
            for item in items.iter_mut() {
                if let Some(replacement) = attempt(item, None, opts, state) {
                    *item = replacement;
                }
            }
            None
        }
        Value::Map(cell) => {
            if !state.visited.insert(Rc::as_ptr(cell) as usize) {
                return None;
            }
            let mut entries = cell.borrow_mut();
            for (key, entry) in entries.iter_mut() {
                if let Some(replacement) = attempt(entry, Some(key.as_str()), opts, state) {
                    *entry = replacement;
                }
            }
            None
        }
        _ => None,
    }
}
