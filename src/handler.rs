//! Handler dispatch: the pluggable translation units and their registry.
//!
//! A [`Handler`] translates between one category of runtime value and IR
//! state. Handlers are registered once at engine construction and held in
//! registration order; order is the priority rule, so a more specific
//! handler must be registered before a more general one that would also
//! match.
//!
//! The [`HandlerRegistry`] resolves "which handler applies" with a
//! type-keyed cache: the first value of a given runtime type walks the
//! handler list evaluating predicates, then the winner (or the explicit
//! "no handler" outcome) is memoized so every later value of that type is an
//! O(1) lookup. The cache is purely a performance memoization — it may be
//! cleared at any time with only a performance cost.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::Result;
use crate::ir::IrNode;
use crate::reconnect::Reconnector;
use crate::value::Value;

/// What a handler's `reconstruct` produced.
pub enum Rebuilt {
    /// A fully-live value.
    Live(Value),
    /// The underlying resource could not be safely recreated from the
    /// stored metadata alone; an inert placeholder stands in for it.
    Reconnect(Reconnector),
}

/// A pluggable unit translating between a runtime value category and IR
/// state.
pub trait Handler: Send + Sync {
    /// Stable identity of this handler, recorded in the IR nodes it
    /// produces.
    fn id(&self) -> &'static str;

    /// Whether this handler applies to the given value.
    ///
    /// The outcome is cached per runtime type, so the predicate must depend
    /// on the type of the value, not on its current contents.
    fn matches(&self, value: &Value) -> bool;

    /// Extracts a reconstructable state representation. Child values are
    /// lowered through the encoder so shared structure inside the state
    /// participates in identity tracking.
    fn extract(&self, value: &Value, enc: &mut Encoder<'_>) -> Result<IrNode>;

    /// Shell allocation hook for self-referential state.
    ///
    /// A handler whose extracted state can point back at the value being
    /// reconstructed returns an empty, uninitialized shell here; the engine
    /// registers it under the node's slot before `reconstruct` runs, and
    /// passes it back so the handler populates that same object. Handlers
    /// without self-referential state keep the default.
    fn shell(&self, state: &IrNode) -> Option<Value> {
        let _ = state;
        None
    }

    /// Rebuilds a value from previously extracted state.
    ///
    /// `shell` is the object returned by [`Handler::shell`] for this node,
    /// if any; when present, the returned [`Rebuilt::Live`] must be that
    /// same object.
    fn reconstruct(
        &self,
        state: &IrNode,
        shell: Option<&Value>,
        dec: &mut Decoder<'_>,
    ) -> Result<Rebuilt>;
}

/// Cache key: the runtime type of a value, as far as dispatch is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TypeKey {
    List,
    Map,
    Resource(TypeId),
}

impl TypeKey {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::List(_) => Some(Self::List),
            Value::Map(_) => Some(Self::Map),
            Value::Resource(r) => Some(Self::Resource(r.as_any().type_id())),
            // Scalars and reconnectors never reach handler dispatch.
            _ => None,
        }
    }
}

/// Ordered collection of handlers plus the type-to-handler dispatch cache.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn Handler>>,
    by_id: HashMap<&'static str, usize>,
    // Read-mostly: many concurrent lookups, occasional cache-fill writes.
    cache: RwLock<HashMap<TypeKey, Option<usize>>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            by_id: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Appends a handler. Registration order is the dispatch priority:
    /// first registered wins when several predicates match.
    pub fn register(&mut self, handler: Box<dyn Handler>) {
        let id = handler.id();
        let idx = self.handlers.len();
        if self.by_id.insert(id, idx).is_some() {
            log::debug!("handler id {id:?} registered twice; id lookups now resolve to the later one");
        }
        self.handlers.push(handler);
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Resolves the handler that applies to this value, if any.
    ///
    /// The first value of a given runtime type walks the handler list in
    /// registration order; the outcome (including "none") is cached keyed by
    /// that type.
    pub fn find(&self, value: &Value) -> Option<&dyn Handler> {
        let key = TypeKey::of(value)?;

        {
            let cache = self.cache.read().unwrap_or_else(|p| p.into_inner());
            if let Some(cached) = cache.get(&key) {
                return cached.map(|idx| self.handlers[idx].as_ref());
            }
        }

        let found = self
            .handlers
            .iter()
            .position(|h| h.matches(value));
        log::debug!(
            "dispatch cache fill: {} -> {}",
            value.type_label(),
            found.map_or("no handler", |idx| self.handlers[idx].id()),
        );

        let mut cache = self.cache.write().unwrap_or_else(|p| p.into_inner());
        cache.insert(key, found);
        found.map(|idx| self.handlers[idx].as_ref())
    }

    /// Looks a handler up by its identity. Used on the deserialization side
    /// to route `handled` nodes.
    pub fn by_id(&self, id: &str) -> Option<&dyn Handler> {
        self.by_id.get(id).map(|&idx| self.handlers[idx].as_ref())
    }

    /// Drops every cached dispatch decision. Safe at any time; the next
    /// value of each type repopulates its entry.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.handlers.iter().map(|h| h.id()).collect();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &ids)
            .finish()
    }
}

type ShellFn = Box<dyn Fn() -> Value + Send + Sync>;
type RebuildFn =
    Box<dyn Fn(&IrNode, Option<&Value>, &mut Decoder<'_>) -> Result<Value> + Send + Sync>;

/// The deserialization half of a custom override, registered by origin tag.
pub struct CustomReconstructor {
    shell: Option<ShellFn>,
    rebuild: RebuildFn,
}

impl CustomReconstructor {
    /// Wraps a reconstruction function.
    pub fn new<F>(rebuild: F) -> Self
    where
        F: Fn(&IrNode, Option<&Value>, &mut Decoder<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            shell: None,
            rebuild: Box::new(rebuild),
        }
    }

    /// Adds a shell allocator, for override state that can point back at the
    /// value under reconstruction.
    pub fn with_shell<F>(mut self, shell: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.shell = Some(Box::new(shell));
        self
    }

    pub(crate) fn allocate_shell(&self) -> Option<Value> {
        self.shell.as_ref().map(|f| f())
    }

    pub(crate) fn rebuild(
        &self,
        state: &IrNode,
        shell: Option<&Value>,
        dec: &mut Decoder<'_>,
    ) -> Result<Value> {
        (self.rebuild)(state, shell, dec)
    }
}

impl std::fmt::Debug for CustomReconstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomReconstructor")
            .field("shell", &self.shell.is_some())
            .finish()
    }
}

/// Origin-tag-keyed table of custom reconstructors.
#[derive(Debug, Default)]
pub struct CustomRegistry {
    entries: HashMap<String, CustomReconstructor>,
}

impl CustomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the reconstructor consuming `custom` nodes with this origin
    /// tag.
    pub fn register(&mut self, origin: impl Into<String>, rec: CustomReconstructor) {
        self.entries.insert(origin.into(), rec);
    }

    /// Looks up the reconstructor for an origin tag.
    pub fn get(&self, origin: &str) -> Option<&CustomReconstructor> {
        self.entries.get(origin)
    }
}
