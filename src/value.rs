//! The dynamic value model the engine operates on.
//!
//! A [`Value`] is the Rust rendition of "any object reachable from the root
//! being serialized": scalars are plain value types, containers are shared
//! reference-counted cells (so aliasing and cycles are first-class), and
//! live runtime objects that have no meaningful byte representation on their
//! own — sockets, locks, pool handles — ride behind the [`Resource`] trait.
//!
//! The engine never mutates a value during serialization; it only takes
//! immutable borrows of the container cells.
//!
//! ## Identity
//!
//! Two `Value`s are *the same object* when they share the same `Rc`
//! allocation. Only containers, resources and reconnectors have identity;
//! scalars are assumed immutable and are copied freely.
//!
//! ## Custom overrides
//!
//! A resource that wants to bypass generic handler dispatch implements
//! [`CustomState`] and exposes it through [`Resource::as_custom`]. The
//! capability is resolved by a single virtual call, not reflection: either
//! the type wired the override in, or it did not.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::ir::{IrNode, Scalar};
use crate::reconnect::Reconnector;

/// A live runtime object managed by handler dispatch.
pub trait Resource: Any {
    /// Downcast hook for handlers and callers.
    fn as_any(&self) -> &dyn Any;

    /// Runtime type label, used in diagnostics, path trails and opaque
    /// nodes.
    fn type_name(&self) -> &'static str;

    /// The custom-override capability check. A type that provides its own
    /// serialize/deserialize path returns `Some(self)` here; everything else
    /// inherits the default and goes through generic handler dispatch.
    fn as_custom(&self) -> Option<&dyn CustomState> {
        None
    }
}

/// A type-provided alternate serialization path that bypasses generic
/// handlers.
///
/// The deserialization counterpart is registered on the engine by origin
/// tag; see `StasisBuilder::custom`.
pub trait CustomState {
    /// Origin type tag. Must match a reconstructor registered on the engine
    /// that will consume this node.
    fn origin(&self) -> &'static str;

    /// Extracts the override's state. Child values are lowered through the
    /// provided encoder so shared structure inside the state still
    /// participates in identity tracking.
    fn capture(&self, enc: &mut crate::encode::Encoder<'_>) -> Result<IrNode>;
}

/// Any object reachable from a serialization root.
#[derive(Clone)]
pub enum Value {
    /// The absent value.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Float scalar.
    Float(f64),
    /// Text scalar.
    Str(String),
    /// Byte-string scalar.
    Bytes(Vec<u8>),
    /// A shared, ordered sequence cell.
    List(Rc<RefCell<Vec<Value>>>),
    /// A shared, string-keyed mapping cell.
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
    /// A live runtime object behind handler dispatch.
    Resource(Rc<dyn Resource>),
    /// An inert placeholder for a resource that could not be reconstructed.
    Reconnector(Rc<Reconnector>),
}

impl Value {
    /// Builds a fresh list cell from the given items.
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    /// Builds a fresh empty list cell.
    pub fn empty_list() -> Self {
        Self::list(Vec::new())
    }

    /// Builds a fresh mapping cell from the given entries.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// Builds a fresh empty mapping cell.
    pub fn empty_map() -> Self {
        Self::Map(Rc::new(RefCell::new(BTreeMap::new())))
    }

    /// Builds a text scalar.
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Builds a byte-string scalar.
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(b.into())
    }

    /// Wraps a live object as a resource value.
    pub fn resource<R: Resource>(r: R) -> Self {
        Self::Resource(Rc::new(r))
    }

    /// Downcasts a resource value to a concrete payload type.
    pub fn as_resource<R: Any>(&self) -> Option<&R> {
        match self {
            Self::Resource(r) => r.as_any().downcast_ref::<R>(),
            _ => None,
        }
    }

    /// Returns the reconnector placeholder held by this value, if it is one.
    pub fn as_reconnector(&self) -> Option<&Rc<Reconnector>> {
        match self {
            Self::Reconnector(rc) => Some(rc),
            _ => None,
        }
    }

    /// Returns the list cell, if this value is a list.
    pub fn as_list(&self) -> Option<&Rc<RefCell<Vec<Value>>>> {
        match self {
            Self::List(cell) => Some(cell),
            _ => None,
        }
    }

    /// Returns the mapping cell, if this value is a map.
    pub fn as_map(&self) -> Option<&Rc<RefCell<BTreeMap<String, Value>>>> {
        match self {
            Self::Map(cell) => Some(cell),
            _ => None,
        }
    }

    /// Clones out the element at `index`, if this value is a list.
    pub fn index(&self, index: usize) -> Option<Value> {
        self.as_list().and_then(|c| c.borrow().get(index).cloned())
    }

    /// Clones out the entry under `key`, if this value is a map.
    pub fn key(&self, key: &str) -> Option<Value> {
        self.as_map().and_then(|c| c.borrow().get(key).cloned())
    }

    /// Returns the integer payload of an `Int` scalar.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text payload of a `Str` scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the scalar payload, if this value is atomic.
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Null => Some(Scalar::Null),
            Self::Bool(b) => Some(Scalar::Bool(*b)),
            Self::Int(i) => Some(Scalar::Int(*i)),
            Self::Float(x) => Some(Scalar::Float(*x)),
            Self::Str(s) => Some(Scalar::Str(s.clone())),
            Self::Bytes(b) => Some(Scalar::Bytes(b.clone())),
            _ => None,
        }
    }

    /// The runtime type label used in path trails and diagnostics.
    pub fn type_label(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Resource(r) => r.type_name(),
            Self::Reconnector(rc) => rc.type_tag(),
        }
    }

    /// The identity address of this value: the `Rc` allocation, for the
    /// variants that have one.
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            Self::List(cell) => Some(Rc::as_ptr(cell) as usize),
            Self::Map(cell) => Some(Rc::as_ptr(cell) as usize),
            Self::Resource(r) => Some(Rc::as_ptr(r) as *const () as usize),
            Self::Reconnector(rc) => Some(Rc::as_ptr(rc) as usize),
            _ => None,
        }
    }

    /// True when both values are the same object (same `Rc` allocation).
    /// Always false for scalars, which have no identity.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Structural equality.
///
/// Containers compare element-wise after an identity fast path; resources
/// and reconnectors compare by identity only. Not safe on cyclic graphs —
/// compare identities (`ptr_eq`) there instead.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => *a.borrow() == *b.borrow(),
            (Self::Map(a), Self::Map(b)) => *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Bytes(b) => write!(f, "Bytes(len={})", b.len()),
            // Shallow on purpose: cyclic graphs must stay printable.
            Self::List(cell) => write!(f, "List(len={})", cell.borrow().len()),
            Self::Map(cell) => write!(f, "Map(len={})", cell.borrow().len()),
            Self::Resource(r) => write!(f, "Resource({})", r.type_name()),
            Self::Reconnector(rc) => write!(f, "Reconnector({})", rc.type_tag()),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Null => Self::Null,
            Scalar::Bool(b) => Self::Bool(b),
            Scalar::Int(i) => Self::Int(i),
            Scalar::Float(x) => Self::Float(x),
            Scalar::Str(s) => Self::Str(s),
            Scalar::Bytes(b) => Self::Bytes(b),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
