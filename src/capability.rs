//! # Capability Table
//!
//! Host code extends every per-request context with named capabilities:
//! methods (invoked with the context as receiver) or accessor pairs (a
//! computed property with an optional getter and setter).
//!
//! Both context variants, [`HttpContext`](crate::context::HttpContext) and
//! [`WebSocketContext`](crate::context::WebSocketContext), resolve capabilities
//! through the same table, so their add-on surfaces never drift apart.
//!
//! Names are unique for the lifetime of the application. A duplicate is a
//! [`ConfigurationError`] raised by [`CapabilityTable::register`] during setup,
//! never at call time. Built-in context members are reserved and count as
//! already present.
//!
//! The table lives inside the [`App`](crate::app::App). Once the app is warmed
//! up it is only reachable through `&App`, which freezes it.
//!
//! ```rust
//! use serde_json::{json, Value};
//! use switchyard::capability::{Capability, CapabilityTable};
//!
//! let mut table = CapabilityTable::new();
//! table
//!     .register("title", Capability::method(|_ctx, _args| Ok(json!("Welcome"))))
//!     .unwrap();
//! assert!(table.register("title", Capability::method(|_, _| Ok(Value::Null))).is_err());
//! ```

use crate::context::Context;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Method capability: receives the context and positional arguments.
pub type MethodFn = Arc<dyn Fn(&mut dyn Context, &[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Getter half of an accessor capability.
pub type GetterFn = Arc<dyn Fn(&dyn Context) -> anyhow::Result<Value> + Send + Sync>;

/// Setter half of an accessor capability.
pub type SetterFn = Arc<dyn Fn(&mut dyn Context, Value) -> anyhow::Result<()> + Send + Sync>;

/// Names of built-in context members. Registering any of these fails.
pub const RESERVED_NAMES: &[&str] = &[
    "app",
    "call",
    "exception",
    "get",
    "is_websocket",
    "not_found",
    "params",
    "render",
    "req",
    "request_id",
    "res",
    "set",
    "socket",
    "stash",
];

/// Kind of a registered capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    Method,
    AccessorPair,
}

/// A capability implementation.
#[derive(Clone)]
pub enum Capability {
    Method(MethodFn),
    Accessor {
        get: Option<GetterFn>,
        set: Option<SetterFn>,
    },
}

impl Capability {
    pub fn method<F>(f: F) -> Self
    where
        F: Fn(&mut dyn Context, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Capability::Method(Arc::new(f))
    }

    /// Read-only computed property.
    pub fn getter<G>(get: G) -> Self
    where
        G: Fn(&dyn Context) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Capability::Accessor {
            get: Some(Arc::new(get)),
            set: None,
        }
    }

    /// Computed property with both halves.
    pub fn accessor<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&dyn Context) -> anyhow::Result<Value> + Send + Sync + 'static,
        S: Fn(&mut dyn Context, Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Capability::Accessor {
            get: Some(Arc::new(get)),
            set: Some(Arc::new(set)),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Capability::Method(_) => CapabilityKind::Method,
            Capability::Accessor { .. } => CapabilityKind::AccessorPair,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Method(_) => f.write_str("Capability::Method"),
            Capability::Accessor { get, set } => f
                .debug_struct("Capability::Accessor")
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .finish(),
        }
    }
}

/// Setup-time configuration failure. Fatal: startup should abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The name is already registered on the context surface
    NameCollision { name: String },
    /// The name belongs to a built-in context member
    ReservedName { name: String },
    /// An accessor was registered without getter or setter
    EmptyAccessor { name: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::NameCollision { name } => {
                write!(f, "The name \"{name}\" is already used by a context capability")
            }
            ConfigurationError::ReservedName { name } => {
                write!(f, "The name \"{name}\" is a built-in context member")
            }
            ConfigurationError::EmptyAccessor { name } => {
                write!(f, "Accessor \"{name}\" needs a getter or a setter")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Request-time failure resolving or invoking a capability.
#[derive(Debug)]
pub enum CapabilityError {
    Unknown { name: String },
    NotAMethod { name: String },
    NotAnAccessor { name: String },
    NotReadable { name: String },
    NotWritable { name: String },
    Failed { name: String, source: anyhow::Error },
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityError::Unknown { name } => write!(f, "no capability named \"{name}\""),
            CapabilityError::NotAMethod { name } => write!(f, "capability \"{name}\" is not a method"),
            CapabilityError::NotAnAccessor { name } => {
                write!(f, "capability \"{name}\" is not an accessor")
            }
            CapabilityError::NotReadable { name } => write!(f, "capability \"{name}\" has no getter"),
            CapabilityError::NotWritable { name } => write!(f, "capability \"{name}\" has no setter"),
            CapabilityError::Failed { name, source } => {
                write!(f, "capability \"{name}\" failed: {source}")
            }
        }
    }
}

impl std::error::Error for CapabilityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CapabilityError::Failed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Registry mapping capability names to implementations.
#[derive(Default, Clone)]
pub struct CapabilityTable {
    entries: HashMap<String, Capability>,
    order: Vec<String>,
}

impl CapabilityTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a capability on both context variants.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError`] if the name is reserved or already registered.
    /// The table is left unchanged on error.
    pub fn register(
        &mut self,
        name: &str,
        capability: Capability,
    ) -> Result<(), ConfigurationError> {
        if RESERVED_NAMES.contains(&name) {
            return Err(ConfigurationError::ReservedName {
                name: name.to_string(),
            });
        }
        if self.entries.contains_key(name) {
            return Err(ConfigurationError::NameCollision {
                name: name.to_string(),
            });
        }
        if let Capability::Accessor {
            get: None,
            set: None,
        } = capability
        {
            return Err(ConfigurationError::EmptyAccessor {
                name: name.to_string(),
            });
        }

        debug!(capability = %name, kind = ?capability.kind(), "Capability registered");
        self.entries.insert(name.to_string(), capability);
        self.order.push(name.to_string());
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        RESERVED_NAMES.contains(&name) || self.entries.contains_key(name)
    }

    /// Registered names and kinds, in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = (&str, CapabilityKind)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|cap| (name.as_str(), cap.kind())))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn method(&self, name: &str) -> Result<MethodFn, CapabilityError> {
        match self.entries.get(name) {
            Some(Capability::Method(f)) => Ok(Arc::clone(f)),
            Some(_) => Err(CapabilityError::NotAMethod {
                name: name.to_string(),
            }),
            None => Err(CapabilityError::Unknown {
                name: name.to_string(),
            }),
        }
    }

    pub(crate) fn getter(&self, name: &str) -> Result<GetterFn, CapabilityError> {
        match self.entries.get(name) {
            Some(Capability::Accessor { get: Some(g), .. }) => Ok(Arc::clone(g)),
            Some(Capability::Accessor { get: None, .. }) => Err(CapabilityError::NotReadable {
                name: name.to_string(),
            }),
            Some(Capability::Method(_)) => Err(CapabilityError::NotAnAccessor {
                name: name.to_string(),
            }),
            None => Err(CapabilityError::Unknown {
                name: name.to_string(),
            }),
        }
    }

    pub(crate) fn setter(&self, name: &str) -> Result<SetterFn, CapabilityError> {
        match self.entries.get(name) {
            Some(Capability::Accessor { set: Some(s), .. }) => Ok(Arc::clone(s)),
            Some(Capability::Accessor { set: None, .. }) => Err(CapabilityError::NotWritable {
                name: name.to_string(),
            }),
            Some(Capability::Method(_)) => Err(CapabilityError::NotAnAccessor {
                name: name.to_string(),
            }),
            None => Err(CapabilityError::Unknown {
                name: name.to_string(),
            }),
        }
    }
}
