//! Capability values plugins attach to the root surface.

use crate::error::BoxError;
use crate::host::instance::RootInstance;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Callable capability body.
///
/// Receives the instance it is invoked on, so a method can emit on that
/// instance's bus or call sibling capabilities.
pub type MethodFn =
    Arc<dyn Fn(&RootInstance, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static>;

/// One member of a capability bag.
#[derive(Clone)]
pub enum Capability {
    Method(MethodFn),
    Property(Value),
}

impl Capability {
    pub fn method<F>(f: F) -> Self
    where
        F: Fn(&RootInstance, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::Method(Arc::new(f))
    }

    pub fn property(value: impl Into<Value>) -> Self {
        Self::Property(value.into())
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Self::Method(_))
    }

    pub fn as_property(&self) -> Option<&Value> {
        match self {
            Self::Property(value) => Some(value),
            Self::Method(_) => None,
        }
    }
}

impl Debug for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Method(_) => f.write_str("Method(..)"),
            Self::Property(value) => f.debug_tuple("Property").field(value).finish(),
        }
    }
}

/// Member name → capability mapping handed to `extend`.
#[derive(Debug, Clone, Default)]
pub struct CapabilityBag {
    members: BTreeMap<String, Capability>,
}

impl CapabilityBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`CapabilityBag::insert`] for methods.
    pub fn with_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RootInstance, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.insert(name, Capability::method(f));
        self
    }

    /// Builder form of [`CapabilityBag::insert`] for properties.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, Capability::property(value));
        self
    }

    /// Inserts one member, returning the value it replaced within this bag.
    pub fn insert(&mut self, name: impl Into<String>, capability: Capability) -> Option<Capability> {
        self.members.insert(name.into(), capability)
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.members.get(name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sorted member names.
    pub fn names(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Capability)> {
        self.members.iter()
    }
}

impl IntoIterator for CapabilityBag {
    type Item = (String, Capability);
    type IntoIter = std::collections::btree_map::IntoIter<String, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

/// Capability lookup and invocation failures.
#[derive(Debug)]
pub enum CapabilityError {
    UnknownNamespace(String),
    UnknownMember { namespace: String, member: String },
    NotCallable { namespace: String, member: String },
    NotAProperty { namespace: String, member: String },
    Failed {
        namespace: String,
        member: String,
        source: BoxError,
    },
}

impl Display for CapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNamespace(namespace) => write!(f, "unknown namespace: {namespace}"),
            Self::UnknownMember { namespace, member } => {
                write!(f, "unknown member: {}", qualified(namespace, member))
            }
            Self::NotCallable { namespace, member } => {
                write!(f, "member is not callable: {}", qualified(namespace, member))
            }
            Self::NotAProperty { namespace, member } => {
                write!(f, "member is not a property: {}", qualified(namespace, member))
            }
            Self::Failed {
                namespace,
                member,
                source,
            } => write!(f, "{} failed: {source}", qualified(namespace, member)),
        }
    }
}

impl Error for CapabilityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Failed { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

fn qualified(namespace: &str, member: &str) -> String {
    if namespace.is_empty() {
        member.to_string()
    } else {
        format!("{namespace}.{member}")
    }
}
