//! Shared error taxonomy for bus and host call sites.
//!
//! # Invariants
//! - Argument validation failures are returned synchronously at the call site.
//! - Failures raised by user callbacks are carried as [`BoxError`] so plugins
//!   can use `?` with any error type.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Boxed error returned by handlers, initializers and capability methods.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Malformed subscribe/extend/register calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidArgument {
    EmptyEventName,
    InvalidNamespace(String),
    InvalidMemberName(String),
    EmptyCapabilityBag,
    EmptyInitializerName,
}

impl Display for InvalidArgument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEventName => write!(f, "event name must not be empty"),
            Self::InvalidNamespace(value) => write!(f, "namespace is invalid: {value}"),
            Self::InvalidMemberName(value) => write!(f, "member name is invalid: {value}"),
            Self::EmptyCapabilityBag => write!(f, "capability bag must not be empty"),
            Self::EmptyInitializerName => write!(f, "initializer name must not be empty"),
        }
    }
}

impl Error for InvalidArgument {}
