//! Namespace → capability bag registry.
//!
//! # Invariants
//! - Extension is additive; there is no removal path.
//! - A repeated namespace + member registration replaces the earlier value
//!   (last registration wins) and is logged.
//! - A rejected `extend` call leaves the registry untouched.

use crate::error::InvalidArgument;
use crate::extension::capability::{Capability, CapabilityBag};
use crate::naming::is_valid_identifier;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Key of the root surface.
pub const ROOT_NAMESPACE: &str = "";

/// Summary of one merge into the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendOutcome {
    /// Normalized namespace key (`""` for root).
    pub namespace: String,
    /// Members that did not exist before.
    pub added: Vec<String>,
    /// Members whose previous value was replaced.
    pub replaced: Vec<String>,
}

/// Merged capability surface shared by every instance of one host.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    namespaces: BTreeMap<String, BTreeMap<String, Capability>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `bag` into `namespace` (`None` or blank means root).
    ///
    /// # Errors
    /// - [`InvalidArgument::InvalidNamespace`] for a non-identifier namespace.
    /// - [`InvalidArgument::InvalidMemberName`] for a non-identifier member.
    /// - [`InvalidArgument::EmptyCapabilityBag`] when `bag` has no members.
    pub fn extend(
        &mut self,
        namespace: Option<&str>,
        bag: CapabilityBag,
    ) -> Result<ExtendOutcome, InvalidArgument> {
        let key = normalize_namespace(namespace)?;
        if bag.is_empty() {
            return Err(InvalidArgument::EmptyCapabilityBag);
        }
        if let Some(bad) = bag.names().into_iter().find(|name| !is_valid_identifier(name)) {
            return Err(InvalidArgument::InvalidMemberName(bad));
        }

        let members = self.namespaces.entry(key.clone()).or_default();
        let mut outcome = ExtendOutcome {
            namespace: key,
            added: Vec::new(),
            replaced: Vec::new(),
        };
        for (name, capability) in bag {
            if members.insert(name.clone(), capability).is_some() {
                warn!(
                    "event=extend_collision module=registry status=replaced namespace={} member={}",
                    display_namespace(&outcome.namespace),
                    name
                );
                outcome.replaced.push(name);
            } else {
                outcome.added.push(name);
            }
        }

        debug!(
            "event=extend module=registry status=ok namespace={} added={} replaced={}",
            display_namespace(&outcome.namespace),
            outcome.added.len(),
            outcome.replaced.len()
        );
        Ok(outcome)
    }

    /// Looks up one member; `namespace` is `""` for root members.
    pub fn member(&self, namespace: &str, member: &str) -> Option<&Capability> {
        self.namespaces.get(namespace)?.get(member)
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Sorted non-root namespace keys.
    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces
            .keys()
            .filter(|key| key.as_str() != ROOT_NAMESPACE)
            .cloned()
            .collect()
    }

    /// Sorted member names of one namespace; empty when it does not exist.
    pub fn members(&self, namespace: &str) -> Vec<String> {
        self.namespaces
            .get(namespace)
            .map(|members| members.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Total member count across all namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maps an optional namespace argument to its registry key.
pub fn normalize_namespace(namespace: Option<&str>) -> Result<String, InvalidArgument> {
    let Some(raw) = namespace else {
        return Ok(ROOT_NAMESPACE.to_string());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(ROOT_NAMESPACE.to_string());
    }
    if !is_valid_identifier(trimmed) {
        return Err(InvalidArgument::InvalidNamespace(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

fn display_namespace(key: &str) -> &str {
    if key.is_empty() {
        "<root>"
    } else {
        key
    }
}
