//! Extension surface contracts.
//!
//! Plugins contribute capability bags to a shared registry, either at the root
//! or under a namespace, and may ship a descriptor that documents them.

pub mod capability;
pub mod descriptor;
pub mod registry;
