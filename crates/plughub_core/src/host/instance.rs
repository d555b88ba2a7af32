//! Root instance: one bus plus the merged capability surface.

use crate::bus::event_bus::{EventBus, Handler, HandlerError, HandlerResult, SubscriptionHandle};
use crate::config::InstanceConfig;
use crate::error::InvalidArgument;
use crate::extension::capability::{Capability, CapabilityError};
use crate::extension::registry::{ExtensionRegistry, ROOT_NAMESPACE};
use log::debug;
use parking_lot::RwLock;
use serde_json::Value;
use std::cell::Cell;
use std::sync::Arc;
use uuid::Uuid;

/// Construction lifecycle of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Constructing,
    InitializersRunning,
    Ready,
    Failed,
}

impl InstanceState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constructing => "constructing",
            Self::InitializersRunning => "initializers_running",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Application root object.
///
/// Capability lookups go through the host's shared registry, so members added
/// by a later `extend` call are visible on instances that already exist.
#[derive(Debug)]
pub struct RootInstance {
    id: Uuid,
    config: InstanceConfig,
    bus: EventBus,
    surface: Arc<RwLock<ExtensionRegistry>>,
    state: Cell<InstanceState>,
}

impl RootInstance {
    pub(crate) fn new(config: InstanceConfig, surface: Arc<RwLock<ExtensionRegistry>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            bus: EventBus::new(),
            surface,
            state: Cell::new(InstanceState::Constructing),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.config.setting(key)
    }

    pub fn state(&self) -> InstanceState {
        self.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state.get() == InstanceState::Ready
    }

    /// Moves the lifecycle forward; terminal states are never left.
    pub(crate) fn advance(&self, next: InstanceState) {
        let current = self.state.get();
        if current.is_terminal() {
            return;
        }
        debug!(
            "event=instance_state module=host status=ok instance_id={} from={} to={}",
            self.id,
            current.as_str(),
            next.as_str()
        );
        self.state.set(next);
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(
        &self,
        event: &str,
        handler: Handler,
    ) -> Result<SubscriptionHandle, InvalidArgument> {
        self.bus.subscribe(event, handler)
    }

    pub fn on<F>(&self, event: &str, f: F) -> Result<SubscriptionHandle, InvalidArgument>
    where
        F: Fn(&EventBus, &[Value]) -> HandlerResult + 'static,
    {
        self.bus.on(event, f)
    }

    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> usize {
        self.bus.unsubscribe(handle)
    }

    pub fn emit(&self, event: &str, args: &[Value]) -> Result<usize, HandlerError> {
        self.bus.emit(event, args)
    }

    /// Returns whether a non-root namespace exists.
    pub fn has_namespace(&self, namespace: &str) -> bool {
        namespace != ROOT_NAMESPACE && self.surface.read().has_namespace(namespace)
    }

    /// Returns whether `namespace.member` exists; `""` addresses root members.
    pub fn has_member(&self, namespace: &str, member: &str) -> bool {
        self.surface.read().member(namespace, member).is_some()
    }

    /// Sorted non-root namespaces.
    pub fn namespaces(&self) -> Vec<String> {
        self.surface.read().namespaces()
    }

    /// Sorted root member names.
    pub fn root_members(&self) -> Vec<String> {
        self.surface.read().members(ROOT_NAMESPACE)
    }

    /// Borrowed view over one namespace, if it exists.
    pub fn namespace(&self, namespace: &str) -> Option<NamespaceView<'_>> {
        if !self.has_namespace(namespace) {
            return None;
        }
        Some(NamespaceView {
            instance: self,
            namespace: namespace.to_string(),
        })
    }

    /// Calls `namespace.member(args)`; `""` addresses root members.
    pub fn call(
        &self,
        namespace: &str,
        member: &str,
        args: &[Value],
    ) -> Result<Value, CapabilityError> {
        match self.lookup(namespace, member)? {
            Capability::Method(method) => {
                method(self, args).map_err(|source| CapabilityError::Failed {
                    namespace: namespace.to_string(),
                    member: member.to_string(),
                    source,
                })
            }
            Capability::Property(_) => Err(CapabilityError::NotCallable {
                namespace: namespace.to_string(),
                member: member.to_string(),
            }),
        }
    }

    /// Calls a root-level method.
    pub fn call_root(&self, member: &str, args: &[Value]) -> Result<Value, CapabilityError> {
        self.call(ROOT_NAMESPACE, member, args)
    }

    /// Reads a property value; `""` addresses root members.
    pub fn property(&self, namespace: &str, member: &str) -> Result<Value, CapabilityError> {
        match self.lookup(namespace, member)? {
            Capability::Property(value) => Ok(value),
            Capability::Method(_) => Err(CapabilityError::NotAProperty {
                namespace: namespace.to_string(),
                member: member.to_string(),
            }),
        }
    }

    // The capability is cloned so no lock is held while user code runs.
    fn lookup(&self, namespace: &str, member: &str) -> Result<Capability, CapabilityError> {
        let surface = self.surface.read();
        if let Some(capability) = surface.member(namespace, member) {
            return Ok(capability.clone());
        }
        if namespace != ROOT_NAMESPACE && !surface.has_namespace(namespace) {
            return Err(CapabilityError::UnknownNamespace(namespace.to_string()));
        }
        Err(CapabilityError::UnknownMember {
            namespace: namespace.to_string(),
            member: member.to_string(),
        })
    }
}

/// `instance.<namespace>` accessor.
#[derive(Debug)]
pub struct NamespaceView<'a> {
    instance: &'a RootInstance,
    namespace: String,
}

impl NamespaceView<'_> {
    pub fn name(&self) -> &str {
        &self.namespace
    }

    pub fn has(&self, member: &str) -> bool {
        self.instance.has_member(&self.namespace, member)
    }

    pub fn members(&self) -> Vec<String> {
        self.instance.surface.read().members(&self.namespace)
    }

    pub fn call(&self, member: &str, args: &[Value]) -> Result<Value, CapabilityError> {
        self.instance.call(&self.namespace, member, args)
    }

    pub fn property(&self, member: &str) -> Result<Value, CapabilityError> {
        self.instance.property(&self.namespace, member)
    }
}
