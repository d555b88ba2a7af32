//! Plugin host: extension registry, initializer queue and construction.
//!
//! # Responsibility
//! - Accept `extend`/`register_initializer` calls from plugins in load order.
//! - Build root instances and drive their one-time startup sequence.
//!
//! # Invariants
//! - Initializers run synchronously, in registration order, before `init`.
//! - The first initializer error aborts construction: later initializers do
//!   not run and `init` is not emitted.
//! - `init` is emitted with no arguments exactly once per constructed
//!   instance.
//! - No host lock is held while plugin code runs.

use crate::bus::event_bus::HandlerError;
use crate::config::InstanceConfig;
use crate::error::{BoxError, InvalidArgument};
use crate::extension::capability::CapabilityBag;
use crate::extension::descriptor::{DescriptorError, PluginDescriptor};
use crate::extension::registry::{ExtendOutcome, ExtensionRegistry};
use crate::host::initializer::{InitializationError, InitializerQueue};
use crate::host::instance::{InstanceState, RootInstance};
use log::{error, info};
use parking_lot::RwLock;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Lifecycle event emitted once startup finishes.
pub const INIT_EVENT: &str = "init";

/// Independently loaded unit that extends a host.
///
/// `register` is called once at load time and typically calls
/// [`PluginHost::extend`] and [`PluginHost::register_initializer`].
pub trait Plugin {
    fn name(&self) -> &str;

    fn register(&self, host: &PluginHost) -> Result<(), HostError>;

    /// Optional documentation for generated docs.
    fn descriptor(&self) -> Option<PluginDescriptor> {
        None
    }
}

/// Shared extension surface plus startup queue.
#[derive(Debug, Default)]
pub struct PluginHost {
    surface: Arc<RwLock<ExtensionRegistry>>,
    initializers: RwLock<InitializerQueue>,
    descriptors: RwLock<Vec<PluginDescriptor>>,
    loaded: RwLock<Vec<String>>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `capabilities` into the shared surface.
    ///
    /// `None` or a blank namespace attaches members to the root surface.
    /// Repeated namespace + member registrations are last-wins.
    pub fn extend(
        &self,
        namespace: Option<&str>,
        capabilities: CapabilityBag,
    ) -> Result<ExtendOutcome, InvalidArgument> {
        self.surface.write().extend(namespace, capabilities)
    }

    /// Appends a named initializer; returns its order index.
    pub fn register_initializer<F>(
        &self,
        name: impl Into<String>,
        initializer: F,
    ) -> Result<usize, InvalidArgument>
    where
        F: Fn(&RootInstance) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.initializers.write().push(name, initializer)
    }

    /// Stores a validated descriptor; one per plugin id.
    pub fn describe(&self, descriptor: PluginDescriptor) -> Result<(), DescriptorError> {
        let mut descriptors = self.descriptors.write();
        check_descriptor(&descriptors, &descriptor)?;
        descriptors.push(descriptor);
        Ok(())
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.descriptors.read().clone()
    }

    /// Loads one plugin: runs its registration and stores its descriptor.
    ///
    /// The descriptor is checked before `register` runs, so a plugin with a
    /// rejected descriptor leaves the host untouched.
    pub fn load_plugin(&self, plugin: &dyn Plugin) -> Result<(), HostError> {
        let name = plugin.name().to_string();
        let descriptor = plugin.descriptor();
        if let Some(descriptor) = &descriptor {
            if let Err(err) = check_descriptor(&self.descriptors.read(), descriptor) {
                error!("event=plugin_load module=host status=error plugin={name} error={err}");
                return Err(err.into());
            }
        }
        if let Err(err) = plugin.register(self) {
            error!("event=plugin_load module=host status=error plugin={name} error={err}");
            return Err(err);
        }
        if let Some(descriptor) = descriptor {
            self.describe(descriptor)?;
        }
        info!("event=plugin_load module=host status=ok plugin={name}");
        self.loaded.write().push(name);
        Ok(())
    }

    /// Loads plugins in the given order, stopping at the first failure.
    pub fn load_plugins(&self, plugins: &[&dyn Plugin]) -> Result<(), HostError> {
        for plugin in plugins {
            self.load_plugin(*plugin)?;
        }
        Ok(())
    }

    /// Names of loaded plugins in load order.
    pub fn loaded_plugins(&self) -> Vec<String> {
        self.loaded.read().clone()
    }

    /// Initializer names in execution order.
    pub fn initializer_names(&self) -> Vec<String> {
        self.initializers.read().names()
    }

    /// Sorted non-root namespaces currently registered.
    pub fn namespaces(&self) -> Vec<String> {
        self.surface.read().namespaces()
    }

    /// Builds a new instance and runs its startup sequence.
    ///
    /// # Errors
    /// - [`HostError::Initialization`] when an initializer fails; the
    ///   instance is discarded in the `Failed` state.
    /// - [`HostError::Handler`] when an `init` handler fails.
    pub fn construct(&self, config: InstanceConfig) -> Result<RootInstance, HostError> {
        let instance = RootInstance::new(config, Arc::clone(&self.surface));
        let queue = self.initializers.read().snapshot();

        instance.advance(InstanceState::InitializersRunning);
        for (index, initializer) in queue.iter().enumerate() {
            if let Err(source) = initializer.run(&instance) {
                instance.advance(InstanceState::Failed);
                error!(
                    "event=construct module=host status=error instance_id={} initializer={} index={index} error={source}",
                    instance.id(),
                    initializer.name()
                );
                return Err(HostError::Initialization(InitializationError {
                    instance_id: instance.id(),
                    index,
                    name: initializer.name().to_string(),
                    source,
                }));
            }
        }

        instance.advance(InstanceState::Ready);
        if let Err(err) = instance.emit(INIT_EVENT, &[]) {
            error!(
                "event=construct module=host status=error instance_id={} stage=init error={err}",
                instance.id()
            );
            return Err(HostError::Handler(err));
        }

        info!(
            "event=construct module=host status=ok instance_id={} initializers={}",
            instance.id(),
            queue.len()
        );
        Ok(instance)
    }
}

fn check_descriptor(
    existing: &[PluginDescriptor],
    descriptor: &PluginDescriptor,
) -> Result<(), DescriptorError> {
    descriptor.validate()?;
    if existing.iter().any(|known| known.plugin == descriptor.plugin) {
        return Err(DescriptorError::DuplicatePlugin(descriptor.plugin.clone()));
    }
    Ok(())
}

/// Host-level failures.
#[derive(Debug)]
pub enum HostError {
    InvalidArgument(InvalidArgument),
    Initialization(InitializationError),
    Handler(HandlerError),
    Descriptor(DescriptorError),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(err) => write!(f, "invalid argument: {err}"),
            Self::Initialization(err) => write!(f, "initialization failed: {err}"),
            Self::Handler(err) => write!(f, "event handler failed: {err}"),
            Self::Descriptor(err) => write!(f, "invalid descriptor: {err}"),
        }
    }
}

impl Error for HostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(err) => Some(err),
            Self::Initialization(err) => Some(err),
            Self::Handler(err) => Some(err),
            Self::Descriptor(err) => Some(err),
        }
    }
}

impl From<InvalidArgument> for HostError {
    fn from(err: InvalidArgument) -> Self {
        Self::InvalidArgument(err)
    }
}

impl From<InitializationError> for HostError {
    fn from(err: InitializationError) -> Self {
        Self::Initialization(err)
    }
}

impl From<HandlerError> for HostError {
    fn from(err: HandlerError) -> Self {
        Self::Handler(err)
    }
}

impl From<DescriptorError> for HostError {
    fn from(err: DescriptorError) -> Self {
        Self::Descriptor(err)
    }
}
