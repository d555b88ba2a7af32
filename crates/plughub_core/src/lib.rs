//! In-process publish/subscribe bus with plugin composition.
//!
//! A [`PluginHost`] collects capability bags and initializers from plugins,
//! then builds [`RootInstance`]s that each own an [`EventBus`] and see the
//! merged capability surface. Construction runs every initializer in
//! registration order and finishes by emitting [`INIT_EVENT`] once.

pub mod bus;
pub mod config;
pub mod error;
pub mod extension;
pub mod host;
pub mod logging;
mod naming;

pub use bus::event_bus::{
    handler, EventBus, Handler, HandlerError, HandlerResult, SubscriptionHandle,
};
pub use config::{ConfigError, InstanceConfig};
pub use error::{BoxError, InvalidArgument};
pub use extension::capability::{Capability, CapabilityBag, CapabilityError, MethodFn};
pub use extension::descriptor::{
    DataTypeSpec, DescriptorError, EventSpec, MethodSpec, ParamSpec, PluginDescriptor,
};
pub use extension::registry::{ExtendOutcome, ExtensionRegistry, ROOT_NAMESPACE};
pub use host::global_host;
pub use host::initializer::{InitializationError, Initializer, InitializerFn, InitializerQueue};
pub use host::instance::{InstanceState, NamespaceView, RootInstance};
pub use host::plugin_host::{HostError, Plugin, PluginHost, INIT_EVENT};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
