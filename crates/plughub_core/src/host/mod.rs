//! Plugin host and root instances.

pub mod initializer;
pub mod instance;
pub mod plugin_host;

use once_cell::sync::Lazy;
use plugin_host::PluginHost;

static GLOBAL_HOST: Lazy<PluginHost> = Lazy::new(PluginHost::new);

/// Process-wide host shared by every plugin loaded into this process.
///
/// Plugins written against a single application-wide root type register here
/// during start-up; embedders that need isolated registries create their own
/// [`PluginHost`] instead.
pub fn global_host() -> &'static PluginHost {
    &GLOBAL_HOST
}

#[cfg(test)]
mod tests {
    use super::global_host;
    use crate::config::InstanceConfig;
    use crate::extension::capability::CapabilityBag;
    use serde_json::json;

    #[test]
    fn global_host_is_shared_across_calls() {
        global_host()
            .extend(
                Some("globalHostProbe"),
                CapabilityBag::new().with_property("marker", 1),
            )
            .expect("extend");
        assert!(std::ptr::eq(global_host(), global_host()));

        let instance = global_host()
            .construct(InstanceConfig::default())
            .expect("construct");
        assert_eq!(
            instance.property("globalHostProbe", "marker").expect("marker"),
            json!(1)
        );
    }
}
