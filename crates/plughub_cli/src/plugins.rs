//! Sample plugins wired into the demo host.

use plughub_core::{
    BoxError, CapabilityBag, EventSpec, HostError, MethodSpec, ParamSpec, Plugin,
    PluginDescriptor, PluginHost, INIT_EVENT,
};
use serde_json::{json, Value};

pub const READY_EVENT: &str = "status:ready";

fn number_arg(args: &[Value], index: usize) -> Result<f64, BoxError> {
    args.get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("argument {index} must be a number").into())
}

/// `instance.math.*` arithmetic helpers.
pub struct MathPlugin;

impl Plugin for MathPlugin {
    fn name(&self) -> &str {
        "math"
    }

    fn register(&self, host: &PluginHost) -> Result<(), HostError> {
        host.extend(
            Some("math"),
            CapabilityBag::new()
                .with_method("add", |_instance, args| {
                    let sum = number_arg(args, 0)? + number_arg(args, 1)?;
                    Ok(json!(sum))
                })
                .with_method("multiply", |_instance, args| {
                    let product = number_arg(args, 0)? * number_arg(args, 1)?;
                    Ok(json!(product))
                }),
        )?;
        Ok(())
    }

    fn descriptor(&self) -> Option<PluginDescriptor> {
        let numbers = vec![ParamSpec::new("a", "number"), ParamSpec::new("b", "number")];
        let mut descriptor = PluginDescriptor::new("math", "Arithmetic helpers.");
        for (name, description) in [("add", "Returns a + b."), ("multiply", "Returns a * b.")] {
            descriptor.methods.push(MethodSpec {
                name: name.to_string(),
                description: description.to_string(),
                params: numbers.clone(),
                returns: Some("number".to_string()),
                callback: None,
            });
        }
        Some(descriptor)
    }
}

/// Root-level `status()` plus a `status:ready` announcement after `init`.
pub struct StatusPlugin;

impl Plugin for StatusPlugin {
    fn name(&self) -> &str {
        "status"
    }

    fn register(&self, host: &PluginHost) -> Result<(), HostError> {
        host.extend(
            None,
            CapabilityBag::new().with_method("status", |instance, _args| {
                Ok(json!({
                    "id": instance.id().to_string(),
                    "name": instance.config().name,
                    "state": instance.state().as_str(),
                    "namespaces": instance.namespaces(),
                }))
            }),
        )?;
        host.register_initializer("status.announce", |instance| {
            let label = instance
                .config()
                .name
                .clone()
                .unwrap_or_else(|| "plughub".to_string());
            instance.on(INIT_EVENT, move |bus, _args| {
                bus.emit(READY_EVENT, &[json!(label)])?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    }

    fn descriptor(&self) -> Option<PluginDescriptor> {
        let mut descriptor = PluginDescriptor::new("status", "Instance status reporting.");
        descriptor.methods.push(MethodSpec {
            name: "status".to_string(),
            description: "Describes the instance and its namespaces.".to_string(),
            params: vec![],
            returns: Some("object".to_string()),
            callback: None,
        });
        descriptor.events.push(EventSpec {
            name: READY_EVENT.to_string(),
            description: "Emitted once after `init`.".to_string(),
            args: vec![ParamSpec::new("name", "string")],
        });
        Some(descriptor)
    }
}

/// Loads the sample plugins in their fixed order.
pub fn load_all(host: &PluginHost) -> Result<(), HostError> {
    host.load_plugins(&[&MathPlugin, &StatusPlugin])
}
