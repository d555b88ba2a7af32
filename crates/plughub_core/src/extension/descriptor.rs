//! Declarative plugin descriptor and documentation rendering.
//!
//! A descriptor documents what a plugin exposes: methods, emitted events and
//! custom data types. It is documentation metadata only; the bus never consults
//! it when dispatching events or calling capabilities.

use crate::naming::{is_valid_identifier, is_valid_plugin_id};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter, Write as _};

/// Plugin description with the stable `{plugin, description, methods, events,
/// datatypes}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin id, e.g. `media.player`.
    pub plugin: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
    #[serde(default)]
    pub events: Vec<EventSpec>,
    /// Custom data types keyed by type name.
    #[serde(default)]
    pub datatypes: BTreeMap<String, DataTypeSpec>,
}

/// One exposed method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    /// Arguments passed to the completion callback, when the method takes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<Vec<ParamSpec>>,
}

/// Named, typed parameter or event argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// One emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub args: Vec<ParamSpec>,
}

/// Custom data type exposed by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataTypeSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
    #[serde(default)]
    pub events: Vec<EventSpec>,
}

impl PluginDescriptor {
    pub fn new(plugin: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            description: description.into(),
            methods: Vec::new(),
            events: Vec::new(),
            datatypes: BTreeMap::new(),
        }
    }

    /// Parses a descriptor from its JSON form.
    pub fn from_json_str(raw: &str) -> Result<Self, DescriptorError> {
        serde_json::from_str(raw).map_err(|err| DescriptorError::Parse(err.to_string()))
    }

    /// Serializes the descriptor to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, DescriptorError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| DescriptorError::Serialize(err.to_string()))
    }

    /// Validates structural invariants of the document itself.
    ///
    /// Checks the plugin id, method/event name uniqueness per owner and that
    /// every parameter carries a name and a type.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let plugin = self.plugin.trim();
        if plugin.is_empty() {
            return Err(DescriptorError::EmptyPluginId);
        }
        if !is_valid_plugin_id(plugin) {
            return Err(DescriptorError::InvalidPluginId(self.plugin.clone()));
        }

        validate_members(plugin, &self.methods, &self.events)?;
        for (type_name, datatype) in &self.datatypes {
            if !is_valid_identifier(type_name) {
                return Err(DescriptorError::InvalidName(type_name.clone()));
            }
            validate_members(type_name, &datatype.methods, &datatype.events)?;
        }
        Ok(())
    }

    /// Renders human-readable Markdown documentation.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}", self.plugin);
        if !self.description.is_empty() {
            let _ = writeln!(out, "\n{}", self.description);
        }
        render_members(&mut out, "##", &self.methods, &self.events);

        if !self.datatypes.is_empty() {
            let _ = writeln!(out, "\n## Data types");
            for (type_name, datatype) in &self.datatypes {
                let _ = writeln!(out, "\n### {type_name}");
                if !datatype.description.is_empty() {
                    let _ = writeln!(out, "\n{}", datatype.description);
                }
                render_members(&mut out, "####", &datatype.methods, &datatype.events);
            }
        }
        out
    }
}

fn validate_members(
    owner: &str,
    methods: &[MethodSpec],
    events: &[EventSpec],
) -> Result<(), DescriptorError> {
    let mut seen = BTreeSet::new();
    for method in methods {
        if !is_valid_identifier(&method.name) {
            return Err(DescriptorError::InvalidName(method.name.clone()));
        }
        if !seen.insert(method.name.as_str()) {
            return Err(DescriptorError::DuplicateMethod {
                owner: owner.to_string(),
                name: method.name.clone(),
            });
        }
        validate_params(&method.name, &method.params)?;
        if let Some(callback) = &method.callback {
            validate_params(&method.name, callback)?;
        }
    }

    let mut seen = BTreeSet::new();
    for event in events {
        if event.name.trim().is_empty() {
            return Err(DescriptorError::InvalidName(event.name.clone()));
        }
        if !seen.insert(event.name.as_str()) {
            return Err(DescriptorError::DuplicateEvent {
                owner: owner.to_string(),
                name: event.name.clone(),
            });
        }
        validate_params(&event.name, &event.args)?;
    }
    Ok(())
}

fn validate_params(owner: &str, params: &[ParamSpec]) -> Result<(), DescriptorError> {
    for param in params {
        if param.name.trim().is_empty() || param.ty.trim().is_empty() {
            return Err(DescriptorError::IncompleteParam(owner.to_string()));
        }
    }
    Ok(())
}

fn render_members(out: &mut String, heading: &str, methods: &[MethodSpec], events: &[EventSpec]) {
    if !methods.is_empty() {
        let _ = writeln!(out, "\n{heading} Methods\n");
        for method in methods {
            let _ = write!(out, "- `{}({})`", method.name, render_params(&method.params));
            if let Some(returns) = &method.returns {
                let _ = write!(out, " -> `{returns}`");
            }
            if !method.description.is_empty() {
                let _ = write!(out, ": {}", method.description);
            }
            out.push('\n');
            if let Some(callback) = &method.callback {
                let _ = writeln!(out, "  - callback: `({})`", render_params(callback));
            }
        }
    }

    if !events.is_empty() {
        let _ = writeln!(out, "\n{heading} Events\n");
        for event in events {
            let _ = write!(out, "- `{}({})`", event.name, render_params(&event.args));
            if !event.description.is_empty() {
                let _ = write!(out, ": {}", event.description);
            }
            out.push('\n');
        }
    }
}

fn render_params(params: &[ParamSpec]) -> String {
    params
        .iter()
        .map(|param| format!("{}: {}", param.name, param.ty))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Descriptor parse and validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    Parse(String),
    Serialize(String),
    EmptyPluginId,
    InvalidPluginId(String),
    InvalidName(String),
    DuplicateMethod { owner: String, name: String },
    DuplicateEvent { owner: String, name: String },
    IncompleteParam(String),
    DuplicatePlugin(String),
}

impl Display for DescriptorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "descriptor could not be parsed: {message}"),
            Self::Serialize(message) => {
                write!(f, "descriptor could not be serialized: {message}")
            }
            Self::EmptyPluginId => write!(f, "descriptor plugin id must not be empty"),
            Self::InvalidPluginId(value) => write!(f, "descriptor plugin id is invalid: {value}"),
            Self::InvalidName(value) => write!(f, "descriptor member name is invalid: {value}"),
            Self::DuplicateMethod { owner, name } => {
                write!(f, "method `{name}` is declared twice on `{owner}`")
            }
            Self::DuplicateEvent { owner, name } => {
                write!(f, "event `{name}` is declared twice on `{owner}`")
            }
            Self::IncompleteParam(owner) => {
                write!(f, "parameter of `{owner}` is missing a name or type")
            }
            Self::DuplicatePlugin(value) => {
                write!(f, "descriptor already registered for plugin: {value}")
            }
        }
    }
}

impl Error for DescriptorError {}

#[cfg(test)]
mod tests {
    use super::{
        DataTypeSpec, DescriptorError, EventSpec, MethodSpec, ParamSpec, PluginDescriptor,
    };

    fn valid_descriptor() -> PluginDescriptor {
        let mut descriptor = PluginDescriptor::new("media.player", "Plays media items.");
        descriptor.methods.push(MethodSpec {
            name: "play".to_string(),
            description: "Starts playback.".to_string(),
            params: vec![ParamSpec::new("uri", "string")],
            returns: Some("boolean".to_string()),
            callback: Some(vec![ParamSpec::new("err", "Error")]),
        });
        descriptor.events.push(EventSpec {
            name: "media:ended".to_string(),
            description: "Playback reached the end.".to_string(),
            args: vec![ParamSpec::new("uri", "string")],
        });
        descriptor.datatypes.insert(
            "Track".to_string(),
            DataTypeSpec {
                description: "One playable track.".to_string(),
                methods: vec![MethodSpec {
                    name: "duration".to_string(),
                    description: String::new(),
                    params: vec![],
                    returns: Some("number".to_string()),
                    callback: None,
                }],
                events: vec![],
            },
        );
        descriptor
    }

    #[test]
    fn validates_complete_descriptor() {
        assert!(valid_descriptor().validate().is_ok());
    }

    #[test]
    fn rejects_invalid_plugin_id() {
        let mut descriptor = valid_descriptor();
        descriptor.plugin = "Media Player".to_string();
        let err = descriptor.validate().unwrap_err();
        assert!(matches!(err, DescriptorError::InvalidPluginId(_)));

        descriptor.plugin = "   ".to_string();
        assert_eq!(
            descriptor.validate().unwrap_err(),
            DescriptorError::EmptyPluginId
        );
    }

    #[test]
    fn rejects_duplicate_method() {
        let mut descriptor = valid_descriptor();
        let again = descriptor.methods[0].clone();
        descriptor.methods.push(again);
        assert_eq!(
            descriptor.validate().unwrap_err(),
            DescriptorError::DuplicateMethod {
                owner: "media.player".to_string(),
                name: "play".to_string(),
            }
        );
    }

    #[test]
    fn rejects_untyped_event_argument() {
        let mut descriptor = valid_descriptor();
        descriptor.events[0].args.push(ParamSpec::new("position", " "));
        assert_eq!(
            descriptor.validate().unwrap_err(),
            DescriptorError::IncompleteParam("media:ended".to_string())
        );
    }

    #[test]
    fn validates_datatype_members() {
        let mut descriptor = valid_descriptor();
        if let Some(track) = descriptor.datatypes.get_mut("Track") {
            track.events.push(EventSpec {
                name: "changed".to_string(),
                description: String::new(),
                args: vec![],
            });
            track.events.push(EventSpec {
                name: "changed".to_string(),
                description: String::new(),
                args: vec![],
            });
        }
        assert!(matches!(
            descriptor.validate().unwrap_err(),
            DescriptorError::DuplicateEvent { owner, .. } if owner == "Track"
        ));
    }

    #[test]
    fn markdown_lists_methods_events_and_types() {
        let markdown = valid_descriptor().to_markdown();
        assert!(markdown.starts_with("# media.player\n"));
        assert!(markdown.contains("- `play(uri: string)` -> `boolean`: Starts playback."));
        assert!(markdown.contains("  - callback: `(err: Error)`"));
        assert!(markdown.contains("- `media:ended(uri: string)`: Playback reached the end."));
        assert!(markdown.contains("### Track"));
        assert!(markdown.contains("- `duration()` -> `number`"));
    }

    #[test]
    fn write_and_read_failures_are_reported_distinctly() {
        let rendered = valid_descriptor().to_json_pretty().expect("render");
        assert!(rendered.contains("\"plugin\": \"media.player\""));

        let read = PluginDescriptor::from_json_str("{").expect_err("truncated json");
        assert!(read.to_string().starts_with("descriptor could not be parsed"));
        let write = DescriptorError::Serialize("key must be a string".to_string());
        assert_eq!(
            write.to_string(),
            "descriptor could not be serialized: key must be a string"
        );
    }
}
