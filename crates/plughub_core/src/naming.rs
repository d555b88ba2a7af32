//! Identifier rules shared by the extension registry and plugin descriptors.

use once_cell::sync::Lazy;
use regex::Regex;

static MEMBER_IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("member identifier pattern is valid")
});

static PLUGIN_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$").expect("plugin id pattern is valid")
});

/// Returns whether `value` can name a namespace or a capability member.
pub fn is_valid_identifier(value: &str) -> bool {
    MEMBER_IDENT.is_match(value)
}

/// Returns whether `value` is a valid plugin id, e.g. `media.player`.
pub fn is_valid_plugin_id(value: &str) -> bool {
    PLUGIN_ID.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::{is_valid_identifier, is_valid_plugin_id};

    #[test]
    fn identifiers_follow_script_member_rules() {
        assert!(is_valid_identifier("add"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("$el"));
        assert!(is_valid_identifier("camelCase2"));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("has space"));
        assert!(!is_valid_identifier("dotted.name"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn plugin_ids_are_lowercase_with_single_separators() {
        assert!(is_valid_plugin_id("math"));
        assert!(is_valid_plugin_id("media.player"));
        assert!(is_valid_plugin_id("vendor-x_adapter2"));
        assert!(!is_valid_plugin_id("Media"));
        assert!(!is_valid_plugin_id("media..player"));
        assert!(!is_valid_plugin_id("media."));
        assert!(!is_valid_plugin_id(""));
    }
}
