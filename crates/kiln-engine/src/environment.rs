//! Runtime environment snapshot.
//!
//! Conditional configs (`platformConfig`, `responsiveConfig`) are evaluated
//! against an [`Environment`]: a platform name plus a bag of properties
//! (width, height, orientation flags, anything the host cares to expose).
//! The builder stamps the environment it finalized under onto each
//! descriptor; the factory re-evaluates conditionals at construction when
//! the current environment differs from that stamp.

use serde_json::Value;

/// Platform name plus responsive properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    platform: String,
    props: serde_json::Map<String, Value>,
}

impl Environment {
    /// Create an environment for the given platform with no extra properties.
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            props: serde_json::Map::new(),
        }
    }

    /// Add a responsive property (builder style).
    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    /// The platform name, e.g. `"desktop"` or `"phone"`.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Look up a property. `"platform"` always resolves to the platform name.
    pub fn prop(&self, key: &str) -> Option<Value> {
        if key == "platform" {
            return Some(Value::String(self.platform.clone()));
        }
        self.props.get(key).cloned()
    }

    /// Whether a `platformConfig` key matches this environment.
    ///
    /// A key may be a single platform name or a comma-separated tag list;
    /// any tag matching the current platform selects the block.
    pub fn platform_matches(&self, key: &str) -> bool {
        key.split(',').any(|tag| tag.trim() == self.platform)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new("desktop")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_match_single() {
        let env = Environment::new("phone");
        assert!(env.platform_matches("phone"));
        assert!(!env.platform_matches("desktop"));
    }

    #[test]
    fn test_platform_match_tag_list() {
        let env = Environment::new("tablet");
        assert!(env.platform_matches("phone, tablet"));
        assert!(!env.platform_matches("phone, desktop"));
    }

    #[test]
    fn test_platform_prop_is_implicit() {
        let env = Environment::new("phone").with_prop("width", json!(320));
        assert_eq!(env.prop("platform"), Some(json!("phone")));
        assert_eq!(env.prop("width"), Some(json!(320)));
        assert_eq!(env.prop("height"), None);
    }
}
