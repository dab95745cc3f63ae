//! Optional viewer features passed through to the browser application.

use crate::{Error, Result};
use serde::Serialize;

/// Description of one recognised feature key.
#[derive(Debug, Clone, Copy)]
pub struct FeatureDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub takes_value: bool,
}

pub const FEATURE_DEFINITIONS: &[FeatureDefinition] = &[
    FeatureDefinition {
        key: "home-link-label",
        label: "Home Link (Label)",
        description: "Customizes the label of the \"Home\" link enabled by \"home-link-url\".",
        takes_value: true,
    },
    FeatureDefinition {
        key: "home-link-url",
        label: "Home Link (URL)",
        description: "Adds a \"Home\" link that directs to the specified URL.",
        takes_value: true,
    },
    FeatureDefinition {
        key: "support-link",
        label: "Support Link",
        description: "Adds a \"Support\" link that directs to the specified URL.",
        takes_value: true,
    },
    FeatureDefinition {
        key: "review",
        label: "Review Mode",
        description: "Enables highlighting of untagged numbers and dates.",
        takes_value: false,
    },
];

/// Enabled features. Only set fields are serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureConfig {
    #[serde(rename = "home-link-label", skip_serializing_if = "Option::is_none")]
    pub home_link_label: Option<String>,
    #[serde(rename = "home-link-url", skip_serializing_if = "Option::is_none")]
    pub home_link_url: Option<String>,
    #[serde(rename = "support-link", skip_serializing_if = "Option::is_none")]
    pub support_link: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub review: bool,
}

impl FeatureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loosely typed key/value pairs, rejecting unknown keys.
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            config.set(key.as_ref(), value)?;
        }
        Ok(config)
    }

    pub fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        use serde_json::Value;

        let text = |value: Value| -> Result<Option<String>> {
            match value {
                Value::Null => Ok(None),
                Value::String(s) => Ok(Some(s)),
                other => Err(Error::InvalidFeatureValue {
                    key: key.to_string(),
                    reason: format!("expected a string, got {}", other),
                }),
            }
        };

        match key {
            "home-link-label" => self.home_link_label = text(value)?,
            "home-link-url" => self.home_link_url = text(value)?,
            "support-link" => self.support_link = text(value)?,
            "review" => {
                self.review = match value {
                    Value::Bool(b) => b,
                    Value::Null => false,
                    Value::String(s) if s == "true" => true,
                    Value::String(s) if s == "false" => false,
                    other => {
                        return Err(Error::InvalidFeatureValue {
                            key: key.to_string(),
                            reason: format!("expected a boolean, got {}", other),
                        })
                    }
                }
            }
            _ => return Err(Error::UnknownFeature(key.to_string())),
        }
        Ok(())
    }

    /// Parse a command line `key` or `key=value` argument.
    pub fn set_from_arg(&mut self, arg: &str) -> Result<()> {
        match arg.split_once('=') {
            Some((key, value)) => self.set(key, serde_json::Value::String(value.to_string())),
            None => match definition(arg) {
                Some(def) if def.takes_value => Err(Error::InvalidFeatureValue {
                    key: arg.to_string(),
                    reason: "a value is required".to_string(),
                }),
                _ => self.set(arg, serde_json::Value::Bool(true)),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn definition(key: &str) -> Option<&'static FeatureDefinition> {
    FEATURE_DEFINITIONS.iter().find(|d| d.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enable_defined_feature() {
        let config = FeatureConfig::from_pairs([("review", json!(true))]).unwrap();
        assert!(config.review);
        assert_eq!(serde_json::to_value(&config).unwrap(), json!({"review": true}));
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let err = FeatureConfig::from_pairs([("unknown", json!(true))]).unwrap_err();
        assert!(matches!(err, Error::UnknownFeature(ref k) if k == "unknown"));
        assert_eq!(
            err.to_string(),
            "Given feature name `unknown` does not match any defined features"
        );
    }

    #[test]
    fn string_features_serialize_with_wire_keys() {
        let config = FeatureConfig::from_pairs([
            ("home-link-url", json!("https://example.com")),
            ("home-link-label", json!("Home")),
        ])
        .unwrap();
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({"home-link-url": "https://example.com", "home-link-label": "Home"})
        );
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        let err = FeatureConfig::from_pairs([("support-link", json!(3))]).unwrap_err();
        assert!(matches!(err, Error::InvalidFeatureValue { .. }));
    }

    #[test]
    fn command_line_arguments() {
        let mut config = FeatureConfig::new();
        config.set_from_arg("review").unwrap();
        config.set_from_arg("support-link=https://example.com/help").unwrap();
        assert!(config.review);
        assert_eq!(config.support_link.as_deref(), Some("https://example.com/help"));
        assert!(config.set_from_arg("home-link-url").is_err());
        assert!(config.set_from_arg("colour=blue").is_err());
    }

    #[test]
    fn empty_config_serializes_to_empty_object() {
        let config = FeatureConfig::new();
        assert!(config.is_empty());
        assert_eq!(serde_json::to_value(&config).unwrap(), json!({}));
    }
}
