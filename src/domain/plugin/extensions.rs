//! Plugin capability types
//!
//! Defines the capability contracts a plugin entry can declare.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability contracts recognized by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Contributes code-generation templates
    TemplateProvider,

    /// Contributes a model catalog and optionally a provider preset
    ModelProvider,
}

impl Capability {
    pub fn all() -> &'static [Capability] {
        &[Capability::TemplateProvider, Capability::ModelProvider]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::TemplateProvider => "template_provider",
            Capability::ModelProvider => "model_provider",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Capability {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "template_provider" => Ok(Capability::TemplateProvider),
            "model_provider" => Ok(Capability::ModelProvider),
            _ => Err(format!("Unknown capability: {}", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_as_str() {
        assert_eq!(Capability::TemplateProvider.as_str(), "template_provider");
        assert_eq!(Capability::ModelProvider.as_str(), "model_provider");
        assert_eq!(format!("{}", Capability::ModelProvider), "model_provider");
    }

    #[test]
    fn test_every_capability_parses_from_its_name() {
        for capability in Capability::all() {
            assert_eq!(Capability::try_from(capability.as_str()).unwrap(), *capability);
        }
    }

    #[test]
    fn test_capability_try_from() {
        assert_eq!(
            Capability::try_from("template_provider").unwrap(),
            Capability::TemplateProvider
        );
        assert!(Capability::try_from("llm_provider").is_err());
    }

    #[test]
    fn test_capability_serialization() {
        let json = serde_json::to_string(&Capability::TemplateProvider).unwrap();
        assert_eq!(json, "\"template_provider\"");

        let parsed: Capability = serde_json::from_str("\"model_provider\"").unwrap();
        assert_eq!(parsed, Capability::ModelProvider);
    }
}
