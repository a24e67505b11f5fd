//! Short-code table for component naming

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NamingStrategy {
    /// `CODE-00001`, numbered across the whole project
    #[default]
    Sequence,
    /// `<space>-CODE001`, numbered within the containing space
    Spatial,
}

/// Short code for an entity kind, optionally refined per sub-kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCodeMapping {
    pub code: String,
    #[serde(default)]
    pub strategy: NamingStrategy,
    /// Sub-kind -> code, e.g. `RADIATOR -> RAD`
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

impl TypeCodeMapping {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            strategy: NamingStrategy::Sequence,
            overrides: BTreeMap::new(),
        }
    }

    pub fn spatial(mut self) -> Self {
        self.strategy = NamingStrategy::Spatial;
        self
    }

    pub fn override_with(mut self, sub_kind: impl Into<String>, code: impl Into<String>) -> Self {
        self.overrides.insert(sub_kind.into(), code.into());
        self
    }

    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    /// Code for a sub-kind, falling back to the base code
    pub fn code_for(&self, sub_kind: Option<&str>) -> &str {
        sub_kind
            .and_then(|s| self.overrides.get(s))
            .map(String::as_str)
            .unwrap_or(&self.code)
    }
}

/// Entity label (e.g. `SpaceHeater`) -> mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCodeTable {
    codes: BTreeMap<String, TypeCodeMapping>,
}

impl TypeCodeTable {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn insert(&mut self, entity: impl Into<String>, mapping: TypeCodeMapping) {
        self.codes.insert(entity.into(), mapping);
    }

    pub fn get(&self, entity: &str) -> Option<&TypeCodeMapping> {
        self.codes.get(entity)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_chain() {
        let heater = TypeCodeMapping::new("SPH")
            .override_with("RADIATOR", "RAD")
            .override_with("PANELRADIATOR", "RAD");
        assert_eq!(heater.code_for(Some("RADIATOR")), "RAD");
        assert_eq!(heater.code_for(Some("CONVECTOR")), "SPH");
        assert_eq!(heater.code_for(None), "SPH");
        assert!(heater.has_overrides());
    }

    #[test]
    fn test_yaml_table() {
        let yaml = r#"
codes:
  Door:
    code: D
    strategy: SPATIAL
  Pump:
    code: PMP
"#;
        let table = TypeCodeTable::from_yaml(yaml).unwrap();
        assert_eq!(table.get("Door").unwrap().strategy, NamingStrategy::Spatial);
        assert_eq!(table.get("Pump").unwrap().strategy, NamingStrategy::Sequence);
        assert!(table.get("Wall").is_none());
    }
}
