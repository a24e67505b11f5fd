//! Display names for enumerated sub-kinds

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use crate::error::Result;

/// `SOLARCOLLECTOR` -> `SolarCollector`
#[derive(Debug, Clone, Default)]
pub struct SubKindNames {
    names: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SubKindRow {
    key: String,
    proper_case: String,
}

#[derive(Debug, Deserialize)]
struct SubKindFile {
    sub_kinds: Vec<SubKindRow>,
}

impl SubKindNames {
    /// First row for a key wins, later duplicates are ignored
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: SubKindFile = serde_yaml::from_str(yaml)?;
        let mut names = BTreeMap::new();
        for row in file.sub_kinds {
            names
                .entry(row.key.trim().to_string())
                .or_insert_with(|| row.proper_case.trim().to_string());
        }
        Ok(Self { names })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            names: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, sub_kind: &str) -> Option<&str> {
        self.names.get(sub_kind).map(String::as_str)
    }

    /// Display name, or the raw code with a diagnostic when unmapped
    pub fn display(&self, entity: &str, sub_kind: &str) -> String {
        match self.get(sub_kind) {
            Some(name) => name.to_string(),
            None => {
                warn!(entity, sub_kind, "missing sub-kind display name, using raw code");
                sub_kind.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_name_falls_back_to_code() {
        let names = SubKindNames::from_pairs([("RADIATOR", "Radiator")]);
        assert_eq!(names.display("SpaceHeater", "RADIATOR"), "Radiator");
        assert_eq!(names.display("SpaceHeater", "CONVECTOR"), "CONVECTOR");
    }

    #[test]
    fn test_first_duplicate_wins() {
        let yaml = r#"
sub_kinds:
  - { key: JOIST, proper_case: Joist }
  - { key: JOIST, proper_case: JoistBeam }
"#;
        let names = SubKindNames::from_yaml(yaml).unwrap();
        assert_eq!(names.get("JOIST"), Some("Joist"));
    }
}
