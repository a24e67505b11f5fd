//! Sample values: a named baseline plus sparse overrides
//!
//! ```ignore
//! let broken = SampleBuilder::new(&cobie_type)
//!     .remove(Field::property("COBie_Type", "ModelNumber"))
//!     .set(Field::attribute("Name"), "")
//!     .build();
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Addressable value of a sample instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum Field {
    Attribute { name: String },
    Property { set: String, name: String },
    /// Classification reference keyed by system name
    Classification { system: String },
    /// Membership of a group such as a zone
    Membership { group: String },
}

impl Field {
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute { name: name.into() }
    }

    pub fn property(set: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Property {
            set: set.into(),
            name: name.into(),
        }
    }

    pub fn classification(system: impl Into<String>) -> Self {
        Self::Classification {
            system: system.into(),
        }
    }

    pub fn membership(group: impl Into<String>) -> Self {
        Self::Membership { group: group.into() }
    }
}

/// Attributes, properties, classifications and group memberships
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSet {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Property set -> property -> value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, BTreeMap<String, String>>,
    /// System -> code
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub classifications: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub memberships: BTreeSet<String>,
}

impl ValueSet {
    pub fn get(&self, field: &Field) -> Option<&str> {
        match field {
            Field::Attribute { name } => self.attributes.get(name).map(String::as_str),
            Field::Property { set, name } => self
                .properties
                .get(set)
                .and_then(|props| props.get(name))
                .map(String::as_str),
            Field::Classification { system } => self.classifications.get(system).map(String::as_str),
            Field::Membership { group } => self.memberships.get(group).map(String::as_str),
        }
    }

    pub fn contains(&self, field: &Field) -> bool {
        self.get(field).is_some()
    }

    /// Set a value; for memberships the value is ignored
    pub fn set(&mut self, field: &Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Attribute { name } => {
                self.attributes.insert(name.clone(), value);
            }
            Field::Property { set, name } => {
                self.properties
                    .entry(set.clone())
                    .or_default()
                    .insert(name.clone(), value);
            }
            Field::Classification { system } => {
                self.classifications.insert(system.clone(), value);
            }
            Field::Membership { group } => {
                self.memberships.insert(group.clone());
            }
        }
    }

    /// Remove a value, dropping a property set left empty; true if present
    pub fn remove(&mut self, field: &Field) -> bool {
        match field {
            Field::Attribute { name } => self.attributes.remove(name).is_some(),
            Field::Property { set, name } => {
                let Some(props) = self.properties.get_mut(set) else {
                    return false;
                };
                let removed = props.remove(name).is_some();
                if props.is_empty() {
                    self.properties.remove(set);
                }
                removed
            }
            Field::Classification { system } => self.classifications.remove(system).is_some(),
            Field::Membership { group } => self.memberships.remove(group),
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(&field, value);
        self
    }
}

/// Named conforming value set that fixtures start from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub name: String,
    pub values: ValueSet,
}

impl Baseline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: ValueSet::default(),
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.values.set(&field, value);
        self
    }
}

/// A baseline with a sparse override map; `None` removes the field
#[derive(Debug, Clone)]
pub struct SampleBuilder<'b> {
    baseline: &'b Baseline,
    overrides: BTreeMap<Field, Option<String>>,
}

impl<'b> SampleBuilder<'b> {
    pub fn new(baseline: &'b Baseline) -> Self {
        Self {
            baseline,
            overrides: BTreeMap::new(),
        }
    }

    pub fn set(mut self, field: Field, value: impl Into<String>) -> Self {
        self.overrides.insert(field, Some(value.into()));
        self
    }

    pub fn remove(mut self, field: Field) -> Self {
        self.overrides.insert(field, None);
        self
    }

    /// Fields that differ from the baseline
    pub fn overridden(&self) -> impl Iterator<Item = &Field> + '_ {
        self.overrides.keys()
    }

    pub fn build(&self) -> ValueSet {
        let mut values = self.baseline.values.clone();
        for (field, value) in &self.overrides {
            match value {
                Some(value) => values.set(field, value.clone()),
                None => {
                    values.remove(field);
                }
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cobie_type() -> Baseline {
        Baseline::new("cobie type")
            .with(Field::attribute("Name"), "Door_Type01")
            .with(Field::property("COBie_Type", "Manufacturer"), "info@acme.example")
            .with(Field::property("COBie_Type", "ModelNumber"), "M-1")
            .with(Field::classification("Uniclass 2015"), "Pr_30_59_24")
    }

    #[test]
    fn test_overrides_leave_baseline_untouched() {
        let baseline = cobie_type();
        let builder = SampleBuilder::new(&baseline)
            .remove(Field::property("COBie_Type", "ModelNumber"))
            .set(Field::attribute("Name"), "");
        let values = builder.build();

        assert_eq!(values.get(&Field::attribute("Name")), Some(""));
        assert!(!values.contains(&Field::property("COBie_Type", "ModelNumber")));
        assert_eq!(
            values.get(&Field::property("COBie_Type", "Manufacturer")),
            Some("info@acme.example")
        );
        assert_eq!(baseline.values.get(&Field::attribute("Name")), Some("Door_Type01"));
        assert_eq!(builder.overridden().count(), 2);
    }

    #[test]
    fn test_removing_last_property_drops_set() {
        let mut values = ValueSet::default().with(Field::property("Pset_SpaceCommon", "Roomtag"), "n/a");
        assert!(values.remove(&Field::property("Pset_SpaceCommon", "Roomtag")));
        assert!(values.properties.is_empty());
        assert!(!values.remove(&Field::property("Pset_SpaceCommon", "Roomtag")));
    }

    #[test]
    fn test_memberships() {
        let mut values = ValueSet::default().with(Field::membership("Zone A"), "");
        assert!(values.contains(&Field::membership("Zone A")));
        assert!(values.remove(&Field::membership("Zone A")));
        assert!(values.memberships.is_empty());
    }
}
