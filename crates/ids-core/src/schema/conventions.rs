//! Naming conventions that relate type objects to occurrences
//!
//! The IFC schema pairs most occurrence classes with a type object named by
//! convention (`IfcPump` / `IfcPumpType`, `IfcDoor` / `IfcDoorStyle`). These
//! rules are kept here as one table so every caller resolves them the same
//! way: the rule compiler for labels and patterns, the fixture synthesizer
//! for the occurrence to instantiate.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{EntityTypeDescriptor, SchemaDialect, SchemaFacade};
use crate::error::Result;

/// `suffix` is replaced by `replacement` when a type name ends with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixRule {
    pub suffix: String,
    #[serde(default)]
    pub replacement: String,
}

impl SuffixRule {
    pub fn new(suffix: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            replacement: replacement.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeConventions {
    /// Schema-wide prefix dropped from labels
    pub prefix: String,
    /// Tried in order, first match wins
    pub suffix_rules: Vec<SuffixRule>,
    /// Type objects whose occurrence does not follow the suffix rules
    pub instance_overrides: BTreeMap<String, String>,
    /// Occurrence used when nothing better can be inferred
    pub proxy_type: String,
    /// Type labels (prefix dropped, suffix kept) whose sub-kinds are not
    /// enumerated for naming
    pub enumeration_exceptions: BTreeSet<String>,
    /// Entities whose naming field accepts any proper-cased word
    pub free_label_entities: BTreeSet<String>,
}

impl Default for TypeConventions {
    fn default() -> Self {
        Self {
            prefix: "Ifc".to_string(),
            suffix_rules: vec![
                SuffixRule::new("TypeObject", "Object"),
                SuffixRule::new("TypeProduct", "Product"),
                SuffixRule::new("Type", ""),
                SuffixRule::new("Style", ""),
            ],
            instance_overrides: [
                ("IfcGasTerminalType", "IfcFlowTerminal"),
                ("IfcElectricHeaterType", "IfcFlowTerminal"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            proxy_type: "IfcBuildingElementProxy".to_string(),
            enumeration_exceptions: [
                "Door",
                "DiscreteAccessory",
                "Fastener",
                "Furniture",
                "MechanicalFastener",
                "ReinforcingMesh",
                "SystemFurnitureElement",
                "TendonAnchor",
                "Window",
                "DoorStyle",
                "DoorType",
                "WindowStyle",
                "WindowType",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            free_label_entities: ["BuildingElementProxy".to_string()].into_iter().collect(),
        }
    }
}

impl TypeConventions {
    /// Name with the schema prefix dropped: `IfcPumpType` -> `PumpType`
    pub fn unprefixed<'n>(&self, name: &'n str) -> &'n str {
        name.strip_prefix(self.prefix.as_str()).unwrap_or(name)
    }

    /// Apply the first matching suffix rule, if any
    pub fn strip_suffix(&self, name: &str) -> Option<String> {
        self.suffix_rules.iter().find_map(|rule| {
            name.strip_suffix(rule.suffix.as_str())
                .map(|stem| format!("{stem}{}", rule.replacement))
        })
    }

    /// Entity label used in names and rule titles: `IfcDoorStyle` -> `Door`
    pub fn entity_label(&self, name: &str) -> String {
        let unprefixed = self.unprefixed(name);
        self.strip_suffix(unprefixed)
            .unwrap_or_else(|| unprefixed.to_string())
    }

    /// Whether sub-kinds of this type object are enumerated for naming
    pub fn enumerates_sub_kinds(&self, type_name: &str) -> bool {
        !self
            .enumeration_exceptions
            .contains(self.unprefixed(type_name))
    }

    /// Whether the entity field of a name is free text for this type
    pub fn has_free_label(&self, name: &str) -> bool {
        self.free_label_entities
            .iter()
            .any(|entity| name.contains(entity.as_str()))
    }

    /// The idealised occurrence for a type object, resolved against a
    /// (usually hybrid) schema: `IfcSensorType` -> `IfcSensor`
    pub fn logical_instance<'s>(
        &self,
        schema: &'s dyn SchemaFacade,
        type_name: &str,
    ) -> Result<&'s EntityTypeDescriptor> {
        let candidate = match self.instance_overrides.get(type_name) {
            Some(instance) => Some(instance.clone()),
            None => self.strip_suffix(type_name),
        };
        if let Some(found) = candidate.as_deref().and_then(|c| schema.lookup(c)) {
            return Ok(found);
        }
        schema.require(&self.proxy_type)
    }

    /// The class that can actually be instantiated in the target schema for a
    /// logical occurrence: itself when valid, its IFC2X3 host, else the proxy
    pub fn schema_instance<'s>(
        &self,
        schema: &'s dyn SchemaFacade,
        logical: &EntityTypeDescriptor,
    ) -> Result<&'s EntityTypeDescriptor> {
        if logical.dialects.supports(schema.dialect()) {
            if let Some(found) = schema.lookup(&logical.name) {
                return Ok(found);
            }
        }
        if schema.dialect() == SchemaDialect::Ifc2x3 {
            if let Some(found) = logical.ifc2x3_host.as_deref().and_then(|h| schema.lookup(h)) {
                return Ok(found);
            }
        }
        schema.require(&self.proxy_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog::tests::test_catalog;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entity_labels() {
        let conventions = TypeConventions::default();
        assert_eq!(conventions.entity_label("IfcDoorStyle"), "Door");
        assert_eq!(conventions.entity_label("IfcAirTerminalType"), "AirTerminal");
        assert_eq!(conventions.entity_label("IfcTypeObject"), "Object");
        assert_eq!(conventions.entity_label("IfcDoor"), "Door");
    }

    #[test]
    fn test_enumeration_exceptions_use_suffixed_label() {
        let conventions = TypeConventions::default();
        assert!(!conventions.enumerates_sub_kinds("IfcDoorStyle"));
        assert!(conventions.enumerates_sub_kinds("IfcAirTerminalType"));
        assert!(conventions.has_free_label("IfcBuildingElementProxyType"));
    }

    #[test]
    fn test_logical_and_schema_instances() {
        let catalog = test_catalog();
        let conventions = TypeConventions::default();
        let hybrid = catalog.hybrid_ifc2x3();
        let plain = catalog.view(SchemaDialect::Ifc2x3);

        let logical = conventions
            .logical_instance(&hybrid, "IfcAirTerminalType")
            .unwrap();
        assert_eq!(logical.name, "IfcAirTerminal");
        let concrete = conventions.schema_instance(&plain, logical).unwrap();
        assert_eq!(concrete.name, "IfcFlowTerminal");

        let gas = conventions
            .logical_instance(&hybrid, "IfcGasTerminalType")
            .unwrap();
        assert_eq!(gas.name, "IfcFlowTerminal");

        let door = conventions.logical_instance(&hybrid, "IfcDoorStyle").unwrap();
        assert_eq!(door.name, "IfcDoor");
    }

    #[test]
    fn test_unmatched_type_falls_back_to_proxy() {
        let catalog = test_catalog();
        let conventions = TypeConventions::default();
        let hybrid = catalog.hybrid_ifc2x3();
        let logical = conventions.logical_instance(&hybrid, "IfcWidgetType").unwrap();
        assert_eq!(logical.name, "IfcBuildingElementProxy");
    }
}
