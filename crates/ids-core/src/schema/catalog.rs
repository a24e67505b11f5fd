//! YAML-backed entity type catalog
//!
//! ```yaml
//! types:
//!   - name: IfcAirTerminal
//!     parent: IfcFlowTerminal
//!     domain: HvacDomain
//!     dialects: [IFC4, IFC4X3]
//!     ifc2x3_host: IfcFlowTerminal
//!     sub_kinds: [DIFFUSER, GRILLE, USERDEFINED, NOTDEFINED]
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{DialectSet, EntityTypeDescriptor, SchemaDialect, SchemaFacade};
use crate::error::{GeneratorError, Result};

/// One row of the catalog file
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "default_dialects")]
    pub dialects: Vec<SchemaDialect>,
    #[serde(default)]
    pub sub_kinds: Vec<String>,
    #[serde(default)]
    pub ifc2x3_host: Option<String>,
}

fn default_dialects() -> Vec<SchemaDialect> {
    vec![
        SchemaDialect::Ifc2x3,
        SchemaDialect::Ifc4,
        SchemaDialect::Ifc4x3,
    ]
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    types: Vec<CatalogEntry>,
}

/// Every entity type across all dialects, keyed by upper-case name
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    entries: BTreeMap<String, EntityTypeDescriptor>,
}

impl SchemaCatalog {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::from_entries(file.types)
    }

    pub fn from_entries(rows: Vec<CatalogEntry>) -> Result<Self> {
        let mut entries: BTreeMap<String, EntityTypeDescriptor> = BTreeMap::new();
        for row in rows {
            let key = row.name.to_ascii_uppercase();
            if entries.contains_key(&key) {
                return Err(GeneratorError::Catalog(format!(
                    "duplicate entity type {}",
                    row.name
                )));
            }
            let descriptor = EntityTypeDescriptor {
                domain: row.domain.unwrap_or_else(|| "Kernel".to_string()),
                name: row.name,
                parent: row.parent,
                children: Vec::new(),
                sub_kinds: row.sub_kinds,
                is_abstract: row.is_abstract,
                dialects: DialectSet::from_dialects(&row.dialects),
                ifc2x3_host: row.ifc2x3_host,
            };
            entries.insert(key, descriptor);
        }

        let links: Vec<(String, String)> = entries
            .values()
            .filter_map(|d| d.parent.as_ref().map(|p| (p.to_ascii_uppercase(), d.name.clone())))
            .collect();
        for (parent, child) in links {
            let Some(parent_entry) = entries.get_mut(&parent) else {
                return Err(GeneratorError::Catalog(format!(
                    "{child} names unknown parent {parent}"
                )));
            };
            parent_entry.children.push(child);
        }
        for entry in entries.values_mut() {
            entry.children.sort();
        }

        let hosts: Vec<(String, String)> = entries
            .values()
            .filter_map(|d| d.ifc2x3_host.as_ref().map(|h| (d.name.clone(), h.clone())))
            .collect();
        for (name, host) in hosts {
            let valid = entries
                .get(&host.to_ascii_uppercase())
                .is_some_and(|h| h.dialects.supports(SchemaDialect::Ifc2x3));
            if !valid {
                return Err(GeneratorError::Catalog(format!(
                    "{name} names {host} as IFC2X3 host but it is not an IFC2X3 type"
                )));
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookup regardless of dialect
    pub fn lookup_any(&self, name: &str) -> Option<&EntityTypeDescriptor> {
        self.entries.get(&name.to_ascii_uppercase())
    }

    /// The types valid in one dialect
    pub fn view(&self, dialect: SchemaDialect) -> SchemaView<'_> {
        SchemaView {
            catalog: self,
            dialect,
            hybrid: false,
        }
    }

    /// IFC2X3 extended with IFC4 occurrence classes that can be inferred from
    /// their IFC2X3 type object (e.g. an `IfcAirTerminal` typed by
    /// `IfcAirTerminalType`)
    pub fn hybrid_ifc2x3(&self) -> SchemaView<'_> {
        SchemaView {
            catalog: self,
            dialect: SchemaDialect::Ifc2x3,
            hybrid: true,
        }
    }
}

/// A dialect-filtered view over the catalog
#[derive(Debug, Clone, Copy)]
pub struct SchemaView<'a> {
    catalog: &'a SchemaCatalog,
    dialect: SchemaDialect,
    hybrid: bool,
}

impl<'a> SchemaView<'a> {
    fn includes(&self, descriptor: &EntityTypeDescriptor) -> bool {
        descriptor.dialects.supports(self.dialect)
            || (self.hybrid && descriptor.ifc2x3_host.is_some())
    }

    pub fn is_hybrid(&self) -> bool {
        self.hybrid
    }

    pub fn catalog(&self) -> &'a SchemaCatalog {
        self.catalog
    }

    fn collect_concrete<'s>(
        &'s self,
        descriptor: &'s EntityTypeDescriptor,
        out: &mut Vec<&'s EntityTypeDescriptor>,
    ) {
        if descriptor.is_concrete() {
            out.push(descriptor);
        }
        for child in &descriptor.children {
            if let Some(child) = self.catalog.lookup_any(child) {
                if self.includes(child) {
                    self.collect_concrete(child, out);
                }
            }
        }
    }
}

impl<'a> SchemaFacade for SchemaView<'a> {
    fn dialect(&self) -> SchemaDialect {
        self.dialect
    }

    fn all_types(&self) -> Vec<&EntityTypeDescriptor> {
        let mut types: Vec<&EntityTypeDescriptor> = self
            .catalog
            .entries
            .values()
            .filter(|d| self.includes(d))
            .collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        types
    }

    fn lookup(&self, name: &str) -> Option<&EntityTypeDescriptor> {
        self.catalog.lookup_any(name).filter(|d| self.includes(d))
    }

    fn concrete_subtypes_of(&self, name: &str) -> Result<Vec<&EntityTypeDescriptor>> {
        let root = self.require(name)?;
        let mut out = Vec::new();
        self.collect_concrete(root, &mut out);
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out.dedup_by(|a, b| a.name == b.name);
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small hierarchy shared by unit tests across the crate
    pub(crate) const TEST_CATALOG: &str = r#"
types:
  - name: IfcRoot
    abstract: true
  - name: IfcObject
    parent: IfcRoot
    abstract: true
  - name: IfcProduct
    parent: IfcObject
    abstract: true
  - name: IfcElement
    parent: IfcProduct
    abstract: true
  - name: IfcDoor
    parent: IfcElement
    domain: SharedBldgElements
  - name: IfcBuildingElementProxy
    parent: IfcElement
    domain: SharedBldgElements
  - name: IfcFlowTerminal
    parent: IfcElement
    domain: SharedBldgServiceElements
  - name: IfcAirTerminal
    parent: IfcFlowTerminal
    domain: HvacDomain
    dialects: [IFC4, IFC4X3]
    ifc2x3_host: IfcFlowTerminal
    sub_kinds: [DIFFUSER, GRILLE, USERDEFINED, NOTDEFINED]
  - name: IfcSpaceHeater
    parent: IfcFlowTerminal
    domain: HvacDomain
    dialects: [IFC4, IFC4X3]
    ifc2x3_host: IfcFlowTerminal
    sub_kinds: [CONVECTOR, RADIATOR, USERDEFINED, NOTDEFINED]
  - name: IfcSpace
    parent: IfcProduct
    domain: ProductExtension
  - name: IfcTypeObject
    parent: IfcObject
    abstract: true
  - name: IfcTypeProduct
    parent: IfcTypeObject
    abstract: true
  - name: IfcDoorStyle
    parent: IfcTypeProduct
    domain: SharedBldgElements
    dialects: [IFC2X3, IFC4]
  - name: IfcAirTerminalType
    parent: IfcTypeProduct
    domain: HvacDomain
    sub_kinds: [DIFFUSER, GRILLE, USERDEFINED, NOTDEFINED]
  - name: IfcSpaceHeaterType
    parent: IfcTypeProduct
    domain: HvacDomain
    sub_kinds: [CONVECTOR, RADIATOR, USERDEFINED, NOTDEFINED]
  - name: IfcGasTerminalType
    parent: IfcTypeProduct
    domain: HvacDomain
    dialects: [IFC2X3]
    sub_kinds: [GASAPPLIANCE, USERDEFINED, NOTDEFINED]
  - name: IfcTank
    parent: IfcElement
    domain: HvacDomain
    dialects: [IFC4, IFC4X3]
"#;

    pub(crate) fn test_catalog() -> SchemaCatalog {
        SchemaCatalog::from_yaml(TEST_CATALOG).unwrap()
    }

    #[test]
    fn test_views_filter_by_dialect() {
        let catalog = test_catalog();
        let ifc2x3 = catalog.view(SchemaDialect::Ifc2x3);
        assert!(ifc2x3.lookup("IfcAirTerminal").is_none());
        assert!(ifc2x3.lookup("ifcdoorstyle").is_some());

        let ifc4 = catalog.view(SchemaDialect::Ifc4);
        assert!(ifc4.lookup("IFCAIRTERMINAL").is_some());
        assert!(ifc4.lookup("IfcGasTerminalType").is_none());

        let hybrid = catalog.hybrid_ifc2x3();
        assert!(hybrid.lookup("IfcAirTerminal").is_some());
        assert!(hybrid.lookup("IfcTank").is_none());
    }

    #[test]
    fn test_concrete_subtypes_are_sorted_and_concrete() {
        let catalog = test_catalog();
        let hybrid = catalog.hybrid_ifc2x3();
        let names: Vec<&str> = hybrid
            .concrete_subtypes_of("IfcFlowTerminal")
            .unwrap()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["IfcAirTerminal", "IfcFlowTerminal", "IfcSpaceHeater"]);

        let plain = catalog.view(SchemaDialect::Ifc2x3);
        let names: Vec<&str> = plain
            .concrete_subtypes_of("IfcFlowTerminal")
            .unwrap()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["IfcFlowTerminal"]);
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let catalog = test_catalog();
        let err = catalog
            .view(SchemaDialect::Ifc2x3)
            .concrete_subtypes_of("IfcTank")
            .unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::UnsupportedType { ref name, dialect: SchemaDialect::Ifc2x3 } if name == "IfcTank"
        ));
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let yaml = "types:\n  - name: IfcWall\n    parent: IfcNowhere\n";
        assert!(matches!(
            SchemaCatalog::from_yaml(yaml),
            Err(GeneratorError::Catalog(_))
        ));
    }
}
