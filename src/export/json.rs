//! JSON rule bundles
//!
//! The JSON file carries the whole [`RuleBundle`] plus identifiers the IDS
//! format has no room for: a name-derived id for the bundle and each group,
//! and a content fingerprint. The fingerprint hashes the bundle with issue
//! dates and the date-stamped version cleared, so two runs over unchanged
//! inputs on different days agree.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ids_core::{RibaStage, RuleBundle};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for bundle and group ids
const BUNDLE_NAMESPACE: Uuid = Uuid::from_u128(0x2b7e_51a0_8c3d_4e19_a6f2_0d94_c1b8_7e35);

pub fn name_id(name: &str) -> Uuid {
    Uuid::new_v5(&BUNDLE_NAMESPACE, name.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub id: Uuid,
    pub name: String,
    pub specifications: usize,
}

/// On-disk form of one compiled bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDocument {
    pub id: Uuid,
    pub stage: RibaStage,
    pub pass: String,
    pub fingerprint: String,
    pub groups: Vec<GroupEntry>,
    pub bundle: RuleBundle,
}

impl BundleDocument {
    pub fn new(bundle: RuleBundle, stage: RibaStage, pass: &str) -> Result<Self> {
        let groups = bundle
            .groups
            .iter()
            .map(|g| GroupEntry {
                id: name_id(g.name()),
                name: g.name().to_string(),
                specifications: g.len(),
            })
            .collect();
        Ok(Self {
            id: name_id(&bundle.name),
            stage,
            pass: pass.to_string(),
            fingerprint: fingerprint(&bundle)?,
            groups,
            bundle,
        })
    }

    /// Recompute the fingerprint and compare
    pub fn verify(&self) -> Result<()> {
        let actual = fingerprint(&self.bundle)?;
        if actual != self.fingerprint {
            bail!(
                "bundle {} fingerprint mismatch: recorded {}, computed {}",
                self.bundle.name,
                self.fingerprint,
                actual
            );
        }
        let counted: usize = self.groups.iter().map(|g| g.specifications).sum();
        if counted != self.bundle.spec_count() {
            bail!(
                "bundle {} lists {} specifications but holds {}",
                self.bundle.name,
                counted,
                self.bundle.spec_count()
            );
        }
        Ok(())
    }
}

/// blake3 over the canonical JSON of `bundle` with dates cleared
pub fn fingerprint(bundle: &RuleBundle) -> Result<String> {
    let mut undated = bundle.clone();
    for group in &mut undated.groups {
        group.metadata.date = None;
        group.metadata.version.clear();
    }
    // Value maps sort their keys
    let canonical = serde_json::to_value(&undated)?;
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

pub fn write_file(path: &Path, document: &BundleDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json).with_context(|| format!("Writing {}", path.display()))
}

pub fn read_file(path: &Path) -> Result<BundleDocument> {
    let text = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Parsing bundle {}", path.display()))
}

#[cfg(test)]
mod tests {
    use ids_core::{
        ApplicabilityCardinality, Facet, FacetGroup, GroupMetadata, ProjectInfo, SchemaDialect, Specification,
        SpecificationGroup,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    fn bundle(date: Option<&str>) -> RuleBundle {
        let mut metadata = GroupMetadata::new("Information Model RIBA Stage3 Assurance");
        metadata.date = date.map(str::to_string);
        metadata.version = format!("P01.{}", date.unwrap_or_default());
        let mut group = SpecificationGroup::new(metadata);
        group.push(Specification {
            identifier: "05_02".into(),
            name: "05_02 : Space Should Have Name Defined".into(),
            description: "Space Should Have Name Defined".into(),
            instructions: None,
            applicability: FacetGroup::new("Space", "").with_facet(Facet::entity("IFCSPACE")),
            applicability_cardinality: ApplicabilityCardinality::Optional,
            requirement: FacetGroup::new("Name", "").with_facet(Facet::attribute("Name", None)),
            dialects: vec![SchemaDialect::Ifc2x3],
        });
        let mut bundle = RuleBundle::new(
            "Core DfE EIR model checks",
            ProjectInfo {
                name: "{{IfcProjectName}}".into(),
                description: String::new(),
            },
        );
        bundle.groups.push(group);
        bundle
    }

    #[test]
    fn test_fingerprint_ignores_dates() {
        let a = fingerprint(&bundle(Some("2026-01-01"))).unwrap();
        let b = fingerprint(&bundle(Some("2026-10-18"))).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut changed = bundle(None);
        changed.groups[0].specifications[0].identifier = "05_03".into();
        assert_ne!(a, fingerprint(&changed).unwrap());
    }

    #[test]
    fn test_ids_are_derived_from_names() {
        let doc = BundleDocument::new(bundle(None), RibaStage::Stage3, "Core").unwrap();
        assert_eq!(doc.id, name_id("Core DfE EIR model checks"));
        assert_eq!(doc.groups[0].specifications, 1);
        assert_eq!(doc.groups[0].id, name_id("Information Model RIBA Stage3 Assurance"));
    }

    #[test]
    fn test_documents_read_back_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        let doc = BundleDocument::new(bundle(Some("2026-10-18")), RibaStage::Stage3, "Core").unwrap();
        write_file(&path, &doc).unwrap();

        let read = read_file(&path).unwrap();
        assert_eq!(read, doc);
        read.verify().unwrap();

        let mut tampered = read;
        tampered.bundle.groups[0].specifications.clear();
        assert!(tampered.verify().is_err());
    }
}
