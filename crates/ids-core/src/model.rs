//! Specification model
//!
//! The compiled output: [`Specification`]s collected into
//! [`SpecificationGroup`]s, which compose a [`RuleBundle`] for one
//! (stage, pass) combination.

use serde::{Deserialize, Serialize};

use crate::facets::{ApplicabilityCardinality, FacetGroup};
use crate::schema::SchemaDialect;

/// One machine-checkable rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    /// Scope-rendered identifier, e.g. `05_03`; comma-joined once merged
    pub identifier: String,
    /// Title, prefixed with the identifier unless the scope disables it
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub applicability: FacetGroup,
    #[serde(default)]
    pub applicability_cardinality: ApplicabilityCardinality,
    pub requirement: FacetGroup,
    /// Sorted, never empty
    pub dialects: Vec<SchemaDialect>,
}

impl Specification {
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// True for presence rules, which carry no requirement facets
    pub fn is_presence_only(&self) -> bool {
        self.requirement.is_empty()
    }
}

/// Header shared by every group of one bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub name: String,
    pub description: String,
    pub author: String,
    pub version: String,
    /// Stage description, e.g. "RIBA Stage 4: Technical Design"
    pub milestone: String,
    pub purpose: String,
    pub copyright: String,
    /// ISO-8601 date; left out of fingerprints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl GroupMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Copy of this header under a different name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// A named, metadata-bearing collection of specifications
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationGroup {
    pub metadata: GroupMetadata,
    pub specifications: Vec<Specification>,
}

impl SpecificationGroup {
    pub fn new(metadata: GroupMetadata) -> Self {
        Self {
            metadata,
            specifications: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn len(&self) -> usize {
        self.specifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specifications.is_empty()
    }

    pub fn push(&mut self, spec: Specification) {
        self.specifications.push(spec);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub description: String,
}

/// Everything compiled for one stage and pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBundle {
    pub name: String,
    pub project: ProjectInfo,
    pub stages: Vec<String>,
    pub groups: Vec<SpecificationGroup>,
}

impl RuleBundle {
    pub fn new(name: impl Into<String>, project: ProjectInfo) -> Self {
        Self {
            name: name.into(),
            project,
            stages: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn all_specifications(&self) -> impl Iterator<Item = &Specification> + '_ {
        self.groups.iter().flat_map(|g| g.specifications.iter())
    }

    pub fn spec_count(&self) -> usize {
        self.groups.iter().map(SpecificationGroup::len).sum()
    }

    /// Collapse every group into one using `metadata`, ordered by identifier
    pub fn flatten(&mut self, metadata: GroupMetadata) {
        let mut specifications: Vec<Specification> = self
            .groups
            .drain(..)
            .flat_map(|g| g.specifications)
            .collect();
        specifications.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        self.groups.push(SpecificationGroup {
            metadata,
            specifications,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::Facet;

    fn spec(identifier: &str) -> Specification {
        Specification {
            identifier: identifier.to_string(),
            name: format!("{identifier} : Door Should Have Name Defined"),
            description: "Door Should Have Name Defined".to_string(),
            instructions: None,
            applicability: FacetGroup::new("Door", "").with_facet(Facet::entity("IFCDOOR")),
            applicability_cardinality: ApplicabilityCardinality::Optional,
            requirement: FacetGroup::new("Name", "").with_facet(Facet::attribute("Name", None)),
            dialects: vec![SchemaDialect::Ifc2x3],
        }
    }

    #[test]
    fn test_flatten_orders_by_identifier() {
        let mut bundle = RuleBundle::new("bundle", ProjectInfo::default());
        let mut first = SpecificationGroup::new(GroupMetadata::new("b"));
        first.push(spec("08_01"));
        let mut second = SpecificationGroup::new(GroupMetadata::new("a"));
        second.push(spec("01_02"));
        second.push(spec("01_01"));
        bundle.groups = vec![first, second];

        bundle.flatten(GroupMetadata::new("root"));
        assert_eq!(bundle.groups.len(), 1);
        let ids: Vec<&str> = bundle
            .all_specifications()
            .map(|s| s.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["01_01", "01_02", "08_01"]);
        assert_eq!(bundle.groups[0].name(), "root");
    }
}
