//! Facet vocabulary
//!
//! A facet is one predicate over an IFC instance: its entity class, an
//! attribute, a property, a classification reference or a part-of relation.
//! Facets are grouped into a [`FacetGroup`] which serves as either the
//! applicability (which instances a rule selects) or the requirement (what a
//! selected instance must satisfy) of a specification.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Accepted values for one facet field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ValueConstraint {
    Exact(String),
    /// XML-schema regex, matched against the whole value
    Pattern(String),
    List(Vec<String>),
    Range(RangeBounds),
    Length { min: usize, max: usize },
}

/// Numeric bounds, kept as their source text so facets stay comparable
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeBounds {
    pub min: Option<String>,
    pub min_inclusive: bool,
    pub max: Option<String>,
    pub max_inclusive: bool,
}

impl RangeBounds {
    pub fn above(min: impl ToString, inclusive: bool) -> Self {
        Self {
            min: Some(min.to_string()),
            min_inclusive: inclusive,
            ..Self::default()
        }
    }

    pub fn between(min: Option<String>, min_inclusive: bool, max: Option<String>, max_inclusive: bool) -> Self {
        Self {
            min,
            min_inclusive,
            max,
            max_inclusive,
        }
    }

    /// `>0`, `>=1 and <=10`
    pub fn short(&self) -> String {
        let lower = self
            .min
            .as_ref()
            .map(|m| format!("{}{m}", if self.min_inclusive { ">=" } else { ">" }));
        let upper = self
            .max
            .as_ref()
            .map(|m| format!("{}{m}", if self.max_inclusive { "<=" } else { "<" }));
        match (lower, upper) {
            (Some(l), Some(u)) => format!("{l} and {u}"),
            (Some(l), None) => l,
            (None, Some(u)) => u,
            (None, None) => "any".to_string(),
        }
    }
}

impl ValueConstraint {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern(pattern.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    /// The single value when the constraint is an exact match
    pub fn as_exact(&self) -> Option<&str> {
        match self {
            Self::Exact(v) => Some(v),
            _ => None,
        }
    }

    /// Compact rendering used in facet descriptions
    pub fn short(&self) -> String {
        match self {
            Self::Exact(v) => format!("'{v}'"),
            Self::Pattern(p) => format!("/{p}/"),
            Self::List(values) => format!(
                "[{}]",
                values.iter().map(|v| format!("'{v}'")).collect::<Vec<_>>().join(",")
            ),
            Self::Range(bounds) => bounds.short(),
            Self::Length { min, max } => format!("length {min}..{max}"),
        }
    }
}

impl From<&str> for ValueConstraint {
    fn from(value: &str) -> Self {
        Self::Exact(value.to_string())
    }
}

impl From<String> for ValueConstraint {
    fn from(value: String) -> Self {
        Self::Exact(value)
    }
}

/// Relations a part-of facet can navigate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum PartOfRelation {
    #[strum(serialize = "IFCRELAGGREGATES")]
    #[serde(rename = "IFCRELAGGREGATES")]
    Aggregates,
    #[strum(serialize = "IFCRELASSIGNSTOGROUP")]
    #[serde(rename = "IFCRELASSIGNSTOGROUP")]
    AssignsToGroup,
    #[strum(serialize = "IFCRELCONTAINEDINSPATIALSTRUCTURE")]
    #[serde(rename = "IFCRELCONTAINEDINSPATIALSTRUCTURE")]
    ContainedInSpatialStructure,
    #[strum(serialize = "IFCRELNESTS")]
    #[serde(rename = "IFCRELNESTS")]
    Nests,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "facet", rename_all = "snake_case")]
pub enum Facet {
    Entity {
        /// Upper-case class name(s)
        entity: ValueConstraint,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        predefined_type: Option<ValueConstraint>,
    },
    Attribute {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<ValueConstraint>,
    },
    Property {
        property_set: ValueConstraint,
        name: ValueConstraint,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<ValueConstraint>,
        /// IFC measure type, upper case
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_type: Option<String>,
    },
    Classification {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system: Option<ValueConstraint>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<ValueConstraint>,
    },
    PartOf {
        relation: Option<PartOfRelation>,
        entity: String,
    },
}

impl Facet {
    pub fn entity(entity: impl Into<ValueConstraint>) -> Self {
        Self::Entity {
            entity: entity.into(),
            predefined_type: None,
        }
    }

    pub fn attribute(name: impl Into<String>, value: Option<ValueConstraint>) -> Self {
        Self::Attribute {
            name: name.into(),
            value,
        }
    }

    pub fn property(
        property_set: impl Into<ValueConstraint>,
        name: impl Into<ValueConstraint>,
        value: Option<ValueConstraint>,
        data_type: Option<&str>,
    ) -> Self {
        Self::Property {
            property_set: property_set.into(),
            name: name.into(),
            value,
            data_type: data_type
                .filter(|d| !d.is_empty())
                .map(str::to_ascii_uppercase),
        }
    }

    pub fn classification(system: Option<ValueConstraint>, value: Option<ValueConstraint>) -> Self {
        Self::Classification { system, value }
    }

    /// Structural description; equal facets always describe identically
    pub fn describe(&self) -> String {
        match self {
            Self::Entity {
                entity,
                predefined_type,
            } => {
                let mut text = format!("of entity {}", entity.short());
                if let Some(pdt) = predefined_type {
                    text.push_str(&format!(" and predefined type {}", pdt.short()));
                }
                text
            }
            Self::Attribute { name, value } => match value {
                Some(value) => format!("with attribute {name} = {}", value.short()),
                None => format!("with attribute {name}"),
            },
            Self::Property {
                property_set,
                name,
                value,
                data_type,
            } => {
                let mut text = format!("with property {}.{}", property_set.short(), name.short());
                if let Some(value) = value {
                    text.push_str(&format!(" = {}", value.short()));
                }
                if let Some(data_type) = data_type {
                    text.push_str(&format!(" ({data_type})"));
                }
                text
            }
            Self::Classification { system, value } => {
                let system = system
                    .as_ref()
                    .map(ValueConstraint::short)
                    .unwrap_or_else(|| "any system".to_string());
                match value {
                    Some(value) => format!("classified by {system} as {}", value.short()),
                    None => format!("classified by {system}"),
                }
            }
            Self::PartOf { relation, entity } => match relation {
                Some(relation) => format!("part of {entity} through {relation}"),
                None => format!("part of {entity}"),
            },
        }
    }
}

/// Cardinality applied to each requirement facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
pub enum RequirementCardinality {
    #[default]
    Expected,
    Prohibited,
    Optional,
}

impl RequirementCardinality {
    /// Modal verb used in specification titles
    pub fn modal(self) -> &'static str {
        match self {
            Self::Expected => "Should",
            Self::Prohibited => "Should not",
            Self::Optional => "Can",
        }
    }

    /// IDS `cardinality` attribute value
    pub fn ids_value(self) -> &'static str {
        match self {
            Self::Expected => "required",
            Self::Prohibited => "prohibited",
            Self::Optional => "optional",
        }
    }
}

/// Whether matching instances must, may or must not exist in a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Display, Serialize, Deserialize)]
pub enum ApplicabilityCardinality {
    Required,
    #[default]
    Optional,
    Prohibited,
}

impl ApplicabilityCardinality {
    /// (minOccurs, maxOccurs) for the IDS applicability element
    pub fn occurs(self) -> (&'static str, &'static str) {
        match self {
            Self::Required => ("1", "unbounded"),
            Self::Optional => ("0", "unbounded"),
            Self::Prohibited => ("0", "0"),
        }
    }
}

/// Named, ordered set of facets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetGroup {
    pub name: String,
    pub description: String,
    pub facets: Vec<Facet>,
    /// One entry per facet for requirements, empty for applicability
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<RequirementCardinality>,
}

impl FacetGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            facets: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_facet(mut self, facet: Facet) -> Self {
        self.facets.push(facet);
        self
    }

    /// Narrow the first entity facet to one predefined type
    pub fn with_predefined_type(mut self, predefined_type: impl Into<String>) -> Self {
        let predefined_type = predefined_type.into();
        if let Some(Facet::Entity {
            predefined_type: slot,
            ..
        }) = self.facets.iter_mut().find(|f| matches!(f, Facet::Entity { .. }))
        {
            *slot = Some(ValueConstraint::Exact(predefined_type));
        }
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    /// Apply one cardinality to every facet
    pub fn set_requirement_cardinality(&mut self, cardinality: RequirementCardinality) {
        self.options = vec![cardinality; self.facets.len()];
    }

    /// Cardinality for the facet at `index`, defaulting to Expected
    pub fn option_at(&self, index: usize) -> RequirementCardinality {
        self.options.get(index).copied().unwrap_or_default()
    }

    /// Facets paired with their cardinality
    pub fn entries(&self) -> impl Iterator<Item = (&Facet, RequirementCardinality)> + '_ {
        self.facets
            .iter()
            .enumerate()
            .map(|(i, f)| (f, self.option_at(i)))
    }

    /// Append a facet unless an identical (facet, cardinality) entry exists
    pub fn push_unique(&mut self, facet: Facet, cardinality: RequirementCardinality) -> bool {
        if self
            .entries()
            .any(|(f, c)| f == &facet && c == cardinality)
        {
            return false;
        }
        // keep options aligned before extending
        while self.options.len() < self.facets.len() {
            self.options.push(RequirementCardinality::default());
        }
        self.facets.push(facet);
        self.options.push(cardinality);
        true
    }

    /// Structural key: two groups with the same facets decode identically
    /// regardless of their names or descriptions
    pub fn decode(&self) -> String {
        if self.facets.is_empty() {
            return self.name.clone();
        }
        let facets = self
            .facets
            .iter()
            .map(Facet::describe)
            .collect::<Vec<_>>()
            .join(" AND ");
        let options = self
            .options
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("All elements {facets}{options}")
    }

    /// Upper-case class names selected by the first entity facet
    pub fn entity_names(&self) -> Vec<&str> {
        self.facets
            .iter()
            .find_map(|f| match f {
                Facet::Entity { entity, .. } => Some(entity),
                _ => None,
            })
            .map(|entity| match entity {
                ValueConstraint::Exact(v) => vec![v.as_str()],
                ValueConstraint::List(values) => values.iter().map(String::as_str).collect(),
                _ => Vec::new(),
            })
            .unwrap_or_default()
    }

    /// Predefined type of the first entity facet, when exact
    pub fn predefined_type(&self) -> Option<&str> {
        self.facets.iter().find_map(|f| match f {
            Facet::Entity {
                predefined_type: Some(pdt),
                ..
            } => pdt.as_exact(),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_ignores_names() {
        let a = FacetGroup::new("Door", "Door entity selector").with_facet(Facet::entity("IFCDOOR"));
        let b = FacetGroup::new("Doors", "something else").with_facet(Facet::entity("IFCDOOR"));
        assert_eq!(a.decode(), b.decode());
        assert_eq!(a.decode(), "All elements of entity 'IFCDOOR'");

        let c = FacetGroup::new("Door", "").with_facet(Facet::Entity {
            entity: "IFCDOOR".into(),
            predefined_type: Some("GATE".into()),
        });
        assert_ne!(a.decode(), c.decode());
    }

    #[test]
    fn test_empty_group_decodes_to_name() {
        assert_eq!(FacetGroup::new("Project", "").decode(), "Project");
    }

    #[test]
    fn test_push_unique_keeps_options_aligned() {
        let facet = Facet::property("Pset_DoorCommon", "FireRating", None, None);
        let mut group = FacetGroup::new("FireRating", "").with_facet(facet.clone());
        group.set_requirement_cardinality(RequirementCardinality::Expected);

        assert!(!group.push_unique(facet.clone(), RequirementCardinality::Expected));
        assert!(group.push_unique(facet, RequirementCardinality::Prohibited));
        assert_eq!(group.len(), 2);
        assert_eq!(group.options.len(), 2);
        assert_eq!(group.option_at(1), RequirementCardinality::Prohibited);
    }

    #[test]
    fn test_range_short_forms() {
        assert_eq!(RangeBounds::above(0, false).short(), ">0");
        let both = RangeBounds::between(Some("1".into()), true, Some("10".into()), true);
        assert_eq!(both.short(), ">=1 and <=10");
    }

    #[test]
    fn test_list_values_keep_their_boundaries() {
        let joined = FacetGroup::new("Space", "").with_facet(Facet::attribute("Name", Some(ValueConstraint::list(["A,B"]))));
        let split = FacetGroup::new("Space", "").with_facet(Facet::attribute("Name", Some(ValueConstraint::list(["A", "B"]))));
        assert_ne!(joined.decode(), split.decode());
        assert_eq!(ValueConstraint::list(["A", "B"]).short(), "['A','B']");
    }

    #[test]
    fn test_entity_names() {
        let group = FacetGroup::new("Object Type", "")
            .with_facet(Facet::entity(ValueConstraint::list(["IFCDOORSTYLE", "IFCWINDOWSTYLE"])));
        assert_eq!(group.entity_names(), vec!["IFCDOORSTYLE", "IFCWINDOWSTYLE"]);
        assert_eq!(group.predefined_type(), None);

        let refined = group.with_predefined_type("GATE");
        assert_eq!(refined.predefined_type(), Some("GATE"));
    }
}
