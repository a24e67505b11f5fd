//! Requirement vocabulary
//!
//! Each [`Requirement`] compiles to a requirement [`FacetGroup`] plus the
//! phrase that follows the modal verb in a specification title. The phrase
//! is produced once here and reused for the title, the stored description
//! and the facet group description.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumDiscriminants};

use crate::facets::{Facet, FacetGroup, PartOfRelation, RangeBounds, ValueConstraint};

/// Declarative requirement input to the rule builder
#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(
    name(RequirementKind),
    derive(Display, Hash, PartialOrd, Ord, Serialize, Deserialize)
)]
pub enum Requirement {
    AttributeHasValue {
        attribute: String,
        value: String,
    },
    AttributeMatchesPattern {
        attribute: String,
        pattern: String,
        /// Reads "Matching <narrative>"; defaults to "Project Standards"
        narrative: Option<String>,
    },
    AttributeInList {
        attribute: String,
        values: Vec<String>,
    },
    AttributeDefined {
        attribute: String,
    },
    AttributeLengthBetween {
        attribute: String,
        min: usize,
        max: usize,
    },
    AttributeValueInRange {
        attribute: String,
        bounds: RangeBounds,
    },
    PropertyDefined {
        property_set: String,
        property: String,
    },
    PropertyHasValue {
        property_set: String,
        property: String,
        value: String,
        data_type: Option<String>,
    },
    PropertyInList {
        property_set: String,
        property: String,
        values: Vec<String>,
        data_type: Option<String>,
    },
    PropertyMatchesPattern {
        property_set: String,
        property: String,
        pattern: String,
        pattern_name: String,
        data_type: Option<String>,
    },
    PropertyValueInRange {
        property_set: String,
        property: String,
        bounds: RangeBounds,
        data_type: Option<String>,
    },
    PropertySetPattern {
        property_set_pattern: String,
        property: String,
    },
    ClassificationDefined {
        label: String,
        system: ValueConstraint,
    },
    ClassificationHasValue {
        label: String,
        system: ValueConstraint,
        value: String,
    },
    ClassificationInList {
        label: String,
        system: ValueConstraint,
        values: Vec<String>,
    },
    ClassificationPattern {
        system_pattern: String,
        pattern: String,
    },
    PredefinedType {
        entity: String,
        predefined_type: String,
    },
    PartOf {
        relation: Option<PartOfRelation>,
        entity: String,
    },
}

/// A requirement ready to attach to a specification
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRequirement {
    pub kind: RequirementKind,
    /// Attribute, `Pset.Property`, classification label or related entity
    pub subject: String,
    /// Title text after the modal verb
    pub phrase: String,
    pub constraint: FacetGroup,
}

fn strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl Requirement {
    pub fn attribute_has_value(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AttributeHasValue {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn attribute_matches(attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::AttributeMatchesPattern {
            attribute: attribute.into(),
            pattern: pattern.into(),
            narrative: None,
        }
    }

    pub fn attribute_in_list<I, S>(attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AttributeInList {
            attribute: attribute.into(),
            values: strings(values),
        }
    }

    pub fn attribute_defined(attribute: impl Into<String>) -> Self {
        Self::AttributeDefined {
            attribute: attribute.into(),
        }
    }

    pub fn property_defined(property_set: impl Into<String>, property: impl Into<String>) -> Self {
        Self::PropertyDefined {
            property_set: property_set.into(),
            property: property.into(),
        }
    }

    pub fn property_has_value(
        property_set: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::PropertyHasValue {
            property_set: property_set.into(),
            property: property.into(),
            value: value.into(),
            data_type: None,
        }
    }

    pub fn property_in_list<I, S>(property_set: impl Into<String>, property: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PropertyInList {
            property_set: property_set.into(),
            property: property.into(),
            values: strings(values),
            data_type: None,
        }
    }

    pub fn property_matches(
        property_set: impl Into<String>,
        property: impl Into<String>,
        pattern: impl Into<String>,
        pattern_name: impl Into<String>,
    ) -> Self {
        Self::PropertyMatchesPattern {
            property_set: property_set.into(),
            property: property.into(),
            pattern: pattern.into(),
            pattern_name: pattern_name.into(),
            data_type: None,
        }
    }

    pub fn property_above(property_set: impl Into<String>, property: impl Into<String>, min: impl ToString) -> Self {
        Self::PropertyValueInRange {
            property_set: property_set.into(),
            property: property.into(),
            bounds: RangeBounds::above(min, false),
            data_type: None,
        }
    }

    pub fn classification_defined(label: impl Into<String>, system: ValueConstraint) -> Self {
        Self::ClassificationDefined {
            label: label.into(),
            system,
        }
    }

    pub fn classification_has_value(label: impl Into<String>, system: ValueConstraint, value: impl Into<String>) -> Self {
        Self::ClassificationHasValue {
            label: label.into(),
            system,
            value: value.into(),
        }
    }

    pub fn classification_in_list<I, S>(label: impl Into<String>, system: ValueConstraint, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ClassificationInList {
            label: label.into(),
            system,
            values: strings(values),
        }
    }

    pub fn classification_pattern(system_pattern: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::ClassificationPattern {
            system_pattern: system_pattern.into(),
            pattern: pattern.into(),
        }
    }

    pub fn part_of(relation: Option<PartOfRelation>, entity: impl Into<String>) -> Self {
        Self::PartOf {
            relation,
            entity: entity.into(),
        }
    }

    /// Set the narrative of a pattern requirement
    pub fn with_narrative(mut self, text: impl Into<String>) -> Self {
        if let Self::AttributeMatchesPattern { narrative, .. } = &mut self {
            *narrative = Some(text.into());
        }
        self
    }

    /// Set the IFC measure type of a property requirement
    pub fn with_data_type(mut self, measure: impl Into<String>) -> Self {
        match &mut self {
            Self::PropertyHasValue { data_type, .. }
            | Self::PropertyInList { data_type, .. }
            | Self::PropertyMatchesPattern { data_type, .. }
            | Self::PropertyValueInRange { data_type, .. } => *data_type = Some(measure.into()),
            _ => {}
        }
        self
    }

    pub fn kind(&self) -> RequirementKind {
        RequirementKind::from(self)
    }

    /// What the requirement is about, used for rule lookups
    pub fn subject(&self) -> String {
        match self {
            Self::AttributeHasValue { attribute, .. }
            | Self::AttributeMatchesPattern { attribute, .. }
            | Self::AttributeInList { attribute, .. }
            | Self::AttributeDefined { attribute }
            | Self::AttributeLengthBetween { attribute, .. }
            | Self::AttributeValueInRange { attribute, .. } => attribute.clone(),
            Self::PropertyDefined {
                property_set,
                property,
            }
            | Self::PropertyHasValue {
                property_set,
                property,
                ..
            }
            | Self::PropertyInList {
                property_set,
                property,
                ..
            }
            | Self::PropertyMatchesPattern {
                property_set,
                property,
                ..
            }
            | Self::PropertyValueInRange {
                property_set,
                property,
                ..
            } => format!("{property_set}.{property}"),
            Self::PropertySetPattern {
                property_set_pattern,
                property,
            } => format!("{property_set_pattern}.{property}"),
            Self::ClassificationDefined { label, .. }
            | Self::ClassificationHasValue { label, .. }
            | Self::ClassificationInList { label, .. } => label.clone(),
            Self::ClassificationPattern { system_pattern, .. } => system_pattern.clone(),
            Self::PredefinedType { .. } => "PredefinedType".to_string(),
            Self::PartOf { entity, .. } => entity.clone(),
        }
    }

    /// Human-readable phrase following the modal verb
    pub fn describe(&self) -> String {
        match self {
            Self::AttributeHasValue { attribute, value } => {
                format!("Have {attribute} Matching '{value}'")
            }
            Self::AttributeMatchesPattern {
                attribute,
                narrative,
                ..
            } => format!(
                "Have {attribute} Matching {}",
                narrative.as_deref().unwrap_or("Project Standards")
            ),
            Self::AttributeInList { attribute, values } => {
                format!("Have {attribute} In One Of {} Predefined Values.", values.len())
            }
            Self::AttributeDefined { attribute } => format!("Have {attribute} Defined"),
            Self::AttributeLengthBetween { attribute, min, max } => {
                format!("Have {attribute} Length Between {min} And {max}")
            }
            Self::AttributeValueInRange { attribute, bounds } => format!(
                "Have {attribute} Value Between {} And {}",
                bounds.min.as_deref().unwrap_or("nil"),
                bounds.max.as_deref().unwrap_or("infinity")
            ),
            Self::PropertyDefined {
                property_set,
                property,
            } => format!("Have Property '{property_set}.{property}' Defined."),
            Self::PropertyHasValue {
                property_set,
                property,
                value,
                ..
            } => format!("Have Property '{property_set}.{property}' With Value '{value}'."),
            Self::PropertyInList {
                property_set,
                property,
                values,
                ..
            } => format!(
                "Have Property '{property_set}.{property}' With One Of {} Predefined Values.",
                values.len()
            ),
            Self::PropertyMatchesPattern {
                property_set,
                property,
                pattern_name,
                ..
            } => format!("Have Property '{property_set}.{property}' With Value Matching {pattern_name}"),
            Self::PropertyValueInRange {
                property_set,
                property,
                bounds,
                ..
            } => format!(
                "Have Property '{property_set}.{property}' With Value '{}'.",
                bounds.short()
            ),
            Self::PropertySetPattern {
                property_set_pattern,
                property,
            } => format!("Have Property Matching '{property_set_pattern}.{property}' Defined"),
            Self::ClassificationDefined { label, .. } => {
                format!("Have {label} Classification Defined")
            }
            Self::ClassificationHasValue { label, value, .. } => {
                format!("Have {label} Classification With Value '{value}'")
            }
            Self::ClassificationInList { label, values, .. } => format!(
                "Have {label} Classification With One Of {} Predefined Values",
                values.len()
            ),
            Self::ClassificationPattern {
                system_pattern,
                pattern,
            } => format!("Have {system_pattern} Classification With Pattern '{pattern}'"),
            Self::PredefinedType {
                predefined_type, ..
            } => format!("Have predefinedType '{predefined_type}'."),
            Self::PartOf { entity, .. } => format!("Have a {entity}"),
        }
    }

    fn facet(&self) -> Facet {
        match self {
            Self::AttributeHasValue { attribute, value } => {
                Facet::attribute(attribute, Some(ValueConstraint::exact(value)))
            }
            Self::AttributeMatchesPattern {
                attribute, pattern, ..
            } => Facet::attribute(attribute, Some(ValueConstraint::pattern(pattern))),
            Self::AttributeInList { attribute, values } => {
                Facet::attribute(attribute, Some(ValueConstraint::List(values.clone())))
            }
            Self::AttributeDefined { attribute } => Facet::attribute(attribute, None),
            Self::AttributeLengthBetween { attribute, min, max } => Facet::attribute(
                attribute,
                Some(ValueConstraint::Length {
                    min: *min,
                    max: *max,
                }),
            ),
            Self::AttributeValueInRange { attribute, bounds } => {
                Facet::attribute(attribute, Some(ValueConstraint::Range(bounds.clone())))
            }
            Self::PropertyDefined {
                property_set,
                property,
            } => Facet::property(property_set.as_str(), property.as_str(), None, None),
            Self::PropertyHasValue {
                property_set,
                property,
                value,
                data_type,
            } => Facet::property(
                property_set.as_str(),
                property.as_str(),
                Some(ValueConstraint::exact(value)),
                data_type.as_deref(),
            ),
            Self::PropertyInList {
                property_set,
                property,
                values,
                data_type,
            } => Facet::property(
                property_set.as_str(),
                property.as_str(),
                Some(ValueConstraint::List(values.clone())),
                data_type.as_deref(),
            ),
            Self::PropertyMatchesPattern {
                property_set,
                property,
                pattern,
                data_type,
                ..
            } => Facet::property(
                property_set.as_str(),
                property.as_str(),
                Some(ValueConstraint::pattern(pattern)),
                data_type.as_deref(),
            ),
            Self::PropertyValueInRange {
                property_set,
                property,
                bounds,
                data_type,
            } => Facet::property(
                property_set.as_str(),
                property.as_str(),
                Some(ValueConstraint::Range(bounds.clone())),
                data_type.as_deref(),
            ),
            Self::PropertySetPattern {
                property_set_pattern,
                property,
            } => Facet::property(
                ValueConstraint::pattern(property_set_pattern),
                property.as_str(),
                None,
                None,
            ),
            Self::ClassificationDefined { system, .. } => Facet::classification(Some(system.clone()), None),
            Self::ClassificationHasValue { system, value, .. } => {
                Facet::classification(Some(system.clone()), Some(ValueConstraint::exact(value)))
            }
            Self::ClassificationInList { system, values, .. } => Facet::classification(
                Some(system.clone()),
                Some(ValueConstraint::List(values.clone())),
            ),
            Self::ClassificationPattern {
                system_pattern,
                pattern,
            } => Facet::classification(
                Some(ValueConstraint::pattern(system_pattern)),
                Some(ValueConstraint::pattern(pattern)),
            ),
            Self::PredefinedType {
                entity,
                predefined_type,
            } => Facet::Entity {
                entity: ValueConstraint::exact(entity.to_ascii_uppercase()),
                predefined_type: Some(ValueConstraint::exact(predefined_type)),
            },
            Self::PartOf { relation, entity } => Facet::PartOf {
                relation: *relation,
                entity: entity.to_ascii_uppercase(),
            },
        }
    }

    /// Build the facet group and phrase; the phrase is computed exactly once
    pub fn compile(&self) -> CompiledRequirement {
        let phrase = self.describe();
        let constraint = FacetGroup {
            name: self.subject(),
            description: phrase.clone(),
            facets: vec![self.facet()],
            options: Vec::new(),
        };
        CompiledRequirement {
            kind: self.kind(),
            subject: self.subject(),
            phrase,
            constraint,
        }
    }
}
