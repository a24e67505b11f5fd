//! Rule builder
//!
//! Turns an applicability and a [`Requirement`] into a [`Specification`] in
//! the current scope. Every builder call:
//!
//! 1. no-ops (consuming a numbering slot) when the scope does not apply to
//!    the target stage and pass
//! 2. allocates the identifier from the scope
//! 3. titles the rule `<label> <modal> <phrase>`
//! 4. infers the schema dialects the rule is valid for
//! 5. records the rule in the [`RuleIndex`](crate::RuleIndex) and appends it
//!    to the scope's active group

use strum::IntoEnumIterator;
use tracing::trace;

use crate::error::{GeneratorError, Result};
use crate::facets::{ApplicabilityCardinality, Facet, FacetGroup, ValueConstraint};
use crate::model::Specification;
use crate::requirement::Requirement;
use crate::schema::{DialectSet, SchemaDialect, SchemaFacade, SchemaView};
use crate::scope::SpecCompiler;

fn entity_selector(label: &str, mut names: Vec<String>) -> FacetGroup {
    names.sort();
    names.dedup();
    let entity = if names.len() == 1 {
        ValueConstraint::Exact(names.remove(0))
    } else {
        ValueConstraint::List(names)
    };
    FacetGroup::new(label, format!("{label} entity selector")).with_facet(Facet::entity(entity))
}

impl SpecCompiler {
    /// Entity types and all their concrete subtypes, resolved in the rule
    /// dialect
    pub fn applicability(&self, label: &str, entities: &[&str]) -> Result<FacetGroup> {
        Self::expand(self.schema(), label, entities)
    }

    /// As [`applicability`](Self::applicability), resolved against the
    /// occurrence view so IFC4 occurrence classes can be used on IFC2X3
    pub fn occurrence_applicability(&self, label: &str, entities: &[&str]) -> Result<FacetGroup> {
        Self::expand(self.occurrence_schema(), label, entities)
    }

    /// One entity type, not expanded to subtypes
    pub fn exact_applicability(&self, label: &str, entity: &str) -> Result<FacetGroup> {
        let view = self.occurrence_schema();
        let descriptor = view.require(entity)?;
        Ok(entity_selector(label, vec![descriptor.upper_name()]))
    }

    /// Entity types narrowed to a classification system and value list
    pub fn classified_applicability<I, S>(
        &self,
        label: &str,
        entities: &[&str],
        system: ValueConstraint,
        values: I,
    ) -> Result<FacetGroup>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self
            .applicability(label, entities)?
            .with_facet(Facet::classification(Some(system), Some(ValueConstraint::list(values)))))
    }

    fn expand(view: SchemaView<'_>, label: &str, entities: &[&str]) -> Result<FacetGroup> {
        let mut names = Vec::new();
        for entity in entities {
            names.extend(
                view.concrete_subtypes_of(entity)?
                    .into_iter()
                    .map(|d| d.upper_name()),
            );
        }
        if names.is_empty() {
            return Err(GeneratorError::unsupported(entities.join(","), view.dialect()));
        }
        Ok(entity_selector(label, names))
    }

    /// Create a rule titled from its requirement; returns the identifier,
    /// or `None` when the scope does not apply
    pub fn create_specification(
        &mut self,
        applicability: &FacetGroup,
        requirement: Requirement,
    ) -> Result<Option<String>> {
        self.create_specification_titled(applicability, requirement, None)
    }

    /// As [`create_specification`](Self::create_specification); `title`
    /// replaces the synthesized title and description
    pub fn create_specification_titled(
        &mut self,
        applicability: &FacetGroup,
        requirement: Requirement,
        title: Option<&str>,
    ) -> Result<Option<String>> {
        self.check_deferred()?;
        if self.should_skip_for_stage() {
            return Ok(None);
        }

        let compiled = requirement.compile();
        let cardinality = self.requirement_cardinality();
        let title = match title {
            Some(title) => title.to_string(),
            None => format!("{} {} {}", applicability.name, cardinality.modal(), compiled.phrase),
        };

        let mut constraint = compiled.constraint;
        constraint.set_requirement_cardinality(cardinality);

        let identifier = self.generate_identifier();
        let spec = Specification {
            name: self.spec_name(&identifier, &title),
            identifier: identifier.clone(),
            description: title,
            instructions: None,
            applicability: applicability.clone(),
            applicability_cardinality: self.applicability_cardinality(),
            requirement: constraint,
            dialects: self.infer_dialects(applicability),
        };

        let sub_kind = applicability.predefined_type().map(str::to_string);
        for entity in applicability.entity_names() {
            let entity = entity.to_string();
            self.index_mut().record(
                &entity,
                sub_kind.as_deref(),
                compiled.kind,
                &compiled.subject,
                &identifier,
            );
        }
        trace!("{} {}", identifier, spec.description);
        self.append(spec)?;
        Ok(Some(identifier))
    }

    /// Rule that only asserts instances exist: "Must have <label>s"
    pub fn create_presence_specification(&mut self, applicability: &FacetGroup) -> Result<Option<String>> {
        self.check_deferred()?;
        if self.should_skip_for_stage() {
            return Ok(None);
        }
        let title = format!("Must have {}s", applicability.name);
        let identifier = self.generate_identifier();
        let spec = Specification {
            name: self.spec_name(&identifier, &title),
            identifier: identifier.clone(),
            requirement: FacetGroup::new(applicability.name.clone(), title.clone()),
            description: title,
            instructions: None,
            applicability: applicability.clone(),
            applicability_cardinality: ApplicabilityCardinality::Required,
            dialects: self.infer_dialects(applicability),
        };
        self.append(spec)?;
        Ok(Some(identifier))
    }

    fn spec_name(&self, identifier: &str, title: &str) -> String {
        if self.prefix_spec_name_with_id() {
            format!("{identifier} : {title}")
        } else {
            title.to_string()
        }
    }

    /// Dialects every selected entity is valid in: natively, or through an
    /// `<Entity>Type` object in that dialect. Falls back to the target dialect.
    pub fn infer_dialects(&self, applicability: &FacetGroup) -> Vec<SchemaDialect> {
        let supported = self.settings().supported_dialects;
        let catalog = self.catalog();
        let mut common: Option<DialectSet> = None;
        for name in applicability.entity_names() {
            let Some(descriptor) = catalog.lookup_any(name) else {
                continue;
            };
            let mut valid = descriptor.dialects & supported;
            let type_name = format!("{}TYPE", descriptor.upper_name());
            for dialect in SchemaDialect::iter() {
                if supported.supports(dialect)
                    && !valid.supports(dialect)
                    && catalog.view(dialect).lookup(&type_name).is_some()
                {
                    valid |= dialect.flag();
                }
            }
            common = Some(common.map_or(valid, |acc| acc & valid));
        }

        let common = common.unwrap_or_else(DialectSet::empty);
        let dialects: Vec<SchemaDialect> = SchemaDialect::iter().filter(|d| common.supports(*d)).collect();
        if dialects.is_empty() {
            vec![self.settings().target_dialect]
        } else {
            dialects
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::facets::RequirementCardinality;
    use crate::model::GroupMetadata;
    use crate::requirement::RequirementKind;
    use crate::schema::catalog::tests::test_catalog;
    use crate::scope::{CompilerSettings, NullSink};
    use crate::stages::{GenerationPass, LifecycleStages, RibaStage};
    use pretty_assertions::assert_eq;

    fn compiler(settings: CompilerSettings) -> SpecCompiler {
        SpecCompiler::new(
            settings,
            Arc::new(test_catalog()),
            GroupMetadata::new("Bundle"),
            Box::new(NullSink),
        )
        .unwrap()
    }

    fn stage4() -> SpecCompiler {
        compiler(CompilerSettings::new(RibaStage::Stage4, GenerationPass::CORE))
    }

    #[test]
    fn test_not_defined_rule_is_prohibited() {
        let mut root = stage4();
        let types = root.applicability("Object Type", &["IfcTypeProduct"]).unwrap();
        let id = {
            let mut scope = root.begin_child_scope(None);
            scope.set_requirement_cardinality(RequirementCardinality::Prohibited);
            scope
                .create_specification(&types, Requirement::attribute_has_value("PredefinedType", "NOTDEFINED"))
                .unwrap()
        };
        assert_eq!(id.as_deref(), Some("01_01"));

        let compiled = root.finish().unwrap();
        let spec = &compiled.groups[0].specifications[0];
        assert_eq!(
            spec.name,
            "01_01 : Object Type Should not Have PredefinedType Matching 'NOTDEFINED'"
        );
        assert_eq!(spec.description, "Object Type Should not Have PredefinedType Matching 'NOTDEFINED'");
        assert_eq!(spec.requirement.option_at(0), RequirementCardinality::Prohibited);
        assert_eq!(
            types.entity_names(),
            vec!["IFCAIRTERMINALTYPE", "IFCDOORSTYLE", "IFCGASTERMINALTYPE", "IFCSPACEHEATERTYPE"]
        );
    }

    #[test]
    fn test_inapplicable_scope_consumes_slot() {
        let mut root = compiler(CompilerSettings::new(RibaStage::Stage3, GenerationPass::CORE));
        let doors = root.applicability("Door", &["IfcDoor"]).unwrap();
        let mut scope = root.begin_child_scope(None);
        scope.set_applicable_stages(LifecycleStages::STAGE4_PLUS);
        let skipped = scope
            .create_specification(&doors, Requirement::attribute_defined("Name"))
            .unwrap();
        assert_eq!(skipped, None);
        scope.set_applicable_stages(LifecycleStages::ALL);
        let created = scope
            .create_specification(&doors, Requirement::attribute_defined("Name"))
            .unwrap();
        assert_eq!(created.as_deref(), Some("01_02"));
        assert_eq!(scope.active_group_len(), 1);
    }

    #[test]
    fn test_unknown_entity_is_unsupported() {
        let root = stage4();
        let err = root.applicability("Widget", &["IfcWidget"]).unwrap_err();
        assert!(matches!(err, GeneratorError::UnsupportedType { ref name, .. } if name == "IfcWidget"));
        assert!(root.applicability("Tank", &["IfcTank"]).is_err());
    }

    #[test]
    fn test_dialect_inference() {
        let root = stage4();
        let terminal = root.occurrence_applicability("Air Terminal", &["IfcAirTerminal"]).unwrap();
        assert_eq!(root.infer_dialects(&terminal), vec![SchemaDialect::Ifc2x3]);

        let all = compiler(
            CompilerSettings::new(RibaStage::Stage4, GenerationPass::CORE)
                .with_dialects(SchemaDialect::Ifc4, DialectSet::ALL),
        );
        let terminal = all.applicability("Air Terminal", &["IfcAirTerminal"]).unwrap();
        assert_eq!(
            all.infer_dialects(&terminal),
            vec![SchemaDialect::Ifc2x3, SchemaDialect::Ifc4, SchemaDialect::Ifc4x3]
        );
        let tank = all.applicability("Tank", &["IfcTank"]).unwrap();
        assert_eq!(all.infer_dialects(&tank), vec![SchemaDialect::Ifc4, SchemaDialect::Ifc4x3]);

        let unknown = FacetGroup::new("Project", "");
        assert_eq!(all.infer_dialects(&unknown), vec![SchemaDialect::Ifc4]);
    }

    #[test]
    fn test_title_override_and_presence_rule() {
        let mut root = stage4();
        let spaces = root.applicability("Space", &["IfcSpace"]).unwrap();
        {
            let mut scope = root.begin_child_scope(None);
            scope.set_prefix_spec_name_with_id(false);
            scope
                .create_specification_titled(
                    &spaces,
                    Requirement::attribute_matches("Name", "\\d+"),
                    Some("Space Should Have Name Matching The Projects Information Standard"),
                )
                .unwrap();
            scope.create_presence_specification(&spaces).unwrap();
        }
        let compiled = root.finish().unwrap();
        let specs = &compiled.groups[0].specifications;
        assert_eq!(specs[0].name, "Space Should Have Name Matching The Projects Information Standard");
        assert_eq!(specs[0].description, specs[0].name);
        assert_eq!(specs[1].name, "Must have Spaces");
        assert!(specs[1].is_presence_only());
        assert_eq!(specs[1].applicability_cardinality, ApplicabilityCardinality::Required);
    }

    #[test]
    fn test_rules_are_indexed_by_entity_and_sub_kind() {
        let mut root = stage4();
        let radiators = root
            .exact_applicability("Space Heater", "IfcSpaceHeater")
            .unwrap()
            .with_predefined_type("RADIATOR");
        let mut scope = root.begin_child_scope(None);
        scope
            .create_specification(&radiators, Requirement::attribute_matches("Name", "RAD-\\d{2,5}"))
            .unwrap();
        assert_eq!(
            scope
                .index()
                .lookup("IfcSpaceHeater", Some("RADIATOR"), RequirementKind::AttributeMatchesPattern, "Name"),
            Some("01_01")
        );
    }
}
