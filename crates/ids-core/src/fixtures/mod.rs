//! Fixture synthesizer
//!
//! Walks the type-object hierarchy below a set of root types and, for every
//! concrete type and each of its sub-kinds, creates a conforming sample in
//! the pass container and a non-conforming twin in the fail container. Names
//! come from the [`NamingResolver`], tags from the [`RuleIndex`], so each
//! sample points at a rule that was actually compiled.
//!
//! The reserved undefined sub-kind never gets a pass sample: rules prohibit
//! it, so it only ever appears as a failure (see [`UndefinedSubKindPolicy`]).

mod baseline;
mod corruption;

pub use baseline::{Baseline, Field, SampleBuilder, ValueSet};
pub use corruption::{CorruptionRecord, CorruptionScript, CorruptionStep, Mutation, RoundRobin};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::Result;
use crate::naming::{NamingResolver, UndefinedSubKindPolicy, UNDEFINED_SUB_KIND};
use crate::requirement::RequirementKind;
use crate::rule_index::RuleIndex;
use crate::schema::{EntityTypeDescriptor, SchemaFacade, SchemaView};

/// Prefix that breaks every naming pattern
pub const INVALID_NAME_PREFIX: &str = "BAD-";

/// One synthesized entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInstance {
    /// Class instantiated in the target schema, e.g. `IfcFlowTerminal`
    pub entity: String,
    /// Class the sample stands for, e.g. `IfcSpaceHeater`
    pub logical_entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_kind: Option<String>,
    /// Sample name of the type object defining this instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub container: String,
    /// Rule identifiers this sample exercises
    #[serde(default)]
    pub tags: Vec<String>,
    pub conforming: bool,
    #[serde(default)]
    pub domain: String,
    pub values: ValueSet,
}

impl SampleInstance {
    pub fn new(entity: impl Into<String>, container: impl Into<String>, name: impl Into<String>) -> Self {
        let entity = entity.into();
        Self {
            logical_entity: entity.clone(),
            entity,
            sub_kind: None,
            type_name: None,
            container: container.into(),
            tags: Vec::new(),
            conforming: true,
            domain: String::new(),
            values: ValueSet::default().with(Field::attribute("Name"), name),
        }
    }

    pub fn with_values(mut self, values: ValueSet) -> Self {
        self.values = values;
        self
    }

    pub fn with_tag(mut self, tag: Option<&str>) -> Self {
        if let Some(tag) = tag {
            self.tags.push(tag.to_string());
        }
        self
    }

    pub fn name(&self) -> &str {
        self.values.get(&Field::attribute("Name")).unwrap_or_default()
    }
}

/// Synthesized samples in generation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSet {
    pub instances: Vec<SampleInstance>,
}

impl FixtureSet {
    pub fn push(&mut self, instance: SampleInstance) -> usize {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn conforming(&self) -> impl Iterator<Item = &SampleInstance> + '_ {
        self.instances.iter().filter(|i| i.conforming)
    }

    pub fn non_conforming(&self) -> impl Iterator<Item = &SampleInstance> + '_ {
        self.instances.iter().filter(|i| !i.conforming)
    }

    /// Every rule identifier referenced by a sample
    pub fn tags(&self) -> BTreeSet<&str> {
        self.instances
            .iter()
            .flat_map(|i| i.tags.iter().map(String::as_str))
            .collect()
    }

    /// Indices of the conforming samples of one logical entity
    pub fn conforming_indices(&self, logical_entity: &str) -> Vec<usize> {
        self.instances
            .iter()
            .enumerate()
            .filter(|(_, i)| i.conforming && i.logical_entity.eq_ignore_ascii_case(logical_entity))
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Pass/fail sample generator over one schema
pub struct FixtureSynthesizer<'a> {
    /// Hybrid view used to find types and their logical occurrences
    logical: SchemaView<'a>,
    /// View the samples are instantiated in
    target: SchemaView<'a>,
    resolver: &'a NamingResolver,
    index: &'a RuleIndex,
    policy: UndefinedSubKindPolicy,
    pass_container: String,
    fail_container: String,
}

impl<'a> FixtureSynthesizer<'a> {
    pub fn new(
        logical: SchemaView<'a>,
        target: SchemaView<'a>,
        resolver: &'a NamingResolver,
        index: &'a RuleIndex,
    ) -> Self {
        Self {
            logical,
            target,
            resolver,
            index,
            policy: UndefinedSubKindPolicy::default(),
            pass_container: "00-01A".to_string(),
            fail_container: "00-02A".to_string(),
        }
    }

    pub fn with_policy(mut self, policy: UndefinedSubKindPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_containers(mut self, pass: impl Into<String>, fail: impl Into<String>) -> Self {
        self.pass_container = pass.into();
        self.fail_container = fail.into();
        self
    }

    /// Concrete types below `roots`, ordered by domain then name
    fn types_below(&self, roots: &[&str]) -> Result<Vec<&'a EntityTypeDescriptor>> {
        let view = self.logical;
        let mut types: Vec<&'a EntityTypeDescriptor> = Vec::new();
        for root in roots {
            let root = view.require(root)?;
            types.extend(
                view.concrete_subtypes_of(&root.name)?
                    .into_iter()
                    .filter_map(|d| view.catalog().lookup_any(&d.name)),
            );
        }
        types.sort_by(|a, b| a.domain.cmp(&b.domain).then_with(|| a.name.cmp(&b.name)));
        types.dedup_by(|a, b| a.name == b.name);
        Ok(types)
    }

    /// Samples for every concrete type below `roots`
    pub fn synthesize(&self, roots: &[&str]) -> Result<FixtureSet> {
        let mut set = FixtureSet::default();
        for ty in self.types_below(roots)? {
            self.synthesize_type(ty, &mut set)?;
        }
        debug!(
            "synthesized {} samples ({} conforming)",
            set.len(),
            set.conforming().count()
        );
        Ok(set)
    }

    fn synthesize_type(&self, ty: &EntityTypeDescriptor, set: &mut FixtureSet) -> Result<()> {
        let conventions = self.resolver.conventions();
        let logical = conventions.logical_instance(&self.logical, &ty.name)?;
        let concrete = conventions.schema_instance(&self.target, logical)?;

        let sub_kinds: Vec<Option<&str>> = if ty.sub_kinds.is_empty() {
            vec![None]
        } else {
            ty.sub_kinds.iter().map(|s| Some(s.as_str())).collect()
        };

        let mut variant = 0;
        for sub_kind in sub_kinds {
            if sub_kind == Some(UNDEFINED_SUB_KIND) {
                if self.policy.fixture_occurrences {
                    set.push(self.undefined_sample(ty, logical, concrete));
                } else {
                    trace!("{} {} sample suppressed", ty.name, UNDEFINED_SUB_KIND);
                }
                continue;
            }
            variant += 1;
            let type_name = self
                .resolver
                .type_convention(&ty.name, sub_kind)
                .sample_name(variant);
            let tag = self.naming_tag(ty, logical, sub_kind);

            for (container, conforming) in [(&self.pass_container, true), (&self.fail_container, false)] {
                let resolved = self
                    .resolver
                    .resolve_name_or(&logical.name, sub_kind, container, Some(&type_name));
                let name = if conforming {
                    resolved.name
                } else {
                    format!("{INVALID_NAME_PREFIX}{}", resolved.name)
                };
                let mut sample = self.sample(logical, concrete, sub_kind, container, &name, &type_name);
                sample.conforming = conforming;
                set.push(sample.with_tag(tag));
            }
        }
        Ok(())
    }

    fn sample(
        &self,
        logical: &EntityTypeDescriptor,
        concrete: &EntityTypeDescriptor,
        sub_kind: Option<&str>,
        container: &str,
        name: &str,
        type_name: &str,
    ) -> SampleInstance {
        let mut values = ValueSet::default().with(Field::attribute("Name"), name);
        if let Some(sub_kind) = sub_kind {
            values.set(&Field::attribute("PredefinedType"), sub_kind);
            if sub_kind == "USERDEFINED" {
                values.set(&Field::attribute("ObjectType"), "SomeUserDefined");
            }
        }
        SampleInstance {
            entity: concrete.name.clone(),
            logical_entity: logical.name.clone(),
            sub_kind: sub_kind.map(str::to_string),
            type_name: Some(type_name.to_string()),
            container: container.to_string(),
            tags: Vec::new(),
            conforming: true,
            domain: logical.domain.clone(),
            values,
        }
    }

    fn undefined_sample(
        &self,
        ty: &EntityTypeDescriptor,
        logical: &EntityTypeDescriptor,
        concrete: &EntityTypeDescriptor,
    ) -> SampleInstance {
        let type_name = self.resolver.type_convention(&ty.name, None).sample_name(0);
        let resolved = self.resolver.resolve_name_or(
            &logical.name,
            Some(UNDEFINED_SUB_KIND),
            &self.fail_container,
            Some(&type_name),
        );
        let tag = self.index.lookup(
            &ty.name,
            None,
            RequirementKind::AttributeHasValue,
            "PredefinedType",
        );
        let mut sample = self.sample(
            logical,
            concrete,
            Some(UNDEFINED_SUB_KIND),
            &self.fail_container,
            &resolved.name,
            &type_name,
        );
        sample.conforming = false;
        sample.with_tag(tag)
    }

    /// Occurrence naming rule, else the type naming rule
    fn naming_tag(
        &self,
        ty: &EntityTypeDescriptor,
        logical: &EntityTypeDescriptor,
        sub_kind: Option<&str>,
    ) -> Option<&'a str> {
        let kind = RequirementKind::AttributeMatchesPattern;
        let tag = self
            .index
            .lookup(&logical.name, sub_kind, kind, "Name")
            .or_else(|| self.index.lookup(&ty.name, sub_kind, kind, "Name"));
        if tag.is_none() {
            trace!("no naming rule for {} {:?}", ty.name, sub_kind);
        }
        tag
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::naming::{full_match, CounterStore, SubKindNames, TypeCodeMapping, TypeCodeTable};
    use crate::schema::catalog::tests::test_catalog;
    use crate::schema::{SchemaCatalog, SchemaDialect, TypeConventions};
    use pretty_assertions::assert_eq;

    fn resolver() -> NamingResolver {
        let mut codes = TypeCodeTable::default();
        codes.insert("Door", TypeCodeMapping::new("D").spatial());
        codes.insert("AirTerminal", TypeCodeMapping::new("AT"));
        codes.insert(
            "SpaceHeater",
            TypeCodeMapping::new("SPH").override_with("RADIATOR", "RAD"),
        );
        NamingResolver::new(
            codes,
            TypeConventions::default(),
            SubKindNames::from_pairs([("DIFFUSER", "Diffuser"), ("GRILLE", "Grille"), ("RADIATOR", "Radiator")]),
            Arc::new(CounterStore::new()),
        )
    }

    fn index() -> RuleIndex {
        let mut index = RuleIndex::default();
        let kind = RequirementKind::AttributeMatchesPattern;
        index.record("IfcDoor", None, kind, "Name", "08_02_Door");
        index.record("IfcSpaceHeater", Some("RADIATOR"), kind, "Name", "08_02_SpaceHeater_RADIATOR");
        index.record("IfcAirTerminalType", Some("GRILLE"), kind, "Name", "07_05_AirTerminalType_GRILLE");
        for ty in ["IfcAirTerminalType", "IfcGasTerminalType", "IfcSpaceHeaterType", "IfcDoorStyle"] {
            index.record(ty, None, RequirementKind::AttributeHasValue, "PredefinedType", "07_03");
        }
        index
    }

    fn synthesize(catalog: &SchemaCatalog, policy: UndefinedSubKindPolicy) -> FixtureSet {
        let resolver = resolver();
        let index = index();
        FixtureSynthesizer::new(
            catalog.hybrid_ifc2x3(),
            catalog.view(SchemaDialect::Ifc2x3),
            &resolver,
            &index,
        )
        .with_policy(policy)
        .synthesize(&["IfcTypeProduct"])
        .unwrap()
    }

    #[test]
    fn test_pairs_per_sub_kind_and_undefined_failures() {
        let catalog = test_catalog();
        let set = synthesize(&catalog, UndefinedSubKindPolicy::default());
        // air terminal 3 pairs + 1, door 1 pair, gas terminal 2 pairs + 1, heater 3 pairs + 1
        assert_eq!(set.len(), 21);
        assert_eq!(set.conforming().count(), 9);

        let quiet = synthesize(
            &catalog,
            UndefinedSubKindPolicy {
                naming_rules: false,
                fixture_occurrences: false,
            },
        );
        assert_eq!(quiet.len(), 18);
        assert!(quiet
            .instances
            .iter()
            .all(|i| i.sub_kind.as_deref() != Some(UNDEFINED_SUB_KIND)));
    }

    #[test]
    fn test_samples_use_hosted_classes_and_domain_order() {
        let catalog = test_catalog();
        let set = synthesize(&catalog, UndefinedSubKindPolicy::default());
        let first = &set.instances[0];
        assert_eq!(first.logical_entity, "IfcAirTerminal");
        assert_eq!(first.entity, "IfcFlowTerminal");
        assert_eq!(first.name(), "AT-00001");
        assert_eq!(first.type_name.as_deref(), Some("AirTerminal_Diffuser_Type01"));

        let last = set.instances.last().unwrap();
        assert_eq!(last.logical_entity, "IfcDoor");
        assert_eq!(last.name(), "BAD-00-02A-D001");
    }

    #[test]
    fn test_pass_names_match_rules_and_fail_names_do_not() {
        let catalog = test_catalog();
        let resolver = resolver();
        let set = synthesize(&catalog, UndefinedSubKindPolicy::default());
        for sample in set.instances.iter().filter(|i| i.sub_kind.as_deref() != Some(UNDEFINED_SUB_KIND)) {
            let decision = resolver.decide(
                &sample.logical_entity,
                sample.sub_kind.as_deref(),
                sample.type_name.as_deref(),
            );
            let pattern = decision.pattern(crate::naming::ContainerPattern::Literal(&sample.container));
            assert_eq!(
                full_match(&pattern, sample.name()).unwrap(),
                sample.conforming,
                "{} against {}",
                sample.name(),
                pattern
            );
        }
    }

    #[test]
    fn test_tags_reference_indexed_rules_only() {
        let catalog = test_catalog();
        let index = index();
        let set = synthesize(&catalog, UndefinedSubKindPolicy::default());
        for tag in set.tags() {
            assert!(index.contains_identifier(tag), "{tag}");
        }
        let radiators: Vec<&SampleInstance> = set
            .instances
            .iter()
            .filter(|i| i.sub_kind.as_deref() == Some("RADIATOR"))
            .collect();
        assert_eq!(radiators.len(), 2);
        assert!(radiators.iter().all(|r| r.tags == vec!["08_02_SpaceHeater_RADIATOR".to_string()]));
        assert_eq!(radiators[0].name(), "RAD-00001");

        let undefined = set
            .non_conforming()
            .find(|i| i.sub_kind.as_deref() == Some(UNDEFINED_SUB_KIND))
            .unwrap();
        assert_eq!(undefined.tags, vec!["07_03".to_string()]);
    }

    #[test]
    fn test_synthesis_is_repeatable_with_fresh_counters() {
        let catalog = test_catalog();
        let a = synthesize(&catalog, UndefinedSubKindPolicy::default());
        let b = synthesize(&catalog, UndefinedSubKindPolicy::default());
        assert_eq!(a, b);
    }
}
