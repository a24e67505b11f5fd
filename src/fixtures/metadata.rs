//! Stage 5 metadata fixture
//!
//! Two storeys and four rooms: the `G` rooms on Level 00 hold samples that
//! should pass an audit, the `B` rooms on Level B1 samples that should fail.
//! Every concrete type object gets a well named and a badly named sample,
//! occurrences come from the [`FixtureSynthesizer`], and scripted broken
//! types and doors each break exactly one COBie value.

use anyhow::{bail, Context, Result};
use ids_core::fixtures::{Baseline, Field, SampleBuilder, ValueSet};
use ids_core::naming::UNDEFINED_SUB_KIND;
use ids_core::schema::{EntityTypeDescriptor, SchemaView};
use ids_core::{FixtureSynthesizer, RequirementKind, RibaStage, SampleInstance, SchemaDialect, SchemaFacade};
use tracing::{debug, info, warn};

use super::cobie::{self, ASSET, COMPONENT, DOOR_COMMON, ECONOMIC, MANUFACTURER_OCCURRENCE, MANUFACTURER_TYPE};
use super::cobie::{SERVICE_LIFE, SPECIFICATION, UNICLASS_PR, WARRANTY};
use super::spatial::{self, ADS, UNICLASS_SL};
use super::{FixtureContext, FixtureModel};
use crate::rulebook::patterns::UNICLASS_SYSTEM;
use crate::rulebook::{COBIE_COMPONENTS, COBIE_TYPES, ROOT_TYPES};

pub const STAGE: RibaStage = RibaStage::Stage5;
pub const MODEL_NAME: &str = "DfE-Metadata-Stage5";

/// Basement first: its rooms hold the failures
const STOREYS: [&str; 2] = ["B1", "00"];
const ZONES: [&str; 2] = ["Basic teaching", "Non-net"];
const ELEMENTS_PASS: &str = "00-02G";
const ELEMENTS_FAIL: &str = "01-02B";

const BROKEN_TYPE: &str = "IfcTransportElementType";
const BROKEN_SUB_KIND: &str = "ELEVATOR";
/// Broken type numbers start above any synthesized variant
const BROKEN_VARIANT_BASE: u32 = 50;
const SERIAL_COUNTER: &str = "COBie.SerialNumber";
const DOOR_FIRE_RATING: &str = "30";

/// How a broken sample departs from its baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Set(&'static str),
    Remove,
    /// Prefix the baseline value
    Prefix(&'static str),
}

#[derive(Debug, Clone)]
struct Breakage {
    description: &'static str,
    field: Field,
    change: Change,
    tag: Option<String>,
}

impl Breakage {
    fn apply(&self, baseline: &Baseline) -> ValueSet {
        let builder = SampleBuilder::new(baseline);
        let builder = match self.change {
            Change::Set(value) => builder.set(self.field.clone(), value),
            Change::Remove => builder.remove(self.field.clone()),
            Change::Prefix(prefix) => {
                let current = baseline.values.get(&self.field).unwrap_or_default();
                builder.set(self.field.clone(), format!("{prefix}{current}"))
            }
        };
        builder.build()
    }
}

pub fn build(ctx: &FixtureContext<'_>) -> Result<FixtureModel> {
    let project = ctx.project();
    let mut model = FixtureModel::new(MODEL_NAME, STAGE, ctx.dialect(), &project.name);

    let building = spatial::project_structure(ctx, &mut model, STAGE);
    let storeys = spatial::storeys(ctx, &mut model, &building, &STOREYS);
    let zones = spatial::zones(ctx, &mut model, &ZONES);
    let (&[basement, ground], &[teaching, non_net]) = (storeys.as_slice(), zones.as_slice()) else {
        bail!("Metadata fixture needs two storeys and two zones");
    };
    let name_of = |model: &FixtureModel, idx: usize| model.samples.instances[idx].name().to_string();
    let (basement, ground) = (name_of(&model, basement), name_of(&model, ground));
    let (teaching, non_net) = (name_of(&model, teaching), name_of(&model, non_net));

    let fixtures = &ctx.config.fixtures;
    let good = ("SL_25_10_14", "CLA12");
    let bad = ("SL_25_10_76", "CLA62");
    for (room, storey, description, (uniclass, ads), zone) in [
        (fixtures.pass_container.as_str(), &ground, "The Good Place (Types)", good, &teaching),
        (ELEMENTS_PASS, &ground, "The Good Place (Elements)", good, &teaching),
        (fixtures.fail_container.as_str(), &basement, "The Bad Place (Types)", bad, &non_net),
        (ELEMENTS_FAIL, &basement, "The Bad Place (Elements)", bad, &non_net),
    ] {
        let values = ValueSet::default()
            .with(Field::attribute("Name"), room)
            .with(Field::attribute("Description"), description)
            .with(Field::classification(UNICLASS_SL), uniclass)
            .with(Field::classification(ADS), ads)
            .with(Field::property("COBie_Space", "Roomtag"), "n/a")
            .with(Field::property("BaseQuantities", "Height"), "2400")
            .with(Field::property("BaseQuantities", "GrossFloorArea"), "200")
            .with(Field::property("BaseQuantities", "NetFloorArea"), "190")
            .with(Field::membership(zone.as_str()), "");
        model.push(SampleInstance::new("IfcSpace", storey.as_str(), room).with_values(values));
    }

    let target = ctx.catalog.view(ctx.dialect());
    let logical = if ctx.config.schema.use_inferred_occurrence_types && ctx.dialect() == SchemaDialect::Ifc2x3 {
        ctx.catalog.hybrid_ifc2x3()
    } else {
        target
    };
    let roots: Vec<&str> = ROOT_TYPES
        .iter()
        .copied()
        .filter(|root| logical.lookup(root).is_some())
        .collect();

    type_objects(ctx, &mut model, logical, &roots)?;
    occurrences(ctx, &mut model, logical, target, &roots)?;
    broken_types(ctx, &mut model)?;
    broken_doors(ctx, &mut model)?;

    model.stamp_global_ids();
    info!(
        "Metadata fixture: {} samples, {} failing",
        model.samples.len(),
        model.samples.non_conforming().count()
    );
    Ok(model)
}

/// Concrete types below `roots`, ordered by domain then name
fn concrete_types<'c>(view: SchemaView<'c>, roots: &[&str]) -> Result<Vec<&'c EntityTypeDescriptor>> {
    let catalog = view.catalog();
    let mut types: Vec<&'c EntityTypeDescriptor> = Vec::new();
    for root in roots {
        types.extend(
            view.concrete_subtypes_of(root)?
                .into_iter()
                .filter_map(|d| catalog.lookup_any(&d.name)),
        );
    }
    types.sort_by(|a, b| a.domain.cmp(&b.domain).then_with(|| a.name.cmp(&b.name)));
    types.dedup_by(|a, b| a.name == b.name);
    Ok(types)
}

fn type_baseline(ctx: &FixtureContext<'_>, ty: &EntityTypeDescriptor) -> Baseline {
    if ctx.is_a(&ty.name, &COBIE_TYPES) {
        cobie::type_baseline(&ty.domain)
    } else {
        Baseline::new(format!("type ({})", ty.domain))
            .with(Field::classification(UNICLASS_PR), cobie::product_code(&ty.domain))
    }
}

fn type_sample(
    ctx: &FixtureContext<'_>,
    ty: &EntityTypeDescriptor,
    sub_kind: Option<&str>,
    name: &str,
    container: &str,
) -> SampleInstance {
    let label = ty.name.trim_start_matches("Ifc");
    let description = match sub_kind {
        Some(sub_kind) => format!("{} {label}", ctx.resolver.sub_kind_names().display(label, sub_kind)),
        None => label.to_string(),
    };
    let baseline = type_baseline(ctx, ty);
    let mut builder = SampleBuilder::new(&baseline)
        .set(Field::attribute("Name"), name)
        .set(Field::attribute("Description"), description);
    if let Some(sub_kind) = sub_kind {
        builder = builder.set(Field::attribute("PredefinedType"), sub_kind);
        if sub_kind == "USERDEFINED" {
            builder = builder.set(Field::attribute("ElementType"), "SomeUserDefined");
        }
    }
    SampleInstance {
        sub_kind: sub_kind.map(str::to_string),
        domain: ty.domain.clone(),
        ..SampleInstance::new(&ty.name, container, name).with_values(builder.build())
    }
}

/// A well named and a badly named sample per type and sub-kind
fn type_objects(ctx: &FixtureContext<'_>, model: &mut FixtureModel, view: SchemaView<'_>, roots: &[&str]) -> Result<()> {
    let fixtures = &ctx.config.fixtures;
    let policy = ctx.config.undefined_sub_kind;
    let types = concrete_types(view, roots)?;
    for ty in &types {
        let sub_kinds: Vec<Option<&str>> = if ty.sub_kinds.is_empty() {
            vec![None]
        } else {
            ty.sub_kinds.iter().map(|s| Some(s.as_str())).collect()
        };
        let mut variant = 0;
        for sub_kind in sub_kinds {
            if sub_kind == Some(UNDEFINED_SUB_KIND) {
                if policy.fixture_occurrences {
                    let name = ctx.resolver.type_convention(&ty.name, None).sample_name(0);
                    let tag = ctx.tag(&ty.name, None, RequirementKind::AttributeHasValue, "PredefinedType");
                    let mut sample = type_sample(ctx, ty, sub_kind, &name, &fixtures.fail_container);
                    sample.conforming = false;
                    model.push(sample.with_tag(tag.as_deref()));
                }
                continue;
            }
            variant += 1;
            let name = ctx.resolver.type_convention(&ty.name, sub_kind).sample_name(variant);
            let tag = ctx.tag(&ty.name, sub_kind, RequirementKind::AttributeMatchesPattern, "Name");
            model.push(type_sample(ctx, ty, sub_kind, &name, &fixtures.pass_container).with_tag(tag.as_deref()));

            let mut bad = type_sample(ctx, ty, sub_kind, &format!("{name}-BAD"), &fixtures.fail_container);
            bad.conforming = false;
            model.push(bad.with_tag(tag.as_deref()));
        }
    }
    debug!("{} type objects sampled", types.len());
    Ok(())
}

fn component_values(ctx: &FixtureContext<'_>, values: &ValueSet) -> ValueSet {
    let sequence = ctx.resolver.counters().next(SERIAL_COUNTER);
    let mut merged = component_baseline(sequence).values;
    for (name, value) in &values.attributes {
        merged.set(&Field::attribute(name.as_str()), value.as_str());
    }
    merged
}

fn component_baseline(sequence: u32) -> Baseline {
    cobie::component_baseline()
        .with(
            Field::property(MANUFACTURER_OCCURRENCE, "SerialNumber"),
            cobie::serial_number(sequence),
        )
        .with(Field::property(COMPONENT, "BarCode"), cobie::bar_code(sequence))
}

/// Typed occurrences in the element rooms
fn occurrences(
    ctx: &FixtureContext<'_>,
    model: &mut FixtureModel,
    logical: SchemaView<'_>,
    target: SchemaView<'_>,
    roots: &[&str],
) -> Result<()> {
    let set = FixtureSynthesizer::new(logical, target, ctx.resolver, ctx.index)
        .with_policy(ctx.config.undefined_sub_kind)
        .with_containers(ELEMENTS_PASS, ELEMENTS_FAIL)
        .synthesize(roots)?;

    for mut sample in set.instances {
        let description = sample
            .type_name
            .clone()
            .unwrap_or_else(|| sample.logical_entity.trim_start_matches("Ifc").to_string());
        sample.values.set(&Field::attribute("Description"), description);
        if ctx.is_a(&sample.entity, &COBIE_COMPONENTS) {
            sample.values = component_values(ctx, &sample.values);
        }
        if sample.entity.eq_ignore_ascii_case("IfcDoor") {
            sample
                .values
                .set(&Field::property(DOOR_COMMON, "FireRating"), DOOR_FIRE_RATING);
        }
        model.push(sample);
    }
    Ok(())
}

fn type_breakages(ctx: &FixtureContext<'_>) -> Vec<Breakage> {
    let tag = |kind, subject: &str| ctx.tag(BROKEN_TYPE, None, kind, subject);
    let strict = |kind, subject: &str| ctx.strict_tag(BROKEN_TYPE, kind, subject);
    let property = |description, set: &str, name: &str, change, kind| {
        let subject = format!("{set}.{name}");
        Breakage {
            description,
            field: Field::property(set, name),
            change,
            tag: tag(kind, &subject),
        }
    };
    use Change::{Remove, Set};
    use RequirementKind::{PropertyDefined, PropertyInList, PropertyMatchesPattern, PropertyValueInRange};

    let mut cases = vec![
        Breakage {
            description: "Blank name",
            field: Field::attribute("Name"),
            change: Set(""),
            tag: tag(RequirementKind::AttributeDefined, "Name"),
        },
        Breakage {
            description: "Blank description",
            field: Field::attribute("Description"),
            change: Set(""),
            tag: tag(RequirementKind::AttributeDefined, "Description"),
        },
        Breakage {
            description: "No product classification",
            field: Field::classification(UNICLASS_PR),
            change: Remove,
            tag: tag(RequirementKind::ClassificationPattern, UNICLASS_SYSTEM),
        },
        property("No asset type", ASSET, "AssetType", Remove, PropertyDefined),
        property("Unknown asset type", ASSET, "AssetType", Set("BAD"), PropertyInList),
        property("Blank manufacturer", MANUFACTURER_TYPE, "Manufacturer", Set(""), PropertyDefined),
        property(
            "Manufacturer not an email",
            MANUFACTURER_TYPE,
            "Manufacturer",
            Set("AcmeInc"),
            PropertyMatchesPattern,
        ),
        Breakage {
            description: "Manufacturer placeholder",
            field: Field::property(MANUFACTURER_TYPE, "Manufacturer"),
            change: Set("n/a"),
            tag: strict(PropertyMatchesPattern, &format!("{MANUFACTURER_TYPE}.Manufacturer")),
        },
        property("No model reference", MANUFACTURER_TYPE, "ModelReference", Remove, PropertyDefined),
    ];

    for (guarantor, duration) in [
        ("WarrantyGuarantorParts", "WarrantyDurationParts"),
        ("WarrantyGuarantorLabor", "WarrantyDurationLabor"),
    ] {
        cases.push(property("Blank guarantor", WARRANTY, guarantor, Set(""), PropertyDefined));
        cases.push(property(
            "Guarantor not an email",
            WARRANTY,
            guarantor,
            Set("Not an email"),
            PropertyMatchesPattern,
        ));
        cases.push(Breakage {
            description: "Guarantor placeholder",
            field: Field::property(WARRANTY, guarantor),
            change: Set("n/a"),
            tag: strict(PropertyMatchesPattern, &format!("{WARRANTY}.{guarantor}")),
        });
        cases.push(property("No warranty duration", WARRANTY, duration, Remove, PropertyDefined));
        cases.push(property(
            "Warranty duration in words",
            WARRANTY,
            duration,
            Set("5 years"),
            PropertyMatchesPattern,
        ));
        cases.push(property("Zero warranty duration", WARRANTY, duration, Set("0"), PropertyValueInRange));
    }

    cases.extend([
        property("No warranty description", WARRANTY, "WarrantyDescription", Remove, PropertyDefined),
        property(
            "Warranty description without words",
            WARRANTY,
            "WarrantyDescription",
            Set("!!!!"),
            PropertyMatchesPattern,
        ),
        property("No replacement cost", ECONOMIC, "ReplacementCost", Remove, PropertyDefined),
        property(
            "Replacement cost not monetary",
            ECONOMIC,
            "ReplacementCost",
            Set("TBC"),
            PropertyMatchesPattern,
        ),
        property("No expected life", SERVICE_LIFE, "ExpectedLife", Remove, PropertyDefined),
        property(
            "Expected life in words",
            SERVICE_LIFE,
            "ExpectedLife",
            Set("20 years"),
            PropertyMatchesPattern,
        ),
    ]);
    for dimension in ["NominalLength", "NominalWidth", "NominalHeight"] {
        cases.push(property("No nominal dimension", SPECIFICATION, dimension, Remove, PropertyDefined));
    }
    for name in [
        "Shape",
        "Size",
        "Color",
        "Finish",
        "Grade",
        "Material",
        "Constituents",
        "Features",
        "AccessibilityPerformance",
        "CodePerformance",
        "SustainabilityPerformance",
    ] {
        cases.push(property("No specification value", SPECIFICATION, name, Remove, PropertyDefined));
    }
    cases
}

/// One elevator type per COBie type rule, plus a duplicated name
fn broken_types(ctx: &FixtureContext<'_>, model: &mut FixtureModel) -> Result<()> {
    let Some(ty) = ctx.catalog.view(ctx.dialect()).lookup(BROKEN_TYPE).and_then(|d| ctx.catalog.lookup_any(&d.name))
    else {
        warn!("{} not in {}, no broken types", BROKEN_TYPE, ctx.dialect());
        return Ok(());
    };
    let container = ctx.config.fixtures.fail_container.as_str();
    let convention = ctx.resolver.type_convention(&ty.name, Some(BROKEN_SUB_KIND));
    let next_name = || {
        let sequence = ctx.resolver.counters().next(BROKEN_TYPE);
        convention.sample_name(BROKEN_VARIANT_BASE + sequence)
    };
    let baseline_for = |name: &str| {
        let mut baseline = cobie::type_baseline(&ty.domain)
            .with(Field::attribute("Name"), name)
            .with(Field::attribute("Description"), ty.name.trim_start_matches("Ifc"))
            .with(Field::attribute("PredefinedType"), BROKEN_SUB_KIND);
        baseline.name = name.to_string();
        baseline
    };

    let cases = type_breakages(ctx);
    for case in &cases {
        let name = next_name();
        let values = case.apply(&baseline_for(&name));
        let mut sample = SampleInstance {
            sub_kind: Some(BROKEN_SUB_KIND.to_string()),
            domain: ty.domain.clone(),
            ..SampleInstance::new(&ty.name, container, &name).with_values(values)
        };
        sample.conforming = false;
        debug!("{}: {}", name, case.description);
        model.push(sample.with_tag(case.tag.as_deref()));
    }

    let duplicate = next_name();
    for _ in 0..2 {
        let mut sample = SampleInstance::new(&ty.name, container, &duplicate)
            .with_values(baseline_for(&duplicate).values);
        sample.sub_kind = Some(BROKEN_SUB_KIND.to_string());
        sample.conforming = false;
        model.push(sample);
    }
    debug!("{} broken {} samples", cases.len() + 2, BROKEN_TYPE);
    Ok(())
}

fn door_breakages(ctx: &FixtureContext<'_>) -> Vec<Breakage> {
    let tag = |kind, subject: &str| ctx.tag("IfcDoor", None, kind, subject);
    let property = |description, set: &str, name: &str, change, kind| Breakage {
        description,
        field: Field::property(set, name),
        change,
        tag: tag(kind, &format!("{set}.{name}")),
    };
    use Change::{Prefix, Remove, Set};
    use RequirementKind::{PropertyDefined, PropertyHasValue, PropertyInList, PropertyMatchesPattern};

    vec![
        Breakage {
            description: "Blank name",
            field: Field::attribute("Name"),
            change: Set(""),
            tag: tag(RequirementKind::AttributeDefined, "Name"),
        },
        Breakage {
            description: "Blank description",
            field: Field::attribute("Description"),
            change: Set(""),
            tag: tag(RequirementKind::AttributeDefined, "Description"),
        },
        property(
            "Serial number with letters",
            MANUFACTURER_OCCURRENCE,
            "SerialNumber",
            Prefix("BAD-"),
            PropertyMatchesPattern,
        ),
        property("Blank installation date", COMPONENT, "InstallationDate", Set(""), PropertyMatchesPattern),
        property(
            "Warranty start not ISO",
            COMPONENT,
            "WarrantyStartDate",
            Set("2021-01-01 12:00:00"),
            PropertyMatchesPattern,
        ),
        property("Blank tag number", COMPONENT, "TagNumber", Set(""), PropertyHasValue),
        property("Bar code with letters", COMPONENT, "BarCode", Prefix("BAD-"), PropertyMatchesPattern),
        property("Asset identifier set", COMPONENT, "AssetIdentifier", Set("Bad"), PropertyHasValue),
        property("No fire rating", DOOR_COMMON, "FireRating", Remove, PropertyDefined),
        property("Unknown fire rating", DOOR_COMMON, "FireRating", Set("BAD"), PropertyInList),
    ]
}

/// Doors of the first good door type, each breaking one component value
fn broken_doors(ctx: &FixtureContext<'_>, model: &mut FixtureModel) -> Result<()> {
    let door_type = model
        .samples
        .conforming()
        .find(|s| s.entity == "IfcDoorStyle" || s.entity == "IfcDoorType")
        .map(|s| s.name().to_string())
        .context("No door type sampled")?;
    let baseline_for = |name: &str| {
        let sequence = ctx.resolver.counters().next(SERIAL_COUNTER);
        component_baseline(sequence)
            .with(Field::attribute("Name"), name)
            .with(Field::attribute("Description"), "Door")
            .with(Field::property(DOOR_COMMON, "FireRating"), DOOR_FIRE_RATING)
    };
    let door = |name: &str, values: ValueSet| {
        let mut sample = SampleInstance::new("IfcDoor", ELEMENTS_FAIL, name).with_values(values);
        sample.type_name = Some(door_type.clone());
        sample.domain = "SharedBldgElements".into();
        sample.conforming = false;
        sample
    };
    let next_name = || ctx.resolver.resolve_name("IfcDoor", None, ELEMENTS_FAIL).name;

    for case in door_breakages(ctx) {
        let name = next_name();
        let values = case.apply(&baseline_for(&name));
        debug!("{}: {}", name, case.description);
        model.push(door(&name, values).with_tag(case.tag.as_deref()));
    }
    let duplicate = next_name();
    for _ in 0..2 {
        let values = baseline_for(&duplicate).values;
        model.push(door(&duplicate, values));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixtures::tests::{context, setup};

    fn model() -> FixtureModel {
        let (inputs, resolver, rules) = setup(STAGE);
        build(&context(&inputs, &resolver, &rules)).unwrap()
    }

    #[test]
    fn test_rooms_split_good_and_bad() {
        let model = model();
        let good = model.find("IfcSpace", "00-01G").unwrap();
        assert_eq!(good.container, "Level 00");
        let bad = model.find("IfcSpace", "01-02B").unwrap();
        assert_eq!(bad.container, "Level B1");
        assert!(bad.values.memberships.contains("Non-net"));
    }

    #[test]
    fn test_types_have_good_and_bad_names() {
        let model = model();
        let good = model
            .find("IfcTransportElementType", "TransportElement_Elevator_Type01")
            .unwrap();
        assert!(good.conforming);
        assert_eq!(good.container, "00-01G");
        assert_eq!(good.tags, vec!["07_05_TransportElementType_ELEVATOR".to_string()]);
        assert_eq!(
            good.values.get(&Field::property(ASSET, "AssetType")),
            Some("Fixed")
        );

        let bad = model
            .find("IfcTransportElementType", "TransportElement_Elevator_Type01-BAD")
            .unwrap();
        assert!(!bad.conforming);
        assert_eq!(bad.container, "01-01B");
    }

    #[test]
    fn test_undefined_types_fail_the_predefined_type_rule() {
        let model = model();
        let undefined: Vec<_> = model
            .samples
            .instances
            .iter()
            .filter(|s| s.entity == "IfcTransportElementType" && s.sub_kind.as_deref() == Some(UNDEFINED_SUB_KIND))
            .collect();
        assert_eq!(undefined.len(), 1);
        assert!(!undefined[0].conforming);
        assert_eq!(undefined[0].tags, vec!["07_03".to_string()]);
    }

    #[test]
    fn test_components_carry_cobie_data() {
        let model = model();
        let door = model
            .samples
            .conforming()
            .find(|s| s.entity == "IfcDoor" && s.container == ELEMENTS_PASS)
            .unwrap();
        assert_eq!(door.values.get(&Field::property(COMPONENT, "TagNumber")), Some("n/a"));
        assert_eq!(
            door.values.get(&Field::property(DOOR_COMMON, "FireRating")),
            Some(DOOR_FIRE_RATING)
        );
        assert!(door.values.contains(&Field::property(MANUFACTURER_OCCURRENCE, "SerialNumber")));
    }

    #[test]
    fn test_broken_types_break_one_value_each() {
        let (inputs, resolver, rules) = setup(STAGE);
        let ctx = context(&inputs, &resolver, &rules);
        let model = build(&ctx).unwrap();
        let broken: Vec<_> = model
            .samples
            .instances
            .iter()
            .filter(|s| s.entity == BROKEN_TYPE && s.sub_kind.as_deref() == Some(BROKEN_SUB_KIND))
            .filter(|s| !s.conforming && !s.name().ends_with("-BAD"))
            .collect();
        assert_eq!(broken.len(), type_breakages(&ctx).len() + 2);

        let tags = model.failure_tags();
        // strict manufacturer rule only exists from stage 5
        let manufacturer = ctx.strict_tag(
            BROKEN_TYPE,
            RequirementKind::PropertyMatchesPattern,
            "Pset_ManufacturerTypeInformation.Manufacturer",
        );
        assert_eq!(manufacturer.as_deref(), Some("07_13"));
        for expected in ["07_03", "07_04", "07_11", "07_12", "07_13"] {
            assert!(tags.contains(&expected), "missing {expected}");
        }
        assert!(tags.iter().all(|t| rules.index.contains_identifier(t)));
    }

    #[test]
    fn test_broken_doors_reference_a_door_type() {
        let model = model();
        let doors: Vec<_> = model
            .samples
            .non_conforming()
            .filter(|s| s.entity == "IfcDoor" && s.tags.iter().any(|t| t.starts_with("08_")))
            .collect();
        assert!(doors.len() >= 10);
        assert!(doors.iter().all(|d| d.type_name.as_deref().is_some_and(|t| t.starts_with("Door"))));
        let serial = doors
            .iter()
            .filter_map(|d| d.values.get(&Field::property(MANUFACTURER_OCCURRENCE, "SerialNumber")))
            .find(|s| s.starts_with("BAD-"));
        assert!(serial.is_some());
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(model(), model());
    }
}
