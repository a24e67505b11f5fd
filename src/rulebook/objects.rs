//! Sections 07-09: type objects, COBie components and systems
//!
//! The per-type naming rules come from the naming tables: every concrete
//! type object gets a `Name` pattern per enumerated predefined type (07.05),
//! and every COBie component with a short code gets an occurrence naming
//! rule (08.02). Both run in the complex pass with optional cardinality.

use std::sync::Arc;

use ids_core::naming::UNDEFINED_SUB_KIND;
use ids_core::{
    Facet, FacetGroup, GenerationPass, LifecycleStages, NamingResolver, Requirement, RequirementCardinality,
    SchemaDialect, SchemaFacade, SpecCompiler, UndefinedSubKindPolicy, ValueConstraint,
};
use tracing::{trace, warn};

use super::patterns::{
    DATE_OR_DEFAULT, EMAIL, EMAIL_OR_NA, MONETARY_OR_NA, NUMBER_OR_NA, NUMERIC, NUMERIC_OR_NA, TEXT_OR_NA,
    UNICLASS_SYSTEM,
};
use super::within_stages;

/// Roots of the type-object checks
pub const ROOT_TYPES: [&str; 7] = [
    "IfcBuildingElementType",
    "IfcFurnishingElementType",
    "IfcCivilElementType",
    "IfcDistributionElementType",
    "IfcTransportElementType",
    "IfcDoorStyle",
    "IfcWindowStyle",
];

/// Type objects that carry COBie product data
pub const COBIE_TYPES: [&str; 16] = [
    "IfcDoorStyle",
    "IfcBuildingElementProxyType",
    "IfcWindowStyle",
    "IfcDistributionControlElementType",
    "IfcDistributionChamberElementType",
    "IfcEnergyConversionDeviceType",
    "IfcFlowControllerType",
    "IfcFlowMovingDeviceType",
    "IfcFlowStorageDeviceType",
    "IfcFlowTerminalType",
    "IfcFlowTreatmentDeviceType",
    "IfcDiscreteAccessoryType",
    "IfcMechanicalFastenerType",
    "IfcVibrationIsolatorType",
    "IfcFurnishingElementType",
    "IfcTransportElementType",
];

/// Occurrences registered as COBie components
pub const COBIE_COMPONENTS: [&str; 17] = [
    "IfcBuildingElementProxy",
    "IfcDoor",
    "IfcShadingDevice",
    "IfcWindow",
    "IfcFlowMovingDevice",
    "IfcVibrationIsolator",
    "IfcDistributionControlElement",
    "IfcDistributionChamberElement",
    "IfcEnergyConversionDevice",
    "IfcFlowController",
    "IfcFlowStorageDevice",
    "IfcFlowTerminal",
    "IfcFlowTreatmentDevice",
    "IfcDiscreteAccessory",
    "IfcTendon",
    "IfcFurnishingElement",
    "IfcTransportElement",
];

const COBIE_SPECIFICATION_PROPERTIES: [&str; 11] = [
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
];

const DOOR_FIRE_RATINGS: [&str; 7] = ["Undefined", "n/a", "20", "30", "60", "90", "120"];

/// Names from `candidates` the view knows, in order, without repeats
fn present<'n>(view: &dyn SchemaFacade, candidates: &[&'n str]) -> Vec<&'n str> {
    let mut found: Vec<&'n str> = Vec::new();
    for name in candidates {
        if view.lookup(name).is_none() {
            trace!("{} not in {} schema", name, view.dialect());
        } else if !found.contains(name) {
            found.push(name);
        }
    }
    found
}

pub(super) fn types(
    scope: &mut SpecCompiler,
    resolver: &NamingResolver,
    policy: UndefinedSubKindPolicy,
) -> ids_core::Result<()> {
    scope.add_tag("Type");
    let roots = present(&scope.schema(), &ROOT_TYPES);
    let app = scope.applicability("Object Type", &roots)?;
    scope.skip("07.01 Entity Correctly defined");

    // type objects with a predefined type enumeration
    let mut enumerated: Vec<String> = scope
        .schema()
        .all_types()
        .into_iter()
        .filter(|d| {
            let upper = d.upper_name();
            upper.ends_with("TYPE") && d.has_sub_kinds() && !upper.starts_with("IFCSPACE")
        })
        .map(|d| d.upper_name())
        .collect();
    enumerated.sort();
    let pdt_app = FacetGroup::new("Object Type", "Object Type entity selector")
        .with_facet(Facet::entity(ValueConstraint::list(enumerated)));
    scope.set_requirement_cardinality(RequirementCardinality::Optional);
    scope.create_specification(&pdt_app, Requirement::attribute_defined("PredefinedType"))?;
    scope.set_requirement_cardinality(RequirementCardinality::Prohibited);
    scope.create_specification(
        &pdt_app,
        Requirement::attribute_has_value("PredefinedType", UNDEFINED_SUB_KIND),
    )?;
    scope
        .reset_requirement_cardinality()
        .reset_applicability_cardinality();

    scope.create_specification(&app, Requirement::attribute_defined("Name"))?;
    type_naming(&mut scope.begin_child_scope(None), resolver, policy)?;
    scope.skip("07.06 Unique support not in IDS");
    scope.create_specification(&app, Requirement::attribute_defined("Description"))?;
    scope.create_specification(&app, Requirement::classification_pattern(UNICLASS_SYSTEM, "Pr_.*"))?;

    cobie_type_data(scope)
}

/// 07.05: `Name` pattern per type object and predefined type
fn type_naming(
    scope: &mut SpecCompiler,
    resolver: &NamingResolver,
    policy: UndefinedSubKindPolicy,
) -> ids_core::Result<()> {
    scope
        .set_applicable_passes(GenerationPass::COMPLEX)
        .set_requirement_cardinality(RequirementCardinality::Optional);

    let conventions = resolver.conventions();
    let catalog = Arc::clone(scope.catalog());
    let view = catalog.view(scope.settings().target_dialect);
    for ty in view.concrete_subtypes_of("IfcTypeObject")? {
        if matches!(ty.name.as_str(), "IfcTypeObject" | "IfcTypeProduct") {
            continue;
        }
        let label = conventions.unprefixed(&ty.name);
        if conventions.enumerates_sub_kinds(&ty.name) && ty.has_sub_kinds() {
            let free_label = conventions.has_free_label(&ty.name);
            let mut numbering = scope.begin_numbering_scope(Some(label));
            for pdt in &ty.sub_kinds {
                if pdt == UNDEFINED_SUB_KIND && !policy.naming_rules {
                    continue;
                }
                numbering.set_name(pdt.as_str());
                let app = numbering
                    .exact_applicability("Type", &ty.name)?
                    .with_predefined_type(pdt.as_str());
                let pattern = resolver
                    .type_convention(&ty.name, Some(pdt.as_str()))
                    .pattern(free_label);
                numbering.create_specification(&app, Requirement::attribute_matches("Name", pattern))?;
            }
        } else {
            scope.set_name(label);
            let app = scope.exact_applicability("Type", &ty.name)?;
            let pattern = resolver
                .type_convention(&ty.name, None)
                .pattern(conventions.has_free_label(&ty.name));
            scope.create_specification(&app, Requirement::attribute_matches("Name", pattern))?;
        }
    }
    Ok(())
}

fn cobie_property(
    scope: &mut SpecCompiler,
    app: &FacetGroup,
    set: &str,
    property: &str,
    rules: &[(&str, &str, &str)],
) -> ids_core::Result<()> {
    scope.create_specification(app, Requirement::property_defined(set, property))?;
    for (pattern, name, measure) in rules {
        scope.create_specification(
            app,
            Requirement::property_matches(set, property, *pattern, *name).with_data_type(*measure),
        )?;
    }
    Ok(())
}

/// COBie product data on type objects
fn cobie_type_data(scope: &mut SpecCompiler) -> ids_core::Result<()> {
    let cobie = present(&scope.schema(), &COBIE_TYPES);
    let app = scope.applicability("COBie Object Type", &cobie)?;

    scope.create_specification(&app, Requirement::property_defined("COBie_Asset", "AssetType"))?;
    scope.create_specification(
        &app,
        Requirement::property_in_list("COBie_Asset", "AssetType", ["Fixed", "Movable"]).with_data_type("IFCTEXT"),
    )?;

    within_stages(scope, LifecycleStages::STAGE5_PLUS, |scope| {
        cobie_property(
            scope,
            &app,
            "Pset_ManufacturerTypeInformation",
            "Manufacturer",
            &[
                (EMAIL_OR_NA, "n/a or Email Address", "IFCLABEL"),
                (EMAIL, "Email Address", "IFCLABEL"),
            ],
        )
    })?;

    for (guarantor, duration) in [
        ("WarrantyGuarantorParts", "WarrantyDurationParts"),
        ("WarrantyGuarantorLabor", "WarrantyDurationLabor"),
    ] {
        within_stages(scope, LifecycleStages::STAGE4_PLUS, |scope| {
            cobie_property(
                scope,
                &app,
                "COBie_Warranty",
                guarantor,
                &[(EMAIL_OR_NA, "n/a or Email Address", "IFCTEXT")],
            )
        })?;
        within_stages(scope, LifecycleStages::STAGE5_PLUS, |scope| {
            scope.create_specification(
                &app,
                Requirement::property_matches("COBie_Warranty", guarantor, EMAIL, "Email Address")
                    .with_data_type("IFCTEXT"),
            )?;
            Ok(())
        })?;
        within_stages(scope, LifecycleStages::STAGE4_PLUS, |scope| {
            cobie_property(
                scope,
                &app,
                "COBie_Warranty",
                duration,
                &[(NUMERIC, "Valid duration", "IFCTEXT")],
            )
        })?;
        within_stages(scope, LifecycleStages::STAGE5_PLUS, |scope| {
            scope.create_specification(
                &app,
                Requirement::property_above("COBie_Warranty", duration, 0).with_data_type("IFCTEXT"),
            )?;
            Ok(())
        })?;
    }

    within_stages(scope, LifecycleStages::STAGE4_PLUS, |scope| {
        cobie_property(
            scope,
            &app,
            "COBie_EconomicImpactValues",
            "ReplacementCost",
            &[(MONETARY_OR_NA, "Replacement Cost", "IFCTEXT")],
        )?;
        cobie_property(
            scope,
            &app,
            "COBie_ServiceLife",
            "ExpectedLife",
            &[(NUMERIC_OR_NA, "Expected Life", "IFCTEXT")],
        )?;
        cobie_property(
            scope,
            &app,
            "COBie_Warranty",
            "WarrantyDescription",
            &[(TEXT_OR_NA, "Warranty", "IFCTEXT")],
        )?;
        for dimension in ["NominalLength", "NominalWidth", "NominalHeight"] {
            scope.create_specification(&app, Requirement::property_defined("COBie_Specification", dimension))?;
        }
        scope.create_specification(
            &app,
            Requirement::property_defined("Pset_ManufacturerTypeInformation", "ModelReference"),
        )?;
        for property in COBIE_SPECIFICATION_PROPERTIES {
            scope.create_specification(&app, Requirement::property_defined("COBie_Specification", property))?;
        }
        Ok(())
    })
}

pub(super) fn occurrences(
    scope: &mut SpecCompiler,
    resolver: &NamingResolver,
    policy: UndefinedSubKindPolicy,
) -> ids_core::Result<()> {
    scope.add_tag("Object");
    let components = present(&scope.occurrence_schema(), &COBIE_COMPONENTS);
    let app = scope.occurrence_applicability("Object Occurrence (COBie Component)", &components)?;

    scope.create_specification(&app, Requirement::attribute_defined("Name"))?;
    occurrence_naming(&mut scope.begin_child_scope(None), resolver, &components, policy)?;
    scope.skip("08.03 Unique support not in IDS");
    scope.create_specification(&app, Requirement::attribute_defined("Description"))?;

    let component_rules = [
        ("Pset_ManufacturerOccurrence", "SerialNumber", NUMBER_OR_NA, "Serial number"),
        ("COBie_Component", "InstallationDate", DATE_OR_DEFAULT, "Valid date"),
        ("COBie_Component", "WarrantyStartDate", DATE_OR_DEFAULT, "Valid date"),
    ];
    for (set, property, pattern, name) in component_rules {
        scope.create_specification(&app, Requirement::property_matches(set, property, pattern, name))?;
    }
    scope.create_specification(&app, Requirement::property_has_value("COBie_Component", "TagNumber", "n/a"))?;
    scope.create_specification(
        &app,
        Requirement::property_matches("COBie_Component", "BarCode", NUMBER_OR_NA, "Bar code"),
    )?;
    scope.create_specification(
        &app,
        Requirement::property_has_value("COBie_Component", "AssetIdentifier", "n/a"),
    )?;

    scope.set_requirement_cardinality(RequirementCardinality::Optional);
    let doors = scope.applicability("Door", &["IfcDoor"])?;
    scope.create_specification(&doors, Requirement::property_defined("Pset_DoorCommon", "FireRating"))?;
    scope.create_specification(
        &doors,
        Requirement::property_in_list("Pset_DoorCommon", "FireRating", DOOR_FIRE_RATINGS),
    )?;
    scope.reset_requirement_cardinality();

    scope.skip("08:13: Duplicates not supported");
    scope.skip("08:14: PresentationLayers need further info");
    Ok(())
}

/// 08.02: occurrence `Name` patterns from the component short codes
fn occurrence_naming(
    scope: &mut SpecCompiler,
    resolver: &NamingResolver,
    components: &[&str],
    policy: UndefinedSubKindPolicy,
) -> ids_core::Result<()> {
    scope
        .set_applicable_passes(GenerationPass::COMPLEX)
        .set_requirement_cardinality(RequirementCardinality::Optional);

    let catalog = Arc::clone(scope.catalog());
    let settings = scope.settings();
    let view = if settings.use_inferred_occurrence_types && settings.target_dialect == SchemaDialect::Ifc2x3 {
        catalog.hybrid_ifc2x3()
    } else {
        catalog.view(settings.target_dialect)
    };
    let mut occurrences = Vec::new();
    for component in components {
        occurrences.extend(view.concrete_subtypes_of(component)?);
    }
    occurrences.sort_by(|a, b| a.name.cmp(&b.name));
    occurrences.dedup_by(|a, b| a.name == b.name);

    let conventions = resolver.conventions();
    for occurrence in occurrences {
        let Some(mapping) = resolver.mapping(&occurrence.name) else {
            trace!("{} has no short code", occurrence.name);
            continue;
        };
        let label = conventions.unprefixed(&occurrence.name);
        if !mapping.has_overrides() {
            let Some(pattern) = resolver.rule_pattern(&occurrence.name, None) else {
                continue;
            };
            scope.set_name(label);
            let app = scope.exact_applicability("Object Occurrence [COBie]", &occurrence.name)?;
            scope.create_specification(&app, Requirement::attribute_matches("Name", pattern))?;
            continue;
        }

        let pdts: Vec<&String> = catalog
            .lookup_any(&format!("{}Type", occurrence.name))
            .map(|ty| &ty.sub_kinds)
            .filter(|sub_kinds| !sub_kinds.is_empty())
            .unwrap_or(&occurrence.sub_kinds)
            .iter()
            .filter(|pdt| policy.naming_rules || pdt.as_str() != UNDEFINED_SUB_KIND)
            .collect();
        if pdts.is_empty() {
            warn!("Type {} has no predefined Types", occurrence.name);
            continue;
        }
        let mut numbering = scope.begin_numbering_scope(Some(label));
        for pdt in pdts {
            let Some(pattern) = resolver.rule_pattern(&occurrence.name, Some(pdt.as_str())) else {
                continue;
            };
            numbering.set_name(pdt.as_str());
            let app = numbering
                .exact_applicability("Object Occurrence [COBie]", &occurrence.name)?
                .with_predefined_type(pdt.as_str());
            numbering.create_specification(&app, Requirement::attribute_matches("Name", pattern))?;
        }
    }
    Ok(())
}

pub(super) fn systems(scope: &mut SpecCompiler) -> ids_core::Result<()> {
    scope.add_tag("System");
    let app = scope.exact_applicability("Ifc System", "IfcSystem")?;
    scope.skip("Requires IFC4 to make use of IfcDistributionSystem PDT");
    scope.skip("Requires IFC4 to make use of IfcDistributionSystem PDT");
    scope.create_specification(&app, Requirement::classification_pattern(UNICLASS_SYSTEM, "Ss_.*"))?;
    Ok(())
}
