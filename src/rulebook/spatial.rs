//! Sections 04-06: storeys, spaces and zones

use ids_core::{
    GenerationPass, LifecycleStages, PartOfRelation, Requirement, RequirementCardinality, SpecCompiler,
    ValueConstraint,
};
use tracing::debug;

use super::content::DomainContent;
use super::patterns::{ADS_SYSTEM, SPACE_NAME, UNICLASS_SYSTEM};
use super::within_stages;
use crate::config::ProjectSettings;

/// Storey categories recognised by the COBie floor classification
const FLOOR_CATEGORIES: [&str; 3] = ["Site", "Floor", "Roof"];

/// ADS codes shown in a rule label before the rest are summarised
const ADS_LABEL_LIMIT: usize = 3;

pub(super) fn storeys(
    scope: &mut SpecCompiler,
    project: &ProjectSettings,
    content: &DomainContent,
) -> ids_core::Result<()> {
    scope.add_tag("BuildingStorey");
    let app = scope.applicability("Building Storey", &["IfcBuildingStorey"])?;

    scope.create_specification(&app, Requirement::attribute_defined("GlobalId"))?;
    scope.create_specification(&app, Requirement::attribute_defined("Name"))?;
    scope.create_specification(&app, Requirement::attribute_in_list("Name", content.floor_names()))?;
    scope.skip("Unique Storey Name");
    scope.create_specification(&app, Requirement::attribute_defined("Description"))?;
    scope.create_specification(
        &app,
        Requirement::attribute_in_list("Description", content.floor_descriptions()),
    )?;
    scope.create_specification(
        &app,
        Requirement::classification_in_list(
            "COBie Floor Classification",
            ValueConstraint::pattern(".*Floor.*"),
            FLOOR_CATEGORIES,
        ),
    )?;

    let elevations: Vec<String> = (0..project.number_of_storeys)
        .map(|level| format!("{{{{IfcBuildingStorey.Level {level:02}.Elevation}}}}"))
        .collect();
    scope.create_specification(&app, Requirement::attribute_in_list("Elevation", elevations))?;
    scope.create_specification(
        &app,
        Requirement::property_above("Additional_Pset_BuildingStoreyCommon", "NetHeight", 0)
            .with_data_type("IFCLENGTHMEASURE"),
    )?;
    Ok(())
}

pub(super) fn spaces(scope: &mut SpecCompiler, content: &DomainContent) -> ids_core::Result<()> {
    scope.add_tag("Space");
    let app = scope.applicability("Space", &["IfcSpace"])?;

    scope.create_specification(&app, Requirement::attribute_defined("GlobalId"))?;
    scope.create_specification(&app, Requirement::attribute_defined("Name"))?;
    scope.create_specification(&app, Requirement::attribute_matches("Name", SPACE_NAME))?;
    scope.skip("05.04: Unique name not supported");
    scope.skip("05.05: Name related to Floor TBC");
    scope.create_specification(&app, Requirement::attribute_defined("Description"))?;

    within_stages(scope, LifecycleStages::STAGE3 | LifecycleStages::STAGE4, |scope| {
        scope.create_specification(
            &app,
            Requirement::property_has_value("COBie_Space", "Roomtag", "n/a").with_data_type("IFCTEXT"),
        )?;
        Ok(())
    })?;
    within_stages(scope, LifecycleStages::STAGE5_PLUS, |scope| {
        scope.create_specification(&app, Requirement::property_defined("COBie_Space", "Roomtag"))?;
        Ok(())
    })?;

    let ads = ValueConstraint::pattern(ADS_SYSTEM);
    scope.create_specification(&app, Requirement::classification_defined("ADS Classification", ads.clone()))?;
    scope.create_specification(
        &app,
        Requirement::classification_in_list("ADS Classification", ads, content.ads_code_values()),
    )?;

    for (quantity, measure) in [
        ("Height", "IFCLENGTHMEASURE"),
        ("GrossFloorArea", "IFCAREAMEASURE"),
        ("NetFloorArea", "IFCAREAMEASURE"),
    ] {
        scope.create_specification(
            &app,
            Requirement::property_above("BaseQuantities", quantity, 0).with_data_type(measure),
        )?;
    }

    scope.create_specification(
        &app,
        Requirement::classification_in_list(
            "Uniclass 2015",
            ValueConstraint::pattern(UNICLASS_SYSTEM),
            content.uniclass_codes(),
        ),
    )?;

    let mut consistency = scope.begin_child_scope(None);
    consistency
        .set_applicable_passes(GenerationPass::COMPLEX)
        .set_requirement_cardinality(RequirementCardinality::Optional);
    for (uniclass, codes) in content.uniclass_ads_map() {
        let label = ads_label(&codes);
        consistency.set_name(uniclass);
        let classified = consistency.classified_applicability(
            &format!("Spaces with ADS '{label}'"),
            &["IfcSpace"],
            ValueConstraint::pattern(".*ADS.*"),
            codes,
        )?;
        consistency.create_specification(
            &classified,
            Requirement::classification_has_value("Uniclass", ValueConstraint::pattern(UNICLASS_SYSTEM), uniclass),
        )?;
    }
    debug!("ADS consistency rules cover {} Uniclass spaces", content.mapped_uniclass().len());
    Ok(())
}

/// `CLA11, CLA12, CLA13,+2 more`
fn ads_label(codes: &[&str]) -> String {
    let shown = codes
        .iter()
        .take(ADS_LABEL_LIMIT)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if codes.len() > ADS_LABEL_LIMIT {
        format!("{shown},+{} more", codes.len() - ADS_LABEL_LIMIT)
    } else {
        shown
    }
}

pub(super) fn zones(scope: &mut SpecCompiler, content: &DomainContent) -> ids_core::Result<()> {
    scope.add_tag("Zone");
    scope.set_requirement_cardinality(RequirementCardinality::Optional);
    let app = scope.applicability("Zone", &["IfcZone"])?;

    scope.create_specification(&app, Requirement::attribute_defined("GlobalId"))?;
    scope.create_specification(&app, Requirement::attribute_defined("Name"))?;
    scope.create_specification(&app, Requirement::attribute_in_list("Name", content.zone_codes()))?;
    scope.create_specification(&app, Requirement::attribute_defined("Description"))?;
    scope.create_specification(
        &app,
        Requirement::attribute_in_list("Description", content.zone_descriptions()),
    )?;

    let category = ValueConstraint::pattern(".*Zone.*");
    scope.create_specification(&app, Requirement::classification_defined("Category", category.clone()))?;
    scope.create_specification(
        &app,
        Requirement::classification_in_list("Category", category, content.zone_categories()),
    )?;
    scope.skip("Can't checks spaces allocated to single zone");
    scope.create_specification(
        &app,
        Requirement::part_of(Some(PartOfRelation::AssignsToGroup), "IfcSpace"),
    )?;
    Ok(())
}
