//! Sections 01-03: project, site and building

use ids_core::{Requirement, RibaStage, SpecCompiler, ValueConstraint};

use super::common_requirements;
use super::patterns::UNICLASS_SYSTEM;
use crate::config::ProjectSettings;

pub(super) fn project(scope: &mut SpecCompiler, project: &ProjectSettings) -> ids_core::Result<()> {
    scope.add_tag("Project");
    let app = scope.applicability("Project", &["IfcProject"])?;
    common_requirements(scope, &app, "Project", &project.name, &project.description)?;

    scope.create_specification(&app, Requirement::attribute_defined("Phase"))?;
    scope.create_specification(&app, Requirement::attribute_in_list("Phase", RibaStage::all_descriptions()))?;
    let stage = scope.target_stage();
    scope.create_specification_titled(
        &app,
        Requirement::attribute_has_value("Phase", stage.description()),
        Some("Project Should Have Phase Correct For Project Stage"),
    )?;
    Ok(())
}

pub(super) fn site(scope: &mut SpecCompiler, project: &ProjectSettings) -> ids_core::Result<()> {
    scope.add_tag("Site");
    let app = scope.applicability("Site", &["IfcSite"])?;
    common_requirements(scope, &app, "Site", &project.site_name, &project.site_description)
}

pub(super) fn building(scope: &mut SpecCompiler, project: &ProjectSettings) -> ids_core::Result<()> {
    scope.add_tag("Building");
    let app = scope.applicability("Building", &["IfcBuilding"])?;
    common_requirements(
        scope,
        &app,
        "Building",
        &project.building_name,
        &project.building_description,
    )?;

    scope.create_specification(&app, Requirement::classification_pattern(UNICLASS_SYSTEM, "En.*"))?;
    scope.create_specification(
        &app,
        Requirement::classification_has_value(
            "Uniclass En",
            ValueConstraint::pattern(UNICLASS_SYSTEM),
            &project.building_category,
        ),
    )?;
    for (set, property) in [
        ("Additional_Pset_BuildingCommon", "BlockConstructionType"),
        ("Additional_Pset_BuildingCommon", "MaximumBlockHeight"),
        ("Pset_BuildingCommon", "NumberOfStoreys"),
        ("COBie_BuildingCommon_UK", "UPRN"),
    ] {
        scope.create_specification(&app, Requirement::property_defined(set, property))?;
    }
    scope.create_specification(
        &app,
        Requirement::property_has_value("COBie_BuildingCommon_UK", "UPRN", &project.uprn).with_data_type("IFCTEXT"),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use ids_core::{GenerationPass, Specification};
    use pretty_assertions::assert_eq;

    use crate::rulebook::tests::compile;

    use super::*;

    fn spec<'r>(specs: &'r [Specification], id: &str) -> &'r Specification {
        specs.iter().find(|s| s.identifier == id).unwrap()
    }

    #[test]
    fn test_project_section_numbers_and_titles() {
        let rules = compile(RibaStage::Stage4, GenerationPass::CORE);
        let specs: Vec<Specification> = rules
            .groups
            .iter()
            .flat_map(|g| g.specifications.clone())
            .collect();

        assert_eq!(
            spec(&specs, "01_03").description,
            "Project Should Have Name Matching The Projects Information Standard"
        );
        assert_eq!(
            spec(&specs, "01_08").description,
            "Project Should Have Phase Correct For Project Stage"
        );
        let phase = &spec(&specs, "01_08").requirement;
        assert!(phase.decode().contains(RibaStage::Stage4.description()));

        // site only has the shared rules
        assert!(specs.iter().any(|s| s.identifier == "02_05"));
        assert!(!specs.iter().any(|s| s.identifier == "02_06"));

        // building: 5 shared, 2 classification, 4 defined, 1 UPRN value
        assert!(specs.iter().any(|s| s.identifier == "03_12"));
        assert!(spec(&specs, "03_12").name.starts_with("03_12 : Building"));
    }
}
