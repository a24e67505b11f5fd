//! Stage 3 spatial fixture
//!
//! Project, site and building, six storeys (one unknown), rooms on every
//! storey, five zones and a door and window per ground-floor room. Level 02,
//! its rooms and the last three zones are then corrupted one value at a time.

use anyhow::{bail, Context, Result};
use ids_core::fixtures::{CorruptionScript, Field, Mutation, ValueSet};
use ids_core::{RequirementKind, RibaStage, SampleInstance};
use tracing::{debug, info};

use super::{break_instance, FixtureContext, FixtureModel};
use crate::rulebook::content::Floor;

pub const STAGE: RibaStage = RibaStage::Stage3;
pub const MODEL_NAME: &str = "DfE-Spatial-Stage3";

const STOREYS: [&str; 6] = ["00", "M0", "01", "02", "RF", "BAD"];
/// Storeys taking the full room list, the rest are roof levels
const FLOOR_STOREYS: usize = 4;
const ROOMS: [&str; 6] = ["00", "01", "02a", "02b", "03", "B4D"];
const ROOF_ROOMS: [&str; 3] = ["04", "05", "06"];
const ZONES: [&str; 5] = [
    "Basic teaching",
    "Learning resources",
    "Halls and dining",
    "Non-net",
    "Staff and admin",
];
/// Zones left intact before the corrupted ones start
const INTACT_ZONES: usize = 2;
const BROKEN_STOREY: &str = "Level 02";

const STOREY_HEIGHT: u32 = 3400;
/// Uniclass codes cycled through when classifying rooms
const ROOM_CLASS_CYCLE: usize = 10;

pub(crate) const ADS: &str = "DFE ADS";
pub(crate) const UNICLASS_SL: &str = "Uniclass SL";
const STOREY_PSET: &str = "Additional_Pset_BuildingStoreyCommon";

pub fn build(ctx: &FixtureContext<'_>) -> Result<FixtureModel> {
    let project = ctx.project();
    let mut model = FixtureModel::new(MODEL_NAME, STAGE, ctx.dialect(), &project.name);

    let building = project_structure(ctx, &mut model, STAGE);
    let storeys = storeys(ctx, &mut model, &building, &STOREYS);
    let split = FLOOR_STOREYS.min(storeys.len());
    let mut rooms = spaces(ctx, &mut model, &storeys[..split], &ROOMS)?;
    rooms.extend(spaces(ctx, &mut model, &storeys[split..], &ROOF_ROOMS)?);

    let zones = zones(ctx, &mut model, &ZONES);
    assign_zones(&mut model, &rooms, &zones)?;

    let ground: Vec<usize> = rooms
        .iter()
        .copied()
        .filter(|idx| model.samples.instances[*idx].container.contains("00"))
        .collect();
    for idx in ground {
        let space = &model.samples.instances[idx];
        let (name, description) = (space.name().to_string(), description_of(space));
        model.push(
            SampleInstance::new("IfcDoor", &name, format!("{name}-D01"))
                .with_values(named(&format!("{name}-D01"), &format!("Door to {description}"))),
        );
        model.push(
            SampleInstance::new("IfcWindow", &name, format!("{name}-W01"))
                .with_values(named(&format!("{name}-W01"), &format!("Window to {description}"))),
        );
    }

    let storey = storeys
        .iter()
        .copied()
        .find(|idx| model.samples.instances[*idx].name() == BROKEN_STOREY)
        .with_context(|| format!("{BROKEN_STOREY} missing from the spatial fixture"))?;
    let broken_rooms = model.contained_in("IfcSpace", BROKEN_STOREY);
    break_storey(ctx, &mut model, storey)?;
    break_spaces(ctx, &mut model, &broken_rooms)?;
    break_zones(ctx, &mut model, &zones[INTACT_ZONES.min(zones.len())..])?;

    model.stamp_global_ids();
    info!(
        "Spatial fixture: {} samples, {} corruptions",
        model.samples.len(),
        model.corruptions.len()
    );
    Ok(model)
}

fn named(name: &str, description: &str) -> ValueSet {
    ValueSet::default()
        .with(Field::attribute("Name"), name)
        .with(Field::attribute("Description"), description)
}

fn description_of(instance: &SampleInstance) -> String {
    instance
        .values
        .get(&Field::attribute("Description"))
        .unwrap_or_default()
        .to_string()
}

/// Project, site and building; returns the building name
pub(crate) fn project_structure(ctx: &FixtureContext<'_>, model: &mut FixtureModel, stage: RibaStage) -> String {
    let project = ctx.project();
    model.push(
        SampleInstance::new("IfcProject", "", &project.name).with_values(
            named(&project.name, &project.description).with(Field::attribute("Phase"), stage.description()),
        ),
    );
    model.push(
        SampleInstance::new("IfcSite", &project.name, &project.site_name)
            .with_values(named(&project.site_name, &project.site_description)),
    );
    let building = named(&project.building_name, &project.building_description)
        .with(Field::classification("Uniclass"), &project.building_category)
        .with(
            Field::property("Additional_Pset_BuildingCommon", "BlockConstructionType"),
            &project.block_construction_type,
        )
        .with(Field::property("Additional_Pset_BuildingCommon", "MaximumBlockHeight"), "18000")
        .with(
            Field::property("Pset_BuildingCommon", "NumberOfStoreys"),
            project.number_of_storeys.to_string(),
        )
        .with(Field::property("COBie_BuildingCommon_UK", "UPRN"), &project.uprn);
    model.push(SampleInstance::new("IfcBuilding", &project.site_name, &project.building_name).with_values(building));
    project.building_name.clone()
}

/// One storey per code, unknown codes becoming an invalid storey
pub(crate) fn storeys(ctx: &FixtureContext<'_>, model: &mut FixtureModel, building: &str, codes: &[&str]) -> Vec<usize> {
    codes
        .iter()
        .enumerate()
        .map(|(level, code)| {
            let floor = ctx.content.floor(code).cloned().unwrap_or_else(|| Floor {
                code: code.to_string(),
                name: Some("Invalid".into()),
                description: "Bad level".into(),
                category: "Bad Category".into(),
            });
            let name = floor.name.unwrap_or_else(|| floor.code.clone());
            let values = named(&name, &floor.description)
                .with(Field::attribute("Elevation"), (level as u32 * STOREY_HEIGHT).to_string())
                .with(Field::property(STOREY_PSET, "NetHeight"), "2800")
                .with(Field::classification("Floor"), floor.category);
            model.push(SampleInstance::new("IfcBuildingStorey", building, &name).with_values(values))
        })
        .collect()
}

/// Rooms on each storey, numbered from 1 within one call
fn spaces(ctx: &FixtureContext<'_>, model: &mut FixtureModel, storeys: &[usize], rooms: &[&str]) -> Result<Vec<usize>> {
    let classes = ctx.content.mapped_uniclass();
    if classes.is_empty() {
        bail!("No Uniclass space is mapped from an ADS code");
    }
    let cycle = ROOM_CLASS_CYCLE.min(classes.len());

    let mut created = Vec::new();
    let mut sequence: u32 = 0;
    for storey in storeys {
        let storey_name = model.samples.instances[*storey].name().to_string();
        let level = storey_name.replace("Level ", "");
        for room in rooms {
            sequence += 1;
            let class = classes[sequence as usize % cycle];
            let ads = ctx
                .content
                .ads_codes
                .iter()
                .find(|a| a.uniclass == class.code)
                .with_context(|| format!("No ADS code maps to {}", class.code))?;
            let name = format!("{level}-{room}");
            let values = named(&name, &format!("Room {name}-{sequence}"))
                .with(Field::classification(UNICLASS_SL), &class.code)
                .with(Field::classification(ADS), &ads.code)
                .with(Field::property("COBie_Space", "Roomtag"), "n/a")
                .with(Field::property("BaseQuantities", "Height"), "2400")
                .with(
                    Field::property("BaseQuantities", "GrossFloorArea"),
                    (100 * sequence).to_string(),
                )
                .with(
                    Field::property("BaseQuantities", "NetFloorArea"),
                    (95 * sequence).to_string(),
                );
            created.push(model.push(SampleInstance::new("IfcSpace", &storey_name, &name).with_values(values)));
        }
    }
    debug!("{} rooms over {} storeys", created.len(), storeys.len());
    Ok(created)
}

/// Zones for the known codes, in the order given
pub(crate) fn zones(ctx: &FixtureContext<'_>, model: &mut FixtureModel, codes: &[&str]) -> Vec<usize> {
    let project = &ctx.project().name;
    codes
        .iter()
        .filter_map(|code| ctx.content.zone(code))
        .map(|zone| {
            let values = named(&zone.code, &zone.description).with(Field::classification("Zones"), &zone.category);
            model.push(SampleInstance::new("IfcZone", project, &zone.code).with_values(values))
        })
        .collect()
}

/// Spread `rooms` over `zones` round-robin
pub(crate) fn assign_zones(model: &mut FixtureModel, rooms: &[usize], zones: &[usize]) -> Result<()> {
    if zones.is_empty() {
        bail!("Cannot assign rooms without zones");
    }
    for (i, room) in rooms.iter().enumerate() {
        let zone = model.samples.instances[zones[i % zones.len()]].name().to_string();
        model.samples.instances[*room]
            .values
            .set(&Field::membership(zone), "");
    }
    Ok(())
}

fn break_storey(ctx: &FixtureContext<'_>, model: &mut FixtureModel, storey: usize) -> Result<()> {
    let entity = "IfcBuildingStorey";
    let tag = |kind, subject: &str| ctx.tag(entity, None, kind, subject);
    break_instance(
        model,
        storey,
        vec![
            (
                "Blank storey description",
                Mutation::Blank {
                    field: Field::attribute("Description"),
                },
                tag(RequirementKind::AttributeDefined, "Description"),
            ),
            (
                "Blank storey name",
                Mutation::Blank {
                    field: Field::attribute("Name"),
                },
                tag(RequirementKind::AttributeDefined, "Name"),
            ),
            (
                "Remove net height",
                Mutation::Remove {
                    field: Field::property(STOREY_PSET, "NetHeight"),
                },
                tag(
                    RequirementKind::PropertyValueInRange,
                    &format!("{STOREY_PSET}.NetHeight"),
                ),
            ),
        ],
    )
}

fn break_spaces(ctx: &FixtureContext<'_>, model: &mut FixtureModel, rooms: &[usize]) -> Result<()> {
    if rooms.is_empty() {
        bail!("{BROKEN_STOREY} has no rooms to corrupt");
    }
    let tag = |kind, subject: &str| ctx.tag("IfcSpace", None, kind, subject);
    let roomtag = || {
        ctx.tag_any(
            "IfcSpace",
            &[RequirementKind::PropertyHasValue, RequirementKind::PropertyDefined],
            "COBie_Space.Roomtag",
        )
    };
    let quantity = |name: &str| {
        (
            Field::property("BaseQuantities", name),
            tag(RequirementKind::PropertyValueInRange, &format!("BaseQuantities.{name}")),
        )
    };
    let (height, height_tag) = quantity("Height");
    let (area, area_tag) = quantity("GrossFloorArea");
    let roomtag_field = Field::property("COBie_Space", "Roomtag");

    let mut script = CorruptionScript::new()
        .step(
            "Blank name",
            Mutation::Blank {
                field: Field::attribute("Name"),
            },
            tag(RequirementKind::AttributeDefined, "Name"),
        )
        .step(
            "Blank description",
            Mutation::Blank {
                field: Field::attribute("Description"),
            },
            tag(RequirementKind::AttributeDefined, "Description"),
        )
        .step(
            "Remove Roomtag",
            Mutation::Remove {
                field: roomtag_field.clone(),
            },
            roomtag(),
        )
        .step(
            "Invalid Roomtag",
            Mutation::Replace {
                field: roomtag_field,
                value: "INVALID".into(),
            },
            roomtag(),
        )
        .step(
            "Remove ADS classification",
            Mutation::Remove {
                field: Field::classification(ADS),
            },
            tag(RequirementKind::ClassificationDefined, "ADS Classification"),
        )
        .step(
            "Unknown ADS code",
            Mutation::Replace {
                field: Field::classification(ADS),
                value: "BOGUS".into(),
            },
            tag(RequirementKind::ClassificationInList, "ADS Classification"),
        )
        .step("Remove height quantity", Mutation::Remove { field: height }, height_tag)
        .step("Zero gross floor area", Mutation::Zero { field: area }, area_tag)
        .step(
            "Remove Uniclass classification",
            Mutation::Remove {
                field: Field::classification(UNICLASS_SL),
            },
            tag(RequirementKind::ClassificationInList, "Uniclass 2015"),
        )
        .step(
            "Unknown Uniclass code",
            Mutation::Replace {
                field: Field::classification(UNICLASS_SL),
                value: "SL_00_00_00".into(),
            },
            tag(RequirementKind::ClassificationInList, "Uniclass 2015"),
        );

    // the zone step lands on whichever room the cursor reaches next
    let zoned = rooms[script.len() % rooms.len()];
    let zone = model.samples.instances[zoned]
        .values
        .memberships
        .iter()
        .next()
        .cloned()
        .context("Corrupted room has no zone")?;
    script = script.step(
        "Remove from zone",
        Mutation::Remove {
            field: Field::membership(zone),
        },
        ctx.tag("IfcZone", None, RequirementKind::PartOf, "IfcSpace"),
    );
    model.corrupt(&script, rooms)?;

    // valid code, but not the one its ADS maps to
    break_instance(
        model,
        rooms[0],
        vec![(
            "Uniclass inconsistent with ADS",
            Mutation::Replace {
                field: Field::classification(UNICLASS_SL),
                value: "SL_42_40_30".into(),
            },
            None,
        )],
    )
}

fn break_zones(ctx: &FixtureContext<'_>, model: &mut FixtureModel, zones: &[usize]) -> Result<()> {
    if zones.is_empty() {
        return Ok(());
    }
    let tag = |kind, subject: &str| ctx.tag("IfcZone", None, kind, subject);
    let script = CorruptionScript::new()
        .step(
            "Blank zone name",
            Mutation::Blank {
                field: Field::attribute("Name"),
            },
            tag(RequirementKind::AttributeDefined, "Name"),
        )
        .step(
            "Unknown zone name",
            Mutation::Replace {
                field: Field::attribute("Name"),
                value: "Not a valid name".into(),
            },
            tag(RequirementKind::AttributeInList, "Name"),
        )
        .step(
            "Blank zone description",
            Mutation::Blank {
                field: Field::attribute("Description"),
            },
            tag(RequirementKind::AttributeDefined, "Description"),
        )
        .step(
            "Unknown zone description",
            Mutation::Replace {
                field: Field::attribute("Description"),
                value: "Not a valid description".into(),
            },
            tag(RequirementKind::AttributeInList, "Description"),
        )
        .step(
            "Remove zone category",
            Mutation::Remove {
                field: Field::classification("Zones"),
            },
            tag(RequirementKind::ClassificationDefined, "Category"),
        )
        .step(
            "Unknown zone category",
            Mutation::Replace {
                field: Field::classification("Zones"),
                value: "Invalid Category".into(),
            },
            tag(RequirementKind::ClassificationInList, "Category"),
        );
    model.corrupt(&script, zones)
}
