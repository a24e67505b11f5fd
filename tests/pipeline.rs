//! End-to-end runs into temporary folders

use chrono::NaiveDate;
use ids_core::{GenerationPass, RibaStage};
use ids_generator::config::GeneratorInputs;
use ids_generator::export::{ids_files, ids_xml, json};
use ids_generator::fixtures::FixtureModel;
use ids_generator::{ConfigLoader, Pipeline, RunOptions};
use pretty_assertions::assert_eq;

fn inputs(date: (i32, u32, u32)) -> GeneratorInputs {
    let mut inputs = ConfigLoader::embedded().load().unwrap();
    inputs.config.publication.date = NaiveDate::from_ymd_opt(date.0, date.1, date.2);
    inputs
}

#[test]
fn test_reruns_produce_identical_bundles() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    let first_inputs = inputs((2026, 1, 5));
    let second_inputs = inputs((2026, 10, 18));

    let first = Pipeline::new(&first_inputs)
        .with_output(first_dir.path())
        .run_bundle(RibaStage::Stage4, GenerationPass::CORE)
        .unwrap();
    let second = Pipeline::new(&second_inputs)
        .with_output(second_dir.path())
        .run_bundle(RibaStage::Stage4, GenerationPass::CORE)
        .unwrap();

    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(first.specifications, second.specifications);
    assert_eq!(first.path.file_name(), second.path.file_name());
}

#[test]
fn test_partitioned_run_writes_every_layer() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = inputs((2026, 3, 1));
    let pipeline = Pipeline::new(&inputs).with_output(dir.path());
    let report = pipeline.run_bundle(RibaStage::Stage3, GenerationPass::CORE).unwrap();

    assert_eq!(report.invalid_files, 0);
    assert!(report.groups > 1);
    assert_eq!(
        report.path.file_name().and_then(|n| n.to_str()),
        Some("ER-DFE-XX-XX-L-X-0045-Information Model Stage3 Assurance Grouped-S2-P01-Core.ids")
    );

    let layout = pipeline.layout();
    let groups = ids_files(&layout.group_dir(RibaStage::Stage3)).unwrap();
    assert_eq!(groups.len(), report.groups);
    let singles = ids_files(&layout.stage_dir(RibaStage::Stage3)).unwrap();
    assert!(!singles.is_empty());
    assert!(singles.iter().all(|p| p.starts_with(dir.path().join("Stage3"))));

    let bundle = ids_xml::read_file(&report.path).unwrap();
    assert_eq!(bundle.len(), report.specifications);
    assert_eq!(bundle.milestone.as_deref(), Some("RIBA Stage 3: Spatial Coordination"));
    assert_eq!(bundle.version.as_deref(), Some("P01.2026.60"));

    let identifiers: Vec<_> = bundle
        .specifications
        .iter()
        .filter_map(|s| s.identifier.clone())
        .collect();
    let mut sorted = identifiers.clone();
    sorted.sort();
    assert_eq!(identifiers, sorted);

    let document = json::read_file(report.json.as_ref().unwrap()).unwrap();
    document.verify().unwrap();
    assert_eq!(document.fingerprint, report.fingerprint);
    assert_eq!(document.bundle.spec_count(), report.specifications);
}

#[test]
fn test_later_runs_replace_earlier_stage_folders() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = inputs((2026, 3, 1));
    let pipeline = Pipeline::new(&inputs).with_output(dir.path());
    let stray = pipeline.layout().stage_dir(RibaStage::Stage3).join("stale/3_99 Old.ids");
    std::fs::create_dir_all(stray.parent().unwrap()).unwrap();
    std::fs::write(&stray, "<ids/>").unwrap();

    pipeline.run_bundle(RibaStage::Stage3, GenerationPass::CORE).unwrap();
    assert!(!stray.exists());
}

#[test]
fn test_fixtures_only_run() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = inputs((2026, 3, 1));
    let report = Pipeline::new(&inputs)
        .with_output(dir.path())
        .run(&RunOptions {
            skip_rules: true,
            ..RunOptions::default()
        })
        .unwrap();

    assert!(report.bundles.is_empty());
    assert_eq!(report.fixtures.len(), 2);
    for fixture in &report.fixtures {
        let model = FixtureModel::load(&fixture.path).unwrap();
        assert_eq!(model.name, fixture.name);
        assert_eq!(model.stage, fixture.stage);
        assert!(fixture.failing > 0);
        assert!(!model.failure_tags().is_empty());
    }
    assert_eq!(report.fixtures[0].stage, RibaStage::Stage3);
    assert_eq!(report.fixtures[1].stage, RibaStage::Stage5);
}
