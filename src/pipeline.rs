//! Stage and pass driver
//!
//! One run compiles the rulebook once per configured (pass, stage)
//! combination, writing single-specification and per-scope files while the
//! compiler runs and the flattened bundle afterwards. Fixtures are compiled
//! separately against every rule of their own stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use ids_core::naming::CounterStore;
use ids_core::schema::TypeConventions;
use ids_core::{
    CompiledRules, CompilerSettings, GenerationPass, GroupMetadata, NamingResolver, NullSink, OutputSink,
    ProjectInfo, RibaStage, RuleBundle, SpecCompiler,
};
use tracing::{debug, info, info_span, warn};

use crate::config::{GeneratorConfig, GeneratorInputs, OutputFormat};
use crate::export::json::{self, BundleDocument};
use crate::export::{ids_files, ids_xml, ExportLayout, FileSink};
use crate::fixtures::{self, FixtureContext, FixtureModel};
use crate::rulebook::Rulebook;

const FIXTURE_DIR: &str = "Fixtures";

/// Header of the root group for one compile
pub fn root_metadata(config: &GeneratorConfig, stage: RibaStage, pass: GenerationPass, date: NaiveDate) -> GroupMetadata {
    let publication = &config.publication;
    GroupMetadata {
        name: format!(
            "Information Model RIBA {} Assurance for {}",
            stage, config.project.name
        ),
        description: format!(
            "Assurance of IFC-SPF deliverables against {} DfE's information requirements",
            pass.label()
        ),
        author: publication.author.clone(),
        version: format!("{}.{}.{}", publication.revision, date.year(), date.ordinal()),
        milestone: stage.description().to_string(),
        purpose: publication.purpose.clone(),
        copyright: publication.copyright.clone(),
        date: Some(date.format("%Y-%m-%d").to_string()),
    }
}

/// `ER-DFE-XX-XX-L-X-0045-Information Model Stage4 Assurance-S2-P01-Core.ids`
pub fn bundle_file_name(config: &GeneratorConfig, stage: RibaStage, pass: GenerationPass) -> String {
    let publication = &config.publication;
    let grouped = if config.output.group_by_applicability {
        " Grouped"
    } else {
        ""
    };
    format!(
        "{}-{:04}-Information Model {} Assurance{}-{}-{}{}.ids",
        publication.document_prefix,
        publication.version,
        stage,
        grouped,
        publication.status,
        publication.revision,
        pass.file_suffix()
    )
}

/// What to run, narrowed from the configuration by the CLI
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub stages: Option<Vec<RibaStage>>,
    pub passes: Option<Vec<GenerationPass>>,
    pub skip_rules: bool,
    pub skip_fixtures: bool,
}

#[derive(Debug, Clone)]
pub struct BundleReport {
    pub stage: RibaStage,
    pub pass: GenerationPass,
    pub path: PathBuf,
    pub json: Option<PathBuf>,
    pub specifications: usize,
    pub groups: usize,
    pub fingerprint: String,
    /// Files that failed read-back checks
    pub invalid_files: usize,
}

#[derive(Debug, Clone)]
pub struct FixtureReport {
    pub name: String,
    pub stage: RibaStage,
    pub path: PathBuf,
    pub samples: usize,
    pub failing: usize,
    pub corruptions: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub bundles: Vec<BundleReport>,
    pub fixtures: Vec<FixtureReport>,
}

impl RunReport {
    pub fn invalid_files(&self) -> usize {
        self.bundles.iter().map(|b| b.invalid_files).sum()
    }
}

pub struct Pipeline<'a> {
    inputs: &'a GeneratorInputs,
    layout: ExportLayout,
    date: NaiveDate,
}

impl<'a> Pipeline<'a> {
    pub fn new(inputs: &'a GeneratorInputs) -> Self {
        let config = &inputs.config;
        Self {
            inputs,
            layout: ExportLayout::new(&config.publication.base_path),
            date: config
                .publication
                .date
                .unwrap_or_else(|| Utc::now().date_naive()),
        }
    }

    pub fn with_output(mut self, base: impl Into<PathBuf>) -> Self {
        self.layout = ExportLayout::new(base);
        self
    }

    pub fn layout(&self) -> &ExportLayout {
        &self.layout
    }

    fn config(&self) -> &GeneratorConfig {
        &self.inputs.config
    }

    fn resolver(&self) -> NamingResolver {
        NamingResolver::new(
            self.inputs.type_codes.clone(),
            TypeConventions::default(),
            self.inputs.sub_kinds.clone(),
            Arc::new(CounterStore::new()),
        )
    }

    fn settings(&self, stage: RibaStage, pass: GenerationPass) -> CompilerSettings {
        let output = &self.config().output;
        let schema = &self.config().schema;
        let mut settings = CompilerSettings::new(stage, pass)
            .with_partitioning(output.one_file_per_scope, output.group_by_applicability)
            .with_one_file_per_specification(output.one_file_per_specification)
            .with_dialects(schema.target, schema.supported_set());
        settings.use_inferred_occurrence_types = schema.use_inferred_occurrence_types;
        settings
    }

    /// Compile the rulebook into `sink`
    pub fn compile(
        &self,
        stage: RibaStage,
        pass: GenerationPass,
        resolver: &NamingResolver,
        sink: Box<dyn OutputSink>,
    ) -> Result<CompiledRules> {
        let config = self.config();
        let mut root = SpecCompiler::new(
            self.settings(stage, pass),
            Arc::new(self.inputs.catalog.clone()),
            root_metadata(config, stage, pass, self.date),
            sink,
        )?;
        Rulebook::new(&config.project, &self.inputs.content, resolver)
            .with_policy(config.undefined_sub_kind)
            .compile(&mut root)
            .with_context(|| format!("Compiling {} {}", stage, pass.label()))?;
        let rules = root
            .finish()
            .with_context(|| format!("Closing {} {}", stage, pass.label()))?;
        Ok(rules)
    }

    /// Compile and write everything for one stage and pass
    pub fn run_bundle(&self, stage: RibaStage, pass: GenerationPass) -> Result<BundleReport> {
        let span = info_span!("stage", stage = %stage, pass = pass.label());
        let _enter = span.enter();
        let config = self.config();

        self.layout.clean(stage)?;
        let sink = FileSink::new(self.layout.clone());
        let written = sink.written();
        let rules = self.compile(stage, pass, &self.resolver(), Box::new(sink))?;

        let total: usize = rules.groups.iter().map(|g| g.len()).sum();
        let groups = rules.groups.len();
        if config.output.one_file_per_scope {
            if groups > 1 {
                info!(
                    "Created group IDS files in {} with {} specifications in {} groups",
                    self.layout.group_dir(stage).display(),
                    total,
                    groups
                );
            } else {
                warn!("Only a single spec group found. Producing single ids file only");
                self.layout.discard_groups(stage)?;
            }
        }

        let mut bundle = RuleBundle::new(
            format!(
                "{} DfE EIR model checks for {} at {}",
                pass.label(),
                config.project.name,
                stage
            ),
            ProjectInfo {
                name: config.project.name.clone(),
                description: config.project.description.clone(),
            },
        );
        bundle.stages = vec![stage.description().to_string()];
        bundle.groups = rules.groups;
        bundle.flatten(rules.root);

        let path = self.layout.bundle_path(&bundle_file_name(config, stage, pass));
        if let Some(root) = bundle.groups.first() {
            ids_xml::write_file(&path, root)?;
        }
        info!(
            "Created single IDS file {} with {} specifications",
            path.display(),
            total
        );

        let fingerprint = json::fingerprint(&bundle)?;
        let json = if config.output.writes(OutputFormat::Json) {
            let json_path = path.with_extension("json");
            let document = BundleDocument::new(bundle, stage, pass.label())?;
            json::write_file(&json_path, &document)?;
            debug!("Wrote {}", json_path.display());
            Some(json_path)
        } else {
            None
        };

        let invalid_files = if config.output.validate {
            let mut files = ids_files(&self.layout.stage_dir(stage))?;
            if let Ok(written) = written.lock() {
                for file in written.iter() {
                    if !files.contains(file) {
                        files.push(file.clone());
                    }
                }
            }
            files.push(path.clone());
            self.validate(&files, &path, total)?
        } else {
            0
        };

        Ok(BundleReport {
            stage,
            pass,
            path,
            json,
            specifications: total,
            groups,
            fingerprint,
            invalid_files,
        })
    }

    /// Read every file back; counts the files with problems
    fn validate(&self, files: &[PathBuf], bundle: &Path, expected: usize) -> Result<usize> {
        let mut errors = 0;
        for file in files {
            if !file.exists() {
                continue;
            }
            let summary = ids_xml::read_file(file)?;
            let mut problems = summary.problems();
            if file == bundle && summary.len() != expected {
                problems.push(format!(
                    "holds {} specifications, expected {}",
                    summary.len(),
                    expected
                ));
            }
            if !problems.is_empty() {
                errors += 1;
                for problem in problems {
                    warn!("{}: {}", file.display(), problem);
                }
            }
        }
        if errors > 0 {
            warn!("Found {} files with warnings", errors);
        } else {
            debug!("Validated {} files", files.len());
        }
        Ok(errors)
    }

    /// Every rule of `stage`, indexed for fixture tagging
    fn fixture_rules(&self, stage: RibaStage, resolver: &NamingResolver) -> Result<CompiledRules> {
        let settings = self.settings(stage, GenerationPass::ALL);
        let mut root = SpecCompiler::new(
            settings.with_partitioning(false, false).with_one_file_per_specification(false),
            Arc::new(self.inputs.catalog.clone()),
            root_metadata(self.config(), stage, GenerationPass::ALL, self.date),
            Box::new(NullSink),
        )?;
        Rulebook::new(&self.config().project, &self.inputs.content, resolver)
            .with_policy(self.config().undefined_sub_kind)
            .compile(&mut root)?;
        let rules = root.finish()?;
        resolver.counters().reset();
        Ok(rules)
    }

    pub fn build_fixture(
        &self,
        stage: RibaStage,
        build: fn(&FixtureContext<'_>) -> Result<FixtureModel>,
    ) -> Result<FixtureModel> {
        let resolver = self.resolver();
        let rules = self.fixture_rules(stage, &resolver)?;
        let ctx = FixtureContext {
            config: self.config(),
            content: &self.inputs.content,
            catalog: &self.inputs.catalog,
            resolver: &resolver,
            index: &rules.index,
        };
        build(&ctx)
    }

    pub fn run_fixtures(&self) -> Result<Vec<FixtureReport>> {
        let scripts: [(RibaStage, fn(&FixtureContext<'_>) -> Result<FixtureModel>); 2] = [
            (fixtures::spatial::STAGE, fixtures::spatial::build),
            (fixtures::metadata::STAGE, fixtures::metadata::build),
        ];
        let dir = self.layout.base().join(FIXTURE_DIR);
        let mut reports = Vec::new();
        for (stage, build) in scripts {
            let span = info_span!("fixture", stage = %stage);
            let _enter = span.enter();
            let model = self.build_fixture(stage, build)?;
            let path = model.save(&dir)?;
            let failing = model.samples.non_conforming().count();
            info!(
                "Created fixture {} with {} samples ({} failing)",
                path.display(),
                model.samples.len(),
                failing
            );
            reports.push(FixtureReport {
                name: model.name.clone(),
                stage,
                path,
                samples: model.samples.len(),
                failing,
                corruptions: model.corruptions.len(),
            });
        }
        Ok(reports)
    }

    pub fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let config = self.config();
        let stages = options.stages.clone().unwrap_or_else(|| config.stages.clone());
        let passes = match &options.passes {
            Some(passes) => passes.clone(),
            None => config.generation_passes()?,
        };

        let mut report = RunReport::default();
        if !options.skip_rules {
            for pass in &passes {
                for stage in &stages {
                    report.bundles.push(self.run_bundle(*stage, *pass)?);
                }
            }
        }
        if config.fixtures.enabled && !options.skip_fixtures {
            report.fixtures = self.run_fixtures()?;
        }
        Ok(report)
    }
}
