//! IDS rule generator
//!
//! ```bash
//! # Every configured stage and pass, plus fixtures
//! ids_generate
//!
//! # Core rules for Stage 4 only, into another folder
//! ids_generate --stage 4 --pass core --output out/DFE-ER --no-fixtures
//!
//! # Compare two runs
//! ids_generate --fingerprint
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;
use ids_core::{GenerationPass, RibaStage};
use ids_generator::{ConfigLoader, Pipeline, RunOptions, RunReport};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ids_generate")]
#[command(about = "Compile the DfE EIR rulebook into IDS files and sample fixtures")]
struct Cli {
    /// Folder holding generator.yaml and the static tables
    #[arg(long, env = "IDS_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Output folder, overrides publication.base_path
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Target stage (3 or Stage3); repeat for several
    #[arg(long = "stage", value_parser = parse_stage)]
    stages: Vec<RibaStage>,

    /// Generation pass: core, complex (naming) or all; repeat for several
    #[arg(long = "pass", value_parser = parse_pass)]
    passes: Vec<GenerationPass>,

    /// Skip the fixture models
    #[arg(long, conflicts_with = "fixtures_only")]
    no_fixtures: bool,

    /// Only write the fixture models
    #[arg(long)]
    fixtures_only: bool,

    /// Print the content fingerprint of each bundle
    #[arg(long)]
    fingerprint: bool,
}

fn parse_stage(value: &str) -> Result<RibaStage, String> {
    let normalized = if value.chars().all(|c| c.is_ascii_digit()) {
        format!("Stage{value}")
    } else {
        value.replace(' ', "")
    };
    let stage = RibaStage::from_str(&normalized).map_err(|_| format!("unknown stage '{value}'"))?;
    if !stage.is_valid_target() {
        return Err(format!("{stage} cannot be a target stage"));
    }
    Ok(stage)
}

fn parse_pass(value: &str) -> Result<GenerationPass, String> {
    GenerationPass::parse_label(value).ok_or_else(|| format!("unknown pass '{value}'"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(report) => {
            print_summary(&report, cli.fingerprint);
            if report.invalid_files() > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunReport> {
    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::new(dir),
        None => ConfigLoader::from_env(),
    };
    let inputs = loader.load()?;
    inputs.config.validate()?;
    if cli.fixtures_only && !inputs.config.fixtures.enabled {
        bail!("--fixtures-only given but fixtures are disabled in the configuration");
    }

    let options = RunOptions {
        stages: (!cli.stages.is_empty()).then(|| cli.stages.clone()),
        passes: (!cli.passes.is_empty()).then(|| cli.passes.clone()),
        skip_rules: cli.fixtures_only,
        skip_fixtures: cli.no_fixtures,
    };
    let mut pipeline = Pipeline::new(&inputs);
    if let Some(output) = &cli.output {
        pipeline = pipeline.with_output(output);
    }
    pipeline.run(&options)
}

fn print_summary(report: &RunReport, fingerprints: bool) {
    for bundle in &report.bundles {
        let status = if bundle.invalid_files == 0 {
            "OK".green().bold()
        } else {
            "WARN".yellow().bold()
        };
        println!(
            "{} {} {:<8} {:>5} specs  {}",
            status,
            bundle.stage,
            bundle.pass.label(),
            bundle.specifications,
            bundle.path.display()
        );
        if fingerprints {
            println!("   {}", bundle.fingerprint.dimmed());
        }
    }
    for fixture in &report.fixtures {
        println!(
            "{} {} {:>5} samples ({} failing, {} corruptions)  {}",
            "OK".green().bold(),
            fixture.stage,
            fixture.samples,
            fixture.failing,
            fixture.corruptions,
            fixture.path.display()
        );
    }
}
