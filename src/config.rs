//! Configuration loader
//!
//! Loads the generator settings and the static tables (schema catalog,
//! naming codes, sub-kind names, DfE content) from YAML. Every file is also
//! embedded in the binary, so a missing config directory or file falls back
//! to the shipped defaults.
//!
//! Directory resolution order:
//!
//! 1. `IDS_CONFIG_DIR`
//! 2. `./config`
//! 3. `<crate>/config`
//! 4. embedded defaults

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use ids_core::naming::{SubKindNames, TypeCodeTable};
use ids_core::{DialectSet, GenerationPass, RibaStage, SchemaCatalog, SchemaDialect, UndefinedSubKindPolicy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::rulebook::content::{AdsTable, DomainContent, FloorTable, UniclassTable, ZoneTable};

pub const CONFIG_DIR_ENV: &str = "IDS_CONFIG_DIR";

const GENERATOR_FILE: &str = "generator.yaml";
const CATALOG_FILE: &str = "schema/ifc_catalog.yaml";
const TYPE_CODES_FILE: &str = "naming/type_codes.yaml";
const SUB_KINDS_FILE: &str = "naming/sub_kinds.yaml";
const FLOORS_FILE: &str = "content/floors.yaml";
const ZONES_FILE: &str = "content/zones.yaml";
const ADS_FILE: &str = "content/ads_codes.yaml";
const UNICLASS_FILE: &str = "content/uniclass_sl.yaml";

const EMBEDDED: &[(&str, &str)] = &[
    (GENERATOR_FILE, include_str!("../config/generator.yaml")),
    (CATALOG_FILE, include_str!("../config/schema/ifc_catalog.yaml")),
    (TYPE_CODES_FILE, include_str!("../config/naming/type_codes.yaml")),
    (SUB_KINDS_FILE, include_str!("../config/naming/sub_kinds.yaml")),
    (FLOORS_FILE, include_str!("../config/content/floors.yaml")),
    (ZONES_FILE, include_str!("../config/content/zones.yaml")),
    (ADS_FILE, include_str!("../config/content/ads_codes.yaml")),
    (UNICLASS_FILE, include_str!("../config/content/uniclass_sl.yaml")),
];

/// Project values written into the rules, usually substitution tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub name: String,
    pub description: String,
    pub site_name: String,
    pub site_description: String,
    pub building_name: String,
    pub building_description: String,
    /// Uniclass En code of the building
    pub building_category: String,
    pub block_construction_type: String,
    pub uprn: String,
    #[serde(default = "default_storeys")]
    pub number_of_storeys: u32,
}

fn default_storeys() -> u32 {
    3
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            name: "{{IfcProjectName}}".into(),
            description: "{{IfcProjectDescription}}".into(),
            site_name: "{{IfcSiteName}}".into(),
            site_description: "{{IfcSiteDescription}}".into(),
            building_name: "{{IfcBuildingName}}".into(),
            building_description: "{{IfcBuildingDescription}}".into(),
            building_category: "{{IfcBuildingClassificationReference}}".into(),
            block_construction_type: "{{BuildingBlockConstructionType}}".into(),
            uprn: "{{IfcBuildingUPRN}}".into(),
            number_of_storeys: default_storeys(),
        }
    }
}

/// Document naming and group metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationSettings {
    pub base_path: String,
    pub document_prefix: String,
    pub version: u32,
    pub status: String,
    pub revision: String,
    pub author: String,
    pub copyright: String,
    pub purpose: String,
    /// Fixed issue date, `YYYY-MM-DD`; today when absent
    #[serde(default)]
    pub date: Option<chrono::NaiveDate>,
}

impl Default for PublicationSettings {
    fn default() -> Self {
        Self {
            base_path: "DFE-ER".into(),
            document_prefix: "ER-DFE-XX-XX-L-X".into(),
            version: 45,
            status: "S2".into(),
            revision: "P01".into(),
            author: "DfE.BIM@Education.gov.uk".into(),
            copyright: "CC BY 4.0".into(),
            purpose: "Information Model Assurance".into(),
            date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Ids,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub one_file_per_specification: bool,
    #[serde(default)]
    pub one_file_per_scope: bool,
    #[serde(default)]
    pub group_by_applicability: bool,
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    /// Read every written IDS file back and check it
    #[serde(default)]
    pub validate: bool,
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Ids]
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            one_file_per_specification: false,
            one_file_per_scope: false,
            group_by_applicability: false,
            formats: default_formats(),
            validate: false,
        }
    }
}

impl OutputSettings {
    pub fn writes(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSettings {
    pub target: SchemaDialect,
    #[serde(default = "default_supported")]
    pub supported: Vec<SchemaDialect>,
    #[serde(default = "default_true")]
    pub use_inferred_occurrence_types: bool,
}

fn default_supported() -> Vec<SchemaDialect> {
    vec![SchemaDialect::Ifc2x3]
}

fn default_true() -> bool {
    true
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            target: SchemaDialect::Ifc2x3,
            supported: default_supported(),
            use_inferred_occurrence_types: true,
        }
    }
}

impl SchemaSettings {
    pub fn supported_set(&self) -> DialectSet {
        DialectSet::from_dialects(&self.supported)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub pass_container: String,
    pub fail_container: String,
    /// Realistic project values used in place of the rule tokens
    #[serde(default)]
    pub sample_project: Option<ProjectSettings>,
}

impl Default for FixtureSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            pass_container: "00-01G".into(),
            fail_container: "01-01B".into(),
            sample_project: None,
        }
    }
}

/// Top-level `generator.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub project: ProjectSettings,
    #[serde(default)]
    pub publication: PublicationSettings,
    #[serde(default = "default_stages")]
    pub stages: Vec<RibaStage>,
    /// Pass labels: Core, Complex (or Naming), All
    #[serde(default = "default_passes")]
    pub passes: Vec<String>,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub schema: SchemaSettings,
    #[serde(default)]
    pub undefined_sub_kind: UndefinedSubKindPolicy,
    #[serde(default)]
    pub fixtures: FixtureSettings,
}

fn default_stages() -> Vec<RibaStage> {
    vec![RibaStage::Stage3, RibaStage::Stage4, RibaStage::Stage5]
}

fn default_passes() -> Vec<String> {
    vec!["Core".into(), "Complex".into(), "All".into()]
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            project: ProjectSettings::default(),
            publication: PublicationSettings::default(),
            stages: default_stages(),
            passes: default_passes(),
            output: OutputSettings::default(),
            schema: SchemaSettings::default(),
            undefined_sub_kind: UndefinedSubKindPolicy::default(),
            fixtures: FixtureSettings::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn generation_passes(&self) -> Result<Vec<GenerationPass>> {
        self.passes
            .iter()
            .map(|label| {
                GenerationPass::parse_label(label).ok_or_else(|| anyhow!("Unknown generation pass '{}'", label))
            })
            .collect()
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if let Some(stage) = self.stages.iter().find(|s| !s.is_valid_target()) {
            bail!("{} cannot be a target stage", stage);
        }
        self.generation_passes()?;
        if self.output.formats.is_empty() {
            bail!("output.formats must name at least one format");
        }
        if !self.schema.supported.contains(&self.schema.target) {
            bail!(
                "schema.supported must include the target dialect {}",
                self.schema.target
            );
        }
        if self.fixtures.pass_container == self.fixtures.fail_container {
            bail!("fixture pass and fail containers must differ");
        }
        Ok(())
    }
}

/// Everything one generator run reads
#[derive(Debug)]
pub struct GeneratorInputs {
    pub config: GeneratorConfig,
    pub catalog: SchemaCatalog,
    pub type_codes: TypeCodeTable,
    pub sub_kinds: SubKindNames,
    pub content: DomainContent,
}

pub struct ConfigLoader {
    config_dir: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: Some(config_dir.into()),
        }
    }

    /// Loader that only uses the embedded tables
    pub fn embedded() -> Self {
        Self { config_dir: None }
    }

    /// Resolve the config directory from the environment
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Self::new(dir);
        }
        let local = PathBuf::from("config");
        if local.is_dir() {
            return Self::new(local);
        }
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        if manifest.is_dir() {
            return Self::new(manifest);
        }
        Self::embedded()
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    fn embedded_text(relative: &str) -> Result<&'static str> {
        EMBEDDED
            .iter()
            .find(|(name, _)| *name == relative)
            .map(|(_, text)| *text)
            .ok_or_else(|| anyhow!("No embedded default for {}", relative))
    }

    fn read(&self, relative: &str) -> Result<Cow<'static, str>> {
        if let Some(dir) = &self.config_dir {
            let path = dir.join(relative);
            if path.is_file() {
                info!("Loading {} from {}", relative, path.display());
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                return Ok(Cow::Owned(content));
            }
            debug!("{} not found, using embedded default", path.display());
        }
        Ok(Cow::Borrowed(Self::embedded_text(relative)?))
    }

    fn parse<T: serde::de::DeserializeOwned>(&self, relative: &str) -> Result<T> {
        let content = self.read(relative)?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", relative))
    }

    pub fn load_generator(&self) -> Result<GeneratorConfig> {
        let config: GeneratorConfig = self.parse(GENERATOR_FILE)?;
        config
            .validate()
            .with_context(|| format!("Invalid {}", GENERATOR_FILE))?;
        Ok(config)
    }

    pub fn load_catalog(&self) -> Result<SchemaCatalog> {
        let content = self.read(CATALOG_FILE)?;
        let catalog = SchemaCatalog::from_yaml(&content)
            .with_context(|| format!("Failed to load schema catalog {}", CATALOG_FILE))?;
        info!("Loaded {} entity types", catalog.len());
        Ok(catalog)
    }

    pub fn load_type_codes(&self) -> Result<TypeCodeTable> {
        let content = self.read(TYPE_CODES_FILE)?;
        let codes = TypeCodeTable::from_yaml(&content)
            .with_context(|| format!("Failed to load type codes {}", TYPE_CODES_FILE))?;
        debug!("Loaded {} type codes", codes.len());
        Ok(codes)
    }

    pub fn load_sub_kinds(&self) -> Result<SubKindNames> {
        let content = self.read(SUB_KINDS_FILE)?;
        SubKindNames::from_yaml(&content)
            .with_context(|| format!("Failed to load sub-kind names {}", SUB_KINDS_FILE))
    }

    pub fn load_content(&self) -> Result<DomainContent> {
        let floors: FloorTable = self.parse(FLOORS_FILE)?;
        let zones: ZoneTable = self.parse(ZONES_FILE)?;
        let ads: AdsTable = self.parse(ADS_FILE)?;
        let uniclass: UniclassTable = self.parse(UNICLASS_FILE)?;
        let content = DomainContent {
            floors: floors.floors,
            zones: zones.zones,
            ads_codes: ads.ads_codes,
            uniclass_sl: uniclass.uniclass_sl,
        };
        self.validate_content(&content)?;
        info!(
            "Loaded {} floors, {} zones, {} ADS codes, {} Uniclass spaces",
            content.floors.len(),
            content.zones.len(),
            content.ads_codes.len(),
            content.uniclass_sl.len()
        );
        Ok(content)
    }

    fn validate_content(&self, content: &DomainContent) -> Result<()> {
        if content.named_floors().next().is_none() {
            bail!("{} defines no named floors", FLOORS_FILE);
        }
        if content.zones.is_empty() {
            bail!("{} defines no zones", ZONES_FILE);
        }
        let known = content.uniclass_codes();
        if let Some(ads) = content
            .ads_codes
            .iter()
            .find(|a| !known.contains(&a.uniclass.as_str()))
        {
            bail!(
                "ADS code {} maps to {} which is missing from {}",
                ads.code,
                ads.uniclass,
                UNICLASS_FILE
            );
        }
        Ok(())
    }

    /// Load settings and every table
    pub fn load(&self) -> Result<GeneratorInputs> {
        match &self.config_dir {
            Some(dir) => info!("Using configuration directory {}", dir.display()),
            None => info!("Using embedded configuration"),
        }
        Ok(GeneratorInputs {
            config: self.load_generator()?,
            catalog: self.load_catalog()?,
            type_codes: self.load_type_codes()?,
            sub_kinds: self.load_sub_kinds()?,
            content: self.load_content()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_embedded_configuration_loads() {
        let inputs = ConfigLoader::embedded().load().unwrap();
        assert_eq!(inputs.config.publication.version, 45);
        assert_eq!(
            inputs.config.stages,
            vec![RibaStage::Stage3, RibaStage::Stage4, RibaStage::Stage5]
        );
        assert_eq!(
            inputs.config.generation_passes().unwrap(),
            vec![GenerationPass::CORE, GenerationPass::COMPLEX, GenerationPass::ALL]
        );
        assert!(inputs.catalog.lookup_any("IfcDoor").is_some());
        assert!(inputs.type_codes.get("Door").is_some());
        assert_eq!(inputs.sub_kinds.get("NOTDEFINED"), Some("NotDefined"));
        assert!(inputs.content.floor("RF").is_some());
    }

    #[test]
    fn test_directory_files_override_embedded_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(GENERATOR_FILE),
            "project:\n  name: Foxmere\n  description: d\n  site_name: s\n  site_description: sd\n  building_name: b\n  building_description: bd\n  building_category: En_25_10_40\n  block_construction_type: Masonry\n  uprn: '1'\nstages: [Stage4]\npasses: [Naming]\n",
        )
        .unwrap();

        let loader = ConfigLoader::new(dir.path());
        let config = loader.load_generator().unwrap();
        assert_eq!(config.project.name, "Foxmere");
        assert_eq!(config.project.number_of_storeys, 3);
        assert_eq!(config.stages, vec![RibaStage::Stage4]);
        assert_eq!(config.generation_passes().unwrap(), vec![GenerationPass::COMPLEX]);
        // tables not present in the directory come from the binary
        assert!(loader.load_content().unwrap().zones.len() > 1);
    }

    #[test]
    fn test_stage_seven_is_rejected() {
        let config = GeneratorConfig {
            stages: vec![RibaStage::Stage7],
            ..GeneratorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_pass_is_rejected() {
        let config = GeneratorConfig {
            passes: vec!["Everything".into()],
            ..GeneratorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Everything"));
    }
}
