//! Sample models that exercise the compiled rules
//!
//! Each script builds a [`FixtureModel`]: a flat list of sample instances
//! (project, site, building, storeys, spaces, zones, products) carrying the
//! identifiers of the rules they pass or fail, plus a log of every scripted
//! corruption. Tags are looked up in the [`RuleIndex`] of a compile at the
//! fixture's own stage, never rebuilt from numbering conventions.
//!
//! | Fixture  | Stage  | Script                 |
//! |----------|--------|------------------------|
//! | Spatial  | Stage3 | [`spatial::build`]     |
//! | Metadata | Stage5 | [`metadata::build`]    |

mod cobie;
pub mod metadata;
pub mod spatial;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ids_core::fixtures::{CorruptionRecord, CorruptionScript, Field, Mutation};
use ids_core::{
    FixtureSet, NamingResolver, RequirementKind, RibaStage, RuleIndex, SampleInstance, SchemaCatalog, SchemaDialect,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::{GeneratorConfig, ProjectSettings};
use crate::rulebook::content::DomainContent;

/// Namespace for fixture GlobalIds
const FIXTURE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_4c2e_9b1a_4f7e_8d2c_5a0b_3e9f_1c44);

/// One synthesized sample model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureModel {
    pub name: String,
    pub stage: RibaStage,
    pub schema: SchemaDialect,
    pub project: String,
    pub samples: FixtureSet,
    #[serde(default)]
    pub corruptions: Vec<CorruptionRecord>,
}

impl FixtureModel {
    pub fn new(name: impl Into<String>, stage: RibaStage, schema: SchemaDialect, project: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage,
            schema,
            project: project.into(),
            samples: FixtureSet::default(),
            corruptions: Vec::new(),
        }
    }

    pub fn push(&mut self, instance: SampleInstance) -> usize {
        self.samples.push(instance)
    }

    pub fn extend(&mut self, set: FixtureSet) -> Vec<usize> {
        set.instances.into_iter().map(|i| self.samples.push(i)).collect()
    }

    pub fn get(&self, index: usize) -> Option<&SampleInstance> {
        self.samples.instances.get(index)
    }

    pub fn find(&self, entity: &str, name: &str) -> Option<&SampleInstance> {
        self.samples
            .instances
            .iter()
            .find(|i| i.entity.eq_ignore_ascii_case(entity) && i.name() == name)
    }

    /// Indices of instances of `entity` placed in `container`
    pub fn contained_in(&self, entity: &str, container: &str) -> Vec<usize> {
        self.samples
            .instances
            .iter()
            .enumerate()
            .filter(|(_, i)| i.entity.eq_ignore_ascii_case(entity) && i.container == container)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Run a corruption script and keep its log
    pub fn corrupt(&mut self, script: &CorruptionScript, targets: &[usize]) -> Result<()> {
        let records = script
            .apply(&mut self.samples.instances, targets)
            .with_context(|| format!("Corrupting {} fixture", self.name))?;
        self.corruptions.extend(records);
        Ok(())
    }

    /// Give every instance a GlobalId derived from the model name and its position
    pub fn stamp_global_ids(&mut self) {
        let namespace = Uuid::new_v5(&FIXTURE_NAMESPACE, self.name.as_bytes());
        let field = Field::attribute("GlobalId");
        for (idx, instance) in self.samples.instances.iter_mut().enumerate() {
            if instance.values.contains(&field) {
                continue;
            }
            let id = Uuid::new_v5(&namespace, format!("{idx}:{}", instance.entity).as_bytes());
            instance.values.set(&field, id.to_string());
        }
    }

    /// Rule identifiers referenced by failing samples
    pub fn failure_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self
            .samples
            .non_conforming()
            .flat_map(|i| i.tags.iter().map(String::as_str))
            .collect();
        tags.sort_unstable();
        tags.dedup();
        tags
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.name)
    }

    /// Write as pretty JSON into `dir`
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("Creating {}", dir.display()))?;
        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).with_context(|| format!("Writing {}", path.display()))?;
        debug!("Wrote fixture {} ({} samples)", path.display(), self.samples.len());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Parsing fixture {}", path.display()))
    }
}

/// What every fixture script reads
pub struct FixtureContext<'a> {
    pub config: &'a GeneratorConfig,
    pub content: &'a DomainContent,
    pub catalog: &'a SchemaCatalog,
    pub resolver: &'a NamingResolver,
    pub index: &'a RuleIndex,
}

impl<'a> FixtureContext<'a> {
    /// Sample project values, else the configured rule tokens
    pub fn project(&self) -> &'a ProjectSettings {
        self.config
            .fixtures
            .sample_project
            .as_ref()
            .unwrap_or(&self.config.project)
    }

    pub fn dialect(&self) -> SchemaDialect {
        self.config.schema.target
    }

    /// Identifier of the rule checking `subject` on `entity`
    pub fn tag(&self, entity: &str, sub_kind: Option<&str>, kind: RequirementKind, subject: &str) -> Option<String> {
        let found = self.index.lookup(entity, sub_kind, kind, subject);
        if found.is_none() {
            trace!("no {:?} rule on {} {} at this stage", kind, entity, subject);
        }
        found.map(str::to_string)
    }

    /// First of `kinds` with a rule on `subject`
    pub fn tag_any(&self, entity: &str, kinds: &[RequirementKind], subject: &str) -> Option<String> {
        kinds.iter().find_map(|kind| self.tag(entity, None, *kind, subject))
    }

    /// Most recently compiled rule on `subject`, the strictest of a stage ladder
    pub fn strict_tag(&self, entity: &str, kind: RequirementKind, subject: &str) -> Option<String> {
        self.index.lookup_all(entity, None, kind, subject).last().cloned()
    }

    /// Whether `name` is `ancestor` or one of its subtypes
    pub fn is_a(&self, name: &str, ancestors: &[&str]) -> bool {
        let mut current = self.catalog.lookup_any(name);
        while let Some(descriptor) = current {
            if ancestors.iter().any(|a| a.eq_ignore_ascii_case(&descriptor.name)) {
                return true;
            }
            current = descriptor
                .parent
                .as_deref()
                .and_then(|parent| self.catalog.lookup_any(parent));
        }
        false
    }
}

/// Apply several mutations to a single instance
pub(crate) fn break_instance(
    model: &mut FixtureModel,
    index: usize,
    steps: Vec<(&str, Mutation, Option<String>)>,
) -> Result<()> {
    for (description, mutation, tag) in steps {
        let script = CorruptionScript::new().step(description, mutation, tag);
        model.corrupt(&script, &[index])?;
    }
    Ok(())
}
