//! Scope manager
//!
//! Rules are compiled inside a tree of scopes that mirrors the rulebook's
//! section structure. Each scope numbers the rules created in it, carries the
//! stage/pass window they apply to, and decides which output group they land
//! in.
//!
//! Scopes are opened with [`SpecCompiler::begin_child_scope`], which returns a
//! [`ScopeGuard`] holding the compiler mutably. The guard derefs to the
//! compiler, so nested scopes borrow the guard in turn and can never outlive
//! their parent. Dropping the guard closes the scope on every exit path,
//! including `?` early returns.
//!
//! ```text
//! root                      identifier ""
//!  └ 05  Space              rules 05_01 .. 05_14
//!     └ 05_15               ADS to Uniclass, one named rule per code
//! ```
//!
//! Closing a scope whose group never received a rule discards the group.
//! When partitioning is on, a non-empty group is handed to the
//! [`OutputSink`] as it closes.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::{info, trace, warn};

use crate::consolidate::consolidate;
use crate::error::{GeneratorError, Result};
use crate::facets::{ApplicabilityCardinality, RequirementCardinality};
use crate::model::{GroupMetadata, Specification, SpecificationGroup};
use crate::rule_index::RuleIndex;
use crate::schema::{DialectSet, SchemaCatalog, SchemaDialect, SchemaView};
use crate::stages::{GenerationPass, LifecycleStages, RibaStage};

/// Where a single-specification file belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLocation {
    pub stage: RibaStage,
    /// Slash-separated chain of ancestor identifiers, e.g. `07/07_05`
    pub full_prefix: String,
}

/// Receives output as scopes close, or as rules are created when one file
/// per specification is requested
pub trait OutputSink {
    fn write_specification(
        &mut self,
        location: &SpecLocation,
        metadata: &GroupMetadata,
        spec: &Specification,
    ) -> Result<()>;

    fn write_group(&mut self, stage: RibaStage, group: &SpecificationGroup) -> Result<()>;
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write_specification(&mut self, _: &SpecLocation, _: &GroupMetadata, _: &Specification) -> Result<()> {
        Ok(())
    }

    fn write_group(&mut self, _: RibaStage, _: &SpecificationGroup) -> Result<()> {
        Ok(())
    }
}

/// Compilation-wide options
#[derive(Debug, Clone)]
pub struct CompilerSettings {
    /// Must be a single stage from Stage1 to Stage6
    pub target_stage: RibaStage,
    pub target_pass: GenerationPass,
    pub one_file_per_specification: bool,
    /// Give every child scope its own group, flushed as it closes
    pub one_file_per_scope: bool,
    /// Merge rules sharing an applicability before a group is flushed
    pub group_by_applicability: bool,
    /// Dialect used when a rule's entity type cannot be resolved
    pub target_dialect: SchemaDialect,
    pub supported_dialects: DialectSet,
    /// Resolve occurrence classes through the hybrid IFC2X3 view
    pub use_inferred_occurrence_types: bool,
}

impl CompilerSettings {
    pub fn new(target_stage: RibaStage, target_pass: GenerationPass) -> Self {
        Self {
            target_stage,
            target_pass,
            one_file_per_specification: false,
            one_file_per_scope: false,
            group_by_applicability: false,
            target_dialect: SchemaDialect::Ifc2x3,
            supported_dialects: DialectSet::IFC2X3,
            use_inferred_occurrence_types: true,
        }
    }

    pub fn with_partitioning(mut self, one_file_per_scope: bool, group_by_applicability: bool) -> Self {
        self.one_file_per_scope = one_file_per_scope;
        self.group_by_applicability = group_by_applicability;
        self
    }

    pub fn with_one_file_per_specification(mut self, enabled: bool) -> Self {
        self.one_file_per_specification = enabled;
        self
    }

    pub fn with_dialects(mut self, target: SchemaDialect, supported: DialectSet) -> Self {
        self.target_dialect = target;
        self.supported_dialects = supported;
        self
    }
}

#[derive(Debug, Clone)]
struct ScopeFrame {
    prefix: String,
    full_prefix: String,
    section: u32,
    section_name: String,
    tag: String,
    stages: LifecycleStages,
    passes: GenerationPass,
    applicability_cardinality: ApplicabilityCardinality,
    requirement_cardinality: RequirementCardinality,
    prefix_spec_name_with_id: bool,
    /// This scope collects its own group rather than its parent's
    owns_group: bool,
    /// Group slot, created on first use when `owns_group`
    group: Option<usize>,
}

impl ScopeFrame {
    fn root() -> Self {
        Self {
            prefix: String::new(),
            full_prefix: String::new(),
            section: 0,
            section_name: String::new(),
            tag: String::new(),
            stages: LifecycleStages::ALL,
            passes: GenerationPass::CORE,
            applicability_cardinality: ApplicabilityCardinality::Optional,
            requirement_cardinality: RequirementCardinality::Expected,
            prefix_spec_name_with_id: true,
            owns_group: true,
            group: None,
        }
    }

    fn id(&self) -> String {
        if self.section_name.is_empty() {
            format!("{:02}", self.section)
        } else {
            self.section_name.clone()
        }
    }

    fn identifier(&self) -> String {
        if self.prefix.is_empty() {
            self.id()
        } else {
            format!("{}_{}", self.prefix, self.id())
        }
    }

    fn child(&self, owns_group: bool) -> Self {
        let identifier = self.identifier();
        let full_prefix = if self.full_prefix.is_empty() {
            identifier.clone()
        } else {
            format!("{}/{}", self.full_prefix, identifier)
        };
        Self {
            prefix: identifier,
            full_prefix,
            section: 0,
            section_name: String::new(),
            owns_group,
            group: None,
            ..self.clone()
        }
    }
}

/// Compiles rules for one target stage and pass
pub struct SpecCompiler {
    settings: CompilerSettings,
    catalog: Arc<SchemaCatalog>,
    template: GroupMetadata,
    frames: Vec<ScopeFrame>,
    groups: BTreeMap<usize, SpecificationGroup>,
    next_group: usize,
    index: RuleIndex,
    sink: Box<dyn OutputSink>,
    deferred_error: Option<String>,
}

impl std::fmt::Debug for SpecCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecCompiler")
            .field("settings", &self.settings)
            .field("depth", &self.frames.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

/// Result of a completed compilation
#[derive(Debug)]
pub struct CompiledRules {
    /// Non-empty groups in creation order
    pub groups: Vec<SpecificationGroup>,
    pub index: RuleIndex,
    /// Header of the root group, reused when flattening
    pub root: GroupMetadata,
}

impl SpecCompiler {
    /// Root scope over `template`, the header every group is cloned from
    pub fn new(
        settings: CompilerSettings,
        catalog: Arc<SchemaCatalog>,
        template: GroupMetadata,
        sink: Box<dyn OutputSink>,
    ) -> Result<Self> {
        if !settings.target_stage.is_valid_target() {
            return Err(GeneratorError::InvalidTargetStage(settings.target_stage));
        }
        let mut groups = BTreeMap::new();
        groups.insert(0, SpecificationGroup::new(template.clone()));
        let mut root = ScopeFrame::root();
        root.group = Some(0);
        Ok(Self {
            settings,
            catalog,
            template,
            frames: vec![root],
            groups,
            next_group: 1,
            index: RuleIndex::default(),
            sink,
            deferred_error: None,
        })
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    pub fn target_stage(&self) -> RibaStage {
        self.settings.target_stage
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    /// View used to resolve rule entity types
    pub fn schema(&self) -> SchemaView<'_> {
        self.catalog.view(self.settings.target_dialect)
    }

    /// View used for occurrence classes, hybrid when inference is on
    pub fn occurrence_schema(&self) -> SchemaView<'_> {
        if self.settings.use_inferred_occurrence_types && self.settings.target_dialect == SchemaDialect::Ifc2x3 {
            self.catalog.hybrid_ifc2x3()
        } else {
            self.schema()
        }
    }

    pub fn index(&self) -> &RuleIndex {
        &self.index
    }

    pub(crate) fn index_mut(&mut self) -> &mut RuleIndex {
        &mut self.index
    }

    fn top(&self) -> &ScopeFrame {
        // the root frame is only removed by `finish`, which consumes self
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut ScopeFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Nesting depth, 1 for the root scope
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn identifier(&self) -> String {
        self.top().identifier()
    }

    pub fn full_prefix(&self) -> &str {
        &self.top().full_prefix
    }

    pub fn tag(&self) -> &str {
        &self.top().tag
    }

    pub fn section(&self) -> u32 {
        self.top().section
    }

    pub fn applicable_stages(&self) -> LifecycleStages {
        self.top().stages
    }

    pub fn applicability_cardinality(&self) -> ApplicabilityCardinality {
        self.top().applicability_cardinality
    }

    pub fn requirement_cardinality(&self) -> RequirementCardinality {
        self.top().requirement_cardinality
    }

    pub fn prefix_spec_name_with_id(&self) -> bool {
        self.top().prefix_spec_name_with_id
    }

    /// Stage window contains the target stage and pass window meets the target pass
    pub fn is_stage_applicable(&self) -> bool {
        let frame = self.top();
        frame.stages.includes(self.settings.target_stage) && frame.passes.intersects(self.settings.target_pass)
    }

    /// Advance the counter and render the identifier. A name set for the
    /// slot is used once.
    pub fn generate_identifier(&mut self) -> String {
        let frame = self.top_mut();
        frame.section += 1;
        let identifier = frame.identifier();
        frame.section_name.clear();
        identifier
    }

    /// Consume a numbering slot for a rule that is not generated
    pub fn skip(&mut self, reason: &str) {
        self.skip_with(reason, false);
    }

    /// As [`skip`](Self::skip); `quiet` demotes the warning to trace
    pub fn skip_with(&mut self, reason: &str, quiet: bool) {
        let identifier = self.generate_identifier();
        let tag = self.top().tag.clone();
        if self.is_stage_applicable() && !quiet {
            warn!("-Skipping {} {}: {}", identifier, tag, reason);
        } else {
            trace!("-Skipping {} {}: {}", identifier, tag, reason);
        }
    }

    /// Skip when the scope does not apply to the target; true when skipped
    pub(crate) fn should_skip_for_stage(&mut self) -> bool {
        if self.is_stage_applicable() {
            return false;
        }
        let reason = format!("Not applicable for {}", self.settings.target_stage);
        self.skip_with(&reason, true);
        true
    }

    /// Open a child scope. The parent's counter advances and its section
    /// name becomes `name` (or is cleared), so the child's prefix reads
    /// `<parent prefix>_<name or number>`. With partitioning on, the child
    /// collects its own group.
    pub fn begin_child_scope(&mut self, name: Option<&str>) -> ScopeGuard<'_> {
        let owns_group = self.settings.one_file_per_scope;
        self.open_child(name, owns_group)
    }

    /// Open a child scope that only numbers rules; they are still collected
    /// in the parent's group
    pub fn begin_numbering_scope(&mut self, name: Option<&str>) -> ScopeGuard<'_> {
        self.open_child(name, false)
    }

    fn open_child(&mut self, name: Option<&str>, owns_group: bool) -> ScopeGuard<'_> {
        let parent = self.top_mut();
        parent.section += 1;
        parent.section_name = name.unwrap_or_default().to_string();
        let child = parent.child(owns_group);
        parent.section_name.clear();
        self.frames.push(child);
        let depth = self.frames.len();
        ScopeGuard {
            compiler: self,
            depth,
        }
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.top_mut().tag = tag.into();
        self
    }

    /// Name the next identifier slot instead of numbering it; later slots
    /// are numbered again
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.top_mut().section_name = name.into();
        self
    }

    pub fn set_section(&mut self, section: u32) -> &mut Self {
        self.top_mut().section = section;
        self
    }

    pub fn set_applicable_stages(&mut self, stages: LifecycleStages) -> &mut Self {
        self.top_mut().stages = stages;
        self
    }

    pub fn set_applicable_passes(&mut self, passes: GenerationPass) -> &mut Self {
        self.top_mut().passes = passes;
        self
    }

    pub fn set_applicability_cardinality(&mut self, cardinality: ApplicabilityCardinality) -> &mut Self {
        self.top_mut().applicability_cardinality = cardinality;
        self
    }

    pub fn reset_applicability_cardinality(&mut self) -> &mut Self {
        self.set_applicability_cardinality(ApplicabilityCardinality::Optional)
    }

    pub fn set_requirement_cardinality(&mut self, cardinality: RequirementCardinality) -> &mut Self {
        self.top_mut().requirement_cardinality = cardinality;
        self
    }

    pub fn reset_requirement_cardinality(&mut self) -> &mut Self {
        self.set_requirement_cardinality(RequirementCardinality::Expected)
    }

    pub fn set_prefix_spec_name_with_id(&mut self, enabled: bool) -> &mut Self {
        self.top_mut().prefix_spec_name_with_id = enabled;
        self
    }

    /// Fail with any error recorded while a scope was closing
    pub(crate) fn check_deferred(&self) -> Result<()> {
        match &self.deferred_error {
            Some(message) => Err(GeneratorError::Sink(message.clone())),
            None => Ok(()),
        }
    }

    fn record_deferred(&mut self, err: GeneratorError) {
        let message = match err {
            GeneratorError::Sink(message) => message,
            other => other.to_string(),
        };
        warn!("scope close failed, aborting pass: {}", message);
        self.deferred_error.get_or_insert(message);
    }

    /// Frame index of the scope whose group collects rules for the top scope
    fn group_owner(&self) -> usize {
        self.frames
            .iter()
            .rposition(|f| f.owns_group)
            .unwrap_or(0)
    }

    fn active_group_slot(&mut self) -> usize {
        let owner = self.group_owner();
        if let Some(slot) = self.frames[owner].group {
            return slot;
        }
        let frame = &self.frames[owner];
        let name = format!(
            "{}_{} {} - {}",
            self.settings.target_stage.number(),
            frame.prefix,
            frame.tag,
            self.template.name
        );
        let slot = self.next_group;
        self.next_group += 1;
        self.groups
            .insert(slot, SpecificationGroup::new(self.template.renamed(name)));
        self.frames[owner].group = Some(slot);
        slot
    }

    /// Append to the active group, writing a single-spec file when enabled
    pub(crate) fn append(&mut self, spec: Specification) -> Result<()> {
        if self.settings.one_file_per_specification {
            let location = SpecLocation {
                stage: self.settings.target_stage,
                full_prefix: self.top().full_prefix.clone(),
            };
            let metadata = self
                .template
                .renamed(format!("Single IDS File: {} at {}", spec.name, self.settings.target_stage));
            self.sink.write_specification(&location, &metadata, &spec)?;
        }
        let slot = self.active_group_slot();
        if let Some(group) = self.groups.get_mut(&slot) {
            group.push(spec);
        }
        Ok(())
    }

    /// Specifications collected so far in the top scope's group
    pub fn active_group_len(&self) -> usize {
        let owner = self.group_owner();
        self.frames[owner]
            .group
            .and_then(|slot| self.groups.get(&slot))
            .map_or(0, SpecificationGroup::len)
    }

    fn close_top(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        if let Err(err) = self.close_frame(&frame) {
            self.record_deferred(err);
        }
    }

    fn close_frame(&mut self, frame: &ScopeFrame) -> Result<()> {
        if !frame.owns_group {
            return Ok(());
        }
        let label = if frame.full_prefix.is_empty() {
            "Root"
        } else {
            frame.full_prefix.as_str()
        };
        let Some(slot) = frame.group else {
            trace!("Deleting empty group: {} {}", label, frame.tag);
            return Ok(());
        };
        let Some(group) = self.groups.get_mut(&slot) else {
            return Ok(());
        };
        if group.is_empty() {
            trace!("Deleting empty group: {} {}", label, frame.tag);
            self.groups.remove(&slot);
            return Ok(());
        }
        info!("{} {} contains {} specs", label, frame.tag, group.len());
        if self.settings.group_by_applicability {
            consolidate(group);
        }
        if self.settings.one_file_per_scope {
            self.sink.write_group(self.settings.target_stage, group)?;
        }
        Ok(())
    }

    /// Close the root scope and hand back the compiled groups
    pub fn finish(mut self) -> Result<CompiledRules> {
        while self.frames.len() > 1 {
            self.close_top();
        }
        self.close_top();
        self.check_deferred()?;
        Ok(CompiledRules {
            groups: std::mem::take(&mut self.groups).into_values().collect(),
            index: std::mem::take(&mut self.index),
            root: self.template.clone(),
        })
    }
}

/// An open child scope; closes when dropped
pub struct ScopeGuard<'c> {
    compiler: &'c mut SpecCompiler,
    depth: usize,
}

impl Deref for ScopeGuard<'_> {
    type Target = SpecCompiler;

    fn deref(&self) -> &SpecCompiler {
        self.compiler
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut SpecCompiler {
        self.compiler
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        debug_assert_eq!(self.compiler.depth(), self.depth, "scope closed out of order");
        self.compiler.close_top();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::{Facet, FacetGroup};
    use crate::schema::catalog::tests::test_catalog;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Mutex;

    fn compiler(settings: CompilerSettings) -> SpecCompiler {
        SpecCompiler::new(
            settings,
            Arc::new(test_catalog()),
            GroupMetadata::new("Bundle"),
            Box::new(NullSink),
        )
        .unwrap()
    }

    fn dummy_spec(identifier: String) -> Specification {
        Specification {
            name: identifier.clone(),
            identifier,
            description: String::new(),
            instructions: None,
            applicability: FacetGroup::new("Door", "").with_facet(Facet::entity("IFCDOOR")),
            applicability_cardinality: ApplicabilityCardinality::Optional,
            requirement: FacetGroup::new("Name", "").with_facet(Facet::attribute("Name", None)),
            dialects: vec![SchemaDialect::Ifc2x3],
        }
    }

    #[test]
    fn test_identifiers_follow_scope_chain() {
        let mut root = compiler(CompilerSettings::new(RibaStage::Stage4, GenerationPass::CORE));
        {
            let mut project = root.begin_child_scope(None);
            assert_eq!(project.generate_identifier(), "01_01");
            assert_eq!(project.generate_identifier(), "01_02");
        }
        let mut types = root.begin_child_scope(None);
        types.generate_identifier();
        {
            let mut naming = types.begin_child_scope(None);
            assert_eq!(naming.full_prefix(), "02/02_02");
            {
                let mut pdt = naming.begin_child_scope(Some("BeamType"));
                assert_eq!(pdt.full_prefix(), "02/02_02/02_02_BeamType");
                pdt.set_name("JOIST");
                assert_eq!(pdt.generate_identifier(), "02_02_BeamType_JOIST");
            }
            naming.set_name("DoorStyle");
            assert_eq!(naming.generate_identifier(), "02_02_DoorStyle");
        }
        assert_eq!(types.generate_identifier(), "02_03");
    }

    #[test]
    fn test_invalid_target_stage() {
        let err = SpecCompiler::new(
            CompilerSettings::new(RibaStage::Stage7, GenerationPass::CORE),
            Arc::new(test_catalog()),
            GroupMetadata::default(),
            Box::new(NullSink),
        )
        .unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidTargetStage(RibaStage::Stage7)));
    }

    #[test]
    fn test_policy_is_inherited_not_shared() {
        let mut root = compiler(CompilerSettings::new(RibaStage::Stage3, GenerationPass::CORE));
        root.set_applicable_stages(LifecycleStages::STAGE4_PLUS);
        {
            let mut child = root.begin_child_scope(None);
            assert!(!child.is_stage_applicable());
            child.set_applicable_stages(LifecycleStages::ALL);
            assert!(child.is_stage_applicable());
            {
                let mut naming = child.begin_child_scope(None);
                naming.set_applicable_passes(GenerationPass::COMPLEX);
                assert!(!naming.is_stage_applicable());
            }
            assert!(child.is_stage_applicable());
        }
        assert!(!root.is_stage_applicable());
    }

    #[test]
    fn test_empty_partitioned_groups_are_discarded() {
        let settings =
            CompilerSettings::new(RibaStage::Stage4, GenerationPass::CORE).with_partitioning(true, false);
        let mut root = compiler(settings);
        {
            let mut site = root.begin_child_scope(None);
            site.add_tag("Site");
            let id = site.generate_identifier();
            site.append(dummy_spec(id)).unwrap();
        }
        {
            let mut empty = root.begin_child_scope(None);
            empty.add_tag("Empty");
        }
        let compiled = root.finish().unwrap();
        assert_eq!(compiled.groups.len(), 1);
        assert_eq!(compiled.groups[0].name(), "4_01 Site - Bundle");
    }

    #[test]
    fn test_grouping_without_partitioning_merges_bundle() {
        let settings =
            CompilerSettings::new(RibaStage::Stage4, GenerationPass::CORE).with_partitioning(false, true);
        let mut root = compiler(settings);
        {
            let mut doors = root.begin_child_scope(None);
            for _ in 0..2 {
                let id = doors.generate_identifier();
                doors.append(dummy_spec(id)).unwrap();
            }
        }
        let compiled = root.finish().unwrap();
        assert_eq!(compiled.groups.len(), 1);
        let ids: Vec<&str> = compiled.groups[0]
            .specifications
            .iter()
            .map(|s| s.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["01_01,01_02"]);
    }

    #[test]
    fn test_numbering_scope_shares_parent_group() {
        let settings =
            CompilerSettings::new(RibaStage::Stage4, GenerationPass::CORE).with_partitioning(true, false);
        let mut root = compiler(settings);
        {
            let mut naming = root.begin_child_scope(None);
            naming.add_tag("Naming");
            for name in ["A", "B"] {
                let mut pdt = naming.begin_numbering_scope(Some("BeamType"));
                pdt.set_name(name);
                let id = pdt.generate_identifier();
                pdt.append(dummy_spec(id)).unwrap();
            }
            assert_eq!(naming.active_group_len(), 2);
        }
        let compiled = root.finish().unwrap();
        assert_eq!(compiled.groups.len(), 1);
        assert_eq!(compiled.groups[0].len(), 2);
    }

    #[derive(Clone, Default)]
    struct FailingSink {
        calls: Arc<Mutex<usize>>,
    }

    impl OutputSink for FailingSink {
        fn write_specification(&mut self, _: &SpecLocation, _: &GroupMetadata, _: &Specification) -> Result<()> {
            Ok(())
        }

        fn write_group(&mut self, _: RibaStage, _: &SpecificationGroup) -> Result<()> {
            *self.calls.lock().unwrap() += 1;
            Err(GeneratorError::Sink("disk full".to_string()))
        }
    }

    #[test]
    fn test_close_failure_is_deferred_and_surfaced() {
        let sink = FailingSink::default();
        let settings =
            CompilerSettings::new(RibaStage::Stage4, GenerationPass::CORE).with_partitioning(true, false);
        let mut root = SpecCompiler::new(
            settings,
            Arc::new(test_catalog()),
            GroupMetadata::new("Bundle"),
            Box::new(sink.clone()),
        )
        .unwrap();
        {
            let mut scope = root.begin_child_scope(None);
            let id = scope.generate_identifier();
            scope.append(dummy_spec(id)).unwrap();
        }
        assert!(matches!(root.check_deferred(), Err(GeneratorError::Sink(m)) if m == "disk full"));
        assert!(root.finish().is_err());
        assert_eq!(*sink.calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_names_do_not_outlive_their_slot() {
        let mut root = compiler(CompilerSettings::new(RibaStage::Stage4, GenerationPass::CORE));
        let mut types = root.begin_child_scope(None);
        {
            let _beam = types.begin_child_scope(Some("Beam"));
        }
        let first = types.generate_identifier();
        types.skip_with("placeholder", true);
        let second = types.generate_identifier();
        assert_eq!(first, "01_02");
        assert_eq!(second, "01_04");

        types.set_name("DoorStyle");
        assert_eq!(types.generate_identifier(), "01_DoorStyle");
        assert_eq!(types.generate_identifier(), "01_06");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Generate,
        Skip,
        Child,
        NamedChild,
        Named,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Generate),
            Just(Op::Skip),
            Just(Op::Child),
            Just(Op::NamedChild),
            Just(Op::Named)
        ]
    }

    fn last_segment(full_prefix: &str) -> String {
        full_prefix.rsplit('/').next().unwrap_or_default().to_string()
    }

    proptest! {
        #[test]
        fn prop_identifiers_strictly_increase(ops in prop::collection::vec(op(), 1..60)) {
            let mut root = compiler(CompilerSettings::new(RibaStage::Stage4, GenerationPass::CORE));
            let mut scope = root.begin_child_scope(None);
            let mut seen = Vec::new();
            let mut rendered = std::collections::BTreeSet::new();
            for (i, op) in ops.into_iter().enumerate() {
                let identifier = match op {
                    Op::Generate => Some(scope.generate_identifier()),
                    Op::Skip => {
                        scope.skip_with("not implemented", true);
                        None
                    }
                    Op::Child => {
                        let child = scope.begin_child_scope(None);
                        Some(last_segment(child.full_prefix()))
                    }
                    Op::NamedChild => {
                        let child = scope.begin_child_scope(Some(&format!("Kind{i}")));
                        Some(last_segment(child.full_prefix()))
                    }
                    Op::Named => {
                        scope.set_name(format!("Slot{i}"));
                        Some(scope.generate_identifier())
                    }
                };
                if let Some(identifier) = identifier {
                    prop_assert!(rendered.insert(identifier.clone()), "{} repeated", identifier);
                }
                seen.push(scope.section());
            }
            prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn prop_skip_consumes_one_slot(before in 0u32..40) {
            let mut root = compiler(CompilerSettings::new(RibaStage::Stage4, GenerationPass::CORE));
            let mut scope = root.begin_child_scope(None);
            for _ in 0..before {
                scope.generate_identifier();
            }
            scope.skip_with("placeholder", true);
            let next = scope.generate_identifier();
            prop_assert_eq!(next, format!("01_{:02}", before + 2));
        }
    }
}
