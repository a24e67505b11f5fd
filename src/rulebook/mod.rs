//! DfE Employer's Information Requirements rulebook
//!
//! Sections, each compiled in its own child scope of the root:
//!
//! | # | Tag            | Stages  |
//! |---|----------------|---------|
//! | 01| Project        | all     |
//! | 02| Site           | all     |
//! | 03| Building       | all     |
//! | 04| BuildingStorey | all     |
//! | 05| Space          | all     |
//! | 06| Zone           | all     |
//! | 07| Type           | 4+      |
//! | 08| Object         | 4+      |
//! | 09| System         | 4+      |
//!
//! Per-type naming rules (07.05, 08.02) and the ADS/Uniclass consistency
//! rules (05.15) belong to the complex pass; everything else is core.

pub mod content;
mod objects;
pub mod patterns;
mod project;
mod spatial;

use ids_core::{
    FacetGroup, GenerationPass, LifecycleStages, NamingResolver, Requirement, SpecCompiler, UndefinedSubKindPolicy,
};
use tracing::debug;

use crate::config::ProjectSettings;
use content::DomainContent;
pub use objects::{COBIE_COMPONENTS, COBIE_TYPES, ROOT_TYPES};

/// Compiles the rulebook into a [`SpecCompiler`] root scope
pub struct Rulebook<'a> {
    project: &'a ProjectSettings,
    content: &'a DomainContent,
    resolver: &'a NamingResolver,
    policy: UndefinedSubKindPolicy,
}

impl<'a> Rulebook<'a> {
    pub fn new(project: &'a ProjectSettings, content: &'a DomainContent, resolver: &'a NamingResolver) -> Self {
        Self {
            project,
            content,
            resolver,
            policy: UndefinedSubKindPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UndefinedSubKindPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Emit every section into `root`; the caller finishes the compiler
    pub fn compile(&self, root: &mut SpecCompiler) -> ids_core::Result<()> {
        root.set_applicable_stages(LifecycleStages::ALL)
            .set_applicable_passes(GenerationPass::CORE);

        project::project(&mut root.begin_child_scope(None), self.project)?;
        project::site(&mut root.begin_child_scope(None), self.project)?;
        project::building(&mut root.begin_child_scope(None), self.project)?;
        spatial::storeys(&mut root.begin_child_scope(None), self.project, self.content)?;
        spatial::spaces(&mut root.begin_child_scope(None), self.content)?;
        spatial::zones(&mut root.begin_child_scope(None), self.content)?;

        root.set_applicable_stages(LifecycleStages::STAGE4_PLUS);
        objects::types(&mut root.begin_child_scope(None), self.resolver, self.policy)?;
        objects::occurrences(&mut root.begin_child_scope(None), self.resolver, self.policy)?;
        objects::systems(&mut root.begin_child_scope(None))?;

        debug!(
            "Rulebook compiled for {} ({} rules indexed)",
            root.target_stage(),
            root.index().len()
        );
        Ok(())
    }
}

/// GlobalId, Name and Description rules shared by the spatial sections
pub(crate) fn common_requirements(
    scope: &mut SpecCompiler,
    applicability: &FacetGroup,
    label: &str,
    name: &str,
    description: &str,
) -> ids_core::Result<()> {
    scope.create_specification(applicability, Requirement::attribute_defined("GlobalId"))?;
    scope.create_specification(applicability, Requirement::attribute_defined("Name"))?;
    let title = format!("{label} Should Have Name Matching The Projects Information Standard");
    scope.create_specification_titled(
        applicability,
        Requirement::attribute_has_value("Name", name),
        Some(&title),
    )?;
    scope.create_specification(applicability, Requirement::attribute_defined("Description"))?;
    let title = format!("{label} Should Have Description Matching The Projects Information Standard");
    scope.create_specification_titled(
        applicability,
        Requirement::attribute_has_value("Description", description),
        Some(&title),
    )?;
    Ok(())
}

/// Run `body` with the scope narrowed to `stages`, then restore the window
pub(crate) fn within_stages<F>(scope: &mut SpecCompiler, stages: LifecycleStages, body: F) -> ids_core::Result<()>
where
    F: FnOnce(&mut SpecCompiler) -> ids_core::Result<()>,
{
    let saved = scope.applicable_stages();
    scope.set_applicable_stages(stages);
    let result = body(scope);
    scope.set_applicable_stages(saved);
    result
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use ids_core::naming::CounterStore;
    use ids_core::schema::TypeConventions;
    use ids_core::{CompiledRules, CompilerSettings, GroupMetadata, NullSink, RibaStage, SchemaCatalog};

    use super::*;
    use crate::config::{ConfigLoader, GeneratorInputs};

    pub(crate) fn inputs() -> GeneratorInputs {
        ConfigLoader::embedded().load().unwrap()
    }

    pub(crate) fn resolver(inputs: &GeneratorInputs) -> NamingResolver {
        NamingResolver::new(
            inputs.type_codes.clone(),
            TypeConventions::default(),
            inputs.sub_kinds.clone(),
            Arc::new(CounterStore::new()),
        )
    }

    pub(crate) fn compile(stage: RibaStage, pass: GenerationPass) -> CompiledRules {
        let inputs = inputs();
        let resolver = resolver(&inputs);
        let catalog = Arc::new(inputs.catalog.clone());
        compile_with(stage, pass, &inputs, &resolver, catalog)
    }

    pub(crate) fn compile_with_policy(
        stage: RibaStage,
        pass: GenerationPass,
        policy: UndefinedSubKindPolicy,
    ) -> CompiledRules {
        let inputs = inputs();
        let resolver = resolver(&inputs);
        let catalog = Arc::new(inputs.catalog.clone());
        compile_rules(stage, pass, &inputs, &resolver, catalog, policy)
    }

    pub(crate) fn compile_with(
        stage: RibaStage,
        pass: GenerationPass,
        inputs: &GeneratorInputs,
        resolver: &NamingResolver,
        catalog: Arc<SchemaCatalog>,
    ) -> CompiledRules {
        compile_rules(stage, pass, inputs, resolver, catalog, UndefinedSubKindPolicy::default())
    }

    fn compile_rules(
        stage: RibaStage,
        pass: GenerationPass,
        inputs: &GeneratorInputs,
        resolver: &NamingResolver,
        catalog: Arc<SchemaCatalog>,
        policy: UndefinedSubKindPolicy,
    ) -> CompiledRules {
        let mut root = SpecCompiler::new(
            CompilerSettings::new(stage, pass),
            catalog,
            GroupMetadata::new("Assurance"),
            Box::new(NullSink),
        )
        .unwrap();
        Rulebook::new(&inputs.config.project, &inputs.content, resolver)
            .with_policy(policy)
            .compile(&mut root)
            .unwrap();
        root.finish().unwrap()
    }

    pub(crate) fn identifiers(rules: &CompiledRules) -> Vec<String> {
        rules
            .groups
            .iter()
            .flat_map(|g| g.specifications.iter().map(|s| s.identifier.clone()))
            .collect()
    }

    #[test]
    fn test_stage_three_has_no_object_sections() {
        let rules = compile(RibaStage::Stage3, GenerationPass::CORE);
        let ids = identifiers(&rules);
        assert!(ids.iter().any(|id| id.starts_with("01_")));
        assert!(ids.iter().any(|id| id.starts_with("06_")));
        assert!(!ids.iter().any(|id| id.starts_with("07_") || id.starts_with("08_") || id.starts_with("09_")));
    }

    #[test]
    fn test_stage_four_adds_object_sections() {
        let ids = identifiers(&compile(RibaStage::Stage4, GenerationPass::CORE));
        for prefix in ["07_", "08_", "09_"] {
            assert!(ids.iter().any(|id| id.starts_with(prefix)), "missing {prefix}");
        }
    }

    #[test]
    fn test_core_and_complex_passes_are_disjoint() {
        let core = identifiers(&compile(RibaStage::Stage4, GenerationPass::CORE));
        let complex = identifiers(&compile(RibaStage::Stage4, GenerationPass::COMPLEX));
        let all = identifiers(&compile(RibaStage::Stage4, GenerationPass::ALL));
        assert!(!complex.is_empty());
        assert!(complex.iter().all(|id| !core.contains(id)));
        assert_eq!(all.len(), core.len() + complex.len());
    }

    #[test]
    fn test_within_stages_restores_window() {
        let inputs = inputs();
        let mut root = SpecCompiler::new(
            CompilerSettings::new(RibaStage::Stage3, GenerationPass::CORE),
            Arc::new(inputs.catalog.clone()),
            GroupMetadata::new("Assurance"),
            Box::new(NullSink),
        )
        .unwrap();
        let app = root.applicability("Space", &["IfcSpace"]).unwrap();
        within_stages(&mut root, LifecycleStages::STAGE5_PLUS, |scope| {
            assert_eq!(scope.create_specification(&app, Requirement::attribute_defined("Name"))?, None);
            Ok(())
        })
        .unwrap();
        assert_eq!(root.applicable_stages(), LifecycleStages::ALL);
    }
}
