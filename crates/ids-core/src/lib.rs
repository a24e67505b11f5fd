//! IDS rule compiler engine
//!
//! Pure library with no file-system access:
//!
//! - [`stages`] lifecycle stages and generation passes
//! - [`schema`] entity-type catalog, dialect views and type conventions
//! - [`naming`] canonical names and the patterns that validate them
//! - [`facets`] / [`requirement`] the facet and requirement vocabulary
//! - [`scope`] nested numbering scopes, owning the output groups
//! - [`builder`] rule construction inside a scope
//! - [`consolidate`] merging of rules that share an applicability
//! - [`fixtures`] paired pass/fail sample synthesis and corruption scripts
//!
//! Output leaves the engine through the [`OutputSink`] trait.

pub mod builder;
pub mod consolidate;
pub mod error;
pub mod facets;
pub mod fixtures;
pub mod model;
pub mod naming;
pub mod requirement;
pub mod rule_index;
pub mod schema;
pub mod scope;
pub mod stages;

pub use consolidate::consolidate;
pub use error::{GeneratorError, Result};
pub use facets::{
    ApplicabilityCardinality, Facet, FacetGroup, PartOfRelation, RangeBounds, RequirementCardinality,
    ValueConstraint,
};
pub use fixtures::{FixtureSet, FixtureSynthesizer, SampleInstance};
pub use model::{GroupMetadata, ProjectInfo, RuleBundle, Specification, SpecificationGroup};
pub use naming::{NamingResolver, UndefinedSubKindPolicy};
pub use requirement::{Requirement, RequirementKind};
pub use rule_index::RuleIndex;
pub use schema::{DialectSet, SchemaCatalog, SchemaDialect, SchemaFacade};
pub use scope::{CompiledRules, CompilerSettings, NullSink, OutputSink, ScopeGuard, SpecCompiler, SpecLocation};
pub use stages::{GenerationPass, LifecycleStages, RibaStage};
