//! Naming resolver
//!
//! Maps (entity kind, sub-kind, container) to a canonical name and the
//! pattern that validates it. Both come from the same [`NamingDecision`], so
//! a generated name always matches its own pattern and the compiled naming
//! rule for its kind.
//!
//! # Strategies
//!
//! ```text
//! SPATIAL    <space>-<code><nnn>     00-01A-D003
//! SEQUENCE   <code>-<nnnnn>          PMP-00012
//! override   <sub-kind code>-<nnnnn> RAD-00002
//! space      <first 5 of storey><letter>   00-01C
//! fallback   <label>[-<sub-kind>]<nnnnn>
//! ```

mod codes;
mod counters;
mod subkinds;

pub use codes::{NamingStrategy, TypeCodeMapping, TypeCodeTable};
pub use counters::CounterStore;
pub use subkinds::SubKindNames;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::{GeneratorError, Result};
use crate::schema::TypeConventions;

/// Project space-number convention, with optional storey prefix
pub const SPACE_NAME_PATTERN: &str = "((EX|00|01|02|03|RF|R2|ZZ|M0|M1|B1|B2)-)?[0-9]+[A-Za-z]?";

const SPACE_LETTERS: &str = "ACDEFHIJKLMNOPQRSTUVWXYZ";
// Open-ended: counters pad to a minimum width and keep growing
const SPATIAL_SUFFIX: &str = r"\d{2,}";
const SEQUENCE_SUFFIX: &str = r"\d{2,}";
const FALLBACK_SUFFIX: &str = r"\d{5,}";
const PROPER_CASE_WORDS: &str = "([A-Z][a-z]+)+";

/// Reserved sub-kind for instances whose kind was never chosen
pub const UNDEFINED_SUB_KIND: &str = "NOTDEFINED";

/// How the reserved undefined sub-kind is treated
///
/// Rules prohibit it, so a naming rule for it can never pass; fixtures may
/// still create it as a deliberate failure case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UndefinedSubKindPolicy {
    /// Emit per-sub-kind naming rules for the undefined sub-kind
    #[serde(default)]
    pub naming_rules: bool,
    /// Emit one failing fixture per type for the undefined sub-kind
    #[serde(default = "default_true")]
    pub fixture_occurrences: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UndefinedSubKindPolicy {
    fn default() -> Self {
        Self {
            naming_rules: false,
            fixture_occurrences: true,
        }
    }
}

/// How names are formed for one (kind, sub-kind)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingDecision {
    Spatial { code: String },
    Sequence { code: String },
    /// Spaces: storey prefix plus a letter
    SpaceLetter,
    /// No short code configured
    Fallback { prefix: String },
}

/// What the container part of a pattern should match
#[derive(Debug, Clone, Copy)]
pub enum ContainerPattern<'a> {
    /// This exact container name
    Literal(&'a str),
    /// Any name following the space-number convention
    Convention,
}

impl NamingDecision {
    fn counter_key(&self, container: &str) -> String {
        match self {
            Self::Spatial { code } => format!("{container}-{code}"),
            Self::Sequence { code } => format!("{code}-"),
            Self::SpaceLetter => space_stem(container).to_string(),
            Self::Fallback { prefix } => prefix.clone(),
        }
    }

    fn render(&self, key: &str, n: u32) -> String {
        match self {
            Self::Spatial { .. } => format!("{key}{n:03}"),
            Self::Sequence { .. } | Self::Fallback { .. } => format!("{key}{n:05}"),
            Self::SpaceLetter => {
                let letters = SPACE_LETTERS.as_bytes();
                let letter = letters[n as usize % letters.len()] as char;
                if n as usize > letters.len() {
                    warn!(
                        "More than {} spaces share stem '{}'; letter {} reused",
                        letters.len(),
                        key,
                        letter
                    );
                }
                format!("{key}{letter}")
            }
        }
    }

    /// Pattern validating every name this decision can produce
    pub fn pattern(&self, container: ContainerPattern<'_>) -> String {
        match (self, container) {
            (Self::Spatial { code }, ContainerPattern::Literal(c)) => {
                format!("{}-{}{SPATIAL_SUFFIX}", regex::escape(c), regex::escape(code))
            }
            (Self::Spatial { code }, ContainerPattern::Convention) => {
                format!("{SPACE_NAME_PATTERN}-{}{SPATIAL_SUFFIX}", regex::escape(code))
            }
            (Self::Sequence { code }, _) => format!("{}-{SEQUENCE_SUFFIX}", regex::escape(code)),
            (Self::SpaceLetter, ContainerPattern::Literal(c)) => {
                format!("{}[{SPACE_LETTERS}]", regex::escape(space_stem(c)))
            }
            (Self::SpaceLetter, ContainerPattern::Convention) => SPACE_NAME_PATTERN.to_string(),
            (Self::Fallback { prefix }, _) => format!("{}{FALLBACK_SUFFIX}", regex::escape(prefix)),
        }
    }

    /// Whether a project-wide naming rule exists for this decision
    pub fn has_convention(&self) -> bool {
        !matches!(self, Self::Fallback { .. })
    }
}

fn space_stem(container: &str) -> &str {
    match container.char_indices().nth(5) {
        Some((idx, _)) => &container[..idx],
        None => container,
    }
}

/// A generated name and its validating pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    pub pattern: String,
    pub decision: NamingDecision,
}

impl ResolvedName {
    /// Whole-string match, as rule checkers apply patterns
    pub fn matches(&self, candidate: &str) -> Result<bool> {
        full_match(&self.pattern, candidate)
    }
}

/// Compiled anchored patterns, keyed by the unanchored source
static COMPILED: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Anchored regex match
pub fn full_match(pattern: &str, candidate: &str) -> Result<bool> {
    if let Ok(cache) = COMPILED.lock() {
        if let Some(regex) = cache.get(pattern) {
            return Ok(regex.is_match(candidate));
        }
    }
    let anchored = format!("^(?:{pattern})$");
    let regex = Regex::new(&anchored).map_err(|source| GeneratorError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let matched = regex.is_match(candidate);
    if let Ok(mut cache) = COMPILED.lock() {
        cache.insert(pattern.to_string(), regex);
    }
    Ok(matched)
}

/// Shape of a type-object name: `<Entity>_<SubKind>_TypeNN`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNameConvention {
    /// Sub-kind enumerated with its display name
    Enumerated { entity: String, display: String },
    /// USERDEFINED: any proper-cased word in the sub-kind field
    UserDefined { entity: String },
    /// No enumeration: the sub-kind field is optional
    Unenumerated { entity: String },
}

impl TypeNameConvention {
    fn entity_pattern(entity: &str, free_label: bool) -> String {
        if free_label {
            PROPER_CASE_WORDS.to_string()
        } else {
            regex::escape(entity)
        }
    }

    /// Rule pattern; `free_label` widens the entity field to any proper-cased word
    pub fn pattern(&self, free_label: bool) -> String {
        match self {
            Self::Enumerated { entity, display } => format!(
                r"{}_{}_Type\d{{2,4}}",
                Self::entity_pattern(entity, free_label),
                regex::escape(display)
            ),
            Self::UserDefined { entity } => format!(
                r"{}_(([A-Z][a-z]+)+_)Type\d{{2,4}}",
                Self::entity_pattern(entity, free_label)
            ),
            Self::Unenumerated { entity } => format!(
                r"{}_(([A-Z][a-z]+)+_)?Type\d{{2,4}}",
                Self::entity_pattern(entity, free_label)
            ),
        }
    }

    /// Sample name for the `variant`th type of this shape
    pub fn sample_name(&self, variant: u32) -> String {
        match self {
            Self::Enumerated { entity, display } => format!("{entity}_{display}_Type{variant:02}"),
            Self::UserDefined { entity } => format!("{entity}_SomeUserDefined_Type{variant:03}"),
            Self::Unenumerated { entity } => format!("{entity}_Type{variant:04}"),
        }
    }
}

/// Entity kind + sub-kind + container -> name and pattern
#[derive(Debug, Clone)]
pub struct NamingResolver {
    codes: TypeCodeTable,
    conventions: TypeConventions,
    sub_kind_names: SubKindNames,
    counters: Arc<CounterStore>,
    space_entity: String,
}

impl NamingResolver {
    pub fn new(
        codes: TypeCodeTable,
        conventions: TypeConventions,
        sub_kind_names: SubKindNames,
        counters: Arc<CounterStore>,
    ) -> Self {
        Self {
            codes,
            conventions,
            sub_kind_names,
            counters,
            space_entity: "Space".to_string(),
        }
    }

    pub fn conventions(&self) -> &TypeConventions {
        &self.conventions
    }

    pub fn sub_kind_names(&self) -> &SubKindNames {
        &self.sub_kind_names
    }

    pub fn counters(&self) -> &Arc<CounterStore> {
        &self.counters
    }

    pub fn mapping(&self, entity_kind: &str) -> Option<&TypeCodeMapping> {
        self.codes.get(&self.conventions.entity_label(entity_kind))
    }

    /// Decide the naming shape; `default_label` prefixes fallback names
    pub fn decide(
        &self,
        entity_kind: &str,
        sub_kind: Option<&str>,
        default_label: Option<&str>,
    ) -> NamingDecision {
        let label = self.conventions.entity_label(entity_kind);
        let sub_kind = sub_kind.filter(|s| !s.is_empty());
        match self.codes.get(&label) {
            Some(mapping) if mapping.has_overrides() => NamingDecision::Sequence {
                code: mapping.code_for(sub_kind).to_string(),
            },
            Some(mapping) => match mapping.strategy {
                NamingStrategy::Spatial => NamingDecision::Spatial {
                    code: mapping.code.clone(),
                },
                NamingStrategy::Sequence => NamingDecision::Sequence {
                    code: mapping.code.clone(),
                },
            },
            None if label == self.space_entity => NamingDecision::SpaceLetter,
            None => {
                let base = default_label.unwrap_or(&label);
                let prefix = match sub_kind {
                    Some(s) => format!("{base}-{s}"),
                    None => base.to_string(),
                };
                NamingDecision::Fallback { prefix }
            }
        }
    }

    /// Allocate the next canonical name for `entity_kind` in `container`
    pub fn resolve_name(
        &self,
        entity_kind: &str,
        sub_kind: Option<&str>,
        container: &str,
    ) -> ResolvedName {
        self.resolve_name_or(entity_kind, sub_kind, container, None)
    }

    /// As [`resolve_name`](Self::resolve_name) with an explicit fallback label
    pub fn resolve_name_or(
        &self,
        entity_kind: &str,
        sub_kind: Option<&str>,
        container: &str,
        default_label: Option<&str>,
    ) -> ResolvedName {
        let decision = self.decide(entity_kind, sub_kind, default_label);
        let key = decision.counter_key(container);
        let n = self.counters.next(&key);
        ResolvedName {
            name: decision.render(&key, n),
            pattern: decision.pattern(ContainerPattern::Literal(container)),
            decision,
        }
    }

    /// Project-wide rule pattern for a kind, `None` when no convention applies
    pub fn rule_pattern(&self, entity_kind: &str, sub_kind: Option<&str>) -> Option<String> {
        let decision = self.decide(entity_kind, sub_kind, None);
        decision
            .has_convention()
            .then(|| decision.pattern(ContainerPattern::Convention))
    }

    /// Naming shape for a type object and one of its sub-kinds
    pub fn type_convention(&self, type_name: &str, sub_kind: Option<&str>) -> TypeNameConvention {
        let entity = self.conventions.entity_label(type_name);
        let enumerated = self.conventions.enumerates_sub_kinds(type_name);
        match sub_kind {
            Some("USERDEFINED") if enumerated => TypeNameConvention::UserDefined { entity },
            Some(sub_kind) if enumerated => TypeNameConvention::Enumerated {
                display: self.sub_kind_names.display(&entity, sub_kind),
                entity,
            },
            _ => TypeNameConvention::Unenumerated { entity },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn resolver() -> NamingResolver {
        let mut codes = TypeCodeTable::default();
        codes.insert("Door", TypeCodeMapping::new("D").spatial());
        codes.insert("Window", TypeCodeMapping::new("W").spatial());
        codes.insert("Pump", TypeCodeMapping::new("PMP"));
        codes.insert(
            "SpaceHeater",
            TypeCodeMapping::new("SPH")
                .override_with("RADIATOR", "RAD")
                .override_with("PANELRADIATOR", "RAD"),
        );
        NamingResolver::new(
            codes,
            TypeConventions::default(),
            SubKindNames::from_pairs([("JOIST", "Joist"), ("RADIATOR", "Radiator")]),
            Arc::new(CounterStore::new()),
        )
    }

    #[test]
    fn test_spatial_door_third_allocation() {
        let resolver = resolver();
        resolver.resolve_name("IfcDoor", None, "00-01A");
        resolver.resolve_name("IfcDoor", None, "00-01A");
        let third = resolver.resolve_name("IfcDoor", None, "00-01A");
        assert_eq!(third.name, "00-01A-D003");
        assert!(third.matches("00-01A-D003").unwrap());
        assert!(!third.matches("00-01A-X003").unwrap());
    }

    #[test]
    fn test_patterns_accept_wide_counters() {
        let resolver = resolver();
        let mut door = resolver.resolve_name("IfcDoor", None, "00-01A");
        for _ in 1..1000 {
            door = resolver.resolve_name("IfcDoor", None, "00-01A");
        }
        assert_eq!(door.name, "00-01A-D1000");
        assert!(door.matches(&door.name).unwrap());
        let rule = resolver.rule_pattern("IfcDoor", None).unwrap();
        assert!(full_match(&rule, &door.name).unwrap());

        let mut pump = resolver.resolve_name("IfcPump", None, "x");
        for _ in 1..100_000 {
            pump = resolver.resolve_name("IfcPump", None, "x");
        }
        assert_eq!(pump.name, "PMP-100000");
        assert!(pump.matches(&pump.name).unwrap());
    }

    #[test]
    fn test_space_letters_unique_per_stem() {
        let resolver = resolver();
        let names: std::collections::BTreeSet<String> = (0..SPACE_LETTERS.len())
            .map(|_| resolver.resolve_name("IfcSpace", None, "01-02 Level").name)
            .collect();
        assert_eq!(names.len(), SPACE_LETTERS.len());
        assert!(names.iter().all(|n| full_match(SPACE_NAME_PATTERN, n).unwrap()));
    }

    #[test]
    fn test_spatial_counters_are_per_container() {
        let resolver = resolver();
        resolver.resolve_name("IfcDoor", None, "00-01A");
        let other = resolver.resolve_name("IfcDoor", None, "00-02A");
        assert_eq!(other.name, "00-02A-D001");
    }

    #[test]
    fn test_sequence_and_overrides() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_name("IfcPump", Some("CIRCULATOR"), "x").name, "PMP-00001");
        assert_eq!(resolver.resolve_name("IfcPump", None, "y").name, "PMP-00002");
        assert_eq!(
            resolver.resolve_name("IfcSpaceHeater", Some("RADIATOR"), "x").name,
            "RAD-00001"
        );
        assert_eq!(
            resolver.resolve_name("IfcSpaceHeater", Some("PANELRADIATOR"), "x").name,
            "RAD-00002"
        );
        assert_eq!(
            resolver.resolve_name("IfcSpaceHeater", Some("CONVECTOR"), "x").name,
            "SPH-00001"
        );
    }

    #[test]
    fn test_fallback_and_space_names() {
        let resolver = resolver();
        let wall = resolver.resolve_name_or("IfcWall", Some("PARTITIONING"), "x", Some("Wall_Type01"));
        assert_eq!(wall.name, "Wall_Type01-PARTITIONING00001");
        assert!(wall.matches(&wall.name).unwrap());
        assert!(resolver.rule_pattern("IfcWall", None).is_none());

        let space = resolver.resolve_name("IfcSpace", None, "00-01 Ground");
        assert_eq!(space.name, "00-01C");
        assert!(full_match(SPACE_NAME_PATTERN, &space.name).unwrap());
    }

    #[test]
    fn test_rule_patterns_accept_generated_names() {
        let resolver = resolver();
        let door = resolver.resolve_name("IfcDoor", None, "01-02");
        let rule = resolver.rule_pattern("IfcDoor", None).unwrap();
        assert!(full_match(&rule, &door.name).unwrap());
        assert!(!full_match(&rule, &format!("BAD-{}", door.name)).unwrap());

        let radiator = resolver.resolve_name("IfcSpaceHeater", Some("RADIATOR"), "x");
        let rule = resolver.rule_pattern("IfcSpaceHeater", Some("RADIATOR")).unwrap();
        assert_eq!(rule, r"RAD-\d{2,}");
        assert!(full_match(&rule, &radiator.name).unwrap());
    }

    #[test]
    fn test_type_conventions() {
        let resolver = resolver();
        let beam = resolver.type_convention("IfcBeamType", Some("JOIST"));
        assert_eq!(beam.sample_name(0), "Beam_Joist_Type00");
        assert!(full_match(&beam.pattern(false), "Beam_Joist_Type00").unwrap());

        let user = resolver.type_convention("IfcBeamType", Some("USERDEFINED"));
        assert!(full_match(&user.pattern(false), &user.sample_name(0)).unwrap());

        let door = resolver.type_convention("IfcDoorStyle", Some("NOTDEFINED"));
        assert_eq!(door, TypeNameConvention::Unenumerated { entity: "Door".into() });
        assert!(full_match(&door.pattern(false), "Door_Type0000").unwrap());
        assert!(full_match(&door.pattern(false), "Door_Fire_Type01").unwrap());
        assert!(!full_match(&door.pattern(false), "Door_Type0000-BAD").unwrap());

        let proxy = resolver.type_convention("IfcBuildingElementProxyType", None);
        assert!(full_match(&proxy.pattern(true), "CustomEntity_Type0001").unwrap());
    }

    proptest! {
        #[test]
        fn prop_resolved_names_match_their_pattern(
            kind in prop::sample::select(vec![
                "IfcDoor", "IfcWindow", "IfcPump", "IfcSpaceHeater", "IfcWall", "IfcSpace", "IfcTank",
            ]),
            sub_kind in prop::option::of(prop::sample::select(vec![
                "RADIATOR", "CONVECTOR", "USERDEFINED", "A.B*C",
            ])),
            container in "[ -~]{0,12}",
            repeats in 1usize..20,
        ) {
            let resolver = resolver();
            for _ in 0..repeats {
                let resolved = resolver.resolve_name(kind, sub_kind, &container);
                prop_assert!(resolved.matches(&resolved.name).unwrap(), "{} !~ {}", resolved.name, resolved.pattern);
            }
        }
    }
}
