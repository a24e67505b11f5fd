//! Lookup from what a rule checks to the identifier it was given
//!
//! Fixture synthesis tags every sample with the rule it exercises. Tags are
//! resolved here rather than rebuilt from numbering conventions, so they
//! only ever name rules that were actually compiled.

use std::collections::BTreeMap;

use crate::requirement::RequirementKind;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RuleKey {
    entity: String,
    sub_kind: Option<String>,
    kind: RequirementKind,
    subject: String,
}

/// (entity type, sub-kind, requirement kind, subject) -> identifiers
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    /// Registration order, never empty
    entries: BTreeMap<RuleKey, Vec<String>>,
}

impl RuleIndex {
    /// Later registrations of a key queue behind the first
    pub fn record(
        &mut self,
        entity: &str,
        sub_kind: Option<&str>,
        kind: RequirementKind,
        subject: &str,
        identifier: &str,
    ) {
        let key = RuleKey {
            entity: entity.to_ascii_uppercase(),
            sub_kind: sub_kind.map(str::to_string),
            kind,
            subject: subject.to_string(),
        };
        let identifiers = self.entries.entry(key).or_default();
        if !identifiers.iter().any(|id| id == identifier) {
            identifiers.push(identifier.to_string());
        }
    }

    /// First rule registered for the key
    pub fn lookup(
        &self,
        entity: &str,
        sub_kind: Option<&str>,
        kind: RequirementKind,
        subject: &str,
    ) -> Option<&str> {
        self.lookup_all(entity, sub_kind, kind, subject)
            .first()
            .map(String::as_str)
    }

    /// Every rule registered for the key, in creation order.
    /// Exact sub-kind match, falling back to the rules without a sub-kind.
    pub fn lookup_all(
        &self,
        entity: &str,
        sub_kind: Option<&str>,
        kind: RequirementKind,
        subject: &str,
    ) -> &[String] {
        let mut key = RuleKey {
            entity: entity.to_ascii_uppercase(),
            sub_kind: sub_kind.map(str::to_string),
            kind,
            subject: subject.to_string(),
        };
        if let Some(found) = self.entries.get(&key) {
            return found;
        }
        if key.sub_kind.is_some() {
            key.sub_kind = None;
            if let Some(found) = self.entries.get(&key) {
                return found;
            }
        }
        &[]
    }

    /// Whether any rule carries this identifier
    pub fn contains_identifier(&self, identifier: &str) -> bool {
        self.entries.values().flatten().any(|id| id == identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
