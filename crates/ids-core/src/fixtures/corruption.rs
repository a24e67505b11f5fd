//! Scripted corruption pass
//!
//! A script is an ordered list of steps, each breaking exactly one value.
//! Steps take their target from a [`RoundRobin`] cursor over a fixed list
//! of conforming instances, so a script replayed over the same instances
//! always corrupts the same instance in the same way.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::baseline::{Field, ValueSet};
use super::SampleInstance;
use crate::error::{GeneratorError, Result};

/// One rule-relevant change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mutation", rename_all = "snake_case")]
pub enum Mutation {
    /// Set to the empty string
    Blank { field: Field },
    Remove { field: Field },
    Replace { field: Field, value: String },
    /// Set a quantity to zero
    Zero { field: Field },
}

impl Mutation {
    pub fn field(&self) -> &Field {
        match self {
            Self::Blank { field } | Self::Remove { field } | Self::Replace { field, .. } | Self::Zero { field } => {
                field
            }
        }
    }

    /// Apply to `values`; false when nothing changed
    pub fn apply(&self, values: &mut ValueSet) -> bool {
        match self {
            Self::Blank { field } => {
                let changed = values.get(field) != Some("");
                values.set(field, "");
                changed
            }
            Self::Remove { field } => values.remove(field),
            Self::Replace { field, value } => {
                let changed = values.get(field) != Some(value.as_str());
                values.set(field, value.clone());
                changed
            }
            Self::Zero { field } => {
                let changed = values.get(field) != Some("0");
                values.set(field, "0");
                changed
            }
        }
    }
}

/// Cursor over `len` slots that wraps back to 0
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    position: usize,
    len: usize,
    wraps: usize,
}

impl RoundRobin {
    pub fn new(len: usize) -> Self {
        Self {
            position: 0,
            len,
            wraps: 0,
        }
    }

    /// Next slot, `None` only when there are no slots
    pub fn next_index(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let current = self.position;
        self.position = (current + 1) % self.len;
        if self.position == 0 {
            self.wraps += 1;
        }
        Some(current)
    }

    /// Times the cursor has run off the end
    pub fn wraps(&self) -> usize {
        self.wraps
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorruptionStep {
    pub description: String,
    pub mutation: Mutation,
    /// Rule the resulting failure exercises
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// What a step did, for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorruptionRecord {
    /// Index into the instance list
    pub instance: usize,
    /// Name before the step ran
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorruptionScript {
    steps: Vec<CorruptionStep>,
}

impl CorruptionScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, description: impl Into<String>, mutation: Mutation, tag: Option<String>) -> Self {
        self.steps.push(CorruptionStep {
            description: description.into(),
            mutation,
            tag,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step against `instances[targets[cursor]]`
    pub fn apply(&self, instances: &mut [SampleInstance], targets: &[usize]) -> Result<Vec<CorruptionRecord>> {
        if self.steps.is_empty() {
            return Ok(Vec::new());
        }
        let mut cursor = RoundRobin::new(targets.len());
        let mut records = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let slot = cursor
                .next_index()
                .ok_or_else(|| GeneratorError::Fixture("corruption script has no targets".to_string()))?;
            let index = targets[slot];
            let instance = instances.get_mut(index).ok_or_else(|| {
                GeneratorError::Fixture(format!("corruption target {index} out of range"))
            })?;

            let name = instance.name().to_string();
            let changed = step.mutation.apply(&mut instance.values);
            if changed {
                instance.conforming = false;
                if let Some(tag) = &step.tag {
                    instance.tags.push(tag.clone());
                }
                debug!("{}: {}", name, step.description);
            } else {
                warn!("corruption '{}' left {} unchanged", step.description, name);
            }
            records.push(CorruptionRecord {
                instance: index,
                name,
                description: step.description.clone(),
                tag: step.tag.clone(),
                changed,
            });
        }
        if self.steps.len() > targets.len() {
            warn!(
                "{} corruption steps over {} targets, some instances carry several violations",
                self.steps.len(),
                targets.len()
            );
        }
        Ok(records)
    }
}
