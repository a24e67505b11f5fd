//! Consolidation pass
//!
//! Merges specifications of one group that share an applicability into a
//! single specification carrying the union of their requirement facets.
//! Identifiers of the merged rules are kept, comma-joined, on the
//! replacement so every original rule stays traceable.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::facets::{ApplicabilityCardinality, FacetGroup};
use crate::model::{Specification, SpecificationGroup};

type BucketKey = (String, ApplicabilityCardinality);

/// Merge specifications with identical decoded applicability; returns the
/// number of replacements made
pub fn consolidate(group: &mut SpecificationGroup) -> usize {
    let mut buckets: BTreeMap<BucketKey, Vec<usize>> = BTreeMap::new();
    for (i, spec) in group.specifications.iter().enumerate() {
        buckets
            .entry((spec.applicability.decode(), spec.applicability_cardinality))
            .or_default()
            .push(i);
    }

    let mut ordered: Vec<(BucketKey, Vec<usize>)> = buckets
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .collect();
    ordered.sort_by(|(ka, a), (kb, b)| {
        let first_a = &group.specifications[a[0]].identifier;
        let first_b = &group.specifications[b[0]].identifier;
        first_a.cmp(first_b).then_with(|| ka.cmp(kb))
    });

    // first member index -> replacement; other merged members are dropped
    let mut replacements: BTreeMap<usize, Specification> = BTreeMap::new();
    let mut merged = vec![false; group.specifications.len()];

    for ((decoded, _), members) in ordered {
        let mut mergeable: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&i| {
                let keep = !group.specifications[i].requirement.is_empty();
                if !keep {
                    trace!(
                        "{} has no requirement facets, left in place",
                        group.specifications[i].identifier
                    );
                }
                keep
            })
            .collect();
        if mergeable.len() < 2 {
            continue;
        }
        mergeable.sort_by(|&a, &b| {
            group.specifications[a]
                .identifier
                .cmp(&group.specifications[b].identifier)
        });
        let specs: Vec<&Specification> = mergeable.iter().map(|&i| &group.specifications[i]).collect();
        let replacement = merge(&specs);
        debug!("merged {} specs sharing '{}' into {}", specs.len(), decoded, replacement.identifier);

        let position = mergeable.iter().copied().min().unwrap_or(mergeable[0]);
        for &i in &mergeable {
            merged[i] = true;
        }
        replacements.insert(position, replacement);
    }

    let count = replacements.len();
    if count == 0 {
        return 0;
    }
    let original = std::mem::take(&mut group.specifications);
    for (i, spec) in original.into_iter().enumerate() {
        if let Some(replacement) = replacements.remove(&i) {
            group.specifications.push(replacement);
        } else if !merged[i] {
            group.specifications.push(spec);
        }
    }
    count
}

fn merge(specs: &[&Specification]) -> Specification {
    let first = specs[0];
    let last = specs[specs.len() - 1];
    let label = first.applicability.name.as_str();

    let identifier = specs
        .iter()
        .map(|s| s.identifier.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let label_prefix = format!("{label} ");
    let description = format!(
        "{label} {}",
        specs
            .iter()
            .map(|s| s.description.replacen(&label_prefix, "", 1))
            .collect::<Vec<_>>()
            .join(", and ")
    );

    let instructions = specs
        .iter()
        .filter_map(|s| {
            s.instructions
                .as_deref()
                .filter(|i| !i.is_empty())
                .map(|i| format!("{}: {}", s.identifier, i))
        })
        .collect::<Vec<_>>();

    let mut requirement = FacetGroup::new(label, description.clone());
    for spec in specs {
        for (facet, cardinality) in spec.requirement.entries() {
            requirement.push_unique(facet.clone(), cardinality);
        }
    }

    let mut dialects: Vec<_> = specs.iter().flat_map(|s| s.dialects.iter().copied()).collect();
    dialects.sort();
    dialects.dedup();

    Specification {
        name: format!(
            "{}-{}: {} ({} requirements)",
            first.identifier,
            last.identifier,
            label,
            specs.len()
        ),
        identifier,
        description,
        instructions: (!instructions.is_empty()).then(|| instructions.join(". ")),
        applicability: first.applicability.clone(),
        applicability_cardinality: first.applicability_cardinality,
        requirement,
        dialects,
    }
}
