//! Weight aggregation.
//!
//! Reduces the candidate edges proposed at one traversal level into at most
//! one canonical proposal per node pair. Each strategy is treated as
//! independent evidence of relatedness:
//!
//! ```text
//! combined = 1 - Π (1 - score_s)      over the proposing strategies s
//! ```
//!
//! A strategy that proposes the same pair several times (e.g. an outgoing
//! link and the matching backlink) counts once, with its best score.
//! The reduction is pure and independent of input order.

use std::collections::BTreeMap;

use crate::strategies::{CandidateEdge, EdgeDirection};

use super::models::{clamp_weight, pair_key, GraphNode, StrategyKind};

/// The merged result for one node pair.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedEdge {
    /// Frontier node the strongest contributor was discovered from
    pub anchor_id: String,
    /// The other endpoint, as drafted by the strongest contributor
    pub discovered: GraphNode,
    pub direction: EdgeDirection,
    pub relation: String,
    /// Probabilistic union over contributing strategies, within [0, 1]
    pub weight: f64,
    /// Contributing strategies, sorted by name
    pub contributors: Vec<StrategyKind>,
}

impl AggregatedEdge {
    /// `(source, target)` of the canonical edge.
    pub fn endpoints(&self) -> (&str, &str) {
        match self.direction {
            EdgeDirection::Outgoing => (&self.anchor_id, &self.discovered.id),
            EdgeDirection::Incoming => (&self.discovered.id, &self.anchor_id),
        }
    }
}

/// Combine independent scores with the probabilistic union rule.
pub fn combine_scores(scores: impl IntoIterator<Item = f64>) -> f64 {
    let miss: f64 = scores
        .into_iter()
        .map(|s| 1.0 - clamp_weight(s))
        .product();
    clamp_weight(1.0 - miss)
}

/// Total order deciding which candidate's label and direction survive.
///
/// Higher score first, then strategy name, then relation, then endpoints.
fn stronger(a: &CandidateEdge, b: &CandidateEdge) -> bool {
    let sa = clamp_weight(a.raw_score);
    let sb = clamp_weight(b.raw_score);
    if sa != sb {
        return sa > sb;
    }
    let ka = (
        a.strategy.as_str(),
        a.relation.as_str(),
        a.endpoints(),
    );
    let kb = (
        b.strategy.as_str(),
        b.relation.as_str(),
        b.endpoints(),
    );
    ka < kb
}

/// Merge candidates into one proposal per unordered node pair.
///
/// Self-loops are dropped. Output is sorted by weight descending, then by
/// pair key, so callers get a deterministic order.
pub fn aggregate(candidates: &[CandidateEdge]) -> Vec<AggregatedEdge> {
    // pair → strategy → best candidate of that strategy
    let mut groups: BTreeMap<(String, String), BTreeMap<StrategyKind, &CandidateEdge>> =
        BTreeMap::new();

    for candidate in candidates {
        if candidate.source_id == candidate.target.id {
            continue;
        }
        let per_strategy = groups
            .entry(pair_key(&candidate.source_id, &candidate.target.id))
            .or_default();
        match per_strategy.get(&candidate.strategy) {
            Some(existing) if !stronger(candidate, existing) => {}
            _ => {
                per_strategy.insert(candidate.strategy, candidate);
            }
        }
    }

    let mut merged: Vec<((String, String), AggregatedEdge)> = groups
        .into_iter()
        .filter_map(|(key, per_strategy)| {
            let best = per_strategy
                .values()
                .copied()
                .reduce(|acc, c| if stronger(c, acc) { c } else { acc })?;
            let weight = combine_scores(per_strategy.values().map(|c| c.raw_score));
            let mut contributors: Vec<StrategyKind> = per_strategy.keys().copied().collect();
            contributors.sort_by_key(|s| s.as_str());
            Some((
                key,
                AggregatedEdge {
                    anchor_id: best.source_id.clone(),
                    discovered: best.target.clone(),
                    direction: best.direction,
                    relation: best.relation.clone(),
                    weight,
                    contributors,
                },
            ))
        })
        .collect();

    merged.sort_by(|(ka, a), (kb, b)| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ka.cmp(kb))
    });

    merged.into_iter().map(|(_, edge)| edge).collect()
}
