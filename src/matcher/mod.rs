//! Greedy geometric correspondence between two sets of meshes.
//!
//! Each source takes the closest unconsumed target with the same vertex
//! count whose centroid lies within the threshold. Sources are visited in
//! input order and ties go to the first target encountered, so the result
//! is deterministic but not globally optimal.

pub mod scene;

use cgmath::Vector3;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::math;

/// Geometric fingerprint of one mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshDescriptor<H> {
    pub handle: H,
    pub vertex_count: usize,
    pub centroid: Vector3<f32>,
}

/// One accepted pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchAssignment<H> {
    pub source: H,
    pub target: H,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome<H> {
    pub assignments: Vec<MatchAssignment<H>>,
    pub unmatched_sources: Vec<H>,
    /// Handles that ended up in more than one assignment, with the
    /// number of assignments each appears in.
    pub duplicate_pairings: Vec<(H, usize)>,
}

impl<H> MatchOutcome<H> {
    pub fn matched_count(&self) -> usize {
        self.assignments.len()
    }
}

/// Match sources to targets.
///
/// `already_paired(source, target)` lets the caller veto pairs that are
/// already linked, so repeated runs do not pair the same objects twice.
pub fn match_descriptors<H, F>(
    sources: &[MeshDescriptor<H>],
    targets: &[MeshDescriptor<H>],
    threshold: f32,
    already_paired: F,
) -> MatchOutcome<H>
where
    H: Copy + Eq + Hash + Debug,
    F: Fn(H, H) -> bool,
{
    let mut consumed: HashSet<usize> = HashSet::new();
    let mut assignments = Vec::new();
    let mut unmatched_sources = Vec::new();

    for source in sources {
        let mut best: Option<(usize, f32)> = None;

        for (index, target) in targets.iter().enumerate() {
            if consumed.contains(&index) || target.vertex_count != source.vertex_count {
                continue;
            }
            let distance = math::distance(source.centroid, target.centroid);
            if !(distance <= threshold) {
                continue;
            }
            if best.map_or(false, |(_, best_distance)| distance >= best_distance) {
                continue;
            }
            if already_paired(source.handle, target.handle) {
                continue;
            }
            best = Some((index, distance));
        }

        match best {
            Some((index, distance)) => {
                consumed.insert(index);
                let target = targets[index].handle;
                log::info!(
                    "Matched {:?} -> {:?} (distance {:.6})",
                    source.handle,
                    target,
                    distance
                );
                assignments.push(MatchAssignment {
                    source: source.handle,
                    target,
                    distance,
                });
            }
            None => {
                log::warn!("No match found for {:?}", source.handle);
                unmatched_sources.push(source.handle);
            }
        }
    }

    let duplicate_pairings = find_duplicate_pairings(&assignments);
    for (handle, count) in &duplicate_pairings {
        log::warn!("{:?} appears in {} pairings", handle, count);
    }

    MatchOutcome {
        assignments,
        unmatched_sources,
        duplicate_pairings,
    }
}

/// Match without any pre-existing pairings.
pub fn match_meshes<H>(
    sources: &[MeshDescriptor<H>],
    targets: &[MeshDescriptor<H>],
    threshold: f32,
) -> MatchOutcome<H>
where
    H: Copy + Eq + Hash + Debug,
{
    match_descriptors(sources, targets, threshold, |_, _| false)
}

/// Handles that occur in more than one assignment, in first-seen order,
/// with their assignment counts.
pub fn find_duplicate_pairings<H>(assignments: &[MatchAssignment<H>]) -> Vec<(H, usize)>
where
    H: Copy + Eq + Hash,
{
    let mut counts: HashMap<H, usize> = HashMap::new();
    let mut order = Vec::new();
    for assignment in assignments {
        for handle in [assignment.source, assignment.target] {
            let count = counts.entry(handle).or_insert(0);
            if *count == 0 {
                order.push(handle);
            }
            *count += 1;
        }
    }
    order
        .into_iter()
        .filter_map(|h| {
            let count = counts[&h];
            (count > 1).then_some((h, count))
        })
        .collect()
}
