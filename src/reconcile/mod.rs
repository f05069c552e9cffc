//! Merges matched capture meshes into the reference model.
//!
//! Every capture mesh carrying a copy-transform marker is paired with the
//! marker's target. Relationships are snapshotted before anything is
//! touched, then each pair is processed on its own: a failing pair is
//! reported and the batch moves on.

pub mod material;

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::{ImportError, Result};
use crate::matcher::scene::report_multiple_markers;
use crate::scene::hierarchy::{reparent_keep_transform, resolve_suffixed_names};
use crate::scene::{ObjectId, Scene};
use crate::settings::Settings;
use crate::validation::report::RunReport;
use crate::validation::rules;

pub use material::{remap_material, MaterialRemap, MaterialState};

/// Last step a pair got through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PairStage {
    Unprocessed,
    Snapshotted,
    TransformCopied,
    Remapped,
    Reparented,
    Relocated,
    Finalized,
}

impl std::fmt::Display for PairStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PairStage::Unprocessed => "unprocessed",
            PairStage::Snapshotted => "snapshot",
            PairStage::TransformCopied => "transform copy",
            PairStage::Remapped => "material remap",
            PairStage::Reparented => "reparent",
            PairStage::Relocated => "relocate",
            PairStage::Finalized => "finalize",
        };
        write!(f, "{}", label)
    }
}

/// Captured before mutation. Handles are resolved through the scene on use,
/// so a target deleted by an earlier pair shows up as `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipRecord {
    pub source: ObjectId,
    pub target: ObjectId,
    pub marker_name: String,
    pub source_name: String,
    pub target_name: String,
    pub target_parent: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub source_collection: String,
    pub destination_collection: String,
    /// Hide superseded reference objects instead of deleting them.
    pub preserve_targets: bool,
    pub old_suffix: String,
}

impl ReconcileOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            source_collection: settings.collections.capture.clone(),
            destination_collection: settings.collections.reference.clone(),
            preserve_targets: settings.preserve_originals,
            old_suffix: settings.old_material_suffix.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PairOutcome {
    pub record: RelationshipRecord,
    pub stage: PairStage,
    pub material: Option<MaterialRemap>,
    /// Name the capture object ended up with.
    pub final_name: Option<String>,
    pub error: Option<String>,
}

impl PairOutcome {
    pub fn is_complete(&self) -> bool {
        self.stage == PairStage::Finalized
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileSummary {
    pub pairs: Vec<PairOutcome>,
    pub duplicate_markers: Vec<ObjectId>,
    pub renamed_suffixes: Vec<(String, String)>,
}

impl ReconcileSummary {
    pub fn completed(&self) -> usize {
        self.pairs.iter().filter(|p| p.is_complete()).count()
    }

    pub fn failed(&self) -> usize {
        self.pairs.len() - self.completed()
    }
}

/// Snapshot every marked mesh in `collection`. Markers without a live
/// target are reported and left alone.
pub fn snapshot_relationships(scene: &Scene, collection: &str, report: &mut RunReport) -> Vec<RelationshipRecord> {
    let mut records = vec![];
    for id in scene.collection_objects(collection) {
        let Some(object) = scene.object(id) else {
            continue;
        };
        if !object.is_mesh() {
            continue;
        }
        let Some(marker) = object.markers().next() else {
            log::debug!("No copy-transform marker on {}, skipping", object.name);
            continue;
        };
        let Some((target, target_object)) = marker
            .target
            .and_then(|t| scene.object(t).map(|o| (t, o)))
        else {
            log::warn!("No target found for the marker on {}", object.name);
            report.add(rules::marker_without_target(&object.name));
            continue;
        };

        records.push(RelationshipRecord {
            source: id,
            target,
            marker_name: marker.name.clone(),
            source_name: object.name.clone(),
            target_name: target_object.name.clone(),
            target_parent: scene.parent_of(target),
        });
    }
    records
}

/// Run the whole merge over the source collection.
pub fn reconcile(scene: &mut Scene, options: &ReconcileOptions, report: &mut RunReport) -> Result<ReconcileSummary> {
    for name in [&options.source_collection, &options.destination_collection] {
        if scene.collection(name).is_none() {
            return Err(ImportError::MissingReference(format!("collection '{}'", name)));
        }
    }

    let mut summary = ReconcileSummary {
        duplicate_markers: report_multiple_markers(scene, &options.source_collection, report),
        ..Default::default()
    };

    let mut records = snapshot_relationships(scene, &options.source_collection, report);
    records.sort_by_cached_key(|r| hierarchy_depth(scene, r.target));
    log::info!("Reconciling {} pairs", records.len());

    // Finished targets and the capture object that took each one's place.
    let mut replaced: HashMap<ObjectId, ObjectId> = HashMap::new();
    for record in records {
        let outcome = process_pair(scene, record, options, &replaced, report);
        if outcome.is_complete() {
            replaced
                .entry(outcome.record.target)
                .or_insert(outcome.record.source);
        }
        if let Some(error) = &outcome.error {
            log::error!(
                "{} failed at {}: {}",
                outcome.record.source_name,
                outcome.stage,
                error
            );
            report.add(rules::pair_failed(
                &outcome.record.source_name,
                &outcome.stage.to_string(),
                error,
            ));
        }
        summary.pairs.push(outcome);
    }

    summary.renamed_suffixes = resolve_suffixed_names(scene);
    log::info!(
        "{} pairs reconciled, {} failed",
        summary.completed(),
        summary.failed()
    );
    Ok(summary)
}

/// Number of ancestors above `id`. Parents sort before their children so a
/// child pair can follow its parent's replacement.
fn hierarchy_depth(scene: &Scene, id: ObjectId) -> usize {
    let mut seen = HashSet::new();
    let mut current = scene.parent_of(id);
    while let Some(parent) = current {
        if !seen.insert(parent) {
            break;
        }
        current = scene.parent_of(parent);
    }
    seen.len()
}

fn process_pair(
    scene: &mut Scene,
    record: RelationshipRecord,
    options: &ReconcileOptions,
    replaced: &HashMap<ObjectId, ObjectId>,
    report: &mut RunReport,
) -> PairOutcome {
    let mut outcome = PairOutcome {
        record,
        stage: PairStage::Snapshotted,
        material: None,
        final_name: None,
        error: None,
    };
    if let Err(e) = run_stages(scene, &mut outcome, options, replaced, report) {
        outcome.error = Some(e.to_string());
    }
    outcome
}

/// Advances `outcome.stage` as each step lands.
fn run_stages(
    scene: &mut Scene,
    outcome: &mut PairOutcome,
    options: &ReconcileOptions,
    replaced: &HashMap<ObjectId, ObjectId>,
    report: &mut RunReport,
) -> Result<()> {
    let record = outcome.record.clone();
    let source = record.source;

    scene.apply_constraint(source, &record.marker_name)?;
    outcome.stage = PairStage::TransformCopied;

    let remap = remap_material(scene, source, record.target, &options.old_suffix);
    if let MaterialRemap::Skipped(reason) = &remap {
        log::warn!("Material remap for {} skipped: {}", record.source_name, reason);
        report.add(rules::material_skipped(&record.source_name, reason));
    }
    outcome.material = Some(remap);
    let final_name = scene
        .rename_object(source, &record.target_name)
        .ok_or_else(|| ImportError::MissingReference(format!("object '{}'", record.source_name)))?;
    log::info!("Renamed {} to {}", record.source_name, final_name);
    outcome.final_name = Some(final_name);
    outcome.stage = PairStage::Remapped;

    let replacement = record
        .target_parent
        .and_then(|p| replaced.get(&p).copied())
        .filter(|s| scene.contains_object(*s));
    let parent = match record.target_parent {
        Some(_) if replacement.is_some() => replacement,
        Some(p) if scene.contains_object(p) => Some(p),
        Some(_) => {
            log::warn!(
                "Original parent of {} no longer exists, leaving it unparented",
                record.target_name
            );
            report.add(rules::missing_reference(
                &record.target_name,
                "original parent no longer exists",
            ));
            None
        }
        None => None,
    };
    reparent_keep_transform(scene, source, parent)?;
    outcome.stage = PairStage::Reparented;

    scene.link_object(&options.destination_collection, source);
    scene.unlink_object(&options.source_collection, source);
    outcome.stage = PairStage::Relocated;

    if options.preserve_targets {
        scene.set_hidden(record.target, true);
    } else if scene.remove_object(record.target).is_some() {
        log::info!("Deleted the target object '{}'", record.target_name);
    } else {
        log::warn!(
            "Failed to delete target object '{}', as it no longer exists",
            record.target_name
        );
    }
    outcome.stage = PairStage::Finalized;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math;
    use crate::scene::{ConstraintKind, Mesh};
    use cgmath::{Matrix4, Vector3};

    fn options(preserve: bool) -> ReconcileOptions {
        ReconcileOptions::from_settings(&Settings {
            preserve_originals: preserve,
            ..Settings::default()
        })
    }

    fn mesh() -> Option<Mesh> {
        Some(Mesh::new(vec![Vector3::new(0.0, 0.0, 0.0)], vec![]))
    }

    struct Fixture {
        scene: Scene,
        source: ObjectId,
        target: ObjectId,
        parent: ObjectId,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let parent = scene.add_object("car_root", None);
        scene.object_mut(parent).unwrap().matrix_basis =
            Matrix4::from_translation(Vector3::new(10.0, 0.0, 0.0));
        let target = scene.add_object("door", mesh());
        scene.set_parent(target, Some(parent)).unwrap();
        scene.object_mut(target).unwrap().matrix_basis =
            Matrix4::from_translation(Vector3::new(0.0, 2.0, 0.0));
        let source = scene.add_object("Mesh_12", mesh());
        scene.link_object("kn5", parent);
        scene.link_object("kn5", target);
        scene.link_object("RDC", source);
        scene
            .add_constraint(source, ConstraintKind::CopyTransforms, Some(target))
            .unwrap();
        Fixture {
            scene,
            source,
            target,
            parent,
        }
    }

    #[test]
    fn stage_order() {
        assert!(PairStage::Snapshotted < PairStage::TransformCopied);
        assert!(PairStage::Relocated < PairStage::Finalized);
    }

    #[test]
    fn snapshot_does_not_mutate() {
        let f = fixture();
        let mut report = RunReport::new();
        let records = snapshot_relationships(&f.scene, "RDC", &mut report);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_name, "door");
        assert_eq!(records[0].target_parent, Some(f.parent));
        assert_eq!(f.scene.object(f.source).unwrap().markers().count(), 1);
    }

    #[test]
    fn full_pair_takes_over_reference() {
        let mut f = fixture();
        let expected_world = f.scene.world_matrix(f.target).unwrap();
        let mut report = RunReport::new();

        let summary = reconcile(&mut f.scene, &options(false), &mut report).unwrap();
        assert_eq!(summary.completed(), 1);
        assert!(!f.scene.contains_object(f.target));

        let source = f.scene.object(f.source).unwrap();
        assert_eq!(source.name, "door");
        assert_eq!(source.parent, Some(f.parent));
        assert_eq!(source.markers().count(), 0);
        let world = f.scene.world_matrix(f.source).unwrap();
        assert!(math::matrices_approx_eq(&world, &expected_world, 1e-5));
        assert!(f.scene.in_collection("kn5", f.source));
        assert!(!f.scene.in_collection("RDC", f.source));
    }

    #[test]
    fn preserve_hides_target() {
        let mut f = fixture();
        let mut report = RunReport::new();
        let summary = reconcile(&mut f.scene, &options(true), &mut report).unwrap();
        assert_eq!(summary.completed(), 1);
        assert!(f.scene.object(f.target).unwrap().hidden);
        assert_eq!(f.scene.object_name(f.source), Some("door.001"));
    }

    #[test]
    fn missing_collection_is_an_error() {
        let mut scene = Scene::new();
        scene.ensure_collection("RDC");
        let mut report = RunReport::new();
        let result = reconcile(&mut scene, &options(false), &mut report);
        assert!(matches!(result, Err(ImportError::MissingReference(_))));
    }

    #[test]
    fn pair_with_deleted_target_is_not_snapshotted() {
        let mut f = fixture();
        f.scene.remove_object(f.target);
        let mut report = RunReport::new();
        let summary = reconcile(&mut f.scene, &options(false), &mut report).unwrap();
        assert!(summary.pairs.is_empty());
        assert_eq!(report.with_code("MARKER_NO_TARGET").count(), 1);
    }
}
