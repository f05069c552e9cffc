//! Running the matcher against scene collections and recording the
//! result as copy-transform markers.

use super::{match_descriptors, MatchOutcome, MeshDescriptor};
use crate::buffer::DecodeLimits;
use crate::error::{ImportError, Result};
use crate::mesh_processing::analysis::analyze_mesh;
use crate::scene::{ConstraintKind, ObjectId, Scene};
use crate::validation::report::RunReport;
use crate::validation::rules;

/// Descriptor of a mesh object, `None` for objects without mesh data.
pub fn describe_object(scene: &Scene, id: ObjectId) -> Option<MeshDescriptor<ObjectId>> {
    let mesh = scene.object(id)?.mesh.as_ref()?;
    let analysis = analyze_mesh(mesh, &DecodeLimits::default());
    Some(MeshDescriptor {
        handle: id,
        vertex_count: analysis.vertex_count,
        centroid: analysis.centroid,
    })
}

/// Descriptors of every mesh object in a collection, in link order.
pub fn describe_collection(scene: &Scene, collection: &str) -> Result<Vec<MeshDescriptor<ObjectId>>> {
    if scene.collection(collection).is_none() {
        return Err(ImportError::MissingReference(format!(
            "collection '{}'",
            collection
        )));
    }
    Ok(scene
        .collection_objects(collection)
        .into_iter()
        .filter_map(|id| describe_object(scene, id))
        .collect())
}

/// Whether either object already carries a marker pointing at the other.
pub fn has_marker_between(scene: &Scene, a: ObjectId, b: ObjectId) -> bool {
    let points_at = |owner: ObjectId, target: ObjectId| {
        scene
            .object(owner)
            .map(|o| o.markers().any(|m| m.target == Some(target)))
            .unwrap_or(false)
    };
    points_at(a, b) || points_at(b, a)
}

/// Objects in a collection carrying more than one marker, with their counts.
pub fn find_objects_with_multiple_markers(scene: &Scene, collection: &str) -> Vec<(ObjectId, usize)> {
    scene
        .collection_objects(collection)
        .into_iter()
        .filter_map(|id| {
            let count = scene.object(id)?.markers().count();
            (count > 1).then_some((id, count))
        })
        .collect()
}

/// Report every object of `collection` carrying more than one marker.
pub fn report_multiple_markers(scene: &Scene, collection: &str, report: &mut RunReport) -> Vec<ObjectId> {
    let duplicates = find_objects_with_multiple_markers(scene, collection);
    for (id, count) in &duplicates {
        let name = scene.object_name(*id).unwrap_or_default();
        log::warn!("{} has {} copy-transform markers", name, count);
        report.add(rules::duplicate_markers(name, *count));
    }
    duplicates.into_iter().map(|(id, _)| id).collect()
}

/// Match capture meshes (sources) against reference meshes (targets) and
/// add a copy-transform marker on each matched source.
pub fn match_collections(
    scene: &mut Scene,
    source_collection: &str,
    target_collection: &str,
    threshold: f32,
    report: &mut RunReport,
) -> Result<MatchOutcome<ObjectId>> {
    if let Some(item) = rules::check_threshold(threshold) {
        report.add(item.clone());
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ImportError::Config(item.message));
        }
    }

    let sources = describe_collection(scene, source_collection)?;
    let targets = describe_collection(scene, target_collection)?;
    log::info!(
        "Matching {} capture meshes against {} reference meshes (threshold {})",
        sources.len(),
        targets.len(),
        threshold
    );

    let outcome = {
        let view: &Scene = scene;
        match_descriptors(&sources, &targets, threshold, |s, t| {
            has_marker_between(view, s, t)
        })
    };

    for assignment in &outcome.assignments {
        scene.add_constraint(
            assignment.source,
            ConstraintKind::CopyTransforms,
            Some(assignment.target),
        )?;
    }
    for id in &outcome.unmatched_sources {
        report.add(rules::unmatched_mesh(scene.object_name(*id).unwrap_or_default()));
    }
    report_duplicate_pairings(scene, &outcome.duplicate_pairings, report);

    report_multiple_markers(scene, source_collection, report);
    log::info!(
        "{} matched, {} unmatched",
        outcome.assignments.len(),
        outcome.unmatched_sources.len()
    );
    Ok(outcome)
}

/// One report item per handle paired more than once, carrying how many
/// pairings it appears in.
pub fn report_duplicate_pairings(scene: &Scene, duplicates: &[(ObjectId, usize)], report: &mut RunReport) {
    for (id, count) in duplicates {
        report.add(rules::duplicate_markers(
            scene.object_name(*id).unwrap_or_default(),
            *count,
        ));
    }
}

/// Pair two objects by hand: `active` gets a marker targeting `target`.
pub fn manual_match(scene: &mut Scene, active: &str, target: &str) -> Result<String> {
    let active_id = scene
        .object_by_name(active)
        .ok_or_else(|| ImportError::MissingReference(format!("object '{}'", active)))?;
    let target_id = scene
        .object_by_name(target)
        .ok_or_else(|| ImportError::MissingReference(format!("object '{}'", target)))?;
    if active_id == target_id {
        return Err(ImportError::Config(
            "an object cannot be matched with itself".to_string(),
        ));
    }
    let name = scene.add_constraint(active_id, ConstraintKind::CopyTransforms, Some(target_id))?;
    log::info!("Added {} on {} targeting {}", name, active, target);
    Ok(name)
}

/// Hide or show every marked object of a collection together with its targets.
/// Returns how many objects changed.
pub fn set_marker_visibility(scene: &mut Scene, collection: &str, hidden: bool) -> usize {
    let mut affected = vec![];
    for id in scene.collection_objects(collection) {
        let Some(object) = scene.object(id) else {
            continue;
        };
        let targets: Vec<ObjectId> = object.markers().filter_map(|m| m.target).collect();
        if targets.is_empty() {
            continue;
        }
        affected.push(id);
        affected.extend(targets);
    }

    let mut changed = 0;
    for id in affected {
        if scene.object(id).map(|o| o.hidden != hidden).unwrap_or(false) {
            scene.set_hidden(id, hidden);
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Mesh;
    use cgmath::Vector3;

    fn cloud(count: usize, offset: f32) -> Mesh {
        let positions = (0..count)
            .map(|i| Vector3::new(offset + (i % 3) as f32 - 1.0, (i % 5) as f32 - 2.0, 0.0))
            .collect();
        Mesh::new(positions, vec![])
    }

    #[test]
    fn matches_and_marks_sources() {
        let mut scene = Scene::new();
        let target = scene.add_object("body", Some(cloud(30, 0.0)));
        let other = scene.add_object("wheel", Some(cloud(12, 5.0)));
        let source = scene.add_object("Mesh_1", Some(cloud(30, 0.01)));
        let lonely = scene.add_object("Mesh_2", Some(cloud(31, 0.0)));
        scene.link_object("kn5", target);
        scene.link_object("kn5", other);
        scene.link_object("RDC", source);
        scene.link_object("RDC", lonely);

        let mut report = RunReport::new();
        let outcome = match_collections(&mut scene, "RDC", "kn5", 0.5, &mut report).unwrap();

        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.assignments[0].source, source);
        assert_eq!(outcome.assignments[0].target, target);
        assert!(has_marker_between(&scene, source, target));
        assert_eq!(outcome.unmatched_sources, vec![lonely]);
        assert_eq!(report.with_code("MATCH_UNMATCHED").count(), 1);
    }

    #[test]
    fn second_run_does_not_duplicate_markers() {
        let mut scene = Scene::new();
        let target = scene.add_object("body", Some(cloud(9, 0.0)));
        let source = scene.add_object("Mesh_1", Some(cloud(9, 0.0)));
        scene.link_object("kn5", target);
        scene.link_object("RDC", source);

        let mut report = RunReport::new();
        match_collections(&mut scene, "RDC", "kn5", 0.5, &mut report).unwrap();
        let again = match_collections(&mut scene, "RDC", "kn5", 0.5, &mut report).unwrap();
        assert!(again.assignments.is_empty());
        assert_eq!(scene.object(source).unwrap().markers().count(), 1);
        assert_eq!(report.with_code("MARKER_DUPLICATE").count(), 0);
    }

    #[test]
    fn manual_match_and_duplicate_detection() {
        let mut scene = Scene::new();
        let a = scene.add_object("a", Some(cloud(3, 0.0)));
        scene.add_object("b", Some(cloud(3, 0.0)));
        scene.add_object("c", Some(cloud(3, 0.0)));
        scene.link_object("RDC", a);

        manual_match(&mut scene, "a", "b").unwrap();
        manual_match(&mut scene, "a", "c").unwrap();
        assert!(manual_match(&mut scene, "a", "a").is_err());
        assert!(manual_match(&mut scene, "a", "zzz").is_err());

        let mut report = RunReport::new();
        let duplicates = report_multiple_markers(&scene, "RDC", &mut report);
        assert_eq!(duplicates, vec![a]);
        assert_eq!(report.with_code("MARKER_DUPLICATE").count(), 1);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut scene = Scene::new();
        scene.ensure_collection("RDC");
        scene.ensure_collection("kn5");
        let mut report = RunReport::new();
        let result = match_collections(&mut scene, "RDC", "kn5", -1.0, &mut report);
        assert!(matches!(result, Err(ImportError::Config(_))));
    }

    #[test]
    fn missing_collection() {
        let mut scene = Scene::new();
        scene.ensure_collection("RDC");
        let mut report = RunReport::new();
        let result = match_collections(&mut scene, "RDC", "kn5", 0.5, &mut report);
        assert!(matches!(result, Err(ImportError::MissingReference(_))));
    }

    #[test]
    fn visibility_toggles_pairs() {
        let mut scene = Scene::new();
        let target = scene.add_object("body", None);
        let source = scene.add_object("Mesh_1", None);
        let plain = scene.add_object("Mesh_2", None);
        scene.link_object("RDC", source);
        scene.link_object("RDC", plain);
        scene
            .add_constraint(source, ConstraintKind::CopyTransforms, Some(target))
            .unwrap();

        assert_eq!(set_marker_visibility(&mut scene, "RDC", true), 2);
        assert!(scene.object(target).unwrap().hidden);
        assert!(!scene.object(plain).unwrap().hidden);
        assert_eq!(set_marker_visibility(&mut scene, "RDC", true), 0);
        assert_eq!(set_marker_visibility(&mut scene, "RDC", false), 2);
    }

    #[test]
    fn duplicate_pairings_report_their_count() {
        let mut scene = Scene::new();
        let target = scene.add_object("body", None);
        let mut report = RunReport::new();
        report_duplicate_pairings(&scene, &[(target, 3)], &mut report);
        let items: Vec<_> = report.with_code("MARKER_DUPLICATE").collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].message, "body carries 3 copy-transform markers");
    }
}
