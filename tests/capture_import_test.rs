// Capture import against recorded snapshots on disk

use std::fs;

use rdac_tools_lib::capture::output::LOG_FILE_NAME;
use rdac_tools_lib::capture::snapshot::SnapshotSource;
use rdac_tools_lib::capture::{import_capture, CaptureOutput, EventFilter};
use rdac_tools_lib::error::ImportError;
use rdac_tools_lib::scene::Scene;
use rdac_tools_lib::settings::Settings;
use rdac_tools_lib::validation::report::RunReport;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

#[test]
fn imports_every_indexed_draw() {
    let tmp = TempDir::new().unwrap();
    let capture = common::write_capture(tmp.path(), "frame", &common::sample_snapshot());
    let settings = Settings::default();
    let mut scene = Scene::new();
    let mut report = RunReport::new();

    let summary = import_capture(
        &SnapshotSource,
        &capture,
        &mut scene,
        &EventFilter::All,
        &settings,
        &mut report,
    )
    .unwrap();

    assert_eq!(summary.actions_seen, 3);
    assert_eq!(summary.actions_processed, 3);
    assert_eq!(summary.meshes_created.len(), 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].0, 30);
    assert_eq!(report.with_code("MESH_SKIPPED").count(), 1);

    let object = scene.object_by_name("Mesh_20").unwrap();
    assert!(scene.in_collection("RDC", object));
    let mesh = scene.object(object).unwrap().mesh.as_ref().unwrap();
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.faces.len(), 2);

    let material = scene.primary_material(object).unwrap();
    assert_eq!(scene.material(material).unwrap().name, "Material_20");

    // Textures and materials are still produced for a skipped draw.
    assert!(scene.material_by_name("Material_30").is_some());
}

#[test]
fn exports_each_texture_once() {
    let tmp = TempDir::new().unwrap();
    let capture = common::write_capture(tmp.path(), "frame", &common::sample_snapshot());
    let mut scene = Scene::new();
    let mut report = RunReport::new();

    let summary = import_capture(
        &SnapshotSource,
        &capture,
        &mut scene,
        &EventFilter::All,
        &Settings::default(),
        &mut report,
    )
    .unwrap();
    assert_eq!(summary.textures_exported, 1);
    assert_eq!(summary.textures_reused, 2);

    let output = CaptureOutput::new(&capture).unwrap();
    let exported = output.texture_path(common::DIFFUSE_TEXTURE, "txDiffuse");
    assert_eq!(exported, tmp.path().join("frame").join("resourceFile_900_txDiffuse.dds"));
    assert_eq!(fs::read(&exported).unwrap(), b"DDS fake payload");

    // Cubemap slots are never exported.
    let files: Vec<_> = fs::read_dir(output.dir()).unwrap().collect();
    assert_eq!(files.len(), 1);

    let material = scene.material_by_name("Material_10").unwrap();
    let graph = scene.material(material).unwrap().node_tree.as_ref().unwrap();
    let image = scene.image(graph.image(0).unwrap()).unwrap();
    assert_eq!((image.width, image.height), (256, 256));
}

#[test]
fn event_window_limits_the_import() {
    let tmp = TempDir::new().unwrap();
    let capture = common::write_capture(tmp.path(), "frame", &common::sample_snapshot());
    let filter = EventFilter::from_bounds(Some(15), Some(25), Some("1-100")).unwrap();
    let mut scene = Scene::new();
    let mut report = RunReport::new();

    let summary = import_capture(
        &SnapshotSource,
        &capture,
        &mut scene,
        &filter,
        &Settings::default(),
        &mut report,
    )
    .unwrap();
    assert_eq!(summary.actions_processed, 1);
    assert!(scene.object_by_name("Mesh_20").is_some());
    assert!(scene.object_by_name("Mesh_10").is_none());
    assert!(report.is_empty());
}

#[test]
fn ranges_apply_when_the_window_is_open() {
    let tmp = TempDir::new().unwrap();
    let capture = common::write_capture(tmp.path(), "frame", &common::sample_snapshot());
    let filter = EventFilter::from_bounds(None, Some(-1), Some("1-10;25-40")).unwrap();
    let mut scene = Scene::new();
    let mut report = RunReport::new();

    let summary = import_capture(
        &SnapshotSource,
        &capture,
        &mut scene,
        &filter,
        &Settings::default(),
        &mut report,
    )
    .unwrap();
    assert_eq!(summary.actions_processed, 2);
    assert_eq!(summary.meshes_created.len(), 1);
    assert!(scene.object_by_name("Mesh_10").is_some());
}

#[test]
fn second_import_gets_suffixed_names() {
    let tmp = TempDir::new().unwrap();
    let capture = common::write_capture(tmp.path(), "frame", &common::sample_snapshot());
    let mut scene = Scene::new();
    let mut report = RunReport::new();
    let filter = EventFilter::Window { min: 10, max: 10 };

    for _ in 0..2 {
        import_capture(
            &SnapshotSource,
            &capture,
            &mut scene,
            &filter,
            &Settings::default(),
            &mut report,
        )
        .unwrap();
    }
    assert!(scene.object_by_name("Mesh_10").is_some());
    assert!(scene.object_by_name("Mesh_10.001").is_some());
    // The material is shared between both imports.
    assert_eq!(scene.materials().count(), 1);
}

#[test]
fn unreadable_capture_is_a_replay_failure() {
    let tmp = TempDir::new().unwrap();
    let capture = tmp.path().join("broken.json");
    fs::write(&capture, "{ not json").unwrap();
    let mut scene = Scene::new();
    let mut report = RunReport::new();

    let result = import_capture(
        &SnapshotSource,
        &capture,
        &mut scene,
        &EventFilter::All,
        &Settings::default(),
        &mut report,
    );
    assert!(matches!(result, Err(ImportError::ReplayFailure(_))));
    assert!(scene.objects().next().is_none());
}

#[test]
fn log_lives_in_the_capture_output_dir() {
    let output = CaptureOutput::new(std::path::Path::new("/captures/session_01.rdc")).unwrap();
    assert_eq!(
        output.log_path(),
        std::path::Path::new("/captures/session_01").join(LOG_FILE_NAME)
    );
}
