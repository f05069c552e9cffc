// Material config parsing and application against a scene

use std::path::Path;

use image::{ImageFormat, RgbaImage};
use insta::assert_snapshot;
use rdac_tools_lib::material_config::apply::apply_material_config;
use rdac_tools_lib::material_config::MaterialConfig;
use rdac_tools_lib::scene::{ColorSpace, Mesh, Scene};
use rdac_tools_lib::settings::Settings;
use rdac_tools_lib::shader::{NodeId, Socket};
use rdac_tools_lib::validation::report::RunReport;
use tempfile::TempDir;

const CONFIG: &str = "[HEADER]\n\
VERSION=3\n\
\n\
[MATERIAL_0]\n\
NAME=Paint\n\
SHADER=ksPerPixelNM_UVMult\n\
ALPHABLEND=0\n\
ALPHATEST=0\n\
RESCOUNT=2\n\
RES_0_TEXTURE=paint_d.png\n\
RES_1_TEXTURE=paint_nm.png\n\
\n\
[MATERIAL_1]\n\
NAME=Spare\n\
SHADER=ksPerPixel\n\
RESCOUNT=1\n\
garbage line\n";

fn write_png(dir: &Path, name: &str, size: u32) {
    std::fs::create_dir_all(dir).unwrap();
    RgbaImage::new(size, size)
        .save_with_format(dir.join(name), ImageFormat::Png)
        .unwrap();
}

/// Scene with a mesh using `Paint` and an orphan `Spare` material.
fn scene() -> Scene {
    let mut scene = Scene::new();
    let paint = scene.add_material("Paint");
    scene.add_material("Spare");
    let mut mesh = Mesh::new(vec![], vec![]);
    mesh.set_primary_material(paint);
    scene.add_object("body", Some(mesh));
    scene
}

fn run(dir: &Path, scene: &mut Scene) -> RunReport {
    let ini = dir.join("car.ini");
    std::fs::write(&ini, CONFIG).unwrap();
    write_png(&dir.join("texture"), "paint_d.png", 4);
    write_png(&dir.join("texture"), "paint_nm.png", 1);

    let (config, issues) = MaterialConfig::from_file(&ini).unwrap();
    let mut report = RunReport::new();
    for issue in &issues {
        report.add(issue.to_diagnostic());
    }
    apply_material_config(scene, &config, &ini, &Settings::default(), &mut report);
    report
}

#[test]
fn textures_are_wired_into_the_graph() {
    let tmp = TempDir::new().unwrap();
    let mut scene = scene();
    run(tmp.path(), &mut scene);

    let paint = scene.material_by_name("Paint").unwrap();
    let graph = scene.material(paint).unwrap().node_tree.as_ref().unwrap();
    assert!(graph.is_linked(
        NodeId::ImageTexture(0),
        Socket::Color,
        NodeId::PrincipledBsdf,
        Socket::BaseColor
    ));
    assert!(graph.is_linked(
        NodeId::ImageTexture(1),
        Socket::Color,
        NodeId::NormalMap,
        Socket::Color
    ));

    let diffuse = scene.image(graph.image(0).unwrap()).unwrap();
    assert_eq!(diffuse.name, "paint_d.png");
    assert_eq!(diffuse.colorspace, ColorSpace::Srgb);
    let normal = scene.image(graph.image(1).unwrap()).unwrap();
    assert_eq!(normal.colorspace, ColorSpace::NonColor);
    assert_eq!((normal.width, normal.height), (1, 1));

    let spare = scene.material_by_name("Spare").unwrap();
    assert!(scene.material(spare).unwrap().node_tree.is_none());
}

#[test]
fn applying_twice_keeps_one_image_per_texture() {
    let tmp = TempDir::new().unwrap();
    let mut scene = scene();
    run(tmp.path(), &mut scene);
    run(tmp.path(), &mut scene);
    assert_eq!(scene.images().count(), 2);
}

#[test]
fn report_after_material_pass() {
    let tmp = TempDir::new().unwrap();
    let mut scene = scene();
    let report = run(tmp.path(), &mut scene);
    assert_snapshot!(report.render());
}
