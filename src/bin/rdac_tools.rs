use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};

use rdac_tools_lib::capture::snapshot::SnapshotSource;
use rdac_tools_lib::capture::{import_capture, CaptureOutput, EventFilter};
use rdac_tools_lib::material_config::apply::apply_material_config;
use rdac_tools_lib::material_config::MaterialConfig;
use rdac_tools_lib::matcher::scene::{manual_match, match_collections, set_marker_visibility};
use rdac_tools_lib::reconcile::{reconcile, ReconcileOptions};
use rdac_tools_lib::scene::hierarchy::{rename_and_reparent_meshes, resolve_suffixed_names, write_tree};
use rdac_tools_lib::scene::reference::import_reference_gltf;
use rdac_tools_lib::scene::serialization::{load_or_new, load_scene_from_file, save_scene_to_file};
use rdac_tools_lib::scene::Scene;
use rdac_tools_lib::settings::Settings;
use rdac_tools_lib::validation::report::RunReport;

#[derive(Parser, Debug)]
#[command(name = "rdac-tools")]
#[command(about = "Import graphics-debugger captures and merge them into a reference model")]
#[command(version)]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Scene file the pipeline reads and writes
    #[arg(long, global = true, value_name = "PATH", default_value = "scene.json")]
    scene: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import meshes and textures from a capture snapshot
    Import {
        #[arg(long, value_name = "PATH")]
        capture: PathBuf,
        /// First event id of the window
        #[arg(long)]
        min: Option<u32>,
        /// Last event id of the window; negative means no window
        #[arg(long, allow_negative_numbers = true)]
        max: Option<i64>,
        /// Explicit ranges such as "1-200;500-685"
        #[arg(long)]
        ranges: Option<String>,
    },
    /// Import the converted reference model from glTF
    Reference {
        #[arg(long, value_name = "PATH")]
        gltf: PathBuf,
    },
    /// Give reference meshes their parent's name and drop the parents
    RenameReparent {
        /// Keep the old parents in their holding collection
        #[arg(long)]
        preserve: bool,
    },
    /// Pair capture meshes with reference meshes
    Match {
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Pair two objects by name
    ManualMatch {
        #[arg(long)]
        active: String,
        #[arg(long)]
        target: String,
    },
    /// Hide or show paired objects
    #[command(group(ArgGroup::new("visibility").required(true).args(["hide", "show"])))]
    Markers {
        #[arg(long)]
        hide: bool,
        #[arg(long)]
        show: bool,
    },
    /// Merge every paired capture mesh into the reference model
    Apply {
        /// Hide superseded reference objects instead of deleting them
        #[arg(long)]
        preserve: bool,
    },
    /// Apply a material config file
    Materials {
        #[arg(long, value_name = "PATH")]
        ini: PathBuf,
    },
    /// Strip ".001" suffixes where the base name is free
    CleanupSuffixes,
    /// Print collections and hierarchies
    Tree,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    match &cli.command {
        Command::Match {
            threshold: Some(threshold),
        } => settings.matching_threshold = *threshold,
        Command::RenameReparent { preserve: true } | Command::Apply { preserve: true } => {
            settings.preserve_originals = true
        }
        _ => {}
    }
    settings.validate()?;
    Ok(settings)
}

fn load_scene(path: &Path) -> anyhow::Result<Scene> {
    load_scene_from_file(path).with_context(|| format!("Failed to load scene {}", path.display()))
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = load_settings(cli)?;
    let mut report = RunReport::new();

    let mut scene = match &cli.command {
        Command::Import { .. } | Command::Reference { .. } => load_or_new(&cli.scene)
            .with_context(|| format!("Failed to load scene {}", cli.scene.display()))?,
        Command::Tree => {
            let scene = load_scene(&cli.scene)?;
            write_tree(&scene, std::io::stdout().lock())?;
            return Ok(());
        }
        _ => load_scene(&cli.scene)?,
    };

    match &cli.command {
        Command::Import {
            capture,
            min,
            max,
            ranges,
        } => {
            let filter = EventFilter::from_bounds(*min, *max, ranges.as_deref())?;
            let summary = import_capture(
                &SnapshotSource,
                capture,
                &mut scene,
                &filter,
                &settings,
                &mut report,
            )?;
            println!(
                "Imported {} meshes from {} of {} actions",
                summary.meshes_created.len(),
                summary.actions_processed,
                summary.actions_seen
            );
        }
        Command::Reference { gltf } => {
            let objects = import_reference_gltf(&mut scene, gltf, &settings.collections.reference)?;
            println!("Imported {} reference objects", objects.len());
        }
        Command::RenameReparent { .. } => {
            let summary = rename_and_reparent_meshes(
                &mut scene,
                &settings.collections.reference,
                &settings.collections.unused_parents,
                settings.preserve_originals,
            )?;
            println!(
                "Renamed {} meshes, moved {} parents, deleted {}",
                summary.renamed.len(),
                summary.moved_parents.len(),
                summary.deleted
            );
        }
        Command::Match { .. } => {
            let outcome = match_collections(
                &mut scene,
                &settings.collections.capture,
                &settings.collections.reference,
                settings.matching_threshold,
                &mut report,
            )?;
            println!(
                "Matched {} meshes, {} unmatched",
                outcome.matched_count(),
                outcome.unmatched_sources.len()
            );
        }
        Command::ManualMatch { active, target } => {
            let name = manual_match(&mut scene, active, target)?;
            println!("Added '{}' on {} targeting {}", name, active, target);
        }
        Command::Markers { hide, .. } => {
            let changed = set_marker_visibility(&mut scene, &settings.collections.capture, *hide);
            println!("Updated visibility of {} objects", changed);
        }
        Command::Apply { .. } => {
            let summary = reconcile(
                &mut scene,
                &ReconcileOptions::from_settings(&settings),
                &mut report,
            )?;
            println!(
                "Reconciled {} pairs, {} failed",
                summary.completed(),
                summary.failed()
            );
        }
        Command::Materials { ini } => {
            let (config, issues) = MaterialConfig::from_file(ini)
                .with_context(|| format!("Failed to read {}", ini.display()))?;
            for issue in &issues {
                report.add(issue.to_diagnostic());
            }
            let summary = apply_material_config(&mut scene, &config, ini, &settings, &mut report);
            println!(
                "Configured {} materials, {} unused, {} failed",
                summary.configured.len(),
                summary.unused.len(),
                summary.failed.len()
            );
        }
        Command::CleanupSuffixes => {
            let renamed = resolve_suffixed_names(&mut scene);
            println!("Renamed {} objects", renamed.len());
        }
        Command::Tree => {}
    }

    save_scene_to_file(&scene, &cli.scene)
        .with_context(|| format!("Failed to save scene {}", cli.scene.display()))?;
    print!("{}", report.render());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Command::Import { capture, .. } => CaptureOutput::new(capture).ok().map(|o| o.log_path()),
        _ => None,
    };
    if let Err(e) = rdac_tools_lib::logging::init(cli.verbose, log_file.as_deref()) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
