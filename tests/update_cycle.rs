mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use bgstatus::apply::{Mechanism, ScreenApplier};
use bgstatus::image_ops;
use bgstatus::settings::Settings;
use bgstatus::source::{Probe, SourceOrigin, BACKUP_FILE};
use bgstatus::status::{StaticLines, StatusSource};
use bgstatus::update::Updater;
use common::{outputs, write_png, BlockFace};
use tempfile::tempdir;

struct Failing;

impl StatusSource for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn lines(&self) -> anyhow::Result<Vec<String>> {
        Err(anyhow!("query timed out"))
    }
}

fn accepting() -> ScreenApplier {
    ScreenApplier::new(vec![Mechanism::new("accept", |_| Ok(()))])
}

fn updater(data_dir: &Path, probes: Vec<Probe>) -> Updater {
    Updater::new(data_dir, Settings::default())
        .with_probes(probes)
        .with_sources(
            StaticLines::new(["Services Status", "", "Running: 97 / 210"]),
            StaticLines::new(["WS-042", "Windows 11 Pro 24H2", "16 GB RAM"]),
        )
        .with_display((1920, 1080))
        .with_applier(accepting())
        .with_typeface(BlockFace)
}

fn fixed(path: PathBuf) -> Probe {
    Probe::new("fixture", move || Ok(Some(path.clone())))
}

#[test]
fn repeated_runs_render_from_the_pristine_backup() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let background = dir.path().join("background.png");
    write_png(&background, 640, 360, 30);

    let first = updater(&data, vec![fixed(background.clone())]).run().unwrap();
    assert!(matches!(first.origin, SourceOrigin::Discovered { .. }));
    assert!(data.join(BACKUP_FILE).is_file());
    let first_image = image_ops::load_image(&first.output).unwrap();

    // The live background now carries our panels; it must not be reused.
    fs::copy(&first.output, &background).unwrap();

    let second = updater(&data, vec![fixed(background)]).run().unwrap();
    assert_eq!(second.origin, SourceOrigin::Backup(data.join(BACKUP_FILE)));
    assert_ne!(first.output, second.output);
    let second_image = image_ops::load_image(&second.output).unwrap();
    assert_eq!(first_image, second_image);
}

#[test]
fn only_the_newest_output_is_kept() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path()).unwrap();
    fs::write(dir.path().join("loginscreen_1000.jpg"), b"old").unwrap();
    fs::write(dir.path().join("current_loginscreen.jpg"), b"legacy").unwrap();

    let outcome = updater(dir.path(), Vec::new()).run().unwrap();

    let name = outcome.output.file_name().unwrap().to_str().unwrap().to_string();
    assert_eq!(outputs(dir.path()), vec![name]);
    assert!(!dir.path().join("current_loginscreen.jpg").exists());
}

#[test]
fn missing_background_uses_a_synthetic_canvas_without_backup() {
    let dir = tempdir().unwrap();
    let settings = Settings {
        fallback_width: 800,
        fallback_height: 450,
        ..Settings::default()
    };
    let outcome = Updater::new(dir.path(), settings)
        .with_probes(vec![Probe::new("empty", || Ok(None))])
        .with_sources(StaticLines::new(["left"]), StaticLines::new(["right"]))
        .with_display((1920, 1080))
        .with_applier(accepting())
        .with_typeface(BlockFace)
        .run()
        .unwrap();

    assert_eq!(outcome.origin, SourceOrigin::Synthetic);
    assert!(!dir.path().join(BACKUP_FILE).exists());
    let rendered = image_ops::load_image(&outcome.output).unwrap();
    assert_eq!(rendered.dimensions(), (800, 450));
}

#[test]
fn failed_apply_leaves_the_render_on_disk() {
    let dir = tempdir().unwrap();
    let result = updater(dir.path(), Vec::new())
        .with_applier(ScreenApplier::new(vec![
            Mechanism::new("policy", |_| Err(anyhow!("access denied"))),
            Mechanism::new("oobe", |_| Err(anyhow!("read-only"))),
        ]))
        .run();

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("read-only"));
    assert_eq!(outputs(dir.path()).len(), 1);
}

#[test]
fn applier_receives_the_saved_output() {
    let dir = tempdir().unwrap();
    let seen = Arc::new(Mutex::new(None));
    let record = Arc::clone(&seen);
    let outcome = updater(dir.path(), Vec::new())
        .with_applier(ScreenApplier::new(vec![Mechanism::new("record", move |p| {
            *record.lock().unwrap() = Some(p.to_path_buf());
            Ok(())
        })]))
        .run()
        .unwrap();

    let applied = seen.lock().unwrap().clone().unwrap();
    assert!(applied.is_absolute());
    assert_eq!(applied.file_name(), outcome.output.file_name());
    assert_eq!(outcome.report.succeeded().collect::<Vec<_>>(), vec!["record"]);
}

#[test]
fn services_failure_only_empties_the_left_panel() {
    let dir = tempdir().unwrap();
    let outcome = updater(dir.path(), Vec::new())
        .with_sources(Failing, StaticLines::new(["WS-042"]))
        .run();
    assert!(outcome.is_ok());
}

#[test]
fn host_failure_aborts_before_writing() {
    let dir = tempdir().unwrap();
    let result = updater(dir.path(), Vec::new())
        .with_sources(StaticLines::new(["ok"]), Failing)
        .run();
    assert!(result.is_err());
    assert!(outputs(dir.path()).is_empty());
}
