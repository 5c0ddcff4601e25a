//! `bgstatus` command line entry point.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use bgstatus::apply::ScreenApplier;
use bgstatus::image_ops;
use bgstatus::settings::{self, Settings};
use bgstatus::source::BackupStore;
use bgstatus::status::StaticLines;
use bgstatus::update::Updater;
use bgstatus::wallpaper::{self, StyleMode};

#[derive(Debug, Parser)]
#[command(name = "bgstatus", version, about = "System status overlay for the Windows login screen")]
struct Cli {
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding settings, the backup, and rendered images
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Append log records to this file
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render the status overlay and apply it to the login screen
    Update {
        /// Running at startup; restart LogonUI so the new image shows
        #[arg(long)]
        boot: bool,
    },
    /// Push an image, or a random image from a folder, to the screens
    Set {
        #[arg(value_name = "IMAGE_OR_DIR")]
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = Target::All)]
        target: Target,
        /// Desktop wallpaper style
        #[arg(long, value_enum)]
        style: Option<StyleMode>,
    },
    /// Forget the saved original background so it is rediscovered
    ResetBackup,
    /// Write settings.json with every key filled in and print it
    Config,
    /// Render the overlay to a file without applying it
    Preview {
        output: PathBuf,
        /// Display width to lay out for (defaults to the primary display)
        #[arg(long, requires = "height")]
        width: Option<u32>,
        #[arg(long, requires = "width")]
        height: Option<u32>,
        /// Replace the services panel with these lines (repeatable)
        #[arg(long = "left", value_name = "LINE")]
        left: Vec<String>,
        /// Replace the host panel with these lines (repeatable)
        #[arg(long = "right", value_name = "LINE")]
        right: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Login,
    Lock,
    Desktop,
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    bgstatus::logging::init(cli.verbose, cli.log_file.as_deref())?;

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => settings::data_dir()?,
    };
    let settings = settings::load(&data_dir);

    let result = match cli.command {
        Command::Update { boot } => update(&data_dir, settings, boot),
        Command::Set {
            path,
            target,
            style,
        } => set(&data_dir, &path, target, style),
        Command::ResetBackup => BackupStore::in_dir(&data_dir).invalidate(),
        Command::Config => config(&data_dir),
        Command::Preview {
            output,
            width,
            height,
            left,
            right,
        } => preview(&data_dir, settings, &output, width.zip(height), left, right),
    };
    if let Err(err) = &result {
        error!(error = %format!("{err:#}"), "command failed");
    }
    result
}

fn update(data_dir: &Path, settings: Settings, boot: bool) -> Result<()> {
    let outcome = Updater::new(data_dir, settings).boot(boot).run()?;
    info!(
        output = %outcome.output.display(),
        source = %outcome.origin,
        "login screen updated"
    );
    Ok(())
}

fn set(data_dir: &Path, path: &Path, target: Target, style: Option<StyleMode>) -> Result<()> {
    let image = if path.is_dir() {
        image_ops::pick_random(&image_ops::collect_images(path)?)?
    } else if image_ops::is_supported_image(path) {
        path.to_path_buf()
    } else {
        bail!("{} is not a supported image", path.display());
    };
    info!(image = %image.display(), ?target, "setting image");

    let mut failures = Vec::new();
    if matches!(target, Target::Login | Target::All) {
        if let Err(err) = ScreenApplier::login_screen().apply(&image) {
            failures.push(format!("login: {err}"));
        }
    }
    if matches!(target, Target::Lock | Target::All) {
        if let Err(err) = ScreenApplier::lock_screen().apply(&image) {
            failures.push(format!("lock: {err}"));
        }
    }
    if matches!(target, Target::Desktop | Target::All) {
        if let Err(err) = wallpaper::set_wallpaper(&image, data_dir, style) {
            failures.push(format!("desktop: {err:#}"));
        }
    }
    if !failures.is_empty() {
        bail!("failed to set image: {}", failures.join("; "));
    }
    Ok(())
}

fn config(data_dir: &Path) -> Result<()> {
    let (settings, path) = settings::materialize(data_dir)?;
    info!(path = %path.display(), "settings written");
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn preview(
    data_dir: &Path,
    settings: Settings,
    output: &Path,
    size: Option<(u32, u32)>,
    left: Vec<String>,
    right: Vec<String>,
) -> Result<()> {
    let quality = settings.quality();
    let mut updater = Updater::new(data_dir, settings);
    if let Some(size) = size {
        updater = updater.with_display(size);
    }
    if !left.is_empty() || !right.is_empty() {
        updater = updater.with_sources(StaticLines(left), StaticLines(right));
    }
    let rendered = updater.render()?;

    let is_jpeg = output
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    if is_jpeg {
        image_ops::save_jpeg(&rendered.image, output, quality)?;
    } else {
        rendered
            .image
            .save(output)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }
    info!(output = %output.display(), source = %rendered.origin, "preview written");
    Ok(())
}
