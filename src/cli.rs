//! Command-line interface over the annotation directory and batch jobs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::batch::{self, JobError, JobHandle, JobSummary, spawn_job};
use crate::config::{AppConfig, ConfigError};
use crate::export::{self, ImageFolderSink, render_dir_for};
use crate::format::{AnnotationDir, StorageError};
use crate::frames::{FrameError, FrameSource, open_source};
use crate::provider::ProviderRegistry;

#[derive(Parser, Debug)]
#[command(name = "vidanno")]
#[command(about = "Frame-by-frame image and video annotation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the annotations of one frame
    List {
        /// Image file or image folder
        source: PathBuf,

        #[arg(short, long, default_value = "0")]
        frame: usize,
    },

    /// Remove every annotation from one frame
    Clear {
        source: PathBuf,

        #[arg(short, long)]
        frame: usize,
    },

    /// Copy one annotation to every later frame
    CopyForward {
        source: PathBuf,

        #[arg(short, long)]
        frame: usize,

        /// Annotation index on that frame (default: the last one)
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// Propagate annotations frame by frame with a tracker
    Track {
        source: PathBuf,

        /// First frame to fill
        #[arg(long, default_value = "1")]
        from: usize,

        /// End frame, exclusive (default: last frame)
        #[arg(long)]
        to: Option<usize>,

        /// Tracker name (default: configured tracker, or "copy")
        #[arg(short, long)]
        tracker: Option<String>,
    },

    /// Render annotated frames as PNG files
    Export {
        source: PathBuf,

        #[arg(long, default_value = "0")]
        from: usize,

        #[arg(long)]
        to: Option<usize>,

        /// Output folder (default: <source stem>_render next to the source)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the configuration path, or write a default configuration
    Config {
        #[arg(long)]
        init: bool,
    },
}

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Frame {frame} has no annotation {index}")]
    NoAnnotation { frame: usize, index: usize },

    #[error("Frame {frame} has no annotations")]
    EmptyFrame { frame: usize },

    #[error("Unknown tracker '{0}'")]
    UnknownTracker(String),

    #[error("No configuration directory available")]
    NoConfigPath,
}

impl Cli {
    /// The config file this invocation reads and writes.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(AppConfig::default_path)
    }

    /// Load the configuration, falling back to defaults when no file exists.
    pub fn load_config(&self) -> Result<AppConfig, CliError> {
        match &self.config {
            Some(path) => Ok(AppConfig::load(path)?),
            None => Ok(AppConfig::load_from_default_path().unwrap_or_default()),
        }
    }
}

fn open(source: &Path) -> Result<(Arc<dyn FrameSource>, AnnotationDir), CliError> {
    let frames: Arc<dyn FrameSource> = Arc::from(open_source(source)?);
    Ok((frames, AnnotationDir::for_source(source)))
}

/// Run a parsed command, writing human-readable output to `out`.
pub fn run(
    cli: &Cli,
    config: &AppConfig,
    providers: &ProviderRegistry,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match &cli.command {
        Commands::List { source, frame } => {
            let (_, dir) = open(source)?;
            let annotations = dir.load(*frame)?;
            for (i, a) in annotations.iter().enumerate() {
                write_line(
                    out,
                    format!(
                        "{:>3}  {:<9} ({:.4}, {:.4}) - ({:.4}, {:.4}){}",
                        i,
                        a.kind,
                        a.x,
                        a.y,
                        a.x2,
                        a.y2,
                        a.label().map(|t| format!("  \"{}\"", t)).unwrap_or_default()
                    ),
                )?;
            }
            if annotations.is_empty() {
                write_line(out, format!("Frame {} has no annotations", frame))?;
            }
        }

        Commands::Clear { source, frame } => {
            let (frames, dir) = open(source)?;
            if *frame >= frames.len() {
                return Err(FrameError::OutOfRange {
                    index: *frame,
                    len: frames.len(),
                }
                .into());
            }
            dir.create()?;
            dir.clear(*frame)?;
            write_line(out, format!("Cleared frame {}", frame))?;
        }

        Commands::CopyForward {
            source,
            frame,
            index,
        } => {
            let (frames, dir) = open(source)?;
            let start = frame
                .checked_add(1)
                .filter(|_| *frame < frames.len())
                .ok_or(FrameError::OutOfRange {
                    index: *frame,
                    len: frames.len(),
                })?;
            let annotations = dir.load(*frame)?;
            let chosen = match index {
                Some(i) => annotations.get(*i).ok_or(CliError::NoAnnotation {
                    frame: *frame,
                    index: *i,
                })?,
                None => annotations
                    .last()
                    .ok_or(CliError::EmptyFrame { frame: *frame })?,
            };
            let range = batch::clamp_range(start..frames.len(), frames.len());
            let annotation = chosen.clone();
            let handle = spawn_job("copy-forward", move |ctx| {
                batch::copy_to_all(&dir, &annotation, range, ctx)
            })?;
            report(out, "Copied to", wait(handle)?)?;
        }

        Commands::Track {
            source,
            from,
            to,
            tracker,
        } => {
            let name = tracker
                .clone()
                .or_else(|| config.preferences.tracker.clone())
                .unwrap_or_else(|| "copy".to_string());
            let factory = providers
                .tracker(&name)
                .ok_or_else(|| CliError::UnknownTracker(name.clone()))?;
            let (frames, dir) = open(source)?;
            let range = *from..to.unwrap_or(frames.len());
            let handle = spawn_job("track", move |ctx| {
                batch::track_all(frames.as_ref(), factory.as_ref(), &dir, range, ctx)
            })?;
            report(out, "Tracked", wait(handle)?)?;
        }

        Commands::Export {
            source,
            from,
            to,
            output,
        } => {
            let (frames, dir) = open(source)?;
            let root = output.clone().unwrap_or_else(|| render_dir_for(source));
            let range = *from..to.unwrap_or(frames.len());
            let defaults = config.preferences.style.clone();
            let mut sink = ImageFolderSink::new(&root);
            let handle = spawn_job("export", move |ctx| {
                export::export(frames.as_ref(), &dir, range, &defaults, &mut sink, ctx)
            })?;
            report(out, "Exported", wait(handle)?)?;
            write_line(out, format!("Frames written to {}", root.display()))?;
        }

        Commands::Config { init } => {
            let path = cli.config_path().ok_or(CliError::NoConfigPath)?;
            if *init {
                AppConfig::new().save(&path)?;
                write_line(out, format!("Wrote default configuration to {}", path.display()))?;
            } else {
                write_line(out, path.display().to_string())?;
            }
        }
    }
    Ok(())
}

/// Block until the job ends, logging progress as it arrives.
fn wait(mut handle: JobHandle) -> Result<JobSummary, CliError> {
    let mut last = None;
    while !handle.is_finished() {
        let progress = handle.progress();
        if progress != last
            && let Some(p) = progress
        {
            log::debug!("{}: {}/{}", handle.name(), p.done, p.total);
            last = progress;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    Ok(handle.join()?)
}

fn report(out: &mut impl Write, verb: &str, summary: JobSummary) -> Result<(), CliError> {
    write_line(
        out,
        format!(
            "{} {} frames ({} skipped){}",
            verb,
            summary.written,
            summary.skipped,
            if summary.cancelled { ", cancelled" } else { "" }
        ),
    )
}

fn write_line(out: &mut impl Write, line: String) -> Result<(), CliError> {
    writeln!(out, "{}", line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use vidanno_core::Annotation;

    use super::*;

    fn folder(frames: usize) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let clip = tmp.path().join("clip");
        std::fs::create_dir(&clip).unwrap();
        for i in 0..frames {
            image::RgbImage::new(16, 16)
                .save(clip.join(format!("{:03}.png", i)))
                .unwrap();
        }
        tmp
    }

    fn exec(args: &[&str]) -> Result<String, CliError> {
        let cli = Cli::try_parse_from(std::iter::once("vidanno").chain(args.iter().copied()))
            .unwrap();
        let mut out = Vec::new();
        run(&cli, &AppConfig::new(), &ProviderRegistry::new(), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from(["vidanno", "list", "clip", "-v", "--frame", "3"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::List { frame: 3, .. }));
    }

    #[test]
    fn test_copy_forward_then_list() {
        let tmp = folder(3);
        let clip = tmp.path().join("clip");
        let dir = AnnotationDir::for_source(&clip);
        dir.create().unwrap();
        dir.save(0, &[Annotation::point(0.5, 0.5).with_text("nose")])
            .unwrap();

        let source = clip.to_string_lossy().into_owned();
        let out = exec(&["copy-forward", &source, "--frame", "0"]).unwrap();
        assert!(out.contains("Copied to 2 frames"));

        let listing = exec(&["list", &source, "--frame", "2"]).unwrap();
        assert!(listing.contains("point"));
        assert!(listing.contains("\"nose\""));
    }

    #[test]
    fn test_copy_forward_from_empty_frame() {
        let tmp = folder(2);
        let source = tmp.path().join("clip").to_string_lossy().into_owned();
        assert!(matches!(
            exec(&["copy-forward", &source, "--frame", "0"]),
            Err(CliError::EmptyFrame { frame: 0 })
        ));
    }

    #[test]
    fn test_copy_forward_out_of_range() {
        let tmp = folder(2);
        let source = tmp.path().join("clip").to_string_lossy().into_owned();
        let last = usize::MAX.to_string();
        for frame in ["2", last.as_str()] {
            assert!(matches!(
                exec(&["copy-forward", &source, "--frame", frame]),
                Err(CliError::Frame(FrameError::OutOfRange { .. }))
            ));
        }
    }

    #[test]
    fn test_clear_out_of_range() {
        let tmp = folder(2);
        let source = tmp.path().join("clip").to_string_lossy().into_owned();
        assert!(exec(&["clear", &source, "--frame", "5"]).is_err());
        assert!(exec(&["clear", &source, "--frame", "1"]).is_ok());
    }

    #[test]
    fn test_unknown_tracker() {
        let tmp = folder(2);
        let source = tmp.path().join("clip").to_string_lossy().into_owned();
        assert!(matches!(
            exec(&["track", &source, "--tracker", "csrt"]),
            Err(CliError::UnknownTracker(_))
        ));
    }

    #[test]
    fn test_config_init_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cfg.json");
        let path_arg = path.to_string_lossy().into_owned();
        exec(&["config", "--init", "--config", &path_arg]).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::new());
    }
}
