//! Routine Composer
//!
//! Command-line front end for authoring physical-therapy routines: edit a
//! local draft, upload exercise videos to object storage and save the
//! routine to the backend.

use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use routine_composer::backend::{BackendApi, HttpBackend};
use routine_composer::cli::{Args, Commands, ExerciseAction};
use routine_composer::config::Config;
use routine_composer::draft::{DraftStore, ExerciseField};
use routine_composer::media::MediaRuntimeFactory;
use routine_composer::orchestrator::RoutineCompositionOrchestrator;
use routine_composer::picker::{FilePicker, MediaPicker};
use routine_composer::storage::{HttpStorageWriter, S3UrlIssuer};
use routine_composer::upload::MediaUploadPipeline;

const DEFAULT_CONFIG: &str = "routine-composer.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG);
                Config::from_file(DEFAULT_CONFIG)?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env_overrides();

    match args.command {
        Commands::New { draft, name, category } => {
            let mut store = DraftStore::new();
            store.set_meta(name, category);
            store.save_to_file(&draft)?;
            println!("Created draft {}", draft.display());
        }
        Commands::Exercise { draft, action } => {
            let mut store = DraftStore::from_file(&draft)?;
            match action {
                ExerciseAction::Add => {
                    let index = store.add_exercise();
                    println!("Added exercise {}", index);
                }
                ExerciseAction::Set { index, field, value } => {
                    let Some(field) = ExerciseField::parse(&field) else {
                        bail!("Unknown exercise field '{}'", field);
                    };
                    if !store.update_exercise_field(index, field, value.as_str()) {
                        bail!("Could not set {:?} of exercise {} to '{}'", field, index, value);
                    }
                }
                ExerciseAction::Remove { index } => {
                    if !store.remove_exercise_at(index) {
                        bail!("No exercise at position {}", index);
                    }
                }
                ExerciseAction::RemoveId { id } => {
                    if !store.remove_exercise(&id) {
                        bail!("No exercise with id {}", id);
                    }
                }
            }
            store.save_to_file(&draft)?;
        }
        Commands::Upload { draft, index, file } => {
            config.validate()?;
            let mut store = DraftStore::from_file(&draft)?;

            let Some(handle) = FilePicker::new(&file).pick().await? else {
                println!("No video selected");
                return Ok(());
            };
            if !store.select_media(index, handle.clone()) {
                bail!("No exercise at position {}", index);
            }

            let pipeline = build_pipeline(&config);
            pipeline.restore(&store);
            if pipeline.is_uploaded(&handle) {
                info!("{} was uploaded earlier, reusing its URLs", handle.filename);
            }
            let spinner = spinner(&format!("Uploading {}", handle.filename))?;
            let outcome = pipeline.upload(&handle).await;
            spinner.finish_and_clear();

            match outcome {
                Ok(result) => {
                    store.attach_media(index, result.clone());
                    store.save_to_file(&draft)?;
                    println!("Video: {}", result.video_url);
                    if !result.thumbnail_url.is_empty() {
                        println!("Thumbnail: {}", result.thumbnail_url);
                    }
                }
                Err(e) => {
                    store.save_to_file(&draft)?;
                    let stage = e.stage();
                    return Err(e).context(format!("Upload failed at {:?} step", stage));
                }
            }
        }
        Commands::UploadPending { draft } => {
            config.validate()?;
            let mut store = DraftStore::from_file(&draft)?;
            let pending = store.pending_media().len();
            if pending == 0 {
                println!("Nothing to upload");
                return Ok(());
            }

            let pipeline = build_pipeline(&config);
            pipeline.restore(&store);
            let spinner = spinner(&format!("Uploading {} video(s)", pending))?;
            let failures = pipeline.upload_pending(&mut store).await;
            spinner.finish_and_clear();
            store.save_to_file(&draft)?;

            for (index, e) in &failures {
                println!("Exercise {}: {} ({:?})", index, e, e.stage());
            }
            if !failures.is_empty() {
                bail!("{} of {} upload(s) failed", failures.len(), pending);
            }
            println!("Uploaded {} video(s)", pending);
        }
        Commands::Save { draft, owner } => {
            let mut store = DraftStore::from_file(&draft)?;
            let orchestrator = RoutineCompositionOrchestrator::new(build_backend(&config)?);

            let cancel = CancellationToken::new();
            let watcher = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping before the next write");
                    watcher.cancel();
                }
            });

            let spinner = spinner(&format!("Saving {}", store.draft().name))?;
            let outcome = orchestrator
                .save_with_cancel(store.draft_mut(), &owner, &cancel)
                .await;
            spinner.finish_and_clear();

            // Ids written so far make the next attempt an update.
            store.save_to_file(&draft)?;

            match outcome {
                Ok(routine_id) => println!("Saved routine {}", routine_id),
                Err(e) if e.is_partial() => {
                    return Err(e).context("Routine partially saved; run save again to finish");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Load { routine, draft } => {
            let orchestrator = RoutineCompositionOrchestrator::new(build_backend(&config)?);
            let loaded = orchestrator.load(&routine).await?;
            let count = loaded.exercises.len();
            DraftStore::hydrated(loaded).save_to_file(&draft)?;
            println!("Loaded routine {} with {} exercise(s) into {}", routine, count, draft.display());
        }
        Commands::List { owner } => {
            let backend = build_backend(&config)?;
            let routines = backend.list_custom_routines(&owner).await?;
            if routines.is_empty() {
                println!("No custom routines found.");
            } else {
                println!("{:<26} {:<30} {:<20} {:<10}", "Id", "Name", "Category", "Exercises");
                println!("{}", "-".repeat(88));
                for routine in routines {
                    println!(
                        "{:<26} {:<30} {:<20} {:<10}",
                        routine.id,
                        routine.name,
                        routine.category,
                        routine.exercises.len()
                    );
                }
            }
        }
        Commands::Assign { patient, routine } => {
            let backend = build_backend(&config)?;
            backend.assign_routine(&patient, &routine).await?;
            println!("Assigned routine {} to patient {}", routine, patient);
        }
        Commands::InitConfig { output } => {
            if output.exists() {
                bail!("{} already exists", output.display());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

fn build_backend(config: &Config) -> Result<Arc<dyn BackendApi>> {
    Ok(Arc::new(HttpBackend::new(&config.backend)?))
}

fn build_pipeline(config: &Config) -> MediaUploadPipeline {
    let runtime = MediaRuntimeFactory::create_runtime(config.media.clone());
    info!("Using {:?} media runtime", runtime.kind());
    MediaUploadPipeline::new(
        runtime,
        Arc::new(S3UrlIssuer::new(&config.storage)),
        Arc::new(HttpStorageWriter::default()),
    )
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".routine-composer").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "routine-composer.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("routine-composer.log").display()
    );

    Ok(())
}
