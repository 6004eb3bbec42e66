use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an empty routine draft
    New {
        /// Draft file to create
        #[arg(short, long)]
        draft: PathBuf,

        /// Routine name
        #[arg(short, long)]
        name: String,

        /// Routine category
        #[arg(short = 'k', long)]
        category: String,
    },

    /// Edit the exercises of a draft
    Exercise {
        /// Draft file to edit
        #[arg(short, long)]
        draft: PathBuf,

        #[command(subcommand)]
        action: ExerciseAction,
    },

    /// Pick a video for an exercise and upload it
    Upload {
        /// Draft file to update
        #[arg(short, long)]
        draft: PathBuf,

        /// Exercise position in the draft
        #[arg(short, long)]
        index: usize,

        /// Local video file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Upload all picked videos that have not been uploaded yet
    UploadPending {
        /// Draft file to update
        #[arg(short, long)]
        draft: PathBuf,
    },

    /// Save the draft to the backend and link it to the therapist
    Save {
        /// Draft file to save; ids are written back even when saving fails
        #[arg(short, long)]
        draft: PathBuf,

        /// Therapist id owning the routine
        #[arg(short, long)]
        owner: String,
    },

    /// Fetch an existing routine into a draft file for editing
    Load {
        /// Routine id
        #[arg(short, long)]
        routine: String,

        /// Draft file to write
        #[arg(short, long)]
        draft: PathBuf,
    },

    /// List a therapist's custom routines
    List {
        /// Therapist id
        #[arg(short, long)]
        owner: String,
    },

    /// Assign a saved routine to a patient
    Assign {
        /// Patient id
        #[arg(short, long)]
        patient: String,

        /// Routine id
        #[arg(short, long)]
        routine: String,
    },

    /// Write the default configuration
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "routine-composer.toml")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ExerciseAction {
    /// Append an empty exercise
    Add,

    /// Set one field of an exercise
    Set {
        /// Exercise position in the draft
        #[arg(short, long)]
        index: usize,

        /// Field name (title, description, category, subcategory, reps, hold, sets, frequency)
        #[arg(short, long)]
        field: String,

        /// New value
        #[arg(short, long)]
        value: String,
    },

    /// Remove an exercise by position
    Remove {
        /// Exercise position in the draft
        #[arg(short, long)]
        index: usize,
    },

    /// Remove every exercise with the given backend id
    RemoveId {
        /// Exercise id
        #[arg(long)]
        id: String,
    },
}
