//
// cli.rs
// dicom-organizer
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the corresponding modules.
//

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};

use crate::{config::OrganizeConfig, manifest, metadata, organize, prune, sync};

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "dicom-organizer")]
#[command(about = "Organiza DICOMs em árvores cirurgia/modalidade", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sort a DICOM dump into surgery/modality trees with ordered PNG frames
    Organize {
        /// Source folder containing raw DICOM files
        #[arg(short, long, default_value = "DICOM")]
        input: PathBuf,
        /// Destination root for the organized tree
        #[arg(short, long, default_value = "dicom_01")]
        output: PathBuf,
        /// Inclusive StudyDate lower bound for shoulder surgery (YYYYMMDD)
        #[arg(long, default_value = "")]
        shoulder_from: String,
        /// Inclusive StudyDate upper bound for shoulder surgery (YYYYMMDD)
        #[arg(long, default_value = "")]
        shoulder_to: String,
        /// Inclusive StudyDate lower bound for ankle surgery (YYYYMMDD)
        #[arg(long, default_value = "")]
        ankle_from: String,
        /// Inclusive StudyDate upper bound for ankle surgery (YYYYMMDD)
        #[arg(long, default_value = "")]
        ankle_to: String,
        /// Duplicate original DICOM files within each series folder
        #[arg(long)]
        copy_dicom: bool,
    },
    /// Build manifest.json and the static viewer over an organized tree
    Manifest {
        #[arg(short, long, default_value = "dicom_01")]
        root: PathBuf,
        /// Output directory for viewer artifacts
        #[arg(short, long, default_value = "viewer")]
        viewer: PathBuf,
        /// Frames per series referenced in the manifest (0 = all)
        #[arg(long, default_value_t = 0)]
        max_frames: usize,
    },
    /// Copy the viewer output and the organized tree into the publish folder
    Sync {
        #[arg(short, long, default_value = "viewer")]
        viewer: PathBuf,
        #[arg(short, long, default_value = "dicom_01")]
        root: PathBuf,
        #[arg(short, long, default_value = "docs")]
        docs: PathBuf,
        /// Purge the docs folder before copying
        #[arg(long)]
        clean: bool,
    },
    /// Keep every Nth animation frame in the published copy
    Prune {
        #[arg(short, long, default_value = "docs")]
        docs: PathBuf,
        #[arg(long, default_value_t = 2)]
        sample_rate: usize,
    },
    /// Show extracted metadata and the classification one file would receive
    Info { file: PathBuf },
}

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Organize {
            input,
            output,
            shoulder_from,
            shoulder_to,
            ankle_from,
            ankle_to,
            copy_dicom,
        } => {
            // Configuration errors abort here, before any file is touched.
            let config = OrganizeConfig::from_cli(
                &shoulder_from,
                &shoulder_to,
                &ankle_from,
                &ankle_to,
                copy_dicom,
            )?;
            organize::run(&input, &output, &config)?;
        }
        Commands::Manifest {
            root,
            viewer,
            max_frames,
        } => manifest::write_viewer(&root, &viewer, max_frames)?,
        Commands::Sync {
            viewer,
            root,
            docs,
            clean,
        } => sync::run_sync(&viewer, &root, &docs, clean)?,
        Commands::Prune { docs, sample_rate } => {
            if sample_rate == 0 {
                bail!("Sample rate must be at least 1");
            }
            prune::run_prune(&docs, sample_rate)?;
        }
        Commands::Info { file } => metadata::print_info(&file)?,
    }

    Ok(())
}
