
use clap::Parser;
use chrono::Datelike;
use lazy_static::lazy_static;
use log::{error, info, warn};
use std::path::Path;
use std::path::PathBuf;

use crate::phase_search::{DEFAULT_MAX_PASSES, PhaseSearchConfig};

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.3.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = format!("Copyright (C) {}     contigphase authors
This program comes with ABSOLUTELY NO WARRANTY.", chrono::Utc::now().year()))]
pub struct Settings {
    /// Input alignment file grouped by read name, in BAM/SAM/CRAM format
    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "bam")]
    #[clap(value_name = "BAM")]
    #[clap(help_heading = Some("Input/Output"))]
    pub bam_filename: PathBuf,

    /// Output contig partition file (csv/tsv)
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-partitions")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub partition_filename: PathBuf,

    /// Output contig contact file (optional, csv/tsv)
    #[clap(long = "contacts-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub contacts_filename: Option<PathBuf>,

    /// Input file of contigs with a fixed partition, with "contig" and "partition" columns (optional, csv/tsv)
    #[clap(long = "pinned-partitions")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub pinned_filename: Option<PathBuf>,

    /// Number of threads to use for phasing
    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Only use alignments to contigs whose name starts with this prefix (default: all contigs)
    #[clap(long = "contig-prefix")]
    #[clap(value_name = "PREFIX")]
    #[clap(default_value = "")]
    #[clap(help_heading = Some("Mapping Filtering"))]
    pub required_prefix: String,

    /// Sets a minimum MAPQ to include an alignment in the contact map
    #[clap(long = "min-mapq")]
    #[clap(value_name = "MAPQ")]
    #[clap(default_value = "1")]
    #[clap(help_heading = Some("Mapping Filtering"))]
    pub min_mapping_quality: u8,

    /// Number of independent random phasing trials
    #[clap(short = 'n')]
    #[clap(long = "iterations")]
    #[clap(value_name = "COUNT")]
    #[clap(default_value = "100")]
    #[clap(help_heading = Some("Phasing"))]
    pub iterations: usize,

    /// Base random seed, trial N uses seed + N
    #[clap(long = "seed")]
    #[clap(value_name = "SEED")]
    #[clap(default_value = "0")]
    #[clap(help_heading = Some("Phasing"))]
    pub seed: u64,

    /// Maximum number of greedy improvement passes per trial
    #[clap(long = "max-passes")]
    #[clap(value_name = "COUNT")]
    #[clap(default_value_t = DEFAULT_MAX_PASSES)]
    #[clap(help_heading = Some("Phasing"))]
    pub max_passes: usize
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

impl Settings {
    /// Wrapper function to build a phase search configuration from our CLI settings; nothing is pinned yet
    pub fn phase_search_config(&self) -> PhaseSearchConfig {
        let mut config = PhaseSearchConfig::new(self.iterations, self.threads);
        config.seed = self.seed;
        config.max_passes = self.max_passes;
        config
    }
}

pub fn get_raw_settings() -> Settings {
    Settings::parse()
}

/// Do some additional checks here, we may increase these as we go.
/// Also can modify settings if needed since we're passing it around.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_settings(mut settings: Settings) -> Settings {
    //check for any of our required files
    check_required_filename(&settings.bam_filename, "Alignment file");
    if let Some(pinned_filename) = settings.pinned_filename.as_ref() {
        check_required_filename(pinned_filename, "Pinned partition file");
    }

    // 0 doesn't make sense, so lets just error proof it up to 1
    if settings.threads == 0 {
        settings.threads = 1;
    }

    // these would make the search a no-op
    if settings.iterations == 0 {
        error!("--iterations must be at least 1");
        std::process::exit(exitcode::USAGE);
    }
    if settings.max_passes == 0 {
        error!("--max-passes must be at least 1");
        std::process::exit(exitcode::USAGE);
    }

    // dump stuff to the logger
    info!("Mapping filtering:");
    if settings.required_prefix.is_empty() {
        info!("\tRequired contig prefix: NONE");
    } else {
        info!("\tRequired contig prefix: {:?}", settings.required_prefix);
    }
    info!("\tMinimum mapping quality: {}", settings.min_mapping_quality);
    if settings.min_mapping_quality == 0 {
        warn!("\tA minimum mapping quality of 0 will include ambiguous alignments in the contact map.");
    }

    info!("Phasing:");
    info!("\tIterations: {}", settings.iterations);
    info!("\tSeed: {}", settings.seed);
    info!("\tMaximum passes per trial: {}", settings.max_passes);
    info!("Processing threads: {}", settings.threads);

    //send the settings back
    settings
}
