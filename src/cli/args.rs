use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "radcalnet-processor")]
#[command(about = "Reader and merge engine for RadCalNet daily measurement files")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Settings file (TOML, JSON or YAML)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Parallel workers, 0 for one per CPU")]
    pub max_workers: Option<usize>,

    #[arg(long, global = true, help = "Read daily files through memory maps")]
    pub mmap: bool,

    #[arg(long, global = true, help = "Abort queries running longer than this many seconds")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index one site directory and list its daily files
    Index {
        #[arg(help = "Directory holding the daily files of one site")]
        site_dir: PathBuf,

        #[arg(long, help = "Fail on file names that are not daily files")]
        abort_on_unknown: bool,
    },

    /// Parse a single daily file and describe its contents
    Inspect {
        #[arg(help = "Daily .input or .output file")]
        file: PathBuf,
    },

    /// Merge the measurements of a site over a time range
    Query {
        #[command(flatten)]
        selection: Selection,

        #[arg(
            short,
            long,
            help = "Print one measurement: sr, toa, P, T, WV, O3, AOD or Ang"
        )]
        measurement: Option<String>,

        #[arg(short, long, help = "Wavelength in nm for sr and toa")]
        wavelength: Option<u16>,

        #[arg(long, help = "Print JSON instead of text")]
        json: bool,
    },

    /// Check merged measurements for quality problems
    Validate {
        #[command(flatten)]
        selection: Selection,

        #[arg(long, help = "Exit with an error when violations are found")]
        strict: bool,

        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },

    /// Write merged measurements as CSV tables
    Export {
        #[command(flatten)]
        selection: Selection,

        #[arg(short, long, help = "Output directory")]
        output_dir: PathBuf,

        #[arg(long, default_value = ",", help = "Field delimiter")]
        delimiter: char,

        #[arg(long, help = "Decimal places for numeric cells")]
        precision: Option<usize>,
    },
}

/// Which measurements a command works on
#[derive(clap::Args, Debug, Clone)]
pub struct Selection {
    #[arg(short, long, help = "Data store root [default: store_root setting]")]
    pub root: Option<PathBuf>,

    #[arg(short, long, help = "Site code, e.g. BTCN")]
    pub site: String,

    #[arg(short, long, help = "Instrument code, e.g. BTCN02 [default: earliest file's]")]
    pub instrument: Option<String>,

    #[arg(long, help = "Start time, inclusive (e.g. 2018-05-28T01:00)")]
    pub from: Option<String>,

    #[arg(long, help = "End time, inclusive")]
    pub to: Option<String>,
}
