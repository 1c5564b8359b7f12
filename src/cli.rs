//! Command-line interface definitions for newsreel.
//!
//! Every option can also come from an environment variable so the binary can
//! run unattended from a timer or container.

use clap::Parser;

/// Command-line arguments for a single acquisition run.
///
/// # Examples
///
/// ```sh
/// # Print a rotation from the built-in sources to stdout
/// newsreel
///
/// # Archive rotations for the display, five items from the last two days
/// newsreel -j /var/lib/newsreel -n 5 -d 2
///
/// # Check which sources are reachable and through which transport
/// newsreel --probe --source minas
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for rotation JSON; prints to stdout when omitted
    #[arg(short, long, env = "NEWSREEL_JSON_DIR")]
    pub json_output_dir: Option<String>,

    /// Optional path to a YAML file with sources and relays
    #[arg(short, long, env = "NEWSREEL_CONFIG")]
    pub config: Option<String>,

    /// How many days back an item may be published (clamped to 1..=7)
    #[arg(short = 'd', long, env = "NEWSREEL_MAX_DAYS_BACK", default_value_t = 3)]
    pub max_days_back: u32,

    /// Maximum number of items in the rotation
    #[arg(short = 'n', long, env = "NEWSREEL_MAX_COUNT", default_value_t = 8)]
    pub max_count: usize,

    /// Probe each source and print a JSON report instead of acquiring
    #[arg(long)]
    pub probe: bool,

    /// Only probe sources whose name contains this text (case-insensitive)
    #[arg(long, requires = "probe")]
    pub source: Option<String>,

    /// List configured sources and exit
    #[arg(long, conflicts_with = "probe")]
    pub list_sources: bool,
}
