use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vizfilterapp::model::StorageType;

#[derive(Parser, Debug)]
#[command(
    name = "vizfilter",
    bin_name = "vizfilter",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Declarative visual filters for document views", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Engine config file (TOML)
    #[arg(long, global = true, help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true, help_heading = "Options")]
    pub json: bool,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create filters for a selection and apply them to its views
    #[command(display_order = 1)]
    Apply {
        /// Document snapshot (JSON)
        document: PathBuf,

        /// Selection (JSON)
        selection: PathBuf,

        /// Save the updated document back to DOCUMENT
        #[arg(long)]
        write: bool,
    },

    /// List the distinct values of a parameter
    #[command(display_order = 2)]
    Values {
        /// Document snapshot (JSON)
        document: PathBuf,

        /// Category ids to scan
        #[arg(long = "category", required = true, num_args = 1..)]
        categories: Vec<i64>,

        /// Parameter id
        #[arg(long)]
        parameter: i64,

        /// Storage type of the parameter
        #[arg(long, value_enum, default_value_t = StorageArg::Text)]
        storage: StorageArg,

        /// Field parameter ids of a composite parameter
        #[arg(long = "field", num_args = 2, required_if_eq("storage", "composite"))]
        fields: Vec<i64>,

        /// Parameter display name
        #[arg(long)]
        name: Option<String>,

        /// Element cap (defaults to the configured scan limit)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show a view's filters in list order
    #[command(display_order = 3)]
    Order {
        /// Document snapshot (JSON)
        document: PathBuf,

        /// View id
        view: i64,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StorageArg {
    Text,
    WholeNumber,
    RealNumber,
    Reference,
    Composite,
}

impl From<StorageArg> for StorageType {
    fn from(arg: StorageArg) -> Self {
        match arg {
            StorageArg::Text => StorageType::Text,
            StorageArg::WholeNumber => StorageType::WholeNumber,
            StorageArg::RealNumber => StorageType::RealNumber,
            StorageArg::Reference => StorageType::Reference,
            StorageArg::Composite => StorageType::Composite,
        }
    }
}
