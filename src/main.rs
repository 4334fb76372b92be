mod handlers;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "marktrack", version, about = "Track production marks through work areas")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Initialize the tracker database
    Init,
    /// Load areas, people, projects and marks from a JSON catalog
    Load { file: PathBuf },
    /// List all marks
    Marks {
        #[arg(long)]
        json: bool,
    },
    /// Record completions for a mark across its areas
    Fill(FillArgs),
    /// Show per-area progress of a mark
    Status {
        mark: String,
        #[arg(long)]
        json: bool,
    },
    /// Show recorded completions of a mark
    History {
        mark: String,
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Args, Clone)]
pub struct FillArgs {
    /// Mark id, code, or part of its title
    pub mark: String,
    /// Login of the user recording the fill
    #[arg(long, short = 'u')]
    pub user: String,
    /// Default completion date (YYYY-MM-DD) for entries without their own
    #[arg(long, short = 'd')]
    pub date: Option<String>,
    /// AREA=COUNT[@YYYY-MM-DD]
    #[arg(long, short = 'e')]
    pub entry: Vec<String>,
    /// AREA=EMPLOYEE
    #[arg(long, short = 'x')]
    pub executor: Vec<String>,
    /// AREA=TEXT
    #[arg(long, short = 'r')]
    pub remark: Vec<String>,
    /// Skip an area in this fill
    #[arg(long, short = 's')]
    pub skip: Vec<String>,
    /// Require an exact mark id or code (no fuzzy matching)
    #[arg(long)]
    pub strict: bool,
    /// Show the resulting chain without submitting
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long)]
    pub json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    marktrack::logging::init(cli.verbose);

    match cli.command {
        Commands::Init | Commands::Load { .. } | Commands::Fill(_) => {
            dispatch_write_ops(cli.command)
        }
        Commands::Marks { .. } | Commands::Status { .. } | Commands::History { .. } => {
            dispatch_read_ops(cli.command)
        }
    }
}

fn dispatch_write_ops(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init => handlers::init::handle(),
        Commands::Load { file } => handlers::load::handle(&file),
        Commands::Fill(args) => handlers::fill::handle(&args),
        _ => unreachable!("Invalid write command dispatch"),
    }
}

fn dispatch_read_ops(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Marks { json } => handlers::marks::handle(json),
        Commands::Status { mark, json } => handlers::status::handle(&mark, json),
        Commands::History { mark, limit } => handlers::history::handle(&mark, limit),
        _ => unreachable!("Invalid read command dispatch"),
    }
}
