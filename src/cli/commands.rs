use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dm", about = concat!("[>] daymark v", env!("CARGO_PKG_VERSION"), " - tasks that follow the days"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Notes directory (default: current directory)
    #[arg(short = 'C', long = "notes-dir", global = true)]
    pub notes_dir: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Move a task to another day's note
    Mv(MvArgs),
    /// Set or replace a task's repeat rule
    Repeat(RepeatArgs),
    /// Mark a task done, firing its repetition if it has one
    Done(DoneArgs),
    /// Scan a note for due repetitions now
    Scan(ScanArgs),
    /// List the tasks in a note
    Show(ShowArgs),
    /// Watch the notes directory and scan notes as they change
    Watch,
}

#[derive(Args)]
pub struct MvArgs {
    /// Note: a date (YYYY-MM-DD) or a title
    pub note: String,
    /// Line number of the task (1-based)
    pub line: usize,
    /// Destination date; omitting it cancels the move
    pub date: Option<String>,
}

#[derive(Args)]
pub struct RepeatArgs {
    /// Note: a date (YYYY-MM-DD) or a title
    pub note: String,
    /// Line number of the task (1-based)
    pub line: usize,
    /// Repeat rule, e.g. "1d", "2w", "1m", "1w mon,thu"
    pub rule: String,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Note: a date (YYYY-MM-DD) or a title
    pub note: String,
    /// Line number of the task (1-based)
    pub line: usize,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Note: a date (YYYY-MM-DD) or a title
    pub note: String,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Note: a date (YYYY-MM-DD) or a title
    pub note: String,
}
