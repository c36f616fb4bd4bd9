pub mod accounts;
pub mod categories;
pub mod import;
pub mod init;
pub mod status;
pub mod summary;
pub mod transactions;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "tally", about = "Personal finance tracker with mapped CSV import.")]
pub struct Cli {
    /// Log level: off, error, warn, info, debug, trace (RUST_LOG overrides)
    #[arg(long = "log-level", global = true, default_value = "warn")]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for tally data (default: ~/.local/share/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Account to import into when --account is omitted
        #[arg(long = "default-account")]
        default_account: Option<String>,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: NamedCommands,
    },
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: NamedCommands,
    },
    /// Record, list, edit and delete transactions.
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// Import a CSV file by mapping its columns to amount, date and payee.
    Import {
        /// Path to the CSV file; the first row must be headers
        file: String,
        /// Account name to import into
        #[arg(long)]
        account: Option<String>,
        /// Column mapping INDEX=ROLE (zero-based), e.g. 0=date. ROLE may be
        /// amount, date, payee, skip, or any other field name such as notes
        #[arg(long = "map", value_name = "INDEX=ROLE")]
        map: Vec<String>,
        /// Print the normalized records as JSON without importing
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Income, expenses and top spending categories for a date range.
    Summary {
        /// Start date: YYYY-MM-DD (default: 30 days before --to)
        #[arg(long = "from")]
        from_date: Option<String>,
        /// End date: YYYY-MM-DD (default: today)
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Filter by account name
        #[arg(long)]
        account: Option<String>,
    },
    /// Show the current database and record counts.
    Status,
}

/// Shared by accounts and categories, which are both just names.
#[derive(Subcommand)]
pub enum NamedCommands {
    /// Add a new entry.
    Add { name: String },
    /// List all entries.
    List,
    /// Rename an entry by ID.
    Rename { id: i64, name: String },
    /// Delete one or more entries by ID.
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// Record a single transaction.
    Add {
        #[arg(long)]
        account: String,
        #[arg(long)]
        payee: String,
        /// Amount, negative for spending: e.g. -12.50
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        /// Date: YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List transactions, newest first.
    List {
        /// Start date: YYYY-MM-DD (default: 30 days before --to)
        #[arg(long = "from")]
        from_date: Option<String>,
        /// End date: YYYY-MM-DD (default: today)
        #[arg(long = "to")]
        to_date: Option<String>,
        #[arg(long)]
        account: Option<String>,
    },
    /// Change fields of an existing transaction.
    Edit {
        id: i64,
        #[arg(long)]
        payee: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        amount: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Remove the category
        #[arg(long = "clear-category", conflicts_with = "category")]
        clear_category: bool,
        /// Remove the notes
        #[arg(long = "clear-notes", conflicts_with = "notes")]
        clear_notes: bool,
    },
    /// Delete one or more transactions by ID.
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}
