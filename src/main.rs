mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod mapper;
mod models;
mod normalizer;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, NamedCommands, TransactionsCommands};

fn main() {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    let result = match cli.command {
        Commands::Init {
            data_dir,
            default_account,
        } => cli::init::run(data_dir, default_account),
        Commands::Accounts { command } => match command {
            NamedCommands::Add { name } => cli::accounts::add(&name),
            NamedCommands::List => cli::accounts::list(),
            NamedCommands::Rename { id, name } => cli::accounts::rename(id, &name),
            NamedCommands::Delete { ids } => cli::accounts::delete(&ids),
        },
        Commands::Categories { command } => match command {
            NamedCommands::Add { name } => cli::categories::add(&name),
            NamedCommands::List => cli::categories::list(),
            NamedCommands::Rename { id, name } => cli::categories::rename(id, &name),
            NamedCommands::Delete { ids } => cli::categories::delete(&ids),
        },
        Commands::Transactions { command } => match command {
            TransactionsCommands::Add {
                account,
                payee,
                amount,
                date,
                category,
                notes,
            } => cli::transactions::add(cli::transactions::AddArgs {
                account: &account,
                payee: &payee,
                amount: &amount,
                date: &date,
                category: category.as_deref(),
                notes: notes.as_deref(),
            }),
            TransactionsCommands::List {
                from_date,
                to_date,
                account,
            } => cli::transactions::list(from_date.as_deref(), to_date.as_deref(), account.as_deref()),
            TransactionsCommands::Edit {
                id,
                payee,
                amount,
                date,
                category,
                notes,
                clear_category,
                clear_notes,
            } => cli::transactions::edit(
                id,
                cli::transactions::EditArgs {
                    payee: payee.as_deref(),
                    amount: amount.as_deref(),
                    date: date.as_deref(),
                    category: category.as_deref(),
                    notes: notes.as_deref(),
                    clear_category,
                    clear_notes,
                },
            ),
            TransactionsCommands::Delete { ids } => cli::transactions::delete(&ids),
        },
        Commands::Import {
            file,
            account,
            map,
            dry_run,
        } => cli::import::run(&file, account.as_deref(), &map, dry_run),
        Commands::Summary {
            from_date,
            to_date,
            account,
        } => cli::summary::run(from_date.as_deref(), to_date.as_deref(), account.as_deref()),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        tracing::debug!("{e:?}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins over `--log-level` when set.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
