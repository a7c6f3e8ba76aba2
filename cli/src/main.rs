use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use madang_core::{BookChoice, SessionEvent, SessionState};
use madang_sqlite::{Store, StoreConfig, StoreError};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod output;

use output::{
    NO_PURCHASES, OutputFormat, format_books, format_bootstrap, format_lookup, format_status,
    format_table,
};

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "MADANG_LOG";

#[derive(Debug, Parser)]
#[command(name = "madang")]
#[command(about = "Look up and record Madang bookstore purchases")]
struct Cli {
    /// YAML configuration file (database path and CSV sources).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding Book.csv, Customer.csv, and the database, when no
    /// config file is given.
    #[arg(long, global = true, default_value = ".")]
    data_dir: PathBuf,
    /// Database file, overriding the configured one.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log debug output to stderr (overridden by MADANG_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create and load any missing tables, then report what was done.
    Init,
    /// Show row counts for each table.
    Status(FormatArgs),
    /// List book selection options.
    Books(FormatArgs),
    /// Show a customer's purchase history.
    Lookup(LookupArgs),
    /// Record a purchase for a customer found by name.
    Record(RecordArgs),
    /// Run a read-only SQL query with positional parameters.
    Query(QueryArgs),
}

#[derive(Debug, Args)]
struct FormatArgs {
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct LookupArgs {
    /// Customer name, matched exactly.
    name: String,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct RecordArgs {
    /// Customer name, matched exactly; the customer must have purchases.
    #[arg(long)]
    name: String,
    /// Book option: a book id or a '<bookid>,<bookname>' label from `books`.
    #[arg(long)]
    book: String,
    /// Sale price, a whole number.
    #[arg(long)]
    price: String,
    /// Customer id to use when several customers share the name.
    #[arg(long)]
    custid: Option<i64>,
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// SQL with `?1`, `?2`, ... placeholders.
    sql: String,
    /// Values bound to the placeholders, in order.
    params: Vec<String>,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

/// How a command failed.
#[derive(Debug)]
enum Failure {
    /// The user can retry with corrected input. Nothing was written.
    Recoverable(String),
    Fatal(String),
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::Fatal(message)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match resolve_config(&cli) {
        Ok(config) => run(cli.command, &config),
        Err(err) => Err(Failure::Fatal(err)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Recoverable(err)) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
        Err(Failure::Fatal(err)) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Config file if given, else defaults inside `--data-dir`; `--db` wins.
fn resolve_config(cli: &Cli) -> Result<StoreConfig, String> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => StoreConfig::in_dir(&cli.data_dir),
    };
    if let Some(db) = &cli.db {
        config.database = db.clone();
    }
    debug!(?config, "resolved configuration");
    Ok(config)
}

fn run(command: Command, config: &StoreConfig) -> Result<(), Failure> {
    let store = open_store(config)?;
    match command {
        Command::Init => {
            print!("{}", format_bootstrap(store.bootstrap_report()));
            Ok(())
        }
        Command::Status(args) => run_status(&store, args),
        Command::Books(args) => run_books(&store, args),
        Command::Lookup(args) => run_lookup(&store, args),
        Command::Record(args) => run_record(&store, args),
        Command::Query(args) => run_query(&store, args),
    }
}

fn open_store(config: &StoreConfig) -> Result<Store, String> {
    Store::open(config).map_err(|e| {
        format!(
            "Failed to open store '{}': {e}",
            config.database.display()
        )
    })
}

fn run_status(store: &Store, args: FormatArgs) -> Result<(), Failure> {
    let status = store
        .status()
        .map_err(|e| format!("Failed to read status: {e}"))?;
    print!("{}", format_status(&status, args.format)?);
    Ok(())
}

fn run_books(store: &Store, args: FormatArgs) -> Result<(), Failure> {
    let books = store
        .books()
        .map_err(|e| format!("Failed to list books: {e}"))?;
    print!("{}", format_books(&books, args.format)?);
    Ok(())
}

fn run_lookup(store: &Store, args: LookupArgs) -> Result<(), Failure> {
    let lookup = store
        .lookup_purchases(&args.name)
        .map_err(|e| format!("Lookup failed: {e}"))?;
    if lookup.is_ambiguous() {
        eprintln!(
            "warning: customers {:?} share the name '{}'",
            lookup.customer_ids(),
            args.name
        );
    }
    print!("{}", format_lookup(&lookup, args.format)?);
    Ok(())
}

/// Drives the session state machine through lookup, book selection, and
/// recording.
fn run_record(store: &Store, args: RecordArgs) -> Result<(), Failure> {
    let lookup = store
        .lookup_purchases(&args.name)
        .map_err(|e| format!("Lookup failed: {e}"))?;

    let custid = match args.custid {
        Some(custid) if !lookup.customer_ids().contains(&custid) => {
            return Err(Failure::Recoverable(format!(
                "customer {custid} has no purchases under the name '{}'",
                args.name
            )));
        }
        Some(custid) => Some(custid),
        None => {
            if lookup.is_ambiguous() {
                eprintln!(
                    "warning: customers {:?} share the name '{}'; using {}. Pass --custid to choose.",
                    lookup.customer_ids(),
                    args.name,
                    lookup.custid.unwrap_or_default()
                );
            }
            lookup.custid
        }
    };

    let state = SessionState::default().transition(SessionEvent::LookupCompleted {
        name: args.name.clone(),
        custid,
    });
    if state.customer().is_none() {
        return Err(Failure::Recoverable(format!(
            "{NO_PURCHASES} Look up an existing customer first."
        )));
    }

    let choice: BookChoice = args
        .book
        .parse()
        .map_err(|e| Failure::Recoverable(format!("{e}")))?;
    if let Some(bookid) = choice.bookid() {
        let books = store
            .books()
            .map_err(|e| format!("Failed to list books: {e}"))?;
        if !books.iter().any(|b| b.bookid == bookid) {
            return Err(Failure::Recoverable(format!("no book with id {bookid}")));
        }
    }

    let state = state.transition(SessionEvent::BookChosen(choice.bookid()));
    let selection = state
        .selection()
        .map(|(custid, name, bookid)| (custid, name.to_string(), bookid));
    let Some((custid, name, bookid)) = selection else {
        return Err(Failure::Recoverable("no book selected".to_string()));
    };

    match store.record_purchase(custid, bookid, &args.price) {
        Ok(order) => {
            let state = state.transition(SessionEvent::PurchaseRecorded {
                orderid: order.orderid,
            });
            debug!(?state, "session");
            println!(
                "Transaction recorded: order {} for {name} (customer {}), book {}, price {}, date {}",
                order.orderid, order.custid, order.bookid, order.saleprice, order.orderdate
            );
            Ok(())
        }
        Err(StoreError::InvalidPrice(err)) => {
            let state = state.transition(SessionEvent::PriceRejected {
                input: err.input.clone(),
            });
            debug!(?state, "session");
            Err(Failure::Recoverable(err.to_string()))
        }
        Err(err) => Err(Failure::Fatal(format!("Recording failed: {err}"))),
    }
}

fn run_query(store: &Store, args: QueryArgs) -> Result<(), Failure> {
    let table = store
        .query(&args.sql, rusqlite::params_from_iter(args.params.iter()))
        .map_err(|e| format!("Query failed: {e}"))?;
    print!("{}", format_table(&table, args.format)?);
    Ok(())
}
