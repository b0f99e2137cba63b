#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

use std::{io, str::FromStr, sync::Arc};

use color_eyre::eyre::{Result, eyre};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{CliArgs, Command},
    config::Settings,
    feed::{FeedView, TransactionFeed},
    query::receipt::print_receipts_csv,
    source::{TransactionSource, file::CsvTransactionSource, http::HttpTransactionSource},
    transfers::{Collaborators, SqliteTransfers},
};

pub(crate) mod cli;
mod config;
mod csv;
mod domain;
mod feed;
mod query;
mod services;
mod source;
mod transfers;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli_args = CliArgs::load()?;
    let settings = Settings::load()?;

    match cli_args.command {
        Command::Transactions { query, page } => show_transactions(&settings, query, page).await,
        Command::Transfer { actions_file_path } => {
            run_transfers(&settings, &actions_file_path).await
        }
    }
}

async fn show_transactions(settings: &Settings, query: String, page: usize) -> Result<()> {
    let source: Arc<dyn TransactionSource> = match &settings.feed.log_file {
        Some(log_file) => Arc::new(CsvTransactionSource::new(log_file.as_str())),
        None => Arc::new(HttpTransactionSource::new(&settings.api)?),
    };

    let mut feed = TransactionFeed::new(source);
    feed.refresh().await;

    feed.set_query(query);
    if page != 1 && !feed.go_to_page(page) {
        debug!("Page {} not available, showing page {}", page, feed.page());
    }

    match feed.view() {
        FeedView::Loaded { stats, page } => csv::write_feed_csv(io::stdout().lock(), &stats, &page),
        FeedView::Error(e) => Err(eyre!(e.clone())),
        FeedView::Loading => Err(eyre!("Transaction log was not loaded")),
    }
}

async fn run_transfers(settings: &Settings, actions_file_path: &str) -> Result<()> {
    // Workflow events and receipt projections share one sqlite database,
    // in memory unless configured otherwise.
    let sqlite_pool = sqlite_pool(&settings.database.url).await?;

    let transfers = SqliteTransfers::new(
        sqlite_pool.clone(),
        Collaborators::simulated(&settings.transfer),
    )
    .await;

    let rows = csv::read_input::<csv::CsvTransferAction>(actions_file_path)?;

    let mut session = transfers.begin();
    for row_result in rows {
        match row_result {
            Ok(row) => {
                let _ = session
                    .handle(row)
                    .await
                    .inspect_err(|e| debug!("Error processing row: {}", e));
            }
            Err(e) => debug!("Error parsing row: {}", e),
        }

        // Acknowledged or abandoned: the next rows start a new transfer.
        if session.workflow().is_discarded() {
            session = transfers.begin();
        }
    }
    drop(session);

    print_receipts_csv(&sqlite_pool).await?;

    Ok(())
}

// In-memory databases exist per connection, so the pool keeps exactly one.
async fn sqlite_pool(sqlite_uri: &str) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(sqlite_uri)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await
        .map_err(|e| eyre!(e))
}
