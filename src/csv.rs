use std::io::Write;

use color_eyre::eyre::{Result, eyre};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::feed::{
    record::TransactionRecord,
    view::{FeedStats, PageWindow},
};

/// One scripted step of a transfer, as read from an actions file.
#[derive(Debug, Serialize, Deserialize)]
pub struct CsvTransferAction {
    pub action: TransferAction,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TransferAction {
    SelectBank,
    EnterAccount,
    EnterAmount,
    /// Wait for outstanding lookups and confirmations.
    Await,
    Proceed,
    EnterOtp,
    SubmitOtp,
    CancelOtp,
    Acknowledge,
    Abandon,
}

#[derive(Debug, Serialize)]
struct CsvFeedStats {
    income: String,
    expense: String,
    balance: String,
}

#[derive(Debug, Serialize)]
struct CsvFeedRow<'a> {
    id: &'a str,
    date: String,
    description: &'a str,
    reference: &'a str,
    direction: String,
    amount: String,
    status: String,
}

pub fn read_input<D: serde::de::DeserializeOwned>(
    file_path: &str,
) -> Result<impl Iterator<Item = Result<D>>> {
    let reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(file_path)
        .map_err(|e| eyre!("Could not read input file: {}", e))?;

    Ok(reader
        .into_deserialize()
        .map(|r| r.map_err(|ee| eyre!("Error parsing row: {}", ee))))
}

/// Totals block, a blank line, then the page rows and a summary line.
pub fn write_feed_csv<W: Write>(
    mut out: W,
    stats: &FeedStats,
    page: &PageWindow<'_>,
) -> Result<()> {
    {
        let mut stats_writer = WriterBuilder::new().from_writer(&mut out);
        stats_writer.serialize(CsvFeedStats {
            income: money(stats.income),
            expense: money(stats.expense),
            balance: money(stats.balance),
        })?;
        stats_writer.flush()?;
    }
    writeln!(out)?;

    if page.is_empty() {
        writeln!(out, "No transactions found")?;
        return Ok(());
    }

    {
        let mut rows_writer = WriterBuilder::new().from_writer(&mut out);
        for record in &page.records {
            rows_writer.serialize(feed_row(record))?;
        }
        rows_writer.flush()?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{} (page {} of {})",
        page.summary(),
        page.number,
        page.total_pages
    )?;

    Ok(())
}

fn feed_row(record: &TransactionRecord) -> CsvFeedRow<'_> {
    CsvFeedRow {
        id: &record.id,
        date: record.occurred_at.to_string(),
        description: &record.description,
        reference: &record.reference,
        direction: record.direction.to_string(),
        amount: money(record.amount),
        status: record.status.to_string(),
    }
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}
