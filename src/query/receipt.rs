use std::io;

use color_eyre::eyre::{Result, eyre};
use cqrs_es::{EventEnvelope, View, persist::GenericQuery};
use csv::WriterBuilder;
use futures::TryStreamExt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlite_es::SqliteViewRepository;
use sqlx::{Pool, Row, Sqlite, SqlitePool};

use crate::domain::transfer::{aggregate::TransferWorkflow, event::TransferEvent};

pub(crate) type ReceiptQueryRepository = GenericQuery<
    SqliteViewRepository<TransferReceiptView, TransferWorkflow>,
    TransferReceiptView,
    TransferWorkflow,
>;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub(crate) struct TransferReceiptView {
    #[serde(rename = "workflow")]
    pub workflow_id: String,
    pub reference: String,
    pub amount: Decimal,
    pub recipient: String,
    pub bank: String,
    #[serde(rename = "account")]
    pub masked_account_number: String,
    pub acknowledged: bool,
}

impl View<TransferWorkflow> for TransferReceiptView {
    fn update(&mut self, event: &EventEnvelope<TransferWorkflow>) {
        match &event.payload {
            TransferEvent::TransferCompleted(p) => {
                self.workflow_id = event.aggregate_id.clone();
                self.reference = p.receipt.reference.clone();
                self.amount = *p.receipt.amount;
                self.recipient = p.receipt.recipient.clone();
                self.bank = p.receipt.bank.clone();
                self.masked_account_number = p.receipt.masked_account_number.clone();
            }
            TransferEvent::ReceiptAcknowledged => {
                self.acknowledged = true;
            }
            _ => {}
        }
    }
}

#[allow(clippy::expect_used)] // without this working, it's a show over
pub async fn init_receipts_table(sqlite_pool: &Pool<Sqlite>) {
    let _ = sqlx::query(
        "CREATE TABLE IF NOT EXISTS transfer_receipts
            (
                view_id text                        NOT NULL,
                version bigint CHECK (version >= 0) NOT NULL,
                payload json                        NOT NULL,
                PRIMARY KEY (view_id)
            );",
    )
    .execute(&sqlite_pool.clone())
    .await
    .expect("Failed to initialize transfer_receipts table");
}

pub async fn print_receipts_csv(sqlite_pool: &SqlitePool) -> Result<()> {
    write_receipts_csv(sqlite_pool, io::stdout()).await
}

// Every workflow gets a view row; only completed transfers are written, in
// the order their workflows started.
async fn write_receipts_csv<W: io::Write>(sqlite_pool: &SqlitePool, writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);

    let mut query =
        sqlx::query("select payload from transfer_receipts order by rowid").fetch(sqlite_pool);
    while let Some(row) = query.try_next().await.map_err(|e| eyre!(e))? {
        let s: String = row.get("payload");
        let completed = serde_json::from_str::<TransferReceiptView>(&s)
            .ok()
            .filter(|obj| !obj.reference.is_empty());
        if let Some(obj) = completed {
            csv_writer.serialize(obj)?;
        }
    }

    csv_writer.flush()?;

    Ok(())
}
