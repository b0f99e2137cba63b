use chrono::{DateTime, NaiveDateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::feed::log::TransactionLogEntry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[display("debit")]
    Debit,
    #[display("credit")]
    Credit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    #[display("completed")]
    Completed,
    #[display("pending")]
    Pending,
}

/// When a transaction happened. Unparseable source values are kept verbatim
/// instead of failing the whole batch, so this is not safe to sort on blindly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum OccurredAt {
    Valid(DateTime<Utc>),
    Invalid(String),
}

impl OccurredAt {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
            return OccurredAt::Valid(at.with_timezone(&Utc));
        }

        // Timestamps without an offset are read as UTC.
        match NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
            Ok(naive) => OccurredAt::Valid(naive.and_utc()),
            Err(_) => OccurredAt::Invalid(raw.to_owned()),
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            OccurredAt::Valid(at) => Some(at),
            OccurredAt::Invalid(_) => None,
        }
    }
}

impl std::fmt::Display for OccurredAt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OccurredAt::Valid(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M")),
            OccurredAt::Invalid(raw) => write!(f, "invalid date ({})", raw),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    pub amount: Decimal,
    pub direction: Direction,
    pub description: String,
    pub occurred_at: OccurredAt,
    pub status: TxStatus,
    pub reference: String,
}

/// Maps a whole fetch batch; ids are 1-based positions, unique per batch.
pub fn normalize_entries(entries: Vec<TransactionLogEntry>) -> Vec<TransactionRecord> {
    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| normalize_entry(idx + 1, entry))
        .collect()
}

// The micro-debit log has no direction field: every entry is a debit.
pub fn normalize_entry(position: usize, entry: TransactionLogEntry) -> TransactionRecord {
    let reference = reference_from_narration(&entry.narration)
        .unwrap_or_else(|| format!("REF-{:06}", position));

    TransactionRecord {
        id: position.to_string(),
        amount: entry.amount.abs(),
        direction: Direction::Debit,
        description: entry.narration,
        occurred_at: OccurredAt::parse(&entry.created_at),
        status: TxStatus::Completed,
        reference,
    }
}

/// Segment after the last `-`, if that segment has any content.
pub fn reference_from_narration(narration: &str) -> Option<String> {
    let (_, tail) = narration.rsplit_once('-')?;
    let tail = tail.trim();

    (!tail.is_empty()).then(|| tail.to_owned())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::dec;

    use super::*;

    fn entry(narration: &str, amount: Decimal, created_at: &str) -> TransactionLogEntry {
        TransactionLogEntry {
            narration: narration.to_owned(),
            amount,
            created_at: created_at.to_owned(),
        }
    }

    #[test]
    fn normalizes_log_entry() {
        let record = normalize_entry(
            3,
            entry(
                "Mandate debit - Sterling - MD-88231",
                dec!(1500.25),
                "2024-12-20T09:15:00Z",
            ),
        );

        assert_eq!(
            record,
            TransactionRecord {
                id: "3".to_owned(),
                amount: dec!(1500.25),
                direction: Direction::Debit,
                description: "Mandate debit - Sterling - MD-88231".to_owned(),
                occurred_at: OccurredAt::Valid(Utc.with_ymd_and_hms(2024, 12, 20, 9, 15, 0).unwrap()),
                status: TxStatus::Completed,
                reference: "MD-88231".to_owned(),
            }
        );
    }

    #[test]
    fn reference_takes_last_segment() {
        assert_eq!(
            reference_from_narration("Airtime - TXN-2024-001225").as_deref(),
            Some("001225")
        );
        assert_eq!(reference_from_narration("Transfer to Jane"), None);
        assert_eq!(reference_from_narration("Trailing dash -  "), None);
    }

    #[test]
    fn synthesizes_reference_without_separator() {
        let record = normalize_entry(7, entry("Monthly charge", dec!(50), "2024-12-20T09:15:00Z"));

        assert_eq!(record.reference, "REF-000007");
    }

    #[test]
    fn malformed_timestamp_is_representable() {
        let record = normalize_entry(1, entry("Charge - A1", dec!(5), "yesterday"));

        assert_eq!(record.occurred_at, OccurredAt::Invalid("yesterday".to_owned()));
        assert_eq!(record.occurred_at.as_datetime(), None);
    }

    #[test]
    fn offsetless_timestamp_read_as_utc() {
        assert_eq!(
            OccurredAt::parse("2024-12-19T14:32:00"),
            OccurredAt::Valid(Utc.with_ymd_and_hms(2024, 12, 19, 14, 32, 0).unwrap())
        );
        assert_eq!(
            OccurredAt::parse("2024-12-19T15:32:00+01:00"),
            OccurredAt::Valid(Utc.with_ymd_and_hms(2024, 12, 19, 14, 32, 0).unwrap())
        );
    }

    #[test]
    fn amounts_are_non_negative() {
        let record = normalize_entry(1, entry("Reversal - R1", dec!(-20.5), "2024-12-20T09:15:00Z"));

        assert_eq!(record.amount, dec!(20.5));
    }

    #[test]
    fn batch_ids_follow_position() {
        let records = normalize_entries(vec![
            entry("A - 1", dec!(1), "x"),
            entry("B - 2", dec!(2), "x"),
        ]);

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
