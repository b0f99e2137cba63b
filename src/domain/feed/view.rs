use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::feed::record::{Direction, TransactionRecord};

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

impl FeedStats {
    /// Totals over the full record set; search and paging never affect them.
    /// `None` when a total leaves the `Decimal` range.
    pub fn compute(records: &[TransactionRecord]) -> Option<Self> {
        let (income, expense) = records.iter().try_fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(income, expense), r| match r.direction {
                Direction::Credit => Some((income.checked_add(r.amount)?, expense)),
                Direction::Debit => Some((income, expense.checked_add(r.amount)?)),
            },
        )?;

        Some(FeedStats {
            income,
            expense,
            balance: income.checked_sub(expense)?,
        })
    }
}

/// Case-insensitive substring match on description or reference. An empty
/// query keeps everything.
pub fn filter_records<'a>(records: &'a [TransactionRecord], query: &str) -> Vec<&'a TransactionRecord> {
    let needle = query.to_lowercase();

    records
        .iter()
        .filter(|r| {
            needle.is_empty()
                || r.description.to_lowercase().contains(&needle)
                || r.reference.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn total_pages(item_count: usize) -> usize {
    item_count.div_ceil(PAGE_SIZE)
}

/// One page of a filtered record list.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow<'a> {
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// 0-based index of the first record shown.
    pub start_index: usize,
    /// Exclusive end, clamped to `total_items`.
    pub end_index: usize,
    pub records: Vec<&'a TransactionRecord>,
}

impl<'a> PageWindow<'a> {
    pub fn new(filtered: Vec<&'a TransactionRecord>, number: usize) -> Self {
        let total_items = filtered.len();
        let start_index = number.saturating_sub(1) * PAGE_SIZE;
        let end_index = (start_index + PAGE_SIZE).min(total_items);

        let records = if start_index < total_items {
            filtered[start_index..end_index].to_vec()
        } else {
            Vec::new()
        };

        PageWindow {
            number,
            total_pages: total_pages(total_items),
            total_items,
            start_index,
            end_index,
            records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_items == 0
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    /// "Showing 11 to 20 of 23 entries".
    pub fn summary(&self) -> String {
        format!(
            "Showing {} to {} of {} entries",
            self.start_index + 1,
            self.end_index,
            self.total_items
        )
    }
}
