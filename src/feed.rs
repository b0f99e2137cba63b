use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    domain::feed::{
        error::FeedError,
        log::TransactionLogEntry,
        record::{TransactionRecord, normalize_entries},
        view::{FeedStats, PageWindow, filter_records, total_pages},
    },
    source::TransactionSource,
};

type FetchHandle = JoinHandle<Result<Vec<TransactionLogEntry>, FeedError>>;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedState {
    Loading,
    Error(FeedError),
    Loaded {
        records: Vec<TransactionRecord>,
        stats: FeedStats,
    },
}

#[derive(Debug, PartialEq)]
pub enum FeedView<'a> {
    Loading,
    Error(&'a FeedError),
    Loaded {
        stats: FeedStats,
        page: PageWindow<'a>,
    },
}

/// The transaction list: fetched records plus the search query and page the
/// user is looking at.
pub struct TransactionFeed {
    source: Arc<dyn TransactionSource>,
    state: FeedState,
    query: String,
    page: usize,
    in_flight: Option<FetchHandle>,
}

impl TransactionFeed {
    pub fn new(source: Arc<dyn TransactionSource>) -> Self {
        TransactionFeed {
            source,
            state: FeedState::Loading,
            query: String::new(),
            page: 1,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a fetch unless one is already outstanding. Loaded records stay
    /// visible until the new result arrives.
    pub fn load(&mut self) -> bool {
        if self.in_flight.is_some() {
            debug!("Fetch already in flight, ignoring trigger");
            return false;
        }

        if let FeedState::Error(_) = self.state {
            self.state = FeedState::Loading;
        }

        let source = self.source.clone();
        self.in_flight = Some(tokio::spawn(async move { source.fetch_logs().await }));

        true
    }

    /// Waits for the outstanding fetch, if any, and applies its result.
    pub async fn settle(&mut self) {
        let Some(handle) = self.in_flight.take() else {
            return;
        };

        let result = handle
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))
            .and_then(|fetched| fetched);

        match result {
            Ok(entries) => {
                let records = normalize_entries(entries);
                match FeedStats::compute(&records) {
                    Some(stats) => {
                        debug!("Loaded {} transactions", records.len());
                        self.state = FeedState::Loaded { records, stats };
                        self.clamp_page();
                    }
                    None => {
                        warn!("Totals of {} transactions overflow", records.len());
                        self.state = FeedState::Error(FeedError::TotalsOverflow);
                    }
                }
            }
            Err(e) => {
                warn!("Transaction fetch failed: {}", e);
                self.state = FeedState::Error(e);
            }
        }
    }

    pub async fn refresh(&mut self) {
        self.load();
        self.settle().await;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.page = 1;
    }

    pub fn total_pages(&self) -> usize {
        match &self.state {
            FeedState::Loaded { records, .. } => {
                total_pages(filter_records(records, &self.query).len())
            }
            _ => 0,
        }
    }

    /// Out of range pages are ignored.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            debug!("Page {} out of range, staying on {}", page, self.page);
            return false;
        }

        self.page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.go_to_page(self.page.saturating_sub(1))
    }

    pub fn view(&self) -> FeedView<'_> {
        match &self.state {
            FeedState::Loading => FeedView::Loading,
            FeedState::Error(e) => FeedView::Error(e),
            FeedState::Loaded { records, stats } => FeedView::Loaded {
                stats: *stats,
                page: PageWindow::new(filter_records(records, &self.query), self.page),
            },
        }
    }

    // A replaced record set may have fewer pages than the one before.
    fn clamp_page(&mut self) {
        let last = self.total_pages().max(1);
        self.page = self.page.clamp(1, last);
    }
}

impl Drop for TransactionFeed {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
