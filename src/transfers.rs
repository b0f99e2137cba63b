use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use color_eyre::eyre::{OptionExt, Result};
use cqrs_es::{CqrsFramework, EventStore, Query, persist::PersistedEventStore};
use futures::FutureExt;
use sqlite_es::{SqliteEventRepository, SqliteViewRepository, init_tables, sqlite_aggregate_cqrs};
use sqlx::{Pool, Sqlite};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time::{Instant, interval_at},
};
use tracing::{debug, info, warn};

use crate::{
    config::TransferSettings,
    csv::{CsvTransferAction, TransferAction},
    domain::{
        props::{RequestId, WorkflowId},
        transfer::{
            aggregate::{TransferServices, TransferWorkflow},
            command::{
                CompleteOtpConfirmationPayload, CompleteRecipientLookupPayload,
                ConfirmationOutcome, EnterAccountNumberPayload, EnterAmountPayload,
                EnterOtpCodePayload, LookupOutcome, SelectBankPayload, TransferCommand,
            },
            state::{ResolutionFailure, Step},
        },
    },
    query::{
        receipt::{ReceiptQueryRepository, TransferReceiptView, init_receipts_table},
        workflow::WorkflowSnapshots,
    },
    services::{
        directory::{RecipientDirectory, SimulatedDirectory},
        navigation::{LogNavigator, Navigator},
        otp::{OtpConfirmer, SimulatedConfirmer},
    },
};

const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

pub struct Collaborators {
    pub directory: Arc<dyn RecipientDirectory>,
    pub confirmer: Arc<dyn OtpConfirmer>,
    pub navigator: Arc<dyn Navigator>,
}

impl Collaborators {
    pub fn simulated(settings: &TransferSettings) -> Self {
        Collaborators {
            directory: Arc::new(SimulatedDirectory::new(settings.lookup_delay())),
            confirmer: Arc::new(SimulatedConfirmer::new(settings.confirmation_delay())),
            navigator: Arc::new(LogNavigator {}),
        }
    }
}

// Owns the workflow aggregate store and hands out sessions. The aggregate only
// decides; lookups, confirmations and the countdown run here as tokio tasks
// and report back through the session's completion channel.
pub struct Transfers<ES: EventStore<TransferWorkflow>> {
    cqrs: CqrsFramework<TransferWorkflow, ES>,
    snapshots: WorkflowSnapshots,
    collaborators: Collaborators,
}

pub type SqliteTransfers =
    Transfers<PersistedEventStore<SqliteEventRepository, TransferWorkflow>>;

impl SqliteTransfers {
    pub async fn new(sqlite_pool: Pool<Sqlite>, collaborators: Collaborators) -> Self {
        #[allow(clippy::expect_used)]
        init_tables(&sqlite_pool)
            .await
            .expect("Failed to initialize DB tables");
        init_receipts_table(&sqlite_pool).await;

        let view_repo = SqliteViewRepository::<TransferReceiptView, TransferWorkflow>::new(
            "transfer_receipts",
            sqlite_pool.clone(),
        );
        let receipt_query = ReceiptQueryRepository::new(Arc::new(view_repo));
        let snapshots = WorkflowSnapshots::default();

        let queries: Vec<Box<dyn Query<TransferWorkflow>>> =
            vec![Box::new(receipt_query), Box::new(snapshots.clone())];
        let cqrs = sqlite_aggregate_cqrs(sqlite_pool, queries, TransferServices {});

        Transfers {
            cqrs,
            snapshots,
            collaborators,
        }
    }
}

impl<ES: EventStore<TransferWorkflow>> Transfers<ES> {
    pub fn begin(&self) -> TransferSession<'_, ES> {
        let workflow_id = WorkflowId::generate();
        debug!("Opening {}", workflow_id);

        let (completions_tx, completions) = mpsc::unbounded_channel();

        TransferSession {
            workflow_id,
            transfers: self,
            completions_tx,
            completions,
            lookup: None,
            countdown: None,
            confirmation: None,
        }
    }
}

/// One transfer workflow from the first keystroke to its receipt.
pub struct TransferSession<'a, ES: EventStore<TransferWorkflow>> {
    workflow_id: WorkflowId,
    transfers: &'a Transfers<ES>,
    completions_tx: UnboundedSender<TransferCommand>,
    completions: UnboundedReceiver<TransferCommand>,
    lookup: Option<(RequestId, JoinHandle<()>)>,
    countdown: Option<JoinHandle<()>>,
    confirmation: Option<JoinHandle<()>>,
}

impl<ES: EventStore<TransferWorkflow>> TransferSession<'_, ES> {
    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn workflow(&self) -> TransferWorkflow {
        self.transfers.snapshots.get(&self.workflow_id)
    }

    pub fn countdown_active(&self) -> bool {
        self.countdown.is_some()
    }

    pub async fn select_bank(&mut self, bank: impl Into<String>) -> Result<()> {
        self.execute(TransferCommand::SelectBank(SelectBankPayload {
            bank: bank.into(),
        }))
        .await
    }

    pub async fn enter_account_number(&mut self, account_number: impl Into<String>) -> Result<()> {
        self.execute(TransferCommand::EnterAccountNumber(
            EnterAccountNumberPayload {
                account_number: account_number.into(),
            },
        ))
        .await
    }

    pub async fn enter_amount(&mut self, amount: impl Into<String>) -> Result<()> {
        self.execute(TransferCommand::EnterAmount(EnterAmountPayload {
            amount: amount.into(),
        }))
        .await
    }

    pub async fn proceed_to_otp(&mut self) -> Result<()> {
        self.execute(TransferCommand::ProceedToOtp).await
    }

    pub async fn enter_otp_code(&mut self, code: impl Into<String>) -> Result<()> {
        self.execute(TransferCommand::EnterOtpCode(EnterOtpCodePayload {
            code: code.into(),
        }))
        .await
    }

    pub async fn submit_otp(&mut self) -> Result<()> {
        self.execute(TransferCommand::SubmitOtp).await
    }

    pub async fn cancel_otp(&mut self) -> Result<()> {
        self.execute(TransferCommand::CancelOtp).await
    }

    pub async fn acknowledge(&mut self) -> Result<()> {
        self.execute(TransferCommand::AcknowledgeReceipt).await?;
        self.transfers.collaborators.navigator.to_transactions();

        Ok(())
    }

    pub async fn abandon(&mut self) -> Result<()> {
        self.execute(TransferCommand::AbandonTransfer).await?;
        self.transfers.collaborators.navigator.back();

        Ok(())
    }

    /// Waits for the next background result and applies it.
    pub async fn next_completion(&mut self) -> Result<()> {
        let command = self
            .completions
            .recv()
            .await
            .ok_or_eyre("Completion channel closed")?;

        self.execute(command).await
    }

    /// Applies background results until no lookup or confirmation is pending.
    /// Countdown ticks that arrive meanwhile are applied as well.
    pub async fn settle(&mut self) -> Result<()> {
        while self.lookup.is_some() || self.confirmation.is_some() {
            self.next_completion().await?;
        }

        Ok(())
    }

    pub async fn handle(&mut self, row: CsvTransferAction) -> Result<()> {
        let action = row.action;
        match action {
            TransferAction::SelectBank => self.select_bank(require_value(row)?).await,
            TransferAction::EnterAccount => self.enter_account_number(require_value(row)?).await,
            TransferAction::EnterAmount => self.enter_amount(require_value(row)?).await,
            TransferAction::Await => self.settle().await,
            TransferAction::Proceed => self.proceed_to_otp().await,
            TransferAction::EnterOtp => self.enter_otp_code(require_value(row)?).await,
            TransferAction::SubmitOtp => self.submit_otp().await,
            TransferAction::CancelOtp => self.cancel_otp().await,
            TransferAction::Acknowledge => self.acknowledge().await,
            TransferAction::Abandon => self.abandon().await,
        }
    }

    async fn execute(&mut self, command: TransferCommand) -> Result<()> {
        let step_before = self.workflow().state().step();

        self.transfers
            .cqrs
            .execute(&self.workflow_id, command)
            .await?;

        let workflow = self.workflow();
        let completed = workflow
            .state()
            .receipt()
            .filter(|_| step_before != Step::Success);
        if let Some(receipt) = completed {
            info!(
                "Transfer {} of {} to {} completed",
                receipt.reference, receipt.amount, receipt.masked_account_number
            );
        }

        self.reconcile(&workflow);

        Ok(())
    }

    // Brings background jobs in line with the state just committed.
    fn reconcile(&mut self, workflow: &TransferWorkflow) {
        match workflow.pending_lookup() {
            Some(pending) => {
                let request_id = pending.request_id;
                let running = self.lookup.as_ref().map(|(running, _)| *running);
                if running != Some(request_id) {
                    self.abort_lookup();

                    let directory = self.transfers.collaborators.directory.clone();
                    let tx = self.completions_tx.clone();
                    let handle = tokio::spawn(async move {
                        // A job must always report back or `settle` never returns.
                        let outcome = AssertUnwindSafe(
                            directory.resolve(&pending.account_number, &pending.bank),
                        )
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            warn!("Recipient lookup {} panicked", request_id);
                            LookupOutcome::Failed(ResolutionFailure::Unavailable(
                                "Recipient lookup failed".to_owned(),
                            ))
                        });
                        let _ = tx.send(TransferCommand::CompleteRecipientLookup(
                            CompleteRecipientLookupPayload {
                                request_id,
                                outcome,
                            },
                        ));
                    });
                    self.lookup = Some((request_id, handle));
                }
            }
            None => self.abort_lookup(),
        }

        if workflow.countdown_running() {
            if self.countdown.is_none() {
                let tx = self.completions_tx.clone();
                self.countdown = Some(tokio::spawn(async move {
                    let mut ticker = interval_at(Instant::now() + COUNTDOWN_PERIOD, COUNTDOWN_PERIOD);
                    loop {
                        ticker.tick().await;
                        if tx.send(TransferCommand::TickOtpCountdown).is_err() {
                            break;
                        }
                    }
                }));
            }
        } else if let Some(handle) = self.countdown.take() {
            handle.abort();
            self.drop_queued_ticks();
        }

        match workflow.pending_confirmation() {
            Some(code) => {
                if self.confirmation.is_none() {
                    let confirmer = self.transfers.collaborators.confirmer.clone();
                    let tx = self.completions_tx.clone();
                    let code = code.to_owned();
                    self.confirmation = Some(tokio::spawn(async move {
                        let outcome = AssertUnwindSafe(confirmer.confirm(&code))
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|_| {
                                warn!("OTP confirmation panicked");
                                ConfirmationOutcome::Rejected {
                                    reason: "OTP confirmation failed".to_owned(),
                                }
                            });
                        let _ = tx.send(TransferCommand::CompleteOtpConfirmation(
                            CompleteOtpConfirmationPayload { outcome },
                        ));
                    }));
                }
            }
            None => {
                if let Some(handle) = self.confirmation.take() {
                    handle.abort();
                }
            }
        }
    }

    fn abort_lookup(&mut self) {
        if let Some((request_id, handle)) = self.lookup.take() {
            debug!("Cancelling lookup {}", request_id);
            handle.abort();
        }
    }

    // Ticks queued by a stopped ticker must not reach a later challenge.
    fn drop_queued_ticks(&mut self) {
        let mut kept = Vec::new();
        while let Ok(command) = self.completions.try_recv() {
            if !matches!(command, TransferCommand::TickOtpCountdown) {
                kept.push(command);
            }
        }

        for command in kept {
            let _ = self.completions_tx.send(command);
        }
    }
}

impl<ES: EventStore<TransferWorkflow>> Drop for TransferSession<'_, ES> {
    fn drop(&mut self) {
        self.abort_lookup();
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
        if let Some(handle) = self.confirmation.take() {
            handle.abort();
        }
        self.transfers.snapshots.forget(&self.workflow_id);
    }
}

fn require_value(row: CsvTransferAction) -> Result<String> {
    row.value
        .ok_or_eyre(format!("No value found in row for action {:?}", row.action))
}

#[cfg(test)]
impl Transfers<cqrs_es::mem_store::MemStore<TransferWorkflow>> {
    pub fn in_memory(collaborators: Collaborators) -> Self {
        let snapshots = WorkflowSnapshots::default();
        let queries: Vec<Box<dyn Query<TransferWorkflow>>> = vec![Box::new(snapshots.clone())];
        let cqrs = CqrsFramework::new(
            cqrs_es::mem_store::MemStore::default(),
            queries,
            TransferServices {},
        );

        Transfers {
            cqrs,
            snapshots,
            collaborators,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use color_eyre::eyre::Report;
    use cqrs_es::{AggregateError, EventStore, mem_store::MemStore};
    use rust_decimal::dec;
    use tokio::time::Instant;

    use crate::{
        csv::{CsvTransferAction, TransferAction},
        domain::transfer::{
            aggregate::TransferWorkflow,
            command::{ConfirmationOutcome, LookupOutcome},
            draft::{FieldError, FieldErrors},
            error::TransferError,
            state::{RecipientResolution, ResolutionFailure, Step, WorkflowState},
        },
        services::{directory::RecipientDirectory, navigation::Navigator, otp::OtpConfirmer},
        transfers::{Collaborators, TransferSession, Transfers},
    };

    const LOOKUP_DELAY: Duration = Duration::from_millis(1500);
    const CONFIRMATION_DELAY: Duration = Duration::from_secs(5);

    // Names the holder after the account number so superseded lookups are
    // distinguishable.
    struct FixedDirectory {}

    #[async_trait]
    impl RecipientDirectory for FixedDirectory {
        async fn resolve(&self, account_number: &str, _bank: &str) -> LookupOutcome {
            tokio::time::sleep(LOOKUP_DELAY).await;
            if account_number == "0000000000" {
                return LookupOutcome::Failed(ResolutionFailure::NotFound);
            }
            LookupOutcome::Found(format!("Holder {}", account_number))
        }
    }

    struct FixedConfirmer {}

    #[async_trait]
    impl OtpConfirmer for FixedConfirmer {
        async fn confirm(&self, code: &str) -> ConfirmationOutcome {
            tokio::time::sleep(CONFIRMATION_DELAY).await;
            if code == "000000" {
                return ConfirmationOutcome::Rejected {
                    reason: "Invalid code".to_owned(),
                };
            }
            ConfirmationOutcome::Confirmed {
                reference: "REF-424242".to_owned(),
            }
        }
    }

    struct CrashingDirectory {}

    #[async_trait]
    impl RecipientDirectory for CrashingDirectory {
        async fn resolve(&self, _account_number: &str, _bank: &str) -> LookupOutcome {
            tokio::time::sleep(LOOKUP_DELAY).await;
            panic!("directory connection dropped");
        }
    }

    struct CrashingConfirmer {}

    #[async_trait]
    impl OtpConfirmer for CrashingConfirmer {
        async fn confirm(&self, _code: &str) -> ConfirmationOutcome {
            tokio::time::sleep(CONFIRMATION_DELAY).await;
            panic!("confirmation service dropped");
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<&'static str>>,
    }

    impl Navigator for RecordingNavigator {
        fn to_transactions(&self) {
            self.visits.lock().unwrap().push("transactions");
        }

        fn back(&self) {
            self.visits.lock().unwrap().push("back");
        }
    }

    fn transfers() -> (Transfers<MemStore<TransferWorkflow>>, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::default());
        let transfers = Transfers::in_memory(Collaborators {
            directory: Arc::new(FixedDirectory {}),
            confirmer: Arc::new(FixedConfirmer {}),
            navigator: navigator.clone(),
        });

        (transfers, navigator)
    }

    fn user_error(err: &Report) -> &TransferError {
        match err.downcast_ref::<AggregateError<TransferError>>() {
            Some(AggregateError::UserError(e)) => e,
            other => panic!("expected a transfer error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_resolves_name_after_delay() {
        let (transfers, _) = transfers();
        let mut session = transfers.begin();
        let started = Instant::now();

        session.select_bank("Example Bank").await.unwrap();
        session.enter_account_number("1234567890").await.unwrap();
        assert!(session.workflow().pending_lookup().is_some());

        session.settle().await.unwrap();

        assert!(started.elapsed() >= LOOKUP_DELAY);
        assert_eq!(
            resolved_name(&session.workflow()).as_deref(),
            Some("Holder 1234567890")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn latest_account_number_wins() {
        let (transfers, _) = transfers();
        let mut session = transfers.begin();

        session.select_bank("Zenith Bank").await.unwrap();
        session.enter_account_number("1111111111").await.unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;
        session.enter_account_number("2222222222").await.unwrap();

        session.settle().await.unwrap();

        assert_eq!(
            resolved_name(&session.workflow()).as_deref(),
            Some("Holder 2222222222")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_lookup_blocks_proceed() {
        let (transfers, _) = transfers();
        let mut session = transfers.begin();

        session.select_bank("Zenith Bank").await.unwrap();
        session.enter_account_number("0000000000").await.unwrap();
        session.enter_amount("100").await.unwrap();
        session.settle().await.unwrap();

        let err = session.proceed_to_otp().await.unwrap_err();
        assert_eq!(user_error(&err), &TransferError::RecipientUnresolved);
    }

    #[tokio::test(start_paused = true)]
    async fn short_account_number_never_resolves() {
        let (transfers, _) = transfers();
        let mut session = transfers.begin();

        session.select_bank("Zenith Bank").await.unwrap();
        session.enter_account_number("123").await.unwrap();
        session.enter_amount("5000").await.unwrap();
        session.settle().await.unwrap();

        assert!(session.workflow().pending_lookup().is_none());
        assert_eq!(resolved_name(&session.workflow()), None);

        let err = session.proceed_to_otp().await.unwrap_err();
        assert_eq!(
            user_error(&err),
            &TransferError::InvalidDraft(FieldErrors(vec![FieldError::AccountNumberLength]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_once_per_second_until_zero() {
        let (transfers, _) = transfers();
        let mut session = transfers.begin();
        resolved_details(&mut session).await;

        session.proceed_to_otp().await.unwrap();
        assert!(session.countdown_active());
        let started = Instant::now();

        for expected in (0..300).rev() {
            session.next_completion().await.unwrap();
            let workflow = session.workflow();
            let challenge = workflow.state().challenge().unwrap();
            assert_eq!(challenge.remaining_seconds, expected);
        }

        assert_eq!(started.elapsed(), Duration::from_secs(300));
        assert!(!session.countdown_active());
        assert_eq!(session.workflow().state().challenge().unwrap().expires_in(), "0:00");

        session.enter_otp_code("123456").await.unwrap();
        let err = session.submit_otp().await.unwrap_err();
        assert_eq!(user_error(&err), &TransferError::OtpExpired);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_otp_produces_receipt() {
        let (transfers, navigator) = transfers();
        let mut session = transfers.begin();
        resolved_details(&mut session).await;

        session.proceed_to_otp().await.unwrap();
        session.enter_otp_code("12 34 56").await.unwrap();
        session.submit_otp().await.unwrap();
        assert_eq!(session.workflow().pending_confirmation(), Some("123456"));

        session.settle().await.unwrap();

        let workflow = session.workflow();
        assert_eq!(workflow.state().step(), Step::Success);
        assert!(!session.countdown_active());
        let receipt = workflow.state().receipt().unwrap();
        assert_eq!(receipt.reference, "REF-424242");
        assert_eq!(*receipt.amount, dec!(5000));
        assert_eq!(receipt.recipient, "Holder 0123456789");
        assert_eq!(receipt.bank, "Wema Bank");
        assert_eq!(receipt.account_number, "0123456789");
        assert_eq!(receipt.masked_account_number, "******6789");

        session.acknowledge().await.unwrap();
        assert!(session.workflow().is_discarded());
        assert_eq!(*navigator.visits.lock().unwrap(), vec!["transactions"]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_otp_can_be_retried() {
        let (transfers, _) = transfers();
        let mut session = transfers.begin();
        resolved_details(&mut session).await;

        session.proceed_to_otp().await.unwrap();
        session.enter_otp_code("000000").await.unwrap();
        session.submit_otp().await.unwrap();
        session.settle().await.unwrap();

        let workflow = session.workflow();
        let challenge = workflow.state().challenge().unwrap();
        assert_eq!(challenge.rejection.as_deref(), Some("Invalid code"));
        assert_eq!(challenge.code, "");
        assert!(session.countdown_active());

        session.enter_otp_code("654321").await.unwrap();
        session.submit_otp().await.unwrap();
        session.settle().await.unwrap();
        assert_eq!(session.workflow().state().step(), Step::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_returns_to_details_and_stops_countdown() {
        let (transfers, _) = transfers();
        let mut session = transfers.begin();
        resolved_details(&mut session).await;
        let draft = session.workflow().state().draft().clone();

        session.proceed_to_otp().await.unwrap();
        session.next_completion().await.unwrap();
        session.next_completion().await.unwrap();
        session.cancel_otp().await.unwrap();

        assert!(!session.countdown_active());
        let workflow = session.workflow();
        assert_eq!(workflow.state().step(), Step::Details);
        assert_eq!(workflow.state().draft(), &draft);
        assert!(workflow.state().can_proceed());

        // A fresh challenge starts from the full five minutes.
        tokio::time::sleep(Duration::from_secs(3)).await;
        session.proceed_to_otp().await.unwrap();
        session.next_completion().await.unwrap();
        assert_eq!(
            session.workflow().state().challenge().unwrap().remaining_seconds,
            299
        );
    }

    #[tokio::test(start_paused = true)]
    async fn abandon_navigates_back_and_closes_workflow() {
        let (transfers, navigator) = transfers();
        let mut session = transfers.begin();

        session.select_bank("Wema Bank").await.unwrap();
        session.abandon().await.unwrap();

        assert_eq!(*navigator.visits.lock().unwrap(), vec!["back"]);
        let err = session.enter_amount("10").await.unwrap_err();
        assert_eq!(user_error(&err), &TransferError::WorkflowDiscarded);
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_actions_drive_session() {
        let (transfers, _) = transfers();
        let mut session = transfers.begin();

        let script = [
            (TransferAction::SelectBank, Some("Wema Bank")),
            (TransferAction::EnterAccount, Some("0123456789")),
            (TransferAction::EnterAmount, Some("250.75")),
            (TransferAction::Await, None),
            (TransferAction::Proceed, None),
            (TransferAction::EnterOtp, Some("123456")),
            (TransferAction::SubmitOtp, None),
            (TransferAction::Await, None),
        ];
        for (action, value) in script {
            session
                .handle(CsvTransferAction {
                    action,
                    value: value.map(str::to_owned),
                })
                .await
                .unwrap();
        }

        let workflow = session.workflow();
        assert_eq!(*workflow.state().receipt().unwrap().amount, dec!(250.75));

        let err = session
            .handle(CsvTransferAction {
                action: TransferAction::SelectBank,
                value: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No value found"));
    }

    #[tokio::test(start_paused = true)]
    async fn crashed_lookup_settles_as_unavailable() {
        let transfers = Transfers::in_memory(Collaborators {
            directory: Arc::new(CrashingDirectory {}),
            confirmer: Arc::new(FixedConfirmer {}),
            navigator: Arc::new(RecordingNavigator::default()),
        });
        let mut session = transfers.begin();

        session.select_bank("Wema Bank").await.unwrap();
        session.enter_account_number("0123456789").await.unwrap();
        session.enter_amount("5000").await.unwrap();
        session.settle().await.unwrap();

        let workflow = session.workflow();
        let WorkflowState::Details { resolution, .. } = workflow.state() else {
            panic!("expected details step");
        };
        assert!(matches!(
            resolution,
            RecipientResolution::Failed {
                failure: ResolutionFailure::Unavailable(_),
                ..
            }
        ));
        let err = session.proceed_to_otp().await.unwrap_err();
        assert_eq!(user_error(&err), &TransferError::RecipientUnresolved);
    }

    #[tokio::test(start_paused = true)]
    async fn crashed_confirmation_settles_as_rejected() {
        let transfers = Transfers::in_memory(Collaborators {
            directory: Arc::new(FixedDirectory {}),
            confirmer: Arc::new(CrashingConfirmer {}),
            navigator: Arc::new(RecordingNavigator::default()),
        });
        let mut session = transfers.begin();
        resolved_details(&mut session).await;

        session.proceed_to_otp().await.unwrap();
        session.enter_otp_code("123456").await.unwrap();
        session.submit_otp().await.unwrap();
        session.settle().await.unwrap();

        let workflow = session.workflow();
        let challenge = workflow.state().challenge().unwrap();
        assert_eq!(challenge.rejection.as_deref(), Some("OTP confirmation failed"));
        assert!(!challenge.is_submitting);
        assert_eq!(workflow.state().step(), Step::Otp);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_session_forgets_workflow() {
        let (transfers, _) = transfers();
        let workflow_id = {
            let mut session = transfers.begin();
            session.select_bank("Wema Bank").await.unwrap();
            session.workflow_id().clone()
        };

        assert!(transfers.snapshots.get(&workflow_id).state().draft().bank.is_empty());
    }

    fn resolved_name(workflow: &TransferWorkflow) -> Option<String> {
        match workflow.state() {
            WorkflowState::Details { resolution, .. } => resolution.name().map(str::to_owned),
            _ => None,
        }
    }

    async fn resolved_details<ES: EventStore<TransferWorkflow>>(
        session: &mut TransferSession<'_, ES>,
    ) {
        session.select_bank("Wema Bank").await.unwrap();
        session.enter_account_number("0123456789").await.unwrap();
        session.enter_amount("5000").await.unwrap();
        session.settle().await.unwrap();
        assert!(session.workflow().state().can_proceed());
    }
}
