use std::mem;

use async_trait::async_trait;
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    props::{Amount, RequestId},
    transfer::{
        command::{
            CompleteOtpConfirmationPayload, CompleteRecipientLookupPayload, ConfirmationOutcome,
            EnterOtpCodePayload, LookupOutcome, TransferCommand,
        },
        draft::{FieldErrors, TransferDraft},
        error::TransferError,
        event::{
            DraftEditedPayload, OtpChallengeIssuedPayload, OtpCodeEnteredPayload,
            OtpCountdownTickedPayload, OtpRejectedPayload, OtpSubmittedPayload,
            RecipientLookupFailedPayload, RecipientLookupStartedPayload,
            RecipientResolvedPayload, TransferCompletedPayload, TransferEvent,
        },
        state::{
            OTP_CODE_LEN, OTP_TTL_SECONDS, OtpChallenge, Recipient, RecipientResolution, Step,
            TransferReceipt, WorkflowState,
        },
    },
};

// Aggregate
#[derive(Serialize, Default, Deserialize, Clone, Debug, PartialEq)]
pub struct TransferWorkflow {
    state: WorkflowState,
    last_request_id: RequestId,
    discarded: bool,
}

// Interface to the outside world, not used in this case.
// Lookups and confirmations run outside the aggregate and come back as commands.
pub struct TransferServices {}

type HandleResult =
    Result<Vec<<TransferWorkflow as Aggregate>::Event>, <TransferWorkflow as Aggregate>::Error>;

/// A lookup the state is currently waiting on.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLookup {
    pub request_id: RequestId,
    pub account_number: String,
    pub bank: String,
}

#[async_trait]
impl Aggregate for TransferWorkflow {
    type Command = TransferCommand;
    type Event = TransferEvent;
    type Error = TransferError;
    type Services = TransferServices;

    fn aggregate_type() -> String {
        "TransferWorkflow".to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        _services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        if self.discarded {
            if command.is_completion() {
                debug!("Ignoring {:?} for a closed workflow", command);
                return Ok(vec![]);
            }
            return Err(TransferError::WorkflowDiscarded);
        }

        match command {
            TransferCommand::SelectBank(p) => self.edit_draft(|d| d.bank = p.bank),
            TransferCommand::EnterAccountNumber(p) => {
                self.edit_draft(|d| d.account_number = p.account_number)
            }
            TransferCommand::EnterAmount(p) => self.edit_draft(|d| d.amount = p.amount),
            TransferCommand::CompleteRecipientLookup(p) => self.complete_lookup(p),
            TransferCommand::ProceedToOtp => self.proceed_to_otp(),
            TransferCommand::TickOtpCountdown => self.tick_countdown(),
            TransferCommand::EnterOtpCode(p) => self.enter_otp_code(p),
            TransferCommand::SubmitOtp => self.submit_otp(),
            TransferCommand::CompleteOtpConfirmation(p) => self.complete_confirmation(p),
            TransferCommand::CancelOtp => self.cancel_otp(),
            TransferCommand::AcknowledgeReceipt => self.acknowledge_receipt(),
            TransferCommand::AbandonTransfer => self.abandon(),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            TransferEvent::DraftEdited(p) => {
                if let WorkflowState::Details { draft, .. } = &mut self.state {
                    *draft = p.draft;
                }
            }
            TransferEvent::RecipientLookupStarted(p) => {
                self.last_request_id = p.request_id;
                self.set_resolution(RecipientResolution::Resolving {
                    request_id: p.request_id,
                });
            }
            TransferEvent::RecipientCleared => {
                self.set_resolution(RecipientResolution::Absent);
            }
            TransferEvent::RecipientResolved(p) => {
                self.set_resolution(RecipientResolution::Resolved {
                    request_id: p.request_id,
                    name: p.name,
                });
            }
            TransferEvent::RecipientLookupFailed(p) => {
                self.set_resolution(RecipientResolution::Failed {
                    request_id: p.request_id,
                    failure: p.failure,
                });
            }
            TransferEvent::OtpChallengeIssued(p) => {
                self.state = match mem::take(&mut self.state) {
                    WorkflowState::Details {
                        draft,
                        resolution: RecipientResolution::Resolved { request_id, name },
                    } => WorkflowState::Otp {
                        draft,
                        recipient: Recipient { request_id, name },
                        challenge: OtpChallenge::issue(p.expires_in_seconds),
                    },
                    other => other,
                };
            }
            TransferEvent::OtpCountdownTicked(p) => {
                if let Some(challenge) = self.challenge_mut() {
                    challenge.remaining_seconds = p.remaining_seconds;
                }
            }
            TransferEvent::OtpCodeEntered(p) => {
                if let Some(challenge) = self.challenge_mut() {
                    challenge.code = p.code;
                    challenge.rejection = None;
                }
            }
            TransferEvent::OtpSubmitted(p) => {
                if let Some(challenge) = self.challenge_mut() {
                    challenge.code = p.code;
                    challenge.is_submitting = true;
                    challenge.rejection = None;
                }
            }
            TransferEvent::OtpRejected(p) => {
                if let Some(challenge) = self.challenge_mut() {
                    challenge.code.clear();
                    challenge.is_submitting = false;
                    challenge.rejection = Some(p.reason);
                }
            }
            TransferEvent::OtpCancelled => {
                self.state = match mem::take(&mut self.state) {
                    WorkflowState::Otp {
                        draft, recipient, ..
                    } => WorkflowState::Details {
                        draft,
                        resolution: RecipientResolution::Resolved {
                            request_id: recipient.request_id,
                            name: recipient.name,
                        },
                    },
                    other => other,
                };
            }
            TransferEvent::TransferCompleted(p) => {
                self.state = match mem::take(&mut self.state) {
                    WorkflowState::Otp {
                        draft, recipient, ..
                    } => WorkflowState::Success {
                        draft,
                        recipient,
                        receipt: p.receipt,
                    },
                    other => other,
                };
            }
            TransferEvent::ReceiptAcknowledged | TransferEvent::TransferAbandoned => {
                self.discarded = true;
            }
        }
    }
}

impl TransferWorkflow {
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    pub fn pending_lookup(&self) -> Option<PendingLookup> {
        if self.discarded {
            return None;
        }

        match &self.state {
            WorkflowState::Details {
                draft,
                resolution: RecipientResolution::Resolving { request_id },
            } => Some(PendingLookup {
                request_id: *request_id,
                account_number: draft.account_number.clone(),
                bank: draft.bank.clone(),
            }),
            _ => None,
        }
    }

    /// The submitted code while a confirmation is outstanding.
    pub fn pending_confirmation(&self) -> Option<&str> {
        match &self.state {
            WorkflowState::Otp { challenge, .. } if challenge.is_submitting && !self.discarded => {
                Some(&challenge.code)
            }
            _ => None,
        }
    }

    pub fn countdown_running(&self) -> bool {
        !self.discarded
            && self
                .state
                .challenge()
                .is_some_and(|challenge| !challenge.is_expired())
    }

    fn edit_draft(&self, edit: impl FnOnce(&mut TransferDraft)) -> HandleResult {
        let WorkflowState::Details { draft, resolution } = &self.state else {
            return Err(TransferError::WrongStep(self.state.step()));
        };

        let mut edited = draft.clone();
        edit(&mut edited);
        if edited == *draft {
            return Ok(vec![]);
        }

        let previous_key = draft.lookup_key();
        let next_key = edited.lookup_key();

        let mut events = vec![TransferEvent::DraftEdited(DraftEditedPayload {
            draft: edited,
        })];

        match next_key {
            Some(key) if previous_key.as_ref() != Some(&key) => {
                let request_id = self.last_request_id.next();
                debug!(
                    "Starting recipient lookup {} for {} at {}",
                    request_id, key.account_number, key.bank
                );
                events.push(TransferEvent::RecipientLookupStarted(
                    RecipientLookupStartedPayload {
                        request_id,
                        account_number: key.account_number,
                        bank: key.bank,
                    },
                ));
            }
            Some(_) => {}
            None => {
                if *resolution != RecipientResolution::Absent {
                    events.push(TransferEvent::RecipientCleared);
                }
            }
        }

        Ok(events)
    }

    fn complete_lookup(&self, p: CompleteRecipientLookupPayload) -> HandleResult {
        let current = match &self.state {
            WorkflowState::Details {
                resolution: RecipientResolution::Resolving { request_id },
                ..
            } => *request_id,
            _ => {
                debug!("Discarding lookup {}: nothing is resolving", p.request_id);
                return Ok(vec![]);
            }
        };

        if current != p.request_id {
            debug!(
                "Discarding stale lookup {} (current is {})",
                p.request_id, current
            );
            return Ok(vec![]);
        }

        Ok(vec![match p.outcome {
            LookupOutcome::Found(name) => {
                TransferEvent::RecipientResolved(RecipientResolvedPayload {
                    request_id: p.request_id,
                    name,
                })
            }
            LookupOutcome::Failed(failure) => {
                TransferEvent::RecipientLookupFailed(RecipientLookupFailedPayload {
                    request_id: p.request_id,
                    failure,
                })
            }
        }])
    }

    fn proceed_to_otp(&self) -> HandleResult {
        let WorkflowState::Details { draft, resolution } = &self.state else {
            return Err(TransferError::WrongStep(self.state.step()));
        };

        draft.validate().map_err(TransferError::InvalidDraft)?;
        require_resolved(resolution)?;

        Ok(vec![TransferEvent::OtpChallengeIssued(
            OtpChallengeIssuedPayload {
                expires_in_seconds: OTP_TTL_SECONDS,
            },
        )])
    }

    fn tick_countdown(&self) -> HandleResult {
        let Some(challenge) = self.state.challenge() else {
            return Ok(vec![]);
        };

        if challenge.is_expired() {
            return Ok(vec![]);
        }

        Ok(vec![TransferEvent::OtpCountdownTicked(
            OtpCountdownTickedPayload {
                remaining_seconds: challenge.remaining_seconds - 1,
            },
        )])
    }

    fn enter_otp_code(&self, p: EnterOtpCodePayload) -> HandleResult {
        let challenge = require_idle_challenge(&self.state)?;

        let code = sanitize_otp(&p.code);
        if code == challenge.code {
            return Ok(vec![]);
        }

        Ok(vec![TransferEvent::OtpCodeEntered(OtpCodeEnteredPayload {
            code,
        })])
    }

    fn submit_otp(&self) -> HandleResult {
        let challenge = require_idle_challenge(&self.state)?;

        if challenge.is_expired() {
            return Err(TransferError::OtpExpired);
        }
        if challenge.code.len() != OTP_CODE_LEN {
            return Err(TransferError::IncompleteOtp);
        }

        debug!("Submitting OTP, {} left", challenge.expires_in());

        Ok(vec![TransferEvent::OtpSubmitted(OtpSubmittedPayload {
            code: challenge.code.clone(),
        })])
    }

    fn complete_confirmation(&self, p: CompleteOtpConfirmationPayload) -> HandleResult {
        let (draft, recipient) = match &self.state {
            WorkflowState::Otp {
                draft,
                recipient,
                challenge,
            } if challenge.is_submitting => (draft, recipient),
            _ => {
                debug!("Discarding OTP confirmation: nothing was submitted");
                return Ok(vec![]);
            }
        };

        match p.outcome {
            ConfirmationOutcome::Confirmed { reference } => {
                let amount = draft
                    .parsed_amount()
                    .ok_or_else(|| TransferError::InvalidDraft(FieldErrors(draft.field_errors())))?;

                Ok(vec![TransferEvent::TransferCompleted(
                    TransferCompletedPayload {
                        receipt: TransferReceipt {
                            reference,
                            amount: Amount(amount),
                            recipient: recipient.name.clone(),
                            bank: draft.bank.clone(),
                            account_number: draft.account_number.clone(),
                            masked_account_number: draft.masked_account_number(),
                        },
                    },
                )])
            }
            ConfirmationOutcome::Rejected { reason } => {
                Ok(vec![TransferEvent::OtpRejected(OtpRejectedPayload {
                    reason,
                })])
            }
        }
    }

    fn cancel_otp(&self) -> HandleResult {
        require_idle_challenge(&self.state)?;

        Ok(vec![TransferEvent::OtpCancelled])
    }

    fn acknowledge_receipt(&self) -> HandleResult {
        match &self.state {
            WorkflowState::Success { .. } => Ok(vec![TransferEvent::ReceiptAcknowledged]),
            other => Err(TransferError::WrongStep(other.step())),
        }
    }

    fn abandon(&self) -> HandleResult {
        match &self.state {
            WorkflowState::Details { .. } => Ok(vec![TransferEvent::TransferAbandoned]),
            WorkflowState::Otp { .. } => {
                require_idle_challenge(&self.state)?;
                Ok(vec![TransferEvent::TransferAbandoned])
            }
            WorkflowState::Success { .. } => Err(TransferError::WrongStep(Step::Success)),
        }
    }

    fn set_resolution(&mut self, next: RecipientResolution) {
        if let WorkflowState::Details { resolution, .. } = &mut self.state {
            *resolution = next;
        }
    }

    fn challenge_mut(&mut self) -> Option<&mut OtpChallenge> {
        match &mut self.state {
            WorkflowState::Otp { challenge, .. } => Some(challenge),
            _ => None,
        }
    }
}

fn require_resolved(resolution: &RecipientResolution) -> Result<(), TransferError> {
    match resolution {
        RecipientResolution::Resolved { .. } => Ok(()),
        RecipientResolution::Resolving { .. } => Err(TransferError::RecipientLookupPending),
        RecipientResolution::Absent | RecipientResolution::Failed { .. } => {
            Err(TransferError::RecipientUnresolved)
        }
    }
}

fn require_idle_challenge(state: &WorkflowState) -> Result<&OtpChallenge, TransferError> {
    let challenge = state
        .challenge()
        .ok_or(TransferError::WrongStep(state.step()))?;

    if challenge.is_submitting {
        return Err(TransferError::OtpSubmissionInProgress);
    }

    Ok(challenge)
}

pub fn sanitize_otp(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .take(OTP_CODE_LEN)
        .collect()
}
