use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use cqrs_es::{Aggregate, EventEnvelope, Query};

use crate::domain::transfer::aggregate::TransferWorkflow;

/// Latest in-process state of every open workflow, folded from committed
/// events. Sessions read from here after each command.
#[derive(Clone, Default)]
pub struct WorkflowSnapshots {
    workflows: Arc<Mutex<HashMap<String, TransferWorkflow>>>,
}

impl WorkflowSnapshots {
    pub fn get(&self, workflow_id: &str) -> TransferWorkflow {
        self.workflows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(workflow_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn forget(&self, workflow_id: &str) {
        self.workflows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(workflow_id);
    }
}

#[async_trait]
impl Query<TransferWorkflow> for WorkflowSnapshots {
    async fn dispatch(&self, aggregate_id: &str, events: &[EventEnvelope<TransferWorkflow>]) {
        let mut workflows = self
            .workflows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let workflow = workflows.entry(aggregate_id.to_owned()).or_default();

        for envelope in events {
            workflow.apply(envelope.payload.clone());
        }
    }
}
