use crate::errors::{BrokerageError, Result};
use crate::models::{Role, Transaction};
use crate::services::TransactionService;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// An admin's verdict on a pending transaction.
#[derive(Debug, Clone)]
pub enum Decision {
    Approve { notes: Option<String> },
    Reject { reason: String },
}

/// Trust boundary in front of the lifecycle engine: only admin callers may
/// decide transactions. Carries no business logic of its own.
pub struct AdminGateway {
    engine: Arc<TransactionService>,
}

impl AdminGateway {
    pub fn new(engine: Arc<TransactionService>) -> Self {
        AdminGateway { engine }
    }

    pub async fn decide(
        &self,
        caller_role: Role,
        transaction_id: Uuid,
        decision: Decision,
    ) -> Result<Transaction> {
        if caller_role != Role::Admin {
            warn!(
                "Non-admin caller attempted a decision on transaction {}",
                transaction_id
            );
            return Err(BrokerageError::Forbidden);
        }

        match decision {
            Decision::Approve { notes } => self.engine.approve(transaction_id, notes.as_deref()).await,
            Decision::Reject { reason } => {
                if reason.trim().is_empty() {
                    return Err(BrokerageError::Validation(
                        "rejection reason must not be empty".to_string(),
                    ));
                }
                self.engine.reject(transaction_id, reason.trim()).await
            }
        }
    }
}
