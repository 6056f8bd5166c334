use crate::errors::{BrokerageError, Result};
use crate::metrics;
use crate::models::{
    Account, DepositRequest, Transaction, TransactionFilter, TransactionKind, WithdrawRequest,
};
use crate::store::{LedgerStore, NewTransaction};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Transaction lifecycle engine.
///
/// Owns transaction creation and the admin-decided transitions out of
/// `pending`. Balance mutation happens at most once per transaction, inside the
/// store's settle operation.
pub struct TransactionService {
    store: Arc<dyn LedgerStore>,
}

impl TransactionService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        TransactionService { store }
    }

    /// Create a deposit request in `pending`, snapshotting the receiving
    /// address so a later address change cannot alter an in-flight deposit.
    pub async fn create_deposit(&self, user_id: Uuid, request: DepositRequest) -> Result<Transaction> {
        validator::Validate::validate(&request)
            .map_err(|e| BrokerageError::Validation(e.to_string()))?;

        let address = self
            .store
            .active_address(request.asset)
            .await?
            .ok_or_else(|| BrokerageError::UnsupportedAsset(request.asset.to_string()))?;

        let transaction = self
            .store
            .insert_transaction(NewTransaction {
                user_id,
                kind: TransactionKind::Deposit,
                asset: request.asset,
                amount: request.amount,
                deposit_address: Some(address.address),
                wallet_address: None,
            })
            .await?;

        metrics::DEPOSITS_CREATED.inc();
        info!(
            "Deposit request {} created: {} {} for user {}",
            transaction.id, request.amount, request.asset, user_id
        );

        Ok(transaction)
    }

    /// Create a withdrawal request in `pending`. The balance check here is a
    /// pre-check at request time, not a reservation; the settle operation
    /// re-validates before debiting.
    pub async fn create_withdrawal(
        &self,
        user_id: Uuid,
        request: WithdrawRequest,
    ) -> Result<Transaction> {
        validator::Validate::validate(&request)
            .map_err(|e| BrokerageError::Validation(e.to_string()))?;

        let account = self
            .store
            .account(user_id)
            .await?
            .ok_or(BrokerageError::AccountNotFound(user_id))?;

        let available = account.balance_for(request.asset);
        if available < request.amount {
            return Err(BrokerageError::InsufficientBalance {
                required: request.amount.to_string(),
                available: available.to_string(),
            });
        }

        let transaction = self
            .store
            .insert_transaction(NewTransaction {
                user_id,
                kind: TransactionKind::Withdrawal,
                asset: request.asset,
                amount: request.amount,
                deposit_address: None,
                wallet_address: Some(request.wallet_address),
            })
            .await?;

        metrics::WITHDRAWALS_CREATED.inc();
        info!(
            "Withdrawal request {} created: {} {} for user {}",
            transaction.id, request.amount, request.asset, user_id
        );

        Ok(transaction)
    }

    /// Approve a pending transaction and apply its balance effect. The store
    /// performs `approved` -> mutate -> `completed` as one atomic unit.
    pub async fn approve(&self, id: Uuid, notes: Option<&str>) -> Result<Transaction> {
        let transaction = self.store.settle_pending(id, notes).await.map_err(|err| {
            if let BrokerageError::InsufficientBalance { .. } = &err {
                warn!("Approval of {} failed the balance re-check; left pending", id);
            }
            err
        })?;

        metrics::TRANSACTIONS_APPROVED.inc();
        info!(
            "Transaction {} approved and completed: {} {} {} for user {}",
            transaction.id, transaction.kind, transaction.amount, transaction.asset,
            transaction.user_id
        );

        Ok(transaction)
    }

    /// Reject a pending transaction. No balance is ever touched.
    pub async fn reject(&self, id: Uuid, reason: &str) -> Result<Transaction> {
        let transaction = self.store.reject_pending(id, reason).await?;

        metrics::TRANSACTIONS_REJECTED.inc();
        info!("Transaction {} rejected: {}", transaction.id, reason);

        Ok(transaction)
    }

    pub async fn transactions_for_user(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        self.store.transactions_for_user(user_id, filter).await
    }

    /// Fetch one transaction, scoped to its owner: another user's transaction
    /// reads as not found.
    pub async fn transaction_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Transaction> {
        let transaction = self
            .store
            .transaction(id)
            .await?
            .filter(|t| t.user_id == user_id)
            .ok_or(BrokerageError::TransactionNotFound(id))?;

        Ok(transaction)
    }

    pub async fn account(&self, user_id: Uuid) -> Result<Account> {
        self.store
            .account(user_id)
            .await?
            .ok_or(BrokerageError::AccountNotFound(user_id))
    }
}
