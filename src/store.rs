use crate::errors::Result;
use crate::models::{Account, Asset, CryptoAddress, Transaction, TransactionFilter, TransactionKind};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Fields of a transaction row at creation time. Status always starts at
/// `pending`; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub asset: Asset,
    pub amount: Decimal,
    /// Receiving address snapshot, set for deposits only.
    pub deposit_address: Option<String>,
    /// Destination address, set for withdrawals only.
    pub wallet_address: Option<String>,
}

/// Persistence contract the lifecycle engine depends on.
///
/// Implementations must provide, per operation:
/// - server-side atomic balance arithmetic scoped to one account row,
/// - status updates conditional on the current status, reporting whether a row
///   changed,
/// - durability of committed writes before the call returns `Ok`.
///
/// `settle_pending` and `reject_pending` are each a single all-or-nothing unit:
/// no caller ever observes a transaction in `approved`, and a partial balance
/// mutation is never visible.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn account(&self, user_id: Uuid) -> Result<Option<Account>>;

    /// Currently active receiving address for a deposit asset, if configured.
    async fn active_address(&self, asset: Asset) -> Result<Option<CryptoAddress>>;

    async fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction>;

    async fn transaction(&self, id: Uuid) -> Result<Option<Transaction>>;

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>>;

    /// Approve a pending transaction: mark `approved`, apply the balance
    /// mutation (credit for deposits, guarded debit for withdrawals), mark
    /// `completed` — atomically. Fails with `NotPending` if the transaction has
    /// already been decided, and with `InsufficientBalance` if a withdrawal's
    /// debit would drive the balance negative, in which case the transaction
    /// remains `pending`.
    async fn settle_pending(&self, id: Uuid, notes: Option<&str>) -> Result<Transaction>;

    /// Reject a pending transaction. Never touches balances.
    async fn reject_pending(&self, id: Uuid, reason: &str) -> Result<Transaction>;
}
