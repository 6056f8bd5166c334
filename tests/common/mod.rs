use async_trait::async_trait;
use brokerage_engine::errors::{BrokerageError, Result};
use brokerage_engine::models::{
    Account, Asset, CryptoAddress, Transaction, TransactionFilter, TransactionKind,
    TransactionStatus,
};
use brokerage_engine::store::{LedgerStore, NewTransaction};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory ledger store for exercising the engine without Postgres.
///
/// Honors the same contract as the SQL store: conditional status transitions
/// and guarded balance arithmetic, each settle/reject call all-or-nothing
/// under a single write lock.
#[derive(Default)]
pub struct MemoryLedger {
    accounts: RwLock<HashMap<Uuid, Account>>,
    addresses: RwLock<HashMap<Asset, CryptoAddress>>,
    transactions: RwLock<HashMap<Uuid, Transaction>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_account(&self, user_id: Uuid, balances: &[(Asset, Decimal)]) {
        let mut account = Account {
            user_id,
            balance_usd: Decimal::ZERO,
            balance_btc: Decimal::ZERO,
            balance_eth: Decimal::ZERO,
            balance_usdt: Decimal::ZERO,
            created_at: Utc::now(),
        };
        for (asset, amount) in balances {
            *balance_mut(&mut account, *asset) = *amount;
        }
        self.accounts.write().await.insert(user_id, account);
    }

    pub async fn set_address(&self, asset: Asset, address: &str) {
        self.addresses.write().await.insert(
            asset,
            CryptoAddress {
                id: Uuid::new_v4(),
                asset,
                address: address.to_string(),
                is_active: true,
                created_at: Utc::now(),
            },
        );
    }

    pub async fn transaction_count(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn status_of(&self, id: Uuid) -> Option<TransactionStatus> {
        self.transactions.read().await.get(&id).map(|t| t.status)
    }

    pub async fn balance_of(&self, user_id: Uuid, asset: Asset) -> Decimal {
        self.accounts
            .read()
            .await
            .get(&user_id)
            .map(|a| a.balance_for(asset))
            .unwrap_or(Decimal::ZERO)
    }
}

fn balance_mut(account: &mut Account, asset: Asset) -> &mut Decimal {
    match asset {
        Asset::Usd => &mut account.balance_usd,
        Asset::Btc => &mut account.balance_btc,
        Asset::Eth => &mut account.balance_eth,
        Asset::Usdt => &mut account.balance_usdt,
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn account(&self, user_id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(&user_id).cloned())
    }

    async fn active_address(&self, asset: Asset) -> Result<Option<CryptoAddress>> {
        Ok(self
            .addresses
            .read()
            .await
            .get(&asset)
            .filter(|a| a.is_active)
            .cloned())
    }

    async fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction> {
        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            kind: new.kind,
            asset: new.asset,
            amount: new.amount,
            status: TransactionStatus::Pending,
            deposit_address: new.deposit_address,
            wallet_address: new.wallet_address,
            admin_notes: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.transactions
            .write()
            .await
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        Ok(self.transactions.read().await.get(&id).cloned())
    }

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .filter(|t| filter.kind.map_or(true, |k| t.kind == k))
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        transactions.truncate(filter.limit_or_default() as usize);
        Ok(transactions)
    }

    async fn settle_pending(&self, id: Uuid, notes: Option<&str>) -> Result<Transaction> {
        // Single write lock over both maps keeps the whole settle atomic.
        let mut transactions = self.transactions.write().await;
        let mut accounts = self.accounts.write().await;

        let txn = transactions
            .get(&id)
            .cloned()
            .ok_or(BrokerageError::TransactionNotFound(id))?;

        if txn.status != TransactionStatus::Pending {
            return Err(BrokerageError::NotPending { status: txn.status });
        }

        let account = accounts
            .get_mut(&txn.user_id)
            .ok_or(BrokerageError::AccountNotFound(txn.user_id))?;

        let balance = balance_mut(account, txn.asset);
        match txn.kind {
            TransactionKind::Withdrawal => {
                if *balance < txn.amount {
                    // Transaction stays pending.
                    return Err(BrokerageError::InsufficientBalance {
                        required: txn.amount.to_string(),
                        available: balance.to_string(),
                    });
                }
                *balance -= txn.amount;
            }
            TransactionKind::Deposit => {
                *balance += txn.amount;
            }
        }

        let stored = transactions.get_mut(&id).expect("checked above");
        stored.status = TransactionStatus::Completed;
        stored.admin_notes = notes.map(|n| n.to_string());
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn reject_pending(&self, id: Uuid, reason: &str) -> Result<Transaction> {
        let mut transactions = self.transactions.write().await;

        let txn = transactions
            .get_mut(&id)
            .ok_or(BrokerageError::TransactionNotFound(id))?;

        if txn.status != TransactionStatus::Pending {
            return Err(BrokerageError::NotPending { status: txn.status });
        }

        txn.status = TransactionStatus::Rejected;
        txn.rejection_reason = Some(reason.to_string());
        txn.updated_at = Utc::now();

        Ok(txn.clone())
    }
}
