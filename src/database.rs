use crate::errors::{BrokerageError, Result};
use crate::models::{
    Account, AdminTransaction, AdminUser, Asset, CryptoAddress, InvestmentPlan, PlatformBalances,
    Transaction, TransactionFilter, TransactionKind, TransactionStats, TransactionStatus,
    UpdateUserRequest, User, UserStats,
};
use crate::store::{LedgerStore, NewTransaction};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::time::Duration;
use uuid::Uuid;

pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a user together with its (empty) account row.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO accounts (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(user)
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET first_name = $1, last_name = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BrokerageError::UserNotFound(user_id))?;

        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<AdminUser>> {
        let users = sqlx::query_as::<_, AdminUser>(
            r#"
            SELECT u.id, u.email, u.first_name, u.last_name, u.role, u.is_active,
                   u.kyc_status, u.created_at,
                   a.balance_usd, a.balance_btc, a.balance_eth, a.balance_usdt
            FROM users u
            LEFT JOIN accounts a ON u.id = a.user_id
            ORDER BY u.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn admin_user(&self, id: Uuid) -> Result<Option<AdminUser>> {
        let user = sqlx::query_as::<_, AdminUser>(
            r#"
            SELECT u.id, u.email, u.first_name, u.last_name, u.role, u.is_active,
                   u.kyc_status, u.created_at,
                   a.balance_usd, a.balance_btc, a.balance_eth, a.balance_usdt
            FROM users u
            LEFT JOIN accounts a ON u.id = a.user_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn update_user(&self, id: Uuid, update: &UpdateUserRequest) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($1, first_name),
                last_name  = COALESCE($2, last_name),
                is_active  = COALESCE($3, is_active),
                kyc_status = COALESCE($4, kyc_status)
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.is_active)
        .bind(update.kyc_status.as_deref())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BrokerageError::UserNotFound(id))?;

        Ok(user)
    }

    pub async fn list_addresses(&self) -> Result<Vec<CryptoAddress>> {
        let addresses = sqlx::query_as::<_, CryptoAddress>(
            "SELECT * FROM crypto_addresses ORDER BY asset",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(addresses)
    }

    pub async fn active_addresses(&self) -> Result<Vec<CryptoAddress>> {
        let addresses = sqlx::query_as::<_, CryptoAddress>(
            "SELECT * FROM crypto_addresses WHERE is_active = TRUE ORDER BY asset",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(addresses)
    }

    pub async fn update_address(
        &self,
        id: Uuid,
        address: &str,
        is_active: bool,
    ) -> Result<CryptoAddress> {
        let updated = sqlx::query_as::<_, CryptoAddress>(
            r#"
            UPDATE crypto_addresses SET address = $1, is_active = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(address)
        .bind(is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BrokerageError::AddressNotFound(id))?;

        Ok(updated)
    }

    pub async fn active_plans(&self) -> Result<Vec<InvestmentPlan>> {
        let plans = sqlx::query_as::<_, InvestmentPlan>(
            "SELECT * FROM investment_plans WHERE is_active = TRUE ORDER BY min_amount",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }

    /// Every transaction on the platform, joined with the owning user, newest
    /// first. For the admin moderation queue.
    pub async fn list_all_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<AdminTransaction>> {
        let transactions = sqlx::query_as::<_, AdminTransaction>(
            r#"
            SELECT t.id, t.user_id, t.kind, t.asset, t.amount, t.status,
                   t.deposit_address, t.wallet_address, t.admin_notes,
                   t.rejection_reason, t.created_at, t.updated_at,
                   u.email, u.first_name, u.last_name
            FROM transactions t
            JOIN users u ON t.user_id = u.id
            WHERE ($1::transaction_kind IS NULL OR t.kind = $1)
              AND ($2::transaction_status IS NULL OR t.status = $2)
            ORDER BY t.created_at DESC
            LIMIT $3
            "#,
        )
        .bind(filter.kind)
        .bind(filter.status)
        .bind(filter.limit_or_default())
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    pub async fn user_stats(&self) -> Result<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_active) AS active
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    pub async fn transaction_stats(&self) -> Result<TransactionStats> {
        let stats = sqlx::query_as::<_, TransactionStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                   SUM(amount) FILTER (WHERE kind = 'deposit') AS total_deposits,
                   SUM(amount) FILTER (WHERE kind = 'withdrawal') AS total_withdrawals
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    pub async fn platform_balances(&self) -> Result<PlatformBalances> {
        let balances = sqlx::query_as::<_, PlatformBalances>(
            r#"
            SELECT SUM(balance_usd) AS total_usd,
                   SUM(balance_btc) AS total_btc,
                   SUM(balance_eth) AS total_eth,
                   SUM(balance_usdt) AS total_usdt
            FROM accounts
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(balances)
    }

    /// Maps a failed conditional update on a pending transaction to the right
    /// error: the row is either missing or already decided.
    async fn pending_conflict(&self, id: Uuid) -> Result<BrokerageError> {
        let status = sqlx::query_scalar::<_, TransactionStatus>(
            "SELECT status FROM transactions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match status {
            Some(status) => BrokerageError::NotPending { status },
            None => BrokerageError::TransactionNotFound(id),
        })
    }
}

#[async_trait]
impl LedgerStore for Database {
    async fn account(&self, user_id: Uuid) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn active_address(&self, asset: Asset) -> Result<Option<CryptoAddress>> {
        let address = sqlx::query_as::<_, CryptoAddress>(
            r#"
            SELECT * FROM crypto_addresses
            WHERE asset = $1 AND is_active = TRUE
            LIMIT 1
            "#,
        )
        .bind(asset)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    async fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (user_id, kind, asset, amount, deposit_address, wallet_address)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.kind)
        .bind(new.asset)
        .bind(new.amount)
        .bind(new.deposit_address)
        .bind(new.wallet_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(transaction)
    }

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1
              AND ($2::transaction_kind IS NULL OR kind = $2)
              AND ($3::transaction_status IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(filter.kind)
        .bind(filter.status)
        .bind(filter.limit_or_default())
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn settle_pending(&self, id: Uuid, notes: Option<&str>) -> Result<Transaction> {
        let mut tx = self.pool.begin().await?;

        // Guarded transition: only a pending transaction can be approved.
        let approved = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET status = 'approved', admin_notes = $1, updated_at = now()
            WHERE id = $2 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(notes)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(txn) = approved else {
            tx.rollback().await?;
            return Err(self.pending_conflict(id).await?);
        };

        let col = txn.asset.balance_column();
        let sql = match txn.kind {
            // Debit re-validated at approval time: the balance may have moved
            // since the request-time pre-check.
            TransactionKind::Withdrawal => format!(
                "UPDATE accounts SET {col} = {col} - $1 WHERE user_id = $2 AND {col} >= $1"
            ),
            TransactionKind::Deposit => {
                format!("UPDATE accounts SET {col} = {col} + $1 WHERE user_id = $2")
            }
        };
        let mutation = sqlx::query(&sql)
            .bind(txn.amount)
            .bind(txn.user_id)
            .execute(&mut *tx)
            .await?;

        if mutation.rows_affected() == 0 {
            // Rolls the approved marker back; the transaction stays pending.
            tx.rollback().await?;

            return Err(match self.account(txn.user_id).await? {
                None => BrokerageError::AccountNotFound(txn.user_id),
                Some(account) => BrokerageError::InsufficientBalance {
                    required: txn.amount.to_string(),
                    available: account.balance_for(txn.asset).to_string(),
                },
            });
        }

        let completed = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET status = 'completed', updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(completed)
    }

    async fn reject_pending(&self, id: Uuid, reason: &str) -> Result<Transaction> {
        let rejected = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET status = 'rejected', rejection_reason = $1, updated_at = now()
            WHERE id = $2 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(reason)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match rejected {
            Some(txn) => Ok(txn),
            None => Err(self.pending_conflict(id).await?),
        }
    }
}
