use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::ValidationError;

/// Supported balance denominations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "asset", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Usd,
    Btc,
    Eth,
    Usdt,
}

impl Asset {
    pub const ALL: [Asset; 4] = [Asset::Usd, Asset::Btc, Asset::Eth, Asset::Usdt];

    /// Column of the `accounts` row holding this asset's balance.
    ///
    /// A closed mapping: an unrecognized symbol cannot name a column because
    /// it cannot become an `Asset` in the first place.
    pub fn balance_column(self) -> &'static str {
        match self {
            Asset::Usd => "balance_usd",
            Asset::Btc => "balance_btc",
            Asset::Eth => "balance_eth",
            Asset::Usdt => "balance_usdt",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Asset::Usd => "USD",
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
            Asset::Usdt => "USDT",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Asset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Asset::Usd),
            "BTC" => Ok(Asset::Btc),
            "ETH" => Ok(Asset::Eth),
            "USDT" => Ok(Asset::Usdt),
            other => Err(format!("unknown asset: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => f.write_str("deposit"),
            TransactionKind::Withdrawal => f.write_str("withdrawal"),
        }
    }
}

/// Transaction lifecycle status.
///
/// `Approved` is a transient marker inside the settle operation; it is never
/// observable through any read accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Completed,
    Rejected,
}

impl TransactionStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Rejected)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Approved => "approved",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A deposit or withdrawal request and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub asset: Asset,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub deposit_address: Option<String>,
    pub wallet_address: Option<String>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-user balance row, one column per asset.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub user_id: Uuid,
    pub balance_usd: Decimal,
    pub balance_btc: Decimal,
    pub balance_eth: Decimal,
    pub balance_usdt: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn balance_for(&self, asset: Asset) -> Decimal {
        match asset {
            Asset::Usd => self.balance_usd,
            Asset::Btc => self.balance_btc,
            Asset::Eth => self.balance_eth,
            Asset::Usdt => self.balance_usdt,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub kyc_status: String,
    pub created_at: DateTime<Utc>,
}

/// Active receiving address for a deposit asset.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CryptoAddress {
    pub id: Uuid,
    pub asset: Asset,
    pub address: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvestmentPlan {
    pub id: Uuid,
    pub name: String,
    pub min_amount: Decimal,
    pub max_amount: Option<Decimal>,
    pub daily_return_pct: Decimal,
    pub duration_days: i32,
    pub is_active: bool,
}

fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("amount_not_positive"))
    }
}

/// Deposit request body.
#[derive(Debug, Deserialize, Serialize, validator::Validate)]
pub struct DepositRequest {
    pub asset: Asset,
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
}

/// Withdrawal request body.
#[derive(Debug, Deserialize, Serialize, validator::Validate)]
pub struct WithdrawRequest {
    pub asset: Asset,
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
    #[validate(length(min = 1))]
    pub wallet_address: String,
}

/// Optional filters for transaction listings.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub limit: Option<i64>,
}

impl TransactionFilter {
    pub fn limit_or_default(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 500)
    }
}

/// Admin moderation payload for approve/reject.
#[derive(Debug, Deserialize, Serialize)]
pub struct DecisionRequest {
    pub notes: Option<String>,
    pub reason: Option<String>,
}

/// Transaction row joined with the owning user's identity, for the admin view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub asset: Asset,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub deposit_address: Option<String>,
    pub wallet_address: Option<String>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// User row joined with account balances, for the admin view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub kyc_status: String,
    pub created_at: DateTime<Utc>,
    pub balance_usd: Option<Decimal>,
    pub balance_btc: Option<Decimal>,
    pub balance_eth: Option<Decimal>,
    pub balance_usdt: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub kyc_status: Option<String>,
}

#[derive(Debug, Deserialize, validator::Validate)]
pub struct UpdateAddressRequest {
    #[validate(length(min = 1))]
    pub address: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, validator::Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, validator::Validate)]
pub struct SigninRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Platform-wide aggregates for the admin dashboard.
#[derive(Debug, Serialize, FromRow)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TransactionStats {
    pub total: i64,
    pub pending: i64,
    pub completed: i64,
    pub total_deposits: Option<Decimal>,
    pub total_withdrawals: Option<Decimal>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct PlatformBalances {
    pub total_usd: Option<Decimal>,
    pub total_btc: Option<Decimal>,
    pub total_eth: Option<Decimal>,
    pub total_usdt: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use validator::Validate;

    #[test]
    fn asset_roundtrip_and_columns() {
        for asset in Asset::ALL {
            assert_eq!(asset.as_str().parse::<Asset>().unwrap(), asset);
        }
        assert_eq!(Asset::Btc.balance_column(), "balance_btc");
        assert!("DOGE".parse::<Asset>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Rejected.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Approved.is_terminal());
    }

    #[test]
    fn deposit_request_rejects_non_positive_amounts() {
        let zero = DepositRequest { asset: Asset::Btc, amount: dec!(0) };
        assert!(zero.validate().is_err());

        let negative = DepositRequest { asset: Asset::Btc, amount: dec!(-1) };
        assert!(negative.validate().is_err());

        let satoshi = DepositRequest { asset: Asset::Btc, amount: dec!(0.00000001) };
        assert!(satoshi.validate().is_ok());
    }

    #[test]
    fn withdraw_request_requires_wallet_address() {
        let req = WithdrawRequest {
            asset: Asset::Eth,
            amount: dec!(1),
            wallet_address: String::new(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn balance_for_selects_the_right_column() {
        let account = Account {
            user_id: Uuid::new_v4(),
            balance_usd: dec!(100),
            balance_btc: dec!(0.5),
            balance_eth: dec!(2),
            balance_usdt: dec!(0),
            created_at: Utc::now(),
        };
        assert_eq!(account.balance_for(Asset::Usd), dec!(100));
        assert_eq!(account.balance_for(Asset::Btc), dec!(0.5));
        assert_eq!(account.balance_for(Asset::Eth), dec!(2));
        assert_eq!(account.balance_for(Asset::Usdt), dec!(0));
    }
}
