use crate::auth::{self, AuthedUser};
use crate::config::AuthConfig;
use crate::database::Database;
use crate::errors::BrokerageError;
use crate::metrics;
use crate::models::{
    DepositRequest, SigninRequest, SignupRequest, TransactionFilter, UpdateProfileRequest,
    WithdrawRequest,
};
use crate::services::TransactionService;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "brokerage-engine",
        "version": "1.0.0"
    }))
}

/// Register a user and provision their account
pub async fn signup(
    db: web::Data<Arc<Database>>,
    auth_cfg: web::Data<AuthConfig>,
    request: web::Json<SignupRequest>,
) -> Result<HttpResponse, BrokerageError> {
    let request = request.into_inner();
    validator::Validate::validate(&request)
        .map_err(|e| BrokerageError::Validation(e.to_string()))?;

    if db.user_by_email(&request.email).await?.is_some() {
        return Err(BrokerageError::EmailAlreadyRegistered);
    }

    let password_hash = auth::hash_password(&request.password)?;
    let user = db
        .create_user(
            &request.email,
            &password_hash,
            request.first_name.as_deref(),
            request.last_name.as_deref(),
        )
        .await?;

    metrics::USERS_REGISTERED.inc();
    tracing::info!("User {} registered", user.id);

    let token = auth::issue_token(&user, &auth_cfg)?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User created successfully",
        "token": token,
        "user": {
            "id": user.id,
            "email": user.email,
            "role": user.role
        }
    })))
}

/// Authenticate and issue a capability token
pub async fn signin(
    db: web::Data<Arc<Database>>,
    auth_cfg: web::Data<AuthConfig>,
    request: web::Json<SigninRequest>,
) -> Result<HttpResponse, BrokerageError> {
    let request = request.into_inner();
    validator::Validate::validate(&request)
        .map_err(|e| BrokerageError::Validation(e.to_string()))?;

    let user = db
        .user_by_email(&request.email)
        .await?
        .ok_or(BrokerageError::InvalidCredentials)?;

    if !user.is_active {
        return Err(BrokerageError::AccountInactive);
    }

    if !auth::verify_password(&request.password, &user.password_hash)? {
        return Err(BrokerageError::InvalidCredentials);
    }

    let token = auth::issue_token(&user, &auth_cfg)?;

    Ok(HttpResponse::Ok().json(json!({
        "token": token,
        "user": {
            "id": user.id,
            "email": user.email,
            "role": user.role
        }
    })))
}

/// Create a deposit request
pub async fn create_deposit(
    engine: web::Data<Arc<TransactionService>>,
    user: AuthedUser,
    request: web::Json<DepositRequest>,
) -> Result<HttpResponse, BrokerageError> {
    let transaction = engine.create_deposit(user.id, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({ "transaction": transaction })))
}

/// Create a withdrawal request
pub async fn create_withdrawal(
    engine: web::Data<Arc<TransactionService>>,
    user: AuthedUser,
    request: web::Json<WithdrawRequest>,
) -> Result<HttpResponse, BrokerageError> {
    let transaction = engine
        .create_withdrawal(user.id, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(json!({ "transaction": transaction })))
}

/// List the caller's transactions, newest first
pub async fn list_transactions(
    engine: web::Data<Arc<TransactionService>>,
    user: AuthedUser,
    filter: web::Query<TransactionFilter>,
) -> Result<HttpResponse, BrokerageError> {
    let transactions = engine
        .transactions_for_user(user.id, &filter.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "transactions": transactions })))
}

/// Fetch one of the caller's transactions
pub async fn get_transaction(
    engine: web::Data<Arc<TransactionService>>,
    user: AuthedUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, BrokerageError> {
    let transaction = engine.transaction_for_user(*id, user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "transaction": transaction })))
}

/// Caller's profile with balances
pub async fn get_profile(
    db: web::Data<Arc<Database>>,
    user: AuthedUser,
) -> Result<HttpResponse, BrokerageError> {
    let profile = db
        .admin_user(user.id)
        .await?
        .ok_or(BrokerageError::UserNotFound(user.id))?;
    Ok(HttpResponse::Ok().json(json!({ "user": profile })))
}

pub async fn update_profile(
    db: web::Data<Arc<Database>>,
    user: AuthedUser,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, BrokerageError> {
    let updated = db
        .update_profile(
            user.id,
            request.first_name.as_deref(),
            request.last_name.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "user": {
            "id": updated.id,
            "email": updated.email,
            "first_name": updated.first_name,
            "last_name": updated.last_name
        }
    })))
}

/// Caller's balances plus recent activity
pub async fn dashboard(
    engine: web::Data<Arc<TransactionService>>,
    user: AuthedUser,
) -> Result<HttpResponse, BrokerageError> {
    let account = engine.account(user.id).await?;
    let recent = engine
        .transactions_for_user(
            user.id,
            &TransactionFilter {
                limit: Some(10),
                ..Default::default()
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "account": account,
        "recent_transactions": recent
    })))
}

/// Active receiving addresses for deposits
pub async fn deposit_addresses(
    db: web::Data<Arc<Database>>,
    _user: AuthedUser,
) -> Result<HttpResponse, BrokerageError> {
    let addresses = db.active_addresses().await?;
    Ok(HttpResponse::Ok().json(json!({ "addresses": addresses })))
}

/// Active investment plans
pub async fn investment_plans(
    db: web::Data<Arc<Database>>,
    _user: AuthedUser,
) -> Result<HttpResponse, BrokerageError> {
    let plans = db.active_plans().await?;
    Ok(HttpResponse::Ok().json(json!({ "plans": plans })))
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint() -> HttpResponse {
    match metrics::metrics_handler() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Failed to gather metrics",
            "details": e.to_string()
        })),
    }
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/signup", web::post().to(signup))
            .route("/signin", web::post().to(signin)),
    )
    .service(
        web::scope("/api/users")
            .route("/profile", web::get().to(get_profile))
            .route("/profile", web::put().to(update_profile))
            .route("/dashboard", web::get().to(dashboard)),
    )
    .service(
        web::scope("/api/transactions")
            .route("", web::get().to(list_transactions))
            .route("/deposit", web::post().to(create_deposit))
            .route("/withdraw", web::post().to(create_withdrawal))
            .route("/{id}", web::get().to(get_transaction)),
    )
    .service(
        web::scope("/api/crypto")
            .route("/addresses", web::get().to(deposit_addresses))
            .route("/plans", web::get().to(investment_plans)),
    )
    .route("/api/health", web::get().to(health_check))
    .route("/metrics", web::get().to(metrics_endpoint));
}
