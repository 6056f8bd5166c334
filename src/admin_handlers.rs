use crate::auth::AuthedUser;
use crate::database::Database;
use crate::errors::BrokerageError;
use crate::gateway::{AdminGateway, Decision};
use crate::models::{DecisionRequest, TransactionFilter, UpdateAddressRequest, UpdateUserRequest};
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// All users with their balances
pub async fn list_users(
    db: web::Data<Arc<Database>>,
    caller: AuthedUser,
) -> Result<HttpResponse, BrokerageError> {
    caller.require_admin()?;
    let users = db.list_users().await?;
    Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

pub async fn get_user(
    db: web::Data<Arc<Database>>,
    caller: AuthedUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, BrokerageError> {
    caller.require_admin()?;
    let user = db
        .admin_user(*id)
        .await?
        .ok_or(BrokerageError::UserNotFound(*id))?;
    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

/// Partial update of a user's name, active flag or KYC status
pub async fn update_user(
    db: web::Data<Arc<Database>>,
    caller: AuthedUser,
    id: web::Path<Uuid>,
    request: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, BrokerageError> {
    caller.require_admin()?;

    let request = request.into_inner();
    if request.first_name.is_none()
        && request.last_name.is_none()
        && request.is_active.is_none()
        && request.kyc_status.is_none()
    {
        return Err(BrokerageError::Validation("No fields to update".to_string()));
    }

    let user = db.update_user(*id, &request).await?;
    Ok(HttpResponse::Ok().json(json!({
        "user": {
            "id": user.id,
            "email": user.email,
            "first_name": user.first_name,
            "last_name": user.last_name,
            "is_active": user.is_active,
            "kyc_status": user.kyc_status
        }
    })))
}

/// Every transaction on the platform, optionally filtered
pub async fn list_transactions(
    db: web::Data<Arc<Database>>,
    caller: AuthedUser,
    filter: web::Query<TransactionFilter>,
) -> Result<HttpResponse, BrokerageError> {
    caller.require_admin()?;
    let transactions = db.list_all_transactions(&filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "transactions": transactions })))
}

/// Approve a pending transaction (role check inside the gateway)
pub async fn approve_transaction(
    gateway: web::Data<Arc<AdminGateway>>,
    caller: AuthedUser,
    id: web::Path<Uuid>,
    request: web::Json<DecisionRequest>,
) -> Result<HttpResponse, BrokerageError> {
    let transaction = gateway
        .decide(
            caller.role,
            *id,
            Decision::Approve {
                notes: request.into_inner().notes,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Transaction approved successfully",
        "transaction": transaction
    })))
}

/// Reject a pending transaction (role check inside the gateway)
pub async fn reject_transaction(
    gateway: web::Data<Arc<AdminGateway>>,
    caller: AuthedUser,
    id: web::Path<Uuid>,
    request: web::Json<DecisionRequest>,
) -> Result<HttpResponse, BrokerageError> {
    let reason = request
        .into_inner()
        .reason
        .ok_or_else(|| BrokerageError::Validation("rejection reason is required".to_string()))?;

    let transaction = gateway
        .decide(caller.role, *id, Decision::Reject { reason })
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Transaction rejected successfully",
        "transaction": transaction
    })))
}

pub async fn list_addresses(
    db: web::Data<Arc<Database>>,
    caller: AuthedUser,
) -> Result<HttpResponse, BrokerageError> {
    caller.require_admin()?;
    let addresses = db.list_addresses().await?;
    Ok(HttpResponse::Ok().json(json!({ "addresses": addresses })))
}

pub async fn update_address(
    db: web::Data<Arc<Database>>,
    caller: AuthedUser,
    id: web::Path<Uuid>,
    request: web::Json<UpdateAddressRequest>,
) -> Result<HttpResponse, BrokerageError> {
    caller.require_admin()?;

    let request = request.into_inner();
    validator::Validate::validate(&request)
        .map_err(|e| BrokerageError::Validation(e.to_string()))?;

    let address = db
        .update_address(*id, &request.address, request.is_active)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "address": address })))
}

/// Platform-wide aggregates for the admin dashboard
pub async fn admin_dashboard(
    db: web::Data<Arc<Database>>,
    caller: AuthedUser,
) -> Result<HttpResponse, BrokerageError> {
    caller.require_admin()?;

    let users = db.user_stats().await?;
    let transactions = db.transaction_stats().await?;
    let accounts = db.platform_balances().await?;

    Ok(HttpResponse::Ok().json(json!({
        "users": users,
        "transactions": transactions,
        "accounts": accounts
    })))
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin")
            .route("/users", web::get().to(list_users))
            .route("/users/{id}", web::get().to(get_user))
            .route("/users/{id}", web::put().to(update_user))
            .route("/transactions", web::get().to(list_transactions))
            .route("/transactions/{id}/approve", web::post().to(approve_transaction))
            .route("/transactions/{id}/reject", web::post().to(reject_transaction))
            .route("/crypto-addresses", web::get().to(list_addresses))
            .route("/crypto-addresses/{id}", web::put().to(update_address))
            .route("/dashboard", web::get().to(admin_dashboard)),
    );
}
