use crate::config::AuthConfig;
use crate::errors::{BrokerageError, Result};
use crate::models::{Role, User};
use actix_web::{
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use uuid::Uuid;

/// Capability token contents: who the caller is and what role they hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BrokerageError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| BrokerageError::Internal(format!("stored password hash invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn issue_token(user: &User, auth: &AuthConfig) -> Result<String> {
    let exp = Utc::now() + Duration::hours(auth.token_ttl_hours);
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        exp: exp.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| BrokerageError::Internal(format!("token signing failed: {e}")))
}

/// Caller identity extracted from validated JWT claims. The engine trusts this
/// verbatim; no credential verification happens past the middleware.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthedUser {
    pub fn require_admin(&self) -> Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(BrokerageError::Forbidden)
        }
    }
}

impl FromRequest for AuthedUser {
    type Error = Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();

        ready(match claims {
            Some(claims) => match claims.sub.parse::<Uuid>() {
                Ok(id) => Ok(AuthedUser {
                    id,
                    email: claims.email,
                    role: claims.role,
                }),
                Err(_) => Err(BrokerageError::Unauthorized.into()),
            },
            None => Err(BrokerageError::Unauthorized.into()),
        })
    }
}

pub struct JwtAuth {
    secret: String,
}

impl JwtAuth {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: Rc<S>,
    secret: String,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Health, metrics and token issuance are reachable without a token.
        let path = req.path();
        if path == "/api/health" || path == "/metrics" || path.starts_with("/api/auth/") {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await });
        }

        let auth_header = req.headers().get("Authorization");

        let token = match auth_header {
            Some(value) => {
                let auth_str = value.to_str().unwrap_or("");
                match auth_str.strip_prefix("Bearer ") {
                    Some(token) => token.to_string(),
                    None => {
                        return Box::pin(async {
                            Err(BrokerageError::Unauthorized.into())
                        });
                    }
                }
            }
            None => {
                return Box::pin(async { Err(BrokerageError::Unauthorized.into()) });
            }
        };

        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(
            &token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(token_data) => {
                req.extensions_mut().insert(token_data.claims);

                let fut = self.service.call(req);
                Box::pin(async move { fut.await })
            }
            Err(err) => {
                tracing::warn!("JWT validation failed: {:?}", err);
                Box::pin(async { Err(BrokerageError::Unauthorized.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::decode;

    fn test_user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            role,
            is_active: true,
            kyc_status: "pending".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn token_carries_identity_and_role() {
        let auth = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
        };
        let user = test_user(Role::Admin);
        let token = issue_token(&user, &auth).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, user.id.to_string());
        assert_eq!(decoded.claims.email, user.email);
        assert_eq!(decoded.claims.role, Role::Admin);
    }

    #[test]
    fn require_admin_gates_on_role() {
        let admin = AuthedUser {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            role: Role::Admin,
        };
        assert!(admin.require_admin().is_ok());

        let user = AuthedUser {
            id: Uuid::new_v4(),
            email: "u@example.com".to_string(),
            role: Role::User,
        };
        assert!(user.require_admin().is_err());
    }
}
