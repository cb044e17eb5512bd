use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    cache::SessionCache,
    error::{AppError, Result},
    models::{Account, UserRole},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub username: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
    pub jti: String, // session key in the cache
}

impl Claims {
    pub fn new(account: &Account, ttl_seconds: usize, jwt_secret: &str) -> Result<(String, Self)> {
        let now = Utc::now();
        let exp = now + Duration::seconds(ttl_seconds as i64);
        let jti = Uuid::new_v4().to_string();

        let claims = Self {
            sub: account.id.to_string(),
            username: account.username.clone(),
            role: account.role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: jti.clone(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(jwt_secret.as_ref()),
        )?;

        Ok((token, claims))
    }

    pub fn verify(token: &str, jwt_secret: &str) -> Result<Self> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(jwt_secret.as_ref()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

/// Mints a bearer token for `account` and registers its session. Sign-in
/// itself belongs to the account service; it calls this once credentials
/// check out.
pub async fn issue_session(
    cache: &dyn SessionCache,
    account: &Account,
    ttl_seconds: usize,
    jwt_secret: &str,
) -> Result<String> {
    let (token, claims) = Claims::new(account, ttl_seconds, jwt_secret)?;
    cache
        .store_session(&claims.jti, &claims.sub, ttl_seconds)
        .await?;
    tracing::info!(user_id = %account.id, "session issued");
    Ok(token)
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub jti: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Missing authorization header".to_string()))?;

        let claims = Claims::verify(bearer.token(), &state.config.jwt_secret)?;

        // Check if session is still valid
        if let Some(stored_user_id) = state.cache.get_session(&claims.jti).await? {
            if stored_user_id != claims.sub {
                return Err(AppError::Authentication("Invalid session".to_string()));
            }
        } else {
            return Err(AppError::Authentication("Session expired".to_string()));
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Authentication("Invalid user ID in token".to_string()))?;

        // Role and suspension come from the account record, not the token.
        let account = state
            .accounts
            .find_account(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("Unknown account".to_string()))?;

        if account.is_suspended_at(Utc::now()) {
            return Err(AppError::Suspended);
        }

        Ok(AuthUser {
            user_id,
            username: account.username,
            role: account.role,
            jti: claims.jti,
        })
    }
}

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Authorization(
                "Administrator role required".to_string(),
            ));
        }
        Ok(AdminUser(user))
    }
}
