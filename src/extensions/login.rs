//! Login manager: signed session tokens carried in a cookie.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpRequest};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::app::AppState;
use crate::config::Settings;
use crate::error::{AppError, InitError};

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's id.
    pub sub: i32,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

#[derive(Clone)]
pub struct LoginManager {
    secret: String,
    ttl: chrono::Duration,
    cookie_name: String,
    login_view: String,
}

impl std::fmt::Debug for LoginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginManager")
            .field("cookie_name", &self.cookie_name)
            .field("login_view", &self.login_view)
            .finish_non_exhaustive()
    }
}

impl LoginManager {
    pub fn init_app(settings: &Settings) -> Result<Self, InitError> {
        let secret = settings.get_str("SECRET_KEY").unwrap_or_default();
        if secret.is_empty() {
            return Err(InitError::extension("login_manager", "SECRET_KEY must not be empty"));
        }
        let ttl_hours = settings.get_u64("TOKEN_TTL_HOURS")?.unwrap_or(24);
        let ttl = i64::try_from(ttl_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .filter(|ttl| chrono::Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| InitError::extension("login_manager", "TOKEN_TTL_HOURS is out of range"))?;

        Ok(LoginManager {
            secret: secret.to_string(),
            ttl,
            cookie_name: settings.get_str("SESSION_COOKIE_NAME").unwrap_or("session").to_string(),
            login_view: settings.get_str("LOGIN_VIEW").unwrap_or("/login").to_string(),
        })
    }

    pub fn login_view(&self) -> &str {
        &self.login_view
    }

    /// Issues a signed session token for a user.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The id stored as the token's subject.
    ///
    /// # Returns
    ///
    /// * `Result<String, AppError>` - The encoded token, valid for `TOKEN_TTL_HOURS`.
    pub fn issue_token(&self, user_id: i32) -> Result<String, AppError> {
        let expiration = chrono::Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::InternalServerError("Token expiry overflow".into()))?
            .timestamp() as usize;

        let claims = Claims {
            sub: user_id,
            exp: expiration,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Verifies a session token.
    ///
    /// # Arguments
    ///
    /// * `token` - The token read from the session cookie.
    ///
    /// # Returns
    ///
    /// * `Result<Claims, AppError>` - The claims, or `Unauthorized` when the token
    ///   does not verify or has expired.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    pub fn login_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(self.cookie_name.clone(), token)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(self.ttl.num_seconds()))
            .finish()
    }

    pub fn logout_cookie(&self) -> Cookie<'static> {
        Cookie::build(self.cookie_name.clone(), "")
            .path("/")
            .max_age(CookieDuration::ZERO)
            .finish()
    }

    /// The user id carried by `req`'s session cookie.
    pub fn current_user(&self, req: &HttpRequest) -> Result<i32, AppError> {
        let cookie = req
            .cookie(&self.cookie_name)
            .ok_or_else(|| AppError::Unauthorized("Login required".into()))?;
        Ok(self.verify_token(cookie.value())?.sub)
    }
}

/// The logged-in user's id. Rejects the request with 401 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub i32);

impl FromRequest for CurrentUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<AppState>>() {
            Some(state) => state.extensions.login.current_user(req).map(CurrentUser),
            None => Err(AppError::InternalServerError(
                "Application state missing. Compose the app with app::compose.".into(),
            )),
        };
        ready(result.map_err(Into::into))
    }
}
