use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::HandlerGroup;
use crate::app::AppState;
use crate::error::AppError;
use crate::models::User;

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Login, logout and registration, mounted at the site root.
pub struct AuthGroup;

impl HandlerGroup for AuthGroup {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.route("/login", web::get().to(login_form))
            .route("/login", web::post().to(login))
            .route("/logout", web::get().to(logout))
            .route("/register", web::get().to(register_form))
            .route("/register", web::post().to(register));
    }
}

/// Submitted login form.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

/// Submitted registration form.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    /// 3 to 32 characters: letters, digits, underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

fn redirect(location: &str) -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, location.to_string()));
    builder
}

async fn login_form(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    state
        .templates
        .render_response("auth/login.html", &req, &json!({}))
}

async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    form.validate()?;
    let ext = &state.extensions;

    let user = User::find_by_email(ext.db.pool(), &form.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;
    if !ext.bcrypt.check_password(&user.password_hash, &form.password)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = ext.login.issue_token(user.id)?;
    log::info!("auth: user {} logged in", user.id);
    Ok(redirect("/user/").cookie(ext.login.login_cookie(token)).finish())
}

async fn logout(state: web::Data<AppState>) -> HttpResponse {
    redirect("/")
        .cookie(state.extensions.login.logout_cookie())
        .finish()
}

async fn register_form(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    state
        .templates
        .render_response("auth/register.html", &req, &json!({}))
}

async fn register(
    state: web::Data<AppState>,
    form: web::Form<RegisterForm>,
) -> Result<HttpResponse, AppError> {
    form.validate()?;
    let ext = &state.extensions;

    if User::find_by_email(ext.db.pool(), &form.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let password_hash = ext.bcrypt.hash_password(&form.password)?;
    let user = User::create(ext.db.pool(), &form.username, &form.email, &password_hash).await?;

    let mail = ext.mail.clone();
    let (to, subject, body) = (
        user.email.clone(),
        "Welcome".to_string(),
        format!("Hi {}, your account is ready.", user.username),
    );
    ext.tasks
        .enqueue("send_welcome_mail", async move { mail.send_async(to, subject, body).await })
        .await;

    let token = ext.login.issue_token(user.id)?;
    Ok(redirect("/user/").cookie(ext.login.login_cookie(token)).finish())
}
