use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use super::HandlerGroup;
use crate::app::AppState;
use crate::error::AppError;
use crate::extensions::CurrentUser;
use crate::models::User;

pub const PER_PAGE: i64 = 20;

/// Profile and member listing, mounted under `/user`.
pub struct UserGroup;

impl HandlerGroup for UserGroup {
    fn name(&self) -> &'static str {
        "user"
    }

    fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.route("/", web::get().to(profile))
            .route("/list", web::get().to(list));
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// Page numbers shown by `user/list.html`.
#[derive(Debug, PartialEq, serde::Serialize)]
pub struct Pagination {
    pub page: i64,
    pub pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let pages = ((total + per_page - 1) / per_page).max(1);
        Pagination {
            page,
            pages,
            has_prev: page > 1,
            has_next: page < pages,
        }
    }
}

async fn profile(
    user: CurrentUser,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let user = User::find(state.extensions.db.pool(), user.0).await?;
    state
        .templates
        .render_response("user/profile.html", &req, &json!({ "user": user }))
}

async fn list(
    _user: CurrentUser,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let offset = User::page_offset(page, PER_PAGE)
        .ok_or_else(|| AppError::NotFound(format!("Page {} does not exist", page)))?;
    let pool = state.extensions.db.pool();

    let total = User::count(pool).await?;
    let users = User::page(pool, offset, PER_PAGE).await?;
    if users.is_empty() && page > 1 {
        return Err(AppError::NotFound(format!("Page {} does not exist", page)));
    }

    state.templates.render_response(
        "user/list.html",
        &req,
        &json!({
            "users": users,
            "pagination": Pagination::new(page, PER_PAGE, total),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        assert_eq!(
            Pagination::new(1, 20, 0),
            Pagination { page: 1, pages: 1, has_prev: false, has_next: false }
        );
        assert_eq!(
            Pagination::new(2, 20, 41),
            Pagination { page: 2, pages: 3, has_prev: true, has_next: true }
        );
        assert_eq!(
            Pagination::new(3, 20, 60),
            Pagination { page: 3, pages: 3, has_prev: true, has_next: false }
        );
    }
}
