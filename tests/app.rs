use actix_web::http::{header, StatusCode};
use actix_web::{test, web, HttpResponse};
use appfactory::request::PJAX_HEADER;
use appfactory::{compose, AppError, Application, InitError, Settings};
use pretty_assertions::assert_eq;
use serde_json::json;

fn testing_app() -> Application {
    compose(Settings::testing()).expect("testing profile composes")
}

fn rendered(app: &Application, template: &str) -> String {
    let req = test::TestRequest::default().to_http_request();
    app.templates()
        .render(template, &req, &json!({}))
        .expect("template renders")
}

fn content_type(resp: &actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>) -> String {
    resp.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn boom() -> Result<HttpResponse, AppError> {
    Err(AppError::InternalServerError("exploded".into()))
}

async fn bad_request() -> Result<HttpResponse, AppError> {
    Err(AppError::BadRequest("nope".into()))
}

#[test_log::test(actix_rt::test)]
async fn test_index_renders_template() {
    let composed = testing_app();
    let app = test::init_service(composed.service()).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(content_type(&resp).starts_with("text/html"));
    let body = test::read_body(resp).await;
    assert_eq!(String::from_utf8_lossy(&body), rendered(&composed, "index.html"));
}

#[actix_rt::test]
async fn test_debug_is_forced_on_even_when_disabled() {
    let composed = compose(Settings::testing().with("DEBUG", json!(false))).unwrap();
    assert!(composed.settings().debug());

    let composed = compose(Settings::testing().with("DEBUG", json!("no"))).unwrap();
    assert!(composed.settings().debug());
}

#[actix_rt::test]
async fn test_unknown_path_renders_404_page() {
    let composed = testing_app();
    let app = test::init_service(composed.service()).await;

    let req = test::TestRequest::get().uri("/definitely/not/here").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(content_type(&resp).starts_with("text/html"));
    let body = test::read_body(resp).await;
    assert_eq!(String::from_utf8_lossy(&body), rendered(&composed, "errors/404.html"));
}

#[actix_rt::test]
async fn test_login_required_renders_401_page() {
    let composed = testing_app();
    let app = test::init_service(composed.service()).await;

    for uri in ["/user/", "/user/list?page=2"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let body = test::read_body(resp).await;
        assert_eq!(String::from_utf8_lossy(&body), rendered(&composed, "errors/401.html"));
    }
}

#[actix_rt::test]
async fn test_forged_session_cookie_is_rejected() {
    let composed = testing_app();
    let app = test::init_service(composed.service()).await;

    let req = test::TestRequest::get()
        .uri("/user/")
        .cookie(actix_web::cookie::Cookie::new("session", "not.a.token"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_page_past_the_end_is_not_found() {
    let composed = testing_app();
    let login = &composed.extensions().login;
    let cookie = login.login_cookie(login.issue_token(1).unwrap());
    let app = test::init_service(composed.service()).await;

    let req = test::TestRequest::get()
        .uri("/user/list?page=9223372036854775807")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = test::read_body(resp).await;
    assert_eq!(String::from_utf8_lossy(&body), rendered(&composed, "errors/404.html"));
}

#[actix_rt::test]
async fn test_handler_failure_renders_500_page() {
    let composed = testing_app();
    let app = test::init_service(composed.service().route("/boom", web::get().to(boom))).await;

    let req = test::TestRequest::get().uri("/boom").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = test::read_body(resp).await;
    assert_eq!(String::from_utf8_lossy(&body), rendered(&composed, "errors/500.html"));
}

#[actix_rt::test]
async fn test_other_statuses_keep_their_body() {
    let composed = testing_app();
    let app = test::init_service(composed.service().route("/bad", web::get().to(bad_request))).await;

    let req = test::TestRequest::get().uri("/bad").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "nope" }));
}

#[actix_rt::test]
async fn test_pjax_requests_get_the_bare_layout() {
    let composed = testing_app();
    let app = test::init_service(composed.service()).await;

    let req = test::TestRequest::get()
        .uri("/login")
        .insert_header((PJAX_HEADER, "true"))
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains("action=\"/login\""));
    assert!(!body.contains("<!doctype html>"));

    // The next request without the header gets the full page.
    let req = test::TestRequest::get().uri("/login").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains("<!doctype html>"));
    assert!(body.contains("Rendered in "));
}

#[actix_rt::test]
async fn test_invalid_login_form_is_rejected_before_lookup() {
    let app = test::init_service(testing_app().service()).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("email", "not-an-email"), ("password", "secret123")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_rt::test]
async fn test_invalid_registration_inputs() {
    let app = test::init_service(testing_app().service()).await;

    let cases = [
        (vec![("email", "a@example.com"), ("password", "Password123!")], StatusCode::BAD_REQUEST, "missing username"),
        (vec![("username", "testuser"), ("email", "invalid-email"), ("password", "Password123!")], StatusCode::UNPROCESSABLE_ENTITY, "invalid email"),
        (vec![("username", "u"), ("email", "a@example.com"), ("password", "Password123!")], StatusCode::UNPROCESSABLE_ENTITY, "username too short"),
        (vec![("username", "user name!"), ("email", "a@example.com"), ("password", "Password123!")], StatusCode::UNPROCESSABLE_ENTITY, "username with invalid chars"),
        (vec![("username", "testuser"), ("email", "a@example.com"), ("password", "123")], StatusCode::UNPROCESSABLE_ENTITY, "password too short"),
    ];

    for (form, expected, description) in cases {
        let req = test::TestRequest::post()
            .uri("/register")
            .set_form(form)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected, "{}", description);
    }
}

#[actix_rt::test]
async fn test_logout_clears_session_cookie() {
    let app = test::init_service(testing_app().service()).await;

    let req = test::TestRequest::get().uri("/logout").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "session")
        .expect("removal cookie set");
    assert_eq!(cookie.value(), "");
}

#[actix_rt::test]
async fn test_api_health_is_mounted_under_prefix() {
    let app = test::init_service(testing_app().service()).await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
}

#[actix_rt::test]
async fn test_asset_bundles_are_served() {
    let source = std::env::temp_dir().join(format!("appfactory-it-{}.css", std::process::id()));
    std::fs::write(&source, "body { color: red; }").unwrap();
    let settings = Settings::testing().with(
        "ASSETS_BUNDLES",
        json!({ "site.css": [source.to_str().unwrap()] }),
    );
    let composed = compose(settings).unwrap();
    let app = test::init_service(composed.service()).await;

    let req = test::TestRequest::get().uri("/static/gen/site.css").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(content_type(&resp).starts_with("text/css"));
    assert_eq!(test::read_body(resp).await, "body { color: red; }");

    let req = test::TestRequest::get().uri("/static/gen/other.css").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_mount_points_cannot_cover_the_root() {
    for (key, value) in [("API_PREFIX", "//"), ("ASSETS_URL", "/"), ("ASSETS_URL", "")] {
        let result = compose(Settings::testing().with(key, json!(value)));
        assert!(matches!(result, Err(InitError::Extension { .. })), "{}={:?} accepted", key, value);
    }

    let settings = Settings::testing()
        .with("API_PREFIX", json!("/v1/"))
        .with("ASSETS_URL", json!("/assets/"));
    let app = test::init_service(compose(settings).unwrap().service()).await;

    for uri in ["/", "/login", "/v1/health"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
    }
}

#[actix_rt::test]
async fn test_composition_fails_without_templates() {
    let result = compose(Settings::testing().with("TEMPLATE_FOLDER", json!("/no/such/folder")));
    assert!(matches!(result, Err(InitError::Templates(_))));
}

#[actix_rt::test]
async fn test_instances_are_independent() {
    let first = compose(Settings::testing()).unwrap();
    let second = compose(Settings::testing().with("MAIL_SUPPRESS_SEND", json!(true))).unwrap();

    first
        .extensions()
        .mail
        .send("a@example.com", "only first", "body")
        .unwrap();

    assert_eq!(first.extensions().mail.outbox().len(), 1);
    assert!(second.extensions().mail.outbox().is_empty());
}
