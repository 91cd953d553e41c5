use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::time::Instant;

use super::RequestContext;

/// Header set by PJAX clients on partial page navigation.
pub const PJAX_HEADER: &str = "X-PJAX";

/// Pre-request hook: stamps a fresh `RequestContext` into every request.
pub struct RequestHook;

impl<S, B> Transform<S, ServiceRequest> for RequestHook
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestHookService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestHookService { service }))
    }
}

pub struct RequestHookService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestHookService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let pjax = req.headers().contains_key(PJAX_HEADER);
        req.extensions_mut()
            .insert(RequestContext::new(Instant::now(), pjax));

        Box::pin(self.service.call(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    async fn echo_pjax(ctx: RequestContext) -> HttpResponse {
        HttpResponse::Ok().body(ctx.pjax().to_string())
    }

    #[actix_rt::test]
    async fn test_pjax_flag_is_per_request() {
        let app = test::init_service(
            App::new()
                .wrap(RequestHook)
                .route("/", web::get().to(echo_pjax)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((PJAX_HEADER, "true"))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "true");

        let req = test::TestRequest::get().uri("/").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "false");

        // Any value counts, even an empty one.
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((PJAX_HEADER, ""))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "true");
    }
}
