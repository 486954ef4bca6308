use actix_web::middleware::DefaultHeaders;

pub mod cors;
pub mod rate_limit;

/// Access log line in Apache combined format.
pub const COMBINED_LOG_FORMAT: &str = r#"%a - - [%t] "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#;

/// Baseline hardening headers added to every response.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "SAMEORIGIN"))
        .add(("X-DNS-Prefetch-Control", "off"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("Cross-Origin-Resource-Policy", "same-origin"))
        .add(("X-Download-Options", "noopen"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{self, TestRequest};
    use actix_web::{web, App, HttpResponse};

    #[actix_web::test]
    async fn test_security_headers_are_added() {
        let app = test::init_service(
            App::new()
                .wrap(security_headers())
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;
        let resp = test::call_service(&app, TestRequest::default().to_request()).await;
        assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "SAMEORIGIN");
    }
}
