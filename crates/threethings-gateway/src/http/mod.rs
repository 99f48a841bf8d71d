pub mod health;
pub mod ingest;
pub mod mailgun;
pub mod mandrill;

use axum::http::StatusCode;

/// HEAD on a receive route. Providers check it before enabling a webhook.
pub async fn head_ok() -> StatusCode {
    StatusCode::OK
}


#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use threethings_core::ThreeThingsConfig;

    use super::testing::{router, send};

    #[tokio::test]
    async fn health_reports_version() {
        let (app, _, _) = router(ThreeThingsConfig::default());
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn receive_routes_answer_head_requests() {
        for uri in ["/mailgun/receive", "/mandrill/receive"] {
            let (app, _, _) = router(ThreeThingsConfig::default());
            let req = Request::head(uri).body(Body::empty()).unwrap();
            let (status, _) = send(app, req).await;
            assert_eq!(status, 200, "{uri}");
        }
    }

    #[tokio::test]
    async fn landing_pages() {
        for uri in ["/mailgun/", "/mandrill/"] {
            let (app, _, _) = router(ThreeThingsConfig::default());
            let req = Request::get(uri).body(Body::empty()).unwrap();
            let (status, _) = send(app, req).await;
            assert_eq!(status, 200, "{uri}");
        }
    }
}
