#[cfg(test)]
mod web_routes_tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::PgConnection;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use eduvillage::core::config::AppConfig;
    use eduvillage::main_module::build_router;
    use eduvillage::shared::enums::Role;
    use eduvillage::shared::models::User;
    use eduvillage::shared::state::AppState;

    /// State whose pool never connects; the routes below must not need it.
    fn offline_state() -> Arc<AppState> {
        let manager =
            ConnectionManager::<PgConnection>::new("postgres://nobody@127.0.0.1:1/eduvillage");
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(std::time::Duration::from_millis(200))
            .build_unchecked(manager);
        AppState::new(pool, AppConfig::default())
    }

    fn app() -> (Router, Arc<AppState>) {
        let state = offline_state();
        (build_router(state.clone()), state)
    }

    fn bearer_for(state: &AppState, role: Role) -> String {
        let user = User {
            id: Uuid::new_v4(),
            username: format!("{}1", role.as_str()),
            email: None,
            display_name: None,
            password_hash: String::new(),
            role,
            is_active: true,
            date_joined: chrono::Utc::now(),
        };
        format!("Bearer {}", state.auth.issue_token(&user).unwrap())
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).to_string()
    }

    #[tokio::test]
    async fn test_healthz_is_always_ok() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn test_login_page_preselects_role() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::get("/accounts/login?role=teacher")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Teacher login"));
        assert!(body.contains("value=\"teacher\" selected"));
    }

    #[tokio::test]
    async fn test_verify_form_renders() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/certificates/verify").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("name=\"certificate_id\""));
    }

    #[tokio::test]
    async fn test_blank_verification_code_shows_form_error() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::post("/certificates/verify")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("certificate_id=+++"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response)
            .await
            .contains("Please enter a certificate ID"));
    }

    #[tokio::test]
    async fn test_qr_code_is_png() {
        let (app, _) = app();
        let uri = format!("/certificates/qr/{}", Uuid::new_v4());
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_qr_code_for_malformed_code_is_not_found() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::get("/certificates/qr/not-a-code")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_anonymous_user_is_sent_to_login() {
        for path in ["/dashboard/student", "/teacher/new-course", "/admin", "/certificates/my"] {
            let (app, _) = app();
            let response = app
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(response.headers()[header::LOCATION], "/accounts/login", "{path}");
        }
    }

    #[tokio::test]
    async fn test_session_is_not_trusted_without_the_account_row() {
        let (app, state) = app();
        let response = app
            .oneshot(
                Request::get("/teacher/new-course")
                    .header(header::AUTHORIZATION, bearer_for(&state, Role::Teacher))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body_text(response).await.contains("New course"));
    }

    #[tokio::test]
    async fn test_progress_api_answers_json_without_session() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/api/progress").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Please log in to continue.");
    }

    #[tokio::test]
    async fn test_error_page_shows_and_consumes_pending_flash() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::get("/certificates/qr/not-a-code")
                    .header(header::COOKIE, "flash=warning%3AHeads%20up")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let cleared = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|c| c.starts_with("flash="));
        assert!(cleared);

        let body = body_text(response).await;
        assert!(body.contains("Heads up"));
        assert!(body.contains("alert-warning"));
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_flashes() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::post("/accounts/logout")
                    .header(header::COOKIE, "auth_token=stale")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookies: Vec<_> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("auth_token=")));
        assert!(cookies.iter().any(|c| c.starts_with("flash=")));
    }
}
