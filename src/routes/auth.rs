//! Login/logout stubs and the main-page content endpoint.
//!
//! There is no session layer: login accepts any credentials and echoes
//! the user back.

use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user: String,
    #[allow(dead_code)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: String,
    pub user: String,
}

/// POST /login
pub async fn login(Json(login): Json<LoginRequest>) -> Json<LoginResponse> {
    Json(LoginResponse {
        status: "success".to_string(),
        user: login.user,
    })
}

/// POST /logout
pub async fn logout() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "success" }))
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub content: String,
}

/// GET /content — static copy for the main page.
pub async fn content() -> Json<ContentResponse> {
    let content = "Разрабатываемый интеллектуальный дефектоскоп должен в дальнейшем стать \
                   программной частью гидроакустического комплекса на базе многофункционального \
                   автономного необитаемого надводно-подводного интеллектуального аппарата \
                   «ГЛАЙДЕРОН», разработанного ООО НПК «Сетецентрические Платформы» и САМГТУ";
    Json(ContentResponse {
        content: content.to_string(),
    })
}
