use axum::response::{Html, IntoResponse};

/// 仪表盘页面
pub async fn dashboard_handler() -> impl IntoResponse {
    Html(include_str!("../../templates/dashboard.html"))
}
