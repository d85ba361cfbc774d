pub mod handlers;
pub mod middleware;
pub mod extractors;
pub mod ui;

use crate::{
    image::Annotator,
    models::{ModelManager, OnnxModelLoader, SearchPathLocator},
    stats::{InMemoryStatsStore, StatsStore},
    utils::error::DetectorError,
    Config, Result,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub models: Arc<ModelManager>,
    pub stats: Arc<dyn StatsStore>,
}

impl AppState {
    pub fn new(config: Config, models: ModelManager, stats: Arc<dyn StatsStore>) -> Self {
        Self {
            config: Arc::new(config),
            models: Arc::new(models),
            stats,
        }
    }
}

/// 加载模型并构建共享状态；找不到模型时直接失败
pub fn init_state(config: Config) -> Result<AppState> {
    let annotator = match &config.label_font {
        Some(path) => Annotator::with_font_file(path)?,
        None => Annotator::new(),
    };

    let locator = SearchPathLocator::new(
        config.model_paths.clone(),
        OnnxModelLoader::new(config.onnx_config.clone()),
    );
    let models = ModelManager::init(&locator, annotator)?;

    Ok(AppState::new(config, models, Arc::new(InMemoryStatsStore::new())))
}

pub async fn serve(config: Config) -> Result<()> {
    // 模型必须在监听之前加载成功
    let state = init_state(config)?;

    let addr: SocketAddr = state
        .config
        .bind_addr
        .parse()
        .map_err(|e| DetectorError::Config(format!("Invalid bind address {}: {}", state.config.bind_addr, e)))?;

    let app = create_app(state);

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET    /               - Service information");
    tracing::info!("  GET    /health         - Health check");
    tracing::info!("  POST   /predict        - Multipart image classification");
    tracing::info!("  GET    /model-info     - Model information");
    tracing::info!("  GET    /download-model - Download model artifact");
    tracing::info!("  GET    /stats          - Analysis statistics");
    tracing::info!("  GET    /dashboard      - Web dashboard");

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DetectorError::Internal(format!("Failed to bind to address {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DetectorError::Internal(format!("Server failed to start: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let server_config = state.config.server_config.clone();

    Router::new()
        // 系统路由
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        // 分类与模型
        .route("/predict", post(handlers::predict_handler))
        .route("/model-info", get(handlers::model_info_handler))
        .route("/download-model", get(handlers::download_model_handler))
        // 统计
        .route("/stats", get(handlers::stats_handler))
        .route("/stats/export", get(handlers::stats_export_handler))
        .route("/stats/history", delete(handlers::clear_history_handler))
        // Web UI
        .route("/dashboard", get(ui::dashboard_handler))
        // 中间件
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn(middleware::request_logging))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(server_config.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(server_config.request_timeout)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
