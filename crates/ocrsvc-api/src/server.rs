//! HTTP server assembly: wires the Recognizer, preprocessing pipeline,
//! document registry and Dispatcher into one `AppState`, then serves the
//! router built in `routes.rs`.

use crate::routes;
use crate::state::AppState;
use ocrsvc_core::ServiceConfig;
use ocrsvc_dispatch::Dispatcher;
use ocrsvc_documents::DocumentRegistry;
use ocrsvc_ocr::engine::Recognizer;
use ocrsvc_ocr::preprocessor::PreprocessorTunables;
use ocrsvc_ocr::OcrPipeline;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// API server configuration. `service` carries the OCR/cache/dispatcher
/// tunables (already environment-aware, see `ServiceConfig::default`); this
/// struct only adds the bind address and which Tesseract language packs to
/// load.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub ocr_languages: Vec<String>,
    pub service: ServiceConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("OCRSVC_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("OCRSVC_PORT", 8080),
            ocr_languages: std::env::var("OCRSVC_LANGUAGES")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| vec!["eng".to_string()]),
            service: ServiceConfig::default(),
        }
    }
}

pub struct ApiServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Builds the Recognizer/pipeline/document registry/dispatcher chain and
    /// runs one synthetic warm-up recognition (spec.md §4.4) so the first
    /// real request doesn't pay Tesseract's lazy-init cost. A failed warm-up
    /// is logged, not fatal -- `recognizer_status()` will keep reporting
    /// `not_initialized` or `failed` and OCR endpoints will return structured
    /// failures, per spec.md §4.4's "initialisation failure... must not crash
    /// the service".
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        tracing::info!(host = %config.host, port = config.port, "initializing OCR API server");

        let recognizer = Recognizer::new(config.ocr_languages.clone());
        let pipeline = Arc::new(OcrPipeline::new(
            recognizer,
            PreprocessorTunables {
                min_width_for_ocr: config.service.min_width_for_ocr,
            },
            config.service.min_ocr_confidence,
            config.service.column_gap_fraction,
        ));
        let documents = Arc::new(DocumentRegistry::with_defaults());
        let dispatcher = Dispatcher::new(pipeline, documents, config.service.clone());

        if let Err(e) = dispatcher.warm_up().await {
            tracing::warn!(error = %e, "OCR warm-up failed; recognizer will report its failure status to callers");
        }

        let state = Arc::new(AppState::new(dispatcher));
        Ok(Self { config, state })
    }

    fn build_router(&self) -> axum::Router {
        use axum::extract::DefaultBodyLimit;

        routes::build_router(Arc::clone(&self.state))
            .layer(DefaultBodyLimit::max(
                (self.config.service.max_file_size_mb * 1024 * 1024) as usize,
            ))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.build_router();
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind to {addr}: {e}"))?;

        tracing::info!("OCR API server listening on http://{addr}");
        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_localhost() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.ocr_languages, vec!["eng".to_string()]);
    }
}
