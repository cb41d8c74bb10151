use std::net::SocketAddr;

use anyhow::Context;
use axum::{http::HeaderValue, middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, journals, users};

fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    match origin {
        None | Some("*") => Ok(CorsLayer::permissive()),
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .with_context(|| format!("invalid CORS_ORIGIN `{origin}`"))?;
            Ok(CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any))
        }
    }
}

pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(state.config.cors_origin.as_deref())?;

    let protected = Router::new()
        .merge(users::router())
        .merge(journals::router())
        .route_layer(from_fn_with_state(state.clone(), auth::require_auth));

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", Router::new().merge(auth::router()).merge(protected))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        );
    Ok(app)
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
