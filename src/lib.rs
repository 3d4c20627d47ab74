use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use tracing::{error, info_span, Level};

use crate::auth::TokenValidate;
use crate::config::Config;
use crate::recorder::archive::{ArchiveSink, Opencast};
use crate::recorder::directory::StaticDirectory;
use crate::recorder::pipeline::PipelinePlanner;
use crate::recorder::probe::RtspProber;
use crate::recorder::store::MemStore;
use crate::recorder::RecordingService;
use crate::route::AppState;

mod auth;
pub mod config;
pub mod error;
pub mod log;
pub mod recorder;
pub mod result;
pub mod route;
pub mod signal;

pub fn app(state: AppState) -> Router {
    let auth_layer =
        ValidateRequestHeaderLayer::custom(TokenValidate::new(state.config.auth.token.clone()));
    Router::new()
        .merge(
            route::recording::route()
                .merge(route::camera::route())
                .layer(auth_layer),
        )
        .with_state(state.clone())
        .layer(if state.config.http.cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let span = info_span!(
                        "http_request",
                        uri = ?request.uri(),
                        method = ?request.method(),
                        span_id = tracing::field::Empty,
                    );
                    span.record(
                        "span_id",
                        span.id().unwrap_or(tracing::Id::from_u64(42)).into_u64(),
                    );
                    span
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO))
                .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
        )
}

pub async fn serve<F>(cfg: Config, listener: TcpListener, signal: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let directory = Arc::new(StaticDirectory::new(&cfg.cameras));
    let prober = Arc::new(RtspProber::new(Duration::from_secs(
        cfg.recorder.probe_timeout,
    )));
    let planner = PipelinePlanner::new(cfg.recorder.launcher.clone());
    let store = Arc::new(MemStore::new());
    let archive = cfg
        .archive
        .as_ref()
        .map(|a| Arc::new(Opencast::new(a).expect("invalid archive config")) as Arc<dyn ArchiveSink>);

    let recorder = Arc::new(RecordingService::new(
        directory,
        prober,
        planner,
        store,
        archive,
        cfg.recorder.videos_dir.clone(),
    ));
    let state = AppState {
        config: cfg,
        recorder: recorder.clone(),
    };

    axum::serve(listener, app(state))
        .with_graceful_shutdown(signal)
        .await
        .unwrap_or_else(|e| error!("Application error: {e}"));
    recorder.shutdown().await;
}
