//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the fixed routes and the proxy handler
//! - Wire up middleware (tracing, timeout, body limit)
//! - Serve plain TCP or TLS, with graceful shutdown
//! - Swap in a rebuilt engine when the configuration is reloaded
//! - Record request metrics

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ProxyConfig, ProxySettings};
use crate::http::request::{client_ip, make_request_span, RequestContext};
use crate::http::response;
use crate::net::tls::load_tls_config;
use crate::observability::events::{EventSink, TracingEventSink};
use crate::observability::metrics;
use crate::proxy::engine::ProxyEngine;
use crate::proxy::transport::{ReqwestTransport, TransportError};

/// How long in-flight TLS connections may drain after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The reloadable part of the server: rebuilt from each new config.
pub struct ProxyState {
    pub engine: ProxyEngine,
    pub settings: ProxySettings,
}

impl ProxyState {
    pub fn from_config(config: &ProxyConfig, events: Arc<dyn EventSink>) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config.timeouts, &config.proxy)?;
        Ok(Self {
            engine: ProxyEngine::new(
                Arc::new(transport),
                events,
                config.proxy.max_html_body_bytes,
                Duration::from_secs(config.timeouts.upstream_secs),
            ),
            settings: config.proxy.clone(),
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<ProxyState>>,
    /// Whether the listener terminates TLS.
    pub tls: bool,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    state: AppState,
    events: Arc<dyn EventSink>,
}

impl HttpServer {
    /// Create a server that reports events to the log stream.
    pub fn new(config: ProxyConfig) -> Result<Self, TransportError> {
        Self::with_event_sink(config, Arc::new(TracingEventSink))
    }

    /// Create a server with a custom event sink.
    pub fn with_event_sink(
        config: ProxyConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, TransportError> {
        let proxy_state = ProxyState::from_config(&config, events.clone())?;
        let state = AppState {
            inner: Arc::new(ArcSwap::from_pointee(proxy_state)),
            tls: config.listener.tls.is_some(),
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            config,
            state,
            events,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The timeout is a backstop: validation keeps it above the engine's
    /// upstream deadline, which produces the proper error response.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/robots.txt", any(robots_handler))
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configs received on `config_updates` replace the engine for all
    /// subsequent requests; listener and middleware settings are fixed at
    /// startup.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;

        tokio::spawn(apply_config_updates(
            self.state.clone(),
            self.events.clone(),
            self.config.timeouts.request_secs,
            config_updates,
        ));

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        match &self.config.listener.tls {
            Some(tls) => {
                let rustls = load_tls_config(tls).await?;
                tracing::info!(address = %addr, "HTTPS server starting");

                let handle = axum_server::Handle::new();
                let drain = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                });

                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// `request_secs` is the handler timeout the router was built with; it
/// cannot change on reload, so upstream deadlines must stay below it.
async fn apply_config_updates(
    state: AppState,
    events: Arc<dyn EventSink>,
    request_secs: u64,
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
) {
    while let Some(config) = updates.recv().await {
        if config.timeouts.upstream_secs >= request_secs {
            tracing::error!(
                upstream_secs = config.timeouts.upstream_secs,
                request_secs,
                "Reloaded upstream timeout must stay below the startup request timeout, ignoring reload"
            );
            continue;
        }
        match ProxyState::from_config(&config, events.clone()) {
            Ok(next) => {
                state.inner.store(Arc::new(next));
                tracing::info!("Configuration reloaded");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to apply reloaded configuration");
            }
        }
    }
}

async fn robots_handler() -> Response {
    response::robots_txt()
}

/// Main proxy handler: preflight short-circuit, then the rewriting pipeline.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();

    let response = if method == Method::OPTIONS {
        response::preflight()
    } else {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let current = state.inner.load_full();

        match RequestContext::from_request(&request, &current.settings, state.tls, peer) {
            Ok(ctx) => current.engine.handle(request, &ctx).await,
            Err(err) => {
                tracing::warn!(error = %err, "Rejecting request");
                let client_ip = client_ip(request.headers(), peer);
                current.engine.record_rejection(&request, client_ip, &err);
                err.into_response()
            }
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response
}
