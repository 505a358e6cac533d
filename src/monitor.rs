// src/monitor.rs
//! Liveness server running beside the miner.
//!
//! `/` and `/health` answer `OK`; `/metrics` renders the Prometheus recorder
//! when one is installed.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const HEALTH_BODY: &str = "OK";

pub fn router(metrics: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .route("/", get(|| async { HEALTH_BODY }))
        .route("/health", get(|| async { HEALTH_BODY }));

    if let Some(handle) = metrics {
        router = router.route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        );
    }
    router
}

/// A running monitor server; dropped or [`Monitor::stop`]ped at shutdown.
pub struct Monitor {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Monitor {
    /// Bind `addr` and serve `router` on a background task.
    pub async fn start(addr: &str, router: Router) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding monitor on {addr}"))?;
        let addr = listener.local_addr().context("monitor local address")?;
        let (shutdown, rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
            if let Err(e) = served {
                warn!(target: "monitor", error = ?e, "monitor server stopped");
            }
        });

        info!(target: "monitor", %addr, "monitor listening");
        Ok(Self {
            addr,
            shutdown,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Graceful shutdown; waits for in-flight requests.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!(target: "monitor", error = ?e, "monitor task failed");
        }
        info!(target: "monitor", "monitor stopped");
    }
}
