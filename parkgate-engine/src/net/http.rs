//! HTTP control surface: monitoring, topology pushes, peer borrow requests,
//! car-leaving notifications and Prometheus metrics.

use std::sync::{Arc, OnceLock};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use parkgate_core::prelude::{ArrivalQueue, GateStats, PeerRegistry, TokenPool, VehicleWithToken};
use parkgate_telemetry::MetricsRecorder;

use crate::protocol::{
    BorrowResponse, StatsResponse, TopologyAck, TopologyPush, BORROW_PATH, CAR_LEAVING_PATH,
    METRICS_PATH, PEERS_PATH, STATS_PATH,
};

/// Everything the handlers touch. The token pool only exists once the
/// coordinator has answered registration.
#[derive(Clone)]
pub struct GateState {
    pub stats: Arc<GateStats>,
    pub queue: Arc<ArrivalQueue>,
    pub registry: Arc<PeerRegistry>,
    pub metrics: MetricsRecorder,
    pool: Arc<OnceLock<Arc<TokenPool>>>,
}

impl GateState {
    pub fn new(
        stats: Arc<GateStats>,
        queue: Arc<ArrivalQueue>,
        registry: Arc<PeerRegistry>,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            stats,
            queue,
            registry,
            metrics,
            pool: Arc::new(OnceLock::new()),
        }
    }

    /// Returns `false` if a pool was already installed.
    pub fn install_pool(&self, pool: Arc<TokenPool>) -> bool {
        self.pool.set(pool).is_ok()
    }

    pub fn pool(&self) -> Option<&Arc<TokenPool>> {
        self.pool.get()
    }
}

pub fn router(state: GateState) -> Router {
    Router::new()
        .route(STATS_PATH, get(stats))
        .route(PEERS_PATH, post(push_topology))
        .route(BORROW_PATH, post(borrow_token))
        .route(CAR_LEAVING_PATH, post(car_leaving))
        .route(METRICS_PATH, get(metrics))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: GateState) -> std::io::Result<()> {
    info!("HTTP surface listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn stats(State(state): State<GateState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        stats: state.stats.snapshot(),
        queue_len: state.queue.len(),
        free_tokens: state.pool().map(|pool| pool.free_count()),
    })
}

async fn push_topology(
    State(state): State<GateState>,
    Json(push): Json<TopologyPush>,
) -> Json<TopologyAck> {
    let peers = push.peers.len();
    let version = state.registry.replace(push.peers);
    info!(version, peers, "Peer topology updated");
    Json(TopologyAck { version })
}

async fn borrow_token(State(state): State<GateState>) -> Json<BorrowResponse> {
    let token = state.pool().and_then(|pool| pool.lend());
    match &token {
        Some(token) => info!("Lending token {token} to a peer"),
        None => debug!("Borrow request refused, nothing to lend"),
    }
    Json(BorrowResponse { token })
}

async fn car_leaving(
    State(state): State<GateState>,
    Json(leaving): Json<VehicleWithToken>,
) -> StatusCode {
    let Some(pool) = state.pool() else {
        warn!("{leaving} left before registration completed, token not accepted");
        return StatusCode::SERVICE_UNAVAILABLE;
    };
    info!("(Parking space -> Gate) {leaving} left, returning token to the pool");
    pool.add_token(leaving.token);
    StatusCode::NO_CONTENT
}

async fn metrics(State(state): State<GateState>) -> Result<String, (StatusCode, String)> {
    state
        .metrics
        .gather_metrics()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
