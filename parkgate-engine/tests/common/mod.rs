//! Stand-ins for the time authority, coordinator and parking space.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use parkgate_config::ParkgateConfig;
use parkgate_core::prelude::{GateId, Strategy, Token, VehicleWithToken};
use parkgate_engine::protocol::{
    decode_frame, encode_frame, RegisterRequest, RegisterResponse, TimeRequest, TimeResponse,
};

pub async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

/// Answers every time request with `now`.
pub async fn spawn_time_authority(now: u64) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
                if let Some(Ok(frame)) = framed.next().await {
                    let _: TimeRequest = decode_frame(&frame).unwrap();
                    let reply = encode_frame(&TimeResponse {
                        current_timestamp: now,
                    })
                    .unwrap();
                    let _ = framed.send(reply).await;
                }
            });
        }
    });
    addr
}

/// Hands out one allotment per registration, in order.
pub struct FakeCoordinator {
    pub register_url: String,
    pub requests: Arc<Mutex<Vec<RegisterRequest>>>,
}

pub async fn spawn_coordinator(
    strategy: Strategy,
    parking_space_url: String,
    allotments: Vec<(&'static str, Vec<&'static str>)>,
) -> FakeCoordinator {
    #[derive(Clone)]
    struct CoordinatorState {
        next: Arc<AtomicUsize>,
        allotments: Arc<Vec<(&'static str, Vec<&'static str>)>>,
        strategy: Strategy,
        parking_space_url: String,
        requests: Arc<Mutex<Vec<RegisterRequest>>>,
    }

    async fn register(
        State(state): State<CoordinatorState>,
        Json(request): Json<RegisterRequest>,
    ) -> Json<RegisterResponse> {
        state.requests.lock().unwrap().push(request);
        let n = state.next.fetch_add(1, Ordering::SeqCst);
        let (id, tokens) = &state.allotments[n];
        Json(RegisterResponse {
            gate_id: Some(GateId::new(*id)),
            tokens: tokens.iter().map(|t| Token::new(*t)).collect(),
            strategy: state.strategy,
            parking_space_url: state.parking_space_url.clone(),
        })
    }

    let requests = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route("/gates/register", post(register))
        .with_state(CoordinatorState {
            next: Arc::new(AtomicUsize::new(0)),
            allotments: Arc::new(allotments),
            strategy,
            parking_space_url,
            requests: Arc::clone(&requests),
        });
    let base = spawn_router(router).await;
    FakeCoordinator {
        register_url: format!("{base}/gates/register"),
        requests,
    }
}

pub type Received = Arc<Mutex<Vec<VehicleWithToken>>>;

/// Records every vehicle it is handed. Returns the receiving URL.
pub async fn spawn_parking_space() -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route(
            "/cars",
            post(
                |State(received): State<Received>, Json(vehicle): Json<VehicleWithToken>| async move {
                    received.lock().unwrap().push(vehicle);
                    StatusCode::NO_CONTENT
                },
            ),
        )
        .with_state(Arc::clone(&received));
    let base = spawn_router(router).await;
    (format!("{base}/cars"), received)
}

pub fn gate_config(authority_addr: &str, register_url: &str) -> ParkgateConfig {
    let mut config = ParkgateConfig::default();
    config.gate.ingest_addr = "127.0.0.1:0".into();
    config.gate.http_addr = "127.0.0.1:0".into();
    config.gate.advertised_host = "127.0.0.1".into();
    config.gate.transfer_duration = 5;
    config.clock.authority_addr = authority_addr.into();
    config.clock.poll_interval_ms = 1;
    config.clock.resync_interval_ms = 0;
    config.coordinator.register_url = register_url.into();
    config.peers.retry_interval_ms = 20;
    config
}

/// Polls `condition` for up to five seconds.
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
