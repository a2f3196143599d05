//! Gate startup and lifecycle.
//!
//! Startup order:
//! 1. Clock handshake with the time authority (fatal on failure)
//! 2. Bind the HTTP surface, so topology pushes are accepted right away
//! 3. Bind the vehicle ingest listener
//! 4. Register with the coordinator (fatal on failure)
//! 5. Build and install the token pool for the assigned strategy
//! 6. Start periodic clock resync and the pipeline thread

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn, Instrument};

use parkgate_config::{ParkgateConfig, QueueConfig};
use parkgate_core::prelude::{
    ArrivalQueue, Clock, GateId, GateStats, LocalPool, OverflowPolicy, PeerRegistry, Pipeline,
    SharedPool, SharedPoolOptions, Strategy, SyncClock, Token, TokenPool,
};
use parkgate_telemetry::{EventLogger, MetricsRecorder};

use crate::error::GateError;
use crate::net::{
    http, ingest, CoordinatorClient, GateState, HttpDownstream, HttpPeerLender, TcpTimeAuthority,
};
use crate::protocol::{RegisterRequest, RegisterResponse};

pub struct Gate {
    config: ParkgateConfig,
    metrics: MetricsRecorder,
}

/// A started gate. Dropping it leaves its tasks running; call
/// [`RunningGate::shutdown`] to stop them.
pub struct RunningGate {
    pub gate_id: GateId,
    pub http_addr: SocketAddr,
    pub ingest_addr: SocketAddr,
    state: GateState,
    pool: Arc<TokenPool>,
    pipeline: Option<JoinHandle<()>>,
    background: Vec<JoinHandle<()>>,
}

impl Gate {
    pub fn new(config: ParkgateConfig, metrics: MetricsRecorder) -> Self {
        Self { config, metrics }
    }

    /// Starts the gate and runs it until Ctrl-C.
    pub async fn run(self) -> Result<(), GateError> {
        let running = self.start().await?;
        running
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Unable to listen for shutdown signal: {e}");
                    std::future::pending::<()>().await;
                }
            })
            .await
    }

    /// Brings the gate up. On failure every task already spawned is
    /// aborted and the cause is logged before it is returned.
    #[instrument(level = "info", name = "gate_start", skip_all)]
    pub async fn start(self) -> Result<RunningGate, GateError> {
        let mut background = Vec::new();
        match self.launch(&mut background).await {
            Ok(running) => Ok(running),
            Err(e) => {
                background.iter().for_each(JoinHandle::abort);
                error!("Gate failed to start: {e}");
                Err(e)
            }
        }
    }

    async fn launch(self, background: &mut Vec<JoinHandle<()>>) -> Result<RunningGate, GateError> {
        let Gate { config, metrics } = self;

        let authority = Arc::new(TcpTimeAuthority::new(
            config.clock.authority_addr.clone(),
            Duration::from_millis(config.clock.handshake_timeout_ms),
        ));
        let clock = Arc::new(
            SyncClock::connect(authority.as_ref())
                .await
                .map_err(GateError::ClockUnavailable)?
                .with_poll_interval(Duration::from_millis(config.clock.poll_interval_ms)),
        );
        info!(authority = authority.addr(), "Clock synchronised");

        let stats = Arc::new(GateStats::new());
        let queue = Arc::new(build_queue(&config.queue)?);
        let registry = Arc::new(PeerRegistry::new());
        let state = GateState::new(
            Arc::clone(&stats),
            Arc::clone(&queue),
            Arc::clone(&registry),
            metrics.clone(),
        );

        let http_listener = bind("http", &config.gate.http_addr).await?;
        let http_addr = http_listener.local_addr()?;
        background.push(tokio::spawn(
            {
                let state = state.clone();
                async move {
                    if let Err(e) = http::serve(http_listener, state).await {
                        error!("HTTP surface stopped: {e}");
                    }
                }
            }
            .instrument(tracing::info_span!("http_task")),
        ));

        let ingest_listener = bind("ingest", &config.gate.ingest_addr).await?;
        let ingest_addr = ingest_listener.local_addr()?;
        background.push(tokio::spawn(
            {
                let clock: Arc<dyn Clock> = clock.clone();
                let queue = Arc::clone(&queue);
                async move {
                    if let Err(e) = ingest::serve(ingest_listener, clock, queue).await {
                        error!("Ingest listener stopped: {e}");
                    }
                }
            }
            .instrument(tracing::info_span!("ingest_task")),
        ));

        let coordinator = CoordinatorClient::new(
            config.coordinator.register_url.clone(),
            Duration::from_millis(config.coordinator.timeout_ms),
        )?;
        let registered = coordinator
            .register(&RegisterRequest {
                hostname: config.gate.advertised_host.clone(),
                ingest_port: ingest_addr.port(),
                http_port: http_addr.port(),
            })
            .await?;

        let gate_id = resolve_gate_id(&config, &registered, http_addr);
        let span = EventLogger::gate_span(gate_id.as_str());
        info!(gate = %gate_id, %http_addr, %ingest_addr, "Gate registered");

        let RegisterResponse {
            tokens,
            strategy,
            parking_space_url,
            ..
        } = registered;
        let pool = Arc::new(build_pool(
            strategy,
            tokens,
            &gate_id,
            &config,
            Arc::clone(&registry),
            metrics.clone(),
        )?);
        if !state.install_pool(Arc::clone(&pool)) {
            warn!("Token pool was already installed");
        }

        if config.clock.resync_interval_ms > 0 {
            background.push(tokio::spawn(
                resync_loop(
                    Arc::clone(&clock),
                    Arc::clone(&authority),
                    Duration::from_millis(config.clock.resync_interval_ms),
                )
                .instrument(span.clone()),
            ));
        }

        let downstream = Arc::new(HttpDownstream::new(
            parking_space_url,
            Duration::from_millis(config.gate.forward_timeout_ms),
            Handle::current(),
        )?);
        let pipeline = Pipeline::new(
            clock,
            Arc::clone(&queue),
            Arc::clone(&pool),
            downstream,
            stats,
            metrics,
            config.gate.transfer_duration,
        );
        let pipeline_span = span.clone();
        let pipeline = tokio::task::spawn_blocking(move || {
            let _entered = pipeline_span.enter();
            pipeline.run();
        });

        Ok(RunningGate {
            gate_id,
            http_addr,
            ingest_addr,
            state,
            pool,
            pipeline: Some(pipeline),
            background: std::mem::take(background),
        })
    }
}

impl RunningGate {
    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Runs until `signal` resolves or the pipeline stops by itself, then
    /// shuts down.
    pub async fn run_until<F>(mut self, signal: F) -> Result<(), GateError>
    where
        F: Future<Output = ()>,
    {
        let early_exit = match self.pipeline.as_mut() {
            Some(pipeline) => tokio::select! {
                _ = signal => {
                    info!("Shutdown requested");
                    None
                }
                joined = pipeline => {
                    warn!("Pipeline stopped before shutdown was requested");
                    Some(joined)
                }
            },
            None => None,
        };
        if early_exit.is_some() {
            self.pipeline = None;
        }
        self.shutdown().await?;
        if let Some(joined) = early_exit {
            joined?;
        }
        Ok(())
    }

    /// Closes the queue and the pool, waits for the pipeline to drain and
    /// stops the listeners. Vehicles still waiting for a token are dropped.
    pub async fn shutdown(mut self) -> Result<(), GateError> {
        self.state.queue.close();
        self.pool.close();
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.await?;
        }
        for task in self.background.drain(..) {
            task.abort();
        }
        info!(
            gate = %self.gate_id,
            processed = self.state.stats.cars_processed_count(),
            dropped = self.state.stats.vehicles_dropped(),
            "Gate stopped"
        );
        Ok(())
    }
}

async fn bind(role: &'static str, addr: &str) -> Result<TcpListener, GateError> {
    TcpListener::bind(addr).await.map_err(|source| GateError::Bind {
        role,
        addr: addr.to_string(),
        source,
    })
}

fn build_queue(config: &QueueConfig) -> Result<ArrivalQueue, GateError> {
    let policy = match config.overflow.as_str() {
        "reject_new" => OverflowPolicy::RejectNew,
        "drop_oldest" => OverflowPolicy::DropOldest,
        other => {
            return Err(GateError::Setting(format!(
                "unknown queue overflow policy '{other}'"
            )))
        }
    };
    Ok(match config.capacity {
        Some(capacity) => ArrivalQueue::bounded(capacity, policy),
        None => ArrivalQueue::unbounded(),
    })
}

fn resolve_gate_id(
    config: &ParkgateConfig,
    registered: &RegisterResponse,
    http_addr: SocketAddr,
) -> GateId {
    registered
        .gate_id
        .clone()
        .or_else(|| config.gate.id.clone().map(GateId::new))
        .unwrap_or_else(|| {
            GateId::new(format!(
                "{}:{}",
                config.gate.advertised_host,
                http_addr.port()
            ))
        })
}

fn build_pool(
    strategy: Strategy,
    tokens: Vec<Token>,
    gate_id: &GateId,
    config: &ParkgateConfig,
    registry: Arc<PeerRegistry>,
    metrics: MetricsRecorder,
) -> Result<TokenPool, GateError> {
    info!(?strategy, tokens = tokens.len(), "Building token pool");
    Ok(match strategy {
        Strategy::NoShare => TokenPool::Local(LocalPool::new(tokens)),
        Strategy::Distributed => {
            let lender = HttpPeerLender::new(
                Duration::from_millis(config.peers.borrow_timeout_ms),
                Handle::current(),
            )?;
            TokenPool::Shared(SharedPool::new(
                tokens,
                registry,
                Arc::new(lender),
                SharedPoolOptions {
                    own_id: Some(gate_id.clone()),
                    retry_interval: Duration::from_millis(config.peers.retry_interval_ms),
                },
                metrics,
            ))
        }
    })
}

async fn resync_loop(clock: Arc<SyncClock>, authority: Arc<TcpTimeAuthority>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately; the handshake just happened.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match clock.resync(authority.as_ref()).await {
            Ok(authority_time) => debug!(authority_time, "Clock resynchronised"),
            Err(e) => warn!("Clock resync failed, keeping previous sample: {e}"),
        }
    }
}
