//! Outbound HTTP: coordinator registration, peer borrow requests and
//! forwarding to the parking space.
//!
//! `HttpPeerLender` and `HttpDownstream` are called from the blocking
//! pipeline thread and drive their requests with `Handle::block_on`. They
//! must not be called from inside an async task.

use std::time::Duration;

use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, info};

use parkgate_core::prelude::{
    BorrowError, Downstream, ForwardError, GateId, PeerEndpoint, PeerLender, Token,
    VehicleWithToken,
};

use crate::error::GateError;
use crate::protocol::{BorrowResponse, RegisterRequest, RegisterResponse, BORROW_PATH};

fn client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

pub struct CoordinatorClient {
    client: Client,
    register_url: String,
}

impl CoordinatorClient {
    pub fn new(register_url: impl Into<String>, timeout: Duration) -> Result<Self, GateError> {
        Ok(Self {
            client: client(timeout).map_err(|e| GateError::Registration(e.to_string()))?,
            register_url: register_url.into(),
        })
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, GateError> {
        let failed = |reason: String| GateError::Registration(format!("{}: {reason}", self.register_url));

        let response = self
            .client
            .post(&self.register_url)
            .json(request)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("coordinator answered {status}")));
        }
        let registered: RegisterResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("unexpected registration reply: {e}")))?;
        if !registered.parking_space_url.starts_with("http://") {
            return Err(failed(format!(
                "parking space URL '{}' is not plain http",
                registered.parking_space_url
            )));
        }

        info!(
            tokens = registered.tokens.len(),
            strategy = ?registered.strategy,
            "Registered with coordinator"
        );
        Ok(registered)
    }
}

pub struct HttpPeerLender {
    client: Client,
    runtime: Handle,
}

impl HttpPeerLender {
    pub fn new(timeout: Duration, runtime: Handle) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: client(timeout)?,
            runtime,
        })
    }
}

impl PeerLender for HttpPeerLender {
    fn borrow(&self, peer: &GateId, endpoint: &PeerEndpoint) -> Result<Option<Token>, BorrowError> {
        let url = endpoint.join(BORROW_PATH);
        debug!(%peer, %url, "Asking peer for a token");

        self.runtime.block_on(async {
            let response = self.client.post(&url).send().await.map_err(|e| {
                if e.is_timeout() {
                    BorrowError::Timeout {
                        peer: peer.to_string(),
                    }
                } else {
                    BorrowError::Unreachable {
                        peer: peer.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;
            let status = response.status();
            if !status.is_success() {
                return Err(BorrowError::InvalidResponse {
                    peer: peer.to_string(),
                    reason: format!("status {status}"),
                });
            }
            let body: BorrowResponse =
                response
                    .json()
                    .await
                    .map_err(|e| BorrowError::InvalidResponse {
                        peer: peer.to_string(),
                        reason: e.to_string(),
                    })?;
            Ok(body.token)
        })
    }
}

/// Forwards admitted vehicles to the parking space.
pub struct HttpDownstream {
    client: Client,
    runtime: Handle,
    url: String,
}

impl HttpDownstream {
    pub fn new(url: impl Into<String>, timeout: Duration, runtime: Handle) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: client(timeout)?,
            runtime,
            url: url.into(),
        })
    }
}

impl Downstream for HttpDownstream {
    fn forward(&self, vehicle: &VehicleWithToken) -> Result<(), ForwardError> {
        self.runtime.block_on(async {
            let response = self
                .client
                .post(&self.url)
                .json(vehicle)
                .send()
                .await
                .map_err(|e| ForwardError::Unreachable(format!("{}: {e}", self.url)))?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(ForwardError::Rejected(format!("{} answered {status}", self.url)))
            }
        })
    }
}
