//! Time authority client.
//!
//! One request per connection: the gate sends a `TimeRequest` frame and
//! reads back a single `TimeResponse` frame.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use parkgate_core::prelude::{ClockError, Time, TimeAuthority};

use crate::protocol::{decode_frame, encode_frame, TimeRequest, TimeResponse};

#[derive(Debug, Clone)]
pub struct TcpTimeAuthority {
    addr: String,
    timeout: Duration,
}

impl TcpTimeAuthority {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn exchange(&self) -> Result<Time, ClockError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| ClockError::Unavailable(format!("{}: {e}", self.addr)))?;
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

        let request =
            encode_frame(&TimeRequest {}).map_err(|e| ClockError::Malformed(e.to_string()))?;
        framed
            .send(request)
            .await
            .map_err(|e| ClockError::Unavailable(format!("{}: {e}", self.addr)))?;

        let frame = framed
            .next()
            .await
            .ok_or_else(|| {
                ClockError::Unavailable(format!("{} closed the connection", self.addr))
            })?
            .map_err(|e| ClockError::Unavailable(format!("{}: {e}", self.addr)))?;

        let response: TimeResponse =
            decode_frame(&frame).map_err(|e| ClockError::Malformed(e.to_string()))?;
        Ok(response.current_timestamp)
    }
}

#[async_trait]
impl TimeAuthority for TcpTimeAuthority {
    async fn current_time(&self) -> Result<Time, ClockError> {
        match tokio::time::timeout(self.timeout, self.exchange()).await {
            Ok(result) => result,
            Err(_) => Err(ClockError::Unavailable(format!(
                "{} did not answer within {:?}",
                self.addr, self.timeout
            ))),
        }
    }
}
