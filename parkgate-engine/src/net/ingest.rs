//! Vehicle stream listener.
//!
//! Each connection carries length-delimited frames, one JSON `Vehicle` per
//! frame. A bad frame or end of stream ends that connection only.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{FramedRead, LengthDelimitedCodec};
use tracing::{debug, info, warn};

use parkgate_core::prelude::{Arrival, ArrivalQueue, Clock, QueueError, Vehicle};

use crate::protocol::decode_frame;

/// Outcome of handing one vehicle to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Queued,
    /// Accepted, at the cost of the oldest waiting arrival.
    QueuedEvicting(Arrival),
    Rejected(QueueError),
    /// Dropped because no arrival time could be read.
    NoClock,
}

/// Stamps `vehicle` with the current virtual time and enqueues it.
pub fn admit(clock: &dyn Clock, queue: &ArrivalQueue, vehicle: Vehicle) -> Admission {
    let arrival_time = match clock.now() {
        Ok(now) => now,
        Err(e) => {
            warn!("Unable to stamp {vehicle}, dropping it: {e}");
            return Admission::NoClock;
        }
    };
    info!("(__Traffic__ -> Gate) {vehicle} arrived at {arrival_time}");

    match queue.enqueue(Arrival {
        vehicle,
        arrival_time,
    }) {
        Ok(None) => Admission::Queued,
        Ok(Some(evicted)) => {
            warn!("Queue full, evicted {}", evicted.vehicle);
            Admission::QueuedEvicting(evicted)
        }
        Err(e) => {
            warn!("Rejected {vehicle}: {e}");
            Admission::Rejected(e)
        }
    }
}

/// Accepts vehicle streams until the listener fails.
pub async fn serve(
    listener: TcpListener,
    clock: Arc<dyn Clock>,
    queue: Arc<ArrivalQueue>,
) -> std::io::Result<()> {
    info!("Ingest listening on {}", listener.local_addr()?);
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Accept failed: {e}");
                continue;
            }
        };
        tokio::spawn(handle_connection(
            stream,
            peer,
            Arc::clone(&clock),
            Arc::clone(&queue),
        ));
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    clock: Arc<dyn Clock>,
    queue: Arc<ArrivalQueue>,
) {
    debug!(%peer, "Vehicle stream opened");
    let mut frames = FramedRead::new(stream, LengthDelimitedCodec::new());

    while let Some(frame) = frames.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%peer, "Vehicle stream broken: {e}");
                break;
            }
        };
        let vehicle: Vehicle = match decode_frame(&frame) {
            Ok(vehicle) => vehicle,
            Err(e) => {
                warn!(%peer, "Malformed vehicle frame, closing stream: {e}");
                break;
            }
        };
        if let Admission::Rejected(QueueError::Closed) = admit(clock.as_ref(), &queue, vehicle) {
            break;
        }
    }

    debug!(%peer, "Vehicle stream closed");
}
