//! # parkgate-core
//!
//! Everything a single parking gate needs to admit vehicles, independent
//! of the network:
//!
//! - `time`: virtual clock (`ManualClock`, authority-synced `SyncClock`)
//! - `queue`: arrival hand-off between ingest and the pipeline
//! - `tokens`: local and peer-shared token pools
//! - `peers`: peer registry backing the shared pool
//! - `pipeline`: dequeue, admission decision, token, transfer, forward
//!
//! External collaborators (time authority, peer gates, parking space) are
//! traits implemented by `parkgate-engine`.

pub mod error;
pub mod peers;
pub mod pipeline;
pub mod queue;
pub mod stats;
pub mod time;
pub mod tokens;
pub mod vehicle;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::peers::{GateId, PeerEndpoint, PeerMap, PeerRegistry, PeerSnapshot};
    pub use crate::pipeline::{Downstream, Outcome, Pipeline};
    pub use crate::queue::{ArrivalQueue, OverflowPolicy};
    pub use crate::stats::{GateStats, StatsSnapshot};
    pub use crate::time::{Clock, ManualClock, SyncClock, TimeAuthority};
    pub use crate::tokens::{
        LocalPool, PeerLender, SharedPool, SharedPoolOptions, Strategy, TokenPool,
    };
    pub use crate::vehicle::{Arrival, Time, Token, Vehicle, VehicleWithToken};
}
