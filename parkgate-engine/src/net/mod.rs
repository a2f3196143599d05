pub mod clients;
pub mod http;
pub mod ingest;
pub mod time_sync;

pub use clients::{CoordinatorClient, HttpDownstream, HttpPeerLender};
pub use http::GateState;
pub use time_sync::TcpTimeAuthority;
