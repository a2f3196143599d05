//! Wire messages exchanged with the coordinator, peer gates, the parking
//! space and the time authority.
//!
//! HTTP bodies are JSON. The vehicle stream and the time-sync exchange use
//! length-delimited frames, each holding one JSON document.

use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use parkgate_core::prelude::{GateId, PeerMap, StatsSnapshot, Strategy, Time, Token};

pub const STATS_PATH: &str = "/stats";
pub const PEERS_PATH: &str = "/peers";
pub const BORROW_PATH: &str = "/tokens/borrow";
pub const CAR_LEAVING_PATH: &str = "/cars/leaving";
pub const METRICS_PATH: &str = "/metrics";

/// Gate -> coordinator, once at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub hostname: String,
    pub ingest_port: u16,
    pub http_port: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Identity assigned by the coordinator, if it assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_id: Option<GateId>,
    pub tokens: Vec<Token>,
    pub strategy: Strategy,
    pub parking_space_url: String,
}

/// Coordinator -> gate, full replacement of the peer mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyPush {
    pub peers: PeerMap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyAck {
    pub version: u64,
}

/// Answer to a peer borrow request. `None` means nothing to lend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowResponse {
    pub token: Option<Token>,
}

/// Monitoring surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub queue_len: usize,
    /// `None` until registration has installed the pool.
    pub free_tokens: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRequest {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeResponse {
    pub current_timestamp: Time,
}

/// Serialises `value` into the body of one length-delimited frame.
pub fn encode_frame<T: Serialize>(value: &T) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(value).map(Bytes::from)
}

pub fn decode_frame<T: DeserializeOwned>(frame: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkgate_core::prelude::PeerEndpoint;

    #[test]
    fn register_response_without_gate_id() {
        let json = r#"{
            "tokens": ["t1", "t2"],
            "strategy": "distributed",
            "parking_space_url": "http://space:9000/cars"
        }"#;
        let response: RegisterResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.gate_id, None);
        assert_eq!(response.tokens, vec![Token::new("t1"), Token::new("t2")]);
        assert_eq!(response.strategy, Strategy::Distributed);
    }

    #[test]
    fn topology_push_is_a_plain_map() {
        let json = r#"{"peers": {"north": "http://north:7001"}}"#;
        let push: TopologyPush = serde_json::from_str(json).unwrap();
        assert_eq!(
            push.peers.get(&GateId::new("north")),
            Some(&PeerEndpoint::new("http://north:7001"))
        );
    }

    #[test]
    fn stats_response_flattens_counters() {
        let response = StatsResponse {
            stats: StatsSnapshot {
                total_waiting_time: 12,
                cars_processed_count: 3,
                vehicles_dropped: 0,
            },
            queue_len: 1,
            free_tokens: Some(4),
        };
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["total_waiting_time"], 12);
        assert_eq!(value["cars_processed_count"], 3);
        assert_eq!(value["free_tokens"], 4);
    }

    #[test]
    fn empty_borrow_response_is_null_token() {
        let frame = encode_frame(&BorrowResponse::default()).unwrap();
        assert_eq!(&frame[..], br#"{"token":null}"#);
        let decoded: BorrowResponse = decode_frame(&frame).unwrap();
        assert_eq!(decoded.token, None);
    }
}
