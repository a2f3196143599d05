//! ## parkgate-core::peers
//! **Mapping from peer gate identity to reachable address**
//!
//! The coordinator pushes the whole topology at once; the registry swaps in
//! a new immutable snapshot under a single lock. Readers clone an `Arc` and
//! never observe a half-updated map. No liveness probing happens here:
//! unreachable peers surface lazily when a borrow fails.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateId(String);

impl GateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base URL of a peer's control surface, e.g. `http://10.0.0.4:8081`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerEndpoint(String);

impl PeerEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins `path` onto the endpoint without doubling the slash.
    pub fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.0.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Display for PeerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type PeerMap = BTreeMap<GateId, PeerEndpoint>;

/// One immutable view of the topology.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub version: u64,
    pub peers: PeerMap,
}

impl PeerSnapshot {
    /// Peers other than `own_id`.
    pub fn others<'a>(
        &'a self,
        own_id: Option<&'a GateId>,
    ) -> impl Iterator<Item = (&'a GateId, &'a PeerEndpoint)> + 'a {
        self.peers
            .iter()
            .filter(move |(id, _)| Some(*id) != own_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct PeerRegistry {
    current: Mutex<Arc<PeerSnapshot>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self) -> Arc<PeerSnapshot> {
        Arc::clone(&self.current.lock())
    }

    /// Replaces the whole mapping and returns the new version.
    pub fn replace(&self, peers: PeerMap) -> u64 {
        let mut current = self.current.lock();
        let version = current.version + 1;
        *current = Arc::new(PeerSnapshot { version, peers });
        version
    }
}
