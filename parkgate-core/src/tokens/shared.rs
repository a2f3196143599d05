//! ## parkgate-core::tokens::shared
//! **Token pool that borrows from peer gates when exhausted**
//!
//! Dispensing order:
//! 1. Local free set, no network call.
//! 2. Peers from the current registry snapshot, in random order; the first
//!    one that lends wins. A failing peer counts as having nothing to lend.
//! 3. Wait on the local free set for `retry_interval`, then go back to 1.
//!
//! Lending takes from the local free set under the same lock `get_token`
//! uses. Returned tokens always land in the local free set of the gate
//! holding them, so capacity may drift towards busy gates.

use std::sync::Arc;
use std::time::Duration;

use parkgate_telemetry::MetricsRecorder;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use super::local::LocalPool;
use crate::error::{BorrowError, PoolError};
use crate::peers::{GateId, PeerEndpoint, PeerRegistry};
use crate::vehicle::Token;

/// Asks one peer gate for a token.
///
/// The peer removes the token from its free set before its reply is
/// delivered. If the request times out after that point the token is lost
/// to circulation; the caller only sees a `BorrowError::Timeout`.
pub trait PeerLender: Send + Sync {
    /// `Ok(None)` means the peer answered but had nothing free.
    fn borrow(&self, peer: &GateId, endpoint: &PeerEndpoint) -> Result<Option<Token>, BorrowError>;
}

#[derive(Clone, Debug)]
pub struct SharedPoolOptions {
    /// Excluded from borrow attempts.
    pub own_id: Option<GateId>,
    /// How long to wait locally before asking peers again.
    pub retry_interval: Duration,
}

impl Default for SharedPoolOptions {
    fn default() -> Self {
        Self {
            own_id: None,
            retry_interval: Duration::from_millis(500),
        }
    }
}

pub struct SharedPool {
    local: LocalPool,
    registry: Arc<PeerRegistry>,
    lender: Arc<dyn PeerLender>,
    options: SharedPoolOptions,
    metrics: MetricsRecorder,
}

impl SharedPool {
    pub fn new(
        tokens: impl IntoIterator<Item = Token>,
        registry: Arc<PeerRegistry>,
        lender: Arc<dyn PeerLender>,
        options: SharedPoolOptions,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            local: LocalPool::new(tokens),
            registry,
            lender,
            options,
            metrics,
        }
    }

    /// Blocks until a token is available locally or from a peer.
    pub fn get_token(&self) -> Result<Token, PoolError> {
        loop {
            if let Some(token) = self.try_get()? {
                return Ok(token);
            }
            if let Some(token) = self.local.wait_for(self.options.retry_interval)? {
                return Ok(token);
            }
        }
    }

    /// One pass over the local set and every known peer, without waiting.
    pub fn try_get(&self) -> Result<Option<Token>, PoolError> {
        if let Some(token) = self.local.try_get()? {
            return Ok(Some(token));
        }
        Ok(self.borrow_from_peers())
    }

    fn borrow_from_peers(&self) -> Option<Token> {
        let snapshot = self.registry.get();
        let mut peers: Vec<_> = snapshot.others(self.options.own_id.as_ref()).collect();
        peers.shuffle(&mut rand::rng());

        for (peer, endpoint) in peers {
            match self.lender.borrow(peer, endpoint) {
                Ok(Some(token)) => {
                    debug!(%peer, %token, "Borrowed token from peer");
                    self.metrics.tokens_borrowed.inc();
                    return Some(token);
                }
                Ok(None) => debug!(%peer, "Peer has no token to lend"),
                Err(e) => {
                    warn!(%peer, "Borrow attempt failed: {e}");
                    self.metrics.borrow_failures.inc();
                }
            }
        }
        None
    }

    /// Hands a free local token to a peer. Ownership moves with it; no copy
    /// stays behind, so a reply the borrower never receives loses the token.
    pub fn lend(&self) -> Option<Token> {
        let token = self.local.try_get().ok().flatten()?;
        self.metrics.tokens_lent.inc();
        Some(token)
    }

    pub fn add_token(&self, token: Token) {
        self.local.add_token(token);
    }

    pub fn close(&self) {
        self.local.close();
    }

    pub fn free_count(&self) -> usize {
        self.local.free_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peers::PeerMap;
    use crate::tokens::TokenPool;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::thread;
    use tracing_test::traced_test;

    /// Routes borrow calls straight into other in-process pools.
    #[derive(Default)]
    struct InProcessLender {
        pools: Mutex<HashMap<GateId, Arc<TokenPool>>>,
        unreachable: Mutex<Vec<GateId>>,
    }

    impl InProcessLender {
        fn attach(&self, id: &str, pool: Arc<TokenPool>) {
            self.pools.lock().insert(GateId::new(id), pool);
        }
    }

    impl PeerLender for InProcessLender {
        fn borrow(
            &self,
            peer: &GateId,
            _endpoint: &PeerEndpoint,
        ) -> Result<Option<Token>, BorrowError> {
            if self.unreachable.lock().contains(peer) {
                return Err(BorrowError::Unreachable {
                    peer: peer.to_string(),
                    reason: "connection refused".into(),
                });
            }
            let pool = self.pools.lock().get(peer).cloned();
            Ok(pool.and_then(|pool| pool.lend()))
        }
    }

    fn tokens(prefix: &str, n: usize) -> Vec<Token> {
        (0..n).map(|i| Token::new(format!("{prefix}{i}"))).collect()
    }

    fn registry_of(ids: &[&str]) -> Arc<PeerRegistry> {
        let registry = Arc::new(PeerRegistry::new());
        let peers: PeerMap = ids
            .iter()
            .map(|id| (GateId::new(*id), PeerEndpoint::new(format!("http://{id}"))))
            .collect();
        registry.replace(peers);
        registry
    }

    fn shared(
        own: &str,
        seed: Vec<Token>,
        registry: &Arc<PeerRegistry>,
        lender: &Arc<InProcessLender>,
    ) -> Arc<TokenPool> {
        let options = SharedPoolOptions {
            own_id: Some(GateId::new(own)),
            retry_interval: Duration::from_millis(5),
        };
        let lender: Arc<dyn PeerLender> = lender.clone();
        Arc::new(TokenPool::Shared(SharedPool::new(
            seed,
            Arc::clone(registry),
            lender,
            options,
            MetricsRecorder::new().unwrap(),
        )))
    }

    #[test]
    fn local_tokens_are_preferred() {
        let registry = registry_of(&["a", "b"]);
        let lender = Arc::new(InProcessLender::default());
        let a = shared("a", tokens("a", 1), &registry, &lender);
        let b = shared("b", tokens("b", 1), &registry, &lender);
        lender.attach("a", Arc::clone(&a));
        lender.attach("b", Arc::clone(&b));

        assert_eq!(a.get_token().unwrap().as_str(), "a0");
        assert_eq!(b.free_count(), 1);
    }

    #[test]
    fn borrows_from_peer_when_local_is_empty() {
        let registry = registry_of(&["a", "b"]);
        let lender = Arc::new(InProcessLender::default());
        let a = shared("a", Vec::new(), &registry, &lender);
        let b = shared("b", tokens("b", 1), &registry, &lender);
        lender.attach("a", Arc::clone(&a));
        lender.attach("b", Arc::clone(&b));

        assert_eq!(a.get_token().unwrap().as_str(), "b0");
        assert_eq!(b.free_count(), 0);
    }

    #[test]
    fn single_peer_token_goes_to_exactly_one_requester() {
        let registry = registry_of(&["a", "b", "lender"]);
        let lender = Arc::new(InProcessLender::default());
        let a = shared("a", Vec::new(), &registry, &lender);
        let b = shared("b", Vec::new(), &registry, &lender);
        let source = shared("lender", tokens("x", 1), &registry, &lender);
        lender.attach("lender", Arc::clone(&source));
        lender.attach("a", Arc::clone(&a));
        lender.attach("b", Arc::clone(&b));

        let requesters: Vec<_> = [a, b]
            .into_iter()
            .map(|pool| {
                thread::spawn(move || match pool.as_ref() {
                    TokenPool::Shared(shared) => shared.try_get().unwrap(),
                    TokenPool::Local(_) => unreachable!(),
                })
            })
            .collect();
        let granted: Vec<_> = requesters
            .into_iter()
            .filter_map(|r| r.join().unwrap())
            .collect();

        assert_eq!(granted, vec![Token::new("x0")]);
        assert_eq!(source.free_count(), 0);
    }

    #[test]
    fn unreachable_peer_is_skipped() {
        let registry = registry_of(&["a", "down", "up"]);
        let lender = Arc::new(InProcessLender::default());
        lender.unreachable.lock().push(GateId::new("down"));
        let a = shared("a", Vec::new(), &registry, &lender);
        let up = shared("up", tokens("u", 1), &registry, &lender);
        lender.attach("up", Arc::clone(&up));

        assert_eq!(a.get_token().unwrap().as_str(), "u0");
    }

    #[traced_test]
    #[test]
    fn unreachable_peer_is_reported_and_treated_as_empty() {
        let registry = registry_of(&["a", "down"]);
        let lender = Arc::new(InProcessLender::default());
        lender.unreachable.lock().push(GateId::new("down"));
        let pool = SharedPool::new(
            Vec::new(),
            Arc::clone(&registry),
            lender,
            SharedPoolOptions {
                own_id: Some(GateId::new("a")),
                retry_interval: Duration::from_millis(5),
            },
            MetricsRecorder::new().unwrap(),
        );

        assert_eq!(pool.try_get(), Ok(None));
        assert_eq!(pool.metrics.borrow_failures.get(), 1);
        assert!(logs_contain("Borrow attempt failed"));
    }

    #[test]
    fn blocked_caller_wakes_on_local_return() {
        let registry = registry_of(&["a"]);
        let lender = Arc::new(InProcessLender::default());
        let a = shared("a", Vec::new(), &registry, &lender);

        let waiter = {
            let a = Arc::clone(&a);
            thread::spawn(move || a.get_token())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        a.add_token(Token::new("returned"));
        assert_eq!(waiter.join().unwrap().unwrap().as_str(), "returned");
    }

    #[test]
    fn blocked_caller_picks_up_token_freed_at_peer() {
        let registry = registry_of(&["a", "b"]);
        let lender = Arc::new(InProcessLender::default());
        let a = shared("a", Vec::new(), &registry, &lender);
        let b = shared("b", Vec::new(), &registry, &lender);
        lender.attach("b", Arc::clone(&b));

        let waiter = {
            let a = Arc::clone(&a);
            thread::spawn(move || a.get_token())
        };
        thread::sleep(Duration::from_millis(20));
        b.add_token(Token::new("late"));

        assert_eq!(waiter.join().unwrap().unwrap().as_str(), "late");
        assert_eq!(b.free_count(), 0);
    }

    #[test]
    fn global_total_is_conserved_across_cooperating_pools() {
        let ids = ["a", "b", "c"];
        let registry = registry_of(&ids);
        let lender = Arc::new(InProcessLender::default());
        let pools: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let pool = shared(id, tokens(id, i * 2), &registry, &lender);
                lender.attach(id, Arc::clone(&pool));
                pool
            })
            .collect();
        let total = 2 + 4;

        let workers: Vec<_> = pools
            .iter()
            .cloned()
            .map(|pool| {
                thread::spawn(move || {
                    for _ in 0..100 {
                        let token = pool.get_token().unwrap();
                        thread::yield_now();
                        pool.add_token(token);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let free: usize = pools.iter().map(|p| p.free_count()).sum();
        assert_eq!(free, total);
    }
}
