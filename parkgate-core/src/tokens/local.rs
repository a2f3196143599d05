//! ## parkgate-core::tokens::local
//! **Fixed pool of reusable permits**
//!
//! Behaves like a counting semaphore over a multiset of token identifiers:
//! `get_token` blocks until a token is free, `add_token` returns one and
//! wakes a waiter. Every mutation of the free set happens under one mutex,
//! so a token is never handed to two callers at once.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::PoolError;
use crate::vehicle::Token;

struct FreeSet {
    tokens: VecDeque<Token>,
    closed: bool,
}

pub struct LocalPool {
    free: Mutex<FreeSet>,
    available: Condvar,
}

impl LocalPool {
    /// Seeds the pool with the tokens assigned at registration.
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        let tokens: VecDeque<Token> = tokens.into_iter().collect();
        Self {
            free: Mutex::new(FreeSet {
                tokens,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Blocks until a token is free, then removes and returns it.
    pub fn get_token(&self) -> Result<Token, PoolError> {
        let mut free = self.free.lock();
        loop {
            if free.closed {
                return Err(PoolError::Interrupted);
            }
            if let Some(token) = free.tokens.pop_front() {
                return Ok(token);
            }
            self.available.wait(&mut free);
        }
    }

    /// Non-blocking take. `Ok(None)` when nothing is free.
    pub fn try_get(&self) -> Result<Option<Token>, PoolError> {
        let mut free = self.free.lock();
        if free.closed {
            return Err(PoolError::Interrupted);
        }
        Ok(free.tokens.pop_front())
    }

    /// Waits at most `timeout` for a token.
    pub fn wait_for(&self, timeout: Duration) -> Result<Option<Token>, PoolError> {
        let deadline = Instant::now() + timeout;
        let mut free = self.free.lock();
        loop {
            if free.closed {
                return Err(PoolError::Interrupted);
            }
            if let Some(token) = free.tokens.pop_front() {
                return Ok(Some(token));
            }
            if self.available.wait_until(&mut free, deadline).timed_out() {
                return Ok(free.tokens.pop_front());
            }
        }
    }

    /// Returns `token` to the free set and wakes one waiter.
    ///
    /// Double returns are not detected; callers own that invariant.
    pub fn add_token(&self, token: Token) {
        self.free.lock().tokens.push_back(token);
        self.available.notify_one();
    }

    /// Interrupts every blocked `get_token`.
    pub fn close(&self) {
        self.free.lock().closed = true;
        self.available.notify_all();
    }

    pub fn free_count(&self) -> usize {
        self.free.lock().tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn tokens(n: usize) -> Vec<Token> {
        (0..n).map(|i| Token::new(format!("t{i}"))).collect()
    }

    #[test]
    fn second_caller_blocks_until_token_returned() {
        let pool = Arc::new(LocalPool::new([Token::new("A")]));
        let first = pool.get_token().unwrap();
        assert_eq!(first.as_str(), "A");

        let second = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.get_token())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!second.is_finished());

        pool.add_token(first);
        assert_eq!(second.join().unwrap().unwrap().as_str(), "A");
    }

    #[test]
    fn close_interrupts_waiters() {
        let pool = Arc::new(LocalPool::new(Vec::new()));
        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.get_token())
        };
        thread::sleep(Duration::from_millis(10));
        pool.close();
        assert_eq!(waiter.join().unwrap(), Err(PoolError::Interrupted));
    }

    #[test]
    fn wait_for_times_out_when_empty() {
        let pool = LocalPool::new(Vec::new());
        assert_eq!(pool.wait_for(Duration::from_millis(5)), Ok(None));
    }

    #[test]
    fn concurrent_callers_never_share_a_token() {
        let pool = Arc::new(LocalPool::new(tokens(4)));
        let held = Arc::new(PlMutex::new(HashSet::new()));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let held = Arc::clone(&held);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let token = pool.get_token().unwrap();
                        assert!(held.lock().insert(token.clone()), "double dispense of {token}");
                        thread::yield_now();
                        held.lock().remove(&token);
                        pool.add_token(token);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(pool.free_count(), 4);
    }

    proptest! {
        #[test]
        fn tokens_in_circulation_are_conserved(
            allotment in 0usize..16,
            ops in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let pool = LocalPool::new(tokens(allotment));
            let mut held = Vec::new();

            for take in ops {
                if take {
                    if let Some(token) = pool.try_get().unwrap() {
                        held.push(token);
                    }
                } else if let Some(token) = held.pop() {
                    pool.add_token(token);
                }
                prop_assert_eq!(pool.free_count() + held.len(), allotment);
            }
        }
    }
}
