//! ## parkgate-core::tokens
//! **Token distribution**
//!
//! The distribution strategy is picked once, from the registration
//! response, and fixed for the lifetime of the gate.
//!
//! - `local/`: fixed pool, no sharing between gates
//! - `shared/`: borrows from and lends to peer gates

pub mod local;
pub mod shared;

pub use local::LocalPool;
pub use shared::{PeerLender, SharedPool, SharedPoolOptions};

use serde::{Deserialize, Serialize};

use crate::error::PoolError;
use crate::vehicle::Token;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    NoShare,
    Distributed,
}

pub enum TokenPool {
    Local(LocalPool),
    Shared(SharedPool),
}

impl TokenPool {
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Local(_) => Strategy::NoShare,
            Self::Shared(_) => Strategy::Distributed,
        }
    }

    /// Blocks until a token can be dispensed.
    pub fn get_token(&self) -> Result<Token, PoolError> {
        match self {
            Self::Local(pool) => pool.get_token(),
            Self::Shared(pool) => pool.get_token(),
        }
    }

    pub fn add_token(&self, token: Token) {
        match self {
            Self::Local(pool) => pool.add_token(token),
            Self::Shared(pool) => pool.add_token(token),
        }
    }

    /// Answers a peer's borrow request. Local pools never lend.
    pub fn lend(&self) -> Option<Token> {
        match self {
            Self::Local(_) => None,
            Self::Shared(pool) => pool.lend(),
        }
    }

    pub fn free_count(&self) -> usize {
        match self {
            Self::Local(pool) => pool.free_count(),
            Self::Shared(pool) => pool.free_count(),
        }
    }

    pub fn close(&self) {
        match self {
            Self::Local(pool) => pool.close(),
            Self::Shared(pool) => pool.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_pool_refuses_to_lend() {
        let pool = TokenPool::Local(LocalPool::new([Token::new("A")]));
        assert_eq!(pool.lend(), None);
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.strategy(), Strategy::NoShare);
    }

    #[test]
    fn strategy_wire_names() {
        assert_eq!(
            serde_json::to_string(&Strategy::Distributed).unwrap(),
            r#""distributed""#
        );
        let parsed: Strategy = serde_json::from_str(r#""no_share""#).unwrap();
        assert_eq!(parsed, Strategy::NoShare);
    }
}
