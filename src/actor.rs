//! The identity boundary the engine consumes.
//!
//! Credential verification (passwords, tokens, sessions) lives outside the
//! core. The engine only ever sees a resolved actor: an opaque id plus a
//! role tag. Authorization decisions inside the engine are made against the
//! job's persisted owner/assignee fields, never against anything the caller
//! claims about itself.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::ActorId;

/// Marketplace role of an authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Worker,
}

/// A verified principal: who is calling, and as what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
}

/// Resolves request credentials to a verified actor, or rejects the request.
#[async_trait]
pub trait ActorResolver: Send + Sync {
    async fn resolve(&self, credentials: &str) -> Result<Actor>;
}

/// Fixed token-to-actor map. For tests and single-user dev setups.
#[derive(Debug, Default)]
pub struct StaticResolver {
    actors: HashMap<String, Actor>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, token: impl Into<String>, actor: Actor) -> Self {
        self.actors.insert(token.into(), actor);
        self
    }
}

#[async_trait]
impl ActorResolver for StaticResolver {
    async fn resolve(&self, credentials: &str) -> Result<Actor> {
        self.actors
            .get(credentials)
            .copied()
            .ok_or(Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn static_resolver_resolves_known_tokens() {
        let actor = Actor {
            id: ActorId(Uuid::new_v4()),
            role: Role::Worker,
        };
        let resolver = StaticResolver::new().with_actor("tok-1", actor);

        let resolved = resolver.resolve("tok-1").await.unwrap();
        assert_eq!(resolved, actor);
    }

    #[tokio::test]
    async fn static_resolver_rejects_unknown_tokens() {
        let resolver = StaticResolver::new();
        assert!(matches!(
            resolver.resolve("nope").await,
            Err(Error::Unauthorized)
        ));
    }
}
