//! Service gateway: the sign-up / post / like capability the engine drives.
//!
//! Two implementations exist: [`HttpGateway`] talks to the real service and
//! [`InMemoryGateway`] keeps everything in memory for offline runs. The engine
//! only sees the [`ServiceGateway`] trait; [`create_gateway`] picks one once at
//! startup.

mod fake;
mod http;

pub use fake::{FaultConfig, FaultInjector, InMemoryGateway};
pub use http::HttpGateway;

use crate::config::{Config, ConfigError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque user identifier assigned by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Opaque post identifier assigned by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failures of gateway calls.
///
/// A like refused by a business rule is not an error; see [`ServiceGateway::like`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Registration of '{name}' failed: {reason}")]
    Registration { name: String, reason: String },
    #[error("Publishing for user {user} failed: {reason}")]
    Publish { user: UserId, reason: String },
    #[error("Like of post {post} by user {user} failed: {reason}")]
    Like {
        user: UserId,
        post: PostId,
        reason: String,
    },
}

/// Capability consumed by the simulation engine
#[async_trait]
pub trait ServiceGateway: Send + Sync {
    /// Create a user and return its id
    async fn register(&self, display_name: &str) -> Result<UserId, GatewayError>;

    /// Create a post on behalf of `user`
    async fn publish(&self, user: &UserId, content: &str) -> Result<PostId, GatewayError>;

    /// Like `post` on behalf of `user`.
    ///
    /// Returns `Ok(false)` when the service refuses the like by rule (already
    /// liked, own post, server-side cap). `Err` is reserved for transport and
    /// protocol failures.
    async fn like(&self, user: &UserId, post: &PostId) -> Result<bool, GatewayError>;

    /// Get a name for this gateway (for logging/debugging)
    fn name(&self) -> &str;
}

/// Select the gateway implementation for this run
pub fn create_gateway(
    config: &Config,
    seed: u64,
) -> Result<Arc<dyn ServiceGateway>, ConfigError> {
    if config.settings.offline_mode {
        let injector = FaultInjector::new(config.fault_config(), seed.wrapping_add(1));
        Ok(Arc::new(InMemoryGateway::new().with_faults(injector)))
    } else {
        let gateway = HttpGateway::new(
            &config.settings.base_url,
            &config.settings.password,
            &config.settings.email,
            config.request_timeout(),
        )?;
        Ok(Arc::new(gateway))
    }
}
