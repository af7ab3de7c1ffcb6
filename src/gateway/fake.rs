// In-Memory Gateway Module
// Deterministic stand-in for the social service, with optional fault injection.

use super::{GatewayError, PostId, ServiceGateway, UserId};
use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Configuration for fault injection
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Probability that a sign-up fails (0.0-1.0)
    pub registration_failure_rate: f64,
    /// Probability that a post fails (0.0-1.0)
    pub publish_failure_rate: f64,
    /// Probability that a like fails in transport (0.0-1.0)
    pub like_failure_rate: f64,
}

impl FaultConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern methods
    pub fn with_registration_failure_rate(mut self, rate: f64) -> Self {
        self.registration_failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_publish_failure_rate(mut self, rate: f64) -> Self {
        self.publish_failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_like_failure_rate(mut self, rate: f64) -> Self {
        self.like_failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Whether any fault can be injected
    pub fn is_enabled(&self) -> bool {
        self.registration_failure_rate > 0.0
            || self.publish_failure_rate > 0.0
            || self.like_failure_rate > 0.0
    }
}

/// Decides whether a gateway call fails, from its own seeded random source
pub struct FaultInjector {
    config: FaultConfig,
    rng: Mutex<ChaCha8Rng>,
}

impl FaultInjector {
    pub fn new(config: FaultConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// An injector that never fails anything
    pub fn disabled() -> Self {
        Self::new(FaultConfig::default(), 0)
    }

    pub fn registration_fails(&self) -> bool {
        self.roll(self.config.registration_failure_rate)
    }

    pub fn publish_fails(&self) -> bool {
        self.roll(self.config.publish_failure_rate)
    }

    pub fn like_fails(&self) -> bool {
        self.roll(self.config.like_failure_rate)
    }

    /// Get the underlying config
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    fn roll(&self, rate: f64) -> bool {
        if rate.is_nan() || rate <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_bool(rate.min(1.0))
    }
}

#[derive(Debug, Default)]
struct ServiceState {
    users_by_name: HashMap<String, UserId>,
    authors: HashMap<PostId, UserId>,
    likes: HashSet<(UserId, PostId)>,
    likes_given: HashMap<UserId, usize>,
    next_user_id: u64,
    next_post_id: u64,
    attempted_names: Vec<String>,
    forced_registration_failures: usize,
}

/// Offline implementation of [`ServiceGateway`].
///
/// Enforces the same rules as the service: unique usernames, no self-likes,
/// one like per user and post, and an optional per-user like cap.
pub struct InMemoryGateway {
    state: Mutex<ServiceState>,
    like_cap: Option<usize>,
    faults: FaultInjector,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServiceState {
                next_user_id: 1,
                next_post_id: 1,
                ..ServiceState::default()
            }),
            like_cap: None,
            faults: FaultInjector::disabled(),
        }
    }

    pub fn with_faults(mut self, faults: FaultInjector) -> Self {
        self.faults = faults;
        self
    }

    /// Reject likes once a user has given `cap` likes
    pub fn with_like_cap(mut self, cap: usize) -> Self {
        self.like_cap = Some(cap);
        self
    }

    /// Fail the next `count` sign-ups regardless of the name
    pub fn fail_next_registrations(self, count: usize) -> Self {
        self.state().forced_registration_failures = count;
        self
    }

    /// Mark `name` as taken by a user created outside the simulation
    pub fn reserve_name(&self, name: &str) {
        let mut state = self.state();
        let id = UserId(format!("user-{}", state.next_user_id));
        state.next_user_id += 1;
        state.users_by_name.insert(name.to_string(), id);
    }

    /// Every name passed to `register`, in call order
    pub fn attempted_names(&self) -> Vec<String> {
        self.state().attempted_names.clone()
    }

    pub fn user_count(&self) -> usize {
        self.state().users_by_name.len()
    }

    pub fn post_count(&self) -> usize {
        self.state().authors.len()
    }

    pub fn total_likes(&self) -> usize {
        self.state().likes.len()
    }

    /// Number of likes recorded on `post`
    pub fn likes_on(&self, post: &PostId) -> usize {
        self.state().likes.iter().filter(|(_, p)| p == post).count()
    }

    /// Author of `post`, if it exists
    pub fn author_of(&self, post: &PostId) -> Option<UserId> {
        self.state().authors.get(post).cloned()
    }

    /// All recorded (liker, post) pairs
    pub fn like_edges(&self) -> Vec<(UserId, PostId)> {
        self.state().likes.iter().cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceGateway for InMemoryGateway {
    async fn register(&self, display_name: &str) -> Result<UserId, GatewayError> {
        let mut state = self.state();
        state.attempted_names.push(display_name.to_string());

        let failure = |reason: &str| GatewayError::Registration {
            name: display_name.to_string(),
            reason: reason.to_string(),
        };

        if state.forced_registration_failures > 0 {
            state.forced_registration_failures -= 1;
            return Err(failure("service unavailable"));
        }
        if self.faults.registration_fails() {
            return Err(failure("injected failure"));
        }
        if state.users_by_name.contains_key(display_name) {
            return Err(failure("username already taken"));
        }

        let id = UserId(format!("user-{}", state.next_user_id));
        state.next_user_id += 1;
        state
            .users_by_name
            .insert(display_name.to_string(), id.clone());
        Ok(id)
    }

    async fn publish(&self, user: &UserId, _content: &str) -> Result<PostId, GatewayError> {
        let mut state = self.state();
        let failure = |reason: &str| GatewayError::Publish {
            user: user.clone(),
            reason: reason.to_string(),
        };

        if !state.users_by_name.values().any(|id| id == user) {
            return Err(failure("unknown user"));
        }
        if self.faults.publish_fails() {
            return Err(failure("injected failure"));
        }

        let id = PostId(state.next_post_id.to_string());
        state.next_post_id += 1;
        state.authors.insert(id.clone(), user.clone());
        Ok(id)
    }

    async fn like(&self, user: &UserId, post: &PostId) -> Result<bool, GatewayError> {
        let mut state = self.state();
        let failure = |reason: &str| GatewayError::Like {
            user: user.clone(),
            post: post.clone(),
            reason: reason.to_string(),
        };

        if self.faults.like_fails() {
            return Err(failure("injected failure"));
        }
        let author = match state.authors.get(post) {
            Some(author) => author,
            None => return Err(failure("unknown post")),
        };

        if author == user {
            return Ok(false);
        }
        let edge = (user.clone(), post.clone());
        if state.likes.contains(&edge) {
            return Ok(false);
        }
        let given = state.likes_given.get(user).copied().unwrap_or(0);
        if self.like_cap.is_some_and(|cap| given >= cap) {
            return Ok(false);
        }

        state.likes.insert(edge);
        *state.likes_given.entry(user.clone()).or_insert(0) += 1;
        Ok(true)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
