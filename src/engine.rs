//! Simulation engine.
//!
//! Drives a run through three strictly ordered phases:
//!
//! 1. **Bootstrap** – sign up `user_count` users with generated names.
//! 2. **Seeding** – every user publishes a random number of posts.
//! 3. **Liking** – users take turns liking other users' posts until no
//!    further like is possible.
//!
//! Users and posts live in arenas (`Vec`) and refer to each other by index.
//! All randomness comes from one seeded [`ChaCha8Rng`], so a run is
//! reproducible given the seed and a deterministic gateway.

use crate::config::{Config, ConfigError, SimulationConfig};
use crate::content::{create_content_provider, ContentProvider};
use crate::gateway::{create_gateway, GatewayError, PostId, ServiceGateway, UserId};
use crate::identity::{IdentityError, IdentityGenerator};
use crate::report::{FailureRecord, Phase, PostReport, RunOutcome, RunSummary, UserReport};
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Failed like attempts by one user on one post before the post is dropped
/// from that user's candidates
pub const MAX_LIKE_ATTEMPTS: usize = 3;

/// Fatal errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    GenerationExhausted(#[from] IdentityError),
    #[error("{0} (after retry)")]
    Registration(GatewayError),
}

impl SimulationError {
    /// Phase in which the error stops the run. Configuration errors happen
    /// before any gateway call; seeding and liking only record failures.
    pub fn phase(&self) -> Phase {
        match self {
            SimulationError::Config(_) => Phase::Setup,
            SimulationError::GenerationExhausted(_) | SimulationError::Registration(_) => {
                Phase::Bootstrap
            }
        }
    }
}

/// A registered synthetic user
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    /// Indices into the post arena
    pub posts: Vec<usize>,
    pub likes_given: usize,
}

/// A published post
#[derive(Debug, Clone)]
pub struct Post {
    pub id: PostId,
    /// Index into the user arena
    pub author: usize,
    pub content: String,
    pub likes_received: usize,
}

/// Outcome of one pass of the like phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikePhaseReport {
    pub rounds: usize,
    pub attempts: usize,
    pub likes: usize,
    pub rejections: usize,
    pub failures: usize,
}

/// The simulation engine
pub struct Simulation {
    config: SimulationConfig,
    gateway: Arc<dyn ServiceGateway>,
    content: Box<dyn ContentProvider>,
    identities: IdentityGenerator,
    seed: u64,
    rng: ChaCha8Rng,
    /// Every user publishes exactly this many posts when set
    fixed_post_count: Option<usize>,
    users: Vec<User>,
    posts: Vec<Post>,
    /// (user index, post index) pairs of successful likes
    liked: HashSet<(usize, usize)>,
    failures: Vec<FailureRecord>,
    rounds: usize,
    step: usize,
}

impl Simulation {
    pub fn new(
        config: SimulationConfig,
        gateway: Arc<dyn ServiceGateway>,
        content: Box<dyn ContentProvider>,
        seed: u64,
    ) -> Self {
        Self {
            config,
            gateway,
            content,
            identities: IdentityGenerator::new(),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            fixed_post_count: None,
            users: Vec::new(),
            posts: Vec::new(),
            liked: HashSet::new(),
            failures: Vec::new(),
            rounds: 0,
            step: 1,
        }
    }

    /// Assemble a simulation from a settings file: validates the limits,
    /// loads the dictionary and selects the gateway.
    pub fn from_config(config: &Config) -> Result<Self, SimulationError> {
        let limits = config.simulation_config()?;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let content = create_content_provider(config.content.dictionary.as_deref())?;
        let gateway = create_gateway(config, seed)?;
        Ok(Self::new(limits, gateway, content, seed))
    }

    pub fn with_identity_generator(mut self, identities: IdentityGenerator) -> Self {
        self.identities = identities;
        self
    }

    /// Have every user publish exactly `count` posts instead of a random number
    pub fn with_fixed_post_count(mut self, count: usize) -> Self {
        self.fixed_post_count = Some(count);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn has_liked(&self, user: usize, post: usize) -> bool {
        self.liked.contains(&(user, post))
    }

    /// Run all phases and summarize. Never fails: fatal errors end up in the
    /// summary's outcome together with everything done before them.
    pub async fn run(&mut self) -> RunSummary {
        let started_at = Utc::now();
        info!(
            seed = self.seed,
            gateway = self.gateway.name(),
            content = self.content.name(),
            users = self.config.user_count,
            max_posts = self.config.max_posts_per_user,
            max_likes = self.config.max_likes_per_user,
            "Starting simulation"
        );

        let outcome = match self.bootstrap().await {
            Ok(()) => {
                self.seed_content().await;
                self.assign_likes().await;
                RunOutcome::Exhausted
            }
            Err(e) => {
                error!(error = %e, "Run aborted");
                RunOutcome::Aborted {
                    phase: e.phase(),
                    cause: e.to_string(),
                }
            }
        };

        self.summary(started_at, outcome)
    }

    /// Sign up the declared population
    pub async fn bootstrap(&mut self) -> Result<(), SimulationError> {
        self.print_step(format!("Sign up {} users", self.config.user_count));
        while self.users.len() < self.config.user_count {
            let user = self.register_user().await?;
            info!(user = %user.display_name, id = %user.id, "User registered");
            self.users.push(user);
        }
        Ok(())
    }

    /// Register one user, retrying once with a fresh name
    async fn register_user(&mut self) -> Result<User, SimulationError> {
        let name = self.identities.next_identity(&mut self.rng)?;
        let attempt = self.gateway.register(&name).await;
        let first_error = match attempt {
            Ok(id) => return Ok(User::new(id, name)),
            Err(e) => e,
        };
        warn!(error = %first_error, "Registration failed, retrying with a new name");
        self.record_failure(Phase::Bootstrap, &first_error);

        let name = self.identities.next_identity(&mut self.rng)?;
        let id = self
            .gateway
            .register(&name)
            .await
            .map_err(SimulationError::Registration)?;
        Ok(User::new(id, name))
    }

    /// Publish a random number of posts for every user. Failed posts are
    /// recorded and skipped.
    pub async fn seed_content(&mut self) {
        self.print_step(format!(
            "Each user creates random number of posts (up to {})",
            self.config.max_posts_per_user
        ));

        for author in 0..self.users.len() {
            let count = match self.fixed_post_count {
                Some(count) => count,
                None => self.rng.random_range(0..=self.config.max_posts_per_user),
            };

            for _ in 0..count {
                let content = self.content.next_content(&mut self.rng);
                let published = self
                    .gateway
                    .publish(&self.users[author].id, &content)
                    .await;
                match published {
                    Ok(id) => {
                        info!(
                            user = %self.users[author].display_name,
                            post = %id,
                            %content,
                            "Post created"
                        );
                        let index = self.posts.len();
                        self.posts.push(Post {
                            id,
                            author,
                            content,
                            likes_received: 0,
                        });
                        self.users[author].posts.push(index);
                    }
                    Err(e) => {
                        warn!(error = %e, "Post skipped");
                        self.record_failure(Phase::Seeding, &e);
                    }
                }
            }
        }
    }

    /// Posts `user` may still like: authored by someone else and not liked yet
    fn candidates_for(&self, user: usize) -> BTreeSet<usize> {
        self.posts
            .iter()
            .enumerate()
            .filter(|(index, post)| post.author != user && !self.liked.contains(&(user, *index)))
            .map(|(index, _)| index)
            .collect()
    }

    /// Run like rounds until exhaustion.
    ///
    /// Each round gives every user, in registration order, at most one like
    /// attempt on a random candidate. The phase ends after a round with no
    /// successful like once every user is capped or out of candidates.
    pub async fn assign_likes(&mut self) -> LikePhaseReport {
        self.print_step("Start liking".to_string());

        let cap = self.config.max_likes_per_user;
        let mut candidates: Vec<BTreeSet<usize>> =
            (0..self.users.len()).map(|u| self.candidates_for(u)).collect();
        let mut failed_attempts: HashMap<(usize, usize), usize> = HashMap::new();
        let mut report = LikePhaseReport::default();

        loop {
            report.rounds += 1;
            let mut round_likes = 0;

            for user in 0..self.users.len() {
                if self.users[user].likes_given >= cap {
                    continue;
                }
                let pick = match candidates[user].len() {
                    0 => continue,
                    len => self.rng.random_range(0..len),
                };
                let Some(post) = candidates[user].iter().nth(pick).copied() else {
                    continue;
                };

                report.attempts += 1;
                let outcome = self
                    .gateway
                    .like(&self.users[user].id, &self.posts[post].id)
                    .await;
                match outcome {
                    Ok(true) => {
                        info!(
                            post = %self.posts[post].id,
                            user = %self.users[user].display_name,
                            "Post liked successfully"
                        );
                        candidates[user].remove(&post);
                        self.liked.insert((user, post));
                        self.users[user].likes_given += 1;
                        self.posts[post].likes_received += 1;
                        round_likes += 1;
                    }
                    Ok(false) => {
                        debug!(
                            post = %self.posts[post].id,
                            user = %self.users[user].display_name,
                            "Like rejected, dropping candidate"
                        );
                        candidates[user].remove(&post);
                        report.rejections += 1;
                    }
                    Err(e) => {
                        warn!(error = %e, "Like attempt failed");
                        let failures = failed_attempts.entry((user, post)).or_insert(0);
                        *failures += 1;
                        if *failures >= MAX_LIKE_ATTEMPTS {
                            candidates[user].remove(&post);
                        }
                        report.failures += 1;
                        self.record_failure(Phase::Liking, &e);
                    }
                }
            }

            report.likes += round_likes;
            debug!(round = report.rounds, likes = round_likes, "Round complete");

            let exhausted = self
                .users
                .iter()
                .zip(&candidates)
                .all(|(user, remaining)| user.likes_given >= cap || remaining.is_empty());
            if round_likes == 0 && exhausted {
                break;
            }
        }

        self.rounds += report.rounds;
        info!(
            rounds = report.rounds,
            likes = report.likes,
            "No more users able to like. Stop liking"
        );
        report
    }

    /// Whether no user can give any further like, judged from the recorded
    /// state alone
    pub fn is_exhausted(&self) -> bool {
        let cap = self.config.max_likes_per_user;
        (0..self.users.len())
            .all(|u| self.users[u].likes_given >= cap || self.candidates_for(u).is_empty())
    }

    /// Summarize everything recorded so far
    pub fn summary(&self, started_at: DateTime<Utc>, outcome: RunOutcome) -> RunSummary {
        let users = self
            .users
            .iter()
            .map(|user| UserReport {
                id: user.id.clone(),
                display_name: user.display_name.clone(),
                likes_given: user.likes_given,
                posts: user
                    .posts
                    .iter()
                    .map(|&index| {
                        let post = &self.posts[index];
                        PostReport {
                            id: post.id.clone(),
                            content: post.content.clone(),
                            likes_received: post.likes_received,
                        }
                    })
                    .collect(),
            })
            .collect();

        RunSummary {
            seed: self.seed,
            started_at,
            finished_at: Utc::now(),
            users_created: self.users.len(),
            posts_created: self.posts.len(),
            likes_given: self.liked.len(),
            rounds: self.rounds,
            outcome,
            failures: self.failures.clone(),
            users,
        }
    }

    fn record_failure(&mut self, phase: Phase, error: &GatewayError) {
        self.failures.push(FailureRecord {
            phase,
            message: error.to_string(),
        });
    }

    fn print_step(&mut self, text: String) {
        info!("Step {}: {}", self.step, text);
        self.step += 1;
    }
}

impl User {
    fn new(id: UserId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            posts: Vec::new(),
            likes_given: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FixedContent;
    use crate::gateway::{FaultConfig, FaultInjector, InMemoryGateway};

    fn simulation(
        gateway: Arc<InMemoryGateway>,
        users: usize,
        max_posts: usize,
        max_likes: usize,
        seed: u64,
    ) -> Simulation {
        Simulation::new(
            SimulationConfig::new(users, max_posts, max_likes),
            gateway,
            Box::new(FixedContent::new("Ember - A glowing coal.")),
            seed,
        )
    }

    fn assert_invariants(sim: &Simulation) {
        let cap = sim.config().max_likes_per_user;
        for user in sim.users() {
            assert!(user.likes_given <= cap);
        }
        for &(user, post) in &sim.liked {
            assert_ne!(sim.posts()[post].author, user, "self-like recorded");
        }
        for (index, post) in sim.posts().iter().enumerate() {
            let likers = sim.liked.iter().filter(|(_, p)| *p == index).count();
            assert_eq!(post.likes_received, likers);
        }
        let given: usize = sim.users().iter().map(|u| u.likes_given).sum();
        assert_eq!(given, sim.liked.len());
    }

    #[tokio::test]
    async fn test_three_users_one_post_each() {
        let gateway = Arc::new(InMemoryGateway::new());
        let mut sim = simulation(gateway.clone(), 3, 1, 2, 1).with_fixed_post_count(1);

        sim.bootstrap().await.unwrap();
        sim.seed_content().await;
        assert_eq!(sim.posts().len(), 3);

        let report = sim.assign_likes().await;
        assert!(report.rounds <= 3, "took {} rounds", report.rounds);
        assert_eq!(report.likes, 6);
        for user in sim.users() {
            assert_eq!(user.likes_given, 2);
        }
        assert_eq!(gateway.total_likes(), 6);
        assert_invariants(&sim);
    }

    #[tokio::test]
    async fn test_single_user_terminates_in_first_round() {
        let gateway = Arc::new(InMemoryGateway::new());
        let mut sim = simulation(gateway, 1, 3, 5, 2).with_fixed_post_count(3);

        sim.bootstrap().await.unwrap();
        sim.seed_content().await;
        let report = sim.assign_likes().await;

        assert_eq!(report.rounds, 1);
        assert_eq!(report.attempts, 0);
        assert_eq!(report.likes, 0);
    }

    #[tokio::test]
    async fn test_zero_like_cap_never_attempts() {
        let gateway = Arc::new(InMemoryGateway::new());
        let mut sim = simulation(gateway, 4, 2, 0, 3).with_fixed_post_count(2);

        sim.bootstrap().await.unwrap();
        sim.seed_content().await;
        let report = sim.assign_likes().await;

        assert_eq!(report.rounds, 1);
        assert_eq!(report.attempts, 0);
        assert!(sim.users().iter().all(|u| u.likes_given == 0));
    }

    #[tokio::test]
    async fn test_exhaustion_is_idempotent() {
        let gateway = Arc::new(InMemoryGateway::new());
        let mut sim = simulation(gateway, 6, 3, 4, 4);

        sim.bootstrap().await.unwrap();
        sim.seed_content().await;
        let first = sim.assign_likes().await;
        assert!(sim.is_exhausted());
        assert_invariants(&sim);

        let second = sim.assign_likes().await;
        assert_eq!(second.likes, 0);
        assert_eq!(second.attempts, 0);
        assert_eq!(second.rounds, 1);
        assert_eq!(sim.liked.len(), first.likes);
    }

    #[tokio::test]
    async fn test_likes_limited_by_available_posts() {
        // Plenty of like budget, few posts: everyone likes every foreign post
        let gateway = Arc::new(InMemoryGateway::new());
        let mut sim = simulation(gateway, 4, 2, 100, 5).with_fixed_post_count(2);

        sim.bootstrap().await.unwrap();
        sim.seed_content().await;
        sim.assign_likes().await;

        for user in sim.users() {
            assert_eq!(user.likes_given, 6);
        }
        for post in sim.posts() {
            assert_eq!(post.likes_received, 3);
        }
        assert_invariants(&sim);
    }

    #[tokio::test]
    async fn test_post_counts_within_bounds() {
        let gateway = Arc::new(InMemoryGateway::new());
        let mut sim = simulation(gateway, 20, 3, 2, 6);

        sim.bootstrap().await.unwrap();
        sim.seed_content().await;

        assert!(sim.users().iter().all(|u| u.posts.len() <= 3));
        let total: usize = sim.users().iter().map(|u| u.posts.len()).sum();
        assert_eq!(total, sim.posts().len());
        for (index, post) in sim.posts().iter().enumerate() {
            assert!(sim.users()[post.author].posts.contains(&index));
        }
    }

    #[test]
    fn test_error_phases() {
        let config_error =
            SimulationError::from(ConfigError::Validation("like_failure_rate".to_string()));
        assert_eq!(config_error.phase(), Phase::Setup);

        let exhausted = SimulationError::from(IdentityError::GenerationExhausted { attempts: 3 });
        assert_eq!(exhausted.phase(), Phase::Bootstrap);

        let registration = SimulationError::Registration(GatewayError::Registration {
            name: "CalmOtter1".to_string(),
            reason: "taken".to_string(),
        });
        assert_eq!(registration.phase(), Phase::Bootstrap);
    }

    #[tokio::test]
    async fn test_registration_retry_uses_new_name() {
        let gateway = Arc::new(InMemoryGateway::new().fail_next_registrations(1));
        let mut sim = simulation(gateway.clone(), 1, 0, 0, 7);

        sim.bootstrap().await.unwrap();

        let attempts = gateway.attempted_names();
        assert_eq!(attempts.len(), 2);
        assert_ne!(attempts[0], attempts[1]);
        assert_eq!(sim.users()[0].display_name, attempts[1]);
        assert_eq!(sim.failures().len(), 1);
        assert_eq!(sim.failures()[0].phase, Phase::Bootstrap);
    }

    #[tokio::test]
    async fn test_registration_fails_twice_aborts() {
        let gateway = Arc::new(InMemoryGateway::new().fail_next_registrations(2));
        let mut sim = simulation(gateway, 3, 1, 1, 8);

        let summary = sim.run().await;
        assert!(!summary.is_completed());
        assert!(matches!(
            summary.outcome,
            RunOutcome::Aborted { phase: Phase::Bootstrap, .. }
        ));
        assert_eq!(summary.users_created, 0);
        assert_eq!(summary.rounds, 0);
    }

    #[tokio::test]
    async fn test_abort_keeps_partial_population() {
        let gateway = Arc::new(InMemoryGateway::new());
        let identities =
            IdentityGenerator::with_words(&["Solo", "Duo"], &["Act"], 0).with_max_attempts(32);
        let mut sim = simulation(gateway, 3, 1, 1, 9).with_identity_generator(identities);

        let summary = sim.run().await;
        assert_eq!(summary.users_created, 2);
        match summary.outcome {
            RunOutcome::Aborted { phase, cause } => {
                assert_eq!(phase, Phase::Bootstrap);
                assert!(cause.contains("No unused username"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_failures_are_skipped() {
        let faults = FaultInjector::new(FaultConfig::new().with_publish_failure_rate(1.0), 1);
        let gateway = Arc::new(InMemoryGateway::new().with_faults(faults));
        let mut sim = simulation(gateway, 3, 2, 2, 10).with_fixed_post_count(2);

        let summary = sim.run().await;
        assert!(summary.is_completed());
        assert_eq!(summary.posts_created, 0);
        assert_eq!(summary.failures.len(), 6);
        assert!(summary.failures.iter().all(|f| f.phase == Phase::Seeding));
    }

    #[tokio::test]
    async fn test_like_failures_do_not_stop_run() {
        let faults = FaultInjector::new(FaultConfig::new().with_like_failure_rate(1.0), 1);
        let gateway = Arc::new(InMemoryGateway::new().with_faults(faults));
        let mut sim = simulation(gateway, 2, 1, 1, 11).with_fixed_post_count(1);

        sim.bootstrap().await.unwrap();
        sim.seed_content().await;
        let report = sim.assign_likes().await;

        // Each user retries its single candidate until it is dropped
        assert_eq!(report.likes, 0);
        assert_eq!(report.failures, 2 * MAX_LIKE_ATTEMPTS);
        assert_eq!(report.rounds, MAX_LIKE_ATTEMPTS);
        assert_eq!(sim.failures().len(), 2 * MAX_LIKE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_server_side_rejections_shrink_candidates() {
        // The service caps likes at 1 while the bot allows 3
        let gateway = Arc::new(InMemoryGateway::new().with_like_cap(1));
        let mut sim = simulation(gateway.clone(), 3, 2, 3, 12).with_fixed_post_count(2);

        sim.bootstrap().await.unwrap();
        sim.seed_content().await;
        let report = sim.assign_likes().await;

        assert_eq!(report.likes, 3);
        assert!(report.rejections > 0);
        assert!(sim.users().iter().all(|u| u.likes_given == 1));
        assert_eq!(gateway.total_likes(), 3);
        assert_invariants(&sim);
    }

    #[tokio::test]
    async fn test_same_seed_same_run() {
        let run = |seed| async move {
            let gateway = Arc::new(InMemoryGateway::new());
            let mut sim = simulation(gateway, 5, 3, 3, seed);
            let summary = sim.run().await;
            summary
                .users
                .iter()
                .map(|u| {
                    (
                        u.display_name.clone(),
                        u.likes_given,
                        u.posts.iter().map(|p| p.likes_received).collect::<Vec<_>>(),
                    )
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(run(42).await, run(42).await);
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let gateway = Arc::new(InMemoryGateway::new());
        let mut sim = simulation(gateway.clone(), 4, 2, 2, 13);

        let summary = sim.run().await;
        assert!(summary.is_completed());
        assert_eq!(summary.users_created, 4);
        assert_eq!(summary.posts_created, gateway.post_count());
        assert_eq!(summary.likes_given, gateway.total_likes());
        assert!(summary.rounds >= 1);
        let per_user: usize = summary.users.iter().map(|u| u.likes_given).sum();
        assert_eq!(per_user, summary.likes_given);
    }
}
