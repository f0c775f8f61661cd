//! Friend recommendation engine.
//!
//! Scores every other user against the subject's social profile and returns
//! the best matches. Every profile is fetched through a [`DataSource`]; the
//! engine keeps no state between passes unless profile caching is enabled.


use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, FailurePolicy};
use crate::profile::{ProfileCache, UserProfile};
use crate::scoring::Overlap;
use crate::source::{DataSource, Filter, Row, SourceError, Table, row_text};
use crate::{Recommendation, UserId};

/// Errors surfaced by [`RecommendationEngine`].
#[derive(Debug, Error)]
pub enum RecommendError {
    /// The data source failed and the failure policy does not allow
    /// continuing, or a connect insert was rejected.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The recommendation pass ran past its configured time budget.
    #[error("recommendation pass exceeded its time budget of {budget:?}")]
    DeadlineExceeded { budget: Duration },

    #[error("cannot connect a user to themselves")]
    SelfConnection,

    #[error("user id cannot be empty")]
    BlankId,
}

impl RecommendError {
    /// Returns true for errors caused by caller input rather than the store.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::SelfConnection | Self::BlankId)
    }
}

/// Result of a connect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new connection row was written.
    Created,
    /// The store already held this connection; nothing was written.
    AlreadyConnected,
}

/// Ranks candidate friends for a user.
///
/// # Examples
///
/// ```
/// use mutuals::{Database, RecommendationEngine, SocialService, UserId};
///
/// # fn main() -> anyhow::Result<()> {
/// let service = SocialService::new(Database::in_memory()?);
/// service.create_user("ada", "Ada")?;
/// service.create_user("bob", "Bob")?;
///
/// let engine = RecommendationEngine::new(service.database());
/// let recs = engine.generate_recommendations(&UserId::new("ada"))?;
/// assert_eq!(recs.len(), 1);
/// assert_eq!(recs[0].username, "Bob");
/// # Ok(())
/// # }
/// ```
pub struct RecommendationEngine<S> {
    source: S,
    config: EngineConfig,
    cache: ProfileCache,
}

impl<S: DataSource> RecommendationEngine<S> {
    /// Creates an engine with the default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    pub fn with_config(source: S, config: EngineConfig) -> Self {
        Self {
            source,
            config,
            cache: ProfileCache::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Profile cache; only populated when `cache_profiles` is enabled.
    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    /// Drops cached profiles affected by a change to `user`'s projects or tags.
    pub fn invalidate(&self, user: &UserId) {
        self.cache.invalidate(user);
    }

    /// Returns up to `top_n` users ranked by similarity to `subject`.
    ///
    /// The subject and its direct connections are never returned. A blank
    /// subject or a failed population fetch yields an empty list. Scores are
    /// sorted descending; ties keep the population's fetch order.
    ///
    /// The failure policy only covers candidate profiles. Without the
    /// subject's connections nothing can be excluded, so a failed subject
    /// fetch yields an empty list under `FailOpen` and an error under
    /// `FailFast`.
    pub fn generate_recommendations(
        &self,
        subject: &UserId,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        if subject.is_blank() {
            debug!("no subject id given, returning no recommendations");
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let subject_profile = match self.load_profile(subject) {
            Ok(profile) => profile,
            Err(e) => match self.config.failure_policy {
                FailurePolicy::FailOpen => {
                    warn!(subject = %subject, error = %e, "failed to fetch subject profile");
                    return Ok(Vec::new());
                }
                FailurePolicy::FailFast => return Err(e.into()),
            },
        };

        let population = match self.source.query_rows(Table::Users, &Filter::All) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "failed to fetch candidate population");
                return Ok(Vec::new());
            }
        };

        let mut recommendations = Vec::new();
        for row in &population {
            let Some((candidate, username)) = candidate_from_row(row) else {
                continue;
            };
            if &candidate == subject || subject_profile.is_connected_to(&candidate) {
                continue;
            }

            if let Some(budget) = self.config.time_budget
                && started.elapsed() > budget
            {
                warn!(subject = %subject, ?budget, "recommendation pass over budget");
                return Err(RecommendError::DeadlineExceeded { budget });
            }

            let candidate_profile = self.candidate_profile(&candidate)?;
            let overlap = Overlap::between(&subject_profile, &candidate_profile);
            let score = overlap.score(&self.config.weights);
            debug!(
                candidate = %candidate,
                connections = overlap.common_connections,
                project_tags = overlap.common_project_tags,
                connected_tags = overlap.common_connected_tags,
                score,
                "scored candidate"
            );

            recommendations.push(Recommendation::new(candidate, username, score));
        }

        // sort_by is stable, so equal scores keep population order
        recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
        recommendations.truncate(self.config.top_n);

        debug!(
            subject = %subject,
            candidates = population.len(),
            returned = recommendations.len(),
            elapsed = ?started.elapsed(),
            "recommendation pass complete"
        );
        Ok(recommendations)
    }

    /// Records a connection from `subject` to `candidate`.
    ///
    /// Repeating a connect that the store already holds is reported as
    /// [`ConnectOutcome::AlreadyConnected`] rather than an error.
    pub fn connect(
        &self,
        subject: &UserId,
        candidate: &UserId,
    ) -> Result<ConnectOutcome, RecommendError> {
        if subject.is_blank() || candidate.is_blank() {
            return Err(RecommendError::BlankId);
        }
        if subject == candidate {
            return Err(RecommendError::SelfConnection);
        }

        let mut record = Row::new();
        record.insert("user_id".into(), Value::from(subject.as_str()));
        record.insert("friend_id".into(), Value::from(candidate.as_str()));

        let outcome = match self.source.insert_row(Table::Connections, record) {
            Ok(()) => ConnectOutcome::Created,
            Err(SourceError::Duplicate { .. }) => ConnectOutcome::AlreadyConnected,
            Err(e) => {
                warn!(subject = %subject, candidate = %candidate, error = %e, "connect failed");
                return Err(e.into());
            }
        };

        self.cache.invalidate(subject);
        self.cache.invalidate(candidate);
        info!(subject = %subject, candidate = %candidate, ?outcome, "connected");
        Ok(outcome)
    }

    /// Connects and, on success, removes `candidate` from a displayed list.
    ///
    /// On failure `displayed` is left untouched.
    pub fn connect_and_dismiss(
        &self,
        subject: &UserId,
        candidate: &UserId,
        displayed: &mut Vec<Recommendation>,
    ) -> Result<ConnectOutcome, RecommendError> {
        let outcome = self.connect(subject, candidate)?;
        displayed.retain(|rec| &rec.user_id != candidate);
        Ok(outcome)
    }

    /// Profile of a scored candidate, with the failure policy applied.
    fn candidate_profile(&self, user: &UserId) -> Result<UserProfile, RecommendError> {
        match self.load_profile(user) {
            Ok(profile) => Ok(profile),
            Err(e) => match self.config.failure_policy {
                FailurePolicy::FailOpen => {
                    warn!(user = %user, error = %e, "profile fetch failed, scoring as empty");
                    Ok(UserProfile::default())
                }
                FailurePolicy::FailFast => Err(e.into()),
            },
        }
    }

    fn load_profile(&self, user: &UserId) -> Result<UserProfile, SourceError> {
        if self.config.cache_profiles
            && let Some(profile) = self.cache.get(user)
        {
            return Ok(profile);
        }

        let profile = UserProfile::load(&self.source, user)?;
        if self.config.cache_profiles {
            self.cache.insert(user.clone(), profile.clone());
        }
        Ok(profile)
    }
}

/// Extracts `(id, username)` from a users row, skipping rows without a usable id.
fn candidate_from_row(row: &Row) -> Option<(UserId, String)> {
    let id = match row_text(row, Table::Users, "auth_id") {
        Ok(Some(id)) => UserId::new(id),
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "skipping malformed user row");
            return None;
        }
    };
    if id.is_blank() {
        return None;
    }

    let username = row_text(row, Table::Users, "username")
        .ok()
        .flatten()
        .unwrap_or_default();
    Some((id, username))
}
