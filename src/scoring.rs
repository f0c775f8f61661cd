//! Similarity scoring between two user profiles.
//!
//! A candidate's score is a weighted sum of three overlap counts:
//! shared direct connections, shared own-project tags, and shared tags of
//! second-degree connections.
use std::collections::HashSet;

use crate::profile::UserProfile;

/// Weights applied to each overlap count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Weight per shared direct connection (default 0.5).
    pub connections: f64,
    /// Weight per shared own-project tag (default 0.3).
    pub project_tags: f64,
    /// Weight per shared tag of connected users (default 0.2).
    pub connected_tags: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            connections: 0.5,
            project_tags: 0.3,
            connected_tags: 0.2,
        }
    }
}

/// Overlap counts between a subject and a candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overlap {
    pub common_connections: usize,
    pub common_project_tags: usize,
    pub common_connected_tags: usize,
}

impl Overlap {
    /// Counts the overlaps of `candidate` with `subject`.
    ///
    /// Each count walks the subject's side and tests membership on the
    /// candidate's side, so a tag repeated in the subject's
    /// `connected_users_tags` is counted once per occurrence.
    ///
    /// # Examples
    ///
    /// ```
    /// use mutuals::{TagId, UserId};
    /// use mutuals::profile::UserProfile;
    /// use mutuals::scoring::Overlap;
    ///
    /// let mut subject = UserProfile::default();
    /// subject.connections.insert(UserId::new("x"));
    /// subject.connected_users_tags = vec![TagId::new(1), TagId::new(1)];
    ///
    /// let mut candidate = UserProfile::default();
    /// candidate.connections.insert(UserId::new("x"));
    /// candidate.connected_users_tags = vec![TagId::new(1)];
    ///
    /// let overlap = Overlap::between(&subject, &candidate);
    /// assert_eq!(overlap.common_connections, 1);
    /// assert_eq!(overlap.common_connected_tags, 2);
    /// ```
    pub fn between(subject: &UserProfile, candidate: &UserProfile) -> Self {
        let candidate_connected: HashSet<_> = candidate.connected_users_tags.iter().collect();

        Self {
            common_connections: subject
                .connections
                .iter()
                .filter(|id| candidate.connections.contains(*id))
                .count(),
            common_project_tags: subject
                .project_tags
                .iter()
                .filter(|tag| candidate.project_tags.contains(*tag))
                .count(),
            common_connected_tags: subject
                .connected_users_tags
                .iter()
                .filter(|tag| candidate_connected.contains(*tag))
                .count(),
        }
    }

    /// Weighted similarity score. Never negative for non-negative weights.
    pub fn score(&self, weights: &ScoreWeights) -> f64 {
        weights.connections * self.common_connections as f64
            + weights.project_tags * self.common_project_tags as f64
            + weights.connected_tags * self.common_connected_tags as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TagId, UserId};

    fn profile(connections: &[&str], project_tags: &[i64], connected_tags: &[i64]) -> UserProfile {
        UserProfile {
            connections: connections.iter().map(|id| UserId::new(*id)).collect(),
            project_tags: project_tags.iter().map(|t| TagId::new(*t)).collect(),
            connected_users_tags: connected_tags.iter().map(|t| TagId::new(*t)).collect(),
        }
    }

    #[test]
    fn default_weights() {
        let weights = ScoreWeights::default();

        assert_eq!(weights.connections, 0.5);
        assert_eq!(weights.project_tags, 0.3);
        assert_eq!(weights.connected_tags, 0.2);
    }

    #[test]
    fn disjoint_profiles_score_zero() {
        let subject = profile(&["a"], &[1], &[2]);
        let candidate = profile(&["b"], &[3], &[4]);

        let overlap = Overlap::between(&subject, &candidate);

        assert_eq!(overlap, Overlap::default());
        assert_eq!(overlap.score(&ScoreWeights::default()), 0.0);
    }

    #[test]
    fn one_overlap_of_each_kind_scores_one() {
        // go=1, rust=2, cli=3
        let subject = profile(&["x", "y"], &[1, 2], &[2, 3]);
        let candidate = profile(&["x", "z"], &[1], &[3]);

        let overlap = Overlap::between(&subject, &candidate);

        assert_eq!(overlap.common_connections, 1);
        assert_eq!(overlap.common_project_tags, 1);
        assert_eq!(overlap.common_connected_tags, 1);
        assert!((overlap.score(&ScoreWeights::default()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn shared_connections_outweigh_fewer_shared_tags() {
        let subject = profile(&["x", "y"], &[1, 2, 3], &[]);
        let a = profile(&["x", "y"], &[], &[]);
        let b = profile(&[], &[1, 2, 3], &[]);
        let weights = ScoreWeights::default();

        let score_a = Overlap::between(&subject, &a).score(&weights);
        let score_b = Overlap::between(&subject, &b).score(&weights);

        assert!((score_a - 1.0).abs() < 1e-9);
        assert!((score_b - 0.9).abs() < 1e-9);
        assert!(score_a > score_b);
    }

    #[test]
    fn repeated_connected_tags_amplify_weight() {
        let subject = profile(&[], &[], &[7, 7, 7]);
        let candidate = profile(&[], &[], &[7]);

        let overlap = Overlap::between(&subject, &candidate);

        assert_eq!(overlap.common_connected_tags, 3);
        assert!((overlap.score(&ScoreWeights::default()) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn custom_weights_apply() {
        let subject = profile(&["x"], &[1], &[]);
        let candidate = profile(&["x"], &[1], &[]);
        let weights = ScoreWeights {
            connections: 2.0,
            project_tags: 0.0,
            connected_tags: 1.0,
        };

        assert_eq!(Overlap::between(&subject, &candidate).score(&weights), 2.0);
    }
}
