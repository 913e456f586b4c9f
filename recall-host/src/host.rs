//! The host: access checks, session launch, and what happens after an
//! attempt finishes.
//!
//! Launch order is fixed: authenticate the session token, look the task
//! up, check the visitor's unlock level, then check premium entitlement.
//! Only then is an engine created.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use recall_core::{Catalog, TaskDefinition, TaskOutcome};
use tracing::{debug, info};

use crate::error::{HostError, Result};
use crate::progress::{ProgressStore, ProgressTracker};
use crate::results::ResultsStore;
use crate::services::{AuthProvider, PaymentProvider, VisitorId};
use crate::session::{LaunchedSession, OutcomeSink, TaskSession};

/// A task cleared for launch.
#[derive(Debug, Clone)]
pub struct Access {
    /// Who is playing.
    pub visitor: VisitorId,
    /// What they are playing.
    pub definition: Arc<TaskDefinition>,
    /// The task's unlock level.
    pub level: usize,
}

/// A launched task.
#[derive(Debug)]
pub struct LaunchedTask {
    /// Who is playing.
    pub visitor: VisitorId,
    /// What they are playing.
    pub definition: Arc<TaskDefinition>,
    /// The running session.
    pub session: LaunchedSession,
}

/// Wires the catalog to its collaborators.
#[derive(Clone)]
pub struct Host {
    catalog: Arc<Catalog>,
    auth: Arc<dyn AuthProvider>,
    payments: Arc<dyn PaymentProvider>,
    progress: Arc<dyn ProgressStore>,
    results: Arc<dyn ResultsStore>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("task_set", &self.catalog.name())
            .field("tasks", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl Host {
    /// Assemble a host.
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        auth: Arc<dyn AuthProvider>,
        payments: Arc<dyn PaymentProvider>,
        progress: Arc<dyn ProgressStore>,
        results: Arc<dyn ResultsStore>,
    ) -> Self {
        Self {
            catalog,
            auth,
            payments,
            progress,
            results,
        }
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The results store.
    #[must_use]
    pub fn results(&self) -> &Arc<dyn ResultsStore> {
        &self.results
    }

    /// Resolve a session token.
    ///
    /// # Errors
    /// `Unauthenticated` for unknown tokens.
    pub fn authenticate(&self, session_token: &str) -> Result<VisitorId> {
        self.auth
            .resolve(session_token)
            .ok_or(HostError::Unauthenticated)
    }

    /// `visitor`'s progress through the catalog.
    ///
    /// # Errors
    /// Progress store failures.
    pub fn tracker(&self, visitor: &VisitorId) -> Result<ProgressTracker> {
        ProgressTracker::load(visitor.clone(), Arc::clone(&self.catalog), Arc::clone(&self.progress))
    }

    /// Whether `visitor` may play premium tasks.
    #[must_use]
    pub fn has_premium(&self, visitor: &VisitorId) -> bool {
        self.payments.has_premium(visitor)
    }

    /// Run every launch check without starting anything.
    ///
    /// # Errors
    /// `Unauthenticated`, `TaskNotFound`, `Locked` or `PremiumRequired`.
    pub fn check_access(&self, session_token: &str, task_id: &str) -> Result<Access> {
        let visitor = self.authenticate(session_token)?;
        let level = self
            .catalog
            .level_of(task_id)
            .ok_or_else(|| HostError::TaskNotFound(task_id.to_string()))?;
        let definition = self
            .catalog
            .at(level)
            .cloned()
            .ok_or_else(|| HostError::TaskNotFound(task_id.to_string()))?;

        let unlocked = self.tracker(&visitor)?.unlocked_level();
        if level > unlocked {
            debug!(visitor = %visitor, task = %definition.id, level, unlocked, "Launch refused: locked");
            return Err(HostError::Locked {
                task: definition.id.clone(),
                level,
                unlocked,
            });
        }
        if definition.premium && !self.payments.has_premium(&visitor) {
            debug!(visitor = %visitor, task = %definition.id, "Launch refused: premium");
            return Err(HostError::PremiumRequired(definition.id.clone()));
        }

        Ok(Access {
            visitor,
            definition,
            level,
        })
    }

    /// Check access and spawn a session on the current tokio runtime. The
    /// finished attempt is saved and, if passed, unlocks the next level.
    ///
    /// # Errors
    /// Any [`check_access`](Self::check_access) refusal; engine construction errors.
    pub fn launch(&self, session_token: &str, task_id: &str) -> Result<LaunchedTask> {
        self.launch_with_rng(session_token, task_id, StdRng::from_entropy())
    }

    /// [`launch`](Self::launch) with a seeded PRNG, for replays and tests.
    ///
    /// # Errors
    /// As [`launch`](Self::launch).
    pub fn launch_seeded(&self, session_token: &str, task_id: &str, seed: u64) -> Result<LaunchedTask> {
        self.launch_with_rng(session_token, task_id, StdRng::seed_from_u64(seed))
    }

    fn launch_with_rng(&self, session_token: &str, task_id: &str, rng: StdRng) -> Result<LaunchedTask> {
        let access = self.check_access(session_token, task_id)?;
        let recorder = OutcomeRecorder {
            tracker: self.tracker(&access.visitor)?,
            results: Arc::clone(&self.results),
        };
        let session = TaskSession::spawn(Arc::clone(&access.definition), rng, Some(Box::new(recorder)))?;
        info!(visitor = %access.visitor, task = %access.definition.id, level = access.level, "Task launched");

        Ok(LaunchedTask {
            visitor: access.visitor,
            definition: access.definition,
            session,
        })
    }

    /// Save `outcome` for `visitor` and apply the unlock rule. Returns the
    /// level opened, if any.
    ///
    /// # Errors
    /// Store failures; `TaskNotFound` if the outcome is for a foreign task.
    pub fn record_outcome(&self, visitor: &VisitorId, outcome: &TaskOutcome) -> Result<Option<usize>> {
        OutcomeRecorder {
            tracker: self.tracker(visitor)?,
            results: Arc::clone(&self.results),
        }
        .record(outcome)
    }
}

struct OutcomeRecorder {
    tracker: ProgressTracker,
    results: Arc<dyn ResultsStore>,
}

impl OutcomeSink for OutcomeRecorder {
    fn record(&mut self, outcome: &TaskOutcome) -> Result<Option<usize>> {
        let visitor = self.tracker.visitor().clone();
        self.results.save_result(&outcome.to_record(visitor.as_str()))?;
        if outcome.passed {
            self.tracker.record_pass(outcome.task_id.as_str())
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemoryProgressStore;
    use crate::results::MemoryResultsStore;
    use crate::services::{StaticAuth, StaticPayments};
    use recall_core::scoring::PassRule;
    use recall_core::{RecallConfig, TaskId};

    fn host(payments: StaticPayments) -> Host {
        Host::new(
            Arc::new(Catalog::standard(&RecallConfig::default()).expect("catalog")),
            Arc::new(StaticAuth::new().with_session("tok", VisitorId::new("ada"))),
            Arc::new(payments),
            Arc::new(MemoryProgressStore::new()),
            Arc::new(MemoryResultsStore::new()),
        )
    }

    fn outcome(task: &str, passed: bool) -> TaskOutcome {
        let rule = if passed {
            PassRule::MinCorrectRounds(0)
        } else {
            PassRule::MinMeanScore(100)
        };
        TaskOutcome::aggregate(TaskId::new(task), rule, Vec::new())
    }

    #[test]
    fn unknown_token_is_unauthenticated() {
        let err = host(StaticPayments::new())
            .check_access("bad", "digit-span")
            .expect_err("bad token");
        assert!(matches!(err, HostError::Unauthenticated));
    }

    #[test]
    fn first_task_is_open_and_later_ones_locked() {
        let host = host(StaticPayments::new());
        let access = host.check_access("tok", "digit-span").expect("open");
        assert_eq!(access.level, 0);
        assert!(matches!(
            host.check_access("tok", "letter-span"),
            Err(HostError::Locked { level: 2, unlocked: 0, .. })
        ));
        assert!(matches!(
            host.check_access("tok", "nope"),
            Err(HostError::TaskNotFound(_))
        ));
    }

    #[test]
    fn premium_is_checked_after_unlock() {
        let host = host(StaticPayments::new());
        let ada = VisitorId::new("ada");
        host.tracker(&ada).expect("tracker").unlock("word-pairs").expect("unlock");
        assert!(matches!(
            host.check_access("tok", "word-pairs"),
            Err(HostError::PremiumRequired(_))
        ));

        let host = Host {
            payments: Arc::new(StaticPayments::unrestricted()),
            ..host
        };
        assert!(host.check_access("tok", "word-pairs").is_ok());
    }

    #[test]
    fn passing_saves_and_unlocks() {
        let host = host(StaticPayments::new());
        let ada = VisitorId::new("ada");

        assert_eq!(host.record_outcome(&ada, &outcome("digit-span", false)).expect("fail"), None);
        assert_eq!(host.record_outcome(&ada, &outcome("digit-span", true)).expect("pass"), Some(1));
        assert_eq!(host.results().results_for("ada").expect("results").len(), 2);
        assert!(host.check_access("tok", "backward-digit-span").is_ok());
    }
}
