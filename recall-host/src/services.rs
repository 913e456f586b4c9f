//! External collaborators: who the visitor is and what they have paid for.
//!
//! Both are consulted only by the host when launching a task. The engine
//! never sees them.

use std::collections::{HashMap, HashSet};
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A visitor (signed-in user or anonymous browser session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(pub String);

impl VisitorId {
    /// Wrap an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh anonymous visitor id.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(format!("anon-{}", uuid::Uuid::new_v4()))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves session tokens to visitors.
pub trait AuthProvider: Send + Sync {
    /// The visitor behind `session_token`, if it is valid.
    fn resolve(&self, session_token: &str) -> Option<VisitorId>;
}

/// Answers whether a visitor holds a premium subscription.
pub trait PaymentProvider: Send + Sync {
    /// Whether `visitor` may play premium tasks.
    fn has_premium(&self, visitor: &VisitorId) -> bool;
}

/// In-process session table.
#[derive(Debug, Default)]
pub struct StaticAuth {
    sessions: RwLock<HashMap<String, VisitorId>>,
}

impl StaticAuth {
    /// An empty session table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` for `visitor`.
    #[must_use]
    pub fn with_session(self, token: impl Into<String>, visitor: VisitorId) -> Self {
        self.insert(token, visitor);
        self
    }

    /// Register `token` for `visitor` on a shared table.
    pub fn insert(&self, token: impl Into<String>, visitor: VisitorId) {
        self.sessions.write().insert(token.into(), visitor);
    }

    /// Forget `token`.
    pub fn revoke(&self, token: &str) {
        self.sessions.write().remove(token);
    }
}

impl AuthProvider for StaticAuth {
    fn resolve(&self, session_token: &str) -> Option<VisitorId> {
        self.sessions.read().get(session_token).cloned()
    }
}

/// In-process subscription list.
#[derive(Debug, Default)]
pub struct StaticPayments {
    premium: RwLock<HashSet<VisitorId>>,
    everyone: bool,
}

impl StaticPayments {
    /// Nobody is premium.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everybody is premium.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self {
            everyone: true,
            ..Self::default()
        }
    }

    /// Grant premium to `visitor`.
    pub fn grant(&self, visitor: VisitorId) {
        self.premium.write().insert(visitor);
    }

    /// Revoke premium from `visitor`.
    pub fn revoke(&self, visitor: &VisitorId) {
        self.premium.write().remove(visitor);
    }
}

impl PaymentProvider for StaticPayments {
    fn has_premium(&self, visitor: &VisitorId) -> bool {
        self.everyone || self.premium.read().contains(visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_auth_resolves_known_tokens_only() {
        let auth = StaticAuth::new().with_session("tok-1", VisitorId::new("ada"));
        assert_eq!(auth.resolve("tok-1"), Some(VisitorId::new("ada")));
        assert_eq!(auth.resolve("tok-2"), None);
        auth.revoke("tok-1");
        assert_eq!(auth.resolve("tok-1"), None);
    }

    #[test]
    fn premium_grants() {
        let payments = StaticPayments::new();
        let ada = VisitorId::new("ada");
        assert!(!payments.has_premium(&ada));
        payments.grant(ada.clone());
        assert!(payments.has_premium(&ada));
        assert!(StaticPayments::unrestricted().has_premium(&VisitorId::new("anyone")));
    }

    #[test]
    fn anonymous_ids_are_unique() {
        assert_ne!(VisitorId::anonymous(), VisitorId::anonymous());
    }
}
