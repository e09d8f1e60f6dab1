//! Authorization engine facade
//!
//! Composes the relationship manager's policy resolution with the pure
//! evaluator and wraps the outcome in a [`Decision`] suitable for audit
//! logging by the surrounding service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::evaluator::evaluate;
use crate::matcher::{MatcherConfig, RegexMatcher};
use crate::store::Manager;
use crate::types::Effect;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pattern matcher configuration (delimiters, cache capacity)
    pub matcher: MatcherConfig,

    /// Decision when no policy matches the request
    pub default_decision: Effect,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            default_decision: Effect::Deny,
        }
    }
}

/// Authorization decision with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique decision identifier
    pub id: String,

    /// Whether the request is allowed
    pub allowed: bool,

    /// Name of the policy that decided, or "default" when none matched
    pub policy: String,

    /// Reason for the decision
    pub reason: String,

    /// Decision timestamp
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    fn new(allowed: bool, policy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            allowed,
            policy: policy.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Allow decision
    pub fn allow(policy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(true, policy, reason)
    }

    /// Deny decision
    pub fn deny(policy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(false, policy, reason)
    }
}

/// Authorization engine: resolves a principal's policies and decides
pub struct AuthEngine {
    manager: Manager,
    matcher: RegexMatcher,
    config: EngineConfig,
}

impl AuthEngine {
    /// Create an engine over an opened store
    pub fn new(manager: Manager, config: EngineConfig) -> Self {
        let matcher = RegexMatcher::new(config.matcher);
        Self {
            manager,
            matcher,
            config,
        }
    }

    /// The underlying persistence manager, for administrative callers
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// The shared pattern matcher
    pub fn matcher(&self) -> &RegexMatcher {
        &self.matcher
    }

    /// Decide whether `principal` may perform `action` on `resource`
    ///
    /// Loads the principal, resolves its effective policy set through role
    /// and group membership, and evaluates with explicit-deny-overrides-
    /// allow semantics. A disabled or soft-deleted principal is denied
    /// without evaluating policies.
    pub fn authorize(&self, principal: &str, action: &str, resource: &str) -> Result<Decision> {
        let context = Manager::system_user();
        let user = self.manager.get_user(&context, principal)?;

        if !user.enabled || user.audit.deleted.is_some() {
            let decision = Decision::deny("default", format!("principal {principal:?} is disabled"));
            info!(principal, action, resource, decision = "DENY", "principal disabled");
            return Ok(decision);
        }

        let policies = self.manager.effective_policies(&context, &user)?;
        debug!(
            principal,
            action,
            resource,
            policies = policies.len(),
            "resolved effective policies"
        );

        let decision = match evaluate(&self.matcher, &policies, action, resource)? {
            (Effect::Deny, Some(policy)) => Decision::deny(
                &policy.name,
                format!("policy {:?} denies {action:?} on {resource:?}", policy.name),
            ),
            (Effect::Allow, Some(policy)) => Decision::allow(
                &policy.name,
                format!("policy {:?} allows {action:?} on {resource:?}", policy.name),
            ),
            (_, None) => match self.config.default_decision {
                Effect::Allow => Decision::allow("default", "no matching policy, default allow"),
                Effect::Deny => Decision::deny("default", "no matching policy, default deny"),
            },
        };

        info!(
            principal,
            action,
            resource,
            decision = if decision.allowed { "ALLOW" } else { "DENY" },
            policy = %decision.policy,
            "authorization decision"
        );
        Ok(decision)
    }
}
