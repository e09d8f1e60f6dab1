//! Policy evaluation: combine pattern matches into a single decision
//!
//! The evaluator is a pure function over an already-resolved policy list;
//! it performs no I/O and is testable without the store.

use tracing::debug;

use crate::error::Result;
use crate::matcher::RegexMatcher;
use crate::types::{Effect, Policy};

/// Evaluate a policy set against a requested action and resource
///
/// A policy matches when the resource matches any of its resource patterns
/// and the action matches any of its action patterns. Policies are scanned
/// in caller-supplied order. Combination rule: explicit deny overrides
/// allow — any matching Deny policy decides the outcome; otherwise the
/// first matching Allow policy does; with no match the decision is Deny
/// and no policy is returned.
pub fn evaluate<'a>(
    matcher: &RegexMatcher,
    policies: &'a [Policy],
    action: &str,
    resource: &str,
) -> Result<(Effect, Option<&'a Policy>)> {
    let mut allowed: Option<&Policy> = None;

    for policy in policies {
        if !matcher.matches(&policy.resources, resource)? {
            continue;
        }
        if !matcher.matches(&policy.actions, action)? {
            continue;
        }

        match policy.effect {
            Effect::Deny => {
                debug!(policy = %policy.name, action, resource, "explicit deny");
                return Ok((Effect::Deny, Some(policy)));
            }
            Effect::Allow => {
                if allowed.is_none() {
                    allowed = Some(policy);
                }
            }
        }
    }

    match allowed {
        Some(policy) => Ok((Effect::Allow, Some(policy))),
        None => Ok((Effect::Deny, None)),
    }
}
