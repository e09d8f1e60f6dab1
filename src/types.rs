//! Core entity types: users, groups, roles, and policies
//!
//! Each entity is unique by name within its own kind namespace and carries
//! audit fields stamped with the acting principal on every mutation.
//! Relationship sets are `BTreeSet`s: inserts and removes are idempotent and
//! iteration order is deterministic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The outcome a policy asserts for a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Deny the action (overrides any matching allow)
    Deny,
}

/// Audit and soft-delete lifecycle fields shared by every entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    /// Creation time
    pub created: DateTime<Utc>,

    /// Principal that created the entity
    pub created_by: String,

    /// Last update time
    pub updated: DateTime<Utc>,

    /// Principal that performed the last update
    pub updated_by: String,

    /// Soft-delete time, if the entity has been deleted
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deleted: Option<DateTime<Utc>>,

    /// Principal that deleted the entity
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deleted_by: Option<String>,
}

impl Audit {
    pub(crate) fn stamp_created(&mut self, actor: &str) {
        let now = Utc::now();
        self.created = now;
        self.updated = now;
        self.created_by = actor.to_string();
        self.updated_by = actor.to_string();
    }

    pub(crate) fn stamp_updated(&mut self, actor: &str) {
        self.updated = Utc::now();
        self.updated_by = actor.to_string();
    }

    pub(crate) fn stamp_deleted(&mut self, actor: &str) {
        self.deleted = Some(Utc::now());
        self.deleted_by = Some(actor.to_string());
        self.stamp_updated(actor);
    }
}

/// A user in the system
///
/// Users are granted roles directly or through group membership. They are
/// soft-deleted, never hard-removed while referenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user name
    pub name: String,

    /// Whether the user may be authorized at all
    pub enabled: bool,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Credential hash in PHC string format
    #[serde(default)]
    pub secret_hash: String,

    #[serde(flatten)]
    pub audit: Audit,

    /// Names of roles granted to this user (back view of `Role::users`)
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl User {
    /// Create a new enabled user
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            description: String::new(),
            secret_hash: String::new(),
            audit: Audit::default(),
            roles: BTreeSet::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A named collection of users that can be granted roles together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Unique group name
    pub name: String,

    /// Whether the group's grants are active
    pub enabled: bool,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    #[serde(flatten)]
    pub audit: Audit,

    /// Names of member users
    #[serde(default)]
    pub users: BTreeSet<String>,

    /// Names of roles granted to this group (back view of `Role::groups`)
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Group {
    /// Create a new enabled group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            description: String::new(),
            audit: Audit::default(),
            users: BTreeSet::new(),
            roles: BTreeSet::new(),
        }
    }
}

/// A role bundles policies and is attached to users and groups
///
/// The three sets on the role are the authoritative forward view of each
/// relationship; the matching `roles` sets on User, Group, and Policy are
/// the back view. Attach and detach update both views in one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique role name
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    #[serde(flatten)]
    pub audit: Audit,

    /// Names of policies attached to this role
    #[serde(default)]
    pub policies: BTreeSet<String>,

    /// Names of users this role is attached to
    #[serde(default)]
    pub users: BTreeSet<String>,

    /// Names of groups this role is attached to
    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl Role {
    /// Create a new role
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            audit: Audit::default(),
            policies: BTreeSet::new(),
            users: BTreeSet::new(),
            groups: BTreeSet::new(),
        }
    }
}

/// An authorization policy
///
/// A policy declares an effect plus resource and action patterns. Each
/// pattern is either a literal (matched by exact equality only) or contains
/// one or more delimited regular-expression segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy name
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Whether a match allows or denies the request
    pub effect: Effect,

    /// Resource patterns
    #[serde(default)]
    pub resources: Vec<String>,

    /// Action patterns
    #[serde(default)]
    pub actions: Vec<String>,

    #[serde(flatten)]
    pub audit: Audit,

    /// Names of roles this policy is attached to (back view of `Role::policies`)
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Policy {
    /// Create a new policy with the given effect
    pub fn new(name: impl Into<String>, effect: Effect) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            effect,
            resources: Vec::new(),
            actions: Vec::new(),
            audit: Audit::default(),
            roles: BTreeSet::new(),
        }
    }

    /// Add a resource pattern
    pub fn with_resource(mut self, pattern: impl Into<String>) -> Self {
        self.resources.push(pattern.into());
        self
    }

    /// Add an action pattern
    pub fn with_action(mut self, pattern: impl Into<String>) -> Self {
        self.actions.push(pattern.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
