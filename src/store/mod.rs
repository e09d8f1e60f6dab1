//! Entity and relationship persistence
//!
//! [`Manager`] owns one handle to the embedded store, opened at a
//! configured directory and closed when the manager is dropped. Every
//! operation runs as a single store transaction; sled serializes
//! conflicting transactions on the shared tree, so concurrent calls never
//! observe a half-applied attach or detach.

pub mod relationships;
pub mod repository;

use std::path::Path;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use tracing::info;

use crate::error::{IamError, Result};
use crate::types::{Group, Policy, Role, User};

pub use repository::Entity;

/// Persistence manager for users, groups, roles, and policies
pub struct Manager {
    db: sled::Db,
}

impl Manager {
    /// Open (or create) the store rooted at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        info!(path = %path.display(), "store opened");
        Ok(Self { db })
    }

    /// Bootstrap principal for initial administrative calls
    pub fn system_user() -> User {
        User::new("System")
    }

    fn tree(&self) -> &sled::Tree {
        &self.db
    }

    // Users

    /// Add a user, hashing the supplied password into its credential hash
    pub fn add_user(&self, context: &User, mut user: User, password: &str) -> Result<User> {
        user.secret_hash = hash_password(password)?;
        self.add_entity(context, user)
    }

    /// Get a user by name
    pub fn get_user(&self, _context: &User, name: &str) -> Result<User> {
        self.get_entity(name)
    }

    /// Get all users
    pub fn get_all_users(&self, _context: &User) -> Result<Vec<User>> {
        self.get_all_entities()
    }

    /// Update an existing user
    pub fn update_user(&self, context: &User, user: User) -> Result<User> {
        self.update_entity(context, user)
    }

    /// Soft-delete a user
    pub fn delete_user(&self, context: &User, name: &str) -> Result<User> {
        self.delete_entity(context, name)
    }

    /// Check a candidate password against a user's stored credential hash
    pub fn verify_user_password(&self, name: &str, password: &str) -> Result<bool> {
        let user: User = self.get_entity(name)?;
        Ok(verify_password(&user.secret_hash, password))
    }

    // Groups

    /// Add a group
    pub fn add_group(
        &self,
        context: &User,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Group> {
        let mut group = Group::new(name);
        group.description = description.into();
        self.add_entity(context, group)
    }

    /// Get a group by name
    pub fn get_group(&self, _context: &User, name: &str) -> Result<Group> {
        self.get_entity(name)
    }

    /// Get all groups
    pub fn get_all_groups(&self, _context: &User) -> Result<Vec<Group>> {
        self.get_all_entities()
    }

    /// Update an existing group
    pub fn update_group(&self, context: &User, group: Group) -> Result<Group> {
        self.update_entity(context, group)
    }

    /// Soft-delete a group
    pub fn delete_group(&self, context: &User, name: &str) -> Result<Group> {
        self.delete_entity(context, name)
    }

    // Roles

    /// Add a role
    pub fn add_role(
        &self,
        context: &User,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Role> {
        let mut role = Role::new(name);
        role.description = description.into();
        self.add_entity(context, role)
    }

    /// Get a role by name
    pub fn get_role(&self, _context: &User, name: &str) -> Result<Role> {
        self.get_entity(name)
    }

    /// Get all roles
    pub fn get_all_roles(&self, _context: &User) -> Result<Vec<Role>> {
        self.get_all_entities()
    }

    /// Update an existing role
    pub fn update_role(&self, context: &User, role: Role) -> Result<Role> {
        self.update_entity(context, role)
    }

    /// Soft-delete a role
    pub fn delete_role(&self, context: &User, name: &str) -> Result<Role> {
        self.delete_entity(context, name)
    }

    // Policies

    /// Add a policy
    pub fn add_policy(&self, context: &User, policy: Policy) -> Result<Policy> {
        self.add_entity(context, policy)
    }

    /// Get a policy by name
    pub fn get_policy(&self, _context: &User, name: &str) -> Result<Policy> {
        self.get_entity(name)
    }

    /// Get all policies
    pub fn get_all_policies(&self, _context: &User) -> Result<Vec<Policy>> {
        self.get_all_entities()
    }

    /// Update an existing policy
    pub fn update_policy(&self, context: &User, policy: Policy) -> Result<Policy> {
        self.update_entity(context, policy)
    }

    /// Soft-delete a policy
    pub fn delete_policy(&self, context: &User, name: &str) -> Result<Policy> {
        self.delete_entity(context, name)
    }

    /// Resolve the effective policy set for a user
    ///
    /// Collects the user's own roles plus the roles of every group the
    /// user belongs to, then loads each role's attached policies,
    /// deduplicated by name. Roles granted through a disabled group are
    /// skipped.
    pub fn effective_policies(&self, context: &User, user: &User) -> Result<Vec<Policy>> {
        let mut role_names = user.roles.clone();
        for group in self.get_all_entities::<Group>()? {
            if group.enabled && group.users.contains(&user.name) {
                role_names.extend(group.roles.iter().cloned());
            }
        }

        let mut policies: std::collections::BTreeMap<String, Policy> =
            std::collections::BTreeMap::new();
        for role_name in &role_names {
            let role: Role = self.get_role(context, role_name)?;
            for policy_name in &role.policies {
                if !policies.contains_key(policy_name) {
                    policies.insert(policy_name.clone(), self.get_policy(context, policy_name)?);
                }
            }
        }

        Ok(policies.into_values().collect())
    }
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| IamError::Credential(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| IamError::Credential(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| IamError::Credential(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
