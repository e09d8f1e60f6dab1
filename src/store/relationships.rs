//! Attach and detach operations for role relationships
//!
//! Every relationship is stored on both sides: the role holds the forward
//! set (`policies`, `users`, `groups`) and each target holds the back set
//! (`roles`). One call updates both views inside a single store
//! transaction, so the bidirectional invariant holds after every commit:
//! the role's forward set contains the target exactly when the target's
//! back set contains the role.
//!
//! Validation is all-or-nothing: the role and every named target must
//! exist before any write is issued. A missing name aborts the whole call
//! with NotFound and no mutation is observable, including for targets
//! already found to be valid.

use std::collections::BTreeSet;

use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use tracing::debug;

use crate::error::{IamError, Result};
use crate::types::{Group, Policy, Role, User};

use super::repository::{decode, encode, entity_key, Entity};
use super::Manager;

/// Direction of a relationship mutation
#[derive(Clone, Copy, PartialEq, Eq)]
enum LinkOp {
    Attach,
    Detach,
}

impl Manager {
    /// Attach policies to a role
    ///
    /// Adds each policy name to the role's `policies` set and the role name
    /// to each policy's `roles` set. Re-attaching an already-attached
    /// policy is a no-op.
    pub fn attach_policies_to_role(
        &self,
        context: &User,
        role_name: &str,
        policy_names: &[&str],
    ) -> Result<Role> {
        self.link_role::<Policy>(
            context,
            role_name,
            policy_names,
            LinkOp::Attach,
            |role| &mut role.policies,
            |policy| &mut policy.roles,
        )
    }

    /// Detach policies from a role; detaching a non-member is a no-op
    pub fn detach_policies_from_role(
        &self,
        context: &User,
        role_name: &str,
        policy_names: &[&str],
    ) -> Result<Role> {
        self.link_role::<Policy>(
            context,
            role_name,
            policy_names,
            LinkOp::Detach,
            |role| &mut role.policies,
            |policy| &mut policy.roles,
        )
    }

    /// Attach a role to users
    pub fn attach_role_to_users(
        &self,
        context: &User,
        role_name: &str,
        user_names: &[&str],
    ) -> Result<Role> {
        self.link_role::<User>(
            context,
            role_name,
            user_names,
            LinkOp::Attach,
            |role| &mut role.users,
            |user| &mut user.roles,
        )
    }

    /// Detach a role from users; detaching a non-member is a no-op
    pub fn detach_role_from_users(
        &self,
        context: &User,
        role_name: &str,
        user_names: &[&str],
    ) -> Result<Role> {
        self.link_role::<User>(
            context,
            role_name,
            user_names,
            LinkOp::Detach,
            |role| &mut role.users,
            |user| &mut user.roles,
        )
    }

    /// Attach a role to groups
    pub fn attach_role_to_groups(
        &self,
        context: &User,
        role_name: &str,
        group_names: &[&str],
    ) -> Result<Role> {
        self.link_role::<Group>(
            context,
            role_name,
            group_names,
            LinkOp::Attach,
            |role| &mut role.groups,
            |group| &mut group.roles,
        )
    }

    /// Detach a role from groups; detaching a non-member is a no-op
    pub fn detach_role_from_groups(
        &self,
        context: &User,
        role_name: &str,
        group_names: &[&str],
    ) -> Result<Role> {
        self.link_role::<Group>(
            context,
            role_name,
            group_names,
            LinkOp::Detach,
            |role| &mut role.groups,
            |group| &mut group.roles,
        )
    }

    /// Shared attach/detach shape: validate everything, then mutate both
    /// sides of the relationship inside one transaction.
    fn link_role<T: Entity>(
        &self,
        context: &User,
        role_name: &str,
        target_names: &[&str],
        op: LinkOp,
        forward: fn(&mut Role) -> &mut BTreeSet<String>,
        back: fn(&mut T) -> &mut BTreeSet<String>,
    ) -> Result<Role> {
        let role_key = entity_key::<Role>(role_name);
        let actor = context.name.clone();

        let role = self
            .tree()
            .transaction(|tx| -> ConflictableTransactionResult<Role, IamError> {
                let role_bytes = tx.get(&role_key)?.ok_or_else(|| {
                    ConflictableTransactionError::Abort(IamError::not_found(Role::KIND, role_name))
                })?;
                let mut role: Role = decode(&role_bytes)?;

                // Validate every target up front; any missing name aborts
                // before a single write happens.
                let mut targets: Vec<(Vec<u8>, T)> = Vec::with_capacity(target_names.len());
                for &target_name in target_names {
                    let key = entity_key::<T>(target_name);
                    let bytes = tx.get(&key)?.ok_or_else(|| {
                        ConflictableTransactionError::Abort(IamError::not_found(
                            T::KIND,
                            target_name,
                        ))
                    })?;
                    targets.push((key, decode(&bytes)?));
                }

                for (_, target) in targets.iter_mut() {
                    let target_name = target.name().to_string();
                    match op {
                        LinkOp::Attach => {
                            forward(&mut role).insert(target_name);
                            back(target).insert(role_name.to_string());
                        }
                        LinkOp::Detach => {
                            forward(&mut role).remove(target_name.as_str());
                            back(target).remove(role_name);
                        }
                    }
                    target.audit_mut().stamp_updated(&actor);
                }

                role.audit_mut().stamp_updated(&actor);
                tx.insert(role_key.as_slice(), encode(&role)?)?;
                for (key, target) in &targets {
                    tx.insert(key.as_slice(), encode(target)?)?;
                }

                Ok(role)
            })?;

        debug!(
            role = role_name,
            kind = T::KIND,
            targets = target_names.len(),
            attach = matches!(op, LinkOp::Attach),
            "relationship updated"
        );
        Ok(role)
    }
}
