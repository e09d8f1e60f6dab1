//! Generic entity repository over the embedded store
//!
//! All four entity kinds share one CRUD shape, differing only by key prefix
//! and payload type, so persistence is implemented once, parameterized by
//! the [`Entity`] tag. Keys are `"{KIND}:{name}"` bytes in a single tree;
//! records are self-describing JSON documents. Absence of the key is the
//! not-found condition.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use tracing::debug;

use crate::error::{IamError, Result};
use crate::types::{Audit, Group, Policy, Role, User};

use super::Manager;

/// A persistable entity, tagged with its kind prefix
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Key prefix namespacing this kind within the shared store
    const KIND: &'static str;

    /// Unique name within the kind namespace
    fn name(&self) -> &str;

    /// Mutable access to the audit fields for stamping
    fn audit_mut(&mut self) -> &mut Audit;
}

impl Entity for User {
    const KIND: &'static str = "User";

    fn name(&self) -> &str {
        &self.name
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

impl Entity for Group {
    const KIND: &'static str = "Group";

    fn name(&self) -> &str {
        &self.name
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

impl Entity for Role {
    const KIND: &'static str = "Role";

    fn name(&self) -> &str {
        &self.name
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

impl Entity for Policy {
    const KIND: &'static str = "Policy";

    fn name(&self) -> &str {
        &self.name
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

/// Store key for an entity: kind prefix, separator, name
pub(crate) fn entity_key<T: Entity>(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(T::KIND.len() + 1 + name.len());
    key.extend_from_slice(T::KIND.as_bytes());
    key.push(b':');
    key.extend_from_slice(name.as_bytes());
    key
}

/// Scan prefix covering every record of a kind
pub(crate) fn entity_prefix<T: Entity>() -> Vec<u8> {
    let mut prefix = Vec::with_capacity(T::KIND.len() + 1);
    prefix.extend_from_slice(T::KIND.as_bytes());
    prefix.push(b':');
    prefix
}

/// Serialize a record inside a transaction, aborting on failure
pub(crate) fn encode<T: Serialize>(
    value: &T,
) -> std::result::Result<Vec<u8>, ConflictableTransactionError<IamError>> {
    serde_json::to_vec(value)
        .map_err(|e| ConflictableTransactionError::Abort(IamError::Serialization(e)))
}

/// Deserialize a record inside a transaction, aborting on failure
pub(crate) fn decode<T: DeserializeOwned>(
    bytes: &[u8],
) -> std::result::Result<T, ConflictableTransactionError<IamError>> {
    serde_json::from_slice(bytes)
        .map_err(|e| ConflictableTransactionError::Abort(IamError::Serialization(e)))
}

impl Manager {
    /// Insert a new entity, failing if the name is already taken
    pub(crate) fn add_entity<T: Entity>(&self, context: &User, mut entity: T) -> Result<T> {
        entity.audit_mut().stamp_created(&context.name);

        let name = entity.name().to_string();
        let key = entity_key::<T>(&name);
        let doc = serde_json::to_vec(&entity)?;

        self.tree()
            .transaction(|tx| -> ConflictableTransactionResult<(), IamError> {
                if tx.get(&key)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(
                        IamError::already_exists(T::KIND, &name),
                    ));
                }
                tx.insert(key.as_slice(), doc.as_slice())?;
                Ok(())
            })?;

        debug!(kind = T::KIND, name = %name, "entity added");
        Ok(entity)
    }

    /// Load an entity by name
    pub(crate) fn get_entity<T: Entity>(&self, name: &str) -> Result<T> {
        let bytes = self
            .tree()
            .get(entity_key::<T>(name))?
            .ok_or_else(|| IamError::not_found(T::KIND, name))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load every entity of a kind via prefix scan
    pub(crate) fn get_all_entities<T: Entity>(&self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for record in self.tree().scan_prefix(entity_prefix::<T>()) {
            let (_key, value) = record?;
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }

    /// Overwrite an existing entity, failing if it is absent
    pub(crate) fn update_entity<T: Entity>(&self, context: &User, mut entity: T) -> Result<T> {
        entity.audit_mut().stamp_updated(&context.name);

        let name = entity.name().to_string();
        let key = entity_key::<T>(&name);
        let doc = serde_json::to_vec(&entity)?;

        self.tree()
            .transaction(|tx| -> ConflictableTransactionResult<(), IamError> {
                if tx.get(&key)?.is_none() {
                    return Err(ConflictableTransactionError::Abort(IamError::not_found(
                        T::KIND,
                        &name,
                    )));
                }
                tx.insert(key.as_slice(), doc.as_slice())?;
                Ok(())
            })?;

        debug!(kind = T::KIND, name = %name, "entity updated");
        Ok(entity)
    }

    /// Soft-delete an entity: stamp the deletion, keep the record
    pub(crate) fn delete_entity<T: Entity>(&self, context: &User, name: &str) -> Result<T> {
        let key = entity_key::<T>(name);
        let actor = context.name.clone();

        let deleted = self
            .tree()
            .transaction(|tx| -> ConflictableTransactionResult<T, IamError> {
                let bytes = tx.get(&key)?.ok_or_else(|| {
                    ConflictableTransactionError::Abort(IamError::not_found(T::KIND, name))
                })?;
                let mut entity: T = decode(&bytes)?;
                entity.audit_mut().stamp_deleted(&actor);
                tx.insert(key.as_slice(), encode(&entity)?)?;
                Ok(entity)
            })?;

        debug!(kind = T::KIND, name, "entity soft-deleted");
        Ok(deleted)
    }
}
