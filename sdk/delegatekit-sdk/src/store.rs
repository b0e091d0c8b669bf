use delegatekit_state::{Address, Delegation, Passkey, Permission, SessionKey};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,
}

/// Explicit record store shared by the managers. Passed in at construction
/// so ownership and test isolation stay explicit; there is no process-wide
/// registry. Records are never physically deleted; revoked and expired rows
/// remain for audit.
pub trait GrantStore: Send + Sync {
    fn put_delegation(&self, record: Delegation) -> Result<(), StoreError>;
    fn delegation(&self, id: &Uuid) -> Result<Option<Delegation>, StoreError>;
    fn delegations_by_delegator(&self, delegator: &Address)
        -> Result<Vec<Delegation>, StoreError>;
    fn delegations_by_delegate(&self, delegate: &Address) -> Result<Vec<Delegation>, StoreError>;

    fn put_permission(&self, record: Permission) -> Result<(), StoreError>;
    fn permission(&self, id: &Uuid) -> Result<Option<Permission>, StoreError>;

    fn put_session_key(&self, record: SessionKey) -> Result<(), StoreError>;
    fn session_key(&self, id: &Uuid) -> Result<Option<SessionKey>, StoreError>;

    fn put_passkey(&self, record: Passkey) -> Result<(), StoreError>;
    fn passkey(&self, id: &Uuid) -> Result<Option<Passkey>, StoreError>;
}

/// In-memory store. Mutations go through the owning manager methods only,
/// so critical sections stay short and non-async.
#[derive(Default)]
pub struct InMemoryStore {
    delegations: RwLock<HashMap<Uuid, Delegation>>,
    permissions: RwLock<HashMap<Uuid, Permission>>,
    session_keys: RwLock<HashMap<Uuid, SessionKey>>,
    passkeys: RwLock<HashMap<Uuid, Passkey>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GrantStore for InMemoryStore {
    fn put_delegation(&self, record: Delegation) -> Result<(), StoreError> {
        let mut map = self.delegations.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(record.id, record);
        Ok(())
    }

    fn delegation(&self, id: &Uuid) -> Result<Option<Delegation>, StoreError> {
        let map = self.delegations.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(id).cloned())
    }

    fn delegations_by_delegator(
        &self,
        delegator: &Address,
    ) -> Result<Vec<Delegation>, StoreError> {
        let map = self.delegations.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .values()
            .filter(|d| d.delegator == *delegator)
            .cloned()
            .collect())
    }

    fn delegations_by_delegate(&self, delegate: &Address) -> Result<Vec<Delegation>, StoreError> {
        let map = self.delegations.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .values()
            .filter(|d| d.delegate == *delegate)
            .cloned()
            .collect())
    }

    fn put_permission(&self, record: Permission) -> Result<(), StoreError> {
        let mut map = self.permissions.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(record.id, record);
        Ok(())
    }

    fn permission(&self, id: &Uuid) -> Result<Option<Permission>, StoreError> {
        let map = self.permissions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(id).cloned())
    }

    fn put_session_key(&self, record: SessionKey) -> Result<(), StoreError> {
        let mut map = self.session_keys.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(record.id, record);
        Ok(())
    }

    fn session_key(&self, id: &Uuid) -> Result<Option<SessionKey>, StoreError> {
        let map = self.session_keys.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(id).cloned())
    }

    fn put_passkey(&self, record: Passkey) -> Result<(), StoreError> {
        let mut map = self.passkeys.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(record.id, record);
        Ok(())
    }

    fn passkey(&self, id: &Uuid) -> Result<Option<Passkey>, StoreError> {
        let map = self.passkeys.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(id).cloned())
    }
}
