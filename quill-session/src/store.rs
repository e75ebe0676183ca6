use std::sync::{Arc, PoisonError, RwLock};

use quill_core::{Actor, Credential};

use crate::error::StorageError;
use crate::storage::{MemoryStorage, Slot, TokenStorage};

/// Current credential pair plus the authenticated actor snapshot.
///
/// Tokens live in the durable [`TokenStorage`]; the actor is process-local and
/// re-fetched by `bootstrap` after a restart.
pub struct CredentialStore {
    storage: Box<dyn TokenStorage>,
    actor: RwLock<Option<Arc<Actor>>>,
}

impl CredentialStore {
    pub fn new(storage: impl TokenStorage) -> Self {
        Self::from_boxed(Box::new(storage))
    }

    pub fn from_boxed(storage: Box<dyn TokenStorage>) -> Self {
        Self {
            storage,
            actor: RwLock::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.get(Slot::AccessToken)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(Slot::RefreshToken)
    }

    /// The full pair, if both slots are populated.
    pub fn credential(&self) -> Option<Credential> {
        Some(Credential::new(self.access_token()?, self.refresh_token()?))
    }

    /// Write both slots. The refresh slot is written first so a reader never
    /// pairs a new access token with a refresh token that was already spent.
    pub fn set_credential(&self, credential: &Credential) -> Result<(), StorageError> {
        self.storage.set(Slot::RefreshToken, &credential.refresh)?;
        self.storage.set(Slot::AccessToken, &credential.access)
    }

    pub fn actor(&self) -> Option<Arc<Actor>> {
        self.actor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the actor snapshot wholesale, returning the stored snapshot.
    pub fn set_actor(&self, actor: Actor) -> Arc<Actor> {
        let actor = Arc::new(actor);
        *self.actor.write().unwrap_or_else(PoisonError::into_inner) = Some(actor.clone());
        actor
    }

    pub fn clear_actor(&self) {
        *self.actor.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Remove both slots and the actor. Both removals are attempted even if the
    /// first fails; the first error is returned.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.clear_actor();
        let access = self.storage.remove(Slot::AccessToken);
        let refresh = self.storage.remove(Slot::RefreshToken);
        access.and(refresh)
    }

    pub fn is_empty(&self) -> bool {
        self.access_token().is_none() && self.refresh_token().is_none() && self.actor().is_none()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("has_access", &self.access_token().is_some())
            .field("has_refresh", &self.refresh_token().is_some())
            .field("actor", &self.actor().map(|a| a.id.clone()))
            .finish()
    }
}
