//! In-process stores for tests and `STORE_BACKEND=memory` local runs.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{
    auth::{
        repo::{UserStore, EMAIL_TAKEN},
        repo_types::{User, UserChanges, UserProfile},
    },
    error::StoreError,
    journals::{
        repo::JournalStore,
        repo_types::{JournalChanges, JournalEntry},
    },
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.read().await.get(user_id).map(User::profile))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.into()));
        }
        if users.contains_key(&user.user_id) {
            return Err(StoreError::Conflict("user id already exists".into()));
        }
        users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn update(&self, user_id: &str, changes: &UserChanges) -> Result<UserProfile, StoreError> {
        let mut users = self.users.write().await;
        if let Some(email) = &changes.email {
            if users.values().any(|u| &u.email == email && u.user_id != user_id) {
                return Err(StoreError::Conflict(EMAIL_TAKEN.into()));
            }
        }
        let user = users.get_mut(user_id).ok_or(StoreError::NotFound)?;
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(hash) = &changes.password_hash {
            user.password_hash = hash.clone();
        }
        Ok(user.profile())
    }

    async fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        self.users
            .write()
            .await
            .remove(user_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

/// Partition key → (sort key → entry), mirroring the table layout.
#[derive(Default)]
pub struct MemoryJournalStore {
    partitions: RwLock<HashMap<String, BTreeMap<String, JournalEntry>>>,
}

#[async_trait]
impl JournalStore for MemoryJournalStore {
    async fn create(&self, entry: JournalEntry) -> Result<JournalEntry, StoreError> {
        let mut partitions = self.partitions.write().await;
        let partition = partitions.entry(entry.user_id.clone()).or_default();
        if partition.contains_key(&entry.entry_id) {
            return Err(StoreError::Conflict("entry id already exists".into()));
        }
        partition.insert(entry.entry_id.clone(), entry.clone());
        Ok(entry)
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<JournalEntry>, StoreError> {
        Ok(self
            .partitions
            .read()
            .await
            .get(user_id)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, user_id: &str, entry_id: &str) -> Result<JournalEntry, StoreError> {
        self.partitions
            .read()
            .await
            .get(user_id)
            .and_then(|p| p.get(entry_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        user_id: &str,
        entry_id: &str,
        changes: &JournalChanges,
    ) -> Result<JournalEntry, StoreError> {
        let mut partitions = self.partitions.write().await;
        let entry = partitions
            .get_mut(user_id)
            .and_then(|p| p.get_mut(entry_id))
            .ok_or(StoreError::NotFound)?;
        entry.apply(changes, OffsetDateTime::now_utc());
        Ok(entry.clone())
    }

    async fn delete(&self, user_id: &str, entry_id: &str) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write().await;
        let partition = partitions.get_mut(user_id).ok_or(StoreError::NotFound)?;
        partition.remove(entry_id).ok_or(StoreError::NotFound)?;
        if partition.is_empty() {
            partitions.remove(user_id);
        }
        Ok(())
    }

    async fn delete_all_for_owner(&self, user_id: &str) -> Result<usize, StoreError> {
        Ok(self
            .partitions
            .write()
            .await
            .remove(user_id)
            .map(|p| p.len())
            .unwrap_or(0))
    }
}
