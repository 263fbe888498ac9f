//! In-memory credential store.
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use smartfarm_common::AccountId;

use super::{Account, CredentialStore, NewAccount, StoreError};

/// Accounts held in process memory. The email index is claimed through the
/// `DashMap` entry API, so concurrent registrations of one email cannot both win.
#[derive(Debug)]
pub struct MemoryStore {
    accounts: DashMap<AccountId, Account>,
    by_email: DashMap<String, AccountId>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            by_email: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn id_for(&self, email: &str) -> Option<AccountId> {
        self.by_email.get(email).map(|id| *id)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .id_for(email)
            .and_then(|id| self.accounts.get(&id).map(|a| a.value().clone())))
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|a| a.value().clone()))
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        match self.by_email.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail(account.email)),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let stored = Account {
                    id,
                    email: account.email,
                    password_hash: account.password_hash,
                    birth_date: account.birth_date,
                    created_at: account.created_at,
                };
                self.accounts.insert(id, stored.clone());
                slot.insert(id);
                Ok(stored)
            }
        }
    }

    async fn update_hash_by_email(&self, email: &str, hash: &str) -> Result<bool, StoreError> {
        match self.id_for(email) {
            Some(id) => self.update_hash_by_id(id, hash).await,
            None => Ok(false),
        }
    }

    async fn update_hash_by_id(&self, id: AccountId, hash: &str) -> Result<bool, StoreError> {
        match self.accounts.get_mut(&id) {
            Some(mut account) => {
                account.password_hash = hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: AccountId) -> Result<bool, StoreError> {
        match self.accounts.remove(&id) {
            Some((_, account)) => {
                self.by_email.remove(&account.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
