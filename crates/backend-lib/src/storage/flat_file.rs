//! Flat-file credential store: one JSON document rewritten atomically on every change.
use std::{
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smartfarm_common::AccountId;
use tokio::{fs as tokio_fs, sync::Mutex};

use super::{Account, CredentialStore, NewAccount, StoreError};

const ACCOUNTS_FILE: &str = "accounts.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountsDocument {
    next_id: AccountId,
    accounts: Vec<Account>,
}

impl Default for AccountsDocument {
    fn default() -> Self {
        Self {
            next_id: 1,
            accounts: Vec::new(),
        }
    }
}

impl AccountsDocument {
    fn position_by_email(&self, email: &str) -> Option<usize> {
        self.accounts.iter().position(|a| a.email == email)
    }

    fn position_by_id(&self, id: AccountId) -> Option<usize> {
        self.accounts.iter().position(|a| a.id == id)
    }
}

/// Flat-file implementation of `CredentialStore`.
///
/// The document is cached behind a mutex; every mutation writes a temp file and
/// renames it over `accounts.json`, and only touches the cache once that succeeded.
#[derive(Debug)]
pub struct FlatFileStore {
    path: PathBuf,
    doc: Mutex<AccountsDocument>,
}

impl FlatFileStore {
    /// Open (or create) the store under `root`
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let path = root.join(ACCOUNTS_FILE);

        let doc = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            AccountsDocument::default()
        };

        tracing::debug!(path = %path.display(), accounts = doc.accounts.len(), "opened account file");
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    async fn persist(&self, doc: &AccountsDocument) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio_fs::write(&tmp, json).await?;
        tokio_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Apply `change` to a copy, persist it, then swap it in
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut AccountsDocument) -> Result<Option<T>, StoreError>,
    ) -> Result<Option<T>, StoreError> {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        let out = change(&mut next)?;
        if out.is_some() {
            self.persist(&next).await?;
            *doc = next;
        }
        Ok(out)
    }
}

#[async_trait]
impl CredentialStore for FlatFileStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let doc = self.doc.lock().await;
        Ok(doc.position_by_email(email).map(|i| doc.accounts[i].clone()))
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let doc = self.doc.lock().await;
        Ok(doc.position_by_id(id).map(|i| doc.accounts[i].clone()))
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let inserted = self
            .mutate(|doc| {
                if doc.position_by_email(&account.email).is_some() {
                    return Err(StoreError::DuplicateEmail(account.email.clone()));
                }
                let stored = Account {
                    id: doc.next_id,
                    email: account.email.clone(),
                    password_hash: account.password_hash.clone(),
                    birth_date: account.birth_date,
                    created_at: account.created_at,
                };
                doc.next_id += 1;
                doc.accounts.push(stored.clone());
                Ok(Some(stored))
            })
            .await?;
        inserted.ok_or_else(|| StoreError::Unavailable("insert produced no row".into()))
    }

    async fn update_hash_by_email(&self, email: &str, hash: &str) -> Result<bool, StoreError> {
        let updated = self
            .mutate(|doc| {
                Ok(doc.position_by_email(email).map(|i| {
                    doc.accounts[i].password_hash = hash.to_string();
                }))
            })
            .await?;
        Ok(updated.is_some())
    }

    async fn update_hash_by_id(&self, id: AccountId, hash: &str) -> Result<bool, StoreError> {
        let updated = self
            .mutate(|doc| {
                Ok(doc.position_by_id(id).map(|i| {
                    doc.accounts[i].password_hash = hash.to_string();
                }))
            })
            .await?;
        Ok(updated.is_some())
    }

    async fn delete_by_id(&self, id: AccountId) -> Result<bool, StoreError> {
        let removed = self
            .mutate(|doc| Ok(doc.position_by_id(id).map(|i| doc.accounts.remove(i))))
            .await?;
        Ok(removed.is_some())
    }
}
