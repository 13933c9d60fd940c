//! User identity records and their store

use std::collections::HashMap;

use grpc_auth::Role;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::security::password::{self, PasswordError};

/// One identity record. The password is only ever held as an Argon2id hash.
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    password_hash: String,
    pub role: Role,
}

impl User {
    pub fn new(username: &str, raw_password: &str, role: Role) -> Result<Self, PasswordError> {
        Ok(Self {
            username: username.to_string(),
            password_hash: password::hash_password(raw_password)?,
            role,
        })
    }

    pub fn is_correct_password(&self, raw_password: &str) -> Result<bool, PasswordError> {
        password::verify_password(raw_password, &self.password_hash)
    }
}

/// Concurrency-safe user store keyed by username.
#[derive(Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a new identity; a duplicate username is an error, never an
    /// overwrite.
    pub async fn save(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.username) {
            return Err(StoreError::AlreadyExists);
        }

        users.insert(user.username.clone(), user);
        Ok(())
    }

    pub async fn find(&self, username: &str) -> Option<User> {
        let users = self.users.read().await;
        users.get(username).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let store = UserStore::new();
        let user = User::new("admin1", "admin1", Role::Admin).unwrap();
        store.save(user).await.unwrap();

        let found = store.find("admin1").await.expect("user should exist");
        assert_eq!(found.role, Role::Admin);
        assert!(found.is_correct_password("admin1").unwrap());
        assert!(!found.is_correct_password("wrong").unwrap());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = UserStore::new();
        store
            .save(User::new("user1", "user1", Role::User).unwrap())
            .await
            .unwrap();

        let result = store
            .save(User::new("user1", "other", Role::Admin).unwrap())
            .await;
        assert_eq!(result, Err(StoreError::AlreadyExists));

        // Original record survives the rejected overwrite.
        let found = store.find("user1").await.unwrap();
        assert_eq!(found.role, Role::User);
    }

    #[tokio::test]
    async fn unknown_username_is_none() {
        let store = UserStore::new();
        assert!(store.find("ghost").await.is_none());
    }
}
