//! Session store
//!
//! Token, roles and permissions of the signed-in user. The pipeline only
//! sees the [`SessionStore`] trait, so tests can swap in their own.

use crate::storage::KvStorage;
use std::sync::Arc;

pub const TOKEN_KEY: &str = "User-Token";
pub const ROLES_KEY: &str = "User-Roles";
pub const PERMISSIONS_KEY: &str = "User-Permissions";
/// Token key of the previous admin UI, cleared together with ours
pub const LEGACY_TOKEN_KEY: &str = "oldAdminToken";

pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str);
    fn clear_token(&self);
    /// `None` removes the field, `Some` replaces it wholesale
    fn set_auth_info(&self, roles: Option<&[String]>, permissions: Option<&[String]>);
    fn roles(&self) -> Vec<String>;
    fn permissions(&self) -> Vec<String>;
}

/// Session persisted in a [`KvStorage`]
pub struct StorageSession<S: KvStorage + ?Sized> {
    storage: Arc<S>,
}

impl<S: KvStorage + ?Sized> StorageSession<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    fn read_list(&self, key: &str) -> Vec<String> {
        let Some(raw) = self.storage.get_item(key) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Corrupt session entry, ignoring");
            Vec::new()
        })
    }

    fn write_list(&self, key: &str, values: Option<&[String]>) {
        match values {
            Some(values) => match serde_json::to_string(values) {
                Ok(json) => self.storage.set_item(key, &json),
                Err(e) => tracing::error!(key, error = %e, "Failed to encode session entry"),
            },
            None => self.storage.remove_item(key),
        }
    }
}

impl<S: KvStorage + ?Sized> SessionStore for StorageSession<S> {
    fn token(&self) -> Option<String> {
        self.storage.get_item(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    fn set_token(&self, token: &str) {
        self.storage.set_item(TOKEN_KEY, token);
    }

    fn clear_token(&self) {
        self.storage.remove_item(TOKEN_KEY);
        self.storage.remove_item(LEGACY_TOKEN_KEY);
    }

    fn set_auth_info(&self, roles: Option<&[String]>, permissions: Option<&[String]>) {
        self.write_list(ROLES_KEY, roles);
        self.write_list(PERMISSIONS_KEY, permissions);
    }

    fn roles(&self) -> Vec<String> {
        self.read_list(ROLES_KEY)
    }

    fn permissions(&self) -> Vec<String> {
        self.read_list(PERMISSIONS_KEY)
    }
}

/// "Remember me" credentials of the login form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RememberedLogin {
    pub tenant_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub remember_me: bool,
}

impl RememberedLogin {
    const TENANT_KEY: &'static str = "tenantId";
    const USERNAME_KEY: &'static str = "username";
    const PASSWORD_KEY: &'static str = "password";
    const REMEMBER_KEY: &'static str = "rememberMe";

    pub fn load(storage: &dyn KvStorage) -> Self {
        Self {
            tenant_id: storage.get_item(Self::TENANT_KEY),
            username: storage.get_item(Self::USERNAME_KEY),
            password: storage.get_item(Self::PASSWORD_KEY),
            remember_me: storage
                .get_item(Self::REMEMBER_KEY)
                .is_some_and(|v| v == "true"),
        }
    }

    /// Save when `remember_me` is set, otherwise forget
    pub fn save(&self, storage: &dyn KvStorage) {
        if !self.remember_me {
            Self::forget(storage);
            return;
        }
        let fields = [
            (Self::TENANT_KEY, &self.tenant_id),
            (Self::USERNAME_KEY, &self.username),
            (Self::PASSWORD_KEY, &self.password),
        ];
        for (key, value) in fields {
            match value {
                Some(v) => storage.set_item(key, v),
                None => storage.remove_item(key),
            }
        }
        storage.set_item(Self::REMEMBER_KEY, "true");
    }

    pub fn forget(storage: &dyn KvStorage) {
        for key in [
            Self::TENANT_KEY,
            Self::USERNAME_KEY,
            Self::PASSWORD_KEY,
            Self::REMEMBER_KEY,
        ] {
            storage.remove_item(key);
        }
    }
}
