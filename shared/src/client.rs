//! Client-related types shared between the HTTP client and its callers
//!
//! Auth and profile DTOs as the backend spells them (camelCase, except for
//! the `access_token` the auth endpoint returns).

use serde::{Deserialize, Serialize};

// =============================================================================
// Auth API DTOs
// =============================================================================

/// Login / register form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Captcha answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Captcha id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub grant_type: String,
}

impl LoginRequest {
    /// Password grant for the given account
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            grant_type: "password".to_string(),
            ..Self::default()
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_captcha(mut self, code: impl Into<String>, uuid: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self.uuid = Some(uuid.into());
        self
    }
}

/// Login response data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResult {
    pub access_token: String,
}

/// Captcha image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResult {
    #[serde(default)]
    pub captcha_enabled: bool,
    #[serde(default)]
    pub uuid: Option<String>,
    /// Base64 image
    #[serde(default)]
    pub img: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantVo {
    pub company_name: String,
    #[serde(default)]
    pub domain: Option<serde_json::Value>,
    pub tenant_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantInfo {
    /// Missing means enabled
    #[serde(default = "default_true")]
    pub tenant_enabled: bool,
    #[serde(default)]
    pub vo_list: Vec<TenantVo>,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Profile DTOs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSimple {
    pub user_id: serde_json::Value,
    pub user_name: String,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// `/system/user/getInfo` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub user: UserSimple,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}
