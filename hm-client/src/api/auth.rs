//! Auth endpoints and the sign-in / sign-out flows

use crate::api::user;
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpClient, RequestOptions};
use crate::session::RememberedLogin;
use crate::storage::KvStorage;
use crate::ui::keys;
use serde_json::Value;
use shared::client::{LoginRequest, LoginResult, TenantInfo, UserInfo, VerifyCodeResult};
use std::sync::Arc;
use std::time::Duration;

/// Captcha endpoint is slow on cold start
const CAPTCHA_TIMEOUT: Duration = Duration::from_secs(20);

fn with_client_id(client: &HttpClient, mut data: LoginRequest, grant_type: &str) -> LoginRequest {
    if data.client_id.is_empty() {
        data.client_id = client.config().client_id.clone();
    }
    if data.grant_type.is_empty() {
        data.grant_type = grant_type.to_string();
    }
    data
}

/// Password login; sent without token, body encrypted
pub async fn login(client: &HttpClient, data: LoginRequest) -> ClientResult<LoginResult> {
    let data = with_client_id(client, data, "password");
    client
        .post(
            "/auth/login",
            &data,
            RequestOptions::new().without_token().encrypted(),
        )
        .await
}

pub async fn register(client: &HttpClient, data: LoginRequest) -> ClientResult<Value> {
    let mut data = data;
    data.client_id = client.config().client_id.clone();
    data.grant_type = "password".to_string();
    client
        .post(
            "/auth/register",
            &data,
            RequestOptions::new().without_token().encrypted(),
        )
        .await
}

pub async fn logout(client: &HttpClient) -> ClientResult<Value> {
    client.post_empty("/auth/logout", RequestOptions::new()).await
}

pub async fn get_code_img(client: &HttpClient) -> ClientResult<VerifyCodeResult> {
    client
        .get(
            "/auth/code",
            RequestOptions::new().without_token().timeout(CAPTCHA_TIMEOUT),
        )
        .await
}

/// Social login callback
pub async fn callback(client: &HttpClient, data: LoginRequest) -> ClientResult<Value> {
    let mut data = data;
    data.client_id = client.config().client_id.clone();
    data.grant_type = "social".to_string();
    client
        .post("/auth/social/callback", &data, RequestOptions::new())
        .await
}

pub async fn get_tenant_list(client: &HttpClient) -> ClientResult<TenantInfo> {
    client
        .get("/auth/tenant/list", RequestOptions::new().without_token())
        .await
}

/// Login form state handed to [`AuthService::sign_in`]
#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub tenant_id: Option<String>,
    pub username: String,
    pub password: String,
    pub remember_me: bool,
    /// Captcha answer and id
    pub code: Option<String>,
    pub uuid: Option<String>,
}

impl SignInForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Prefill from remembered credentials
    pub fn remembered(storage: &dyn KvStorage) -> Self {
        let saved = RememberedLogin::load(storage);
        Self {
            tenant_id: saved.tenant_id,
            username: saved.username.unwrap_or_default(),
            password: saved.password.unwrap_or_default(),
            remember_me: saved.remember_me,
            code: None,
            uuid: None,
        }
    }

    fn to_request(&self) -> LoginRequest {
        LoginRequest {
            tenant_id: self.tenant_id.clone(),
            remember_me: Some(self.remember_me),
            code: self.code.clone(),
            uuid: self.uuid.clone(),
            ..LoginRequest::password(self.username.clone(), self.password.clone())
        }
    }

    fn to_remembered(&self) -> RememberedLogin {
        RememberedLogin {
            tenant_id: self.tenant_id.clone(),
            username: Some(self.username.clone()),
            password: Some(self.password.clone()),
            remember_me: self.remember_me,
        }
    }
}

/// Login / logout flows on top of the raw endpoints
#[derive(Clone)]
pub struct AuthService {
    client: HttpClient,
    storage: Arc<dyn KvStorage>,
}

impl AuthService {
    /// `storage` holds the remembered credentials
    pub fn new(client: HttpClient, storage: Arc<dyn KvStorage>) -> Self {
        Self { client, storage }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Log in, store the token, then load roles and permissions.
    ///
    /// A failing profile fetch does not fail the login; the profile is
    /// `None` then.
    pub async fn sign_in(&self, form: &SignInForm) -> ClientResult<Option<UserInfo>> {
        form.to_remembered().save(self.storage.as_ref());

        let session = self.client.session();
        session.clear_token();

        let result = login(&self.client, form.to_request()).await?;
        if result.access_token.is_empty() {
            return Err(ClientError::InvalidResponse(
                "login response has no access_token".into(),
            ));
        }
        session.set_token(&result.access_token);
        tracing::info!(username = %form.username, "Signed in");

        let profile = self.refresh_profile().await.ok();
        self.client
            .notifier()
            .success(&self.client.messages().t(keys::LOGIN_SUCCESS, &[]));
        Ok(profile)
    }

    /// Reload roles and permissions into the session
    pub async fn refresh_profile(&self) -> ClientResult<UserInfo> {
        let info = user::get_info(&self.client).await.map_err(|e| {
            tracing::warn!(error = %e, "Profile fetch failed");
            e
        })?;
        self.client
            .session()
            .set_auth_info(Some(info.roles.as_slice()), Some(info.permissions.as_slice()));
        Ok(info)
    }

    /// Server logout, then local teardown whatever the server said
    pub async fn sign_out(&self) {
        if let Err(e) = logout(&self.client).await {
            tracing::warn!(error = %e, "Server logout failed, clearing local session anyway");
        }
        let session = self.client.session();
        session.clear_token();
        session.set_auth_info(None, None);
        tracing::info!("Signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_sign_in_form_request() {
        let mut form = SignInForm::new("admin", "admin123");
        form.tenant_id = Some("000000".into());
        let req = form.to_request();
        assert_eq!(req.username.as_deref(), Some("admin"));
        assert_eq!(req.tenant_id.as_deref(), Some("000000"));
        assert_eq!(req.grant_type, "password");
        assert_eq!(req.remember_me, Some(false));
    }

    #[test]
    fn test_remembered_form() {
        let storage = MemoryStorage::new();
        let mut form = SignInForm::new("ops", "secret");
        form.remember_me = true;
        form.to_remembered().save(&storage);

        let restored = SignInForm::remembered(&storage);
        assert_eq!(restored.username, "ops");
        assert_eq!(restored.password, "secret");
        assert!(restored.remember_me);
    }
}
