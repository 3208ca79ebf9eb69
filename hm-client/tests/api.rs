//! Auth and download-center flows against an in-process backend

use axum::extract::Query;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use hm_client::api::auth::{self, SignInForm};
use hm_client::api::{AuthService, download_center};
use hm_client::{
    ClientConfig, HttpClient, KvStorage, MemoryStorage, RememberedLogin, RouterTransport,
    SessionStore, StorageSession,
};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn rsa_keys() -> (String, String) {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, 1024).expect("Failed to generate RSA key");
    let public = RsaPublicKey::from(&private);
    (
        public.to_public_key_pem(LineEnding::LF).unwrap(),
        private.to_pkcs8_pem(LineEnding::LF).unwrap().as_str().to_string(),
    )
}

fn decrypt_login(headers: &HeaderMap, body: &str, private_pem: &str) -> Value {
    let wrapped = headers
        .get("encrypt-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let key_b64 = hm_crypto::decrypt_with_private_key(wrapped, private_pem).unwrap();
    let key = hm_crypto::decode_base64(&key_b64).unwrap();
    serde_json::from_str(&hm_crypto::decrypt_with_aes(body, &key).unwrap()).unwrap()
}

struct Backend {
    router: Router,
    logins: Arc<Mutex<Vec<Value>>>,
    logouts: Arc<AtomicUsize>,
}

fn backend(private_pem: String, profile_ok: bool) -> Backend {
    let logins = Arc::new(Mutex::new(Vec::new()));
    let logouts = Arc::new(AtomicUsize::new(0));

    let seen = logins.clone();
    let counter = logouts.clone();
    let router = Router::new()
        .route(
            "/auth/login",
            post(move |headers: HeaderMap, body: String| {
                let seen = seen.clone();
                let private_pem = private_pem.clone();
                async move {
                    let form = decrypt_login(&headers, &body, &private_pem);
                    seen.lock().unwrap().push(form);
                    Json(json!({"code": 200, "msg": "操作成功", "data": {"access_token": "jwt-1"}}))
                }
            }),
        )
        .route(
            "/system/user/getInfo",
            get(move |headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if !profile_ok {
                    return Json(json!({"code": 500, "msg": "profile down"}));
                }
                assert_eq!(auth, "Bearer jwt-1");
                Json(json!({
                    "code": 200,
                    "data": {
                        "user": {"userId": 1, "userName": "admin", "nickName": "管理员"},
                        "roles": ["superadmin"],
                        "permissions": ["*:*:*"]
                    }
                }))
            }),
        )
        .route(
            "/auth/logout",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Json(json!({"code": 200, "msg": "退出成功"})) }
            }),
        );
    Backend {
        router,
        logins,
        logouts,
    }
}

fn client(router: Router, config: ClientConfig, session: Arc<dyn SessionStore>) -> HttpClient {
    HttpClient::builder(config)
        .session(session)
        .transport(Arc::new(RouterTransport::new(router)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_sign_in_and_out() {
    let (public_pem, private_pem) = rsa_keys();
    let b = backend(private_pem, true);
    let storage = Arc::new(MemoryStorage::new());
    let session = Arc::new(StorageSession::new(storage.clone()));
    let config = ClientConfig::new("http://backend").with_public_key(public_pem);
    let service = AuthService::new(client(b.router, config, session.clone()), storage.clone());

    let mut form = SignInForm::new("admin", "admin123");
    form.tenant_id = Some("000000".into());
    form.remember_me = true;
    let profile = service.sign_in(&form).await.unwrap().expect("profile loaded");

    assert_eq!(profile.user.user_name, "admin");
    assert_eq!(session.token().as_deref(), Some("jwt-1"));
    assert_eq!(session.roles(), vec!["superadmin"]);
    assert_eq!(session.permissions(), vec!["*:*:*"]);

    let logins = b.logins.lock().unwrap().clone();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0]["username"], "admin");
    assert_eq!(logins[0]["tenantId"], "000000");
    assert_eq!(logins[0]["clientId"], "hmdp-react-ui");
    assert_eq!(logins[0]["grantType"], "password");

    let remembered = RememberedLogin::load(storage.as_ref());
    assert!(remembered.remember_me);
    assert_eq!(remembered.username.as_deref(), Some("admin"));

    service.sign_out().await;
    assert_eq!(b.logouts.load(Ordering::SeqCst), 1);
    assert_eq!(session.token(), None);
    assert!(session.roles().is_empty());
}

#[tokio::test]
async fn test_profile_failure_does_not_fail_login() {
    let (public_pem, private_pem) = rsa_keys();
    let b = backend(private_pem, false);
    let storage = Arc::new(MemoryStorage::new());
    let session = Arc::new(StorageSession::new(storage.clone()));
    let config = ClientConfig::new("http://backend").with_public_key(public_pem);
    let service = AuthService::new(client(b.router, config, session.clone()), storage.clone());

    let profile = service.sign_in(&SignInForm::new("admin", "x")).await.unwrap();
    assert!(profile.is_none());
    assert_eq!(session.token().as_deref(), Some("jwt-1"));
    // not remembered
    assert_eq!(storage.get_item("username"), None);
}

#[tokio::test]
async fn test_captcha_and_tenants_skip_token() {
    let router = Router::new()
        .route(
            "/auth/code",
            get(|headers: HeaderMap| async move {
                assert!(headers.get("authorization").is_none());
                Json(json!({"code": 200, "data": {"captchaEnabled": true, "uuid": "u-1", "img": "iVBOR"}}))
            }),
        )
        .route(
            "/auth/tenant/list",
            get(|| async {
                Json(json!({"code": 200, "data": {"voList": [{"companyName": "HM", "tenantId": "000000"}]}}))
            }),
        );
    let session = Arc::new(StorageSession::new(Arc::new(MemoryStorage::new())));
    session.set_token("jwt");
    let http = client(router, ClientConfig::new("http://backend"), session);

    let captcha = auth::get_code_img(&http).await.unwrap();
    assert!(captcha.captcha_enabled);
    assert_eq!(captcha.uuid.as_deref(), Some("u-1"));

    let tenants = auth::get_tenant_list(&http).await.unwrap();
    assert!(tenants.tenant_enabled);
    assert_eq!(tenants.vo_list[0].tenant_id, "000000");
}

#[tokio::test]
async fn test_export_list_and_actions() {
    let queries = Arc::new(Mutex::new(Vec::<HashMap<String, String>>::new()));
    let seen = queries.clone();
    let router = Router::new()
        .route(
            "/product/asyncExport/list",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(q);
                    Json(json!({
                        "code": 200,
                        "total": 1,
                        "rows": [{"asyncExportId": 9, "fileName": "orders.xlsx", "status": 2}]
                    }))
                }
            }),
        )
        .route(
            "/product/asyncExport/down",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let urls: Vec<String> = q["ids"].split(',').map(|id| format!("https://oss/{id}.xlsx")).collect();
                Json(json!({"code": 200, "data": urls}))
            }),
        )
        .route(
            "/system/dict/data/type/sys_down_status",
            get(|| async { Json(json!({"code": 500, "msg": "dict missing"})) }),
        );
    let session = Arc::new(StorageSession::new(Arc::new(MemoryStorage::new())));
    let http = client(router, ClientConfig::new("http://backend"), session);

    let page = download_center::get_export_list(
        &http,
        &json!({"pageNum": 1, "pageSize": 10, "createUserIdList": []}),
        None,
    )
    .await
    .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].file_name, "orders.xlsx");
    let q = queries.lock().unwrap()[0].clone();
    assert_eq!(q.get("createUserIdList").map(String::as_str), Some(""));
    assert_eq!(q["pageSize"], "10");

    // no creator filter at all is sent the same way
    download_center::get_export_list(&http, &json!({"pageNum": 2, "pageSize": 10}), None)
        .await
        .unwrap();
    let q = queries.lock().unwrap()[1].clone();
    assert_eq!(q.get("createUserIdList").map(String::as_str), Some(""));
    assert_eq!(q["pageNum"], "2");

    let urls = download_center::download(&http, &[9, 10]).await.unwrap();
    assert_eq!(urls, vec!["https://oss/9.xlsx", "https://oss/10.xlsx"]);

    // dictionary failure degrades to no options
    assert!(download_center::get_status_dict(&http).await.is_empty());
}
