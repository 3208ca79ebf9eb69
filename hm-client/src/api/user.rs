use crate::error::ClientResult;
use crate::http::{HttpClient, RequestOptions};
use shared::client::UserInfo;

/// Current user with roles and permissions
pub async fn get_info(client: &HttpClient) -> ClientResult<UserInfo> {
    client
        .get("/system/user/getInfo", RequestOptions::new())
        .await
}
