//! Download center (async export tasks)

use crate::error::ClientResult;
use crate::http::{HttpClient, RequestOptions};
use serde_json::Value;
use shared::TableResult;
use shared::models::{ExportItem, StatusOption};
use tokio_util::sync::CancellationToken;

/// Dictionary type holding the export status labels
pub const STATUS_DICT_TYPE: &str = "sys_down_status";

/// List page of export tasks
///
/// `params` is the flattened table query.
pub async fn get_export_list(
    client: &HttpClient,
    params: &Value,
    cancel: Option<CancellationToken>,
) -> ClientResult<TableResult<ExportItem>> {
    let params = list_params(params);
    let mut options = RequestOptions::new().params(&params);
    if let Some(token) = cancel {
        options = options.cancel_with(token);
    }
    client.get("/product/asyncExport/list", options).await
}

/// A missing, null or empty `createUserIdList` is sent as an empty string,
/// which the backend reads as "everyone".
fn list_params(params: &Value) -> Value {
    let mut params = params.clone();
    if let Some(obj) = params.as_object_mut() {
        let empty = match obj.get("createUserIdList") {
            None | Some(Value::Null) => true,
            Some(Value::Array(ids)) => ids.is_empty(),
            Some(_) => false,
        };
        if empty {
            obj.insert("createUserIdList".into(), Value::String(String::new()));
        }
    }
    params
}

/// Download URLs for the given task ids
pub async fn download(client: &HttpClient, ids: &[i64]) -> ClientResult<Vec<String>> {
    client
        .get("/product/asyncExport/down", RequestOptions::new().query("ids", join_ids(ids)))
        .await
}

pub async fn retry(client: &HttpClient, ids: &[i64]) -> ClientResult<bool> {
    client
        .get("/product/asyncExport/retry", RequestOptions::new().query("ids", join_ids(ids)))
        .await
}

pub async fn cancel(client: &HttpClient, ids: &[i64]) -> ClientResult<bool> {
    client
        .get("/product/asyncExport/cancel", RequestOptions::new().query("ids", join_ids(ids)))
        .await
}

/// Status labels from the dictionary; empty when the lookup fails
pub async fn get_status_dict(client: &HttpClient) -> Vec<StatusOption> {
    let path = format!("/system/dict/data/type/{STATUS_DICT_TYPE}");
    match client.get::<Vec<Value>>(&path, RequestOptions::new()).await {
        Ok(list) => list.iter().map(status_option).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Status dictionary unavailable");
            Vec::new()
        }
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// First non-null of the candidate fields
fn pick<'a>(item: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|f| item.get(*f))
        .find(|v| !v.is_null())
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn status_option(item: &Value) -> StatusOption {
    let value = pick(item, &["dictValue", "value", "id"])
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0);
    StatusOption {
        value,
        label: pick(item, &["dictLabel", "label"])
            .map(as_text)
            .unwrap_or_default(),
        list_class: pick(item, &["listClass", "cssClass"])
            .map(as_text)
            .unwrap_or_else(|| "info".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_option_fallbacks() {
        let opt = status_option(&json!({"dictValue": "2", "dictLabel": "完成", "listClass": "success"}));
        assert_eq!(opt.value, 2);
        assert_eq!(opt.label, "完成");
        assert_eq!(opt.list_class, "success");

        let opt = status_option(&json!({"id": -1, "label": "异常", "cssClass": null}));
        assert_eq!(opt.value, -1);
        assert_eq!(opt.label, "异常");
        assert_eq!(opt.list_class, "info");

        let opt = status_option(&json!({}));
        assert_eq!(opt.value, 0);
        assert_eq!(opt.label, "");
    }

    #[test]
    fn test_list_params_send_empty_creator_list() {
        for params in [
            json!({"pageNum": 1}),
            json!({"pageNum": 1, "createUserIdList": null}),
            json!({"pageNum": 1, "createUserIdList": []}),
        ] {
            assert_eq!(
                list_params(&params),
                json!({"pageNum": 1, "createUserIdList": ""})
            );
        }
        assert_eq!(
            list_params(&json!({"createUserIdList": [3, 4]})),
            json!({"createUserIdList": [3, 4]})
        );
    }

    #[test]
    fn test_join_ids() {
        assert_eq!(join_ids(&[1, 22, 3]), "1,22,3");
        assert_eq!(join_ids(&[]), "");
    }
}
