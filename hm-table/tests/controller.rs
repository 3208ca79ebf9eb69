//! Table controller against fake and in-process backends

use async_trait::async_trait;
use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use hm_client::api::download_center;
use hm_client::{
    ClientConfig, ClientError, FileStorage, HttpClient, KvStorage, MemoryStorage,
    PermissionSet, RouterTransport, StorageSession,
};
use hm_table::{
    ActionDescriptor, ActionOutcome, AfterAction, ColumnDescriptor, Confirm, Density,
    FilterDescriptor, FnSource, LoadState, RowKey, RunOutcome, TableController, TableSource,
};
use serde_json::{Value, json};
use shared::models::ExportItem;
use shared::{TableQuery, TableResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn page_of(query: &TableQuery) -> Vec<Value> {
    let first = query.offset() as i64 + 1;
    (first..first + query.page_size as i64)
        .map(|id| json!({"id": id, "page": query.page_num}))
        .collect()
}

/// Page 1 is slow and ignores cancellation; every other page answers at once
fn slow_first_page() -> Arc<dyn TableSource<Value>> {
    Arc::new(FnSource::new(|query: TableQuery, _cancel: CancellationToken| async move {
        if query.page_num == 1 {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok::<_, ClientError>(TableResult::new(page_of(&query), 100))
    }))
}

#[tokio::test(start_paused = true)]
async fn test_superseded_run_is_discarded() {
    let table = TableController::builder(slow_first_page(), RowKey::field("id")).build();

    let (first, second) = tokio::join!(table.run(), async {
        tokio::task::yield_now().await;
        table.set_pagination(2, 10).await
    });

    assert_eq!(first, RunOutcome::Superseded);
    assert_eq!(second, RunOutcome::Applied { total: 100 });
    let snap = table.snapshot();
    assert_eq!(snap.page_num, 2);
    assert!(snap.rows.iter().all(|r| r["page"] == 2));
    assert_eq!(snap.status, LoadState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_previous_request_is_cancelled() {
    let aborted = Arc::new(AtomicUsize::new(0));
    let seen = aborted.clone();
    let source: Arc<dyn TableSource<Value>> =
        Arc::new(FnSource::new(move |query: TableQuery, cancel: CancellationToken| {
            let seen = seen.clone();
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        seen.fetch_add(1, Ordering::SeqCst);
                        Err(ClientError::Aborted)
                    }
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {
                        Ok(TableResult::new(page_of(&query), 30))
                    }
                }
            }
        }));
    let table = TableController::builder(source, RowKey::field("id")).build();

    let (first, second) = tokio::join!(table.run(), async {
        tokio::task::yield_now().await;
        table.refresh().await
    });
    assert_eq!(first, RunOutcome::Superseded);
    assert!(second.is_applied());
    assert_eq!(aborted.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_keeps_state() {
    let table = TableController::builder(slow_first_page(), RowKey::field("id")).build();

    let (outcome, _) = tokio::join!(table.run(), async {
        tokio::task::yield_now().await;
        assert_eq!(table.status(), LoadState::Loading);
        table.cancel();
    });
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(table.status(), LoadState::Idle);
    assert!(table.rows().is_empty());
}

#[tokio::test]
async fn test_export_list_query() {
    let queries = Arc::new(Mutex::new(Vec::<HashMap<String, String>>::new()));
    let seen = queries.clone();
    let router = Router::new().route(
        "/product/asyncExport/list",
        get(move |Query(q): Query<HashMap<String, String>>| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(q);
                Json(json!({
                    "code": 200,
                    "msg": "查询成功",
                    "total": 12,
                    "rows": [
                        {"asyncExportId": 1, "fileName": "orders.xlsx", "status": 2},
                        {"asyncExportId": 2, "fileName": "members.xlsx", "status": 3}
                    ]
                }))
            }
        }),
    );
    let http = HttpClient::builder(ClientConfig::new("http://backend"))
        .session(Arc::new(StorageSession::new(Arc::new(MemoryStorage::new()))))
        .transport(Arc::new(RouterTransport::new(router)))
        .build()
        .unwrap();

    let source: Arc<dyn TableSource<ExportItem>> =
        Arc::new(FnSource::new(move |query: TableQuery, cancel: CancellationToken| {
            let http = http.clone();
            async move {
                let params = serde_json::to_value(&query)?;
                download_center::get_export_list(&http, &params, Some(cancel)).await
            }
        }));
    let table = TableController::builder(source, RowKey::field("asyncExportId"))
        .filters(vec![
            FilterDescriptor::input("fileName"),
            FilterDescriptor::multi_select("statusList"),
            FilterDescriptor::date_range("createTime"),
        ])
        .initial_filter("statusList", json!([2, 3]))
        .build();

    let outcome = table.run().await;
    assert_eq!(outcome, RunOutcome::Applied { total: 12 });
    assert_eq!(table.total(), 12);
    assert_eq!(table.rows().len(), 2);

    let q = queries.lock().unwrap()[0].clone();
    assert_eq!(q["pageNum"], "1");
    assert_eq!(q["pageSize"], "10");
    assert_eq!(q["statusList"], "2,3");
    assert_eq!(q["startTime"], "");
    assert_eq!(q["endTime"], "");
    assert!(!q.contains_key("fileName"));

    // submit keeps the page, reset goes back to 1 and clears the form
    table.set_pagination(2, 10).await;
    table.set_filter_value("createTime", json!(["2024-05-01", "2024-05-07"]));
    table.submit_filters().await;
    let q = queries.lock().unwrap().last().cloned().unwrap();
    assert_eq!(q["pageNum"], "2");
    assert_eq!(q["startTime"], "2024-05-01 00:00:00");
    assert_eq!(q["endTime"], "2024-05-07 23:59:59");

    table.reset_filters().await;
    let q = queries.lock().unwrap().last().cloned().unwrap();
    assert_eq!(q["pageNum"], "1");
    assert!(!q.contains_key("statusList"));
}

fn columns() -> Vec<ColumnDescriptor> {
    ["fileName", "status", "fileSize", "createTime"]
        .into_iter()
        .map(|k| ColumnDescriptor::new(k).with_title(format!("downloadCenter.{k}")))
        .collect()
}

#[tokio::test]
async fn test_column_visibility_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    {
        let storage: Arc<dyn KvStorage> = Arc::new(FileStorage::open(&path).unwrap());
        let table = TableController::builder(slow_first_page(), RowKey::field("id"))
            .columns(columns())
            .persist(storage, "downloadCenter")
            .build();
        assert_eq!(table.visible_columns().len(), 4);
        table.set_column_visible("fileSize", false);
        table.set_density(Density::Small);
    }

    // a new column appears after the reload
    let mut next = columns();
    next.push(ColumnDescriptor::new("downNum"));
    let storage: Arc<dyn KvStorage> = Arc::new(FileStorage::open(&path).unwrap());
    let table = TableController::builder(slow_first_page(), RowKey::field("id"))
        .columns(next)
        .persist(storage, "downloadCenter")
        .build();
    assert_eq!(
        table.visible_columns(),
        vec!["fileName", "status", "createTime", "downNum"]
    );
    assert_eq!(table.density(), Density::Small);
}

#[tokio::test]
async fn test_without_persist_key_defaults() {
    let table = TableController::builder(slow_first_page(), RowKey::field("id"))
        .columns(columns())
        .build();
    table.set_column_visible("status", false);
    assert_eq!(table.visible_columns().len(), 3);
    assert_eq!(table.density(), Density::Middle);
    assert_eq!(table.size_options(), &[Density::Middle, Density::Small]);
}

fn quick_source(total: u64) -> Arc<dyn TableSource<Value>> {
    Arc::new(FnSource::new(move |query: TableQuery, _cancel: CancellationToken| async move {
        Ok::<_, ClientError>(TableResult::new(page_of(&query), total))
    }))
}

fn counting_action(key: &str, calls: Arc<AtomicUsize>) -> ActionDescriptor<Value> {
    ActionDescriptor::new(key, format!("downloadCenter.{key}"), move |_ctx| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            AfterAction::Stay
        }
    })
}

#[tokio::test]
async fn test_disabled_batch_action_not_invoked() {
    let calls = Arc::new(AtomicUsize::new(0));
    let table = TableController::builder(quick_source(20), RowKey::field("id"))
        .batch_action(counting_action("download", calls.clone()).requires_selection())
        .build();
    table.run().await;

    assert_eq!(table.visible_actions(), vec![("download".to_string(), true)]);
    assert_eq!(table.trigger("download").await, ActionOutcome::Disabled);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let rows = table.rows();
    table.toggle_row(&rows[0]);
    assert_eq!(table.trigger("download").await, ActionOutcome::Invoked);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(table.trigger("missing").await, ActionOutcome::NotFound);
}

#[tokio::test]
async fn test_permission_gate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let perms = PermissionSet::new(vec![], vec!["product:asyncExport:retry".into()]);
    let table = TableController::builder(quick_source(5), RowKey::field("id"))
        .permissions(perms)
        .toolbar_action(counting_action("retry", calls.clone()).with_permission("product:asyncExport:retry"))
        .toolbar_action(counting_action("cancel", calls.clone()).with_permission("product:asyncExport:cancel"))
        .toolbar_action(counting_action("open", calls.clone()))
        .build();

    let visible: Vec<String> = table.toolbar_actions().iter().map(|a| a.key.clone()).collect();
    assert_eq!(visible, vec!["retry", "open"]);
    assert_eq!(table.trigger("cancel").await, ActionOutcome::Forbidden);
    assert_eq!(table.trigger("retry").await, ActionOutcome::Invoked);
    assert_eq!(table.trigger("open").await, ActionOutcome::Invoked);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

struct ScriptedConfirm {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

#[async_trait]
impl Confirm for ScriptedConfirm {
    async fn confirm(&self, message_key: &str) -> bool {
        self.asked.lock().unwrap().push(message_key.to_string());
        self.answer
    }
}

#[tokio::test]
async fn test_confirm_declined_and_refresh_after() {
    let calls = Arc::new(AtomicUsize::new(0));
    let fetches = Arc::new(AtomicUsize::new(0));
    let counted = fetches.clone();
    let source: Arc<dyn TableSource<Value>> =
        Arc::new(FnSource::new(move |query: TableQuery, _cancel: CancellationToken| {
            counted.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ClientError>(TableResult::new(page_of(&query), 40)) }
        }));

    let declining = Arc::new(ScriptedConfirm {
        answer: false,
        asked: Mutex::new(Vec::new()),
    });
    let hits = calls.clone();
    let cancel = ActionDescriptor::new("cancel", "downloadCenter.cancel", move |_ctx| {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            AfterAction::Refresh
        }
    })
    .with_confirm("downloadCenter.confirmCancel");

    let table = TableController::builder(source.clone(), RowKey::field("id"))
        .confirm(declining.clone())
        .row_action(cancel.clone())
        .build();
    table.run().await;
    let row = table.rows()[3].clone();
    assert_eq!(table.trigger_row("cancel", &row).await, ActionOutcome::Declined);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(declining.asked.lock().unwrap().as_slice(), ["downloadCenter.confirmCancel"]);

    let table = TableController::builder(source, RowKey::field("id"))
        .confirm(Arc::new(ScriptedConfirm {
            answer: true,
            asked: Mutex::new(Vec::new()),
        }))
        .row_action(cancel)
        .build();
    table.set_pagination(3, 10).await;
    let before = fetches.load(Ordering::SeqCst);
    assert_eq!(table.trigger_row("cancel", &row).await, ActionOutcome::Invoked);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // refresh went back to the first page
    assert_eq!(fetches.load(Ordering::SeqCst), before + 1);
    assert_eq!(table.page().0, 1);
}

#[tokio::test]
async fn test_failed_source_is_not_propagated() {
    let source: Arc<dyn TableSource<Value>> = Arc::new(FnSource::new(
        |_q: TableQuery, _c: CancellationToken| async {
            Err::<TableResult<Value>, ClientError>(ClientError::Business {
                code: 500,
                message: "导出服务不可用".into(),
            })
        },
    ));
    let table = TableController::builder(source, RowKey::field("id")).build();
    let outcome = table.run().await;
    assert_eq!(outcome, RunOutcome::Failed("导出服务不可用".into()));
    assert_eq!(table.status(), LoadState::Error);
}
