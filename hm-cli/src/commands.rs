// hm-cli/src/commands.rs
// 子命令实现 - login / logout / whoami / tenants / exports

use crate::cli::{ExportsArgs, LoginArgs};
use crate::console::ConsoleConfirm;
use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hm_client::api::auth::{self, SignInForm};
use hm_client::api::{AuthService, download_center};
use hm_client::ui::keys;
use hm_client::{HttpClient, KvStorage, PermissionSet, TableQuery, Translate};
use hm_table::{
    ActionCtx, ActionDescriptor, ActionOutcome, AfterAction, ColumnDescriptor, FilterDescriptor,
    FnSource, RowKey, RunOutcome, TableController, TableSource,
};
use serde_json::{Value, json};
use shared::models::{ExportItem, ExportStatus, StatusOption};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct App {
    pub http: HttpClient,
    pub storage: Arc<dyn KvStorage>,
    pub messages: Arc<dyn Translate>,
    /// Directory of the state file (captcha images land here)
    pub state_dir: std::path::PathBuf,
}

impl App {
    fn auth(&self) -> AuthService {
        AuthService::new(self.http.clone(), self.storage.clone())
    }

    fn t(&self, key: &str) -> String {
        self.messages.t(key, &[])
    }

    // ========== Auth ==========

    pub async fn login(&self, args: LoginArgs) -> anyhow::Result<()> {
        let mut form = SignInForm::remembered(self.storage.as_ref());
        if let Some(username) = args.username {
            form.username = username;
        }
        if let Some(password) = args.password {
            form.password = password;
        }
        if args.tenant.is_some() {
            form.tenant_id = args.tenant;
        }
        form.remember_me = args.remember;
        if form.username.is_empty() || form.password.is_empty() {
            bail!("username and password are required (--username / --password)");
        }

        match (args.code, args.uuid) {
            (Some(code), Some(uuid)) => {
                form.code = Some(code);
                form.uuid = Some(uuid);
            }
            _ => {
                let captcha = auth::get_code_img(&self.http).await?;
                if captcha.captcha_enabled {
                    let path = save_captcha(&self.state_dir, captcha.img.as_deref().unwrap_or_default())?;
                    bail!(
                        "captcha required: open {} and rerun with --code <answer> --uuid {}",
                        path.display(),
                        captcha.uuid.unwrap_or_default()
                    );
                }
            }
        }

        match self.auth().sign_in(&form).await? {
            Some(info) => print_profile(&info.user.user_name, &info.user.nick_name, &info.roles, &info.permissions),
            None => eprintln!("! signed in, profile not available"),
        }
        Ok(())
    }

    pub async fn logout(&self) -> anyhow::Result<()> {
        if self.http.session().token().is_none() {
            eprintln!("! not signed in");
            return Ok(());
        }
        self.auth().sign_out().await;
        self.http.notifier().success(&self.t(keys::LOGOUT_SUCCESS));
        Ok(())
    }

    pub async fn whoami(&self) -> anyhow::Result<()> {
        if self.http.session().token().is_none() {
            bail!("not signed in, run `hm login`");
        }
        let info = self.auth().refresh_profile().await?;
        print_profile(&info.user.user_name, &info.user.nick_name, &info.roles, &info.permissions);

        let perms = PermissionSet::from_session(self.http.session().as_ref());
        if perms.has_permission(hm_client::SUPER_PERMISSION) {
            println!("access:      all permissions");
        }
        Ok(())
    }

    pub async fn tenants(&self) -> anyhow::Result<()> {
        let info = auth::get_tenant_list(&self.http).await?;
        if !info.tenant_enabled {
            println!("tenants disabled");
            return Ok(());
        }
        for vo in &info.vo_list {
            println!("{:<10} {}", vo.tenant_id, vo.company_name);
        }
        Ok(())
    }

    // ========== Download center ==========

    pub async fn exports(&self, args: ExportsArgs) -> anyhow::Result<()> {
        let statuses = download_center::get_status_dict(&self.http).await;
        let table = self.export_table(&args);

        for key in &args.hide {
            table.set_column_visible(key, false);
        }
        for key in &args.show {
            table.set_column_visible(key, true);
        }

        let outcome = match table.set_pagination(args.page, args.size).await {
            RunOutcome::Unchanged => table.run().await,
            other => other,
        };
        if let RunOutcome::Failed(message) = outcome {
            bail!("loading export tasks failed: {message}");
        }

        print_exports(&table, &statuses);

        let Some(action) = args.action else {
            return Ok(());
        };
        let keys: Vec<String> = args.ids.iter().map(i64::to_string).collect();
        table.set_selected_keys(keys.clone());
        let on_page: Vec<String> = table
            .action_ctx()
            .selected_rows
            .iter()
            .map(|r| r.async_export_id.to_string())
            .collect();
        let missing: Vec<&str> = keys
            .iter()
            .filter(|k| !on_page.contains(k))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            let ids = missing.join(",");
            self.http
                .notifier()
                .warning(&self.messages.t("downloadCenter.notOnPage", &[("ids", ids.as_str())]));
        }

        match table.trigger(action.key()).await {
            ActionOutcome::Invoked => {
                if table.status() == hm_table::LoadState::Ready {
                    println!();
                    print_exports(&table, &statuses);
                }
            }
            ActionOutcome::Disabled => self.http.notifier().warning(&self.t("downloadCenter.selectTip")),
            ActionOutcome::Declined => eprintln!("cancelled"),
            ActionOutcome::Forbidden | ActionOutcome::NotFound => bail!("action not available"),
        }
        Ok(())
    }

    fn export_table(&self, args: &ExportsArgs) -> TableController<ExportItem> {
        let http = self.http.clone();
        let source: Arc<dyn TableSource<ExportItem>> =
            Arc::new(FnSource::new(move |query: TableQuery, cancel: CancellationToken| {
                let http = http.clone();
                async move {
                    let params = serde_json::to_value(&query)?;
                    download_center::get_export_list(&http, &params, Some(cancel)).await
                }
            }));

        let mut builder = TableController::builder(source, RowKey::field("asyncExportId"))
            .columns(export_columns())
            .filters(vec![
                FilterDescriptor::input("fileName").with_label("downloadCenter.fileName"),
                FilterDescriptor::multi_select("statusList").with_label("downloadCenter.status"),
                FilterDescriptor::date_range("time").with_label("downloadCenter.timeRange"),
                FilterDescriptor::multi_select("createUserIdList")
                    .with_label("downloadCenter.createUserIdList"),
            ])
            .page_size(args.size)
            .persist(self.storage.clone(), "downloadCenter")
            .confirm(Arc::new(ConsoleConfirm::new(self.messages.clone(), args.yes)))
            .batch_action(self.batch_action(
                "batchDownload",
                "downloadCenter.batchDownloadTitle",
                ExportStatus::can_download,
            ))
            .batch_action(self.batch_action(
                "batchRetry",
                "downloadCenter.batchRetryTitle",
                ExportStatus::can_retry,
            ))
            .batch_action(self.batch_action(
                "batchCancel",
                "downloadCenter.batchCancelTitle",
                ExportStatus::can_cancel,
            ));

        if let Some(name) = &args.name {
            builder = builder.initial_filter("fileName", json!(name));
        }
        if !args.status.is_empty() {
            builder = builder.initial_filter("statusList", json!(args.status));
        }
        // 空数组由 get_export_list 转成 ""
        builder = builder.initial_filter("createUserIdList", json!(args.creators));
        if let (Some(from), Some(to)) = (args.from, args.to) {
            builder = builder.initial_filter("time", hm_table::date_range(from, to));
        }
        builder.build()
    }

    /// Batch action acting on the selected rows whose status allows it
    fn batch_action(
        &self,
        key: &'static str,
        confirm_key: &str,
        eligible: fn(ExportStatus) -> bool,
    ) -> ActionDescriptor<ExportItem> {
        let http = self.http.clone();
        let messages = self.messages.clone();
        ActionDescriptor::new(key, format!("downloadCenter.{key}"), move |ctx: ActionCtx<ExportItem>| {
            let http = http.clone();
            let messages = messages.clone();
            async move {
                let ids: Vec<i64> = ctx
                    .selected_rows
                    .iter()
                    .filter(|r| eligible(r.status()))
                    .map(|r| r.async_export_id)
                    .collect();
                if ids.is_empty() {
                    http.notifier().warning(&messages.t("downloadCenter.noFile", &[]));
                    return AfterAction::Stay;
                }
                run_batch(&http, messages.as_ref(), key, &ids).await
            }
        })
        .with_confirm(confirm_key)
        .requires_selection()
    }
}

async fn run_batch(http: &HttpClient, messages: &dyn Translate, key: &str, ids: &[i64]) -> AfterAction {
    let done = match key {
        "batchDownload" => match download_center::download(http, ids).await {
            Ok(urls) => {
                for url in &urls {
                    println!("{url}");
                }
                true
            }
            Err(_) => false,
        },
        "batchRetry" => download_center::retry(http, ids).await.unwrap_or(false),
        _ => download_center::cancel(http, ids).await.unwrap_or(false),
    };
    if done {
        http.notifier().success(&messages.t("common.success", &[]));
        AfterAction::Refresh
    } else {
        AfterAction::Stay
    }
}

fn export_columns() -> Vec<ColumnDescriptor> {
    [
        "asyncExportId",
        "fileName",
        "progress",
        "fileSize",
        "downNum",
        "userName",
        "createTime",
        "complateTime",
        "status",
    ]
    .into_iter()
    .map(|key| ColumnDescriptor::new(key).with_title(format!("downloadCenter.{key}")))
    .collect()
}

fn print_profile(user_name: &str, nick_name: &str, roles: &[String], permissions: &[String]) {
    println!("user:        {user_name} ({nick_name})");
    println!("roles:       {}", roles.join(", "));
    println!("permissions: {}", permissions.len());
}

fn cell(item: &ExportItem, column: &str, statuses: &[StatusOption]) -> String {
    match column {
        "progress" => format!("{}/{} {}%", item.count_now, item.count_data, item.progress_percent()),
        "status" => statuses
            .iter()
            .find(|o| o.value == i64::from(item.status))
            .map(|o| o.label.clone())
            .unwrap_or_else(|| item.status.to_string()),
        other => match serde_json::to_value(item).ok().and_then(|v| v.get(other).cloned()) {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => "-".to_string(),
            Some(v) => v.to_string(),
        },
    }
}

fn print_exports(table: &TableController<ExportItem>, statuses: &[StatusOption]) {
    let columns = table.visible_columns();
    println!("{}", columns.join("\t"));
    for item in table.rows() {
        let line: Vec<String> = columns.iter().map(|c| cell(&item, c, statuses)).collect();
        println!("{}", line.join("\t"));
    }
    let (page, size) = table.page();
    let pages = shared::TableResult::<ExportItem>::new(Vec::new(), table.total()).total_pages(size);
    println!("-- page {page}/{pages}, {} tasks", table.total());
}

/// Write the base64 captcha image as `captcha.png` under `dir`
fn save_captcha(dir: &Path, img: &str) -> anyhow::Result<std::path::PathBuf> {
    let bytes = STANDARD
        .decode(img.trim())
        .context("captcha image is not base64")?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join("captcha.png");
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// State files live next to each other
pub fn state_dir(state_file: &Path) -> std::path::PathBuf {
    state_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}
