//! Table controller
//!
//! One controller per view. It owns paging, sort, filter form values,
//! selection and view preferences, and talks to the backend through a
//! [`TableSource`]. Only the newest request is committed: every `run()`
//! cancels the previous token and bumps a generation counter, and a result
//! whose generation is no longer current is dropped.
//!
//! The state lock is a plain `std::sync::Mutex` and is never held across
//! an await point.

use crate::descriptor::{
    ActionCtx, ActionDescriptor, AfterAction, ColumnDescriptor, FilterDescriptor, RowKey,
};
use crate::filters::transform_filters;
use crate::prefs::{ColumnState, Density, ViewPrefs, merge_column_states};
use async_trait::async_trait;
use hm_client::{ClientResult, KvStorage, PermissionSet};
use serde::Serialize;
use serde_json::{Map, Value};
use shared::request::{DEFAULT_PAGE_SIZE, SortOrder};
use shared::{TableQuery, TableResult};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

// ========== Collaborators ==========

/// Backend of one view
#[async_trait]
pub trait TableSource<T>: Send + Sync {
    async fn fetch(&self, query: TableQuery, cancel: CancellationToken) -> ClientResult<TableResult<T>>;
}

/// [`TableSource`] from an async closure
pub struct FnSource<F>(F);

impl<F> FnSource<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<T, F, Fut> TableSource<T> for FnSource<F>
where
    T: Send + 'static,
    F: Fn(TableQuery, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = ClientResult<TableResult<T>>> + Send,
{
    async fn fetch(&self, query: TableQuery, cancel: CancellationToken) -> ClientResult<TableResult<T>> {
        (self.0)(query, cancel).await
    }
}

/// Asks the user before a guarded action runs
#[async_trait]
pub trait Confirm: Send + Sync {
    /// `message_key` is the action's confirm text key
    async fn confirm(&self, message_key: &str) -> bool;
}

/// Confirms everything (scripts, tests)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

#[async_trait]
impl Confirm for AlwaysConfirm {
    async fn confirm(&self, _message_key: &str) -> bool {
        true
    }
}

pub type CapabilityCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

// ========== Outcomes ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Result of one `run()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Rows committed
    Applied { total: u64 },
    /// A newer run started first; result dropped
    Superseded,
    /// Aborted by `cancel()`
    Cancelled,
    /// Request failed; previous rows kept
    Failed(String),
    /// Nothing changed, no request sent
    Unchanged,
}

impl RunOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Result of triggering an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Invoked,
    Forbidden,
    Disabled,
    Declined,
    NotFound,
}

/// Read-only copy of the view state
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot<T> {
    pub rows: Vec<T>,
    pub total: u64,
    pub page_num: u32,
    pub page_size: u32,
    pub sort: Option<(String, SortOrder)>,
    pub status: LoadState,
    pub loading: bool,
    pub last_error: Option<String>,
    pub selected_keys: Vec<String>,
}

// ========== State ==========

struct State<T> {
    page_num: u32,
    page_size: u32,
    sort: Option<(String, SortOrder)>,
    filter_values: Map<String, Value>,
    rows: Vec<T>,
    total: u64,
    status: LoadState,
    /// Status to fall back to when a load is aborted
    settled: LoadState,
    last_error: Option<String>,
    selected_keys: Vec<String>,
    columns: Vec<ColumnState>,
    density: Density,
    cancel: Option<CancellationToken>,
}

pub struct TableController<T> {
    source: Arc<dyn TableSource<T>>,
    row_key: RowKey<T>,
    columns: Vec<ColumnDescriptor>,
    filters: Vec<FilterDescriptor>,
    toolbar_actions: Vec<ActionDescriptor<T>>,
    batch_actions: Vec<ActionDescriptor<T>>,
    row_actions: Vec<ActionDescriptor<T>>,
    can: Option<CapabilityCheck>,
    confirm: Arc<dyn Confirm>,
    prefs: Option<ViewPrefs>,
    size_options: Vec<Density>,
    generation: AtomicU64,
    state: Mutex<State<T>>,
}

impl<T> std::fmt::Debug for TableController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableController")
            .field("columns", &self.columns.len())
            .field("filters", &self.filters.len())
            .field("persist", &self.prefs.is_some())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl<T> TableController<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    pub fn builder(source: Arc<dyn TableSource<T>>, row_key: RowKey<T>) -> TableControllerBuilder<T> {
        TableControllerBuilder::new(source, row_key)
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ========== Loading ==========

    /// Query for the current state (filters transformed)
    pub fn current_query(&self) -> TableQuery {
        let st = self.lock();
        self.query_of(&st)
    }

    fn query_of(&self, st: &State<T>) -> TableQuery {
        let mut query = TableQuery::new(st.page_num, st.page_size);
        if let Some((field, order)) = &st.sort {
            query = query.order_by(field.clone(), *order);
        }
        query.filters = transform_filters(&self.filters, &st.filter_values);
        query
    }

    /// Load the current page. Never fails; see [`RunOutcome`].
    pub async fn run(&self) -> RunOutcome {
        let (query, token, generation) = {
            let mut st = self.lock();
            let query = self.query_of(&st);
            if let Some(previous) = st.cancel.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            st.cancel = Some(token.clone());
            if st.status != LoadState::Loading {
                st.settled = st.status;
            }
            st.status = LoadState::Loading;
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            (query, token, generation)
        };
        tracing::debug!(
            generation,
            page = query.page_num,
            size = query.page_size,
            "Loading table page"
        );

        let result = self.source.fetch(query, token.clone()).await;

        let mut st = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Dropping superseded table result");
            return RunOutcome::Superseded;
        }
        st.cancel = None;
        if token.is_cancelled() {
            st.status = st.settled;
            return RunOutcome::Cancelled;
        }
        match result {
            Ok(page) => {
                let total = page.total;
                st.rows = page.rows;
                st.total = total;
                st.status = LoadState::Ready;
                st.settled = LoadState::Ready;
                st.last_error = None;
                RunOutcome::Applied { total }
            }
            Err(e) if e.is_aborted() => {
                st.status = st.settled;
                RunOutcome::Cancelled
            }
            Err(e) => {
                // 旧数据保留
                tracing::warn!(error = %e, "Table load failed");
                st.status = LoadState::Error;
                st.settled = LoadState::Error;
                st.last_error = Some(e.to_string());
                RunOutcome::Failed(e.to_string())
            }
        }
    }

    /// Back to page 1 and reload
    pub async fn refresh(&self) -> RunOutcome {
        self.lock().page_num = 1;
        self.run().await
    }

    /// Abort the in-flight request, if any
    pub fn cancel(&self) {
        let mut st = self.lock();
        if let Some(token) = st.cancel.take() {
            token.cancel();
            st.status = st.settled;
        }
    }

    /// Page change from the pager; a zero size keeps the current size
    pub async fn set_pagination(&self, page_num: u32, page_size: u32) -> RunOutcome {
        {
            let mut st = self.lock();
            let page_num = page_num.max(1);
            let page_size = if page_size == 0 { st.page_size } else { page_size };
            if st.page_num == page_num && st.page_size == page_size {
                return RunOutcome::Unchanged;
            }
            st.page_num = page_num;
            st.page_size = page_size;
        }
        self.run().await
    }

    pub async fn set_sort(&self, sort: Option<(String, SortOrder)>) -> RunOutcome {
        {
            let mut st = self.lock();
            if st.sort == sort {
                return RunOutcome::Unchanged;
            }
            st.sort = sort;
        }
        self.run().await
    }

    // ========== Filters ==========

    /// Set one form value; sent on the next run
    pub fn set_filter_value(&self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let mut st = self.lock();
        if value.is_null() {
            st.filter_values.remove(&name);
        } else {
            st.filter_values.insert(name, value);
        }
    }

    pub fn filter_values(&self) -> Map<String, Value> {
        self.lock().filter_values.clone()
    }

    /// Search with the current form values (page unchanged)
    pub async fn submit_filters(&self) -> RunOutcome {
        self.run().await
    }

    /// Clear the form, back to page 1
    pub async fn reset_filters(&self) -> RunOutcome {
        {
            let mut st = self.lock();
            st.filter_values.clear();
            st.page_num = 1;
        }
        self.run().await
    }

    // ========== Selection ==========

    pub fn selected_keys(&self) -> Vec<String> {
        self.lock().selected_keys.clone()
    }

    pub fn set_selected_keys(&self, keys: Vec<String>) {
        let mut unique: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        self.lock().selected_keys = unique;
    }

    /// Toggle one row by its key; returns whether it is now selected
    pub fn toggle_row(&self, row: &T) -> bool {
        let Some(key) = self.row_key.key_of(row) else {
            tracing::warn!("Row has no key, cannot select");
            return false;
        };
        let mut st = self.lock();
        if let Some(pos) = st.selected_keys.iter().position(|k| *k == key) {
            st.selected_keys.remove(pos);
            false
        } else {
            st.selected_keys.push(key);
            true
        }
    }

    /// Select every row on the current page
    pub fn select_page(&self) {
        let mut st = self.lock();
        let keys: Vec<String> = st.rows.iter().filter_map(|r| self.row_key.key_of(r)).collect();
        for key in keys {
            if !st.selected_keys.contains(&key) {
                st.selected_keys.push(key);
            }
        }
    }

    pub fn clear_selection(&self) {
        self.lock().selected_keys.clear();
    }

    /// Selected keys plus the loaded rows they match
    pub fn action_ctx(&self) -> ActionCtx<T> {
        let st = self.lock();
        self.ctx_of(&st)
    }

    fn ctx_of(&self, st: &State<T>) -> ActionCtx<T> {
        let selected_rows = st
            .rows
            .iter()
            .filter(|r| {
                self.row_key
                    .key_of(r)
                    .is_some_and(|k| st.selected_keys.contains(&k))
            })
            .cloned()
            .collect();
        ActionCtx {
            selected_keys: st.selected_keys.clone(),
            selected_rows,
        }
    }

    // ========== Actions ==========

    fn allowed(&self, action: &ActionDescriptor<T>) -> bool {
        match (&action.permission, &self.can) {
            (Some(permission), Some(can)) => can(permission),
            _ => true,
        }
    }

    /// Toolbar actions the current user may see
    pub fn toolbar_actions(&self) -> Vec<&ActionDescriptor<T>> {
        self.toolbar_actions.iter().filter(|a| self.allowed(a)).collect()
    }

    pub fn batch_actions(&self) -> Vec<&ActionDescriptor<T>> {
        self.batch_actions.iter().filter(|a| self.allowed(a)).collect()
    }

    pub fn row_actions(&self) -> Vec<&ActionDescriptor<T>> {
        self.row_actions.iter().filter(|a| self.allowed(a)).collect()
    }

    /// Visible toolbar + batch actions with their disabled flag
    pub fn visible_actions(&self) -> Vec<(String, bool)> {
        let ctx = self.action_ctx();
        self.toolbar_actions()
            .into_iter()
            .chain(self.batch_actions())
            .map(|a| (a.key.clone(), a.is_disabled(&ctx)))
            .collect()
    }

    /// Trigger a toolbar or batch action with the current selection
    pub async fn trigger(&self, key: &str) -> ActionOutcome {
        let Some(action) = self
            .toolbar_actions
            .iter()
            .chain(self.batch_actions.iter())
            .find(|a| a.key == key)
            .cloned()
        else {
            return ActionOutcome::NotFound;
        };
        let ctx = self.action_ctx();
        self.invoke(action, ctx).await
    }

    /// Trigger a per-row action for one row
    pub async fn trigger_row(&self, key: &str, row: &T) -> ActionOutcome {
        let Some(action) = self.row_actions.iter().find(|a| a.key == key).cloned() else {
            return ActionOutcome::NotFound;
        };
        let ctx = ActionCtx {
            selected_keys: self.row_key.key_of(row).into_iter().collect(),
            selected_rows: vec![row.clone()],
        };
        self.invoke(action, ctx).await
    }

    async fn invoke(&self, action: ActionDescriptor<T>, ctx: ActionCtx<T>) -> ActionOutcome {
        if !self.allowed(&action) {
            tracing::warn!(action = %action.key, "Action refused, missing permission");
            return ActionOutcome::Forbidden;
        }
        if action.is_disabled(&ctx) {
            return ActionOutcome::Disabled;
        }
        if let Some(confirm_key) = &action.confirm_key
            && !self.confirm.confirm(confirm_key).await
        {
            return ActionOutcome::Declined;
        }
        tracing::debug!(action = %action.key, selected = ctx.selected_keys.len(), "Running table action");
        if (action.on_click)(ctx).await == AfterAction::Refresh {
            self.refresh().await;
        }
        ActionOutcome::Invoked
    }

    // ========== Columns / density ==========

    pub fn column_states(&self) -> Vec<ColumnState> {
        self.lock().columns.clone()
    }

    /// Keys of the visible columns, in descriptor order
    pub fn visible_columns(&self) -> Vec<String> {
        self.lock()
            .columns
            .iter()
            .filter(|c| c.visible)
            .map(|c| c.key.clone())
            .collect()
    }

    pub fn set_column_visible(&self, key: &str, visible: bool) {
        let states = {
            let mut st = self.lock();
            let Some(column) = st.columns.iter_mut().find(|c| c.key == key) else {
                return;
            };
            column.visible = visible;
            st.columns.clone()
        };
        if let Some(prefs) = &self.prefs {
            prefs.save_columns(&states);
        }
    }

    pub fn density(&self) -> Density {
        self.lock().density
    }

    pub fn size_options(&self) -> &[Density] {
        &self.size_options
    }

    pub fn set_density(&self, density: Density) {
        self.lock().density = density;
        if let Some(prefs) = &self.prefs {
            prefs.save_density(density);
        }
    }

    // ========== Snapshot ==========

    pub fn snapshot(&self) -> TableSnapshot<T> {
        let st = self.lock();
        TableSnapshot {
            rows: st.rows.clone(),
            total: st.total,
            page_num: st.page_num,
            page_size: st.page_size,
            sort: st.sort.clone(),
            status: st.status,
            loading: st.status == LoadState::Loading,
            last_error: st.last_error.clone(),
            selected_keys: st.selected_keys.clone(),
        }
    }

    pub fn rows(&self) -> Vec<T> {
        self.lock().rows.clone()
    }

    pub fn total(&self) -> u64 {
        self.lock().total
    }

    pub fn status(&self) -> LoadState {
        self.lock().status
    }

    pub fn page(&self) -> (u32, u32) {
        let st = self.lock();
        (st.page_num, st.page_size)
    }
}

impl<T> Drop for TableController<T> {
    fn drop(&mut self) {
        let st = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = st.cancel.take() {
            token.cancel();
        }
    }
}

// ========== Builder ==========

pub struct TableControllerBuilder<T> {
    source: Arc<dyn TableSource<T>>,
    row_key: RowKey<T>,
    columns: Vec<ColumnDescriptor>,
    filters: Vec<FilterDescriptor>,
    toolbar_actions: Vec<ActionDescriptor<T>>,
    batch_actions: Vec<ActionDescriptor<T>>,
    row_actions: Vec<ActionDescriptor<T>>,
    can: Option<CapabilityCheck>,
    confirm: Arc<dyn Confirm>,
    persist: Option<(Arc<dyn KvStorage>, String)>,
    size_options: Vec<Density>,
    page_size: u32,
    initial_filters: Map<String, Value>,
}

impl<T> TableControllerBuilder<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    pub fn new(source: Arc<dyn TableSource<T>>, row_key: RowKey<T>) -> Self {
        Self {
            source,
            row_key,
            columns: Vec::new(),
            filters: Vec::new(),
            toolbar_actions: Vec::new(),
            batch_actions: Vec::new(),
            row_actions: Vec::new(),
            can: None,
            confirm: Arc::new(AlwaysConfirm),
            persist: None,
            size_options: vec![Density::Middle, Density::Small],
            page_size: DEFAULT_PAGE_SIZE,
            initial_filters: Map::new(),
        }
    }

    pub fn columns(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.columns = columns;
        self
    }

    pub fn filters(mut self, filters: Vec<FilterDescriptor>) -> Self {
        self.filters = filters;
        self
    }

    /// Form value present before the first run
    pub fn initial_filter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.initial_filters.insert(name.into(), value);
        self
    }

    pub fn toolbar_action(mut self, action: ActionDescriptor<T>) -> Self {
        self.toolbar_actions.push(action);
        self
    }

    pub fn batch_action(mut self, action: ActionDescriptor<T>) -> Self {
        self.batch_actions.push(action);
        self
    }

    pub fn row_action(mut self, action: ActionDescriptor<T>) -> Self {
        self.row_actions.push(action);
        self
    }

    /// Capability check for action permissions; without one everything is allowed
    pub fn capability(mut self, can: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.can = Some(Arc::new(can));
        self
    }

    pub fn permissions(self, permissions: PermissionSet) -> Self {
        self.capability(move |perm| permissions.has_permission(perm))
    }

    pub fn confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    /// Persist column visibility / density under `key`
    pub fn persist(mut self, storage: Arc<dyn KvStorage>, key: impl Into<String>) -> Self {
        self.persist = Some((storage, key.into()));
        self
    }

    pub fn size_options(mut self, options: Vec<Density>) -> Self {
        if !options.is_empty() {
            self.size_options = options;
        }
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn build(self) -> TableController<T> {
        let prefs = self
            .persist
            .map(|(storage, key)| ViewPrefs::new(storage, key));
        let (columns, density) = match &prefs {
            Some(prefs) => (prefs.load_columns(&self.columns), prefs.load_density()),
            None => (merge_column_states(&self.columns, &[]), Density::default()),
        };
        TableController {
            source: self.source,
            row_key: self.row_key,
            columns: self.columns,
            filters: self.filters,
            toolbar_actions: self.toolbar_actions,
            batch_actions: self.batch_actions,
            row_actions: self.row_actions,
            can: self.can,
            confirm: self.confirm,
            prefs,
            size_options: self.size_options,
            generation: AtomicU64::new(0),
            state: Mutex::new(State {
                page_num: 1,
                page_size: self.page_size,
                sort: None,
                filter_values: self.initial_filters,
                rows: Vec::new(),
                total: 0,
                status: LoadState::Idle,
                settled: LoadState::Idle,
                last_error: None,
                selected_keys: Vec::new(),
                columns,
                density,
                cancel: None,
            }),
        }
    }
}
