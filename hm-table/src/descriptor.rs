//! Column / filter / action descriptors

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Filter input kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Input,
    Number,
    Select,
    MultiSelect,
    /// Two dates, sent as `startTime` / `endTime`
    DateRange,
    Custom,
}

pub type Normalize = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct FilterDescriptor {
    pub name: String,
    pub label_key: Option<String>,
    pub kind: FilterKind,
    /// Maps the raw form value to the wire value; wins over the kind's default
    pub normalize: Option<Normalize>,
}

impl FilterDescriptor {
    pub fn new(name: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            name: name.into(),
            label_key: None,
            kind,
            normalize: None,
        }
    }

    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::Input)
    }

    pub fn select(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::Select)
    }

    pub fn multi_select(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::MultiSelect)
    }

    pub fn date_range(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::DateRange)
    }

    pub fn with_label(mut self, key: impl Into<String>) -> Self {
        self.label_key = Some(key.into());
        self
    }

    pub fn with_normalize(mut self, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.normalize = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for FilterDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("normalize", &self.normalize.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub key: String,
    pub title_key: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title_key: None,
        }
    }

    pub fn with_title(mut self, key: impl Into<String>) -> Self {
        self.title_key = Some(key.into());
        self
    }
}

/// How a row's selection key is found
pub enum RowKey<T> {
    /// Field of the serialized row
    Field(String),
    Extractor(Arc<dyn Fn(&T) -> String + Send + Sync>),
}

impl<T> Clone for RowKey<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Field(name) => Self::Field(name.clone()),
            Self::Extractor(f) => Self::Extractor(f.clone()),
        }
    }
}

impl<T: Serialize> RowKey<T> {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn extractor(f: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        Self::Extractor(Arc::new(f))
    }

    /// Key as a string (numbers rendered in decimal); `None` when the
    /// field is missing or null
    pub fn key_of(&self, row: &T) -> Option<String> {
        match self {
            Self::Extractor(f) => Some(f(row)),
            Self::Field(name) => {
                let value = serde_json::to_value(row).ok()?;
                match value.get(name)? {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                }
            }
        }
    }
}

/// What an action sees when it runs
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCtx<T> {
    pub selected_keys: Vec<String>,
    pub selected_rows: Vec<T>,
}

impl<T> ActionCtx<T> {
    pub fn has_selection(&self) -> bool {
        !self.selected_keys.is_empty()
    }
}

/// What the view does once an action finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterAction {
    Stay,
    /// Back to page 1 and reload
    Refresh,
}

pub type ActionHandler<T> = Arc<dyn Fn(ActionCtx<T>) -> BoxFuture<'static, AfterAction> + Send + Sync>;
pub type DisabledPredicate<T> = Arc<dyn Fn(&ActionCtx<T>) -> bool + Send + Sync>;

/// Toolbar, batch or per-row action
pub struct ActionDescriptor<T> {
    pub key: String,
    pub text_key: String,
    /// Hidden and refused without this permission
    pub permission: Option<String>,
    /// Ask before running
    pub confirm_key: Option<String>,
    pub disabled: Option<DisabledPredicate<T>>,
    pub on_click: ActionHandler<T>,
}

impl<T> Clone for ActionDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            text_key: self.text_key.clone(),
            permission: self.permission.clone(),
            confirm_key: self.confirm_key.clone(),
            disabled: self.disabled.clone(),
            on_click: self.on_click.clone(),
        }
    }
}

impl<T: Send + 'static> ActionDescriptor<T> {
    pub fn new<F, Fut>(key: impl Into<String>, text_key: impl Into<String>, on_click: F) -> Self
    where
        F: Fn(ActionCtx<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AfterAction> + Send + 'static,
    {
        Self {
            key: key.into(),
            text_key: text_key.into(),
            permission: None,
            confirm_key: None,
            disabled: None,
            on_click: Arc::new(move |ctx| Box::pin(on_click(ctx))),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn with_confirm(mut self, key: impl Into<String>) -> Self {
        self.confirm_key = Some(key.into());
        self
    }

    pub fn disabled_when(mut self, f: impl Fn(&ActionCtx<T>) -> bool + Send + Sync + 'static) -> Self {
        self.disabled = Some(Arc::new(f));
        self
    }

    /// Disabled while nothing is selected (typical batch action)
    pub fn requires_selection(self) -> Self {
        self.disabled_when(|ctx| !ctx.has_selection())
    }

    pub fn is_disabled(&self, ctx: &ActionCtx<T>) -> bool {
        self.disabled.as_ref().is_some_and(|f| f(ctx))
    }
}
