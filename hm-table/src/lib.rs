//! hm-table - remote data-table controller
//!
//! Drives one paginated, filtered, sortable server-backed view: builds the
//! list query, cancels superseded requests, keeps selection, gates batch
//! actions and persists column visibility / density per view.
//!
//! Descriptors are plain records; rendering is somebody else's job.

pub mod controller;
pub mod descriptor;
pub mod filters;
pub mod prefs;

pub use controller::{
    ActionOutcome, AlwaysConfirm, Confirm, FnSource, LoadState, RunOutcome, TableController,
    TableControllerBuilder, TableSnapshot, TableSource,
};
pub use descriptor::{
    ActionCtx, ActionDescriptor, AfterAction, ColumnDescriptor, FilterDescriptor, FilterKind,
    RowKey,
};
pub use filters::{date_range, transform_filters};
pub use prefs::{ColumnState, Density, ViewPrefs, merge_column_states};
