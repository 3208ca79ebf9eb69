//! Async export task model (download center)

use serde::{Deserialize, Serialize};

/// Export task status (排队 / 处理中 / 完成 / 失败 / 异常)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportStatus {
    Queued,
    Processing,
    Done,
    Failed,
    Abnormal,
    Unknown(i32),
}

impl From<i32> for ExportStatus {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::Queued,
            1 => Self::Processing,
            2 => Self::Done,
            3 => Self::Failed,
            -1 => Self::Abnormal,
            other => Self::Unknown(other),
        }
    }
}

impl ExportStatus {
    pub fn can_cancel(self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }

    pub fn can_download(self) -> bool {
        self == Self::Done
    }

    /// Processing tasks can be retried too (stuck workers)
    pub fn can_retry(self) -> bool {
        matches!(self, Self::Failed | Self::Abnormal | Self::Processing)
    }
}

/// One row of `/product/asyncExport/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportItem {
    pub async_export_id: i64,
    pub file_name: String,
    #[serde(default)]
    pub count_now: u64,
    #[serde(default)]
    pub count_data: u64,
    #[serde(default)]
    pub file_size: String,
    #[serde(default)]
    pub down_num: u32,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub create_time: String,
    /// Backend spelling
    #[serde(default)]
    pub complate_time: Option<String>,
    pub status: i32,
}

impl ExportItem {
    pub fn status(&self) -> ExportStatus {
        ExportStatus::from(self.status)
    }

    /// Completion percentage, 0 when the total is unknown
    pub fn progress_percent(&self) -> u32 {
        if self.count_data == 0 {
            return 0;
        }
        ((self.count_now as f64 / self.count_data as f64) * 100.0).round() as u32
    }
}

/// Status dictionary entry, normalised from the system dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOption {
    pub value: i64,
    pub label: String,
    pub list_class: String,
}
