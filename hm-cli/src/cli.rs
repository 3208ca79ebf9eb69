use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// hm - console client for the hm admin backend
#[derive(Parser, Debug)]
#[command(name = "hm")]
#[command(version, about = "Console client for the hm admin backend", long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides APP_BASE_API)
    #[arg(long = "base-url", env = "APP_BASE_API")]
    pub base_url: Option<String>,

    /// Where the session and view preferences are kept
    #[arg(long = "state", env = "HM_STATE_FILE", default_value = ".hm/state.json")]
    pub state: PathBuf,

    /// Message language (zh / en)
    #[arg(long = "lang", env = "HM_LANG", default_value = "zh")]
    pub lang: String,

    /// Log level when RUST_LOG is unset
    #[arg(long = "log-level", env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// JSON log lines
    #[arg(long = "log-json")]
    pub log_json: bool,

    /// Also write daily log files here
    #[arg(long = "log-dir", env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and keep the token
    Login(LoginArgs),
    /// Sign out and forget the token
    Logout,
    /// Show the signed-in user, roles and permissions
    Whoami,
    /// List tenants offered on the login page
    Tenants,
    /// Download center: list export tasks, optionally run a batch action
    Exports(ExportsArgs),
}

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// Falls back to the remembered username
    #[arg(short, long)]
    pub username: Option<String>,
    #[arg(short, long, env = "HM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[arg(short, long)]
    pub tenant: Option<String>,
    /// Captcha answer
    #[arg(long, requires = "uuid")]
    pub code: Option<String>,
    /// Captcha id
    #[arg(long)]
    pub uuid: Option<String>,
    /// Remember tenant / username / password
    #[arg(long)]
    pub remember: bool,
}

#[derive(clap::Args, Debug)]
pub struct ExportsArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 10)]
    pub size: u32,
    /// File name contains
    #[arg(long)]
    pub name: Option<String>,
    /// Status codes, comma separated
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<i64>,
    /// Creator user ids, comma separated
    #[arg(long = "creator", value_delimiter = ',')]
    pub creators: Vec<i64>,
    /// Created from (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    pub from: Option<chrono::NaiveDate>,
    /// Created until (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    pub to: Option<chrono::NaiveDate>,
    /// Batch action to run on `--ids`
    #[arg(long, value_enum, requires = "ids")]
    pub action: Option<BatchAction>,
    /// Task ids on the listed page, comma separated
    #[arg(long, value_delimiter = ',')]
    pub ids: Vec<i64>,
    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
    /// Hide a column (persisted)
    #[arg(long = "hide")]
    pub hide: Vec<String>,
    /// Show a hidden column again (persisted)
    #[arg(long = "show")]
    pub show: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchAction {
    Download,
    Retry,
    Cancel,
}

impl BatchAction {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Download => "batchDownload",
            Self::Retry => "batchRetry",
            Self::Cancel => "batchCancel",
        }
    }
}
