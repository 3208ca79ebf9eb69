mod cli;
mod commands;
mod console;
mod logger;

use clap::Parser;
use cli::{Cli, Command};
use commands::App;
use console::{ConsoleNavigator, ConsoleNotifier};
use hm_client::{ClientConfig, FileStorage, HttpClient, KvStorage, Locale, StorageSession};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量 (.env 优先于 clap 的 env 读取)
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // 2. 日志
    let _log_guard = logger::init_logger(&cli.log_level, cli.log_json, cli.log_dir.as_deref());

    // 3. 配置
    let mut config = ClientConfig::from_env();
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    tracing::debug!(base_url = %config.base_url, state = %cli.state.display(), "Starting hm-cli");

    // 4. 会话 / 偏好存储
    let storage: Arc<dyn KvStorage> = Arc::new(FileStorage::open(&cli.state)?);
    let messages = Arc::new(console::messages(Locale::parse(&cli.lang)));
    let http = HttpClient::builder(config)
        .session(Arc::new(StorageSession::new(storage.clone())))
        .notifier(Arc::new(ConsoleNotifier))
        .navigator(Arc::new(ConsoleNavigator))
        .messages(messages.clone())
        .build()?;

    let app = App {
        http,
        storage,
        messages,
        state_dir: commands::state_dir(&cli.state),
    };

    // 5. 子命令
    let result = match cli.command {
        Command::Login(args) => app.login(args).await,
        Command::Logout => app.logout().await,
        Command::Whoami => app.whoami().await,
        Command::Tenants => app.tenants().await,
        Command::Exports(args) => app.exports(args).await,
    };

    if let Err(e) = &result {
        tracing::debug!(error = %e, "Command failed");
    }
    result
}
