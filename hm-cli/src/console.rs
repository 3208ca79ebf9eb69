//! Terminal implementations of the UI collaborators

use async_trait::async_trait;
use hm_client::{BuiltinMessages, Locale, Navigator, Notifier, Translate};
use hm_table::Confirm;
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Messages go to stderr, command output stays on stdout
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        eprintln!("✔ {message}");
    }

    fn warning(&self, message: &str) {
        eprintln!("! {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("✘ {message}");
    }
}

/// There is no router; tell the user what to run instead
#[derive(Debug, Default)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn redirect(&self, path: &str) {
        tracing::info!(route = %path, "Login required");
        eprintln!("→ run `hm login` to sign in again");
    }
}

/// y/N prompt on the terminal; `assume_yes` skips it
pub struct ConsoleConfirm {
    messages: Arc<dyn Translate>,
    assume_yes: bool,
}

impl ConsoleConfirm {
    pub fn new(messages: Arc<dyn Translate>, assume_yes: bool) -> Self {
        Self { messages, assume_yes }
    }
}

#[async_trait]
impl Confirm for ConsoleConfirm {
    async fn confirm(&self, message_key: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let question = self.messages.t(message_key, &[]);
        let answer = tokio::task::spawn_blocking(move || {
            eprint!("{question} [y/N] ");
            let _ = std::io::stderr().flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;
        match answer {
            Ok(Ok(line)) => is_yes(&line),
            _ => false,
        }
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "是")
}

/// Pipeline texts plus the download-center texts used by `hm exports`
pub fn messages(locale: Locale) -> BuiltinMessages {
    let table: &[(&str, &str)] = match locale {
        Locale::Zh => &[
            ("downloadCenter.selectTip", "请先选择任务"),
            ("downloadCenter.noFile", "所选任务没有可下载的文件"),
            ("downloadCenter.batchDownloadTitle", "确认下载所选文件？"),
            ("downloadCenter.batchRetryTitle", "确认重试所选任务？"),
            ("downloadCenter.batchCancelTitle", "确认取消所选任务？"),
            ("downloadCenter.notOnPage", "任务 {ids} 不在当前页"),
            ("common.success", "操作成功"),
        ],
        Locale::En => &[
            ("downloadCenter.selectTip", "Select tasks first"),
            ("downloadCenter.noFile", "None of the selected tasks has a file"),
            ("downloadCenter.batchDownloadTitle", "Download the selected files?"),
            ("downloadCenter.batchRetryTitle", "Retry the selected tasks?"),
            ("downloadCenter.batchCancelTitle", "Cancel the selected tasks?"),
            ("downloadCenter.notOnPage", "Tasks {ids} are not on this page"),
            ("common.success", "Done"),
        ],
    };
    table
        .iter()
        .fold(BuiltinMessages::new(locale), |m, (k, v)| m.with(*k, *v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(is_yes("是"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
    }

    #[test]
    fn test_messages_cover_both_locales() {
        let zh = messages(Locale::Zh);
        assert_eq!(zh.t("downloadCenter.selectTip", &[]), "请先选择任务");
        assert_eq!(zh.t("request.failed", &[]), "请求失败");
        let en = messages(Locale::En);
        assert_eq!(
            en.t("downloadCenter.notOnPage", &[("ids", "7,8")]),
            "Tasks 7,8 are not on this page"
        );
    }

    #[tokio::test]
    async fn test_assume_yes_skips_prompt() {
        let confirm = ConsoleConfirm::new(Arc::new(messages(Locale::En)), true);
        assert!(confirm.confirm("downloadCenter.batchRetryTitle").await);
    }
}
