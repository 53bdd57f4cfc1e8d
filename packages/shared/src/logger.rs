//! Logging setup utilities for Hibiki binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Library crates whose log output is enabled alongside the binary's own.
const WORKSPACE_CRATES: &[&str] = &["hibiki_client", "hibiki_shared"];

/// Build the default `EnvFilter` directive used when `RUST_LOG` is not set.
///
/// Every workspace crate and the binary itself log at `default_log_level`.
pub fn default_directive(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");
    let mut targets: Vec<&str> = WORKSPACE_CRATES.to_vec();
    if !targets.contains(&binary_target.as_str()) {
        targets.push(&binary_target);
    }

    targets
        .iter()
        .map(|target| format!("{}={}", target, default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "hibiki-client")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use hibiki_shared::logger::setup_logger;
///
/// setup_logger("hibiki-client", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_does_not_repeat_workspace_binary() {
        // テスト項目: バイナリ名がワークスペースのクレート名と同じ場合は重複しない
        // given (前提条件):
        let binary_name = "hibiki-client";

        // when (操作):
        let directive = default_directive(binary_name, "debug");

        // then (期待する結果):
        assert_eq!(directive, "hibiki_client=debug,hibiki_shared=debug");
    }

    #[test]
    fn test_default_directive_normalizes_hyphens() {
        // テスト項目: バイナリ名のハイフンはアンダースコアに変換される
        // given (前提条件):
        let binary_name = "room-probe";

        // when (操作):
        let directive = default_directive(binary_name, "warn");

        // then (期待する結果):
        assert!(directive.ends_with("room_probe=warn"));
    }
}
