//! Terminal client for a Hibiki feedback room.
//!
//! Joins the room's realtime channel, keeps it alive across disconnects and
//! turns typed lines into reactions, questions, upvotes and poll votes.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hibiki-client -- --room ABC123
//! cargo run --bin hibiki-client -- -r ABC123 --role presenter
//! ```

use clap::Parser;

use hibiki_client::{
    SyncConfig,
    client::{ClientOptions, Role, run_client},
    config::DEFAULT_BASE_URL,
};
use hibiki_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hibiki-client")]
#[command(about = "Realtime audience-feedback client for a Hibiki room", long_about = None)]
struct Args {
    /// Room code to join
    #[arg(short = 'r', long)]
    room: String,

    /// Base address of the room channel server
    #[arg(short = 'u', long, default_value = DEFAULT_BASE_URL)]
    url: String,

    /// Presenters see alerts and may start polls
    #[arg(long, value_enum, default_value_t = Role::Audience)]
    role: Role,

    /// Delay before reconnecting after a disconnect
    #[arg(long, default_value_t = 3)]
    reconnect_delay_secs: u64,

    /// Interval of the stats heartbeat
    #[arg(long, default_value_t = 5)]
    heartbeat_secs: u64,
}

impl Args {
    fn into_options(self) -> ClientOptions {
        let config = SyncConfig {
            reconnect_delay_ms: self.reconnect_delay_secs.saturating_mul(1_000),
            heartbeat_interval_ms: self.heartbeat_secs.max(1).saturating_mul(1_000),
            ..SyncConfig::default()
        };
        ClientOptions {
            base_url: self.url,
            room: self.room,
            role: self.role,
            config,
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run_client(args.into_options()).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_huge_delays_saturate_instead_of_overflowing() {
        // テスト項目: 極端に大きな秒数を指定してもオーバーフローせず上限値に丸められる
        // given (前提条件):
        let huge = u64::MAX.to_string();
        let args = Args::parse_from([
            "hibiki-client",
            "--room",
            "ABC123",
            "--reconnect-delay-secs",
            huge.as_str(),
            "--heartbeat-secs",
            huge.as_str(),
        ]);

        // when (操作):
        let options = args.into_options();

        // then (期待する結果):
        assert_eq!(options.config.reconnect_delay_ms, u64::MAX);
        assert_eq!(options.config.heartbeat_interval_ms, u64::MAX);
    }

    #[test]
    fn test_zero_heartbeat_is_raised_to_one_second() {
        // テスト項目: ハートビート間隔 0 秒は 1 秒に引き上げられる
        // given (前提条件):
        let args = Args::parse_from(["hibiki-client", "-r", "ABC123", "--heartbeat-secs", "0"]);

        // when (操作):
        let options = args.into_options();

        // then (期待する結果):
        assert_eq!(options.config.heartbeat_interval_ms, 1_000);
        assert_eq!(options.config.reconnect_delay_ms, 3_000);
        assert_eq!(options.room, "ABC123");
    }
}
