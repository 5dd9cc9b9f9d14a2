use anyhow::bail;
use clap::{Parser, ValueEnum};
use std::time::Duration;
use uuid_mcp_core::{OsRandom, RandSource, ThreadRandom};

/// Runtime configuration for the `uuid-mcp-server` binary.
///
/// All values are parsed from CLI arguments or environment variables, with
/// defaults suitable for being spawned by an MCP client. The binary takes no
/// positional arguments; clients normally launch it bare.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "uuid-mcp-server",
    version,
    about = "A Model Context Protocol server over stdio that generates version 4 UUIDs"
)]
pub struct CliArgs {
    /// Random source behind generated UUIDs.
    ///
    /// `thread` uses the reseeding thread-local generator. `os` reads the
    /// operating system's entropy source on every call.
    ///
    /// Environment variable: `UUID_MCP_RNG`
    #[arg(long, env = "UUID_MCP_RNG", value_enum, default_value_t = RngKind::Thread)]
    pub rng: RngKind,

    /// Largest accepted frame, in bytes, excluding the trailing newline.
    ///
    /// A longer frame is answered with an invalid-request error and ends the
    /// session.
    ///
    /// Environment variable: `MAX_MESSAGE_BYTES`
    #[arg(long, env = "MAX_MESSAGE_BYTES", default_value_t = 4 * 1024 * 1024)]
    pub max_message_bytes: usize,

    /// Format of diagnostic output on stderr.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Upper bound, in milliseconds, on runtime teardown after the transport
    /// closes. A pending blocking read on stdin is abandoned after this.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_MS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_MS", default_value_t = 500)]
    pub shutdown_timeout_ms: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngKind {
    Thread,
    Os,
}

impl RngKind {
    pub fn source(self) -> Box<dyn RandSource + Send> {
        match self {
            RngKind::Thread => Box::new(ThreadRandom),
            RngKind::Os => Box::new(OsRandom),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub rng: RngKind,
    pub max_message_bytes: usize,
    pub log_format: LogFormat,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_message_bytes == 0 {
            bail!("MAX_MESSAGE_BYTES must be greater than 0");
        }

        Ok(Self {
            rng: args.rng,
            max_message_bytes: args.max_message_bytes,
            log_format: args.log_format,
            shutdown_timeout: Duration::from_millis(args.shutdown_timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let args = CliArgs::try_parse_from(
            std::iter::once("uuid-mcp-server").chain(args.iter().copied()),
        )?;
        ServerConfig::try_from(args)
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--rng",
            "os",
            "--max-message-bytes",
            "1024",
            "--log-format",
            "json",
            "--shutdown-timeout-ms",
            "10",
        ])
        .unwrap();
        assert_eq!(config.rng, RngKind::Os);
        assert_eq!(config.max_message_bytes, 1024);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(10));
    }

    #[test]
    fn rejects_zero_message_size() {
        let err = parse(&["--max-message-bytes", "0"]).unwrap_err();
        assert!(err.to_string().contains("MAX_MESSAGE_BYTES"));
    }

    #[test]
    fn rejects_unknown_rng() {
        assert!(parse(&["--rng", "dice"]).is_err());
    }

    #[test]
    fn selected_source_generates() {
        for kind in [RngKind::Thread, RngKind::Os] {
            let bytes = kind.source().rand().unwrap();
            assert_eq!(bytes.len(), 16);
        }
    }
}
