use anyhow::bail;
use clap::{ArgAction, Parser};
use std::time::Duration;

/// Runtime configuration for the `greeter-server` binary.
///
/// These settings control where the service listens and the pacing of the
/// demonstration call shapes. All values are parsed from CLI arguments or
/// environment variables. The defaults pace a server stream at one result per
/// second.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "greeter-server",
    version,
    about = "A gRPC greeter service with unary, streaming and bidirectional calls"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:55555"))]
    pub server_addr: String,

    /// Number of results a server-streaming call delivers.
    ///
    /// Environment variable: `STREAM_COUNT`
    #[arg(long, env = "STREAM_COUNT", default_value_t = 3)]
    pub stream_count: usize,

    /// Pause between server-streamed results, in milliseconds.
    ///
    /// Environment variable: `STREAM_INTERVAL_MS`
    #[arg(long, env = "STREAM_INTERVAL_MS", default_value_t = 1000)]
    pub stream_interval_ms: u64,

    /// End a server stream with `INVALID_ARGUMENT` after the last result
    /// instead of closing it cleanly. Results already delivered remain valid.
    ///
    /// Environment variable: `DISCONNECT_AFTER_STREAM`
    #[arg(long, env = "DISCONNECT_AFTER_STREAM", default_value_t = true, action = ArgAction::Set)]
    pub disconnect_after_stream: bool,

    /// Capacity of the response buffer between a streaming task and the gRPC
    /// stream.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Name that makes the bidirectional stream answer with a result.
    ///
    /// Environment variable: `SENTINEL_NAME`
    #[arg(long, env = "SENTINEL_NAME", default_value_t = String::from("john"))]
    pub sentinel_name: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub stream_count: usize,
    pub stream_interval: Duration,
    pub disconnect_after_stream: bool,
    pub stream_buffer_size: usize,
    pub sentinel_name: String,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        // A blank name already maps to the status frame.
        if args.sentinel_name.is_empty() {
            bail!("SENTINEL_NAME must not be empty");
        }

        Ok(Self {
            server_addr: args.server_addr,
            stream_count: args.stream_count,
            stream_interval: Duration::from_millis(args.stream_interval_ms),
            disconnect_after_stream: args.disconnect_after_stream,
            stream_buffer_size: args.stream_buffer_size,
            sentinel_name: args.sentinel_name,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config(extra: &[&str]) -> ServerConfig {
    let argv = ["greeter-server", "--stream-interval-ms", "0"]
        .into_iter()
        .chain(extra.iter().copied());
    ServerConfig::try_from(CliArgs::parse_from(argv)).expect("valid test config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::try_from(CliArgs::parse_from(["greeter-server"])).unwrap();
        assert_eq!(config.stream_count, 3);
        assert!(config.disconnect_after_stream);
        assert_eq!(config.sentinel_name, "john");
    }

    #[test]
    fn disconnect_can_be_disabled() {
        let config = test_config(&["--disconnect-after-stream", "false"]);
        assert!(!config.disconnect_after_stream);
        assert_eq!(config.stream_interval, Duration::ZERO);
    }

    #[test]
    fn rejects_zero_buffer() {
        let args = CliArgs::parse_from(["greeter-server", "--stream-buffer-size", "0"]);
        assert!(ServerConfig::try_from(args).is_err());
    }

    #[test]
    fn rejects_blank_sentinel() {
        let args = CliArgs::parse_from(["greeter-server", "--sentinel-name", ""]);
        assert!(ServerConfig::try_from(args).is_err());
    }
}
