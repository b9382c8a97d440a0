use anyhow::bail;
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Call shape to exercise.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Unary: one request, one response.
    Un,
    /// Server streaming: one request, many responses.
    Ss,
    /// Client streaming: many requests, one response.
    Cs,
    /// Bidirectional streaming.
    Bi,
}

/// Command-line configuration for the `greeter-client` binary.
///
/// Every option can also be supplied through the environment (or a `.env`
/// file).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "greeter-client",
    version,
    about = "Exercises the four call shapes of the greeter gRPC service"
)]
pub struct CliArgs {
    /// Server address. A missing scheme defaults to `http://`.
    ///
    /// Environment variable: `GREETER_ADDR`
    #[arg(long, env = "GREETER_ADDR", default_value_t = String::from("http://127.0.0.1:55555"))]
    pub addr: String,

    /// Which call to make.
    #[arg(long = "type", value_enum, env = "GREETER_TYPE", default_value_t = Mode::Un)]
    pub mode: Mode,

    /// Name placed in each request.
    ///
    /// Environment variable: `GREETER_NAME`
    #[arg(long, env = "GREETER_NAME", default_value_t = String::new())]
    pub name: String,

    /// Delay between consecutive streamed requests, in milliseconds.
    #[arg(long, env = "GREETER_INTERVAL_MS", default_value_t = 1000)]
    pub interval_ms: u64,

    /// Number of requests sent by a client-streaming call.
    #[arg(long, env = "GREETER_COUNT", default_value_t = 3)]
    pub count: usize,

    /// Stop a bidirectional call after this many requests. Unbounded when
    /// omitted; Ctrl+C half-closes the call instead.
    #[arg(long, env = "GREETER_LIMIT")]
    pub limit: Option<usize>,

    /// Name substituted on the bidirectional stream to provoke a reply.
    #[arg(long, env = "GREETER_SENTINEL", default_value_t = String::from("john"))]
    pub sentinel: String,

    /// Substitute the sentinel whenever the wall-clock second is a multiple
    /// of this value. Zero disables the substitution.
    #[arg(long, env = "GREETER_SENTINEL_EVERY_SECS", default_value_t = 5)]
    pub sentinel_every_secs: u64,

    /// Depth of the outbound request queue of a streaming call.
    #[arg(long, env = "GREETER_BUFFER", default_value_t = 8)]
    pub buffer: usize,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub addr: String,
    pub mode: Mode,
    pub name: String,
    pub interval: Duration,
    pub count: usize,
    pub limit: Option<usize>,
    pub sentinel: String,
    pub sentinel_every_secs: u64,
    pub buffer: usize,
}

impl TryFrom<CliArgs> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.buffer == 0 {
            bail!("GREETER_BUFFER must be greater than 0");
        }

        let addr = if args.addr.contains("://") {
            args.addr
        } else {
            format!("http://{}", args.addr)
        };

        Ok(Self {
            addr,
            mode: args.mode,
            name: args.name,
            interval: Duration::from_millis(args.interval_ms),
            count: args.count,
            limit: args.limit,
            sentinel: args.sentinel,
            sentinel_every_secs: args.sentinel_every_secs,
            buffer: args.buffer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ClientConfig> {
        let argv = std::iter::once("greeter-client").chain(args.iter().copied());
        ClientConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn adds_missing_scheme() {
        let config = parse(&["--addr", "10.0.0.1:1234"]).unwrap();
        assert_eq!(config.addr, "http://10.0.0.1:1234");

        let config = parse(&["--addr", "https://example.com"]).unwrap();
        assert_eq!(config.addr, "https://example.com");
    }

    #[test]
    fn parses_mode_and_bounds() {
        let config = parse(&["--type", "bi", "--name", "john", "--limit", "4"]).unwrap();
        assert_eq!(config.mode, Mode::Bi);
        assert_eq!(config.name, "john");
        assert_eq!(config.limit, Some(4));
    }

    #[test]
    fn rejects_zero_buffer() {
        assert!(parse(&["--buffer", "0"]).is_err());
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(parse(&["--type", "xx"]).is_err());
    }
}
