// ABOUTME: CLI command definitions using clap
// ABOUTME: Connection flags are global; each subcommand carries its own pool and payload flags

use clap::{Args, Parser, Subcommand};
use wick_core::parse_key_value;

pub mod call;
pub mod join;
pub mod keygen;
pub mod publish;
pub mod register;
pub mod subscribe;

#[derive(Parser, Debug)]
#[command(name = "wick", version, about = "WAMP command-line client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start wamp session(s) and wait until interrupted
    Join(JoinArgs),

    /// Subscribe a topic
    Subscribe(SubscribeArgs),

    /// Publish to a topic
    Publish(PublishArgs),

    /// Register a procedure
    Register(RegisterArgs),

    /// Call a procedure
    Call(CallArgs),

    /// Generate a WAMP cryptosign ed25519 keypair
    Keygen,
}

/// Router, realm and credentials shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// WAMP URL to connect to
    #[arg(long, global = true, env = "WICK_URL", default_value = "ws://localhost:8080/ws")]
    pub url: String,

    /// The WAMP realm to join
    #[arg(long, global = true, env = "WICK_REALM", default_value = "realm1")]
    pub realm: String,

    /// The authentication method to use
    #[arg(
        long,
        global = true,
        env = "WICK_AUTHMETHOD",
        default_value = "anonymous",
        value_parser = ["anonymous", "ticket", "wampcra", "cryptosign"]
    )]
    pub authmethod: String,

    /// The authid to use, if authenticating
    #[arg(long, global = true, env = "WICK_AUTHID")]
    pub authid: Option<String>,

    /// The authrole to use, if authenticating
    #[arg(long, global = true, env = "WICK_AUTHROLE")]
    pub authrole: Option<String>,

    /// The secret to use in challenge-response auth
    #[arg(long, global = true, env = "WICK_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// The ed25519 private key hex for cryptosign
    #[arg(long, global = true, env = "WICK_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// The ticket when using ticket authentication
    #[arg(long, global = true, env = "WICK_TICKET", hide_env_values = true)]
    pub ticket: Option<String>,

    /// The serializer to use
    #[arg(
        long,
        global = true,
        env = "WICK_SERIALIZER",
        default_value = "json",
        value_parser = ["json", "msgpack", "cbor"]
    )]
    pub serializer: String,
}

/// Session fan-out flags shared by every networked command.
#[derive(Args, Debug, Clone)]
pub struct PoolArgs {
    /// Join requested number of wamp sessions
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub parallel: u64,

    /// Number of sessions (and repeats) worked on at once
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: u64,

    /// Interval between websocket pings in seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    pub keepalive: u64,

    /// Log how long the command took
    #[arg(long)]
    pub time: bool,
}

impl PoolArgs {
    pub fn sessions(&self) -> usize {
        self.parallel as usize
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency as usize
    }
}

#[derive(Args, Debug)]
pub struct JoinArgs {
    #[command(flatten)]
    pub pool: PoolArgs,
}

#[derive(Args, Debug)]
pub struct SubscribeArgs {
    /// Topic to subscribe
    pub topic: String,

    /// Subscribe option (may be provided multiple times)
    #[arg(short = 'o', long = "option", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Print event details
    #[arg(long)]
    pub details: bool,

    /// Wait for a given number of events and exit (0 waits forever)
    #[arg(long, default_value_t = 0)]
    pub event_count: u64,

    #[command(flatten)]
    pub pool: PoolArgs,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Topic URI to publish on
    pub topic: String,

    /// Positional arguments; quote a value to keep it a string
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,

    /// Keyword argument (may be provided multiple times)
    #[arg(short = 'k', long = "kwarg", value_parser = parse_key_value)]
    pub kwargs: Vec<(String, String)>,

    /// WAMP publish option (may be provided multiple times)
    #[arg(short = 'o', long = "option", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Publish to the topic the provided number of times
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub repeat: u64,

    /// Delay in milliseconds before every publish
    #[arg(long, default_value_t = 0)]
    pub delay: u64,

    #[command(flatten)]
    pub pool: PoolArgs,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Procedure URI
    pub procedure: String,

    /// Shell command to run on invocation; its output is returned
    pub command: Option<String>,

    /// WAMP registration option (may be provided multiple times)
    #[arg(short = 'o', long = "option", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Register the procedure after a delay in milliseconds
    #[arg(long, default_value_t = 0)]
    pub delay: u64,

    /// Leave the session after the procedure is invoked this many times
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub invoke_count: Option<u64>,

    #[command(flatten)]
    pub pool: PoolArgs,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Procedure to call
    pub procedure: String,

    /// Positional arguments; quote a value to keep it a string
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,

    /// Keyword argument (may be provided multiple times)
    #[arg(short = 'k', long = "kwarg", value_parser = parse_key_value)]
    pub kwargs: Vec<(String, String)>,

    /// WAMP call option (may be provided multiple times)
    #[arg(short = 'o', long = "option", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Call the procedure the requested number of times
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub repeat: u64,

    /// Delay in milliseconds before every call
    #[arg(long, default_value_t = 0)]
    pub delay: u64,

    /// Write this result argument directly to stdout instead of rendering
    #[arg(long, allow_negative_numbers = true)]
    pub raw_output_arg: Option<i64>,

    #[command(flatten)]
    pub pool: PoolArgs,
}
