use clap::Parser;

/// Launcher options for the messagebus broker.
#[derive(Debug, Parser)]
#[command(name = "brokerd", about = "WebSocket message broker for long-lived agent connections")]
pub struct Cli {
    /// Interface to bind the HTTP/WebSocket server to.
    #[arg(long, env = "BROKER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP/WebSocket server to.
    #[arg(long, env = "BROKER_PORT", default_value_t = 8000)]
    pub port: u16,

    /// `tracing-subscriber` `EnvFilter` directive, e.g. `info` or `broker_core=debug,info`.
    #[arg(long, env = "BROKER_LOG", default_value = "info")]
    pub log_level: String,

    /// Maximum number of simultaneously registered agent identities; connections past this cap
    /// are rejected with a policy-violation close, the same as a duplicate identity.
    #[arg(long, env = "BROKER_IDENTITY_CAPACITY", default_value_t = 10_000)]
    pub identity_capacity: usize,
}

impl Cli {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
