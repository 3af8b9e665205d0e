use clap::{ArgAction, Parser};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Arguments shared by every command.
#[derive(Parser, Clone, Debug)]
pub(crate) struct GlobalArgs {
    /// Verbosity level; repeat to log more (`-v` debug, `-vv` trace). `RUST_LOG` takes
    /// precedence.
    #[arg(short = 'v', long = "verbosity", action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Port to serve Prometheus metrics on. Metrics are disabled when unset.
    #[arg(long = "metrics.port", env = "UNITSCAN_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Address to serve Prometheus metrics on.
    #[arg(long = "metrics.addr", env = "UNITSCAN_METRICS_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub metrics_addr: IpAddr,
}

impl GlobalArgs {
    /// The socket to serve metrics on, if enabled.
    pub(crate) fn metrics_socket(&self) -> Option<SocketAddr> {
        self.metrics_port.map(|port| SocketAddr::new(self.metrics_addr, port))
    }
}
