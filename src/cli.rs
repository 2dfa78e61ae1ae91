use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use dnsq::{RecordType, DEFAULT_TIMEOUT};

#[derive(Parser, Debug)]
#[command(name = "dnsq")]
#[command(about = "Send a single DNS query over UDP and print the reply", long_about = None)]
pub struct Args {
    /// Domain name to look up
    #[arg(short, long, default_value = "google.com")]
    pub domain: String,

    /// DNS server to ask, as an IP address
    #[arg(short, long, default_value = "1.1.1.1", value_parser = parse_server)]
    pub server: IpAddr,

    /// DNS server port
    #[arg(short, long, default_value_t = 53)]
    pub port: u16,

    /// Record type to ask for: A, NS, CNAME or MX
    #[arg(short = 't', long, default_value = "A")]
    pub record_type: RecordType,

    /// Seconds to wait for the reply
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Log at debug level, including request and response bytes
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_server(s: &str) -> Result<IpAddr, String> {
    s.parse::<IpAddr>().map_err(|_| {
        format!(
            "Invalid server address: '{}'. Expected an IPv4 or IPv6 address",
            s
        )
    })
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
