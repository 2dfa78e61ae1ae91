//! DNS message codec and single-shot UDP query client.
//!
//! ```no_run
//! use std::time::Duration;
//! use dnsq::{RecordClass, RecordType, Request};
//!
//! # async fn run() -> Result<(), dnsq::DnsError> {
//! let mut request = Request::new("1.1.1.1", 53)?;
//! request.add_query("example.com", RecordType::A, RecordClass::INET)?;
//!
//! let response = request.exchange(Duration::from_secs(10)).await?;
//! for ip in response.ips() {
//!     println!("{}", ip);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bitfield;
pub mod codec;
pub mod errors;
pub mod exchange;
pub mod message;
pub mod parsers;
pub mod protocol;

pub use codec::DnsCodec;
pub use errors::DnsError;
pub use exchange::DEFAULT_TIMEOUT;
pub use message::{Request, Response};
pub use protocol::{
    DomainName, Flags, Header, Identifier, NameReference, OperationCode, Query, RecordClass,
    RecordType, ResourceRecord, ResponseCode,
};
