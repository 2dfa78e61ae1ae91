use crate::protocol::ResponseCode;

/// Errors that can occur while building, encoding, decoding or exchanging DNS messages
#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    #[error("Short buffer: need at least {needed} bytes, have {available}")]
    ShortBuffer { needed: usize, available: usize },

    #[error("Domain name runs past the end of the buffer")]
    TruncatedName,

    #[error("Section overrun: record claims {needed} bytes, {available} remain")]
    Overrun { needed: usize, available: usize },

    #[error("Label '{label}' is {len} bytes, the maximum is 63")]
    LabelTooLong { label: String, len: usize },

    #[error("Compression pointer at offset {offset} inside a name is not supported")]
    UnsupportedPointer { offset: usize },

    #[error("Query count would overflow 16 bits")]
    CounterOverflow,

    #[error("Invalid destination address: '{0}'")]
    InvalidAddress(String),

    #[error("Invalid destination port: {0}")]
    InvalidPort(i64),

    #[error("Response is truncated")]
    Truncated,

    #[error("Server responded with status: {0}")]
    ServerError(ResponseCode),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}
