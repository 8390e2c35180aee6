use thiserror::Error;

/// Errors raised while building, sending or receiving raw datagrams
#[derive(Error, Debug)]
pub enum PacketError {
    /// Host string did not resolve to any IPv4 address
    #[error("could not resolve '{host}' to an IPv4 address: {reason}")]
    Resolution { host: String, reason: String },

    /// Datagram would exceed the IPv4 total length ceiling
    #[error("datagram of {size} bytes exceeds the IPv4 maximum of {max} bytes")]
    Size { size: usize, max: usize },

    /// Internal layout invariant broken while encoding
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Received bytes are not a well formed IPv4 datagram
    #[error("parse error: {0}")]
    Parse(String),

    /// Raw socket I/O error
    #[error("raw socket I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using PacketError
pub type Result<T> = std::result::Result<T, PacketError>;
