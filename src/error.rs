//! Error types for iterdns.

use std::net::Ipv4Addr;

use thiserror::Error;

/// Errors that can abort a resolution request.
///
/// Server-reported failures (a non-zero response code) are *not* errors:
/// they are a terminal, valid outcome of resolution. Cache file problems
/// are recovered locally and never surface here either.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// IO error (socket creation, send, receive).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No response from an upstream server within the configured timeout.
    #[error("no response from {server} within {timeout_secs}s")]
    Timeout {
        /// The server that failed to answer.
        server: Ipv4Addr,
        /// The receive timeout that elapsed, in seconds.
        timeout_secs: u64,
    },

    /// DNS wire-format error (encoding a query, decoding a response, or an
    /// unparseable hostname).
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
