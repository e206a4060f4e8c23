//! iterdns - An iterative DNS resolver with a TTL-aware record cache.
//!
//! This crate resolves hostnames the way a recursive name server does:
//! starting at a root server, it follows delegations (and CNAME
//! indirections) down the authoritative chain over UDP until it reaches an
//! answer. Answers and delegation glue can be memoized in a time-bounded
//! cache that persists between invocations as a JSON file.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                        iterdns                         │
//! │                                                        │
//! │  ┌────────────┐  lookup / add   ┌──────────────────┐   │
//! │  │  Resolver  │────────────────▶│   RecordCache    │   │
//! │  │ (recursive │                 │ (in-memory, TTL) │   │
//! │  │ algorithm) │                 └────────┬─────────┘   │
//! │  └─────┬──────┘                          │ load/save   │
//! │        │ UDP :53                         ▼             │
//! │        ▼                          dns-cache.json       │
//! │   root server ─▶ TLD server ─▶ authoritative server    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Resolution
//!
//! ```text
//! resolve_host("host.example")
//!   → query root (rd=0, type A)
//!   → delegation: NS + glue A records → query next server
//!   → terminal answer (or server-reported error) → partition into
//!     aliases (CNAME) and addresses (A)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use iterdns::{RecordCache, Resolver, ResolverConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ResolverConfig::default();
//!     let cache = RecordCache::new(config.cache_ttl);
//!     cache.load();
//!
//!     let resolver = Resolver::new(&config, Some(cache.clone()));
//!     let lookup = resolver.resolve_host("example.com").await.unwrap();
//!     println!("{:?}", lookup.addresses);
//!
//!     cache.save();
//! }
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod resolver;
pub mod telemetry;

// Re-export main types
pub use cache::{CacheRecord, RecordCache};
pub use config::{Config, ResolverConfig, TelemetryConfig};
pub use error::ResolveError;
pub use resolver::{HostLookup, Resolver};
