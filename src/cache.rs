//! TTL-aware cache for DNS resource records.
//!
//! The cache is an in-memory set of records, unique by (name, type, class,
//! payload), with lazy expiry: entries are only discarded when a lookup
//! finds them past their TTL. It persists between invocations as a
//! human-inspectable JSON file; a missing or malformed file simply means an
//! empty cache, never a failure.
//!
//! `RecordCache` is a cheap `Clone` handle over shared state, so the
//! resolver can mutate the cache during resolution while the caller keeps
//! its own handle for [`RecordCache::save`] at the end of the session.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hickory_proto::rr::rdata;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::metrics::{self, CacheLookup};

/// Default cache file name in the working directory.
const CACHE_FILE: &str = "dns-cache.json";

/// Current wall-clock time as unix seconds.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Identity of a cached record: everything except the timestamps.
///
/// The payload is keyed by its presentation form so that two A records for
/// the same name with different addresses are distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RecordKey {
    name: Name,
    rtype: RecordType,
    class: DNSClass,
    data: String,
}

impl RecordKey {
    fn of(record: &Record) -> Self {
        Self {
            name: absolute(record.name()),
            rtype: record.record_type(),
            class: record.dns_class(),
            data: record.data().to_string(),
        }
    }
}

/// Normalize a name to its absolute form.
///
/// `Name` equality requires matching fqdn flags, and records parsed off
/// the wire always carry absolute names. Keying and looking up in
/// absolute form lets a relative query name ("host.example") hit an entry
/// cached from a response ("host.example.").
fn absolute(name: &Name) -> Name {
    let mut name = name.clone();
    name.set_fqdn(true);
    name
}

/// A resource record held in the cache, together with the wall-clock time
/// it was inserted and the TTL it remains valid for.
#[derive(Debug, Clone)]
pub struct CacheRecord {
    record: Record,
    added: u64,
    ttl: u64,
}

impl CacheRecord {
    fn new(record: Record, added: u64, default_ttl: u64) -> Self {
        // A record's own TTL wins; zero falls back to the cache-wide
        // default configured at construction.
        let ttl = if record.ttl() > 0 {
            u64::from(record.ttl())
        } else {
            default_ttl
        };
        Self { record, added, ttl }
    }

    /// The wrapped resource record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Unix timestamp (seconds) at which the record was inserted.
    pub fn added(&self) -> u64 {
        self.added
    }

    /// Seconds this entry remains valid after insertion.
    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Whether the entry is still valid at time `now`.
    fn is_valid_at(&self, now: u64) -> bool {
        now.saturating_sub(self.added) <= self.ttl
    }

    /// Convert to the serializable mapping written to the cache file.
    ///
    /// Returns `None` for payload types the cache file format does not
    /// cover (anything outside A/AAAA/CNAME/NS).
    pub fn to_stored(&self) -> Option<StoredRecord> {
        let data = match self.record.data() {
            RData::A(a) => a.0.to_string(),
            RData::AAAA(aaaa) => aaaa.0.to_string(),
            RData::CNAME(cname) => cname.0.to_utf8(),
            RData::NS(ns) => ns.0.to_utf8(),
            other => {
                debug!(rtype = %self.record.record_type(), data = %other, "skipping unstorable record");
                return None;
            }
        };
        Some(StoredRecord {
            name: self.record.name().to_utf8(),
            rtype: self.record.record_type().to_string(),
            class: self.record.dns_class().to_string(),
            data,
            ttl: self.ttl,
            added: self.added,
        })
    }

    /// Rebuild a cache record from its stored mapping.
    pub fn from_stored(stored: &StoredRecord) -> Result<Self, hickory_proto::ProtoError> {
        let name = Name::from_ascii(&stored.name)?;
        let rtype = RecordType::from_str(&stored.rtype)?;
        let class = DNSClass::from_str(&stored.class)?;
        let data = match rtype {
            RecordType::A => {
                let addr: Ipv4Addr = stored
                    .data
                    .parse()
                    .map_err(|_| hickory_proto::ProtoErrorKind::Message("invalid A payload"))?;
                RData::A(rdata::A(addr))
            }
            RecordType::AAAA => {
                let addr: Ipv6Addr = stored
                    .data
                    .parse()
                    .map_err(|_| hickory_proto::ProtoErrorKind::Message("invalid AAAA payload"))?;
                RData::AAAA(rdata::AAAA(addr))
            }
            RecordType::CNAME => RData::CNAME(rdata::CNAME(Name::from_ascii(&stored.data)?)),
            RecordType::NS => RData::NS(rdata::NS(Name::from_ascii(&stored.data)?)),
            _ => {
                return Err(
                    hickory_proto::ProtoErrorKind::Message("unsupported stored record type").into(),
                )
            }
        };
        let ttl = u32::try_from(stored.ttl).unwrap_or(u32::MAX);
        let mut record = Record::from_rdata(name, ttl, data);
        record.set_dns_class(class);
        Ok(Self {
            record,
            added: stored.added,
            ttl: stored.ttl,
        })
    }
}

/// One record as it appears in the persisted cache file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Domain name the record belongs to.
    pub name: String,
    /// Record type ("A", "CNAME", ...).
    #[serde(rename = "type")]
    pub rtype: String,
    /// Record class ("IN").
    pub class: String,
    /// Textual payload: an address for A/AAAA, a domain name for CNAME/NS.
    pub data: String,
    /// Seconds the entry remains valid after `added`.
    pub ttl: u64,
    /// Unix timestamp (seconds) of insertion.
    pub added: u64,
}

#[derive(Debug)]
struct CacheInner {
    records: HashMap<RecordKey, CacheRecord>,
    default_ttl: u64,
    path: PathBuf,
}

/// Cache for resource records, shared between the resolver and its caller.
#[derive(Debug, Clone)]
pub struct RecordCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl RecordCache {
    /// Create an empty cache backed by the default file path.
    ///
    /// `default_ttl` is the validity in seconds applied to records whose
    /// own TTL is zero.
    pub fn new(default_ttl: u64) -> Self {
        Self::with_path(default_ttl, CACHE_FILE)
    }

    /// Create an empty cache backed by the given file path.
    pub fn with_path(default_ttl: u64, path: impl AsRef<Path>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                records: HashMap::new(),
                default_ttl,
                path: path.as_ref().to_path_buf(),
            })),
        }
    }

    /// Look up a still-valid record matching (name, type, class) exactly.
    ///
    /// The first matching entry found decides: if it is valid the wrapped
    /// record is returned; if it has expired it is removed and the lookup
    /// reports a miss. Further matching entries, if any, are discarded
    /// only lazily on their own expiry.
    pub fn lookup(&self, name: &Name, rtype: RecordType, class: DNSClass) -> Option<Record> {
        self.lookup_at(name, rtype, class, unix_now())
    }

    fn lookup_at(
        &self,
        name: &Name,
        rtype: RecordType,
        class: DNSClass,
        now: u64,
    ) -> Option<Record> {
        let name = absolute(name);
        let mut inner = self.inner.write();

        let mut expired: Option<RecordKey> = None;
        for (key, entry) in &inner.records {
            if key.name == name && key.rtype == rtype && key.class == class {
                if entry.is_valid_at(now) {
                    debug!(%name, %rtype, "cache hit");
                    metrics::record_cache_lookup(rtype, CacheLookup::Hit);
                    return Some(entry.record.clone());
                }
                // Expired entry: collect the key, then remove outside the
                // iteration.
                expired = Some(key.clone());
                break;
            }
        }

        if let Some(key) = expired {
            inner.records.remove(&key);
            debug!(%name, %rtype, "cache entry expired");
            metrics::record_cache_lookup(rtype, CacheLookup::Expired);
            metrics::record_cache_size(inner.records.len());
            return None;
        }

        metrics::record_cache_lookup(rtype, CacheLookup::Miss);
        None
    }

    /// Add a record to the cache, timestamped now.
    ///
    /// Re-adding a record that is already present refreshes its timestamp
    /// rather than keeping the stale entry.
    pub fn add_record(&self, record: &Record) {
        self.add_record_at(record, unix_now());
    }

    fn add_record_at(&self, record: &Record, now: u64) {
        let mut inner = self.inner.write();
        let entry = CacheRecord::new(record.clone(), now, inner.default_ttl);
        debug!(name = %record.name(), rtype = %record.record_type(), ttl = entry.ttl, "caching record");
        inner.records.insert(RecordKey::of(record), entry);
        metrics::record_cache_size(inner.records.len());
    }

    /// Add a batch of records, with the same semantics as
    /// [`RecordCache::add_record`] for each.
    pub fn add_records(&self, records: &[Record]) {
        let now = unix_now();
        for record in records {
            self.add_record_at(record, now);
        }
    }

    /// Number of entries currently held (valid or not yet expired-on-read).
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Read the cache file from disk, replacing the in-memory set.
    ///
    /// Any failure (missing file, unreadable, malformed JSON, bad entry)
    /// leaves the cache empty and is logged; resolution proceeds as if no
    /// cache existed.
    pub fn load(&self) {
        let mut inner = self.inner.write();
        inner.records.clear();

        let loaded = match std::fs::read_to_string(&inner.path) {
            Ok(contents) => serde_json::from_str::<Vec<StoredRecord>>(&contents)
                .map_err(std::io::Error::other),
            Err(e) => Err(e),
        };
        match loaded {
            Ok(stored) => {
                let total = stored.len();
                for entry in &stored {
                    match CacheRecord::from_stored(entry) {
                        Ok(record) => {
                            inner
                                .records
                                .insert(RecordKey::of(&record.record), record);
                        }
                        Err(e) => {
                            warn!(name = %entry.name, rtype = %entry.rtype, "dropping bad cache entry: {}", e);
                        }
                    }
                }
                debug!(
                    loaded = inner.records.len(),
                    total,
                    path = %inner.path.display(),
                    "read record cache"
                );
            }
            Err(e) => {
                warn!(path = %inner.path.display(), "could not read record cache: {}", e);
            }
        }
        metrics::record_cache_size(inner.records.len());
    }

    /// Write the cache file to disk, replacing any prior file.
    ///
    /// An IO failure is logged and the write skipped; it never propagates.
    pub fn save(&self) {
        let inner = self.inner.read();
        let stored: Vec<StoredRecord> = inner
            .records
            .values()
            .filter_map(CacheRecord::to_stored)
            .collect();

        let result = serde_json::to_string_pretty(&stored)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&inner.path, json));
        match result {
            Ok(()) => {
                debug!(entries = stored.len(), path = %inner.path.display(), "wrote record cache")
            }
            Err(e) => {
                warn!(path = %inner.path.display(), "could not write record cache: {}", e)
            }
        }
    }
}
