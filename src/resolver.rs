//! Recursive DNS resolution.
//!
//! The resolver walks the authoritative chain itself instead of asking an
//! upstream to do it: every query is sent with recursion-desired cleared,
//! and referrals are followed from the root down (RFC 1034 section 5.3.3).
//! Candidate servers are tried one at a time in discovery order; the first
//! branch producing a real answer wins.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::pin::Pin;
use std::time::Duration;

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::cache::RecordCache;
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::metrics::{self, ResolutionOutcome, Timer};

/// Classic non-EDNS0 limit on a DNS datagram.
const MAX_DATAGRAM: usize = 512;

/// Result of resolving one hostname: the queried name, the CNAME aliases
/// encountered, and the IPv4 addresses it resolves to, both in the order
/// the answer records appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLookup {
    /// The hostname as it was queried.
    pub hostname: String,
    /// Canonical names from CNAME answers, in encounter order.
    pub aliases: Vec<String>,
    /// Addresses from A answers, in encounter order.
    pub addresses: Vec<Ipv4Addr>,
}

/// The outcome of one `resolve_at` branch.
///
/// `Some(answers)` is terminal, an empty list included ("no data" from an
/// authoritative server is a legitimate answer). `None` means the branch
/// exhausted its candidates without reaching an answer and the caller
/// should try its next one. Collapsing the two would break the candidate
/// search in the delegation steps.
type BranchResult = Option<Vec<Record>>;

/// Recursive DNS resolver.
///
/// Stateless beyond its configuration; all durable state lives in the
/// optional [`RecordCache`] it borrows for the duration of each
/// [`Resolver::resolve_host`] call. `None` for the cache disables caching
/// entirely: no lookups and no insertions.
pub struct Resolver {
    timeout: Duration,
    root_server: Ipv4Addr,
    server_port: u16,
    cache: Option<RecordCache>,
}

impl Resolver {
    /// Create a resolver from configuration and an optional cache handle.
    pub fn new(config: &ResolverConfig, cache: Option<RecordCache>) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            root_server: config.root_server,
            server_port: config.server_port,
            cache,
        }
    }

    /// Resolve a hostname to its CNAME aliases and IPv4 addresses.
    ///
    /// Opens one UDP socket for the whole session and starts the recursive
    /// walk at the configured root server. A hostname that cannot be
    /// resolved yields empty alias and address lists; only transport
    /// failures (socket errors, receive timeout) abort with an error.
    pub async fn resolve_host(&self, hostname: &str) -> Result<HostLookup, ResolveError> {
        let timer = Timer::start();
        // Resolve in absolute form so the name compares equal to the
        // absolute names carried by wire-parsed (and cached) records.
        let mut name = Name::from_ascii(hostname)?;
        name.set_fqdn(true);

        // The session socket. Dropping it on any exit path below releases
        // it exactly once.
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;

        let answers = match self.resolve_at(&socket, &name, self.root_server).await {
            Ok(branch) => branch.unwrap_or_default(),
            Err(e) => {
                metrics::record_resolution(ResolutionOutcome::Error, timer.elapsed());
                return Err(e);
            }
        };

        let mut aliases = Vec::new();
        let mut addresses = Vec::new();
        for answer in &answers {
            match answer.data() {
                RData::A(a) => addresses.push(a.0),
                RData::CNAME(cname) => aliases.push(cname.0.to_utf8()),
                _ => {}
            }
        }

        let outcome = if addresses.is_empty() && aliases.is_empty() {
            ResolutionOutcome::Empty
        } else {
            ResolutionOutcome::Answered
        };
        metrics::record_resolution(outcome, timer.elapsed());
        info!(
            hostname,
            aliases = aliases.len(),
            addresses = addresses.len(),
            "resolution finished"
        );

        Ok(HostLookup {
            hostname: hostname.to_string(),
            aliases,
            addresses,
        })
    }

    /// One step of the recursive walk: ask `server` about `hostname` and
    /// either answer from the response or chase the delegation it carries.
    ///
    /// Boxed because the recursion depth follows the delegation chain.
    fn resolve_at<'a>(
        &'a self,
        socket: &'a UdpSocket,
        hostname: &'a Name,
        server: Ipv4Addr,
    ) -> Pin<Box<dyn Future<Output = Result<BranchResult, ResolveError>> + Send + 'a>> {
        Box::pin(async move {
            // A fully cached hostname never touches the network. A lone
            // CNAME hit is returned as-is; re-resolving the canonical name
            // is the caller's business.
            if let Some(cache) = &self.cache {
                let mut cached = Vec::new();
                if let Some(address) = cache.lookup(hostname, RecordType::A, DNSClass::IN) {
                    cached.push(address);
                }
                if let Some(alias) = cache.lookup(hostname, RecordType::CNAME, DNSClass::IN) {
                    cached.push(alias);
                }
                if !cached.is_empty() {
                    debug!(%hostname, "answering from cache");
                    return Ok(Some(cached));
                }
            }

            let response = self.exchange(socket, hostname, server).await?;

            // A direct answer or a server-signaled error ends this branch.
            // The answer section is returned verbatim either way; empty is
            // a valid "no data" result.
            if response.header().answer_count() > 0
                || response.response_code() != ResponseCode::NoError
            {
                debug!(
                    %hostname,
                    %server,
                    answers = response.header().answer_count(),
                    rcode = %response.response_code(),
                    "terminal response"
                );
                let answers = response.answers().to_vec();
                if let Some(cache) = &self.cache {
                    cache.add_records(&answers);
                }
                return Ok(Some(answers));
            }

            // Delegation. Glue A records in the additional section give us
            // next-hop addresses for free; CNAMEs found there are cached
            // but never hopped on.
            let mut glue = Vec::new();
            for record in response.additionals() {
                match record.data() {
                    RData::A(a) => {
                        glue.push(a.0);
                        if let Some(cache) = &self.cache {
                            cache.add_record(record);
                        }
                    }
                    RData::CNAME(_) => {
                        if let Some(cache) = &self.cache {
                            cache.add_record(record);
                        }
                    }
                    _ => {}
                }
            }

            // Glueless delegation: resolve each authority name server's
            // own address with a full top-level lookup, then recurse
            // against whatever it resolves to.
            if glue.is_empty() {
                for record in response.name_servers() {
                    let RData::NS(ns) = record.data() else {
                        continue;
                    };
                    debug!(%hostname, ns = %ns.0, "glueless delegation, resolving name server");
                    let lookup = self.resolve_host(&ns.0.to_utf8()).await?;
                    for next_server in lookup.addresses {
                        if let Some(answers) =
                            self.resolve_at(socket, hostname, next_server).await?
                        {
                            if !answers.is_empty() {
                                return Ok(Some(answers));
                            }
                        }
                    }
                }
            }

            // Glue-driven delegation: first candidate with a real answer
            // wins; exhaustion unwinds to the caller's next candidate.
            for next_server in glue {
                debug!(%hostname, %server, %next_server, "following delegation");
                if let Some(answers) = self.resolve_at(socket, hostname, next_server).await? {
                    if !answers.is_empty() {
                        return Ok(Some(answers));
                    }
                }
            }

            Ok(None)
        })
    }

    /// Send one non-recursive type-A question and receive one datagram.
    ///
    /// The receive is bounded by the configured timeout; elapsing it is a
    /// transport failure that aborts the whole resolution.
    async fn exchange(
        &self,
        socket: &UdpSocket,
        hostname: &Name,
        server: Ipv4Addr,
    ) -> Result<Message, ResolveError> {
        let query = build_query(hostname, rand::random::<u16>());
        trace!(%hostname, %server, id = query.id(), "sending query");
        socket
            .send_to(&query.to_vec()?, (IpAddr::V4(server), self.server_port))
            .await?;

        let mut buf = [0u8; MAX_DATAGRAM];
        let (len, _) = tokio::time::timeout(self.timeout, socket.recv_from(&mut buf))
            .await
            .map_err(|_| ResolveError::Timeout {
                server,
                timeout_secs: self.timeout.as_secs(),
            })??;

        metrics::record_exchange(server);
        Ok(Message::from_vec(&buf[..len])?)
    }
}

/// Build a standard query: one type-A question, recursion desired cleared.
fn build_query(hostname: &Name, id: u16) -> Message {
    let mut message = Message::new();
    message.set_id(id);
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(false);
    let mut query = Query::new();
    query.set_name(hostname.clone());
    query.set_query_type(RecordType::A);
    query.set_query_class(DNSClass::IN);
    message.add_query(query);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::rdata;

    fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    #[test]
    fn query_is_nonrecursive_single_a_question() {
        let query = build_query(&name("host.example"), 42);

        assert_eq!(query.id(), 42);
        assert!(!query.recursion_desired());
        assert_eq!(query.queries().len(), 1);
        let question = &query.queries()[0];
        assert_eq!(question.query_type(), RecordType::A);
        assert_eq!(question.query_class(), DNSClass::IN);
        assert_eq!(question.name(), &name("host.example"));
    }

    #[tokio::test]
    async fn answers_partition_in_encounter_order() {
        // Partitioning happens in resolve_host; exercise it through a
        // cache-only resolution so no network is involved.
        let cache = RecordCache::new(0);
        cache.add_record(&Record::from_rdata(
            name("www.example"),
            60,
            RData::A(rdata::A(Ipv4Addr::new(10, 0, 0, 1))),
        ));
        cache.add_record(&Record::from_rdata(
            name("www.example"),
            60,
            RData::CNAME(rdata::CNAME(name("example.net"))),
        ));

        let config = ResolverConfig {
            timeout_secs: 1,
            ..ResolverConfig::default()
        };
        let resolver = Resolver::new(&config, Some(cache));
        let lookup = resolver.resolve_host("www.example").await.unwrap();

        assert_eq!(lookup.hostname, "www.example");
        assert_eq!(lookup.addresses, vec![Ipv4Addr::new(10, 0, 0, 1)]);
        assert_eq!(lookup.aliases, vec!["example.net".to_string()]);
    }
}
