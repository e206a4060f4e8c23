//! Shared test infrastructure: a scripted in-process UDP upstream.
//!
//! The upstream answers each incoming query with the next canned response
//! in its script, regardless of the question, so a test lays out the
//! delegation chain as a sequence. An exhausted script means dead air,
//! which is how timeout behavior is exercised. Every received datagram is
//! counted so tests can assert exactly how many exchanges a resolution
//! performed.

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata;
use hickory_proto::rr::{Name, RData, Record};
use tokio::net::UdpSocket;

use iterdns::ResolverConfig;

// --- Record builders ---

pub fn name(s: &str) -> Name {
    Name::from_ascii(s).unwrap()
}

pub fn a_record(owner: &str, addr: Ipv4Addr, ttl: u32) -> Record {
    Record::from_rdata(name(owner), ttl, RData::A(rdata::A(addr)))
}

pub fn cname_record(owner: &str, target: &str, ttl: u32) -> Record {
    Record::from_rdata(
        name(owner),
        ttl,
        RData::CNAME(rdata::CNAME(name(target))),
    )
}

pub fn ns_record(zone: &str, server: &str, ttl: u32) -> Record {
    Record::from_rdata(name(zone), ttl, RData::NS(rdata::NS(name(server))))
}

// --- Canned responses ---

/// One scripted response, sections filled in by the builder methods.
#[derive(Debug, Clone, Default)]
pub struct CannedResponse {
    rcode: Option<ResponseCode>,
    answers: Vec<Record>,
    authority: Vec<Record>,
    additionals: Vec<Record>,
}

impl CannedResponse {
    /// NOERROR with empty sections (a dead end).
    pub fn empty() -> Self {
        Self::default()
    }

    /// A terminal answer set.
    pub fn answer(records: Vec<Record>) -> Self {
        Self {
            answers: records,
            ..Self::default()
        }
    }

    /// A server-signaled error with no answers.
    pub fn error(rcode: ResponseCode) -> Self {
        Self {
            rcode: Some(rcode),
            ..Self::default()
        }
    }

    /// A delegation: authority NS records plus optional glue.
    pub fn delegation(authority: Vec<Record>, additionals: Vec<Record>) -> Self {
        Self {
            authority,
            additionals,
            ..Self::default()
        }
    }

    fn into_message(self, query: &Message) -> Message {
        let mut response = Message::new();
        response.set_id(query.id());
        response.set_message_type(MessageType::Response);
        response.set_op_code(OpCode::Query);
        response.set_response_code(self.rcode.unwrap_or(ResponseCode::NoError));
        for question in query.queries() {
            response.add_query(question.clone());
        }
        for record in self.answers {
            response.add_answer(record);
        }
        for record in self.authority {
            response.add_name_server(record);
        }
        for record in self.additionals {
            response.add_additional(record);
        }
        response
    }
}

// --- Scripted upstream server ---

/// A scripted DNS upstream on a random loopback port.
pub struct ScriptedUpstream {
    port: u16,
    requests: Arc<AtomicUsize>,
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

impl ScriptedUpstream {
    /// Bind a loopback socket and start answering from the script.
    pub async fn start(script: Vec<CannedResponse>) -> Self {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("failed to bind upstream socket");
        let port = socket
            .local_addr()
            .expect("failed to get local addr")
            .port();

        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);
        let queue = Arc::new(Mutex::new(VecDeque::from(script)));
        let (tx, mut rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            loop {
                tokio::select! {
                    result = socket.recv_from(&mut buf) => {
                        let Ok((len, src)) = result else { return };
                        counter.fetch_add(1, Ordering::SeqCst);

                        let query = match Message::from_vec(&buf[..len]) {
                            Ok(query) => query,
                            Err(e) => {
                                eprintln!("upstream received unparseable query: {}", e);
                                continue;
                            }
                        };

                        // Script exhausted: stay silent and let the
                        // resolver's timeout fire.
                        let next = queue.lock().unwrap().pop_front();
                        if let Some(canned) = next {
                            let response = canned.into_message(&query);
                            let bytes = response.to_vec().expect("failed to encode response");
                            let _ = socket.send_to(&bytes, src).await;
                        }
                    }
                    _ = &mut rx => return,
                }
            }
        });

        Self {
            port,
            requests,
            _shutdown: tx,
        }
    }

    /// Number of queries received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Resolver configuration rooted at this upstream.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            timeout_secs: 2,
            root_server: Ipv4Addr::LOCALHOST,
            server_port: self.port,
            ..ResolverConfig::default()
        }
    }
}
