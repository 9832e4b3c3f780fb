//! DNSKEY and NS lookups against a local authoritative responder.

use dssync_core::{DnskeyProbe, DomainName, NameserverSet, ProbeTarget, SyncError};
use dssync_probe::{DnsProbe, ProbeConfig, Transport};
use hickory_resolver::proto::op::{Message, MessageType, ResponseCode};
use hickory_resolver::proto::rr::rdata::NULL;
use hickory_resolver::proto::rr::{RData, Record, RecordType};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

/// How the responder answers every query
#[derive(Clone)]
enum Reply {
    /// DNSKEY answer built from these RDATAs; empty means NODATA
    Keys(Vec<Vec<u8>>),
    /// Bare response with this code
    Code(ResponseCode),
}

/// Serves one zone over UDP and TCP on the same loopback port
struct Responder {
    addr: SocketAddr,
    udp_queries: Arc<Mutex<Vec<Message>>>,
    tcp_queries: Arc<AtomicUsize>,
}

impl Responder {
    async fn start(reply: Reply, truncate_udp: bool) -> Self {
        let (udp, tcp) = bind_pair().await;
        let addr = udp.local_addr().unwrap();
        let udp_queries = Arc::new(Mutex::new(Vec::new()));
        let tcp_queries = Arc::new(AtomicUsize::new(0));

        let seen = udp_queries.clone();
        let udp_reply = reply.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            while let Ok((len, peer)) = udp.recv_from(&mut buf).await {
                let query = Message::from_vec(&buf[..len]).unwrap();
                let response = respond(&query, &udp_reply, truncate_udp);
                seen.lock().unwrap().push(query);
                let _ = udp.send_to(&response, peer).await;
            }
        });

        let count = tcp_queries.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = tcp.accept().await {
                let reply = reply.clone();
                let count = count.clone();
                tokio::spawn(async move {
                    loop {
                        let Ok(len) = stream.read_u16().await else { return };
                        let mut buf = vec![0u8; usize::from(len)];
                        if stream.read_exact(&mut buf).await.is_err() {
                            return;
                        }
                        count.fetch_add(1, Ordering::SeqCst);
                        let query = Message::from_vec(&buf).unwrap();
                        let response = respond(&query, &reply, false);
                        let len = u16::try_from(response.len()).unwrap();
                        if stream.write_u16(len).await.is_err()
                            || stream.write_all(&response).await.is_err()
                        {
                            return;
                        }
                    }
                });
            }
        });

        Self {
            addr,
            udp_queries,
            tcp_queries,
        }
    }

    fn tcp_queries(&self) -> usize {
        self.tcp_queries.load(Ordering::SeqCst)
    }
}

async fn bind_pair() -> (UdpSocket, TcpListener) {
    for _ in 0..20 {
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = tcp.local_addr().unwrap();
        if let Ok(udp) = UdpSocket::bind(addr).await {
            return (udp, tcp);
        }
    }
    panic!("no loopback port free for both UDP and TCP");
}

fn respond(query: &Message, reply: &Reply, truncate: bool) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(query.op_code())
        .set_authoritative(true)
        .set_recursion_desired(query.recursion_desired())
        .add_queries(query.queries().to_vec());

    match reply {
        Reply::Code(code) => {
            msg.set_response_code(*code);
        }
        Reply::Keys(_) if truncate => {
            msg.set_truncated(true);
        }
        Reply::Keys(keys) => {
            let question = &query.queries()[0];
            if question.query_type() == RecordType::DNSKEY {
                for key in keys {
                    msg.add_answer(Record::from_rdata(
                        question.name().clone(),
                        3600,
                        RData::Unknown {
                            code: RecordType::DNSKEY,
                            rdata: NULL::with(key.clone()),
                        },
                    ));
                }
            }
        }
    }
    msg.to_vec().unwrap()
}

/// DNSKEY RDATA with a deterministic public key of `key_len` bytes
fn dnskey_rdata(flags: u16, algorithm: u8, key_len: usize) -> Vec<u8> {
    let mut rdata = flags.to_be_bytes().to_vec();
    rdata.push(3);
    rdata.push(algorithm);
    rdata.extend((0..key_len).map(|i| u8::try_from(i % 251).unwrap()));
    rdata
}

fn resolver(transport: Transport) -> DnsProbe {
    let config = ProbeConfig::default()
        .transport(transport)
        .timeout(Duration::from_secs(2));
    DnsProbe::new(config).unwrap()
}

fn domain() -> DomainName {
    DomainName::parse("example.com").unwrap()
}

#[tokio::test]
async fn dnskey_answer_is_decoded() {
    let responder = Responder::start(
        Reply::Keys(vec![dnskey_rdata(257, 13, 64), dnskey_rdata(256, 13, 64)]),
        false,
    )
    .await;

    let keys = resolver(Transport::Tcp)
        .resolve_dnskeys(&domain(), ProbeTarget::Server(responder.addr))
        .await
        .unwrap();

    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].flags, 257);
    assert_eq!(keys[1].flags, 256);
    assert!(keys.iter().all(|k| k.algorithm == 13));
}

#[tokio::test]
async fn nodata_means_unsigned() {
    let responder = Responder::start(Reply::Keys(Vec::new()), false).await;

    let keys = resolver(Transport::Udp)
        .resolve_dnskeys(&domain(), ProbeTarget::Server(responder.addr))
        .await
        .unwrap();

    assert!(keys.is_empty());
}

#[tokio::test]
async fn servfail_and_refused_are_errors() {
    for code in [ResponseCode::ServFail, ResponseCode::Refused] {
        let responder = Responder::start(Reply::Code(code), false).await;

        let err = resolver(Transport::Udp)
            .resolve_dnskeys(&domain(), ProbeTarget::Server(responder.addr))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Probe(_)), "{code}: {err:?}");
    }
}

#[tokio::test]
async fn nxdomain_is_an_error() {
    let responder = Responder::start(Reply::Code(ResponseCode::NXDomain), false).await;

    let err = resolver(Transport::Udp)
        .resolve_dnskeys(&domain(), ProbeTarget::Server(responder.addr))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("no such domain"), "{err}");
}

#[tokio::test]
async fn servfail_is_not_reported_as_missing_ns() {
    let responder = Responder::start(Reply::Code(ResponseCode::ServFail), false).await;

    let err = resolver(Transport::Tcp)
        .resolve_nameservers(&domain(), responder.addr)
        .await
        .unwrap_err();

    assert!(!err.to_string().contains("no NS records"), "{err}");
}

#[tokio::test]
async fn truncated_udp_answer_is_retried_over_tcp() {
    // two RSA-2048 sized keys do not fit in 512 bytes
    let keys = vec![dnskey_rdata(257, 8, 260), dnskey_rdata(256, 8, 260)];
    let responder = Responder::start(Reply::Keys(keys), true).await;

    let found = resolver(Transport::Udp)
        .resolve_dnskeys(&domain(), ProbeTarget::Server(responder.addr))
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert!(responder.tcp_queries() >= 1);

    let udp_queries = responder.udp_queries.lock().unwrap();
    assert!(!udp_queries.is_empty());
    assert!(udp_queries.iter().all(|q| q.extensions().is_some()));
}

#[tokio::test]
async fn unresolvable_nameservers_are_skipped() {
    let responder = Responder::start(Reply::Keys(vec![dnskey_rdata(257, 13, 64)]), false).await;
    let config = ProbeConfig::default()
        .transport(Transport::Udp)
        .timeout(Duration::from_secs(2))
        .nameserver_port(responder.addr.port());
    let dns = DnsProbe::new(config).unwrap();

    // .invalid never resolves; localhost always does
    let nameservers = NameserverSet::new(["ns1.missing.invalid", "localhost"]);
    let keys = dns
        .resolve_dnskeys(&domain(), ProbeTarget::Nameservers(&nameservers))
        .await
        .unwrap();

    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].flags, 257);
}

#[tokio::test]
async fn no_resolvable_nameserver_is_an_error() {
    let nameservers = NameserverSet::new(["ns1.missing.invalid", "ns2.missing.invalid"]);

    let err = resolver(Transport::Udp)
        .resolve_dnskeys(&domain(), ProbeTarget::Nameservers(&nameservers))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("none of the nameservers"), "{err}");
}
