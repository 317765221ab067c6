//! The race resolver (spec §4.4): fans a question out to every configured
//! upstream, returns the first successful answer, and cancels the losers.
//! Grounded on `original_source/client.go`'s `resolveUpstream`/`resolv` —
//! an unbuffered channel plus a closed-once stop channel — reworked onto
//! `tokio::sync::mpsc` and `tokio_util::sync::CancellationToken`, which is
//! the idiomatic Rust shape for "single result rendezvous plus broadcast
//! cancel" (spec §9).

use hickory_proto::rr::Name;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::errors::UpstreamError;
use crate::upstream::Upstream;
use crate::wire::{first_address, ParsedQuery};

/// The aggregate deadline for a race, regardless of per-upstream timeouts
/// (spec §4.4).
pub const RACE_DEADLINE: Duration = Duration::from_secs(4);

#[derive(Debug)]
pub struct Resolved {
    pub address: IpAddr,
    pub upstream: String,
}

pub struct Resolver {
    upstreams: Vec<Arc<Upstream>>,
}

impl Resolver {
    pub fn new(upstreams: Vec<Arc<Upstream>>) -> Self {
        Self { upstreams }
    }

    /// Races `query` across every upstream. Returns the first winning
    /// address, or `UpstreamError::RaceTimeout` if none answers within
    /// `RACE_DEADLINE`.
    pub async fn resolve(&self, query: &ParsedQuery) -> Result<Resolved, UpstreamError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Resolved>();
        let stop = CancellationToken::new();

        for upstream in &self.upstreams {
            let upstream = upstream.clone();
            let tx = tx.clone();
            let stop = stop.clone();
            let qname: Name = query.qname.clone();
            let qtype = query.qtype;

            tokio::spawn(async move {
                let outcome = upstream.exchange(qname, qtype).await;
                // A late sender must tolerate a receiver that has already
                // departed (spec §4.4); an mpsc `send` after the receiver
                // is dropped just errors, which we ignore.
                if stop.is_cancelled() {
                    return;
                }
                match outcome {
                    Ok(records) => {
                        if let Some(address) = first_address(&records) {
                            let _ = tx.send(Resolved {
                                address,
                                upstream: upstream.display(),
                            });
                        }
                        // Non-A/AAAA-only answers contribute nothing, same
                        // as an empty answer section (spec §4.4 edge cases).
                    }
                    Err(_) => {
                        // Timeouts/exchange failures from one upstream are
                        // not escalated; the race only cares about winners.
                    }
                }
            });
        }
        drop(tx);

        let result = timeout(RACE_DEADLINE, rx.recv()).await;
        stop.cancel();

        match result {
            Ok(Some(resolved)) => Ok(resolved),
            Ok(None) => Err(UpstreamError::RaceTimeout), // every upstream finished with nothing
            Err(_) => Err(UpstreamError::RaceTimeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::Transport;
    use hickory_proto::op::{Message, MessageType, OpCode, Query as WireQuery};
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{RData, Record, RecordType};
    use hickory_proto::serialize::binary::{BinDecodable, BinEncodable, BinEncoder};
    use std::net::{Ipv4Addr, SocketAddr};
    use std::str::FromStr;
    use tokio::net::UdpSocket;
    use tokio::time::sleep;

    /// A fake DNS-over-UDP upstream that answers after `delay`, used so
    /// race scenarios are deterministic without any real network access
    /// (spec §8 scenarios 4 and 5).
    async fn spawn_fake_upstream(delay: Duration, address: Ipv4Addr) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            loop {
                let (len, src) = match socket.recv_from(&mut buf).await {
                    Ok(v) => v,
                    Err(_) => return,
                };
                let Ok(req) = Message::from_bytes(&buf[..len]) else { continue };
                let Some(question) = req.queries().first().cloned() else { continue };

                sleep(delay).await;

                let mut resp = Message::new();
                resp.set_id(req.id());
                resp.set_message_type(MessageType::Response);
                resp.set_op_code(OpCode::Query);
                resp.add_query(question.clone());
                let rec = Record::from_rdata(question.name().clone(), 60, RData::A(A(address)));
                resp.add_answer(rec);

                let mut out = Vec::new();
                let mut encoder = BinEncoder::new(&mut out);
                resp.emit(&mut encoder).unwrap();
                let _ = socket.send_to(&out, src).await;
            }
        });

        addr
    }

    fn sample_query() -> ParsedQuery {
        ParsedQuery {
            id: 7,
            recursion_desired: true,
            qname: Name::from_str("example.com.").unwrap(),
            qtype: RecordType::A,
        }
    }

    #[tokio::test]
    async fn race_returns_first_winner() {
        let fast = spawn_fake_upstream(Duration::from_millis(10), Ipv4Addr::new(10, 0, 0, 1)).await;
        let slow = spawn_fake_upstream(Duration::from_millis(100), Ipv4Addr::new(10, 0, 0, 2)).await;

        let upstreams = vec![fast, slow]
            .into_iter()
            .map(|addr| Arc::new(Upstream::new(addr, Transport::Udp, None, Duration::from_secs(1))))
            .collect();

        let resolver = Resolver::new(upstreams);
        let resolved = resolver.resolve(&sample_query()).await.unwrap();
        assert_eq!(resolved.address, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[tokio::test]
    async fn race_times_out_when_nobody_answers() {
        // No upstreams at all -> immediate empty channel, still a
        // `RaceTimeout` (spec §4.4: "returns a timeout error").
        let resolver = Resolver::new(vec![]);
        let err = resolver.resolve(&sample_query()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::RaceTimeout));
    }
}
