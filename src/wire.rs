//! DNS wire parsing and answer synthesis (spec §4.5, §6).
//!
//! Inbound datagrams are decoded with `hickory-proto`'s binary codec (the
//! same crate the teacher uses for message types); responses are built by
//! reusing the request's header/id and appending HOSTS-style A/AAAA records
//! with a fixed TTL, mirroring `build_msg_from_records` in the teacher's
//! `handler.rs` but trimmed to the answer-only shape spec.md calls for.

use hickory_proto::op::{Header, Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable, BinEncoder};

use crate::errors::ProtocolError;
use std::net::IpAddr;

/// TTL stamped on every synthesized answer (spec §4.5).
pub const SYNTHESIZED_TTL: u32 = 300;

/// A parsed inbound query (spec §3 `Query`): transient, lives for one
/// handler invocation.
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub id: u16,
    pub recursion_desired: bool,
    pub qname: Name,
    pub qtype: RecordType,
}

impl ParsedQuery {
    /// The question domain, trailing-dot normalized — this is the cache key
    /// and the string blocklist lookups normalize further (spec §3).
    pub fn domain(&self) -> String {
        self.qname.to_ascii()
    }
}

/// Decodes an inbound DNS message. Returns `ProtocolError::EmptyQuestion` if
/// there is no question, matching spec §4.5 step 1 ("Reject if there is no
/// question... log and drop").
pub fn parse_query(bytes: &[u8]) -> Result<ParsedQuery, ProtocolError> {
    let msg = Message::from_bytes(bytes).map_err(ProtocolError::Decode)?;
    let query = msg.queries().first().ok_or(ProtocolError::EmptyQuestion)?;
    Ok(ParsedQuery {
        id: msg.id(),
        recursion_desired: msg.recursion_desired(),
        qname: query.name().clone(),
        qtype: query.query_type(),
    })
}

/// Builds a reply carrying the given addresses as A/AAAA records with
/// `SYNTHESIZED_TTL`, NoError, and RA set. `qtype` picks the record type
/// synthesized: A addresses for an A query, AAAA for AAAA, and whichever
/// family matches the caller-supplied address type otherwise.
pub fn synthesize_answer(query: &ParsedQuery, addresses: &[IpAddr]) -> Vec<u8> {
    encode_response(query.id, query.recursion_desired, ResponseCode::NoError, &answer_records(&query.qname, addresses))
}

fn answer_records(qname: &Name, addresses: &[IpAddr]) -> Vec<Record> {
    addresses
        .iter()
        .map(|addr| {
            let rdata = match addr {
                IpAddr::V4(v4) => RData::A(A(*v4)),
                IpAddr::V6(v6) => RData::AAAA(AAAA(*v6)),
            };
            Record::from_rdata(qname.clone(), SYNTHESIZED_TTL, rdata)
        })
        .collect()
}

fn encode_response(id: u16, rd: bool, rcode: ResponseCode, answers: &[Record]) -> Vec<u8> {
    let mut header = Header::new();
    header.set_id(id);
    header.set_message_type(MessageType::Response);
    header.set_op_code(OpCode::Query);
    header.set_response_code(rcode);
    header.set_recursion_desired(rd);
    header.set_recursion_available(true);
    header.set_authentic_data(false);
    header.set_authoritative(false);
    header.set_answer_count(answers.len() as u16);

    let mut msg = Message::new();
    msg.set_header(header);
    for rec in answers {
        msg.add_answer(rec.clone());
    }

    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    // A hand-built header + answers always encodes; unwrap is safe here the
    // same way it is in the teacher's `build_msg_from_records`.
    msg.emit(&mut encoder).expect("synthesized message always encodes");
    buf
}

/// Extracts the wire-format address records from a decoded upstream
/// response — the reverse of `answer_records`, used by the resolver to turn
/// an upstream's raw reply into the `CacheEntry` shape spec.md wants.
pub fn first_address(records: &[Record]) -> Option<IpAddr> {
    records.iter().find_map(|r| match r.data() {
        RData::A(a) => Some(IpAddr::V4(a.0)),
        RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::Query as WireQuery;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn build_query(name: &str, qtype: RecordType) -> Vec<u8> {
        let mut msg = Message::new();
        msg.set_id(42);
        msg.set_message_type(MessageType::Query);
        msg.set_op_code(OpCode::Query);
        msg.set_recursion_desired(true);
        msg.add_query(WireQuery::query(Name::from_str(name).unwrap(), qtype));
        let mut buf = Vec::new();
        let mut encoder = BinEncoder::new(&mut buf);
        msg.emit(&mut encoder).unwrap();
        buf
    }

    #[test]
    fn parse_extracts_domain_and_type() {
        let bytes = build_query("example.com.", RecordType::A);
        let parsed = parse_query(&bytes).unwrap();
        assert_eq!(parsed.domain(), "example.com.");
        assert_eq!(parsed.qtype, RecordType::A);
        assert_eq!(parsed.id, 42);
    }

    #[test]
    fn parse_rejects_empty_question() {
        let mut msg = Message::new();
        msg.set_id(1);
        let mut buf = Vec::new();
        let mut encoder = BinEncoder::new(&mut buf);
        msg.emit(&mut encoder).unwrap();
        assert!(matches!(parse_query(&buf), Err(ProtocolError::EmptyQuestion)));
    }

    #[test]
    fn synthesize_answer_round_trips_through_decode() {
        let bytes = build_query("local.", RecordType::A);
        let query = parse_query(&bytes).unwrap();
        let resp = synthesize_answer(&query, &[IpAddr::V4(Ipv4Addr::LOCALHOST)]);

        let decoded = Message::from_bytes(&resp).unwrap();
        assert_eq!(decoded.response_code(), ResponseCode::NoError);
        assert_eq!(decoded.answers().len(), 1);
        assert_eq!(decoded.answers()[0].ttl(), SYNTHESIZED_TTL);
        assert_eq!(first_address(decoded.answers()), Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }
}
