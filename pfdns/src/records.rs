//! Construction of synthesized answers.
//!
//! Every reply echoes the query name as the owner of its first answer, and every address record
//! takes the family of its IP literal.

use std::net::IpAddr;

use bytes::Bytes;
use pfdns_dns::{
    ClassType, DnsFlags, DnsMessage, DnsMessageBuilder, DnsRecord, DnsRecordData, DnsResponseCode, DomainName, Edns,
    RecordType,
};

use crate::query::Query;

/// Synthesized records carry no TTL, so resolvers never cache a redirect.
const SYNTHESIZED_TTL: u32 = 0;

/// Smallest payload size every DNS transport supports.
const MIN_UDP_PAYLOAD: u16 = 512;

/// The record kinds this server ever synthesizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthRecord {
    A(std::net::Ipv4Addr),
    Aaaa(std::net::Ipv6Addr),
    Cname(DomainName),
}

impl SynthRecord {
    /// Address record of the literal's own family.
    pub fn address(address: IpAddr) -> Self {
        match address {
            IpAddr::V4(v4) => Self::A(v4),
            IpAddr::V6(v6) => Self::Aaaa(v6),
        }
    }

    pub fn into_record(self, owner: DomainName, class: ClassType) -> DnsRecord {
        let (record_type, data) = match self {
            Self::A(v4) => (RecordType::A, DnsRecordData::Ipv4(v4)),
            Self::Aaaa(v6) => (RecordType::AAAA, DnsRecordData::Ipv6(v6)),
            Self::Cname(target) => (RecordType::CNAME, DnsRecordData::DomainName(target)),
        };
        DnsRecord::new(owner, record_type, class, SYNTHESIZED_TTL, data)
    }
}

/// A synthesized reply along with the size the client can receive.
#[derive(Debug, Clone)]
pub struct Reply {
    message: DnsMessage,
    max_size: usize,
}

impl Reply {
    /// Encode with name compression, truncating when the client cannot take the full reply.
    pub fn encode(&self) -> anyhow::Result<Bytes> {
        self.message.encode_with_max(self.max_size)
    }
}

/// Reply envelope for `query`: an authoritative NOERROR answer to its question, with no records yet.
pub fn build_reply(query: &Query<'_>) -> DnsMessageBuilder {
    let request = query.request();
    let flags = DnsFlags::new(
        true,
        request.flags.opcode,
        true,
        false,
        request.flags.recursion_desired,
        false,
        false,
        request.flags.checking_disabled,
    );

    let mut builder = DnsMessageBuilder::new()
        .with_id(request.id)
        .with_flags(flags)
        .add_question(query.question().clone())
        .with_response(DnsResponseCode::NoError);

    if let Some(edns) = request.edns() {
        let mut opt = Edns::new(edns.udp_payload_size.max(MIN_UDP_PAYLOAD));
        opt.set_do_bit(edns.do_bit());
        builder = builder.with_edns(opt);
    }

    builder
}

/// Largest reply the client accepts for this query.
pub fn max_reply_size(query: &Query<'_>) -> usize {
    match (query.transport(), query.request().edns()) {
        (pfdns_context::RequestType::UDP, Some(edns)) => edns.udp_payload_size.max(MIN_UDP_PAYLOAD) as usize,
        (transport, _) => transport.default_max_reply_size(),
    }
}

/// Answer `query` with one address record for `address`.
pub fn build_address_answer(query: &Query<'_>, address: IpAddr) -> Reply {
    let answer = SynthRecord::address(address).into_record(query.name().clone(), query.qclass());

    Reply {
        message: build_reply(query).add_answer(answer).build(),
        max_size: max_reply_size(query),
    }
}

/// Answer `query` with a CNAME to `target_name`, plus an address record for the target in the additional section.
pub fn build_cname_answer(query: &Query<'_>, target_name: &DomainName, target_address: IpAddr) -> Reply {
    let cname = SynthRecord::Cname(target_name.clone()).into_record(query.name().clone(), query.qclass());
    let glue = SynthRecord::address(target_address).into_record(target_name.clone(), query.qclass());

    Reply {
        message: build_reply(query).add_answer(cname).add_additional_record(glue).build(),
        max_size: max_reply_size(query),
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod records_tests;
