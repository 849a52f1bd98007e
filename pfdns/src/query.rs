use std::net::IpAddr;

use pfdns_context::RequestType;
use pfdns_dns::{ClassType, DnsMessage, DnsQuestion, DomainName, RecordType};

/// Read-only view of an inbound request, as needed to decide and answer it.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    request: &'a DnsMessage,
    question: &'a DnsQuestion,
    source: IpAddr,
    transport: RequestType,
}

impl<'a> Query<'a> {
    /// `None` when the request carries no question.
    pub fn new(request: &'a DnsMessage, source: IpAddr, transport: RequestType) -> Option<Self> {
        let question = request.questions().first()?;
        Some(Self {
            request,
            question,
            source: source.to_canonical(),
            transport,
        })
    }

    pub fn name(&self) -> &'a DomainName {
        &self.question.qname
    }

    pub fn qtype(&self) -> RecordType {
        self.question.qtype
    }

    pub fn qclass(&self) -> ClassType {
        self.question.qclass
    }

    pub fn question(&self) -> &'a DnsQuestion {
        self.question
    }

    /// Source address, IPv4-mapped addresses already unwrapped.
    pub fn source(&self) -> IpAddr {
        self.source
    }

    /// The decoded request, used as the header template of replies.
    pub fn request(&self) -> &'a DnsMessage {
        self.request
    }

    pub fn transport(&self) -> RequestType {
        self.transport
    }
}
