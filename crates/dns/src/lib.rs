#[macro_use]
mod macros;

pub mod builder;
pub mod domain_name;
pub mod helpers;
pub mod message;
pub mod reader;
pub mod writer;

pub use builder::DnsMessageBuilder;
pub use domain_name::DomainName;
pub use message::{
    ClassType, DnsFlags, DnsMessage, DnsOpcode, DnsQuestion, DnsRecord, DnsRecordData, DnsResponseCode, Edns,
    EdnsOption, EdnsOptionCode, RecordType,
};

pub use reader::DnsMessageReader;
pub use writer::DnsMessageWriter;
