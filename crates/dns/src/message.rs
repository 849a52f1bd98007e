use std::{
    net::{Ipv4Addr, Ipv6Addr},
    sync::Arc,
};

use bytes::Bytes;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    domain_name::DomainName,
    reader::{DnsMessageReader, DnsReadable},
    writer::{DnsMessageWriter, DnsWritable},
};

/// Size of the fixed DNS header.
pub const HEADER_LEN: usize = 12;

/// Represents a DNS message.
/// This struct encapsulates the various components of a DNS message and does not represent the full wire structure.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsMessage {
    /// Transaction id
    pub id: u16,
    /// Flags
    pub flags: DnsFlags,
    /// Questions in the DNS message
    questions: Vec<DnsQuestion>,
    /// Answers in the DNS message
    answers: Vec<DnsRecord>,
    /// Authority records in the DNS message
    authority_records: Vec<DnsRecord>,
    /// Additional records in the DNS message, without the OPT pseudo record.
    additional_records: Vec<DnsRecord>,
    /// EDNS
    edns: Option<Edns>,
}

impl DnsMessage {
    pub fn new(
        id: u16,
        flags: DnsFlags,
        questions: Vec<DnsQuestion>,
        answers: Vec<DnsRecord>,
        authority_records: Vec<DnsRecord>,
        additional_records: Vec<DnsRecord>,
    ) -> Self {
        Self {
            id,
            flags,
            questions,
            answers,
            authority_records,
            additional_records,
            edns: None,
        }
    }

    pub fn decode(data: &[u8]) -> anyhow::Result<Self> {
        let mut reader = DnsMessageReader::new(data);

        let id = reader.read_u16()?;
        let flags = DnsFlags::read_from(&mut reader)?;

        let number_of_questions = reader.read_u16()?; // QDCOUNT
        let number_of_answers = reader.read_u16()?; // ANCOUNT
        let number_of_authority_records = reader.read_u16()?; // NSCOUNT
        let number_of_additional_records = reader.read_u16()?; // ARCOUNT

        let mut questions = Vec::with_capacity(number_of_questions as usize);

        for _ in 0..number_of_questions {
            let question = DnsQuestion::read_from(&mut reader)?;
            questions.push(question);
        }

        let mut answers = Vec::with_capacity(number_of_answers as usize);

        for _ in 0..number_of_answers {
            let answer = DnsRecord::read_from(&mut reader)?;
            answers.push(answer);
        }

        let mut authority_records = Vec::with_capacity(number_of_authority_records as usize);

        for _ in 0..number_of_authority_records {
            authority_records.push(DnsRecord::read_from(&mut reader)?);
        }

        let mut additional_records = Vec::with_capacity(number_of_additional_records as usize);

        let mut edns: Option<Edns> = None;

        for _ in 0..number_of_additional_records {
            let start = reader.position();
            reader.read_qname()?;

            let rtype = RecordType::from(reader.read_u16()?);

            // Handle EDNS
            if rtype == RecordType::OPT {
                anyhow::ensure!(edns.is_none(), "multiple OPT records in message");
                edns = Some(Edns::read_from(&mut reader)?)
            } else {
                // Not OPT: handle as normal record.
                reader.seek(start)?;
                additional_records.push(DnsRecord::read_from(&mut reader)?);
            }
        }

        Ok(Self {
            id,
            flags,
            questions,
            answers,
            authority_records,
            additional_records,
            edns,
        })
    }

    /// Encode the message with name compression.
    pub fn encode(&self) -> anyhow::Result<Bytes> {
        self.encode_into(DnsMessageWriter::new())
    }

    /// Encode the message within `max_len` bytes.
    ///
    /// If the full message does not fit, the header and question are sent alone with the TC bit set,
    /// so the client retries over TCP.
    pub fn encode_with_max(&self, max_len: usize) -> anyhow::Result<Bytes> {
        let bytes = self.encode()?;
        if bytes.len() <= max_len {
            return Ok(bytes);
        }

        let mut truncated = Self {
            id: self.id,
            flags: self.flags,
            questions: self.questions.clone(),
            answers: vec![],
            authority_records: vec![],
            additional_records: vec![],
            edns: self.edns.clone(),
        };
        truncated.flags.truncated = true;

        truncated.encode_into(DnsMessageWriter::new_with_max(max_len))
    }

    fn encode_into(&self, mut writer: DnsMessageWriter) -> anyhow::Result<Bytes> {
        // ID
        writer.write_u16(self.id)?;

        // Flags
        self.flags.write_to(&mut writer)?;

        // QDCOUNT
        writer.write_u16(self.questions.len() as u16)?;

        // ANCOUNT
        writer.write_u16(self.answers.len() as u16)?;

        // NSCOUNT
        writer.write_u16(self.authority_records.len() as u16)?;

        // ARCOUNT, the OPT pseudo record counts as an additional record.
        let additional = self.additional_records.len() + usize::from(self.edns.is_some());
        writer.write_u16(additional as u16)?;

        // Questions
        for question in &self.questions {
            question.write_to(&mut writer)?;
        }

        // Answers
        for answer in &self.answers {
            answer.write_to(&mut writer)?;
        }

        // Authority records
        for authority_record in &self.authority_records {
            authority_record.write_to(&mut writer)?;
        }

        // Additional records
        for additional_record in &self.additional_records {
            additional_record.write_to(&mut writer)?;
        }

        if let Some(edns) = &self.edns {
            edns.write_to(&mut writer)?;
        }

        Ok(writer.into_bytes())
    }

    /// Questions
    pub fn questions(&self) -> &[DnsQuestion] {
        &self.questions
    }

    /// Answers
    pub fn answers(&self) -> &[DnsRecord] {
        &self.answers
    }

    /// Authority records
    pub fn authority_records(&self) -> &[DnsRecord] {
        &self.authority_records
    }

    /// Additional records
    pub fn additional_records(&self) -> &[DnsRecord] {
        &self.additional_records
    }

    /// EDNS
    pub fn edns(&self) -> &Option<Edns> {
        &self.edns
    }

    /// Replace the EDNS information of the message.
    pub fn set_edns(&mut self, edns: Option<Edns>) {
        self.edns = edns;
    }

    // Set the response code
    pub fn set_response_code(&mut self, response_code: DnsResponseCode) {
        let full: u16 = response_code.into();
        self.flags.rcode_low = (full & 0x0F) as u8;

        // handle higher part.
        if full > 0x0F {
            let edns = self.edns.get_or_insert_with(Edns::default);
            edns.extended_rcode = (full >> 4) as u8;
        }
    }

    /// Response code
    pub fn response_code(&self) -> anyhow::Result<DnsResponseCode> {
        let low = self.flags.rcode_low as u16;
        let high = self.edns.as_ref().map(|e| e.extended_rcode).unwrap_or(0) as u16;
        let code = DnsResponseCode::try_from((high << 4) | low)?;
        Ok(code)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct DnsFlags {
    /// Query or Response
    pub response: bool,
    /// Opcode
    pub opcode: DnsOpcode,
    /// Authoritative Answer
    pub authorative_answer: bool,
    /// Truncated, indicates that this message was truncated due to length greater than the transport allows
    pub truncated: bool,
    /// Recursion Desired, indicates that the client desires recursive resolution
    pub recursion_desired: bool,
    /// Recursion Available, indicates that the server supports recursive resolution
    pub recursion_available: bool,
    /// Z flag, reserved for future use, must be zero in all queries and responses
    pub(crate) z: bool,
    /// Authentic Data, indicates that the response is authentic
    pub authentic_data: bool,
    /// Checking Disabled, indicates that the server is not performing DNSSEC validation
    pub checking_disabled: bool,
    // Lower part of the response code.
    pub(crate) rcode_low: u8,
}

impl DnsFlags {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        response: bool,
        opcode: DnsOpcode,
        authorative_answer: bool,
        truncated: bool,
        recursion_desired: bool,
        recursion_available: bool,
        authentic_data: bool,
        checking_disabled: bool,
    ) -> Self {
        Self {
            response,
            opcode,
            authorative_answer,
            truncated,
            recursion_desired,
            recursion_available,
            z: false,
            authentic_data,
            checking_disabled,
            rcode_low: 0,
        }
    }
}

impl TryFrom<u16> for DnsFlags {
    type Error = anyhow::Error;

    fn try_from(bytes: u16) -> Result<Self, Self::Error> {
        Ok(Self {
            response: (bytes >> 15) & 0x1 != 0,
            opcode: DnsOpcode::try_from(((bytes >> 11) & 0xF) as u8)?,
            authorative_answer: (bytes >> 10) & 0x1 != 0,
            truncated: (bytes >> 9) & 0x1 != 0,
            recursion_desired: (bytes >> 8) & 0x1 != 0,
            recursion_available: (bytes >> 7) & 0x1 != 0,
            z: (bytes >> 6) & 0x1 != 0,
            authentic_data: (bytes >> 5) & 0x1 != 0,
            checking_disabled: (bytes >> 4) & 0x1 != 0,
            rcode_low: (bytes & 0x0F) as u8,
        })
    }
}

impl DnsReadable for DnsFlags {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        Self::try_from(reader.read_u16()?)
    }
}

impl DnsWritable for DnsFlags {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        let opcode: u8 = self.opcode.into();
        writer.write_u16(
            ((self.response as u16) << 15)
                | ((opcode as u16) << 11)
                | ((self.authorative_answer as u16) << 10)
                | ((self.truncated as u16) << 9)
                | ((self.recursion_desired as u16) << 8)
                | ((self.recursion_available as u16) << 7)
                | ((self.z as u16) << 6)
                | ((self.authentic_data as u16) << 5)
                | ((self.checking_disabled as u16) << 4)
                | (self.rcode_low & 0x0F) as u16,
        )?;
        Ok(())
    }
}

/// Dns response code
///
/// Based on: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6
#[derive(Debug, Copy, Clone, Default, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum DnsResponseCode {
    /// No error, the request was successful
    #[default]
    NoError = 0,
    /// Format error, the request was malformed
    FormatError = 1,
    /// Server failure, the server encountered an error while processing the request
    ServerFailure = 2,
    /// Non-existent domain, the requested domain does not exist
    NxDomain = 3,
    /// Not Implemented
    NotImp = 4,
    /// Query refused
    Refused = 5,
    /// Name Exists when it should not
    YXDomain = 6,
    /// RR Set Exists when it should not
    YXRRSet = 7,
    /// RR Set that should exist does not
    NXRRSet = 8,
    /// Server Not Authoritative for zone
    NotAuth = 9,
    /// Name not contained in zone
    NotZone = 10,
    /// DSO-TYPE Not Implemented
    DSOTYPENI = 11,
    /// Bad OPT Version
    BADVERS = 16,
    /// Key not recognized
    BADKEY = 17,
    /// Signature out of time window
    BADTIME = 18,
    /// Bad TKEY Mode
    BADMODE = 19,
    /// Duplicate key name
    BADNAME = 20,
    /// Algorithm not supported
    BADALG = 21,
    /// Bad Truncation
    BADTRUNC = 22,
    /// Bad/missing Server Cookie
    BADCOOKIE = 23,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DnsOpcode {
    /// Standard query
    #[default]
    Query = 0,
    /// Inverse query, obsolete
    IQuery = 1,
    /// Server status request, obsolete
    Status = 2,
    /// Zone change notification
    Notify = 4,
    /// Dynamic update
    Update = 5,
    /// DNS stateful operations
    Dso = 6,
}

/// Represents a DNS question in a DNS message.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsQuestion {
    /// The domain name being queried
    pub qname: DomainName,
    /// The type of the query (e.g., A, AAAA, CNAME)
    pub qtype: RecordType,
    /// The class of the query (e.g., IN for Internet)
    pub qclass: ClassType,
}

impl DnsQuestion {
    pub fn new(qname: DomainName, qtype: RecordType, qclass: ClassType) -> Self {
        Self { qname, qtype, qclass }
    }
}

impl DnsReadable for DnsQuestion {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        let qname = reader.read_qname()?;
        let qtype = RecordType::from(reader.read_u16()?);
        let qclass = ClassType::from(reader.read_u16()?);

        Ok(Self { qname, qtype, qclass })
    }
}

impl DnsWritable for DnsQuestion {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        writer.write_qname(&self.qname)?;
        writer.write_u16(self.qtype.to_u16())?;
        writer.write_u16(self.qclass.to_u16())?;
        Ok(())
    }
}

u16_enum_with_unknown! {
    /// DNS record types.
    ///
    /// Based on: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4
    pub enum RecordType {
        /// IPv4
        A = 1,
        /// Name server
        NS = 2,
        /// Canonical name
        CNAME = 5,
        /// Start of authority
        SOA = 6,
        /// Null
        NULL = 10,
        /// Pointer (for reverse DNS)
        PTR = 12,
        /// HINFO
        HINFO = 13,
        /// Mail exchange
        MX = 15,
        /// Text strings
        TXT = 16,
        /// IPv6
        AAAA = 28,
        /// Location Information
        LOC = 29,
        /// Service locator
        SRV = 33,
        /// Naming Authority Pointer
        NAPTR = 35,
        /// DNAME
        DNAME = 39,
        /// OPT, only used by additional records (EDNS)
        OPT = 41,
        /// Delegation Signer
        DS = 43,
        /// SSH Key Fingerprint
        SSHFP = 44,
        /// RRSIG
        RRSIG = 46,
        /// NSEC
        NSEC = 47,
        /// DNS KEY
        DNSKEY = 48,
        /// NSEC3
        NSEC3 = 50,
        /// TLSA
        TLSA = 52,
        /// General-purpose service binding
        SVCB = 64,
        /// SVCB-compatible type for use with HTTP
        HTTPS = 65,
        /// SPF
        SPF = 99,
        /// Incremental transfer
        IXFR = 251,
        /// transfer of an entire zone
        AXFR = 252,
        /// All records
        ANY = 255,
        /// URI
        URI = 256,
        /// Certification Authority Restriction
        CAA = 257,
    }
}

impl RecordType {
    /// Whether this is an address record type (A or AAAA).
    pub fn is_address(self) -> bool {
        matches!(self, Self::A | Self::AAAA)
    }
}

u16_enum_with_unknown! {
    /// DNS class types.
    pub enum ClassType {
        /// Internet
        IN = 1,
        /// Chaosnet
        CH = 3,
        /// Hesoid (MIT Athena)
        HS = 4,
        /// None, used by dynamic updates
        NONE = 254,
        /// Any
        ANY = 255,
    }
}

/// Associated data for a DNS record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsRecordData {
    Raw(Vec<u8>),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Text(Arc<str>),

    SOA {
        /// Primary nameserver.
        mname: DomainName,
        /// Contact email
        rname: DomainName,
        /// Serial
        serial: u32,
        /// Refresh
        refresh: u32,
        /// Retry
        retry: u32,
        /// Expire
        expire: u32,
        /// Minimum
        minimum: u32,
    },
    MX {
        priority: u16,
        host: DomainName,
    },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },
    DomainName(DomainName),
}

impl DnsRecordData {
    /// Write the DNS record data to the DNS message.
    pub fn write(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        match self {
            DnsRecordData::Raw(data) => writer.write_bytes(data),
            DnsRecordData::Ipv4(addr) => writer.write_bytes(&addr.octets()),
            DnsRecordData::Ipv6(addr) => writer.write_bytes(&addr.octets()),
            DnsRecordData::Text(text) => {
                let bytes = text.as_bytes();
                if bytes.is_empty() {
                    return writer.write_u8(0);
                }
                for chunk in bytes.chunks(u8::MAX as usize) {
                    writer.write_u8(chunk.len() as u8)?;
                    writer.write_bytes(chunk)?;
                }
                Ok(())
            }
            DnsRecordData::DomainName(name) => writer.write_qname(name),

            DnsRecordData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                writer.write_qname(mname)?;
                writer.write_qname(rname)?;
                writer.write_u32(*serial)?;
                writer.write_u32(*refresh)?;
                writer.write_u32(*retry)?;
                writer.write_u32(*expire)?;
                writer.write_u32(*minimum)?;
                Ok(())
            }
            DnsRecordData::MX { priority, host } => {
                writer.write_u16(*priority)?;
                writer.write_qname(host)?;
                Ok(())
            }
            DnsRecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                writer.write_u16(*priority)?;
                writer.write_u16(*weight)?;
                writer.write_u16(*port)?;
                // RFC 2782 forbids compressing the target.
                writer.write_qname_uncompressed(target)?;
                Ok(())
            }
        }
    }

    /// Decode record data based on the provided `record_type`.
    pub fn read_from_record_type(
        reader: &mut DnsMessageReader,
        record_type: &RecordType,
        data_length: usize,
    ) -> anyhow::Result<DnsRecordData> {
        let start = reader.position();
        let end = start + data_length;

        let data = match *record_type {
            RecordType::CNAME | RecordType::PTR | RecordType::NS | RecordType::DNAME => {
                let domain_name = reader.read_qname()?;
                DnsRecordData::DomainName(domain_name)
            }
            RecordType::A => {
                anyhow::ensure!(data_length == 4, "invalid A record length: {}", data_length);
                let raw_data = reader.read_bytes(4)?;
                DnsRecordData::Ipv4(Ipv4Addr::new(raw_data[0], raw_data[1], raw_data[2], raw_data[3]))
            }
            RecordType::AAAA => {
                anyhow::ensure!(data_length == 16, "invalid AAAA record length: {}", data_length);
                let raw_data = reader.read_bytes(16)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(raw_data);
                DnsRecordData::Ipv6(Ipv6Addr::from(octets))
            }
            RecordType::TXT | RecordType::SPF => {
                let mut text = String::new();
                while reader.position() < end {
                    text.push_str(&String::from_utf8_lossy(reader.read_character_string()?));
                }
                DnsRecordData::Text(text.into())
            }
            RecordType::SOA => DnsRecordData::SOA {
                mname: reader.read_qname()?,
                rname: reader.read_qname()?,
                serial: reader.read_u32()?,
                refresh: reader.read_u32()?,
                retry: reader.read_u32()?,
                expire: reader.read_u32()?,
                minimum: reader.read_u32()?,
            },
            RecordType::MX => DnsRecordData::MX {
                priority: reader.read_u16()?,
                host: reader.read_qname()?,
            },
            RecordType::SRV => DnsRecordData::SRV {
                priority: reader.read_u16()?,
                weight: reader.read_u16()?,
                port: reader.read_u16()?,
                target: reader.read_qname()?,
            },
            _ => {
                let raw_data = reader.read_bytes(data_length)?;
                DnsRecordData::Raw(raw_data.into())
            }
        };

        anyhow::ensure!(
            reader.position() == end,
            "record data length mismatch for {:?}: declared {}, consumed {}",
            record_type,
            data_length,
            reader.position() - start
        );

        Ok(data)
    }
}

/// Represents a DNS record in a DNS message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: DomainName,
    pub record_type: RecordType,
    pub class: ClassType,
    pub ttl: u32,
    pub data: DnsRecordData,
}

impl DnsRecord {
    pub fn new(name: DomainName, record_type: RecordType, class: ClassType, ttl: u32, data: DnsRecordData) -> Self {
        Self {
            name,
            record_type,
            class,
            ttl,
            data,
        }
    }

    /// Get the name of the DNS record.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Get the type of the DNS record.
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }
    /// Get the class of the DNS record.
    pub fn class(&self) -> ClassType {
        self.class
    }
    /// Get the TTL (Time to Live) of the DNS record.
    pub fn ttl(&self) -> u32 {
        self.ttl
    }
    /// Get the data of the DNS record.
    pub fn data(&self) -> &DnsRecordData {
        &self.data
    }
}

impl DnsReadable for DnsRecord {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        let name = reader.read_qname()?;
        let record_type = RecordType::from(reader.read_u16()?);
        let class = ClassType::from(reader.read_u16()?);
        let ttl = reader.read_u32()?;
        let data_length = reader.read_u16()? as usize;

        let data = DnsRecordData::read_from_record_type(reader, &record_type, data_length)?;

        Ok(Self {
            name,
            record_type,
            class,
            ttl,
            data,
        })
    }
}

impl DnsWritable for DnsRecord {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        writer.write_qname(&self.name)?;
        writer.write_u16(self.record_type.to_u16())?;
        writer.write_u16(self.class.to_u16())?;
        writer.write_u32(self.ttl)?;

        let rdlen_pos = writer.position();

        // Reserve rdlen so we can go back once we know the size.
        writer.write_u16(0)?;

        let before = writer.position();
        self.data.write(writer)?;
        let after = writer.position();
        let rdlen = (after - before) as u16;

        // Write the rdlen.
        writer.overwrite_bytes(rdlen_pos, &rdlen.to_be_bytes())?;

        Ok(())
    }
}

/// Represents EDNS (Extension Mechanisms for DNS) information in a DNS message.
#[derive(Debug, Clone, PartialEq)]
pub struct Edns {
    /// Max UDP payload size sender can handle
    pub udp_payload_size: u16,
    /// High bits of RCODE (ttl[31:24])
    extended_rcode: u8,
    /// EDNS version - must be 0.
    pub version: u8,
    /// Z flags
    z_flags: u16,
    /// Edns option
    pub options: Vec<EdnsOption>,
}

impl Default for Edns {
    fn default() -> Self {
        Self {
            udp_payload_size: 4096,
            extended_rcode: 0,
            version: 0,
            z_flags: 0,
            options: vec![],
        }
    }
}

impl Edns {
    /// EDNS information advertising the given UDP payload size.
    pub fn new(udp_payload_size: u16) -> Self {
        Self {
            udp_payload_size,
            ..Default::default()
        }
    }

    // Get the do bit
    pub fn do_bit(&self) -> bool {
        self.z_flags & 0x8000 != 0
    }

    // Set the do bit
    pub fn set_do_bit(&mut self, v: bool) {
        if v {
            self.z_flags |= 0x8000;
        } else {
            self.z_flags &= !0x8000
        }
    }
}

impl DnsReadable for Edns {
    /// Reads the OPT record following its owner name and type.
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        let udp_payload_size = reader.read_u16()?;

        // TTL packed: ext_rcode | version | z_flags
        let ttl = reader.read_u32()?;

        let extended_rcode = ((ttl >> 24) & 0xFF) as u8;
        let version = ((ttl >> 16) & 0xFF) as u8;
        let z_flags = (ttl & 0xFFFF) as u16;

        // RDLEN + options;
        let rdlen = reader.read_u16()? as usize;
        let opts_end = reader.position() + rdlen;

        let mut options: Vec<EdnsOption> = Vec::new();

        while reader.position() < opts_end {
            let option = EdnsOption::read_from(reader)?;
            options.push(option);
        }

        anyhow::ensure!(reader.position() == opts_end, "EDNS options overrun the OPT record");

        Ok(Self {
            udp_payload_size,
            extended_rcode,
            version,
            z_flags,
            options,
        })
    }
}

impl DnsWritable for Edns {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        // root owner name
        writer.write_u8(0)?;
        writer.write_u16(RecordType::OPT.to_u16())?;
        writer.write_u16(self.udp_payload_size)?;
        writer.write_u32(((self.extended_rcode as u32) << 24) | ((self.version as u32) << 16) | self.z_flags as u32)?;

        let rdlen_pos = writer.position();
        writer.write_u16(0)?;

        let before = writer.position();
        for option in &self.options {
            option.write_to(writer)?;
        }
        let rdlen = (writer.position() - before) as u16;

        writer.overwrite_bytes(rdlen_pos, &rdlen.to_be_bytes())?;
        Ok(())
    }
}

/// EDNS option
#[derive(Debug, Clone, PartialEq)]
pub struct EdnsOption {
    /// EDNS option code
    pub code: EdnsOptionCode,
    /// Option payload, kept opaque.
    pub data: Vec<u8>,
}

u16_enum_with_unknown! {
    /// EDNS Option codes
    ///
    /// Based on: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-11
    pub enum EdnsOptionCode {
        /// DNS Name Server Identifier (NSID) Option
        NSID = 3,
        /// Client Subnet in DNS Queries (RFC 7871)
        ClientSubnet = 8,
        /// EDNS expire (RFC 7314)
        Expire = 9,
        /// EDNS Cookie (RFC 7873)
        Cookie = 10,
        /// EDNS TCP Keep Alive (RFC 7828)
        TcpKeepAlive = 11,
        /// EDNS Padding (7830)
        Padding = 12,
        /// Extended DNS error (RFC 8914)
        ExtendedDnsError = 15,
    }
}

impl DnsReadable for EdnsOption {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        let code = EdnsOptionCode::from(reader.read_u16()?);
        let len = reader.read_u16()? as usize;
        let data = reader.read_bytes(len)?.to_vec();
        Ok(Self { code, data })
    }
}

impl DnsWritable for EdnsOption {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        anyhow::ensure!(self.data.len() <= u16::MAX as usize, "EDNS option too large");
        writer.write_u16(self.code.to_u16())?;
        writer.write_u16(self.data.len() as u16)?;
        writer.write_bytes(&self.data)
    }
}
