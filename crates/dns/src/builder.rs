use super::message::{DnsFlags, DnsMessage, DnsOpcode, DnsQuestion, DnsRecord, DnsResponseCode, Edns};

/// Builder
#[derive(Debug, Clone)]
pub struct DnsMessageBuilder {
    id: u16,
    flags: DnsFlags,
    questions: Vec<DnsQuestion>,
    answers: Vec<DnsRecord>,
    additional_records: Vec<DnsRecord>,
    edns: Option<Edns>,
    response_code: Option<DnsResponseCode>,
}

impl Default for DnsMessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsMessageBuilder {
    /// Create a new DNS message builder.
    pub fn new() -> Self {
        Self {
            id: 0,
            flags: DnsFlags::new(false, DnsOpcode::Query, false, false, true, false, false, false),
            questions: Vec::new(),
            answers: Vec::new(),
            additional_records: Vec::new(),
            edns: None,
            response_code: None,
        }
    }

    /// Set the ID for the DNS packet.
    pub fn with_id(mut self, id: u16) -> Self {
        self.id = id;
        self
    }

    pub fn with_questions(mut self, questions: Vec<DnsQuestion>) -> Self {
        self.questions = questions;
        self
    }

    /// Set the flags for the DNS packet.
    pub fn with_flags(mut self, flags: DnsFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Add a question to the DNS packet.
    pub fn add_question(mut self, question: DnsQuestion) -> Self {
        self.questions.push(question);
        self
    }

    /// Add an answer to the DNS packet.
    pub fn add_answer(mut self, answer: DnsRecord) -> Self {
        self.answers.push(answer);
        self
    }

    /// Add an additional record to the DNS packet.
    pub fn add_additional_record(mut self, record: DnsRecord) -> Self {
        self.additional_records.push(record);
        self
    }

    /// Attach EDNS information, emitted as an OPT record.
    pub fn with_edns(mut self, edns: Edns) -> Self {
        self.edns = Some(edns);
        self
    }

    /// Mark the message as a response carrying `response_code`.
    pub fn with_response(mut self, response_code: DnsResponseCode) -> Self {
        self.response_code = Some(response_code);
        self
    }

    pub fn build(self) -> DnsMessage {
        let mut message = DnsMessage::new(
            self.id,
            self.flags,
            self.questions,
            self.answers,
            Vec::new(),
            self.additional_records,
        );
        message.set_edns(self.edns);

        if let Some(rcode) = self.response_code {
            message.flags.response = true;
            message.set_response_code(rcode);
        }

        message
    }
}
