#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use pfdns_context::RequestType;
    use pfdns_dns::{
        ClassType, DnsMessage, DnsMessageBuilder, DnsQuestion, DnsRecordData, DnsResponseCode, DomainName, Edns,
        RecordType,
    };

    use super::super::{Reply, SynthRecord, build_address_answer, build_cname_answer, max_reply_size};
    use crate::query::Query;

    fn request(name: &str, qtype: RecordType, edns: Option<Edns>) -> DnsMessage {
        let mut builder = DnsMessageBuilder::new()
            .with_id(0x4242)
            .add_question(DnsQuestion::new(DomainName::from_ascii(name).unwrap(), qtype, ClassType::IN));
        if let Some(edns) = edns {
            builder = builder.with_edns(edns);
        }
        builder.build()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn client() -> IpAddr {
        ip("10.0.0.5")
    }

    #[test]
    fn test_address_record_follows_literal_family() {
        assert_eq!(
            SynthRecord::address(ip("192.0.2.1")),
            SynthRecord::A("192.0.2.1".parse().unwrap())
        );
        assert_eq!(
            SynthRecord::address(ip("2001:db8::1")),
            SynthRecord::Aaaa("2001:db8::1".parse().unwrap())
        );

        let record = SynthRecord::address(ip("2001:db8::1"))
            .into_record(DomainName::from_ascii("portal").unwrap(), ClassType::IN);
        assert_eq!(record.record_type, RecordType::AAAA);
        assert_eq!(record.ttl, 0);
    }

    #[test]
    fn test_address_answer_envelope() {
        let req = request("Example.COM", RecordType::A, None);
        let query = Query::new(&req, client(), RequestType::UDP).unwrap();

        let reply = build_address_answer(&query, ip("192.0.2.1"));
        let decoded = DnsMessage::decode(&reply.encode().unwrap()).unwrap();

        assert_eq!(decoded.id, 0x4242);
        assert!(decoded.flags.response);
        assert!(decoded.flags.authorative_answer);
        assert!(decoded.flags.recursion_desired);
        assert!(!decoded.flags.truncated);
        assert_eq!(decoded.response_code().unwrap(), DnsResponseCode::NoError);
        assert_eq!(decoded.questions(), req.questions());

        let answers = decoded.answers();
        assert_eq!(answers.len(), 1);
        // owner keeps the spelling the client used
        assert_eq!(answers[0].name(), "Example.COM");
        assert_eq!(answers[0].ttl(), 0);
        assert_eq!(answers[0].data(), &DnsRecordData::Ipv4("192.0.2.1".parse().unwrap()));
        assert!(decoded.edns().is_none());
    }

    #[test]
    fn test_aaaa_query_with_ipv4_literal_gets_a_record() {
        let req = request("example.com", RecordType::AAAA, None);
        let query = Query::new(&req, client(), RequestType::UDP).unwrap();

        let reply = build_address_answer(&query, ip("192.0.2.1"));
        assert_eq!(reply.message.answers()[0].record_type(), RecordType::A);
    }

    #[test]
    fn test_cname_answer_carries_target_address() {
        let req = request("example.com", RecordType::MX, None);
        let query = Query::new(&req, client(), RequestType::TCP).unwrap();
        let target = DomainName::from_ascii("localhost.localdomain").unwrap();

        let reply = build_cname_answer(&query, &target, ip("127.0.0.1"));
        let decoded = DnsMessage::decode(&reply.encode().unwrap()).unwrap();

        let answers = decoded.answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].record_type(), RecordType::CNAME);
        assert_eq!(answers[0].name(), "example.com");
        assert_eq!(answers[0].data(), &DnsRecordData::DomainName(target.clone()));

        let additional = decoded.additional_records();
        assert_eq!(additional.len(), 1);
        assert_eq!(additional[0].name(), "localhost.localdomain");
        assert_eq!(additional[0].record_type(), RecordType::A);
        assert_eq!(additional[0].data(), &DnsRecordData::Ipv4("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_edns_is_echoed() {
        let mut edns = Edns::new(1232);
        edns.set_do_bit(true);
        let req = request("example.com", RecordType::A, Some(edns));
        let query = Query::new(&req, client(), RequestType::UDP).unwrap();

        let reply = build_address_answer(&query, ip("192.0.2.1"));
        let decoded = DnsMessage::decode(&reply.encode().unwrap()).unwrap();

        let echoed = decoded.edns().as_ref().unwrap();
        assert_eq!(echoed.udp_payload_size, 1232);
        assert!(echoed.do_bit());
        assert_eq!(reply.max_size, 1232);
    }

    #[test]
    fn test_max_reply_size() {
        let plain = request("example.com", RecordType::A, None);
        let small_edns = request("example.com", RecordType::A, Some(Edns::new(100)));

        let udp = Query::new(&plain, client(), RequestType::UDP).unwrap();
        let tcp = Query::new(&plain, client(), RequestType::TCP).unwrap();
        let tiny = Query::new(&small_edns, client(), RequestType::UDP).unwrap();
        let tiny_tcp = Query::new(&small_edns, client(), RequestType::TCP).unwrap();

        assert_eq!(max_reply_size(&udp), 512);
        assert_eq!(max_reply_size(&tcp), 65535);
        // advertised sizes below the DNS minimum are raised to it
        assert_eq!(max_reply_size(&tiny), 512);
        assert_eq!(max_reply_size(&tiny_tcp), 65535);
    }

    #[test]
    fn test_oversized_reply_is_truncated() {
        let req = request("example.com", RecordType::MX, None);
        let query = Query::new(&req, client(), RequestType::UDP).unwrap();
        let target = DomainName::from_ascii("localhost.localdomain").unwrap();

        let full = build_cname_answer(&query, &target, ip("2001:db8::53"));
        let full_len = full.encode().unwrap().len();

        let limited = Reply {
            message: full.message.clone(),
            max_size: full_len - 1,
        };
        let bytes = limited.encode().unwrap();
        assert!(bytes.len() < full_len);

        let decoded = DnsMessage::decode(&bytes).unwrap();
        assert!(decoded.flags.truncated);
        assert!(decoded.answers().is_empty());
        assert!(decoded.additional_records().is_empty());
        assert_eq!(decoded.questions(), req.questions());
    }
}
