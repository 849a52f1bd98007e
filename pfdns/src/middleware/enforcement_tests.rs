#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, sync::Arc, time::Duration};

    use bytes::Bytes;
    use pfdns_context::{DnsMiddleware, DnsRequestCtx, MiddlewareAction, RequestType};
    use pfdns_dns::{
        ClassType, DnsMessage, DnsMessageBuilder, DnsQuestion, DnsRecordData, DomainName, Edns, RecordType,
    };
    use tempfile::TempDir;

    use super::super::EnforcementMiddleware;
    use crate::{
        binding::{DeviceBindingStore, SqliteBindingStore},
        evaluator::Outcome,
        global::Global,
        local::Local,
        policy::{BlackholeTarget, EnforcementPolicy},
    };

    const SCHEMA: &str = r#"
        CREATE TABLE ip4log (ip TEXT PRIMARY KEY, mac TEXT NOT NULL);
        CREATE TABLE ip6log (ip TEXT PRIMARY KEY, mac TEXT NOT NULL);
        CREATE TABLE node (mac TEXT PRIMARY KEY, status TEXT NOT NULL);

        INSERT INTO ip4log VALUES ('10.0.0.5', 'AA:BB:CC:DD:EE:FF');
        INSERT INTO ip4log VALUES ('10.0.0.6', '11:22:33:44:55:66');
        INSERT INTO ip6log VALUES ('2001:db8::6', '11:22:33:44:55:66');
        INSERT INTO node VALUES ('AA:BB:CC:DD:EE:FF', 'reg');
        INSERT INTO node VALUES ('11:22:33:44:55:66', 'unreg');
    "#;

    async fn setup_store() -> (TempDir, Arc<dyn DeviceBindingStore>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pf.db");
        let db = pfdns_database::connect(path.to_str().unwrap(), 2).await.unwrap();
        db.execute_batch(SCHEMA).await.unwrap();
        (dir, Arc::new(SqliteBindingStore::new(db)))
    }

    fn policy(enforcement_enabled: bool, redirect: &str, blackhole: bool) -> EnforcementPolicy {
        EnforcementPolicy {
            enforcement_enabled,
            redirect_address: redirect.parse().unwrap(),
            blackhole: blackhole.then(|| BlackholeTarget::parse("localhost.localdomain.", "127.0.0.1").unwrap()),
        }
    }

    fn query(name: &str, qtype: RecordType) -> Bytes {
        DnsMessageBuilder::new()
            .with_id(0x1234)
            .add_question(DnsQuestion::new(DomainName::from_ascii(name).unwrap(), qtype, ClassType::IN))
            .build()
            .encode()
            .unwrap()
    }

    /// A query for `qname`, given in wire form, built byte by byte.
    fn raw_query(qname: &[u8], qtype: RecordType) -> Bytes {
        let mut raw = vec![0x12, 0x34, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0];
        raw.extend_from_slice(qname);
        raw.extend_from_slice(&qtype.to_u16().to_be_bytes());
        raw.extend_from_slice(&[0, 1]);
        Bytes::from(raw)
    }

    fn ctx(global: &Arc<Global>, client: &str, raw: Bytes) -> DnsRequestCtx<Global, Local> {
        DnsRequestCtx::new(
            Duration::from_secs(2),
            RequestType::UDP,
            client.parse::<SocketAddr>().unwrap(),
            raw,
            global.clone(),
            Local::default(),
        )
    }

    fn reply(action: MiddlewareAction) -> DnsMessage {
        match action {
            MiddlewareAction::Reply(bytes) => DnsMessage::decode(&bytes).unwrap(),
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disabled_enforcement_redirects() {
        let global = Arc::new(Global::new(policy(false, "192.0.2.1", false), None));
        let ctx = ctx(&global, "10.0.0.5:5300", query("example.com.", RecordType::A));

        let message = reply(EnforcementMiddleware.on_query(&ctx).await.unwrap());

        assert_eq!(message.id, 0x1234);
        assert!(message.flags.response);
        assert!(message.flags.authorative_answer);
        let answers = message.answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].name(), "example.com");
        assert_eq!(answers[0].data(), &DnsRecordData::Ipv4("192.0.2.1".parse().unwrap()));

        let local = ctx.local();
        assert_eq!(local.outcome, Some(Outcome::Redirect("192.0.2.1".parse().unwrap())));
        assert!(local.synthesized);
    }

    #[tokio::test]
    async fn test_registered_device_continues() {
        let (_dir, store) = setup_store().await;
        let global = Arc::new(Global::new(policy(true, "192.0.2.1", true), Some(store)));

        for qtype in [RecordType::A, RecordType::TXT] {
            let ctx = ctx(&global, "10.0.0.5:5300", query("example.com", qtype));
            assert_eq!(EnforcementMiddleware.on_query(&ctx).await.unwrap(), MiddlewareAction::Next);
            assert_eq!(ctx.local().outcome, Some(Outcome::PassThrough));
            assert!(!ctx.local().synthesized);
        }
    }

    #[tokio::test]
    async fn test_unregistered_aaaa_gets_aaaa_redirect() {
        let (_dir, store) = setup_store().await;
        let global = Arc::new(Global::new(policy(true, "2001:db8::1", false), Some(store)));
        let ctx = ctx(&global, "[2001:db8::6]:5300", query("host.example.", RecordType::AAAA));

        let message = reply(EnforcementMiddleware.on_query(&ctx).await.unwrap());

        let answers = message.answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].record_type(), RecordType::AAAA);
        assert_eq!(answers[0].name(), "host.example");
        assert_eq!(answers[0].data(), &DnsRecordData::Ipv6("2001:db8::1".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_unknown_device_is_silent() {
        let (_dir, store) = setup_store().await;
        let global = Arc::new(Global::new(policy(true, "192.0.2.1", true), Some(store)));
        let ctx = ctx(&global, "192.0.2.9:5300", query("example.com", RecordType::A));

        assert_eq!(EnforcementMiddleware.on_query(&ctx).await.unwrap(), MiddlewareAction::Silent);
        assert_eq!(ctx.local().outcome, Some(Outcome::NoAnswer));
        assert!(!ctx.local().synthesized);
    }

    #[tokio::test]
    async fn test_blackhole_for_other_types() {
        let (_dir, store) = setup_store().await;
        let global = Arc::new(Global::new(policy(true, "192.0.2.1", true), Some(store)));
        let ctx = ctx(&global, "10.0.0.6:5300", query("something.example.", RecordType::TXT));

        let message = reply(EnforcementMiddleware.on_query(&ctx).await.unwrap());

        let answers = message.answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].record_type(), RecordType::CNAME);
        assert_eq!(answers[0].name(), "something.example");
        assert_eq!(
            answers[0].data(),
            &DnsRecordData::DomainName(DomainName::from_ascii("localhost.localdomain").unwrap())
        );

        let additional = message.additional_records();
        assert_eq!(additional.len(), 1);
        assert_eq!(additional[0].name(), "localhost.localdomain");
        assert_eq!(additional[0].data(), &DnsRecordData::Ipv4("127.0.0.1".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_other_types_continue_without_blackhole() {
        let (_dir, store) = setup_store().await;
        let global = Arc::new(Global::new(policy(true, "192.0.2.1", false), Some(store)));
        let ctx = ctx(&global, "10.0.0.6:5300", query("example.com", RecordType::MX));

        assert_eq!(EnforcementMiddleware.on_query(&ctx).await.unwrap(), MiddlewareAction::Next);
    }

    #[tokio::test]
    async fn test_edns_request_gets_opt_record() {
        let global = Arc::new(Global::new(policy(false, "192.0.2.1", false), None));
        let raw = DnsMessageBuilder::new()
            .with_id(3)
            .add_question(DnsQuestion::new(DomainName::from_ascii("example.com").unwrap(), RecordType::A, ClassType::IN))
            .with_edns(Edns::new(4096))
            .build()
            .encode()
            .unwrap();
        let ctx = ctx(&global, "10.0.0.5:5300", raw);

        let message = reply(EnforcementMiddleware.on_query(&ctx).await.unwrap());
        assert_eq!(message.edns().as_ref().map(|e| e.udp_payload_size), Some(4096));
    }

    #[tokio::test]
    async fn test_malformed_request_is_an_error() {
        let global = Arc::new(Global::new(policy(false, "192.0.2.1", false), None));
        let ctx = ctx(&global, "10.0.0.5:5300", Bytes::from_static(&[0x12, 0x34, 0x01]));

        assert!(EnforcementMiddleware.on_query(&ctx).await.is_err());
        assert!(ctx.local().outcome.is_none());
    }

    #[tokio::test]
    async fn test_empty_question_continues() {
        let global = Arc::new(Global::new(policy(false, "192.0.2.1", false), None));
        let raw = DnsMessageBuilder::new().with_id(4).build().encode().unwrap();
        let ctx = ctx(&global, "10.0.0.5:5300", raw);

        assert_eq!(EnforcementMiddleware.on_query(&ctx).await.unwrap(), MiddlewareAction::Next);
    }

    #[tokio::test]
    async fn test_dot_inside_label_is_echoed_unchanged() {
        let global = Arc::new(Global::new(policy(false, "192.0.2.1", false), None));
        let qname = b"\x03a.b\x07example\x00";
        let raw = raw_query(qname, RecordType::A);
        let ctx = ctx(&global, "10.0.0.5:5300", raw.clone());

        let MiddlewareAction::Reply(bytes) = EnforcementMiddleware.on_query(&ctx).await.unwrap() else {
            panic!("expected a reply");
        };
        // the question section is copied byte for byte
        assert_eq!(&bytes[12..raw.len()], &raw[12..]);

        let message = DnsMessage::decode(&bytes).unwrap();
        assert_eq!(message.questions()[0].qname.wire(), &qname[..]);
        let answers = message.answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].name, message.questions()[0].qname);
        assert_eq!(answers[0].name.labels().count(), 2);
    }

    #[tokio::test]
    async fn test_non_ascii_label_is_redirected() {
        let global = Arc::new(Global::new(policy(false, "192.0.2.1", false), None));
        let qname = b"\x05caf\xc3\xa9\x07example\x00";
        let ctx = ctx(&global, "10.0.0.5:5300", raw_query(qname, RecordType::A));

        let message = reply(EnforcementMiddleware.on_query(&ctx).await.unwrap());

        let answers = message.answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].name(), r"caf\195\169.example");
        assert_eq!(answers[0].name.wire(), &qname[..]);
        assert_eq!(answers[0].data(), &DnsRecordData::Ipv4("192.0.2.1".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_registered_device_continues_for_non_ascii_name() {
        let (_dir, store) = setup_store().await;
        let global = Arc::new(Global::new(policy(true, "192.0.2.1", true), Some(store)));
        let ctx = ctx(
            &global,
            "10.0.0.5:5300",
            raw_query(b"\x05caf\xc3\xa9\x07example\x00", RecordType::AAAA),
        );

        assert_eq!(EnforcementMiddleware.on_query(&ctx).await.unwrap(), MiddlewareAction::Next);
        assert_eq!(ctx.local().outcome, Some(Outcome::PassThrough));
    }
}
