#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use tempfile::TempDir;

    use super::super::SqliteBindingStore;
    use crate::binding::{DeviceBindingStore, LookupError, RegistrationStatus};

    const SCHEMA: &str = r#"
        CREATE TABLE ip4log (ip TEXT PRIMARY KEY, mac TEXT NOT NULL);
        CREATE TABLE ip6log (ip TEXT PRIMARY KEY, mac TEXT NOT NULL);
        CREATE TABLE node (mac TEXT PRIMARY KEY, status TEXT NOT NULL);

        INSERT INTO ip4log VALUES ('10.0.0.5', 'aa:bb:cc:dd:ee:ff');
        INSERT INTO ip4log VALUES ('10.0.0.6', '11:22:33:44:55:66');
        INSERT INTO ip4log VALUES ('10.0.0.7', 'de:ad:be:ef:00:01');
        INSERT INTO ip6log VALUES ('2001:db8::5', '11:22:33:44:55:66');
        INSERT INTO node VALUES ('aa:bb:cc:dd:ee:ff', 'reg');
        INSERT INTO node VALUES ('11:22:33:44:55:66', 'unreg');
    "#;

    async fn setup_test_store(schema: &str) -> (TempDir, SqliteBindingStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pf.db");
        let db = pfdns_database::connect(path.to_str().unwrap(), 2).await.unwrap();
        db.execute_batch(schema).await.unwrap();
        (dir, SqliteBindingStore::new(db))
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_ipv4_lookup_chain() {
        let (_dir, store) = setup_test_store(SCHEMA).await;

        let mac = store.lookup_device_id(ip("10.0.0.5")).await.unwrap();
        assert_eq!(mac, "aa:bb:cc:dd:ee:ff");
        assert_eq!(store.lookup_status(&mac).await.unwrap(), RegistrationStatus::Registered);
    }

    #[tokio::test]
    async fn test_ipv6_uses_ip6log() {
        let (_dir, store) = setup_test_store(SCHEMA).await;

        let mac = store.lookup_device_id(ip("2001:db8::5")).await.unwrap();
        assert_eq!(mac, "11:22:33:44:55:66");
        assert_eq!(store.lookup_status(&mac).await.unwrap(), RegistrationStatus::Unregistered);
    }

    #[tokio::test]
    async fn test_mapped_ipv4_uses_ip4log() {
        let (_dir, store) = setup_test_store(SCHEMA).await;

        let mac = store.lookup_device_id(ip("::ffff:10.0.0.5")).await.unwrap();
        assert_eq!(mac, "aa:bb:cc:dd:ee:ff");
    }

    #[tokio::test]
    async fn test_not_found() {
        let (_dir, store) = setup_test_store(SCHEMA).await;

        assert!(matches!(
            store.lookup_device_id(ip("192.0.2.9")).await,
            Err(LookupError::NotFound)
        ));
        // bound to a device that has no node row
        let mac = store.lookup_device_id(ip("10.0.0.7")).await.unwrap();
        assert!(matches!(store.lookup_status(&mac).await, Err(LookupError::NotFound)));
    }

    #[tokio::test]
    async fn test_missing_table_is_backend_error() {
        let (_dir, store) = setup_test_store("CREATE TABLE unrelated (x INTEGER);").await;

        assert!(matches!(
            store.lookup_device_id(ip("10.0.0.5")).await,
            Err(LookupError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_lookups() {
        let (_dir, store) = setup_test_store(SCHEMA).await;

        let lookups = (0..16).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.lookup_device_id(ip("10.0.0.6")).await })
        });

        for handle in futures::future::join_all(lookups).await {
            assert_eq!(handle.unwrap().unwrap(), "11:22:33:44:55:66");
        }
    }
}
