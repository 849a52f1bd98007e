use std::net::IpAddr;

use async_trait::async_trait;

mod sqlite;

pub use sqlite::SqliteBindingStore;

/// MAC-like identifier a device is known by.
pub type DeviceId = String;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no matching row")]
    NotFound,
    #[error("lookup exceeded the request deadline")]
    Timeout,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// IP family of a source address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// IPv4-mapped IPv6 addresses count as IPv4.
    pub fn of(address: IpAddr) -> Self {
        match address.to_canonical() {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Registered,
    Unregistered,
    Unknown,
}

impl RegistrationStatus {
    /// Map the `node.status` column.
    pub fn from_db(status: &str) -> Self {
        match status {
            "reg" => Self::Registered,
            "unreg" => Self::Unregistered,
            _ => Self::Unknown,
        }
    }
}

/// Result of the address to device to status lookup chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub mac_found: bool,
    pub mac: DeviceId,
    pub status: RegistrationStatus,
}

impl DeviceStatus {
    /// Status used when no lookup was made.
    pub fn unknown() -> Self {
        Self {
            mac_found: false,
            mac: DeviceId::new(),
            status: RegistrationStatus::Unknown,
        }
    }
}

/// Read-only view of which device sits behind an address and whether it is registered.
///
/// Implementations are shared by every in-flight request.
#[async_trait]
pub trait DeviceBindingStore: Send + Sync {
    /// Device currently bound to `address`.
    async fn lookup_device_id(&self, address: IpAddr) -> Result<DeviceId, LookupError>;

    /// Registration status of `device_id`.
    async fn lookup_status(&self, device_id: &str) -> Result<RegistrationStatus, LookupError>;
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn test_family_canonicalizes_mapped_addresses() {
        assert_eq!(AddressFamily::of(IpAddr::from(Ipv4Addr::new(10, 0, 0, 5))), AddressFamily::V4);
        assert_eq!(
            AddressFamily::of(IpAddr::from(Ipv4Addr::new(10, 0, 0, 5).to_ipv6_mapped())),
            AddressFamily::V4
        );
        assert_eq!(AddressFamily::of(IpAddr::from(Ipv6Addr::LOCALHOST)), AddressFamily::V6);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(RegistrationStatus::from_db("reg"), RegistrationStatus::Registered);
        assert_eq!(RegistrationStatus::from_db("unreg"), RegistrationStatus::Unregistered);
        assert_eq!(RegistrationStatus::from_db("pending"), RegistrationStatus::Unknown);
        assert_eq!(RegistrationStatus::from_db("REG"), RegistrationStatus::Unknown);
    }
}
