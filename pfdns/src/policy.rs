use std::net::IpAddr;

use pfdns_dns::DomainName;

use crate::config::{BlackholeConfig, PfdnsConfig, default_blackhole_address, default_blackhole_cname};

/// Errors raised while turning configuration into a policy.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("pfdns: missing configuration")]
    MissingConfiguration,
    #[error("invalid IP address '{0}'")]
    InvalidAddress(String),
    #[error("domains must be dot terminated and fully qualified: '{0}'")]
    NotFullyQualified(String),
    #[error("invalid domain name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("unknown blackhole keyword '{0}'")]
    UnknownKeyword(String),
    #[error("blackhole takes no argument, a keyword, or a name and an address; got {0} arguments")]
    WrongArity(usize),
}

/// Where blackholed queries are sent: a CNAME target and the address given for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlackholeTarget {
    pub name: DomainName,
    pub address: IpAddr,
}

impl BlackholeTarget {
    /// Validate a configured target. `name` must be dot-terminated.
    pub fn parse(name: &str, address: &str) -> Result<Self, PolicyError> {
        if !name.ends_with('.') {
            return Err(PolicyError::NotFullyQualified(name.into()));
        }

        let parsed = DomainName::from_user(name).map_err(|e| PolicyError::InvalidName {
            name: name.into(),
            reason: e.to_string(),
        })?;

        if parsed.is_root() {
            return Err(PolicyError::InvalidName {
                name: name.into(),
                reason: "the root cannot be a CNAME target".into(),
            });
        }

        Ok(Self {
            name: parsed,
            address: parse_address(address)?,
        })
    }

    /// Target of the standalone blackhole, if enabled.
    pub fn from_config(config: &BlackholeConfig) -> Result<Option<Self>, PolicyError> {
        if !config.enabled {
            return Ok(None);
        }
        Self::parse(&config.cname, &config.address).map(Some)
    }
}

/// The enforcement policy. Built once at startup and shared read-only by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementPolicy {
    pub enforcement_enabled: bool,
    pub redirect_address: IpAddr,
    pub blackhole: Option<BlackholeTarget>,
}

impl EnforcementPolicy {
    pub fn from_config(config: Option<&PfdnsConfig>) -> Result<Self, PolicyError> {
        let config = config.ok_or(PolicyError::MissingConfiguration)?;

        Ok(Self {
            enforcement_enabled: config.enforcement,
            redirect_address: parse_address(&config.redirect_to)?,
            blackhole: parse_blackhole_directive(config.blackhole.as_deref())?,
        })
    }
}

/// Interpret the blackhole directive arguments.
fn parse_blackhole_directive(args: Option<&[String]>) -> Result<Option<BlackholeTarget>, PolicyError> {
    let Some(args) = args else {
        return Ok(None);
    };

    match args {
        [] => BlackholeTarget::parse(&default_blackhole_cname(), &default_blackhole_address()).map(Some),
        [keyword] => match keyword.to_ascii_lowercase().as_str() {
            "disabled" | "false" => Ok(None),
            _ => Err(PolicyError::UnknownKeyword(keyword.clone())),
        },
        [name, address] => BlackholeTarget::parse(name, address).map(Some),
        _ => Err(PolicyError::WrongArity(args.len())),
    }
}

fn parse_address(s: &str) -> Result<IpAddr, PolicyError> {
    s.trim()
        .parse::<IpAddr>()
        .map_err(|_| PolicyError::InvalidAddress(s.into()))
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod policy_tests;
