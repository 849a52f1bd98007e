use std::{net::IpAddr, sync::Arc};

use pfdns_context::RequestBudget;
use pfdns_dns::DomainName;
use tokio::time::timeout_at;

use crate::{
    binding::{DeviceBindingStore, DeviceStatus, LookupError, RegistrationStatus},
    policy::EnforcementPolicy,
    query::Query,
};

/// How a query is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Leave the query to the rest of the chain.
    PassThrough,
    /// Answer with a single address record.
    Redirect(IpAddr),
    /// Answer with a CNAME to `target` plus an address record for it.
    Blackhole { target: DomainName, address: IpAddr },
    /// Neither answer nor forward.
    NoAnswer,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::PassThrough => "pass-through",
            Outcome::Redirect(_) => "redirect",
            Outcome::Blackhole { .. } => "blackhole",
            Outcome::NoAnswer => "no-answer",
        }
    }
}

/// Decides the [`Outcome`] of a query from the policy and the device bindings.
pub struct PolicyEvaluator {
    policy: Arc<EnforcementPolicy>,
    store: Option<Arc<dyn DeviceBindingStore>>,
}

impl PolicyEvaluator {
    /// `store` may be `None` only when enforcement is disabled; any lookup then fails.
    pub fn new(policy: Arc<EnforcementPolicy>, store: Option<Arc<dyn DeviceBindingStore>>) -> Self {
        Self { policy, store }
    }

    pub fn policy(&self) -> &EnforcementPolicy {
        &self.policy
    }

    pub async fn evaluate(&self, query: &Query<'_>, budget: &RequestBudget) -> Outcome {
        let device = if self.policy.enforcement_enabled {
            match self.device_status(query.source(), budget).await {
                Ok(device) => device,
                Err(e) => return self.on_lookup_failure(query, e),
            }
        } else {
            DeviceStatus::unknown()
        };

        if device.mac_found {
            tracing::debug!("device {} behind {} is {:?}", device.mac, query.source(), device.status);
        }

        if device.status == RegistrationStatus::Registered {
            return Outcome::PassThrough;
        }

        if !query.qtype().is_address() {
            return match &self.policy.blackhole {
                Some(target) => Outcome::Blackhole {
                    target: target.name.clone(),
                    address: target.address,
                },
                None => Outcome::PassThrough,
            };
        }

        Outcome::Redirect(self.policy.redirect_address)
    }

    /// Resolve `source` to its device and the device's registration status.
    pub async fn device_status(&self, source: IpAddr, budget: &RequestBudget) -> Result<DeviceStatus, LookupError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| LookupError::Backend(anyhow::anyhow!("no device binding store configured")))?;

        let mac = timeout_at(budget.at(), store.lookup_device_id(source))
            .await
            .map_err(|_| LookupError::Timeout)??;

        let status = timeout_at(budget.at(), store.lookup_status(&mac))
            .await
            .map_err(|_| LookupError::Timeout)??;

        Ok(DeviceStatus {
            mac_found: true,
            mac,
            status,
        })
    }

    /// The single place a failed lookup is turned into an answer.
    fn on_lookup_failure(&self, query: &Query<'_>, err: LookupError) -> Outcome {
        tracing::warn!(
            "dropping {:?} query for {} from {}: {}",
            query.qtype(),
            query.name(),
            query.source(),
            err
        );
        Outcome::NoAnswer
    }
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod evaluator_tests;
