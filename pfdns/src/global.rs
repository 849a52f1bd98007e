use std::sync::Arc;

use crate::{binding::DeviceBindingStore, evaluator::PolicyEvaluator, policy::EnforcementPolicy};

/// Global state shared across all requests.
pub struct Global {
    pub evaluator: PolicyEvaluator,
}

impl Global {
    pub fn new(policy: EnforcementPolicy, store: Option<Arc<dyn DeviceBindingStore>>) -> Self {
        Self {
            evaluator: PolicyEvaluator::new(Arc::new(policy), store),
        }
    }
}
