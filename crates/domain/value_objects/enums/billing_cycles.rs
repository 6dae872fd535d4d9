use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Once,
    Monthly,
    Free,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Once => "once",
            BillingCycle::Monthly => "monthly",
            BillingCycle::Free => "free",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "once" => Some(BillingCycle::Once),
            "monthly" => Some(BillingCycle::Monthly),
            "free" => Some(BillingCycle::Free),
            _ => None,
        }
    }
}

impl Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
