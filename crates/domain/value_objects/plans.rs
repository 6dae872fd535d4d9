use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::{
    billing_cycles::BillingCycle, practice_categories::PracticeCategory,
};

/// A priced product tier. Prices are whole currency units; the gateway adapter converts to minor units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Plan {
    pub id: String,
    pub display_name: String,
    pub base_price: i64,
    pub category: PracticeCategory,
    pub billing_cycle: BillingCycle,
    pub features: Vec<String>,
}

impl Plan {
    pub fn new(
        id: &str,
        display_name: &str,
        base_price: i64,
        category: PracticeCategory,
        billing_cycle: BillingCycle,
        features: &[&str],
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            base_price,
            category,
            billing_cycle,
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn is_free(&self) -> bool {
        self.base_price == 0
    }
}

#[derive(Debug, Deserialize)]
pub struct ListPlansQuery {
    pub purpose: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectPlanRequest {
    pub plan_id: String,
}
