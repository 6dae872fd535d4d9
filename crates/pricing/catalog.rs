use std::collections::HashSet;

use anyhow::{Result, bail};

use crate::domain::value_objects::{
    enums::{
        billing_cycles::BillingCycle, practice_categories::PracticeCategory, purposes::Purpose,
    },
    plans::Plan,
};

/// Read-only plan table. Validated once on construction and shared without locking.
#[derive(Debug, Clone)]
pub struct PricingCatalog {
    plans: Vec<Plan>,
}

impl PricingCatalog {
    pub fn new(plans: Vec<Plan>) -> Result<Self> {
        let mut seen = HashSet::new();

        for plan in &plans {
            if plan.id.trim().is_empty() {
                bail!("plan id must not be empty");
            }
            if !seen.insert(plan.id.as_str()) {
                bail!("duplicate plan id {}", plan.id);
            }
            if plan.base_price < 0 {
                bail!("plan {} has a negative price", plan.id);
            }
            if plan.billing_cycle == BillingCycle::Free && plan.base_price != 0 {
                bail!("free plan {} must cost 0", plan.id);
            }
        }

        Ok(Self { plans })
    }

    /// The catalog the portal ships with.
    pub fn standard() -> Self {
        use BillingCycle::*;
        use PracticeCategory::*;

        let plans = vec![
            Plan::new(
                "exam_free_trial",
                "Free Trial",
                0,
                Exam,
                Free,
                &["10 Sample Questions", "Instant Scoring"],
            ),
            Plan::new(
                "exam_one_off",
                "Single Exam",
                3000,
                Exam,
                Once,
                &["Full Mock Exam", "Answer Explanations", "Score Breakdown"],
            ),
            Plan::new(
                "standard_test",
                "Career Test",
                7300,
                Exam,
                Once,
                &[
                    "Industry Standard Test",
                    "AI Insight Report",
                    "Answer Explanations",
                    "Strength Mapping",
                ],
            ),
            Plan::new(
                "int_basic_once",
                "Basic Interview",
                2500,
                Interview,
                Once,
                &["20-Min Session", "Written Feedback"],
            ),
            Plan::new(
                "int_silver_once",
                "Silver Interview",
                5000,
                Interview,
                Once,
                &["30-Min Session", "Written Feedback", "Question Bank Access"],
            ),
            Plan::new(
                "int_gold_once",
                "Gold Interview",
                10000,
                Interview,
                Once,
                &[
                    "45-Min Session",
                    "Real Industry Experts",
                    "Body Language Analysis",
                    "Follow-up Email",
                ],
            ),
            Plan::new(
                "int_diamond_once",
                "Diamond Interview",
                15000,
                Interview,
                Once,
                &[
                    "60-Min Session",
                    "Panel of Two Experts",
                    "Recorded Replay",
                    "Personal Improvement Plan",
                ],
            ),
            Plan::new(
                "monthly_mastery",
                "Monthly Mastery",
                45000,
                Subscription,
                Monthly,
                &[
                    "4 Live Interviews",
                    "1 Session Per Week",
                    "24/7 Priority Support",
                    "Dedicated Career Coach",
                ],
            ),
        ];

        Self { plans }
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn lookup_plan(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.id == plan_id)
    }

    /// Plans offered for a purpose, in catalog order. Subscription plans follow the
    /// interview tiers because they only cover interview sessions.
    pub fn plans_for(&self, purpose: Purpose) -> Vec<Plan> {
        let category = purpose.category();

        let direct = self.plans.iter().filter(|plan| plan.category == category);
        let bundled = self.plans.iter().filter(|plan| {
            plan.category == PracticeCategory::Subscription && plan.category.serves(category)
        });

        direct.chain(bundled).cloned().collect()
    }
}
