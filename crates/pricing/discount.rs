use crate::domain::value_objects::plans::Plan;

pub const DEFAULT_EARLY_BIRD_DAYS: i64 = 4;
pub const DEFAULT_DISCOUNT_PERCENT: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeContext {
    pub lead_time_days: i64,
    pub is_waitlist: bool,
}

/// Early-booking discount. Waitlisted sessions always receive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountPolicy {
    pub early_bird_days: i64,
    pub discount_percent: i64,
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self {
            early_bird_days: DEFAULT_EARLY_BIRD_DAYS,
            discount_percent: DEFAULT_DISCOUNT_PERCENT,
        }
    }
}

impl DiscountPolicy {
    pub fn new(early_bird_days: i64, discount_percent: i64) -> Self {
        Self {
            early_bird_days,
            discount_percent: discount_percent.clamp(0, 100),
        }
    }

    pub fn is_discounted(&self, context: ChargeContext) -> bool {
        context.is_waitlist || context.lead_time_days >= self.early_bird_days
    }

    /// Amount to collect, in whole currency units.
    pub fn compute_charge(&self, plan: &Plan, context: ChargeContext) -> i64 {
        if plan.base_price <= 0 {
            return 0;
        }
        if !self.is_discounted(context) {
            return plan.base_price;
        }

        // integer round-half-up
        (plan.base_price * (100 - self.discount_percent) + 50) / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::catalog::PricingCatalog;

    fn context(lead_time_days: i64, is_waitlist: bool) -> ChargeContext {
        ChargeContext {
            lead_time_days,
            is_waitlist,
        }
    }

    #[test]
    fn free_plans_never_charge() {
        let policy = DiscountPolicy::default();
        let catalog = PricingCatalog::standard();
        let free = catalog.lookup_plan("exam_free_trial").unwrap();

        for lead in [-3, 0, 3, 4, 30] {
            for waitlisted in [false, true] {
                assert_eq!(policy.compute_charge(free, context(lead, waitlisted)), 0);
            }
        }
    }

    #[test]
    fn early_or_waitlisted_bookings_get_fifteen_percent_off() {
        let policy = DiscountPolicy::default();
        let catalog = PricingCatalog::standard();

        for plan in catalog.plans().iter().filter(|p| !p.is_free()) {
            let expected = (plan.base_price as f64 * 0.85).round() as i64;
            assert_eq!(policy.compute_charge(plan, context(4, false)), expected, "{}", plan.id);
            assert_eq!(policy.compute_charge(plan, context(1, true)), expected, "{}", plan.id);
        }
    }

    #[test]
    fn short_lead_pays_full_price() {
        let policy = DiscountPolicy::default();
        let catalog = PricingCatalog::standard();

        for plan in catalog.plans() {
            assert_eq!(policy.compute_charge(plan, context(3, false)), plan.base_price);
        }
    }

    #[test]
    fn known_charges() {
        let policy = DiscountPolicy::default();
        let catalog = PricingCatalog::standard();

        let one_off = catalog.lookup_plan("exam_one_off").unwrap();
        let gold = catalog.lookup_plan("int_gold_once").unwrap();
        let test = catalog.lookup_plan("standard_test").unwrap();

        assert_eq!(policy.compute_charge(one_off, context(5, false)), 2550);
        assert_eq!(policy.compute_charge(gold, context(6, true)), 8500);
        assert_eq!(policy.compute_charge(test, context(10, false)), 6205);
    }

    #[test]
    fn rounds_half_up() {
        let policy = DiscountPolicy::new(4, 50);
        let plan = Plan::new(
            "odd",
            "Odd",
            5,
            crate::domain::value_objects::enums::practice_categories::PracticeCategory::Exam,
            crate::domain::value_objects::enums::billing_cycles::BillingCycle::Once,
            &[],
        );

        assert_eq!(policy.compute_charge(&plan, context(4, false)), 3);
    }
}
