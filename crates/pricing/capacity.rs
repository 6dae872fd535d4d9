use std::collections::HashSet;

use crate::domain::value_objects::enums::practice_categories::PracticeCategory;

/// Decides whether a category currently has free slots.
pub trait CapacityPolicy: Send + Sync {
    fn is_exhausted(&self, category: PracticeCategory) -> bool;
}

/// Flag-based capacity: categories listed here are routed to the waiting list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfiguredCapacity {
    waitlisted: HashSet<PracticeCategory>,
}

impl ConfiguredCapacity {
    pub fn new(waitlisted: impl IntoIterator<Item = PracticeCategory>) -> Self {
        Self {
            waitlisted: waitlisted.into_iter().collect(),
        }
    }

    pub fn open() -> Self {
        Self::default()
    }
}

impl CapacityPolicy for ConfiguredCapacity {
    fn is_exhausted(&self, category: PracticeCategory) -> bool {
        self.waitlisted.contains(&category)
    }
}
