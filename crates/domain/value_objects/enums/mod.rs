pub mod billing_cycles;
pub mod practice_categories;
pub mod purposes;
pub mod session_statuses;
