pub mod capacity;
pub mod catalog;
pub mod discount;
