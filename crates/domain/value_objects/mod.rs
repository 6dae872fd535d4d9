pub mod enums;
pub mod plans;
pub mod sessions;
pub mod settlements;
