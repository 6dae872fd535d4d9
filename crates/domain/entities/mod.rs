pub mod sessions;
pub mod settlements;
