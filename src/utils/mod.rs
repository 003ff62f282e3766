pub mod lease;
pub mod staging;
