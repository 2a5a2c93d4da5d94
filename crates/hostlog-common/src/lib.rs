pub mod payload;
pub mod types;
