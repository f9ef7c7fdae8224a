pub mod analysis;
pub mod catalog;
pub mod error;
pub mod table;
