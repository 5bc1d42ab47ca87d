pub mod dataset;
pub mod equipment;
pub mod error;
pub mod retention;
pub mod summary;
pub mod user;
