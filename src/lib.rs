pub mod category;
pub mod dayclock;
pub mod errors;
pub mod extractors;
pub mod goal;
pub mod openapi;
pub mod snapshot;
pub mod transaction;
