//! Types, errors and traits shared by the REST and real-time clients

pub mod channels;
pub mod errors;
pub mod traits;
pub mod types;
