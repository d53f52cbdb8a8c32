pub mod client;
pub mod profile;
pub mod types;

pub use client::{basic_auth_header, StatusCollector};
pub use profile::{Scheme, TargetProfile};
pub use types::StatusPayload;
