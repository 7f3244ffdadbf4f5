//! Backend DTOs shared by the core library and the CLI.
//!
//! Field names follow Rust conventions; the backend's Portuguese keys are
//! mapped with `serde(rename)`. Unknown fields are ignored unless a type keeps
//! them in a flattened `extra` map.

pub mod auth;
pub mod community;
pub mod de;
pub mod envelope;
pub mod records;
pub mod reports;
pub mod vehicle;

pub use auth::{CodeDelivery, LoginResponse, RegisterResponse, TokenPair, TwoFactorStatus, User};
pub use community::{CommunityFeed, Post, VehicleAd};
pub use envelope::{Envelope, ListResponse};
pub use records::{ExpenseCategory, ExpenseRecord, WorkRecord};
pub use reports::{CategoryTotal, ExpenseReport, UserStatistics, WorkReport};
pub use vehicle::{Vehicle, VehicleKind};
