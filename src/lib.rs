//! Synheart Health - Cross-platform health data normalization
//!
//! Maps Android Health Connect and Apple HealthKit records onto one canonical
//! schema: native vocabulary → metric descriptors → aggregation, sleep
//! reconstruction and workout enrichment → bridge responses.
//!
//! ## Modules
//!
//! - **Vocabulary**: per-platform tables for workout types, sleep stages,
//!   permissions and aggregate handles
//! - **Queries**: aggregation engine, sleep reconstructor, workout enricher
//! - **Bridge**: request validation, permission checks and JSON dispatch over a
//!   host-supplied [`store::HealthStore`]

pub mod aggregation;
pub mod bridge;
pub mod config;
pub mod error;
pub mod metrics;
pub mod permissions;
pub mod schema;
pub mod sleep;
pub mod store;
pub mod types;
pub mod units;
pub mod vocabulary;
pub mod workouts;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use bridge::HealthBridge;
pub use config::BridgeConfig;
pub use error::{BridgeError, NativeError};
pub use store::{HealthStore, MemoryStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by tooling
pub const PRODUCER_NAME: &str = "synheart-health";
