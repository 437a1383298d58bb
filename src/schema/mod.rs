//! Request/response schema of the host bridge
//!
//! JSON shapes exchanged with the mobile host. Requests arrive loosely typed and
//! are validated here; responses wrap the canonical types under the keys the
//! host expects.

mod request;
mod response;

pub use request::*;
pub use response::*;
