pub mod http;
pub mod security;
pub mod startup;

pub use http::{create_router, ApiError, ApiState};
pub use startup::{build_state, init_tracing};
