mod guards;
mod json_error;
mod panic;
mod request_meta;

pub use guards::AuthGuard;
pub use json_error::json_error_middleware;
pub use panic::catch_panic_layer;
