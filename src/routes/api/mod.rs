pub mod auth;
pub mod protected;
mod router;

pub use router::router;
