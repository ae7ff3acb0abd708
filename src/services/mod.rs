pub mod auth_service;
mod context;
pub mod revocation_service;
pub mod rotation_service;
pub mod user_service;

pub use auth_service::{AuthService, LoginOutcome};
pub use context::ServiceContext;
pub use revocation_service::FamilyRevocationService;
pub use rotation_service::RotationService;
