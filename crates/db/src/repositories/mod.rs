//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod access_override_repo;
pub mod brand_repo;
pub mod permission_repo;
pub mod plan_repo;
pub mod session_repo;
pub mod user_repo;
pub mod visit_repo;

pub use access_override_repo::AccessOverrideRepo;
pub use brand_repo::BrandRepo;
pub use permission_repo::PermissionRepo;
pub use plan_repo::PlanRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
pub use visit_repo::VisitRepo;
