pub mod common;
pub mod entity;
pub mod library;

pub use common::common_routes;
pub use entity::entity_routes;
pub use library::library_routes;
