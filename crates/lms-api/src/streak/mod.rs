pub mod lock;
pub mod model;
pub mod routes;
pub mod service;

pub use routes::routes;
pub use service::StreakService;
