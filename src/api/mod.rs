pub mod account_handlers;
pub mod admin_handlers;
pub mod handlers;
pub mod routes;
pub mod session;

pub use account_handlers::*;
pub use admin_handlers::*;
pub use handlers::*;
pub use routes::*;
pub use session::*;
