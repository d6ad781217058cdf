pub mod postgres;
pub mod product_cache;
pub mod traits;

pub use postgres::*;
pub use product_cache::*;
pub use traits::*;
