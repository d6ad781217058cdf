pub mod auth;
pub mod checkout;
pub mod importer;

pub use auth::{hash_password, new_session, verify_password};
pub use checkout::{checkout, order_view, price_cart, resolve_line_items, CheckoutError};
pub use importer::{
    compute_rewrites, load_feed, parse_feed, plan_rebuild, run_import, FeedEntry, ImportError,
    ImportReport, RebuildPlan,
};
