pub mod cart;
pub mod common;
pub mod customer;
pub mod order;
pub mod product;
pub mod session;

pub use cart::{CartItem, PricedCart, PricedCartItem};
pub use common::{generate_token, Id};
pub use customer::{Customer, NewCustomer};
pub use order::{LineItem, LineItemView, Order, OrderStatus, OrderView};
pub use product::{Product, ProductUpdate};
pub use session::Session;
