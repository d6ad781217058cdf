use std::collections::HashMap;

use crate::model::{
    CartItem, Id, LineItem, LineItemView, Order, OrderView, PricedCart, PricedCartItem, Product,
};
use crate::store::traits::Store;

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Price a cart against the live catalog. Items whose product has
/// vanished (retired by an inventory reload before checkout) are
/// dropped from the priced view rather than priced at zero.
pub fn price_cart(items: &[CartItem], products: &HashMap<Id, Product>) -> PricedCart {
    let priced: Vec<PricedCartItem> = items
        .iter()
        .filter_map(|item| {
            products.get(&item.product_id).map(|product| PricedCartItem {
                product_id: product.id,
                product_name: product.name.clone(),
                unit_price: product.price,
                quantity: item.quantity,
                line_total: product.price * item.quantity as f64,
            })
        })
        .collect();

    let total = priced.iter().map(|line| line.line_total).sum();
    PricedCart {
        items: priced,
        total,
    }
}

/// Resolve an order's line items for display. A dangling product
/// reference renders with a retired-product placeholder; the historical
/// record is never dropped.
pub fn resolve_line_items(
    items: &[LineItem],
    products: &HashMap<Id, Product>,
) -> Vec<LineItemView> {
    items
        .iter()
        .map(|item| match products.get(&item.product_id) {
            Some(product) => LineItemView {
                id: item.id,
                product_id: item.product_id,
                product_name: product.name.clone(),
                unit_price: product.price,
                quantity: item.quantity,
                retired: false,
            },
            None => LineItemView {
                id: item.id,
                product_id: item.product_id,
                product_name: "[retired product]".to_string(),
                unit_price: 0.0,
                quantity: item.quantity,
                retired: true,
            },
        })
        .collect()
}

/// Turn the session's cart into a pending order: price at current
/// catalog prices, write the order and line items, clear the cart.
pub async fn checkout<S: Store>(
    store: &S,
    session_token: &str,
    customer_id: Id,
) -> Result<Order, CheckoutError> {
    let cart_items = store.list_cart_items(session_token).await?;
    let products = product_map(store).await?;

    let priced = price_cart(&cart_items, &products);
    if priced.items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let lines: Vec<(Id, i32)> = priced
        .items
        .iter()
        .map(|line| (line.product_id, line.quantity))
        .collect();

    let order = store
        .create_order(customer_id, session_token, priced.total, &lines)
        .await?;

    log::info!(
        "order {} created for customer {}: {} lines, total {:.2}",
        order.id,
        customer_id,
        lines.len(),
        order.total
    );

    Ok(order)
}

/// Assemble the display view of an order with resolved products
pub async fn order_view<S: Store>(store: &S, order: Order) -> anyhow::Result<OrderView> {
    let items = store.list_line_items(order.id).await?;
    let products = product_map(store).await?;

    Ok(OrderView {
        id: order.id,
        customer_id: order.customer_id,
        status: order.status,
        total: order.total,
        created_at: order.created_at,
        archived: order.archived,
        items: resolve_line_items(&items, &products),
    })
}

async fn product_map<S: Store>(store: &S) -> anyhow::Result<HashMap<Id, Product>> {
    Ok(store
        .list_products()
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: Id, name: &str, price: f64) -> Product {
        Product {
            id,
            name: name.to_string(),
            description: String::new(),
            price,
        }
    }

    fn cart_item(product_id: Id, quantity: i32) -> CartItem {
        CartItem {
            id: product_id,
            session_token: "s".to_string(),
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_price_cart_totals() {
        let products: HashMap<Id, Product> = [
            (1, product(1, "BOX-A", 1.0)),
            (2, product(2, "TAPE-B", 2.5)),
        ]
        .into_iter()
        .collect();

        let cart = price_cart(&[cart_item(1, 3), cart_item(2, 2)], &products);

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.total, 3.0 + 5.0);
    }

    #[test]
    fn test_price_cart_drops_vanished_products() {
        let products: HashMap<Id, Product> =
            [(1, product(1, "BOX-A", 1.0))].into_iter().collect();

        let cart = price_cart(&[cart_item(1, 1), cart_item(99, 4)], &products);

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total, 1.0);
    }

    #[test]
    fn test_resolve_line_items_marks_retired() {
        let products: HashMap<Id, Product> =
            [(1, product(1, "BOX-A", 1.0))].into_iter().collect();
        let items = vec![
            LineItem {
                id: 10,
                order_id: 1,
                product_id: 1,
                quantity: 2,
            },
            LineItem {
                id: 11,
                order_id: 1,
                product_id: 6,
                quantity: 1,
            },
        ];

        let views = resolve_line_items(&items, &products);

        assert!(!views[0].retired);
        assert_eq!(views[0].product_name, "BOX-A");
        assert!(views[1].retired);
        // The dangling reference is preserved, not nulled
        assert_eq!(views[1].product_id, 6);
    }
}
