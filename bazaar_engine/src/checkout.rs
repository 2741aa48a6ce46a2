//! Turns a cart into an order.
//!
//! [`build_order`] is a pure function. It validates the cart lines as they stand at checkout and freezes the product
//! name, unit price and seller of every line into the order. The caller persists the result.
use crate::{
    db_types::{
        is_valid_quantity,
        Address,
        AddressSnapshot,
        CartLine,
        Channel,
        Money,
        NewOrder,
        NewOrderItem,
        OrderCode,
        PaymentMethod,
    },
    traits::OrderFlowError,
};

pub fn build_order(
    code: OrderCode,
    user_id: i64,
    channel: Channel,
    lines: &[CartLine],
    address: &Address,
    payment_method: PaymentMethod,
) -> Result<NewOrder, OrderFlowError> {
    if lines.is_empty() {
        return Err(OrderFlowError::EmptyCart);
    }
    if address.user_id != user_id {
        return Err(OrderFlowError::AddressNotFound(address.id));
    }
    let items = lines.iter().map(|line| snapshot_line(channel, line)).collect::<Result<Vec<_>, _>>()?;
    let amount = order_amount(&items).ok_or(OrderFlowError::AmountTooLarge)?;
    Ok(NewOrder {
        code,
        user_id,
        channel,
        amount,
        shipping_address: AddressSnapshot::from(address),
        payment_method,
        items,
    })
}

fn order_amount(items: &[NewOrderItem]) -> Option<Money> {
    items.iter().try_fold(Money::default(), |total, item| {
        let line_total = item.unit_price.checked_mul(item.quantity)?;
        total.checked_add(line_total)
    })
}

fn snapshot_line(channel: Channel, line: &CartLine) -> Result<NewOrderItem, OrderFlowError> {
    let product = &line.product;
    if product.channel != channel {
        return Err(OrderFlowError::ChannelMismatch {
            product_id: product.id,
            expected: channel.to_string(),
            found: product.channel.to_string(),
        });
    }
    if !is_valid_quantity(line.quantity) {
        return Err(OrderFlowError::InvalidQuantity(line.quantity));
    }
    if !product.is_available {
        return Err(OrderFlowError::ProductUnavailable(product.name.clone()));
    }
    if !line.shop_open {
        return Err(OrderFlowError::ShopClosed(product.name.clone()));
    }
    Ok(NewOrderItem {
        product_id: product.id,
        seller_id: product.seller_id,
        product_name: product.name.clone(),
        unit_price: product.price,
        quantity: line.quantity,
    })
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db_types::{Product, MAX_CART_QUANTITY};

    fn product(id: i64, seller_id: i64, price: i64, channel: Channel) -> Product {
        Product {
            id,
            shop_id: seller_id,
            seller_id,
            name: format!("product {id}"),
            description: None,
            channel,
            price: Money::from(price),
            is_available: true,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(product: Product, quantity: i64) -> CartLine {
        CartLine { product, shop_open: true, quantity }
    }

    fn address(user_id: i64) -> Address {
        Address {
            id: 7,
            user_id,
            label: "Home".into(),
            line1: "12 MG Road".into(),
            line2: None,
            city: "Bengaluru".into(),
            state: "KA".into(),
            pincode: "560001".into(),
            phone: "9876543210".into(),
            is_default: true,
            created_at: Utc::now(),
        }
    }

    fn code() -> OrderCode {
        OrderCode("ABC123".into())
    }

    #[test]
    fn snapshots_lines_and_sums_amount() {
        let lines = vec![line(product(1, 10, 1500, Channel::Food), 2), line(product(2, 20, 250, Channel::Food), 4)];
        let order = build_order(code(), 1, Channel::Food, &lines, &address(1), PaymentMethod::Online).unwrap();
        assert_eq!(order.amount, Money::from(4000));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].unit_price, Money::from(1500));
        assert_eq!(order.items[1].seller_id, 20);
        assert_eq!(order.seller_ids(), vec![10, 20]);
        assert_eq!(order.shipping_address.city, "Bengaluru");
    }

    #[test]
    fn rejects_oversized_quantities_and_totals() {
        let lines = vec![line(product(1, 10, 12_000, Channel::Food), i64::MAX / 10_000)];
        let err = build_order(code(), 1, Channel::Food, &lines, &address(1), PaymentMethod::Online).unwrap_err();
        assert_eq!(err, OrderFlowError::InvalidQuantity(i64::MAX / 10_000));

        let lines = vec![line(product(1, 10, 100, Channel::Food), MAX_CART_QUANTITY)];
        assert!(build_order(code(), 1, Channel::Food, &lines, &address(1), PaymentMethod::Online).is_ok());

        // Prices that bypassed catalog validation still cannot wrap the order total
        let lines = vec![line(product(1, 10, i64::MAX / 2, Channel::Food), 3)];
        let err = build_order(code(), 1, Channel::Food, &lines, &address(1), PaymentMethod::Online).unwrap_err();
        assert_eq!(err, OrderFlowError::AmountTooLarge);
    }

    #[test]
    fn rejects_empty_cart() {
        let err = build_order(code(), 1, Channel::Food, &[], &address(1), PaymentMethod::Online).unwrap_err();
        assert_eq!(err, OrderFlowError::EmptyCart);
    }

    #[test]
    fn rejects_someone_elses_address() {
        let lines = vec![line(product(1, 10, 100, Channel::Food), 1)];
        let err = build_order(code(), 1, Channel::Food, &lines, &address(2), PaymentMethod::Online).unwrap_err();
        assert_eq!(err, OrderFlowError::AddressNotFound(7));
    }

    #[test]
    fn rejects_bad_lines() {
        let lines = vec![line(product(1, 10, 100, Channel::Grocery), 1)];
        let err = build_order(code(), 1, Channel::Food, &lines, &address(1), PaymentMethod::Online).unwrap_err();
        assert!(matches!(err, OrderFlowError::ChannelMismatch { product_id: 1, .. }));

        let lines = vec![line(product(1, 10, 100, Channel::Food), 0)];
        let err = build_order(code(), 1, Channel::Food, &lines, &address(1), PaymentMethod::Online).unwrap_err();
        assert_eq!(err, OrderFlowError::InvalidQuantity(0));

        let mut p = product(1, 10, 100, Channel::Food);
        p.is_available = false;
        let err = build_order(code(), 1, Channel::Food, &[line(p, 1)], &address(1), PaymentMethod::Online).unwrap_err();
        assert!(matches!(err, OrderFlowError::ProductUnavailable(_)));

        let closed = CartLine { product: product(1, 10, 100, Channel::Food), shop_open: false, quantity: 1 };
        let err =
            build_order(code(), 1, Channel::Food, &[closed], &address(1), PaymentMethod::CashOnDelivery).unwrap_err();
        assert!(matches!(err, OrderFlowError::ShopClosed(_)));
    }
}
