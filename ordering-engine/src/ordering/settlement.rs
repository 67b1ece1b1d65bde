//! Guest Settlement Helper
//!
//! 无线上支付流程的下单方（如代客下单的访客）在订单创建时生成
//! 现金占位支付记录；该记录与订单同一事务提交，从不单独落库。

use crate::db::models::{Payment, PaymentMethod, PaymentStatus};

/// Build the placeholder cash payment for one order
pub fn guest_cash_payment(order_id: &str, total_amount: f64, now: i64) -> Payment {
    Payment {
        id: None,
        payment_id: format!("pay-{}", uuid::Uuid::new_v4().simple()),
        order_id: order_id.to_string(),
        method: PaymentMethod::Cash,
        amount: total_amount,
        status: PaymentStatus::Unpaid,
        timestamp: now,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_unpaid_cash() {
        let payment = guest_cash_payment("order:abc", 50000.0, 1234567890);
        assert_eq!(payment.method, PaymentMethod::Cash);
        assert_eq!(payment.status, PaymentStatus::Unpaid);
        assert_eq!(payment.amount, 50000.0);
        assert_eq!(payment.order_id, "order:abc");
        assert_eq!(payment.timestamp, 1234567890);
        assert!(payment.payment_id.starts_with("pay-"));
    }

    #[test]
    fn payment_ids_are_unique() {
        let a = guest_cash_payment("order:abc", 10.0, 0);
        let b = guest_cash_payment("order:abc", 10.0, 0);
        assert_ne!(a.payment_id, b.payment_id);
    }
}
