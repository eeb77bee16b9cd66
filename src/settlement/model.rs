use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 구매 유형 코드
pub mod purchase_type {
    pub const BUY_NOW: &str = "BUY_NOW";
    pub const AUCTION_WIN: &str = "AUCTION_WIN";
}

// 거래 모델
// 결제 세션 참조당 최대 한 건만 존재한다. (payment_session_id 유니크 제약)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Transaction {
    pub id: i64,
    pub auction_id: i64,
    pub seller_id: i64,
    pub buyer_id: i64,
    pub final_price: i64,
    pub fee_amount: i64,
    pub payment_status: String,
    pub payment_method: String,
    pub payment_session_id: String,
    pub purchase_type: String,
    pub shipping_status: String,
    pub created_at: DateTime<Utc>,
}

// 결제 수수료율 (basis point)
const FEE_BASIS_POINTS: i64 = 350;

/// 최종 가격에 대한 결제 수수료
pub fn compute_fee(final_price: i64) -> i64 {
    final_price * FEE_BASIS_POINTS / 10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 수수료는 최종 가격만으로 결정된다
    #[test]
    fn fee_is_deterministic() {
        assert_eq!(compute_fee(7500), compute_fee(7500));
        assert_eq!(compute_fee(7500), 262);
        assert_eq!(compute_fee(10_000), 350);
        assert_eq!(compute_fee(0), 0);
    }
}
