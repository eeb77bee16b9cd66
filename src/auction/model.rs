use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 경매 상태 코드
pub mod status {
    pub const ACTIVE: &str = "ACTIVE";
    pub const ENDED: &str = "ENDED";
    pub const BUY_NOW_PURCHASED: &str = "BUY_NOW_PURCHASED";
    pub const PAYMENT_PENDING: &str = "PAYMENT_PENDING";
    pub const SOLD: &str = "SOLD";
    pub const DECLINED: &str = "DECLINED";
}

/// 결제 상태 코드
pub mod payment_status {
    pub const PENDING: &str = "PENDING";
    pub const PAID: &str = "PAID";
    pub const EXPIRED: &str = "EXPIRED";
}

/// 낙찰자 응답 코드
pub mod winner_response {
    pub const ACCEPTED: &str = "ACCEPTED";
    pub const DECLINED: &str = "DECLINED";
}

// 경매 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Auction {
    pub id: i64,
    pub seller_id: i64,
    pub seller_name: String,
    pub title: String,
    pub description: String,
    pub starting_price: i64,
    pub current_price: i64,
    pub buy_now_price: Option<i64>,
    pub reserve_price: Option<i64>,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub winner_id: Option<i64>,
    pub winner_response: Option<String>,
    pub payment_status: Option<String>,
    pub payment_session_id: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    /// 입찰 가능 여부
    /// 저장된 상태만 믿지 않고 항상 현재 시각과 함께 판정한다.
    pub fn is_open_for_bidding(&self, now: DateTime<Utc>) -> bool {
        self.status == status::ACTIVE && now >= self.start_time && now < self.end_time
    }

    /// 종료 시간 경과 여부 (저장된 상태와 무관)
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_auction(status: &str, start_offset: i64, end_offset: i64) -> Auction {
        let now = Utc::now();
        Auction {
            id: 1,
            seller_id: 10,
            seller_name: "판매자".to_string(),
            title: "테스트 경매".to_string(),
            description: "상태 판정 테스트".to_string(),
            starting_price: 1000,
            current_price: 1000,
            buy_now_price: None,
            reserve_price: None,
            status: status.to_string(),
            start_time: now + Duration::seconds(start_offset),
            end_time: now + Duration::seconds(end_offset),
            winner_id: None,
            winner_response: None,
            payment_status: None,
            payment_session_id: None,
            version: 0,
            created_at: now,
        }
    }

    /// ACTIVE 이면서 종료 전이면 입찰 가능
    #[test]
    fn open_when_active_and_before_end() {
        let auction = sample_auction(status::ACTIVE, -60, 60);
        assert!(auction.is_open_for_bidding(Utc::now()));
    }

    /// 종료 시간이 지난 ACTIVE 경매는 저장된 상태와 무관하게 입찰 불가
    #[test]
    fn closed_when_end_time_elapsed() {
        let auction = sample_auction(status::ACTIVE, -120, -1);
        assert!(!auction.is_open_for_bidding(Utc::now()));
        assert!(auction.has_ended(Utc::now()));
    }

    /// 시작 전 경매는 입찰 불가
    #[test]
    fn closed_before_start_time() {
        let auction = sample_auction(status::ACTIVE, 60, 120);
        assert!(!auction.is_open_for_bidding(Utc::now()));
    }

    /// ACTIVE 가 아닌 상태는 시간과 무관하게 입찰 불가
    #[test]
    fn closed_when_not_active() {
        for s in [
            status::ENDED,
            status::BUY_NOW_PURCHASED,
            status::PAYMENT_PENDING,
            status::SOLD,
            status::DECLINED,
        ] {
            let auction = sample_auction(s, -60, 60);
            assert!(!auction.is_open_for_bidding(Utc::now()));
        }
    }
}
