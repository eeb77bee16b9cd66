use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 입찰 모델
// 한 번 기록된 입찰은 수정되지 않는다.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub bidder_name: String,
    pub amount: i64,
    pub bid_time: DateTime<Utc>,
}
