/// 입찰 커맨드 처리
// region:    --- Imports
use crate::auction::model::status;
use crate::auth::Claims;
use crate::bidding::model::Bid;
use crate::database::DatabaseManager;
use crate::query::handlers;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub auction_id: i64,
    pub amount: i64,
}

// 버전 충돌 시 최대 재시도 횟수
const MAX_RETRIES: i32 = 100;

/// 최소 입찰 단위 (통화 최소 단위, 정책 값)
pub fn bid_increment() -> i64 {
    std::env::var("BID_INCREMENT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}

/// 수락 가능한 최소 입찰액
/// current_price 는 항상 max(최고 입찰액, 시작 가격) 으로 유지된다.
pub fn minimum_bid(starting_price: i64, current_price: i64, increment: i64) -> i64 {
    current_price.max(starting_price) + increment
}

/// 입찰 처리
/// 가격 갱신과 입찰 기록은 한 트랜잭션으로 커밋되거나 둘 다 실패한다.
/// 동시 입찰은 경매 행의 버전 카운터로 직렬화하고, 충돌 시 재검증 후 재시도한다.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    bidder: &Claims,
    db_manager: &DatabaseManager,
) -> Result<serde_json::Value, serde_json::Value> {
    info!(
        "{:<12} --> 입찰 요청 처리 시작: auction_id={}, amount={}",
        "Command", cmd.auction_id, cmd.amount
    );

    if cmd.amount <= 0 {
        return Err(serde_json::json!({
            "error": "입찰 금액은 0보다 커야 합니다.",
            "code": "INVALID_AMOUNT"
        }));
    }

    let increment = bid_increment();
    let mut retries = 0;

    while retries < MAX_RETRIES {
        // 현재 경매 상태 조회
        let auction = handlers::get_auction(db_manager, cmd.auction_id)
            .await
            .map_err(internal_error)?
            .ok_or_else(|| {
                serde_json::json!({"error": "경매를 찾을 수 없습니다.", "code": "NOT_FOUND"})
            })?;

        let now = Utc::now();

        // 판매자 본인 입찰 금지
        if bidder.sub == auction.seller_id {
            return Err(serde_json::json!({
                "error": "판매자는 자신의 경매에 입찰할 수 없습니다.",
                "code": "SELF_BID"
            }));
        }

        // 저장된 상태가 ACTIVE 라도 종료 시간이 지났으면 입찰 불가
        if !auction.is_open_for_bidding(now) {
            return Err(serde_json::json!({
                "error": "입찰 가능한 경매가 아닙니다.",
                "code": "AUCTION_NOT_ACTIVE"
            }));
        }

        let minimum = minimum_bid(auction.starting_price, auction.current_price, increment);
        if cmd.amount < minimum {
            return Err(serde_json::json!({
                "error": "입찰 금액이 최소 입찰액보다 낮습니다.",
                "code": "BID_TOO_LOW",
                "minimum_bid": minimum
            }));
        }

        let mut tx = db_manager.pool().begin().await.map_err(internal_error)?;

        // 버전 검사를 포함한 가격 갱신
        // 같은 트랜잭션 안에서 상태도 다시 확인한다. (즉시 구매와의 경합 차단)
        let updated = sqlx::query(
            "UPDATE auctions SET current_price = $1, version = version + 1
             WHERE id = $2 AND version = $3 AND status = $4",
        )
        .bind(cmd.amount)
        .bind(cmd.auction_id)
        .bind(auction.version)
        .bind(status::ACTIVE)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

        if updated.rows_affected() == 0 {
            // 다른 입찰 또는 즉시 구매가 먼저 커밋됨: 새 상태로 재검증
            tx.rollback().await.map_err(internal_error)?;
            warn!(
                "{:<12} --> 낙관적 업데이트로 인한 버전 충돌: 재시도 ({}/{})",
                "Command",
                retries + 1,
                MAX_RETRIES
            );
            retries += 1;
            continue;
        }

        // 입찰 기록 추가
        let bid = sqlx::query_as::<_, Bid>(
            "INSERT INTO bids (auction_id, bidder_id, bidder_name, amount, bid_time)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(cmd.auction_id)
        .bind(bidder.sub)
        .bind(&bidder.name)
        .bind(cmd.amount)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(internal_error)?;

        tx.commit().await.map_err(internal_error)?;

        info!(
            "{:<12} --> 입찰 성공: bid_id={}, current_price={}",
            "Command", bid.id, cmd.amount
        );
        return Ok(serde_json::json!({
            "bid_id": bid.id,
            "created_at": bid.bid_time,
            "current_price": cmd.amount
        }));
    }

    Err(serde_json::json!({"error": "최대 재시도 횟수 초과", "code": "MAX_RETRIES_EXCEEDED"}))
}

/// 저장소 오류는 내부 내용을 숨기고 로그로만 남긴다
fn internal_error(e: sqlx::Error) -> serde_json::Value {
    error!("{:<12} --> 저장소 오류: {:?}", "Command", e);
    serde_json::json!({"error": "내부 오류가 발생했습니다.", "code": "INTERNAL"})
}
// endregion: --- Commands
