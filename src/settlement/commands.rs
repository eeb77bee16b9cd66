/// 낙찰 관련 커맨드 처리
/// 1. 즉시 구매
/// 2. 낙찰 수락/거절
// region:    --- Imports
use crate::auction::model::{payment_status, status, winner_response, Auction};
use crate::auth::Claims;
use crate::bidding::model::Bid;
use crate::database::DatabaseManager;
use crate::payment::{CheckoutRequest, PaymentGateway};
use crate::query::handlers;
use crate::settlement::model::purchase_type;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Commands
/// 즉시 구매 명령
#[derive(Debug, Serialize, Deserialize)]
pub struct BuyNowCommand {
    pub auction_id: i64,
}

/// 낙찰 수락/거절 명령
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveWinCommand {
    pub auction_id: i64,
    pub action: String,
}

/// 낙찰자 응답 액션
pub mod action {
    pub const ACCEPT: &str = "accept";
    pub const DECLINE: &str = "decline";
}

// 버전 충돌 시 최대 재시도 횟수
const MAX_RETRIES: i32 = 100;

/// 1. 즉시 구매
/// 결제 세션은 저장소 트랜잭션 바깥에서 먼저 만들고,
/// 세션 참조 기록과 상태 전이는 짧은 트랜잭션 하나로 커밋한다.
pub async fn handle_buy_now(
    cmd: BuyNowCommand,
    buyer: &Claims,
    gateway: &impl PaymentGateway,
    db_manager: &DatabaseManager,
) -> Result<serde_json::Value, serde_json::Value> {
    info!(
        "{:<12} --> 즉시 구매 요청 처리 시작: auction_id={}",
        "Command", cmd.auction_id
    );

    let (auction, buy_now_price) = validate_buy_now(&cmd, buyer, db_manager).await?;

    // 결제 세션 생성 (실패 시 경매는 이전 상태 그대로)
    let session = gateway
        .create_session(&CheckoutRequest {
            auction_id: auction.id,
            buyer_id: buyer.sub,
            purchase_type: purchase_type::BUY_NOW.to_string(),
            amount: buy_now_price,
            description: auction.title.clone(),
        })
        .await
        .map_err(payment_failed)?;

    let mut retries = 0;
    let mut version = auction.version;

    while retries < MAX_RETRIES {
        // 세션 참조 기록 + 상태 전이
        // 같은 트랜잭션 단위에서 버전과 상태를 함께 검사한다. (동시 입찰 차단)
        let updated = sqlx::query(
            "UPDATE auctions
             SET status = $1, winner_id = $2, payment_status = $3,
                 payment_session_id = $4, current_price = GREATEST(current_price, $5),
                 version = version + 1
             WHERE id = $6 AND version = $7 AND status = $8",
        )
        .bind(status::BUY_NOW_PURCHASED)
        .bind(buyer.sub)
        .bind(payment_status::PENDING)
        .bind(&session.session_id)
        .bind(buy_now_price)
        .bind(cmd.auction_id)
        .bind(version)
        .bind(status::ACTIVE)
        .execute(db_manager.pool())
        .await
        .map_err(internal_error)?;

        if updated.rows_affected() == 1 {
            info!(
                "{:<12} --> 즉시 구매 전이 완료: auction_id={}, session_id={}",
                "Command", cmd.auction_id, session.session_id
            );
            return Ok(serde_json::json!({"checkout_url": session.checkout_url}));
        }

        // 다른 입찰이 먼저 커밋됨: 새 상태로 재검증 후 재시도
        warn!(
            "{:<12} --> 즉시 구매 버전 충돌: 재시도 ({}/{})",
            "Command",
            retries + 1,
            MAX_RETRIES
        );
        let (revalidated, _) = validate_buy_now(&cmd, buyer, db_manager).await?;
        version = revalidated.version;
        retries += 1;
    }

    Err(serde_json::json!({"error": "최대 재시도 횟수 초과", "code": "MAX_RETRIES_EXCEEDED"}))
}

/// 즉시 구매 가능 여부 검증 후 (경매, 즉시 구매 가격) 반환
async fn validate_buy_now(
    cmd: &BuyNowCommand,
    buyer: &Claims,
    db_manager: &DatabaseManager,
) -> Result<(Auction, i64), serde_json::Value> {
    let auction = handlers::get_auction(db_manager, cmd.auction_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            serde_json::json!({"error": "경매를 찾을 수 없습니다.", "code": "NOT_FOUND"})
        })?;

    let now = Utc::now();

    if buyer.sub == auction.seller_id {
        return Err(serde_json::json!({
            "error": "판매자는 자신의 경매를 구매할 수 없습니다.",
            "code": "SELF_PURCHASE"
        }));
    }

    if auction.has_ended(now) {
        return Err(serde_json::json!({
            "error": "경매가 이미 종료되었습니다.",
            "code": "ALREADY_ENDED"
        }));
    }

    if !auction.is_open_for_bidding(now) {
        return Err(serde_json::json!({
            "error": "구매 가능한 경매가 아닙니다.",
            "code": "AUCTION_NOT_ACTIVE"
        }));
    }

    match auction.buy_now_price {
        Some(buy_now_price) => Ok((auction, buy_now_price)),
        None => Err(serde_json::json!({
            "error": "즉시 구매 가격이 설정되지 않은 경매입니다.",
            "code": "NO_BUY_NOW_PRICE"
        })),
    }
}

/// 2. 낙찰 수락/거절
/// 낙찰자는 금액 내림차순, 동일 금액은 먼저 들어온 입찰 우선으로 결정한다.
pub async fn handle_resolve_win(
    cmd: ResolveWinCommand,
    caller: &Claims,
    gateway: &impl PaymentGateway,
    db_manager: &DatabaseManager,
) -> Result<serde_json::Value, serde_json::Value> {
    info!(
        "{:<12} --> 낙찰 처리 요청 시작: auction_id={}, action={}",
        "Command", cmd.auction_id, cmd.action
    );

    if cmd.action != action::ACCEPT && cmd.action != action::DECLINE {
        return Err(serde_json::json!({
            "error": "action 은 accept 또는 decline 이어야 합니다.",
            "code": "INVALID_ACTION"
        }));
    }

    let (auction, winning_bid) = validate_resolve_win(&cmd, caller, db_manager).await?;

    if cmd.action == action::DECLINE {
        return decline_win(&cmd, caller, db_manager, auction).await;
    }

    // 수락: 결제 세션 생성 후 PAYMENT_PENDING 전이
    let session = gateway
        .create_session(&CheckoutRequest {
            auction_id: auction.id,
            buyer_id: caller.sub,
            purchase_type: purchase_type::AUCTION_WIN.to_string(),
            amount: winning_bid.amount,
            description: auction.title.clone(),
        })
        .await
        .map_err(payment_failed)?;

    let mut retries = 0;
    let mut version = auction.version;

    while retries < MAX_RETRIES {
        let updated = sqlx::query(
            "UPDATE auctions
             SET status = $1, winner_id = $2, winner_response = $3,
                 payment_status = $4, payment_session_id = $5, version = version + 1
             WHERE id = $6 AND version = $7",
        )
        .bind(status::PAYMENT_PENDING)
        .bind(caller.sub)
        .bind(winner_response::ACCEPTED)
        .bind(payment_status::PENDING)
        .bind(&session.session_id)
        .bind(cmd.auction_id)
        .bind(version)
        .execute(db_manager.pool())
        .await
        .map_err(internal_error)?;

        if updated.rows_affected() == 1 {
            info!(
                "{:<12} --> 낙찰 수락 완료: auction_id={}, session_id={}",
                "Command", cmd.auction_id, session.session_id
            );
            return Ok(serde_json::json!({"checkout_url": session.checkout_url}));
        }

        warn!(
            "{:<12} --> 낙찰 수락 버전 충돌: 재시도 ({}/{})",
            "Command",
            retries + 1,
            MAX_RETRIES
        );
        let (revalidated, _) = validate_resolve_win(&cmd, caller, db_manager).await?;
        version = revalidated.version;
        retries += 1;
    }

    Err(serde_json::json!({"error": "최대 재시도 횟수 초과", "code": "MAX_RETRIES_EXCEEDED"}))
}

/// 낙찰 거절: 결제 세션 없이 DECLINED 로 전이
async fn decline_win(
    cmd: &ResolveWinCommand,
    caller: &Claims,
    db_manager: &DatabaseManager,
    auction: Auction,
) -> Result<serde_json::Value, serde_json::Value> {
    let mut retries = 0;
    let mut version = auction.version;

    while retries < MAX_RETRIES {
        let updated = sqlx::query(
            "UPDATE auctions
             SET status = $1, winner_id = $2, winner_response = $3, version = version + 1
             WHERE id = $4 AND version = $5",
        )
        .bind(status::DECLINED)
        .bind(caller.sub)
        .bind(winner_response::DECLINED)
        .bind(cmd.auction_id)
        .bind(version)
        .execute(db_manager.pool())
        .await
        .map_err(internal_error)?;

        if updated.rows_affected() == 1 {
            info!(
                "{:<12} --> 낙찰 거절 완료: auction_id={}",
                "Command", cmd.auction_id
            );
            return Ok(serde_json::json!({"declined": true}));
        }

        // 스케줄러의 상태 정리와 경합했을 수 있으므로 재검증 후 재시도
        warn!(
            "{:<12} --> 낙찰 거절 버전 충돌: 재시도 ({}/{})",
            "Command",
            retries + 1,
            MAX_RETRIES
        );
        let (revalidated, _) = validate_resolve_win(cmd, caller, db_manager).await?;
        version = revalidated.version;
        retries += 1;
    }

    Err(serde_json::json!({"error": "최대 재시도 횟수 초과", "code": "MAX_RETRIES_EXCEEDED"}))
}

/// 낙찰 수락/거절 가능 여부 검증 후 (경매, 최고 입찰) 반환
async fn validate_resolve_win(
    cmd: &ResolveWinCommand,
    caller: &Claims,
    db_manager: &DatabaseManager,
) -> Result<(Auction, Bid), serde_json::Value> {
    let auction = handlers::get_auction(db_manager, cmd.auction_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            serde_json::json!({"error": "경매를 찾을 수 없습니다.", "code": "NOT_FOUND"})
        })?;

    let now = Utc::now();

    if !auction.has_ended(now) {
        return Err(serde_json::json!({
            "error": "경매가 아직 종료되지 않았습니다.",
            "code": "NOT_ENDED"
        }));
    }

    // 종료 시간이 지난 ACTIVE 는 스케줄러가 아직 훑지 않은 것뿐이므로 허용
    if auction.status != status::ACTIVE && auction.status != status::ENDED {
        return Err(serde_json::json!({
            "error": "이미 처리된 경매입니다.",
            "code": "ALREADY_RESOLVED"
        }));
    }

    let winning_bid = handlers::get_highest_bid(db_manager, cmd.auction_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            serde_json::json!({"error": "입찰이 없는 경매입니다.", "code": "NO_BIDS"})
        })?;

    if winning_bid.bidder_id != caller.sub {
        return Err(serde_json::json!({
            "error": "낙찰자가 아닙니다.",
            "code": "NOT_WINNER"
        }));
    }

    if let Some(reserve_price) = auction.reserve_price {
        if winning_bid.amount < reserve_price {
            return Err(serde_json::json!({
                "error": "최고 입찰액이 최저 낙찰 가격에 미치지 못했습니다.",
                "code": "RESERVE_NOT_MET"
            }));
        }
    }

    Ok((auction, winning_bid))
}

/// 결제 협력 서비스 오류는 내용을 숨기고 일반 실패로 돌려준다
fn payment_failed(e: String) -> serde_json::Value {
    error!("{:<12} --> 결제 세션 생성 오류: {}", "Command", e);
    serde_json::json!({"error": "결제 세션 생성에 실패했습니다.", "code": "PAYMENT_FAILED"})
}

/// 저장소 오류는 내부 내용을 숨기고 로그로만 남긴다
fn internal_error(e: sqlx::Error) -> serde_json::Value {
    error!("{:<12} --> 저장소 오류: {:?}", "Command", e);
    serde_json::json!({"error": "내부 오류가 발생했습니다.", "code": "INTERNAL"})
}
// endregion: --- Commands
