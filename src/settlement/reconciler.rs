/// 결제 완료 정산
/// 웹훅 경로와 폴백 조회 경로가 같은 정산 함수를 공유한다.
/// 멱등성은 transactions.payment_session_id 유니크 제약이 보장한다.
// region:    --- Imports
use crate::auction::model::{payment_status, status, Auction};
use crate::database::DatabaseManager;
use crate::payment::{self, outcome, PaymentNotification};
use crate::query::handlers;
use crate::settlement::model::{compute_fee, purchase_type, Transaction};
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Notification Handling
/// 결제 제공자 알림 처리
/// 서명 검증 전에는 어떤 상태도 변경하지 않는다.
pub async fn handle_notification(
    db_manager: &DatabaseManager,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), String> {
    let secret = std::env::var("PAYMENT_WEBHOOK_SECRET")
        .map_err(|_| "PAYMENT_WEBHOOK_SECRET must be set".to_string())?;

    let signature = signature.ok_or_else(|| "서명 없는 알림 거부".to_string())?;
    if !payment::verify_webhook_signature(&secret, body, signature) {
        return Err("서명 검증 실패".to_string());
    }

    let notification: PaymentNotification =
        serde_json::from_slice(body).map_err(|e| format!("알림 파싱 실패: {}", e))?;

    info!(
        "{:<12} --> 결제 알림 수신: session_id={}, outcome={}",
        "Reconcile", notification.session_id, notification.outcome
    );

    match notification.outcome.as_str() {
        outcome::COMPLETED => {
            settle_completed_session(
                db_manager,
                &notification.session_id,
                notification.metadata.amount_total,
                notification.metadata.payment_method.as_deref(),
            )
            .await?;
            Ok(())
        }
        outcome::EXPIRED => expire_session(db_manager, &notification.session_id).await,
        other => {
            warn!("{:<12} --> 알 수 없는 결제 결과: {}", "Reconcile", other);
            Ok(())
        }
    }
}
// endregion: --- Notification Handling

// region:    --- Settlement
/// 결제 완료 세션 정산
/// 거래 생성과 경매 상태 갱신은 한 트랜잭션으로 커밋된다.
/// 중복 알림이나 폴백 경로와의 경합은 유니크 제약 위에서
/// ON CONFLICT DO NOTHING 으로 흡수하고 기존 거래를 돌려준다.
pub async fn settle_completed_session(
    db_manager: &DatabaseManager,
    session_id: &str,
    metadata_amount: Option<i64>,
    payment_method: Option<&str>,
) -> Result<Transaction, String> {
    let mut tx = db_manager
        .pool()
        .begin()
        .await
        .map_err(|e| e.to_string())?;

    let auction = sqlx::query_as::<_, Auction>(
        "SELECT * FROM auctions WHERE payment_session_id = $1",
    )
    .bind(session_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| e.to_string())?
    .ok_or_else(|| format!("세션에 해당하는 경매 없음: {}", session_id))?;

    let buyer_id = auction
        .winner_id
        .ok_or_else(|| format!("낙찰자가 기록되지 않은 세션: {}", session_id))?;

    // 세션 메타데이터의 금액이 없으면 경매의 현재 가격으로 대체
    let final_price = metadata_amount.unwrap_or(auction.current_price);
    let fee_amount = compute_fee(final_price);
    let purchase = if auction.status == status::BUY_NOW_PURCHASED {
        purchase_type::BUY_NOW
    } else {
        purchase_type::AUCTION_WIN
    };

    let inserted = sqlx::query_as::<_, Transaction>(
        "INSERT INTO transactions (auction_id, seller_id, buyer_id, final_price,
            fee_amount, payment_status, payment_method, payment_session_id, purchase_type)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (payment_session_id) DO NOTHING
         RETURNING *",
    )
    .bind(auction.id)
    .bind(auction.seller_id)
    .bind(buyer_id)
    .bind(final_price)
    .bind(fee_amount)
    .bind(payment_status::PAID)
    .bind(payment_method.unwrap_or("CARD"))
    .bind(session_id)
    .bind(purchase)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| e.to_string())?;

    match inserted {
        Some(transaction) => {
            sqlx::query(
                "UPDATE auctions
                 SET status = $1, payment_status = $2, version = version + 1
                 WHERE id = $3",
            )
            .bind(status::SOLD)
            .bind(payment_status::PAID)
            .bind(auction.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.to_string())?;

            tx.commit().await.map_err(|e| e.to_string())?;

            info!(
                "{:<12} --> 정산 완료: auction_id={}, transaction_id={}, final_price={}",
                "Reconcile", auction.id, transaction.id, final_price
            );
            Ok(transaction)
        }
        None => {
            // 이미 정산된 세션: 중복 알림은 성공으로 취급
            tx.rollback().await.map_err(|e| e.to_string())?;

            let existing = sqlx::query_as::<_, Transaction>(
                "SELECT * FROM transactions WHERE payment_session_id = $1",
            )
            .bind(session_id)
            .fetch_one(db_manager.pool())
            .await
            .map_err(|e| e.to_string())?;

            info!(
                "{:<12} --> 이미 정산된 세션 (no-op): session_id={}",
                "Reconcile", session_id
            );
            Ok(existing)
        }
    }
}

/// 결제 만료 세션 처리
/// 세션을 만든 경로에 따라 상태를 되돌린다.
/// - 즉시 구매: 상품을 다시 ACTIVE 로 되돌린다 (예비 낙찰자, 세션 참조 해제)
/// - 낙찰 수락: ENDED 로 되돌려 낙찰자가 다시 수락할 수 있게 한다
pub async fn expire_session(db_manager: &DatabaseManager, session_id: &str) -> Result<(), String> {
    let reopened = sqlx::query(
        "UPDATE auctions
         SET status = $1, payment_status = $2, winner_id = NULL,
             winner_response = NULL, payment_session_id = NULL, version = version + 1
         WHERE payment_session_id = $3 AND status = $4 AND payment_status = $5",
    )
    .bind(status::ACTIVE)
    .bind(payment_status::EXPIRED)
    .bind(session_id)
    .bind(status::BUY_NOW_PURCHASED)
    .bind(payment_status::PENDING)
    .execute(db_manager.pool())
    .await
    .map_err(|e| e.to_string())?;

    if reopened.rows_affected() == 1 {
        info!(
            "{:<12} --> 즉시 구매 결제 만료: 경매 재개 session_id={}",
            "Reconcile", session_id
        );
        return Ok(());
    }

    let reverted = sqlx::query(
        "UPDATE auctions
         SET status = $1, payment_status = $2, version = version + 1
         WHERE payment_session_id = $3 AND status = $4 AND payment_status = $5",
    )
    .bind(status::ENDED)
    .bind(payment_status::EXPIRED)
    .bind(session_id)
    .bind(status::PAYMENT_PENDING)
    .bind(payment_status::PENDING)
    .execute(db_manager.pool())
    .await
    .map_err(|e| e.to_string())?;

    if reverted.rows_affected() == 1 {
        info!(
            "{:<12} --> 낙찰 결제 만료: 수락 대기 상태로 복귀 session_id={}",
            "Reconcile", session_id
        );
    } else {
        // 이미 정산되었거나 알 수 없는 세션: 상태 변경 없음
        warn!(
            "{:<12} --> 만료 알림에 해당하는 대기 세션 없음: session_id={}",
            "Reconcile", session_id
        );
    }
    Ok(())
}

/// 세션 기준 거래 조회 (폴백 정산 포함)
/// 아직 알림이 도착하지 않았더라도 경매 기록상 호출자가 해당 세션의
/// 낙찰자라면 같은 정산 함수를 거쳐 거래를 만들어 돌려준다.
pub async fn resolve_transaction_for_session(
    db_manager: &DatabaseManager,
    session_id: &str,
    caller_id: i64,
) -> Result<Option<Transaction>, String> {
    let existing = handlers::get_transaction_by_session(db_manager, session_id)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(transaction) = existing {
        // 본인 거래가 아니면 존재 여부를 드러내지 않는다
        if transaction.buyer_id != caller_id && transaction.seller_id != caller_id {
            return Ok(None);
        }
        return Ok(Some(transaction));
    }

    // 폴백: 알림 지연 구간을 경매 기록으로 메운다
    let auction = handlers::get_auction_by_session(db_manager, session_id)
        .await
        .map_err(|e| e.to_string())?;

    let Some(auction) = auction else {
        return Ok(None);
    };

    let derivable = auction.winner_id == Some(caller_id)
        && auction.payment_status.as_deref() == Some(payment_status::PENDING)
        && (auction.status == status::BUY_NOW_PURCHASED
            || auction.status == status::PAYMENT_PENDING);

    if !derivable {
        return Ok(None);
    }

    info!(
        "{:<12} --> 폴백 정산 시작: session_id={}, caller_id={}",
        "Reconcile", session_id, caller_id
    );
    settle_completed_session(db_manager, session_id, None, None)
        .await
        .map(Some)
}
// endregion: --- Settlement
