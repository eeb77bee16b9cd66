// region:    --- Imports
use crate::auction::commands::{handle_create_auction, CreateAuctionCommand};
use crate::auth;
use crate::bidding::commands::{handle_place_bid, PlaceBidCommand};
use crate::database::DatabaseManager;
use crate::payment::{self, HttpPaymentGateway};
use crate::query;
use crate::settlement::commands::{
    handle_buy_now as command_handle_buy_now, handle_resolve_win, BuyNowCommand, ResolveWinCommand,
};
use crate::settlement::reconciler;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

// endregion: --- Imports

type AppState = (Arc<DatabaseManager>, Arc<HttpPaymentGateway>);

// region:    --- Error Mapping

/// 커맨드 오류 응답 매핑
/// 내부 오류는 상세를 숨긴 채 500 으로만 돌려준다.
fn error_response(e: serde_json::Value) -> axum::response::Response {
    let status = match e["code"].as_str() {
        Some("AUTH_FAILED") => StatusCode::UNAUTHORIZED,
        Some("NOT_FOUND") => StatusCode::NOT_FOUND,
        Some("INTERNAL") => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(e)).into_response()
}

fn storage_error(e: sqlx::Error) -> axum::response::Response {
    error!("{:<12} --> 저장소 오류: {:?}", "Handler", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "내부 오류가 발생했습니다.", "code": "INTERNAL"})),
    )
        .into_response()
}

// endregion: --- Error Mapping

// region:    --- Command Handlers

/// 경매 등록 요청 처리
pub async fn handle_post_auction(
    State((db_manager, _)): State<AppState>,
    headers: HeaderMap,
    Json(cmd): Json<CreateAuctionCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 경매 등록 요청 처리 시작: {:?}", "Command", cmd);

    let claims = match auth::authenticate(&headers) {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    match handle_create_auction(cmd, &claims, &db_manager).await {
        Ok(auction) => (StatusCode::CREATED, Json(auction)).into_response(),
        Err(e) => error_response(e),
    }
}

/// 입찰 요청 처리
pub async fn handle_bid(
    State((db_manager, _)): State<AppState>,
    headers: HeaderMap,
    Json(cmd): Json<PlaceBidCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    let claims = match auth::authenticate(&headers) {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    match handle_place_bid(cmd, &claims, &db_manager).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e),
    }
}

/// 즉시 구매 요청 처리
pub async fn handle_buy_now(
    State((db_manager, gateway)): State<AppState>,
    headers: HeaderMap,
    Json(cmd): Json<BuyNowCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 즉시 구매 요청 처리 시작: {:?}", "Command", cmd);

    let claims = match auth::authenticate(&headers) {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    match command_handle_buy_now(cmd, &claims, gateway.as_ref(), &db_manager).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e),
    }
}

/// 낙찰 수락/거절 요청 처리
pub async fn handle_resolve(
    State((db_manager, gateway)): State<AppState>,
    headers: HeaderMap,
    Json(cmd): Json<ResolveWinCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 낙찰 처리 요청 시작: {:?}", "Command", cmd);

    let claims = match auth::authenticate(&headers) {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    match handle_resolve_win(cmd, &claims, gateway.as_ref(), &db_manager).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e),
    }
}

/// 결제 웹훅 처리
/// 제공자 재시도 폭주를 막기 위해 항상 200 을 돌려주고 오류는 로그로만 남긴다.
pub async fn handle_payment_webhook(
    State((db_manager, _)): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(payment::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = reconciler::handle_notification(&db_manager, &body, signature).await {
        error!("{:<12} --> 결제 알림 처리 실패: {}", "Webhook", e);
    }

    (StatusCode::OK, Json(serde_json::json!({"received": true}))).into_response()
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 입찰 이력 조회 파라미터
#[derive(Debug, Deserialize)]
pub struct BidHistoryParams {
    pub limit: Option<i64>,
}

/// 경매 조회
pub async fn handle_get_auction(
    State((db_manager, _)): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 경매 조회 id: {}", "HandlerQuery", auction_id);
    match query::handlers::get_auction(&db_manager, auction_id).await {
        Ok(Some(auction)) => Json(auction).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "경매를 찾을 수 없습니다.", "code": "NOT_FOUND"})),
        )
            .into_response(),
        Err(e) => storage_error(e),
    }
}

/// 모든 경매 조회
pub async fn handle_get_auctions(
    State((db_manager, _)): State<AppState>,
) -> impl IntoResponse {
    info!("{:<12} --> 모든 경매 조회", "HandlerQuery");
    match query::handlers::get_all_auctions(&db_manager).await {
        Ok(auctions) => Json(auctions).into_response(),
        Err(e) => storage_error(e),
    }
}

/// 입찰 이력 조회
pub async fn handle_get_bid_history(
    State((db_manager, _)): State<AppState>,
    Path(auction_id): Path<i64>,
    Query(params): Query<BidHistoryParams>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 입찰 이력 조회 id: {}",
        "HandlerQuery", auction_id
    );
    match query::handlers::get_bid_history(&db_manager, auction_id, params.limit).await {
        Ok(bids) => {
            let history: Vec<serde_json::Value> = bids
                .iter()
                .map(|b| {
                    serde_json::json!({
                        "amount": b.amount,
                        "created_at": b.bid_time,
                        "bidder_display": b.bidder_name
                    })
                })
                .collect();
            Json(history).into_response()
        }
        Err(e) => storage_error(e),
    }
}

/// 최고 입찰 조회
pub async fn handle_get_highest_bid(
    State((db_manager, _)): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 최고 입찰 조회 id: {}",
        "HandlerQuery", auction_id
    );
    match query::handlers::get_highest_bid(&db_manager, auction_id).await {
        Ok(bid) => Json(bid).into_response(),
        Err(e) => storage_error(e),
    }
}

/// 세션 기준 거래 조회 (폴백 정산 포함)
pub async fn handle_get_transaction_by_session(
    State((db_manager, _)): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 세션 기준 거래 조회 session_id: {}",
        "HandlerQuery", session_id
    );

    let claims = match auth::authenticate(&headers) {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    match reconciler::resolve_transaction_for_session(&db_manager, &session_id, claims.sub).await {
        Ok(Some(transaction)) => Json(transaction).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "거래를 찾을 수 없습니다.", "code": "NOT_FOUND"})),
        )
            .into_response(),
        Err(e) => {
            error!("{:<12} --> 거래 조회 실패: {}", "HandlerQuery", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "내부 오류가 발생했습니다.", "code": "INTERNAL"})),
            )
                .into_response()
        }
    }
}

/// 거래 내역 조회
pub async fn handle_get_transactions(
    State((db_manager, _)): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    info!("{:<12} --> 거래 내역 조회", "HandlerQuery");

    let claims = match auth::authenticate(&headers) {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    match query::handlers::get_user_transactions(&db_manager, claims.sub).await {
        Ok(transactions) => Json(transactions).into_response(),
        Err(e) => storage_error(e),
    }
}

/// 헬스 체크
pub async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

// endregion: --- Query Handlers
