// region:    --- Imports
use super::queries;
use crate::auction::model::Auction;
use crate::bidding::model::Bid;
use crate::database::DatabaseManager;
use crate::settlement::model::Transaction;
use sqlx::Error as SqlxError;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// 경매 조회
pub async fn get_auction(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<Option<Auction>, SqlxError> {
    info!("{:<12} --> 경매 조회 id: {}", "Query", auction_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Auction>(queries::GET_AUCTION)
                    .bind(auction_id)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await
}

/// 모든 경매 조회
pub async fn get_all_auctions(db_manager: &DatabaseManager) -> Result<Vec<Auction>, SqlxError> {
    info!("{:<12} --> 모든 경매 조회", "Query");
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Auction>(queries::GET_ALL_AUCTIONS)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 입찰 이력 조회 (최근 N 건 제한 가능)
pub async fn get_bid_history(
    db_manager: &DatabaseManager,
    auction_id: i64,
    limit: Option<i64>,
) -> Result<Vec<Bid>, SqlxError> {
    info!(
        "{:<12} --> 입찰 이력 조회 id: {}, limit: {:?}",
        "Query", auction_id, limit
    );
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Bid>(queries::GET_BID_HISTORY)
                    .bind(auction_id)
                    .bind(limit)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 최고 입찰 조회
pub async fn get_highest_bid(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<Option<Bid>, SqlxError> {
    info!("{:<12} --> 최고 입찰 조회 id: {}", "Query", auction_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Bid>(queries::GET_HIGHEST_BID)
                    .bind(auction_id)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await
}

/// 결제 세션 참조로 경매 조회
pub async fn get_auction_by_session(
    db_manager: &DatabaseManager,
    session_id: &str,
) -> Result<Option<Auction>, SqlxError> {
    info!(
        "{:<12} --> 세션 기준 경매 조회 session_id: {}",
        "Query", session_id
    );
    let session_id = session_id.to_string();
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Auction>(queries::GET_AUCTION_BY_SESSION)
                    .bind(session_id)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await
}

/// 결제 세션 참조로 거래 조회
pub async fn get_transaction_by_session(
    db_manager: &DatabaseManager,
    session_id: &str,
) -> Result<Option<Transaction>, SqlxError> {
    info!(
        "{:<12} --> 세션 기준 거래 조회 session_id: {}",
        "Query", session_id
    );
    let session_id = session_id.to_string();
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Transaction>(queries::GET_TRANSACTION_BY_SESSION)
                    .bind(session_id)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await
}

/// 사용자 거래 내역 조회
pub async fn get_user_transactions(
    db_manager: &DatabaseManager,
    user_id: i64,
) -> Result<Vec<Transaction>, SqlxError> {
    info!("{:<12} --> 거래 내역 조회 user_id: {}", "Query", user_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Transaction>(queries::GET_USER_TRANSACTIONS)
                    .bind(user_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

// endregion: --- Query Handlers
