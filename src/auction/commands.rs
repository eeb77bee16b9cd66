/// 경매 등록 커맨드 처리
// region:    --- Imports
use crate::auction::model::{status, Auction};
use crate::auth::Claims;
use crate::database::DatabaseManager;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
// endregion: --- Imports

// region:    --- Commands
/// 경매 등록 명령
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAuctionCommand {
    pub title: String,
    pub description: String,
    pub starting_price: i64,
    pub buy_now_price: Option<i64>,
    pub reserve_price: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: DateTime<Utc>,
}

/// 경매 등록
/// 새 경매는 ACTIVE 상태, current_price = starting_price 로 시작한다.
pub async fn handle_create_auction(
    cmd: CreateAuctionCommand,
    seller: &Claims,
    db_manager: &DatabaseManager,
) -> Result<Auction, serde_json::Value> {
    info!("{:<12} --> 경매 등록 처리 시작: {:?}", "Command", cmd);

    let now = Utc::now();
    let start_time = cmd.start_time.unwrap_or(now);

    if cmd.starting_price <= 0 {
        return Err(serde_json::json!({
            "error": "시작 가격은 0보다 커야 합니다.",
            "code": "INVALID_AMOUNT"
        }));
    }

    if let Some(buy_now_price) = cmd.buy_now_price {
        if buy_now_price <= cmd.starting_price {
            return Err(serde_json::json!({
                "error": "즉시 구매 가격은 시작 가격보다 높아야 합니다.",
                "code": "INVALID_AMOUNT"
            }));
        }
    }

    if cmd.end_time <= start_time || cmd.end_time <= now {
        return Err(serde_json::json!({
            "error": "종료 시간은 시작 시간 이후의 미래여야 합니다.",
            "code": "INVALID_AMOUNT"
        }));
    }

    let seller_id = seller.sub;
    let seller_name = seller.name.clone();

    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Auction>(
                    "INSERT INTO auctions (seller_id, seller_name, title, description,
                        starting_price, current_price, buy_now_price, reserve_price,
                        status, start_time, end_time, version, created_at)
                     VALUES ($1, $2, $3, $4, $5, $5, $6, $7, $8, $9, $10, 0, $11)
                     RETURNING *",
                )
                .bind(seller_id)
                .bind(&seller_name)
                .bind(&cmd.title)
                .bind(&cmd.description)
                .bind(cmd.starting_price)
                .bind(cmd.buy_now_price)
                .bind(cmd.reserve_price)
                .bind(status::ACTIVE)
                .bind(start_time)
                .bind(cmd.end_time)
                .bind(now)
                .fetch_one(&mut **tx)
                .await
            })
        })
        .await
        .map_err(|e: sqlx::Error| serde_json::json!({"error": e.to_string()}))
}
// endregion: --- Commands
