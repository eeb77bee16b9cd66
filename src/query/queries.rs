/// 경매 조회
pub const GET_AUCTION: &str = "SELECT * FROM auctions WHERE id = $1";

/// 모든 경매 조회
pub const GET_ALL_AUCTIONS: &str = "SELECT * FROM auctions ORDER BY created_at DESC";

/// 입찰 이력 조회
/// 금액 내림차순, 동일 금액은 먼저 들어온 입찰이 앞선다.
/// LIMIT 에 NULL 을 바인드하면 제한 없음.
pub const GET_BID_HISTORY: &str = r#"
    SELECT id, auction_id, bidder_id, bidder_name, amount, bid_time
    FROM bids
    WHERE auction_id = $1
    ORDER BY amount DESC, bid_time ASC
    LIMIT $2
"#;

/// 최고 입찰 조회 (낙찰자 결정과 같은 순서)
pub const GET_HIGHEST_BID: &str = r#"
    SELECT id, auction_id, bidder_id, bidder_name, amount, bid_time
    FROM bids
    WHERE auction_id = $1
    ORDER BY amount DESC, bid_time ASC
    LIMIT 1
"#;

/// 결제 세션 참조로 경매 조회
pub const GET_AUCTION_BY_SESSION: &str =
    "SELECT * FROM auctions WHERE payment_session_id = $1";

/// 결제 세션 참조로 거래 조회
pub const GET_TRANSACTION_BY_SESSION: &str =
    "SELECT * FROM transactions WHERE payment_session_id = $1";

/// 사용자 거래 내역 조회 (구매 + 판매)
pub const GET_USER_TRANSACTIONS: &str = r#"
    SELECT *
    FROM transactions
    WHERE buyer_id = $1 OR seller_id = $1
    ORDER BY created_at DESC
"#;
