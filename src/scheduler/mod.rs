/// 경매 상태 정리 스케줄러
/// 종료 시간이 지난 ACTIVE 경매를 보고용으로 ENDED 로 훑어 준다.
/// 정합성은 읽기/쓰기 시점의 시간 판정이 책임지므로 이 작업에 의존하지 않는다.
// region:    --- Imports
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Auction Scheduler
/// 경매 상태 정리 스케줄러
pub struct AuctionScheduler {
    pool: Arc<PgPool>,
}

/// 경매 상태 정리 스케줄러 생성
impl AuctionScheduler {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// 경매 상태 정리 스케줄러 시작
    pub async fn start(&self) {
        let pool = Arc::clone(&self.pool);
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1)); // 1초마다 실행
            loop {
                interval.tick().await;
                if let Err(e) = Self::sweep_ended_auctions(&pool).await {
                    error!(
                        "{:<12} --> 경매 상태 정리 중 오류 발생: {:?}",
                        "Scheduler", e
                    );
                }
            }
        });
    }

    /// ACTIVE -> ENDED 상태 정리
    async fn sweep_ended_auctions(pool: &PgPool) -> Result<(), sqlx::Error> {
        let now = Utc::now();

        // 버전도 함께 올려서 진행 중인 입찰 재시도가 새 상태를 보게 한다
        sqlx::query(
            "UPDATE auctions SET status = 'ENDED', version = version + 1
             WHERE status = 'ACTIVE' AND end_time <= $1",
        )
        .bind(now)
        .execute(pool)
        .await?;

        debug!("{:<12} --> 종료 경매 정리 완료", "Scheduler");

        Ok(())
    }
}
// endregion: --- Auction Scheduler
