/// 결제 협력 서비스 연동
/// 1. 체크아웃 세션 생성
/// 2. 웹훅 서명 검증
// region:    --- Imports
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::info;
// endregion: --- Imports

type HmacSha256 = Hmac<Sha256>;

/// 웹훅 서명 헤더
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

// region:    --- Checkout Model
/// 결제 세션 생성 요청
#[derive(Debug, Serialize)]
pub struct CheckoutRequest {
    pub auction_id: i64,
    pub buyer_id: i64,
    pub purchase_type: String,
    pub amount: i64,
    pub description: String,
}

/// 생성된 결제 세션
#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutSession {
    pub session_id: String,
    pub checkout_url: String,
}

/// 결제 제공자 비동기 알림
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentNotification {
    pub session_id: String,
    pub outcome: String,
    #[serde(default)]
    pub metadata: NotificationMetadata,
}

/// 알림에 포함되는 세션 메타데이터
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NotificationMetadata {
    pub amount_total: Option<i64>,
    pub payment_method: Option<String>,
}

/// 알림 결과 코드
pub mod outcome {
    pub const COMPLETED: &str = "completed";
    pub const EXPIRED: &str = "expired";
}
// endregion: --- Checkout Model

// region:    --- Payment Gateway
/// 결제 게이트웨이 트레이트
#[async_trait]
pub trait PaymentGateway {
    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, String>;
}

/// 결제 게이트웨이 HTTP 구현체
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    success_url: String,
    cancel_url: String,
}

impl HttpPaymentGateway {
    pub fn new() -> Self {
        let api_url = std::env::var("PAYMENT_API_URL").expect("PAYMENT_API_URL must be set");
        let api_key = std::env::var("PAYMENT_API_KEY").expect("PAYMENT_API_KEY must be set");
        let success_url = std::env::var("CHECKOUT_SUCCESS_URL")
            .unwrap_or_else(|_| "http://localhost:3000/checkout/success".to_string());
        let cancel_url = std::env::var("CHECKOUT_CANCEL_URL")
            .unwrap_or_else(|_| "http://localhost:3000/checkout/cancel".to_string());

        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            success_url,
            cancel_url,
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    /// 체크아웃 세션 생성
    /// 저장소 트랜잭션 바깥에서 호출해야 한다. (락 보유 중 네트워크 호출 금지)
    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, String> {
        info!(
            "{:<12} --> 결제 세션 생성: auction_id={}, amount={}",
            "Payment", request.auction_id, request.amount
        );

        let body = serde_json::json!({
            "line_item": {
                "name": request.description,
                "amount": request.amount,
                "quantity": 1
            },
            "success_url": self.success_url,
            "cancel_url": self.cancel_url,
            "metadata": {
                "auction_id": request.auction_id,
                "buyer_id": request.buyer_id,
                "purchase_type": request.purchase_type,
                "amount_total": request.amount
            }
        });

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("결제 세션 생성 요청 실패: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("결제 세션 생성 실패: {}", response.status()));
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| format!("결제 세션 응답 파싱 실패: {}", e))
    }
}
// endregion: --- Payment Gateway

// region:    --- Webhook Signature
/// 웹훅 페이로드 서명 (테스트 및 로컬 제공자 시뮬레이션용)
pub fn sign_webhook_payload(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac");
    mac.update(body);
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// 웹훅 서명 검증
/// 검증 실패 사유는 호출자에게 구분해서 돌려주지 않는다.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let sig_bytes = match URL_SAFE_NO_PAD.decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac");
    mac.update(body);
    mac.verify_slice(&sig_bytes).is_ok()
}
// endregion: --- Webhook Signature

#[cfg(test)]
mod tests {
    use super::*;

    /// 서명한 페이로드는 검증을 통과한다
    #[test]
    fn signed_payload_verifies() {
        let secret = "whsec_test";
        let body = br#"{"session_id":"cs_1","outcome":"completed"}"#;
        let signature = sign_webhook_payload(secret, body);
        assert!(verify_webhook_signature(secret, body, &signature));
    }

    /// 페이로드가 한 바이트라도 다르면 검증 실패
    #[test]
    fn altered_payload_fails() {
        let secret = "whsec_test";
        let body = br#"{"session_id":"cs_1","outcome":"completed"}"#;
        let signature = sign_webhook_payload(secret, body);
        let altered = br#"{"session_id":"cs_1","outcome":"expired"}"#;
        assert!(!verify_webhook_signature(secret, altered, &signature));
    }

    /// 다른 비밀키로 만든 서명은 검증 실패
    #[test]
    fn wrong_secret_fails() {
        let body = br#"{"session_id":"cs_1","outcome":"completed"}"#;
        let signature = sign_webhook_payload("whsec_a", body);
        assert!(!verify_webhook_signature("whsec_b", body, &signature));
    }

    /// base64 가 아닌 서명 값은 검증 실패
    #[test]
    fn garbage_signature_fails() {
        let body = br#"{"session_id":"cs_1","outcome":"completed"}"#;
        assert!(!verify_webhook_signature("whsec_test", body, "!!not-base64!!"));
    }

    /// 알림 역직렬화: metadata 는 생략 가능
    #[test]
    fn notification_metadata_defaults() {
        let raw = r#"{"session_id":"cs_1","outcome":"completed"}"#;
        let notification: PaymentNotification = serde_json::from_str(raw).unwrap();
        assert_eq!(notification.outcome, outcome::COMPLETED);
        assert!(notification.metadata.amount_total.is_none());
    }
}
