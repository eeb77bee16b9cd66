/// 인증 토큰 검증
/// 토큰 발급은 별도의 인증 서비스 담당이고, 여기서는 검증만 한다.
// region:    --- Imports
use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
// endregion: --- Imports

// region:    --- Claims
/// 검증된 호출자 신원
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,
    pub name: String,
    pub exp: i64,
}
// endregion: --- Claims

// region:    --- Token Verification
fn auth_secret() -> String {
    std::env::var("AUTH_SECRET").expect("AUTH_SECRET must be set")
}

/// 인증 실패 응답
/// 어떤 리소스가 존재하는지 드러나지 않도록 원인과 무관하게 동일하다.
fn auth_failed() -> serde_json::Value {
    serde_json::json!({"error": "인증에 실패했습니다.", "code": "AUTH_FAILED"})
}

/// 요청 헤더의 Bearer 토큰 검증
pub fn authenticate(headers: &HeaderMap) -> Result<Claims, serde_json::Value> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(auth_failed)?;

    let token = header.strip_prefix("Bearer ").ok_or_else(auth_failed)?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth_secret().as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| auth_failed())?;

    Ok(data.claims)
}

/// 토큰 발급 (통합 테스트 및 로컬 환경용)
pub fn issue_token(user_id: i64, name: &str, ttl_seconds: i64) -> String {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: chrono::Utc::now().timestamp() + ttl_seconds,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(auth_secret().as_bytes()),
    )
    .expect("token encoding")
}
// endregion: --- Token Verification

#[cfg(test)]
mod tests {
    use super::*;

    fn set_secret() {
        std::env::set_var("AUTH_SECRET", "test-secret");
    }

    /// 발급한 토큰은 검증을 통과한다
    #[test]
    fn issued_token_authenticates() {
        set_secret();
        let token = issue_token(7, "입찰자", 600);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());

        let claims = authenticate(&headers).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.name, "입찰자");
    }

    /// 변조된 토큰은 거부된다
    #[test]
    fn tampered_token_rejected() {
        set_secret();
        let mut token = issue_token(7, "입찰자", 600);
        token.push('x');
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());

        let err = authenticate(&headers).unwrap_err();
        assert_eq!(err["code"], "AUTH_FAILED");
    }

    /// 헤더가 없으면 거부된다
    #[test]
    fn missing_header_rejected() {
        set_secret();
        let headers = HeaderMap::new();
        let err = authenticate(&headers).unwrap_err();
        assert_eq!(err["code"], "AUTH_FAILED");
    }
}
