//! Classification of provider failures into a closed taxonomy.
//!
//! The UI never inspects raw provider errors. Everything that can go wrong on
//! the way to the model is first captured as a [`ProviderFailure`] and then
//! mapped by [`classify`] onto an [`ErrorKind`] plus a display message.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Phrases that indicate a missing or unusable credential.
const CREDENTIAL_PATTERNS: [&str; 3] = ["API Key not configured", "API Key not found", "API key"];

/// A raw failure from the transport or provider, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderFailure {
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
    /// Top-level message.
    pub message: String,
    /// Provider error detail from the response body, if any.
    pub details: String,
}

impl ProviderFailure {
    /// A failure carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            details: String::new(),
        }
    }

    /// The failure raised when no credential is available locally.
    pub fn missing_credential() -> Self {
        Self::new("API Key not found")
    }

    /// Build from a non-success HTTP response body.
    ///
    /// Gemini wraps errors as `{"error": {"code", "message", "status"}}`; the
    /// status word (e.g. `RESOURCE_EXHAUSTED`) is folded into `message`.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => {
                let detail = envelope.error.message.unwrap_or_default();
                let word = envelope.error.status.unwrap_or_default();
                let message = match (word.is_empty(), detail.is_empty()) {
                    (true, true) => body.to_string(),
                    (true, false) => detail.clone(),
                    (false, true) => word,
                    (false, false) => format!("{word}: {detail}"),
                };
                Self {
                    status: Some(status),
                    message,
                    details: detail,
                }
            }
            Err(_) => Self {
                status: Some(status),
                message: body.to_string(),
                details: String::new(),
            },
        }
    }

    /// Build from a transport-level error.
    pub fn transport(err: &reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: format!("request failed: {err}"),
            details: String::new(),
        }
    }
}

impl From<reqwest::Error> for ProviderFailure {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(&err)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Closed set of failure categories the UI can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credential missing or rejected before reaching the provider.
    InvalidCredential,
    /// HTTP 400.
    BadRequest,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// HTTP 429 without a quota phrase.
    RateLimited,
    /// HTTP 429 caused by an exhausted quota.
    QuotaExceeded,
    /// HTTP 500.
    ServerError,
    /// HTTP 503.
    ServiceUnavailable,
    /// HTTP 504.
    Timeout,
    /// Anything else.
    UnknownError,
}

impl ErrorKind {
    /// Stable tag for programmatic handling and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredential => "invalid_credential",
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate_limited",
            Self::QuotaExceeded => "quota_exceeded",
            Self::ServerError => "server_error",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Timeout => "timeout",
            Self::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified failure: a kind to branch on and a message to show.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{user_message}")]
pub struct ClassifiedError {
    /// Category.
    pub kind: ErrorKind,
    /// Short diagnostic message (English, or the provider's text verbatim).
    pub message: String,
    /// Message for the player.
    pub user_message: String,
}

/// Map a raw failure onto the taxonomy. Never fails.
pub fn classify(failure: &ProviderFailure) -> ClassifiedError {
    let raw = failure.message.as_str();

    if CREDENTIAL_PATTERNS.iter().any(|p| raw.contains(p)) {
        return build(
            ErrorKind::InvalidCredential,
            "API Key not configured",
            "🔑 需要設定 API 金鑰\n\n此遊戲需要 API 金鑰才能運作。\n請使用 `iq config set-key` 設定您的金鑰，或設定 GEMINI_API_KEY 環境變數。",
        );
    }

    match failure.status {
        Some(400) => build(
            ErrorKind::BadRequest,
            "Bad Request",
            "❌ 請求格式錯誤\n\n可能原因：\n• API 金鑰所在地區不支援免費版\n• 請求內容格式不正確\n\n建議：請檢查 API 金鑰設定。",
        ),
        Some(401) => build(
            ErrorKind::Unauthorized,
            "Unauthorized",
            "❌ 身份驗證失敗\n\nAPI 金鑰無效或已過期。\n請重新設定正確的金鑰。",
        ),
        Some(403) => build(
            ErrorKind::Forbidden,
            "Forbidden",
            "❌ 權限不足\n\n您的 API 金鑰無權存取此功能。\n請檢查金鑰權限設定。",
        ),
        Some(429) if raw.contains("RESOURCE_EXHAUSTED") || failure.details.contains("quota") => {
            build(
                ErrorKind::QuotaExceeded,
                "Resource Exhausted",
                "⏱️ 使用額度已達上限\n\n您已達到 API 的請求限制或每日配額。\n\n解決方案：\n• 等待幾分鐘後重試\n• 升級至付費方案以提高額度\n• 檢查 Google AI Studio 的使用量",
            )
        }
        Some(429) => build(
            ErrorKind::RateLimited,
            "Too Many Requests",
            "⏱️ 請求過於頻繁\n\n請稍候片刻再試。",
        ),
        Some(500) => build(
            ErrorKind::ServerError,
            "Internal Server Error",
            "⚠️ 伺服器暫時出錯\n\nGoogle 伺服器發生問題。\n\n建議：\n• 稍候幾秒後重試\n• 嘗試切換其他 AI 模型\n• 如持續發生，請稍後再試",
        ),
        Some(503) => build(
            ErrorKind::ServiceUnavailable,
            "Service Unavailable",
            "⚠️ 服務暫時無法使用\n\n伺服器可能正在維護或負載過高。\n請稍後再試。",
        ),
        Some(504) => build(
            ErrorKind::Timeout,
            "Deadline Exceeded",
            "⏰ 處理超時\n\n請求處理時間過長。\n建議縮短故事長度或重試。",
        ),
        _ => {
            let shown = if raw.is_empty() {
                "請檢查網路連線或稍後再試。"
            } else {
                raw
            };
            ClassifiedError {
                kind: ErrorKind::UnknownError,
                message: if raw.is_empty() {
                    "Unknown error".to_string()
                } else {
                    raw.to_string()
                },
                user_message: format!(
                    "❌ 發生未知錯誤\n\n{shown}\n\n如問題持續，請嘗試：\n• 重新開始遊戲\n• 檢查 API 金鑰設定\n• 以 IQ_LOG=debug 查看詳細錯誤訊息"
                ),
            }
        }
    }
}

fn build(kind: ErrorKind, message: &str, user_message: &str) -> ClassifiedError {
    ClassifiedError {
        kind,
        message: message.to_string(),
        user_message: user_message.to_string(),
    }
}

impl From<ProviderFailure> for ClassifiedError {
    fn from(failure: ProviderFailure) -> Self {
        classify(&failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: u16, message: &str) -> ProviderFailure {
        ProviderFailure {
            status: Some(status),
            message: message.to_string(),
            details: String::new(),
        }
    }

    #[test]
    fn credential_pattern_wins_over_status() {
        let f = with_status(400, "API key not valid. Please pass a valid API key.");
        assert_eq!(classify(&f).kind, ErrorKind::InvalidCredential);
        assert_eq!(
            classify(&ProviderFailure::missing_credential()).kind,
            ErrorKind::InvalidCredential
        );
    }

    #[test]
    fn status_dispatch() {
        let cases = [
            (400, ErrorKind::BadRequest),
            (401, ErrorKind::Unauthorized),
            (403, ErrorKind::Forbidden),
            (500, ErrorKind::ServerError),
            (503, ErrorKind::ServiceUnavailable),
            (504, ErrorKind::Timeout),
        ];
        for (status, kind) in cases {
            assert_eq!(classify(&with_status(status, "boom")).kind, kind, "{status}");
        }
    }

    #[test]
    fn too_many_requests_split_by_quota_phrase() {
        let quota = with_status(429, "RESOURCE_EXHAUSTED: You exceeded your current quota");
        assert_eq!(classify(&quota).kind, ErrorKind::QuotaExceeded);

        let mut by_details = with_status(429, "Too Many Requests");
        by_details.details = "daily quota reached".to_string();
        assert_eq!(classify(&by_details).kind, ErrorKind::QuotaExceeded);

        let rate = with_status(429, "slow down");
        assert_eq!(classify(&rate).kind, ErrorKind::RateLimited);
    }

    #[test]
    fn unknown_keeps_original_message() {
        let f = ProviderFailure::new("connection reset by peer");
        let c = classify(&f);
        assert_eq!(c.kind, ErrorKind::UnknownError);
        assert_eq!(c.message, "connection reset by peer");
        assert!(c.user_message.contains("connection reset by peer"));
    }

    #[test]
    fn unmatched_status_is_unknown() {
        assert_eq!(classify(&with_status(418, "teapot")).kind, ErrorKind::UnknownError);
    }

    #[test]
    fn classification_is_deterministic() {
        let f = with_status(429, "RESOURCE_EXHAUSTED");
        assert_eq!(classify(&f), classify(&f));
    }

    #[test]
    fn response_body_folds_status_word() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded for metric","status":"RESOURCE_EXHAUSTED"}}"#;
        let f = ProviderFailure::from_response(429, body);
        assert_eq!(f.status, Some(429));
        assert_eq!(f.message, "RESOURCE_EXHAUSTED: Quota exceeded for metric");
        assert_eq!(f.details, "Quota exceeded for metric");
        assert_eq!(classify(&f).kind, ErrorKind::QuotaExceeded);
    }

    #[test]
    fn non_json_body_kept_verbatim() {
        let f = ProviderFailure::from_response(502, "<html>bad gateway</html>");
        assert_eq!(f.message, "<html>bad gateway</html>");
        assert_eq!(classify(&f).kind, ErrorKind::UnknownError);
    }

    #[test]
    fn display_is_user_message() {
        let c = classify(&with_status(503, "x"));
        assert_eq!(c.to_string(), c.user_message);
        assert_eq!(c.kind.to_string(), "service_unavailable");
    }
}
