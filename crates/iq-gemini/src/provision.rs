//! Ways to create the remote context cache.
//!
//! [`EndpointProvisioner`] delegates to a deployed provisioning endpoint that
//! holds the server-side key. [`DirectProvisioner`] performs the same steps
//! from this process: upload the dataset through the Files API, then pin it
//! as cached content.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::cache::{CACHE_TTL_SECS, CacheDescriptor, CacheProvisioner, cache_ttl};
use crate::classify::ProviderFailure;
use crate::client::{BASE_URL, Content, FileData, Part};
use crate::error::{CacheError, CacheResult};

/// Upload root for the Files API.
pub const UPLOAD_BASE_URL: &str = "https://generativelanguage.googleapis.com/upload/v1beta";

const DATASET_DISPLAY_NAME: &str = "chinese-idioms-database";
const CACHE_DISPLAY_NAME: &str = "idioms-game-cache";
const DATASET_MIME: &str = "text/csv";

/// System instruction pinned alongside the dataset.
pub const CACHE_SYSTEM_INSTRUCTION: &str = "你是一個中文成語學習遊戲的主持人。

你已經擁有一個完整的成語資料庫（已上傳的 CSV 檔案），包含 1,543 個成語，每個成語都有：
- 編號：唯一識別碼
- 成語：四字成語
- 釋義：詳細解釋，包含典故來源
- 用法說明：使用情境，標註褒義/貶義
- 三歲版解釋：簡單易懂的解釋

在遊戲過程中，請務必：
1. 從資料庫中選擇符合情境和難度的成語
2. 確保成語的用法和解釋準確無誤
3. 根據難度調整成語的複雜程度
4. 避免在同一輪遊戲中重複使用成語";

/// Provisions through a remote endpoint that answers with a descriptor.
pub struct EndpointProvisioner {
    http: Client,
    url: String,
}

impl EndpointProvisioner {
    /// Provisioner posting to the init-cache endpoint at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl CacheProvisioner for EndpointProvisioner {
    async fn provision(&self) -> CacheResult<CacheDescriptor> {
        tracing::debug!(url = %self.url, "requesting cache from provisioning endpoint");
        let response = self
            .http
            .post(&self.url)
            .send()
            .await
            .map_err(|err| provisioning("provisioning endpoint unreachable", err))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| provisioning("provisioning endpoint response unreadable", err))?;
        parse_endpoint_response(status, &body)
    }
}

#[derive(Deserialize)]
struct EndpointError {
    #[serde(default)]
    error: String,
    message: Option<String>,
    hint: Option<String>,
    path: Option<String>,
}

/// Interpret a provisioning endpoint response.
///
/// Success bodies are descriptors. Failure bodies look like
/// `{"error": ..., "message"?: ..., "hint"?: ...}`.
pub fn parse_endpoint_response(status: u16, body: &str) -> CacheResult<CacheDescriptor> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body)
            .map_err(|err| provisioning("invalid descriptor from provisioning endpoint", err));
    }

    let Ok(failure) = serde_json::from_str::<EndpointError>(body) else {
        return Err(CacheError::Provisioning {
            message: format!("provisioning endpoint returned HTTP {status}"),
            detail: body.to_string(),
        });
    };

    if failure.error.contains("API key not configured") {
        return Err(CacheError::MissingCredential);
    }
    if failure.error.contains("CSV file not found") {
        return Err(CacheError::DatasetNotFound {
            path: failure.path.map(PathBuf::from).unwrap_or_default(),
        });
    }

    let message = if failure.error.is_empty() {
        format!("provisioning endpoint returned HTTP {status}")
    } else {
        failure.error
    };
    let detail = failure
        .message
        .or(failure.hint)
        .unwrap_or_else(|| body.to_string());
    Err(CacheError::Provisioning { message, detail })
}

/// Provisions by talking to the Gemini Files and caching APIs directly.
pub struct DirectProvisioner {
    http: Client,
    api_key: Option<String>,
    dataset: PathBuf,
    model: String,
    base_url: String,
    upload_base_url: String,
}

impl DirectProvisioner {
    /// Provisioner for `dataset` bound to the default model.
    pub fn new(api_key: Option<String>, dataset: impl Into<PathBuf>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            dataset: dataset.into(),
            model: crate::DEFAULT_MODEL.to_string(),
            base_url: BASE_URL.to_string(),
            upload_base_url: UPLOAD_BASE_URL.to_string(),
        }
    }

    /// Cache for `model` instead of the default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point both API roots elsewhere.
    pub fn with_base_urls(mut self, base: impl Into<String>, upload: impl Into<String>) -> Self {
        self.base_url = base.into();
        self.upload_base_url = upload.into();
        self
    }

    async fn upload(&self, key: &str, bytes: Vec<u8>) -> CacheResult<UploadedFile> {
        let start = self
            .http
            .post(format!("{}/files", self.upload_base_url))
            .query(&[("key", key)])
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", DATASET_MIME)
            .json(&serde_json::json!({ "file": { "display_name": DATASET_DISPLAY_NAME } }))
            .send()
            .await
            .map_err(|err| provisioning("dataset upload could not start", err))?;
        let start = check(start, "dataset upload could not start").await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| CacheError::Provisioning {
                message: "dataset upload could not start".to_string(),
                detail: "response carried no x-goog-upload-url header".to_string(),
            })?;

        let finish = self
            .http
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|err| provisioning("dataset upload failed", err))?;
        let finish = check(finish, "dataset upload failed").await?;

        let uploaded: UploadResponse = finish
            .json()
            .await
            .map_err(|err| provisioning("dataset upload returned an unexpected body", err))?;
        Ok(uploaded.file)
    }

    async fn create_cache(&self, key: &str, file: &UploadedFile) -> CacheResult<CachedContent> {
        let body = CreateCacheRequest {
            model: format!("models/{}", self.model),
            display_name: CACHE_DISPLAY_NAME.to_string(),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::FileData {
                    file_data: FileData {
                        mime_type: file.mime_type.clone(),
                        file_uri: file.uri.clone(),
                    },
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: CACHE_SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            ttl: format!("{CACHE_TTL_SECS}s"),
        };

        let response = self
            .http
            .post(format!("{}/cachedContents", self.base_url))
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(|err| provisioning("cache creation failed", err))?;
        let response = check(response, "cache creation failed").await?;
        response
            .json()
            .await
            .map_err(|err| provisioning("cache creation returned an unexpected body", err))
    }
}

#[async_trait]
impl CacheProvisioner for DirectProvisioner {
    async fn provision(&self) -> CacheResult<CacheDescriptor> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(CacheError::MissingCredential);
        };

        let bytes = match tokio::fs::read(&self.dataset).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::DatasetNotFound {
                    path: self.dataset.clone(),
                });
            }
            Err(err) => return Err(provisioning("dataset unreadable", err)),
        };

        tracing::info!(path = %self.dataset.display(), bytes = bytes.len(), "uploading idiom dataset");
        let file = self.upload(key, bytes).await?;
        tracing::debug!(name = %file.name, uri = %file.uri, "dataset uploaded");

        let cache = self.create_cache(key, &file).await?;
        Ok(CacheDescriptor {
            cache_handle: cache.name,
            model_id: self.model.clone(),
            expires_at: Utc::now() + cache_ttl(),
            token_count: cache
                .usage_metadata
                .map(|u| u.total_token_count)
                .unwrap_or_default(),
        })
    }
}

fn provisioning(message: &str, err: impl std::fmt::Display) -> CacheError {
    CacheError::Provisioning {
        message: message.to_string(),
        detail: err.to_string(),
    }
}

/// Pass successful responses through, turn the rest into a provisioning
/// error carrying the provider's message.
async fn check(response: reqwest::Response, message: &str) -> CacheResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let failure = ProviderFailure::from_response(status, &body);
    Err(CacheError::Provisioning {
        message: message.to_string(),
        detail: format!("HTTP {status}: {failure}"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCacheRequest {
    model: String,
    display_name: String,
    contents: Vec<Content>,
    system_instruction: Content,
    ttl: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile {
    name: String,
    uri: String,
    #[serde(default = "default_mime")]
    mime_type: String,
}

fn default_mime() -> String {
    DATASET_MIME.to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedContent {
    name: String,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_success_is_descriptor() {
        let body = r#"{"cacheName":"cachedContents/abc","model":"gemini-2.5-pro","expiresAt":1740830400000,"tokenCount":98000}"#;
        let descriptor = parse_endpoint_response(200, body).unwrap();
        assert_eq!(descriptor.cache_handle, "cachedContents/abc");
        assert_eq!(descriptor.token_count, 98_000);
    }

    #[test]
    fn endpoint_missing_key_is_fatal() {
        let body = r#"{"error":"API key not configured on server","hint":"Add GEMINI_API_KEY"}"#;
        assert!(matches!(
            parse_endpoint_response(500, body),
            Err(CacheError::MissingCredential)
        ));
    }

    #[test]
    fn endpoint_missing_dataset() {
        let body = r#"{"error":"CSV file not found","path":"/var/task/idioms.csv","cwd":"/var/task"}"#;
        match parse_endpoint_response(500, body) {
            Err(CacheError::DatasetNotFound { path }) => {
                assert_eq!(path, PathBuf::from("/var/task/idioms.csv"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn endpoint_failure_keeps_detail() {
        let body = r#"{"error":"Failed to create cache","message":"quota exceeded","hint":"check logs"}"#;
        match parse_endpoint_response(500, body) {
            Err(CacheError::Provisioning { message, detail }) => {
                assert_eq!(message, "Failed to create cache");
                assert_eq!(detail, "quota exceeded");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn endpoint_non_json_failure() {
        match parse_endpoint_response(502, "Bad Gateway") {
            Err(CacheError::Provisioning { message, detail }) => {
                assert!(message.contains("502"));
                assert_eq!(detail, "Bad Gateway");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn direct_requires_key_first() {
        let provisioner = DirectProvisioner::new(None, "/definitely/missing.csv");
        assert!(matches!(
            provisioner.provision().await,
            Err(CacheError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn direct_requires_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("idioms.csv");
        let provisioner = DirectProvisioner::new(Some("key".to_string()), &missing);
        match provisioner.provision().await {
            Err(CacheError::DatasetNotFound { path }) => assert_eq!(path, missing),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn cache_request_shape() {
        let body = CreateCacheRequest {
            model: "models/gemini-2.5-pro".to_string(),
            display_name: CACHE_DISPLAY_NAME.to_string(),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::FileData {
                    file_data: FileData {
                        mime_type: "text/csv".to_string(),
                        file_uri: "https://files/abc".to_string(),
                    },
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: "x".to_string(),
                }],
            },
            ttl: "3600s".to_string(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["displayName"], "idioms-game-cache");
        assert_eq!(
            value["contents"][0]["parts"][0]["fileData"]["fileUri"],
            "https://files/abc"
        );
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["ttl"], "3600s");
    }
}
