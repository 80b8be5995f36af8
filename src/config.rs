//! 客户端配置。
//!
//! 以 TOML 格式保存在平台配置目录（`skydrivex/sdk.toml`），
//! 之后再由 `SKYDRIVEX_*` 环境变量覆盖。

use crate::error::{DriveError, DriveResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

/// 上传会话的分片大小必须是该值的整数倍，否则 Graph 会拒绝。
pub const UPLOAD_CHUNK_ALIGNMENT: u64 = 320 * 1024;
/// Graph 单次分片 PUT 允许的最大字节数。
pub const MAX_UPLOAD_CHUNK_SIZE: u64 = 60 * 1024 * 1024;

const DEFAULT_UPLOAD_SESSION_FILE_SIZE_LIMIT: u64 = 4 * 1024 * 1024;
const DEFAULT_UPLOAD_CHUNK_SIZE: u64 = 10 * UPLOAD_CHUNK_ALIGNMENT;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 600;
const DEFAULT_RETRY_BACKOFF_MILLIS: u64 = 500;

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "Skydrivex";
const APPLICATION: &str = "Skydrivex";
const CONFIG_FILE_NAME: &str = "sdk.toml";

const ENV_ENDPOINT: &str = "SKYDRIVEX_ENDPOINT";
const ENV_ACCESS_TOKEN: &str = "SKYDRIVEX_ACCESS_TOKEN";
const ENV_SESSION_LIMIT: &str = "SKYDRIVEX_UPLOAD_SESSION_LIMIT";
const ENV_CHUNK_SIZE: &str = "SKYDRIVEX_UPLOAD_CHUNK_SIZE";

#[derive(Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// drive API 的基础地址，不带末尾斜杠。
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// 每个 API 请求都会携带的 bearer token。
    #[serde(default)]
    pub access_token: String,

    /// 单次请求上传的最大文件字节数，超过后改用上传会话。
    #[serde(default = "default_session_limit")]
    pub upload_session_file_size_limit: u64,

    #[serde(default = "default_chunk_size")]
    pub upload_chunk_size: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// 内容传输（直传、分片、下载）的超时时间。
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,

    #[serde(default)]
    pub chunk_retry: ChunkRetryPolicy,
}

/// 传输失败后重发分片的策略，默认关闭。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRetryPolicy {
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_backoff")]
    pub backoff_millis: u64,
}

impl ChunkRetryPolicy {
    /// 第 `attempt` 次重试前的线性退避时间（从 1 开始计数）。
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_millis.saturating_mul(u64::from(attempt)))
    }
}

impl Default for ChunkRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_millis: DEFAULT_RETRY_BACKOFF_MILLIS,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_session_limit() -> u64 {
    DEFAULT_UPLOAD_SESSION_FILE_SIZE_LIMIT
}

fn default_chunk_size() -> u64 {
    DEFAULT_UPLOAD_CHUNK_SIZE
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_transfer_timeout() -> u64 {
    DEFAULT_TRANSFER_TIMEOUT_SECS
}

fn default_backoff() -> u64 {
    DEFAULT_RETRY_BACKOFF_MILLIS
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            access_token: String::new(),
            upload_session_file_size_limit: default_session_limit(),
            upload_chunk_size: default_chunk_size(),
            request_timeout_secs: default_request_timeout(),
            transfer_timeout_secs: default_transfer_timeout(),
            chunk_retry: ChunkRetryPolicy::default(),
        }
    }
}

impl fmt::Debug for DriveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.access_token.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("DriveConfig")
            .field("endpoint", &self.endpoint)
            .field("access_token", &token)
            .field(
                "upload_session_file_size_limit",
                &self.upload_session_file_size_limit,
            )
            .field("upload_chunk_size", &self.upload_chunk_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("transfer_timeout_secs", &self.transfer_timeout_secs)
            .field("chunk_retry", &self.chunk_retry)
            .finish()
    }
}

impl DriveConfig {
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token: access_token.into(),
            ..Self::default()
        }
    }

    /// 读取平台配置目录下的配置文件（如果存在），
    /// 再应用环境变量覆盖并校验结果。
    pub fn load() -> DriveResult<Self> {
        let path = config_path()?;
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 读取并校验指定的 TOML 文件，不应用环境变量。
    pub fn load_from(path: &Path) -> DriveResult<Self> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> DriveResult<Self> {
        let config: DriveConfig =
            toml::from_str(content).map_err(|e| DriveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> DriveResult<String> {
        toml::to_string_pretty(self).map_err(|e| DriveError::Config(e.to_string()))
    }

    fn read_file(path: &Path) -> DriveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DriveError::local_io(path, e))?;
        toml::from_str(&content)
            .map_err(|e| DriveError::Config(format!("{}: {e}", path.display())))
    }

    /// 用 `lookup(key)` 的结果覆盖字段；正式环境下即 `std::env::var`。
    pub fn apply_env<F>(&mut self, lookup: F) -> DriveResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            self.access_token = token;
        }
        if let Some(raw) = lookup(ENV_SESSION_LIMIT) {
            self.upload_session_file_size_limit = parse_bytes(ENV_SESSION_LIMIT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CHUNK_SIZE) {
            self.upload_chunk_size = parse_bytes(ENV_CHUNK_SIZE, &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> DriveResult<()> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| DriveError::Config(format!("invalid endpoint {:?}: {e}", self.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DriveError::Config(format!(
                "endpoint must be http(s), got {}",
                url.scheme()
            )));
        }
        if self.upload_session_file_size_limit == 0 {
            return Err(DriveError::Config(
                "upload_session_file_size_limit must be positive".to_string(),
            ));
        }
        if self.upload_chunk_size == 0 {
            return Err(DriveError::Config(
                "upload_chunk_size must be positive".to_string(),
            ));
        }
        if self.upload_chunk_size > MAX_UPLOAD_CHUNK_SIZE {
            return Err(DriveError::Config(format!(
                "upload_chunk_size {} exceeds the {MAX_UPLOAD_CHUNK_SIZE} byte maximum",
                self.upload_chunk_size
            )));
        }
        if self.upload_chunk_size % UPLOAD_CHUNK_ALIGNMENT != 0 {
            warn!(
                chunk_size = self.upload_chunk_size,
                alignment = UPLOAD_CHUNK_ALIGNMENT,
                "upload chunk size is not aligned; Graph endpoints will reject it"
            );
        }
        Ok(())
    }

    pub fn endpoint_base(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}

fn parse_bytes(key: &str, raw: &str) -> DriveResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| DriveError::Config(format!("{key}={raw:?}: {e}")))
}

/// 平台配置文件所在路径。
pub fn config_path() -> DriveResult<PathBuf> {
    let dirs = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or_else(|| {
        DriveError::Config("failed to resolve application config directory".to_string())
    })?;
    Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
}
