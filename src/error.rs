use std::io;
use std::path::{Path, PathBuf};

pub type DriveResult<T> = Result<T, DriveError>;

/// SDK 对外暴露的全部错误类型。
/// 调用方应根据变体分支处理，而不是匹配错误信息文本。
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("remote item not found: {0}")]
    NotFound(String),

    /// 远端拒绝请求，例如冲突、配额不足、权限不足或限流。
    #[error("remote returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("failed to create upload session for {path}: {reason}")]
    SessionCreate { path: String, reason: String },

    #[error("chunk at offset {offset} rejected: {reason}")]
    ChunkUpload { offset: u64, reason: String },

    #[error("upload incomplete: {committed} of {total} bytes committed")]
    IncompleteUpload { committed: u64, total: u64 },

    #[error("direct upload to {path} failed: {reason}")]
    DirectUpload { path: String, reason: String },

    #[error("local I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 没有拿到 HTTP 响应：连接失败、超时或响应体中断。
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unexpected response from remote: {0}")]
    UnexpectedResponse(String),
}

impl DriveError {
    pub(crate) fn local_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        DriveError::LocalIo {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// 只有传输错误可以在同一个上传会话上重试，其余错误表示远端已经明确拒绝。
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriveError::Transport(_))
    }

    /// 远端错误被归类为传输相关错误时使用的可读原因。
    pub(crate) fn reason(&self) -> String {
        match self {
            DriveError::Remote { status, message } => format!("HTTP {status}: {message}"),
            DriveError::NotFound(path) => format!("not found: {path}"),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(value: reqwest::Error) -> Self {
        DriveError::Transport(value.to_string())
    }
}
