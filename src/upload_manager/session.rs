use crate::api::drive::models::DriveItem;
use crate::error::{DriveError, DriveResult};
use crate::remote::{DriveRemote, RangeAck, SessionHandle};
use tracing::{debug, warn};

/// 分片上传的生命周期：
/// `Created -> InProgress -> Completed`，或 `Created | InProgress -> Aborted`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Created,
    InProgress,
    Completed,
    Aborted,
}

impl SessionState {
    fn is_open(self) -> bool {
        matches!(self, SessionState::Created | SessionState::InProgress)
    }
}

/// 绑定到目标路径与总大小的远端上传会话。
///
/// 分片必须按顺序发送：每次 `send_chunk` 都从已提交字节的末尾开始。
/// 分片被拒绝后会话直接作废；传输错误则保持会话打开，可以重发同一个分片。
/// 仍处于打开状态的会话在 drop 时会被远端取消。
pub struct UploadSession<'r> {
    remote: &'r dyn DriveRemote,
    handle: SessionHandle,
    path: String,
    total_size: u64,
    committed: u64,
    state: SessionState,
    completed_item: Option<DriveItem>,
}

impl<'r> UploadSession<'r> {
    pub fn open(remote: &'r dyn DriveRemote, path: &str, total_size: u64) -> DriveResult<Self> {
        if total_size == 0 {
            return Err(DriveError::SessionCreate {
                path: path.to_string(),
                reason: "an upload session needs at least one byte".to_string(),
            });
        }
        let handle = remote
            .create_session(path, total_size)
            .map_err(|e| match e {
                DriveError::Transport(_) => e,
                other => DriveError::SessionCreate {
                    path: path.to_string(),
                    reason: other.reason(),
                },
            })?;
        debug!(path, total_size, "upload session created");
        Ok(Self {
            remote,
            handle,
            path: path.to_string(),
            total_size,
            committed: 0,
            state: SessionState::Created,
            completed_item: None,
        })
    }

    /// 发送 `[offset, offset + bytes.len())`，返回新的已提交字节数。
    pub fn send_chunk(&mut self, offset: u64, bytes: &[u8]) -> DriveResult<u64> {
        if !self.state.is_open() {
            return Err(DriveError::ChunkUpload {
                offset,
                reason: format!("session is {:?}", self.state),
            });
        }
        let end = offset.checked_add(bytes.len() as u64);
        let end = match (end, self.precondition_violation(offset, end)) {
            (Some(end), None) => end,
            (_, reason) => {
                self.abort();
                return Err(DriveError::ChunkUpload {
                    offset,
                    reason: reason.unwrap_or_default(),
                });
            }
        };

        self.state = SessionState::InProgress;
        debug!(path = %self.path, offset, len = bytes.len(), "sending chunk");

        match self
            .remote
            .put_range(&self.handle, offset, bytes, self.total_size)
        {
            Ok(RangeAck::Accepted { next_expected }) if next_expected == end => {
                self.committed = end;
                Ok(self.committed)
            }
            Ok(RangeAck::Accepted { next_expected }) => {
                self.abort();
                Err(DriveError::ChunkUpload {
                    offset,
                    reason: format!("remote expects offset {next_expected}, sent up to {end}"),
                })
            }
            Ok(RangeAck::Completed(item)) if end == self.total_size => {
                self.committed = end;
                self.completed_item = Some(item);
                Ok(self.committed)
            }
            Ok(RangeAck::Completed(_)) => {
                self.abort();
                Err(DriveError::ChunkUpload {
                    offset,
                    reason: format!(
                        "remote finalized after {end} of {} bytes",
                        self.total_size
                    ),
                })
            }
            Err(e) if e.is_retryable() => Err(e),
            Err(e) => {
                self.abort();
                Err(DriveError::ChunkUpload {
                    offset,
                    reason: e.reason(),
                })
            }
        }
    }

    fn precondition_violation(&self, offset: u64, end: Option<u64>) -> Option<String> {
        let Some(end) = end else {
            return Some(format!("chunk at offset {offset} overflows the byte range"));
        };
        if offset != self.committed {
            Some(format!(
                "out of order: expected offset {}, got {offset}",
                self.committed
            ))
        } else if end == offset {
            Some("empty chunk".to_string())
        } else if end > self.total_size {
            Some(format!(
                "chunk ends at {end}, past total size {}",
                self.total_size
            ))
        } else {
            None
        }
    }

    /// 全部字节提交后返回生成的文件；重复调用返回同一个结果。
    pub fn complete(&mut self) -> DriveResult<DriveItem> {
        if self.state == SessionState::Completed {
            if let Some(item) = &self.completed_item {
                return Ok(item.clone());
            }
        }
        if self.state == SessionState::Aborted || self.committed != self.total_size {
            return Err(DriveError::IncompleteUpload {
                committed: self.committed,
                total: self.total_size,
            });
        }
        let item = match self.completed_item.take() {
            Some(item) => item,
            // 最后一段被接收但响应中没有条目信息。
            None => self.remote.item(&self.path)?,
        };
        self.completed_item = Some(item.clone());
        self.state = SessionState::Completed;
        debug!(path = %self.path, size = self.total_size, "upload session completed");
        Ok(item)
    }

    /// 尽力取消远端会话，任意状态下调用任意次都是安全的。
    pub fn abort(&mut self) {
        if !self.state.is_open() {
            return;
        }
        self.state = SessionState::Aborted;
        warn!(path = %self.path, committed = self.committed, "aborting upload session");
        if let Err(e) = self.remote.cancel_session(&self.handle) {
            warn!(path = %self.path, error = %e, "failed to cancel upload session");
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for UploadSession<'_> {
    fn drop(&mut self) {
        // 全部提交的会话在远端已经完成。
        if self.state.is_open() && self.committed < self.total_size {
            self.abort();
        }
    }
}
