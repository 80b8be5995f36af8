use crate::api::drive::{models::DriveItem, GraphRemote};
use crate::config::DriveConfig;
use crate::error::{DriveError, DriveResult};
use crate::hash::FileDigests;
use crate::path;
use crate::remote::DriveRemote;
use crate::upload_manager::{TransferPlan, TransferStrategy, UploadSession};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// SDK 的入口。
/// clone 开销很小，各副本共享同一个远端，可在多个线程中分别执行独立的传输。
#[derive(Clone)]
pub struct DriveClient {
    remote: Arc<dyn DriveRemote>,
    config: DriveConfig,
}

/// 下载结果：落盘位置与写入字节数。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadReport {
    pub local_path: PathBuf,
    pub bytes_written: u64,
}

impl DriveClient {
    /// 构建通过 HTTP 访问 `config.endpoint` 的客户端。
    pub fn new(config: DriveConfig) -> DriveResult<Self> {
        config.validate()?;
        let remote = GraphRemote::from_config(&config)?;
        Ok(Self::with_remote(config, Arc::new(remote)))
    }

    /// 根据配置文件与 `SKYDRIVEX_*` 环境变量构建客户端。
    pub fn from_default_config() -> DriveResult<Self> {
        Self::new(DriveConfig::load()?)
    }

    pub fn with_remote(config: DriveConfig, remote: Arc<dyn DriveRemote>) -> Self {
        Self { remote, config }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn plan_for(&self, size_bytes: u64) -> TransferPlan {
        TransferPlan::new(
            size_bytes,
            self.config.upload_session_file_size_limit,
            self.config.upload_chunk_size,
        )
    }

    /// 在 `remote_path` 创建文件夹；同名项已存在时原样返回远端的错误。
    pub fn create_dir(&self, remote_path: &str) -> DriveResult<DriveItem> {
        let remote_path = path::normalize(remote_path);
        let name = path::leaf_name(&remote_path);
        if name.is_empty() {
            return Err(DriveError::InvalidPath("cannot create the drive root".to_string()));
        }
        self.remote
            .create_folder(&path::parent(&remote_path), name)
    }

    /// 将 `local_path` 上传到远端目录 `remote_dir`，保留本地文件名。
    pub fn upload(&self, local_path: &Path, remote_dir: &str) -> DriveResult<DriveItem> {
        let file_name = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                DriveError::InvalidPath(format!("{} has no usable file name", local_path.display()))
            })?;
        let remote_path = path::join(remote_dir, file_name)?;

        let file = File::open(local_path).map_err(|e| DriveError::local_io(local_path, e))?;
        let size = file
            .metadata()
            .map_err(|e| DriveError::local_io(local_path, e))?
            .len();
        let plan = self.plan_for(size);
        debug!(path = %remote_path, size, strategy = ?plan.strategy, "starting upload");

        let item = match plan.strategy {
            TransferStrategy::Direct => self.upload_direct(file, &remote_path, size)?,
            TransferStrategy::Chunked => {
                self.upload_chunked(file, local_path, &remote_path, &plan)?
            }
        };
        info!(path = %remote_path, size, strategy = ?plan.strategy, "upload finished");
        Ok(item)
    }

    fn upload_direct(&self, file: File, remote_path: &str, size: u64) -> DriveResult<DriveItem> {
        self.remote
            .upload_direct(remote_path, Box::new(file), size)
            .map_err(|e| match e {
                DriveError::Transport(_) => e,
                other => DriveError::DirectUpload {
                    path: remote_path.to_string(),
                    reason: other.reason(),
                },
            })
    }

    fn upload_chunked(
        &self,
        mut file: File,
        local_path: &Path,
        remote_path: &str,
        plan: &TransferPlan,
    ) -> DriveResult<DriveItem> {
        // 缓冲区不会超过文件本身的大小。
        let buf_len = plan.chunk_size.min(plan.total_size);
        let buf_len = usize::try_from(buf_len)
            .map_err(|_| DriveError::Config(format!("chunk size {} too large", plan.chunk_size)))?;
        let mut session = UploadSession::open(&*self.remote, remote_path, plan.total_size)?;
        let mut buf = vec![0u8; buf_len];

        for range in plan.chunks() {
            let chunk = &mut buf[..range.len as usize];
            if let Err(e) = file.read_exact(chunk) {
                session.abort();
                return Err(DriveError::local_io(local_path, e));
            }
            self.send_chunk_with_retry(&mut session, range.offset, chunk)?;
        }
        session.complete()
    }

    /// 按配置的重试策略发送一个分片。
    /// 只重试传输错误，并且始终针对同一个会话和偏移。
    fn send_chunk_with_retry(
        &self,
        session: &mut UploadSession<'_>,
        offset: u64,
        bytes: &[u8],
    ) -> DriveResult<u64> {
        let policy = &self.config.chunk_retry;
        let mut attempt = 0u32;
        loop {
            match session.send_chunk(offset, bytes) {
                Ok(committed) => return Ok(committed),
                Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                    attempt += 1;
                    warn!(path = session.path(), offset, attempt, error = %e, "retrying chunk");
                    thread::sleep(policy.delay(attempt));
                }
                Err(e) => {
                    session.abort();
                    return Err(e);
                }
            }
        }
    }

    /// 将远端文件以原名下载到 `local_dir`，同名本地文件会被覆盖。
    /// 内容先写入 `.{name}.part`，成功后再重命名；失败时清理该临时文件。
    pub fn download(&self, remote_path: &str, local_dir: &Path) -> DriveResult<DownloadReport> {
        let remote_path = path::normalize(remote_path);
        let leaf = path::leaf_name(&remote_path);
        if leaf.is_empty() {
            return Err(DriveError::InvalidPath("cannot download the drive root".to_string()));
        }
        let file_name = sanitize_file_name(leaf);

        fs::create_dir_all(local_dir).map_err(|e| DriveError::local_io(local_dir, e))?;
        let destination = local_dir.join(&file_name);
        let partial = local_dir.join(format!(".{file_name}.part"));

        let result = self
            .download_to(&remote_path, &partial)
            .and_then(|bytes| replace_file(&partial, &destination).map(|()| bytes));
        let bytes_written = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial) {
                    debug!(path = %partial.display(), error = %cleanup, "no partial file to remove");
                }
                return Err(e);
            }
        };

        info!(path = %remote_path, local = %destination.display(), bytes = bytes_written, "download finished");
        Ok(DownloadReport {
            local_path: destination,
            bytes_written,
        })
    }

    fn download_to(&self, remote_path: &str, partial: &Path) -> DriveResult<u64> {
        let file = File::create(partial).map_err(|e| DriveError::local_io(partial, e))?;
        let mut writer = BufWriter::new(file);
        let bytes = self
            .remote
            .download(remote_path, &mut writer)
            .map_err(|e| match e {
                DriveError::LocalIo { source, .. } => DriveError::local_io(partial, source),
                other => other,
            })?;
        writer.flush().map_err(|e| DriveError::local_io(partial, e))?;
        Ok(bytes)
    }

    pub fn info(&self, remote_path: &str) -> DriveResult<DriveItem> {
        self.remote.item(&path::normalize(remote_path))
    }

    /// 直接子项，保持远端返回的顺序。
    pub fn list(&self, remote_path: &str) -> DriveResult<Vec<DriveItem>> {
        self.remote.children(&path::normalize(remote_path))
    }

    pub fn delete(&self, remote_path: &str) -> DriveResult<()> {
        let remote_path = path::normalize(remote_path);
        if path::is_root(&remote_path) {
            return Err(DriveError::InvalidPath("cannot delete the drive root".to_string()));
        }
        self.remote.delete(&remote_path)
    }

    /// 重新读取 `local_path`，校验大小以及 `item` 返回的每一种摘要。
    pub fn verify(&self, local_path: &Path, item: &DriveItem) -> DriveResult<bool> {
        let Some(facet) = item.file() else {
            return Ok(false);
        };
        let digests = FileDigests::compute(local_path)?;
        Ok(digests.size_bytes == item.size_bytes && digests.matches(facet))
    }
}

fn replace_file(from: &Path, to: &Path) -> DriveResult<()> {
    #[cfg(windows)]
    {
        if to.exists() {
            fs::remove_file(to).map_err(|e| DriveError::local_io(to, e))?;
        }
    }
    fs::rename(from, to).map_err(|e| DriveError::local_io(to, e))
}

/// 将常见本地文件系统不允许的字符替换为 `_`。
fn sanitize_file_name(raw: &str) -> String {
    const FALLBACK: &str = "download.bin";
    let sanitized: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect();

    let name = sanitized.trim();
    if name.is_empty() || name == "." || name == ".." {
        FALLBACK.to_string()
    } else {
        name.to_string()
    }
}
