use super::client::{check_status, GraphRemote};
use crate::error::{DriveError, DriveResult};
use std::io::{self, Read, Write};
use tracing::debug;

const COPY_BUFFER_BYTES: usize = 64 * 1024;

impl GraphRemote {
    /// 将 `/content` 的内容流式写入 `sink`。
    /// 服务端会重定向到预签名地址，客户端自动跟随。
    ///
    /// 读取失败视为传输错误；写入失败返回 `LocalIo`，由调用方替换为本地路径。
    pub(super) fn download_content(&self, path: &str, sink: &mut dyn Write) -> DriveResult<u64> {
        let url = self.item_url(path, Some("content"));
        let response = self
            .transfer_client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()?;
        let mut response = check_status(response, path)?;

        let mut buf = vec![0u8; COPY_BUFFER_BYTES];
        let mut copied = 0u64;
        loop {
            let n = match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DriveError::Transport(format!("download of {path} interrupted: {e}"))),
            };
            sink.write_all(&buf[..n])
                .map_err(|e| DriveError::local_io(path, e))?;
            copied += n as u64;
        }
        debug!(path, bytes = copied, "content downloaded");
        Ok(copied)
    }
}
