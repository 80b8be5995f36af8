//! 传输引擎依赖的 drive 服务操作集合。
//!
//! [`crate::api::drive::GraphRemote`] 通过 HTTP 访问 Graph 风格的 drive；
//! 单测中可以替换为内存实现。实现方只返回 `NotFound`、`Remote` 或
//! `Transport`，具体归类到哪种传输错误由上层决定。

use crate::api::drive::models::DriveItem;
use crate::error::DriveResult;
use std::io::{Read, Write};

/// 进行中的分片上传在远端的句柄。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHandle {
    pub upload_url: String,
    pub expires_at: Option<String>,
}

/// 远端对一次分片上传的应答。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RangeAck {
    /// 还需要更多数据，下一段从 `next_expected` 开始。
    Accepted { next_expected: u64 },
    /// 最后一段已被接收，文件已经生成。
    Completed(DriveItem),
}

pub trait DriveRemote: Send + Sync {
    fn item(&self, path: &str) -> DriveResult<DriveItem>;

    /// 直接子项，保持服务端返回的顺序。
    fn children(&self, path: &str) -> DriveResult<Vec<DriveItem>>;

    fn create_folder(&self, parent: &str, name: &str) -> DriveResult<DriveItem>;

    fn delete(&self, path: &str) -> DriveResult<()>;

    /// 单次请求上传，从 `content` 读取 `size` 字节。
    fn upload_direct(
        &self,
        path: &str,
        content: Box<dyn Read + Send>,
        size: u64,
    ) -> DriveResult<DriveItem>;

    fn create_session(&self, path: &str, size: u64) -> DriveResult<SessionHandle>;

    /// 发送总长 `total` 的上传中 `[offset, offset + bytes.len())` 这一段。
    fn put_range(
        &self,
        session: &SessionHandle,
        offset: u64,
        bytes: &[u8],
        total: u64,
    ) -> DriveResult<RangeAck>;

    fn cancel_session(&self, session: &SessionHandle) -> DriveResult<()>;

    /// 将文件内容流式写入 `sink`，返回写入的字节数。
    fn download(&self, path: &str, sink: &mut dyn Write) -> DriveResult<u64>;
}
