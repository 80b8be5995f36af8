//! 层级式 drive 服务的客户端 SDK。
//!
//! 提供文件夹创建、列表、元数据查询、删除以及文件传输；
//! 超过可配置阈值的文件改用上传会话分片上传。

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod hash;
pub mod path;
pub mod remote;
pub mod upload_manager;

pub use api::drive::{
    DriveItem, DriveItemKind, DriveItemType, FileFacet, FolderFacet, GraphRemote, Hashes,
};
pub use client::{DownloadReport, DriveClient};
pub use config::{ChunkRetryPolicy, DriveConfig};
pub use error::{DriveError, DriveResult};
pub use hash::{FileDigests, HashAlgorithm};
pub use remote::{DriveRemote, RangeAck, SessionHandle};
pub use upload_manager::{SessionState, TransferPlan, TransferStrategy, UploadSession};
