use super::models::DriveItem;
use crate::config::DriveConfig;
use crate::error::{DriveError, DriveResult};
use crate::path;
use crate::remote::{DriveRemote, RangeAck, SessionHandle};
use reqwest::{
    blocking::{Client, Response},
    redirect::Policy,
    StatusCode,
};
use serde::Deserialize;
use std::io::{Read, Write};
use std::time::Duration;

/// 通过 HTTP 访问 Graph 风格 drive 服务的远端实现，使用 `root:/path:` 路径寻址。
///
/// 内部持有两个客户端：短超时的用于元数据请求，长超时的用于传输文件内容。
pub struct GraphRemote {
    pub(super) client: Client,
    pub(super) transfer_client: Client,
    base: String,
    pub(super) access_token: String,
}

/// 构建一个带有统一超时与重定向策略的阻塞式 HTTP 客户端。
/// 所有请求都应复用该函数，避免重复配置。
pub fn build_blocking_client(timeout: Duration) -> DriveResult<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(Policy::limited(10))
        .build()
        .map_err(|e| DriveError::Config(format!("failed to build HTTP client: {e}")))
}

impl GraphRemote {
    /// 根据配置构建远端；不会发起任何网络请求。
    pub fn from_config(config: &DriveConfig) -> DriveResult<Self> {
        Ok(Self {
            client: build_blocking_client(config.request_timeout())?,
            transfer_client: build_blocking_client(config.transfer_timeout())?,
            base: config.endpoint_base().to_string(),
            access_token: config.access_token.clone(),
        })
    }

    /// `{base}/me/drive/root[:/{path}:][/{action}]`
    pub(super) fn item_url(&self, remote_path: &str, action: Option<&str>) -> String {
        let base = &self.base;
        let mut url = if path::is_root(remote_path) {
            format!("{base}/me/drive/root")
        } else {
            format!("{base}/me/drive/root:/{}:", path::encode(remote_path))
        };
        if let Some(action) = action {
            url.push('/');
            url.push_str(action);
        }
        url
    }
}

/// 成功响应原样返回，其余状态码统一转换为 `DriveError`。
/// 若响应体是 Graph 错误格式，则带上其中的 code 与 message。
pub(super) fn check_status(response: Response, remote_path: &str) -> DriveResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(DriveError::NotFound(remote_path.to_string()));
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(DriveError::Remote {
            status: status.as_u16(),
            message: "access token rejected; please sign in again".to_string(),
        });
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<GraphErrorEnvelope>(&body)
        .ok()
        .map(|envelope| format!("{}: {}", envelope.error.code, envelope.error.message))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    Err(DriveError::Remote {
        status: status.as_u16(),
        message,
    })
}

/// 将响应体解析为 `DriveItem`。
pub(super) fn parse_item(response: Response) -> DriveResult<DriveItem> {
    let dto: super::models::DriveItemDto = response
        .json()
        .map_err(|e| DriveError::UnexpectedResponse(format!("failed to parse drive item: {e}")))?;
    DriveItem::try_from(dto)
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl DriveRemote for GraphRemote {
    fn item(&self, path: &str) -> DriveResult<DriveItem> {
        self.fetch_item(path)
    }

    fn children(&self, path: &str) -> DriveResult<Vec<DriveItem>> {
        self.fetch_children(path)
    }

    fn create_folder(&self, parent: &str, name: &str) -> DriveResult<DriveItem> {
        self.post_folder(parent, name)
    }

    fn delete(&self, path: &str) -> DriveResult<()> {
        self.delete_item(path)
    }

    fn upload_direct(
        &self,
        path: &str,
        content: Box<dyn Read + Send>,
        size: u64,
    ) -> DriveResult<DriveItem> {
        self.put_content(path, content, size)
    }

    fn create_session(&self, path: &str, size: u64) -> DriveResult<SessionHandle> {
        self.create_upload_session(path, size)
    }

    fn put_range(
        &self,
        session: &SessionHandle,
        offset: u64,
        bytes: &[u8],
        total: u64,
    ) -> DriveResult<RangeAck> {
        self.put_session_range(session, offset, bytes, total)
    }

    fn cancel_session(&self, session: &SessionHandle) -> DriveResult<()> {
        self.cancel_upload_session(session)
    }

    fn download(&self, path: &str, sink: &mut dyn Write) -> DriveResult<u64> {
        self.download_content(path, sink)
    }
}
