use super::client::{check_status, parse_item, GraphRemote};
use crate::error::{DriveError, DriveResult};
use crate::remote::{RangeAck, SessionHandle};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

impl GraphRemote {
    /// 为大文件创建上传会话，同名文件会被覆盖。
    /// 返回的 `uploadUrl` 会先校验格式，避免后续分片请求才暴露问题。
    pub(super) fn create_upload_session(&self, path: &str, size: u64) -> DriveResult<SessionHandle> {
        let url = self.item_url(path, Some("createUploadSession"));
        let body = CreateSessionRequest {
            item: SessionItemOptions {
                conflict_behavior: "replace",
            },
        };
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .json(&body)
            .send()?;
        let payload: UploadSessionDto = check_status(response, path)?
            .json()
            .map_err(|e| DriveError::UnexpectedResponse(format!("failed to parse upload session: {e}")))?;

        Url::parse(&payload.upload_url).map_err(|e| {
            DriveError::UnexpectedResponse(format!("invalid upload url {:?}: {e}", payload.upload_url))
        })?;
        debug!(path, size, expires = ?payload.expiration_date_time, "upload session opened");
        Ok(SessionHandle {
            upload_url: payload.upload_url,
            expires_at: payload.expiration_date_time,
        })
    }

    /// 上传一个分片。
    /// `uploadUrl` 已经预先授权，附带 bearer token 反而会被服务端拒绝。
    pub(super) fn put_session_range(
        &self,
        session: &SessionHandle,
        offset: u64,
        bytes: &[u8],
        total: u64,
    ) -> DriveResult<RangeAck> {
        let end = offset
            .checked_add(bytes.len() as u64)
            .ok_or_else(|| DriveError::ChunkUpload {
                offset,
                reason: "chunk range overflows".to_string(),
            })?;
        let response = self
            .transfer_client
            .put(&session.upload_url)
            .header("Content-Range", content_range(offset, end, total))
            .body(bytes.to_vec())
            .send()?;

        let status = response.status();
        let response = check_status(response, &session.upload_url)?;
        if status == StatusCode::ACCEPTED {
            let payload: UploadSessionDto = response.json().map_err(|e| {
                DriveError::UnexpectedResponse(format!("failed to parse session status: {e}"))
            })?;
            let next_expected = payload
                .next_expected_ranges
                .first()
                .and_then(|range| parse_range_start(range))
                .unwrap_or(end);
            Ok(RangeAck::Accepted { next_expected })
        } else {
            Ok(RangeAck::Completed(parse_item(response)?))
        }
    }

    /// 取消上传会话，服务端会丢弃已提交的分片。
    pub(super) fn cancel_upload_session(&self, session: &SessionHandle) -> DriveResult<()> {
        let response = self.client.delete(&session.upload_url).send()?;
        check_status(response, &session.upload_url)?;
        Ok(())
    }
}

/// 生成 `bytes {first}-{last}/{total}`，其中 last 为闭区间。
fn content_range(offset: u64, end: u64, total: u64) -> String {
    format!("bytes {offset}-{}/{total}", end.saturating_sub(1))
}

/// 解析 `nextExpectedRanges` 中形如 `"26-"` 或 `"26-1023"` 的起始偏移。
fn parse_range_start(range: &str) -> Option<u64> {
    range.split('-').next()?.trim().parse().ok()
}

#[derive(Serialize)]
struct CreateSessionRequest {
    item: SessionItemOptions,
}

#[derive(Serialize)]
struct SessionItemOptions {
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    conflict_behavior: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadSessionDto {
    #[serde(default)]
    upload_url: String,
    expiration_date_time: Option<String>,
    #[serde(default)]
    next_expected_ranges: Vec<String>,
}
