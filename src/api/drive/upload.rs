use super::client::{check_status, parse_item, GraphRemote};
use super::models::DriveItem;
use crate::error::DriveResult;
use reqwest::blocking::Body;
use std::io::Read;

impl GraphRemote {
    /// 单次请求完成的小文件上传。
    /// 请求体直接从 `content` 流式读取，不会整体读入内存。
    pub(super) fn put_content(
        &self,
        path: &str,
        content: Box<dyn Read + Send>,
        size: u64,
    ) -> DriveResult<DriveItem> {
        let url = format!(
            "{}?@microsoft.graph.conflictBehavior=replace",
            self.item_url(path, Some("content"))
        );
        let response = self
            .transfer_client
            .put(url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/octet-stream")
            .body(Body::sized(content, size))
            .send()?;
        parse_item(check_status(response, path)?)
    }
}
