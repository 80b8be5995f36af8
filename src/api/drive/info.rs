use super::client::{check_status, parse_item, GraphRemote};
use super::models::DriveItem;
use crate::error::DriveResult;
use tracing::debug;

impl GraphRemote {
    /// 只获取元数据，不传输文件内容。
    pub(super) fn fetch_item(&self, path: &str) -> DriveResult<DriveItem> {
        let url = self.item_url(path, None);
        debug!(path, "fetching item metadata");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .send()?;
        parse_item(check_status(response, path)?)
    }
}
