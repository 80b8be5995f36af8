use super::client::{check_status, GraphRemote};
use crate::error::DriveResult;
use tracing::debug;

impl GraphRemote {
    /// 删除指定项；文件夹会连同其内容一起被服务端删除。
    pub(super) fn delete_item(&self, path: &str) -> DriveResult<()> {
        let url = self.item_url(path, None);
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .send()?;
        check_status(response, path)?;
        debug!(path, "item deleted");
        Ok(())
    }
}
