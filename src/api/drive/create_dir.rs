use super::client::{check_status, parse_item, GraphRemote};
use super::models::DriveItem;
use crate::error::DriveResult;
use serde::Serialize;
use tracing::debug;

impl GraphRemote {
    /// 在 `parent` 下创建名为 `name` 的文件夹。
    /// 同名项已存在时由服务端返回冲突错误，不视为成功。
    pub(super) fn post_folder(&self, parent: &str, name: &str) -> DriveResult<DriveItem> {
        let url = self.item_url(parent, Some("children"));
        let body = CreateFolderRequest {
            name,
            folder: EmptyFacet {},
            conflict_behavior: "fail",
        };
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .json(&body)
            .send()?;
        let item = parse_item(check_status(response, parent)?)?;
        debug!(parent, name, "folder created");
        Ok(item)
    }
}

#[derive(Serialize)]
struct CreateFolderRequest<'a> {
    name: &'a str,
    folder: EmptyFacet,
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    conflict_behavior: &'a str,
}

#[derive(Serialize)]
struct EmptyFacet {}
