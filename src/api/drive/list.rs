use super::client::{check_status, GraphRemote};
use super::models::{DriveItem, DriveItemDto};
use crate::error::{DriveError, DriveResult};
use serde::Deserialize;
use tracing::debug;

/// 只请求 `DriveItem` 需要的字段，减少网络传输。
const CHILDREN_QUERY: &str = "?$select=id,name,size,folder,file";

impl GraphRemote {
    /// 拉取目录下的全部子项。
    /// 会沿着 `@odata.nextLink` 一直翻页，并保持服务端返回的顺序。
    pub(super) fn fetch_children(&self, path: &str) -> DriveResult<Vec<DriveItem>> {
        let mut request_url = format!("{}{CHILDREN_QUERY}", self.item_url(path, Some("children")));
        let mut items = Vec::new();
        let mut pages = 0u32;
        loop {
            let response = self
                .client
                .get(&request_url)
                .bearer_auth(&self.access_token)
                .header("Accept", "application/json")
                .send()?;
            let payload: DriveChildrenResponse = check_status(response, path)?
                .json()
                .map_err(|e| DriveError::UnexpectedResponse(format!("failed to parse listing: {e}")))?;
            pages += 1;
            for dto in payload.value {
                items.push(DriveItem::try_from(dto)?);
            }
            match payload.next_link {
                Some(link) => request_url = link,
                None => break,
            }
        }
        debug!(path, pages, count = items.len(), "listed children");
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct DriveChildrenResponse {
    value: Vec<DriveItemDto>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}
