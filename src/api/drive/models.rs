use crate::error::DriveError;
use serde::Deserialize;

/// 远端文件或文件夹的一次快照。
/// 不做任何缓存，每次 `info`/`list` 都会重新构建。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriveItem {
    pub id: String,
    /// 末级名称，不包含分隔符。
    pub name: String,
    pub size_bytes: u64,
    pub kind: DriveItemKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriveItemKind {
    File(FileFacet),
    Folder(FolderFacet),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriveItemType {
    File,
    Folder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileFacet {
    pub mime_type: String,
    pub hashes: Hashes,
}

/// 服务端返回的大写十六进制摘要。
/// 部分类型的 drive 只会返回其中一种。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hashes {
    pub sha1: Option<String>,
    pub sha256: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FolderFacet {
    pub child_count: u64,
}

impl DriveItem {
    pub fn item_type(&self) -> DriveItemType {
        match self.kind {
            DriveItemKind::File(_) => DriveItemType::File,
            DriveItemKind::Folder(_) => DriveItemType::Folder,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.item_type() == DriveItemType::Folder
    }

    pub fn file(&self) -> Option<&FileFacet> {
        match &self.kind {
            DriveItemKind::File(facet) => Some(facet),
            DriveItemKind::Folder(_) => None,
        }
    }

    pub fn folder(&self) -> Option<&FolderFacet> {
        match &self.kind {
            DriveItemKind::Folder(facet) => Some(facet),
            DriveItemKind::File(_) => None,
        }
    }
}

/// Graph 返回的原始条目结构。
/// 元数据、列表、上传以及会话完成的响应都复用该结构。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriveItemDto {
    id: String,
    name: Option<String>,
    size: Option<u64>,
    folder: Option<DriveFolderFacetDto>,
    file: Option<DriveFileFacetDto>,
}

#[derive(Debug, Deserialize)]
struct DriveFolderFacetDto {
    #[serde(rename = "childCount")]
    child_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DriveFileFacetDto {
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    hashes: Option<HashesDto>,
}

#[derive(Debug, Deserialize)]
struct HashesDto {
    #[serde(rename = "sha1Hash")]
    sha1_hash: Option<String>,
    #[serde(rename = "sha256Hash")]
    sha256_hash: Option<String>,
}

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

impl TryFrom<DriveItemDto> for DriveItem {
    type Error = DriveError;

    /// 缺少名称或既不是文件也不是文件夹的条目视为异常响应。
    fn try_from(value: DriveItemDto) -> Result<Self, Self::Error> {
        let name = value
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DriveError::UnexpectedResponse(format!("item {} has no name", value.id)))?;

        let kind = if let Some(folder) = value.folder {
            DriveItemKind::Folder(FolderFacet {
                child_count: folder.child_count.unwrap_or(0),
            })
        } else if let Some(file) = value.file {
            let hashes = file.hashes.map(Hashes::from).unwrap_or_default();
            DriveItemKind::File(FileFacet {
                mime_type: file
                    .mime_type
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
                hashes,
            })
        } else {
            return Err(DriveError::UnexpectedResponse(format!(
                "item {name} is neither a file nor a folder"
            )));
        };

        Ok(DriveItem {
            id: value.id,
            name,
            size_bytes: value.size.unwrap_or(0),
            kind,
        })
    }
}

impl From<HashesDto> for Hashes {
    fn from(value: HashesDto) -> Self {
        Hashes {
            sha1: value.sha1_hash.map(|h| h.to_ascii_uppercase()),
            sha256: value.sha256_hash.map(|h| h.to_ascii_uppercase()),
        }
    }
}
