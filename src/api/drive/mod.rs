mod client;
mod create_dir;
mod delete;
mod download;
mod info;
mod list;
pub mod models;
mod upload;
mod upload_session;

pub use client::{build_blocking_client, GraphRemote};
pub use models::{DriveItem, DriveItemKind, DriveItemType, FileFacet, FolderFacet, Hashes};
