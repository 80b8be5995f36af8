#![allow(dead_code)]

use rand::RngCore;
use skydrivex_sdk::hash::{digest_bytes, HashAlgorithm};
use skydrivex_sdk::path;
use skydrivex_sdk::{
    DriveConfig, DriveError, DriveItem, DriveItemKind, DriveRemote, DriveResult, FileFacet,
    FolderFacet, Hashes, RangeAck, SessionHandle,
};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const SESSION_LIMIT: u64 = 8 * 1024;
pub const CHUNK_SIZE: u64 = 4 * 1024;

pub fn test_config() -> DriveConfig {
    let mut config = DriveConfig::new("http://fake.drive/v1.0", "test-token");
    config.upload_session_file_size_limit = SESSION_LIMIT;
    config.upload_chunk_size = CHUNK_SIZE;
    config.chunk_retry.backoff_millis = 1;
    config
}

pub fn unique_dir() -> String {
    format!("/test-{}", uuid::Uuid::new_v4())
}

/// 写入 `size_kb` KiB 的随机字节。
pub fn create_random_file(dir: &Path, name: &str, size_kb: usize) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    let mut block = [0u8; 1024];
    for _ in 0..size_kb {
        rand::thread_rng().fill_bytes(&mut block);
        file.write_all(&block).unwrap();
    }
    path
}

enum NodeKind {
    Folder { children: Vec<String> },
    File { content: Vec<u8> },
}

struct Node {
    id: String,
    kind: NodeKind,
}

struct Pending {
    path: String,
    total: u64,
    received: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct CallLog {
    pub sessions_created: u32,
    pub sessions_cancelled: u32,
    pub direct_uploads: u32,
    pub ranges: Vec<(u64, usize)>,
}

#[derive(Default)]
struct Faults {
    transport_failures_at: HashMap<u64, u32>,
    reject_range_at: Option<u64>,
    skew_ack_at: Option<u64>,
}

struct State {
    nodes: HashMap<String, Node>,
    sessions: HashMap<String, Pending>,
    next_id: u64,
    log: CallLog,
    faults: Faults,
}

/// 模拟服务端可观察行为的内存 drive：
/// 列表中文件排在文件夹之前并按创建顺序排列，MIME 由扩展名推断，
/// 摘要为大写，上传会话的分片必须严格连续。
pub struct FakeDrive {
    state: Mutex<State>,
}

impl FakeDrive {
    pub fn new() -> Arc<Self> {
        let mut nodes = HashMap::new();
        nodes.insert(
            "/".to_string(),
            Node {
                id: "ROOT".to_string(),
                kind: NodeKind::Folder {
                    children: Vec::new(),
                },
            },
        );
        Arc::new(Self {
            state: Mutex::new(State {
                nodes,
                sessions: HashMap::new(),
                next_id: 1,
                log: CallLog::default(),
                faults: Faults::default(),
            }),
        })
    }

    pub fn log(&self) -> CallLog {
        self.state.lock().unwrap().log.clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    /// 接下来 `times` 次从 `offset` 开始的分片在到达服务端之前失败。
    pub fn fail_transport_at(&self, offset: u64, times: u32) {
        self.state
            .lock()
            .unwrap()
            .faults
            .transport_failures_at
            .insert(offset, times);
    }

    pub fn reject_range_at(&self, offset: u64) {
        self.state.lock().unwrap().faults.reject_range_at = Some(offset);
    }

    /// 对 `offset` 处的分片返回错误的下一个偏移。
    pub fn skew_ack_at(&self, offset: u64) {
        self.state.lock().unwrap().faults.skew_ack_at = Some(offset);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state.lock().unwrap().nodes.contains_key(path)
    }
}

fn mime_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "txt" => "text/plain; charset=utf-8",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "json" => "application/json",
        _ => "application/octet-stream",
    }
}

fn remote_error(status: u16, message: &str) -> DriveError {
    DriveError::Remote {
        status,
        message: message.to_string(),
    }
}

impl State {
    fn describe(&self, path: &str) -> DriveResult<DriveItem> {
        let node = self
            .nodes
            .get(path)
            .ok_or_else(|| DriveError::NotFound(path.to_string()))?;
        let name = path::leaf_name(path).to_string();
        let (size_bytes, kind) = match &node.kind {
            NodeKind::Folder { children } => (
                0,
                DriveItemKind::Folder(FolderFacet {
                    child_count: children.len() as u64,
                }),
            ),
            NodeKind::File { content } => (
                content.len() as u64,
                DriveItemKind::File(FileFacet {
                    mime_type: mime_for(&name).to_string(),
                    hashes: Hashes {
                        sha1: Some(digest_bytes(content, HashAlgorithm::Sha1).to_uppercase()),
                        sha256: Some(digest_bytes(content, HashAlgorithm::Sha256).to_uppercase()),
                    },
                }),
            ),
        };
        Ok(DriveItem {
            id: node.id.clone(),
            name,
            size_bytes,
            kind,
        })
    }

    fn require_folder(&self, path: &str) -> DriveResult<()> {
        match self.nodes.get(path) {
            Some(Node {
                kind: NodeKind::Folder { .. },
                ..
            }) => Ok(()),
            Some(_) => Err(remote_error(400, "parent is not a folder")),
            None => Err(DriveError::NotFound(path.to_string())),
        }
    }

    fn fresh_id(&mut self) -> String {
        let id = format!("ITEM{:04}", self.next_id);
        self.next_id += 1;
        id
    }

    fn put_file(&mut self, path: &str, content: Vec<u8>) -> DriveResult<DriveItem> {
        let parent = path::parent(path);
        self.require_folder(&parent)?;
        if let Some(existing) = self.nodes.get_mut(path) {
            match &mut existing.kind {
                NodeKind::File { content: old } => *old = content,
                NodeKind::Folder { .. } => return Err(remote_error(409, "nameAlreadyExists")),
            }
        } else {
            let id = self.fresh_id();
            self.nodes.insert(
                path.to_string(),
                Node {
                    id,
                    kind: NodeKind::File { content },
                },
            );
            self.attach(&parent, path);
        }
        self.describe(path)
    }

    fn attach(&mut self, parent: &str, path: &str) {
        let name = path::leaf_name(path).to_string();
        if let Some(Node {
            kind: NodeKind::Folder { children },
            ..
        }) = self.nodes.get_mut(parent)
        {
            children.push(name);
        }
    }

    fn ordered_children(&self, path: &str) -> DriveResult<Vec<String>> {
        match self.nodes.get(path) {
            Some(Node {
                kind: NodeKind::Folder { children },
                ..
            }) => {
                let full = |name: &String| path::join(path, name).unwrap();
                let (mut files, folders): (Vec<String>, Vec<String>) =
                    children.iter().map(full).partition(|child| {
                        matches!(
                            self.nodes.get(child).map(|n| &n.kind),
                            Some(NodeKind::File { .. })
                        )
                    });
                files.extend(folders);
                Ok(files)
            }
            Some(_) => Ok(Vec::new()),
            None => Err(DriveError::NotFound(path.to_string())),
        }
    }

    fn remove_tree(&mut self, path: &str) {
        if let Some(node) = self.nodes.remove(path) {
            if let NodeKind::Folder { children } = node.kind {
                for child in children {
                    let child_path = path::join(path, &child).unwrap();
                    self.remove_tree(&child_path);
                }
            }
        }
    }
}

impl DriveRemote for FakeDrive {
    fn item(&self, path: &str) -> DriveResult<DriveItem> {
        self.state.lock().unwrap().describe(path)
    }

    fn children(&self, path: &str) -> DriveResult<Vec<DriveItem>> {
        let state = self.state.lock().unwrap();
        let children = state.ordered_children(path)?;
        let items = children
            .iter()
            .map(|child| state.describe(child))
            .collect::<DriveResult<Vec<_>>>();
        items
    }

    fn create_folder(&self, parent: &str, name: &str) -> DriveResult<DriveItem> {
        let mut state = self.state.lock().unwrap();
        state.require_folder(parent)?;
        let path = path::join(parent, name)?;
        if state.nodes.contains_key(&path) {
            return Err(remote_error(409, "nameAlreadyExists"));
        }
        let id = state.fresh_id();
        state.nodes.insert(
            path.clone(),
            Node {
                id,
                kind: NodeKind::Folder {
                    children: Vec::new(),
                },
            },
        );
        state.attach(parent, &path);
        state.describe(&path)
    }

    fn delete(&self, path: &str) -> DriveResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.nodes.contains_key(path) {
            return Err(DriveError::NotFound(path.to_string()));
        }
        state.remove_tree(path);
        let name = path::leaf_name(path).to_string();
        if let Some(Node {
            kind: NodeKind::Folder { children },
            ..
        }) = state.nodes.get_mut(&path::parent(path))
        {
            children.retain(|child| *child != name);
        }
        Ok(())
    }

    fn upload_direct(
        &self,
        path: &str,
        mut content: Box<dyn Read + Send>,
        size: u64,
    ) -> DriveResult<DriveItem> {
        let mut bytes = Vec::new();
        content
            .read_to_end(&mut bytes)
            .map_err(|e| DriveError::Transport(e.to_string()))?;
        let mut state = self.state.lock().unwrap();
        state.log.direct_uploads += 1;
        if bytes.len() as u64 != size {
            return Err(remote_error(400, "declared size does not match body"));
        }
        state.put_file(path, bytes)
    }

    fn create_session(&self, path: &str, size: u64) -> DriveResult<SessionHandle> {
        let mut state = self.state.lock().unwrap();
        state.require_folder(&path::parent(path))?;
        state.log.sessions_created += 1;
        let upload_url = format!("https://fake.upload/session-{}", state.log.sessions_created);
        state.sessions.insert(
            upload_url.clone(),
            Pending {
                path: path.to_string(),
                total: size,
                received: Vec::new(),
            },
        );
        Ok(SessionHandle {
            upload_url,
            expires_at: None,
        })
    }

    fn put_range(
        &self,
        session: &SessionHandle,
        offset: u64,
        bytes: &[u8],
        total: u64,
    ) -> DriveResult<RangeAck> {
        let mut state = self.state.lock().unwrap();
        state.log.ranges.push((offset, bytes.len()));

        if let Some(left) = state.faults.transport_failures_at.get_mut(&offset) {
            if *left > 0 {
                *left -= 1;
                return Err(DriveError::Transport("connection reset by peer".to_string()));
            }
        }
        if state.faults.reject_range_at == Some(offset) {
            return Err(remote_error(416, "invalidRange"));
        }
        let skew = state.faults.skew_ack_at == Some(offset);

        let pending = state
            .sessions
            .get_mut(&session.upload_url)
            .ok_or_else(|| DriveError::NotFound(session.upload_url.clone()))?;
        if pending.total != total {
            return Err(remote_error(400, "total size changed"));
        }
        if offset != pending.received.len() as u64 {
            return Err(remote_error(416, "invalidRange: overlapping or out of order"));
        }
        pending.received.extend_from_slice(bytes);
        let received = pending.received.len() as u64;
        if skew {
            return Ok(RangeAck::Accepted {
                next_expected: received + 1,
            });
        }
        if received < pending.total {
            return Ok(RangeAck::Accepted {
                next_expected: received,
            });
        }

        let finished = state
            .sessions
            .remove(&session.upload_url)
            .ok_or_else(|| DriveError::NotFound(session.upload_url.clone()))?;
        let item = state.put_file(&finished.path, finished.received)?;
        Ok(RangeAck::Completed(item))
    }

    fn cancel_session(&self, session: &SessionHandle) -> DriveResult<()> {
        let mut state = self.state.lock().unwrap();
        state.log.sessions_cancelled += 1;
        state
            .sessions
            .remove(&session.upload_url)
            .map(|_| ())
            .ok_or_else(|| DriveError::NotFound(session.upload_url.clone()))
    }

    fn download(&self, path: &str, sink: &mut dyn Write) -> DriveResult<u64> {
        let content = {
            let state = self.state.lock().unwrap();
            match state.nodes.get(path).map(|n| &n.kind) {
                Some(NodeKind::File { content }) => content.clone(),
                Some(NodeKind::Folder { .. }) => {
                    return Err(remote_error(400, "folders have no content"))
                }
                None => return Err(DriveError::NotFound(path.to_string())),
            }
        };
        sink.write_all(&content)
            .map_err(|e| DriveError::LocalIo {
                path: PathBuf::from(path),
                source: e,
            })?;
        Ok(content.len() as u64)
    }
}
