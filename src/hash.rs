//! 流式计算内容摘要，用于端到端校验传输结果。
//!
//! 本地摘要为小写十六进制，而 drive 返回大写，比较时统一走 [`hashes_match`]。
//! 传输流程本身不会调用本模块，校验需要再读一遍文件，由调用方决定是否执行。

use crate::api::drive::models::FileFacet;
use crate::error::{DriveError, DriveResult};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const READ_BUFFER_BYTES: usize = 64 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

/// 以固定大小的缓冲区读取 `reader` 直到 EOF 并计算摘要。
pub fn digest_reader<R: Read>(reader: R, algorithm: HashAlgorithm) -> io::Result<String> {
    match algorithm {
        HashAlgorithm::Sha1 => stream_into::<Sha1, _>(reader),
        HashAlgorithm::Sha256 => stream_into::<Sha256, _>(reader),
    }
}

pub fn digest_file(path: &Path, algorithm: HashAlgorithm) -> DriveResult<String> {
    let file = File::open(path).map_err(|e| DriveError::local_io(path, e))?;
    digest_reader(file, algorithm).map_err(|e| DriveError::local_io(path, e))
}

pub fn digest_bytes(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha1 => hex::encode(Sha1::digest(data)),
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
    }
}

/// 忽略大小写比较本地与远端的十六进制摘要。
pub fn hashes_match(local: &str, remote: &str) -> bool {
    !local.is_empty() && local.eq_ignore_ascii_case(remote)
}

fn stream_into<D: Digest, R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; READ_BUFFER_BYTES];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// 一次读取同时得到本地文件的长度与两种摘要。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDigests {
    pub size_bytes: u64,
    pub sha1: String,
    pub sha256: String,
}

impl FileDigests {
    pub fn compute(path: &Path) -> DriveResult<Self> {
        let mut file = File::open(path).map_err(|e| DriveError::local_io(path, e))?;
        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();
        let mut size_bytes = 0u64;
        let mut buf = vec![0u8; READ_BUFFER_BYTES];
        loop {
            let n = match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DriveError::local_io(path, e)),
            };
            sha1.update(&buf[..n]);
            sha256.update(&buf[..n]);
            size_bytes += n as u64;
        }
        Ok(Self {
            size_bytes,
            sha1: hex::encode(sha1.finalize()),
            sha256: hex::encode(sha256.finalize()),
        })
    }

    /// 远端返回的每一种摘要都与本地一致时返回 true。
    /// 远端没有返回任何摘要时无法确认，始终返回 false。
    pub fn matches(&self, facet: &FileFacet) -> bool {
        let checks = [
            facet.hashes.sha1.as_deref().map(|h| hashes_match(&self.sha1, h)),
            facet
                .hashes
                .sha256
                .as_deref()
                .map(|h| hashes_match(&self.sha256, h)),
        ];
        let reported: Vec<bool> = checks.into_iter().flatten().collect();
        !reported.is_empty() && reported.into_iter().all(|ok| ok)
    }
}
