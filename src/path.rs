//! 远端路径处理：路径以 `/` 分隔且总是绝对路径，drive 根目录为 `/`。

use crate::error::{DriveError, DriveResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub const SEPARATOR: char = '/';

/// 单个路径段内保持原样、不做编码的字符。
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// 合并重复分隔符，去掉末尾分隔符并保证以 `/` 开头。
/// 空输入解析为根目录。
pub fn normalize(path: &str) -> String {
    let joined = segments(path).collect::<Vec<_>>().join("/");
    format!("{SEPARATOR}{joined}")
}

/// 用且仅用一个分隔符拼接远端目录与末级名称。
pub fn join(dir: &str, leaf: &str) -> DriveResult<String> {
    let leaf = leaf.trim_matches(SEPARATOR);
    if leaf.trim().is_empty() {
        return Err(DriveError::InvalidPath(format!(
            "empty leaf name under {dir:?}"
        )));
    }
    Ok(normalize(&format!("{dir}{SEPARATOR}{leaf}")))
}

/// 返回路径的最后一段；根目录没有名称，返回空字符串。
pub fn leaf_name(path: &str) -> &str {
    path.trim_end_matches(SEPARATOR)
        .rsplit(SEPARATOR)
        .next()
        .unwrap_or_default()
}

/// 规范化后的父目录，根目录的父目录仍是根目录。
pub fn parent(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind(SEPARATOR) {
        Some(0) | None => SEPARATOR.to_string(),
        Some(idx) => normalized[..idx].to_string(),
    }
}

pub fn is_root(path: &str) -> bool {
    segments(path).next().is_none()
}

/// 对每个路径段做百分号编码并保留分隔符。
/// 结果不带前导 `/`，根目录编码为空字符串。
pub fn encode(path: &str) -> String {
    segments(path)
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}
