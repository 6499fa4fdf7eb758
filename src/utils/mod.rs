pub mod ip;

/// slug 格式校验
///
/// 合法字符：ASCII 字母数字与 `-` `_` `.` `~`，长度 1-255。
/// 非法 slug 在触达目录之前直接 404。
pub fn is_valid_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.len() > 255 {
        return false;
    }
    slug.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
}
