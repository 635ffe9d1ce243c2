//! JOSE 使用的 base64url（無填充）編碼。

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

pub use base64::DecodeError;

/// 將任意位元組編碼為 URL 安全、無填充的 Base64 字串。
pub fn encode_url<T: AsRef<[u8]>>(input: T) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// 解碼 URL 安全、無填充的 Base64 字串。
///
/// # 錯誤
///
/// 遇到無效字符或長度不符時回傳 [`DecodeError`]。
pub fn decode_url(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    URL_SAFE_NO_PAD.decode(encoded)
}

/// 判斷字串是否只包含 base64url 字元集合中的字元。
pub fn is_url_safe(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|c| matches!(c, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_'))
}
