use serde::{Deserialize, Serialize};

use crate::{base64::encode_url, jwk::Jwk, signature::SignatureAlgorithm};

/// 保護頭中用來識別帳戶的方式。
///
/// 只有建立帳戶的請求使用公鑰本身（`jwk`），其後一律使用伺服器核發的帳戶 URL（`kid`）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyIdentity {
    Jwk(Jwk),
    Kid(String),
}

/// 數字簽章保護頭部的資料結構。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedHeader {
    /// 簽章演算法
    alg: String,
    /// 用於防止重放攻擊的隨機數
    nonce: String,
    /// 請求目標 URL
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jwk: Option<Jwk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
}

impl ProtectedHeader {
    /// 將保護頭序列化後以 base64url 編碼。
    pub fn to_base64(&self) -> Result<String, serde_json::Error> {
        Ok(encode_url(serde_json::to_vec(self)?))
    }

    pub fn alg(&self) -> &str {
        &self.alg
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn jwk(&self) -> Option<&Jwk> {
        self.jwk.as_ref()
    }

    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }
}

/// 用於生成保護頭（Protected Header）的結構體。
///
/// 與 nonce 池無關：nonce 由呼叫者取得後傳入。
#[derive(Debug, Clone)]
pub struct Protection {
    alg: SignatureAlgorithm,
    identity: KeyIdentity,
}

impl Protection {
    pub fn new(alg: SignatureAlgorithm, identity: KeyIdentity) -> Self {
        Self { alg, identity }
    }

    /// 為指定 URL 與 nonce 產生保護頭；`jwk` 與 `kid` 恰好只出現一個。
    pub fn create_header(&self, url: impl Into<String>, nonce: impl Into<String>) -> ProtectedHeader {
        let (jwk, kid) = match &self.identity {
            KeyIdentity::Jwk(jwk) => (Some(jwk.clone()), None),
            KeyIdentity::Kid(kid) => (None, Some(kid.clone())),
        };

        ProtectedHeader {
            alg: self.alg.as_str().to_owned(),
            nonce: nonce.into(),
            url: url.into(),
            jwk,
            kid,
        }
    }
}

impl std::fmt::Display for ProtectedHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        serde_json::to_string(self)
            .map_err(|_| std::fmt::Error)
            .and_then(|s| write!(f, "{}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_pair::{KeyPair, KeyType};

    #[test]
    fn test_jwk_handling() {
        let key_pair = KeyPair::generate(KeyType::EcP256, None).unwrap();
        let jwk = key_pair.jwk().unwrap();

        let header = Protection::new(key_pair.algorithm(), KeyIdentity::Jwk(jwk.clone()))
            .create_header("https://example.com/acme/new-account", "nonce-1");

        assert_eq!(header.jwk(), Some(&jwk));
        assert!(header.kid().is_none());
        assert_eq!(header.alg(), "ES256");
    }

    #[test]
    fn test_kid_handling() {
        let header = Protection::new(
            SignatureAlgorithm::Rs256,
            KeyIdentity::Kid("https://example.com/acme/acct/1".to_owned()),
        )
        .create_header("https://example.com/acme/new-order", "nonce-2");

        assert_eq!(header.kid(), Some("https://example.com/acme/acct/1"));
        assert!(header.jwk().is_none());
    }

    #[test]
    fn test_header_serialization() {
        let header = Protection::new(SignatureAlgorithm::Es384, KeyIdentity::Kid("kid".to_owned()))
            .create_header("https://example.com", "test-nonce");

        let json = header.to_string();
        assert!(json.contains("\"nonce\":\"test-nonce\""));
        assert!(json.contains("\"url\":\"https://example.com\""));
        assert!(json.contains("\"alg\":\"ES384\""));
        assert!(!json.contains("jwk"));
    }
}
