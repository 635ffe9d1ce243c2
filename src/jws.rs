//! JSON Web Signature (JWS) 的建立與驗證。
//!
//! [`sign`] 是請求簽署的唯一入口：它把保護頭、payload 與簽章組成 flattened JWS。

use openssl::pkey::{PKey, Public};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    base64::{decode_url, encode_url},
    key_pair::{KeyPair, KeyType},
    protection::{KeyIdentity, ProtectedHeader, Protection},
    signature::{create_signature, verify_signature, SignatureAlgorithm, SignatureError},
};

type Result<T> = std::result::Result<T, SignatureError>;

/// Flattened JWS 物件，各部分皆為 base64url 字串。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Jws {
    /// 對應 JWS 中的 "protected" 欄位。
    #[serde(rename = "protected")]
    header: String,
    /// POST-as-GET 時為空字串。
    payload: String,
    signature: String,
}

impl Jws {
    pub fn new(header_b64: String, payload_b64: String, signature_b64: String) -> Self {
        Jws {
            header: header_b64,
            payload: payload_b64,
            signature: signature_b64,
        }
    }

    /// 將 `Jws` 實例序列化為 JSON 字串，作為 `application/jose+json` 請求內容。
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 解碼保護頭。
    pub fn header(&self) -> Result<ProtectedHeader> {
        let bytes = decode_url(&self.header).map_err(|e| SignatureError::Malformed(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// 解碼 payload；POST-as-GET 回傳 `None`。
    pub fn payload(&self) -> Result<Option<Value>> {
        if self.payload.is_empty() {
            return Ok(None);
        }
        let bytes =
            decode_url(&self.payload).map_err(|e| SignatureError::Malformed(e.to_string()))?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// 以公鑰驗證簽章；演算法取自保護頭，必須與金鑰類型相符。
    pub fn verify(&self, key_type: KeyType, key: &PKey<Public>) -> Result<bool> {
        let expected = SignatureAlgorithm::for_key(key_type);
        if self.header()?.alg() != expected.as_str() {
            return Ok(false);
        }
        let signature =
            decode_url(&self.signature).map_err(|e| SignatureError::Malformed(e.to_string()))?;
        verify_signature(&self.header, &self.payload, &signature, expected, key)
    }
}

/// 建立簽署後的請求內容。
///
/// # 參數
///
/// - `url`: 請求目標 URL，會寫入保護頭。
/// - `payload`: JSON 內容；`None` 表示 POST-as-GET（空 payload）。
/// - `nonce`: 由呼叫者自 nonce 池取得的一次性 nonce。
/// - `key_pair`: 帳戶金鑰對。
/// - `identity`: 以 `jwk` 或 `kid` 識別帳戶。
pub fn sign(
    url: &str,
    payload: Option<&Value>,
    nonce: &str,
    key_pair: &KeyPair,
    identity: KeyIdentity,
) -> Result<Jws> {
    let header_b64 = Protection::new(key_pair.algorithm(), identity)
        .create_header(url, nonce)
        .to_base64()?;
    let payload_b64 = match payload {
        Some(value) => encode_url(serde_json::to_vec(value)?),
        None => String::new(),
    };
    let signature = create_signature(&header_b64, &payload_b64, key_pair)?;

    Ok(Jws::new(header_b64, payload_b64, encode_url(signature)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signed_request_binds_url_nonce_and_kid() {
        let key_pair = KeyPair::generate(KeyType::EcP256, None).unwrap();
        let claims = json!({ "identifiers": [{ "type": "dns", "value": "example.org" }] });
        let jws = sign(
            "https://example.com/acme/new-order",
            Some(&claims),
            "nonce-abc",
            &key_pair,
            KeyIdentity::Kid("https://example.com/acme/acct/7".to_owned()),
        )
        .unwrap();

        let header = jws.header().unwrap();
        assert_eq!(header.url(), "https://example.com/acme/new-order");
        assert_eq!(header.nonce(), "nonce-abc");
        assert_eq!(header.kid(), Some("https://example.com/acme/acct/7"));
        assert_eq!(jws.payload().unwrap(), Some(claims));
        assert!(jws.verify(key_pair.key_type, &key_pair.pub_key).unwrap());
    }

    #[test]
    fn test_post_as_get_has_empty_payload() {
        let key_pair = KeyPair::generate(KeyType::Rsa, Some(2048)).unwrap();
        let jws = sign(
            "https://example.com/acme/order/1",
            None,
            "nonce-xyz",
            &key_pair,
            KeyIdentity::Kid("kid".to_owned()),
        )
        .unwrap();

        let json: Value = serde_json::from_str(&jws.to_json().unwrap()).unwrap();
        assert_eq!(json["payload"], "");
        assert!(json["protected"].is_string());
        assert_eq!(jws.payload().unwrap(), None);
        assert!(jws.verify(KeyType::Rsa, &key_pair.pub_key).unwrap());
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let key_pair = KeyPair::generate(KeyType::EcP384, None).unwrap();
        let other = KeyPair::generate(KeyType::EcP384, None).unwrap();
        let jws = sign(
            "https://example.com/acme/new-account",
            Some(&json!({})),
            "n",
            &key_pair,
            KeyIdentity::Jwk(key_pair.jwk().unwrap()),
        )
        .unwrap();

        assert!(!jws.verify(KeyType::EcP384, &other.pub_key).unwrap());
        assert!(!jws.verify(KeyType::EcP256, &key_pair.pub_key).unwrap());
    }
}
