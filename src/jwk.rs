use openssl::{
    bn::{BigNum, BigNumContext},
    error::ErrorStack,
    sha::sha256,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    base64::encode_url,
    key_pair::{KeyPair, KeyType},
};

/// JWK 相關操作的錯誤類型。
#[derive(Debug, Error)]
pub enum JwkError {
    /// 金鑰轉換失敗。
    #[error("Failed to convert key: {0}")]
    KeyConversionError(#[from] ErrorStack),
    /// 序列化錯誤。
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// JSON Web Key (JWK) 的封裝，支援 RSA 與橢圓曲線公鑰。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum Jwk {
    /// RSA 格式的 JWK。
    #[serde(rename = "RSA")]
    Rsa(RsaJwk),
    /// 橢圓曲線格式的 JWK。
    #[serde(rename = "EC")]
    Ec(EcJwk),
}

/// RSA 公開參數。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaJwk {
    e: String,
    n: String,
}

/// 橢圓曲線公開參數，座標以曲線長度補零。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcJwk {
    crv: String,
    x: String,
    y: String,
}

impl Jwk {
    /// 根據給定的金鑰對建立對應的 JWK。
    pub fn new(key_pair: &KeyPair) -> Result<Self, JwkError> {
        match key_pair.key_type {
            KeyType::Rsa => {
                let rsa = key_pair.pub_key.rsa()?;
                Ok(Jwk::Rsa(RsaJwk {
                    e: encode_url(rsa.e().to_vec()),
                    n: encode_url(rsa.n().to_vec()),
                }))
            }
            key_type => {
                let ec = key_pair.pub_key.ec_key()?;
                let group = ec.group();
                let width = ((group.degree() + 7) / 8) as i32;

                let mut ctx = BigNumContext::new()?;
                let mut x = BigNum::new()?;
                let mut y = BigNum::new()?;
                ec.public_key()
                    .affine_coordinates(group, &mut x, &mut y, &mut ctx)?;

                Ok(Jwk::Ec(EcJwk {
                    crv: key_type.curve_name().unwrap_or_default().to_owned(),
                    x: encode_url(x.to_vec_padded(width)?),
                    y: encode_url(y.to_vec_padded(width)?),
                }))
            }
        }
    }

    /// 產生 RFC 7638 規定的正規 JSON：只含必要成員，且按字典序排列。
    pub fn to_acme_json(&self) -> Result<String, JwkError> {
        let mut map = Map::new();
        match self {
            Jwk::Rsa(jwk) => {
                map.insert("e".to_owned(), Value::String(jwk.e.clone()));
                map.insert("kty".to_owned(), Value::String("RSA".to_owned()));
                map.insert("n".to_owned(), Value::String(jwk.n.clone()));
            }
            Jwk::Ec(jwk) => {
                map.insert("crv".to_owned(), Value::String(jwk.crv.clone()));
                map.insert("kty".to_owned(), Value::String("EC".to_owned()));
                map.insert("x".to_owned(), Value::String(jwk.x.clone()));
                map.insert("y".to_owned(), Value::String(jwk.y.clone()));
            }
        }
        serde_json::to_string(&Value::Object(map)).map_err(JwkError::from)
    }

    /// 計算 JWK 縮影（SHA-256，base64url）。
    pub fn thumbprint(&self) -> Result<String, JwkError> {
        Ok(encode_url(sha256(self.to_acme_json()?.as_bytes())))
    }
}
