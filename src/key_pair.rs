use openssl::{
    ec::{EcGroup, EcKey},
    error::ErrorStack,
    nid::Nid,
    pkey::{Id, PKey, Private, Public},
    rsa::Rsa,
};
use thiserror::Error;

use crate::{
    jwk::{Jwk, JwkError},
    signature::SignatureAlgorithm,
};

/// 鍵相關操作的錯誤列舉。
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("OpenSSL error: {0}")]
    OpenSSL(#[from] ErrorStack),
    #[error("Unsupported key type: {0}")]
    UnsupportedKey(String),
    #[error("JWK error: {0}")]
    Jwk(#[from] JwkError),
}

/// 本模組使用的結果類型，當中錯誤皆為 `KeyError`。
type Result<T> = std::result::Result<T, KeyError>;

/// 支援的帳戶金鑰類型。每一種類型恰好對應一個簽章演算法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Rsa,
    EcP256,
    EcP384,
    EcP521,
}

impl KeyType {
    /// 將輸入的演算法名稱標準化（不分大小寫）。
    ///
    /// 接受 `RSA`/`RS256`、`EC`/`ECDSA`/`ES256`/`P-256`、`ES384`/`P-384`、`ES512`/`P-521`。
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_uppercase().as_str() {
            "RSA" | "RS256" => Ok(KeyType::Rsa),
            "EC" | "ECDSA" | "ES256" | "P-256" | "P256" => Ok(KeyType::EcP256),
            "ES384" | "P-384" | "P384" => Ok(KeyType::EcP384),
            "ES512" | "P-521" | "P521" => Ok(KeyType::EcP521),
            other => Err(KeyError::UnsupportedKey(other.to_owned())),
        }
    }

    /// 橢圓曲線的 OpenSSL 名稱；RSA 回傳 `None`。
    fn curve(self) -> Option<Nid> {
        match self {
            KeyType::Rsa => None,
            KeyType::EcP256 => Some(Nid::X9_62_PRIME256V1),
            KeyType::EcP384 => Some(Nid::SECP384R1),
            KeyType::EcP521 => Some(Nid::SECP521R1),
        }
    }

    /// JWK 中使用的曲線名稱。
    pub fn curve_name(self) -> Option<&'static str> {
        match self {
            KeyType::Rsa => None,
            KeyType::EcP256 => Some("P-256"),
            KeyType::EcP384 => Some("P-384"),
            KeyType::EcP521 => Some("P-521"),
        }
    }

    /// 依金鑰內容判斷類型。
    fn of(key: &PKey<Private>) -> Result<Self> {
        match key.id() {
            Id::RSA => Ok(KeyType::Rsa),
            Id::EC => {
                let nid = key.ec_key()?.group().curve_name();
                [KeyType::EcP256, KeyType::EcP384, KeyType::EcP521]
                    .into_iter()
                    .find(|t| t.curve() == nid)
                    .ok_or_else(|| {
                        KeyError::UnsupportedKey(format!(
                            "EC curve {:?}",
                            nid.map(|n| n.as_raw())
                        ))
                    })
            }
            other => Err(KeyError::UnsupportedKey(format!("key id {}", other.as_raw()))),
        }
    }
}

/// 帳戶（或憑證）使用的非對稱金鑰對。
///
/// 私鑰由呼叫者提供或在記憶體中產生，本層不會將它寫入任何儲存。
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// 金鑰類型，決定簽章演算法。
    pub key_type: KeyType,
    /// 私鑰，使用 OpenSSL 的 `PKey` 封裝。
    pub pri_key: PKey<Private>,
    /// 公鑰，從私鑰派生而來。
    pub pub_key: PKey<Public>,
}

impl KeyPair {
    /// RSA 金鑰的預設長度。
    const DEFAULT_RSA_BITS: u32 = 2048;

    /// 依演算法名稱產生新的金鑰對。
    ///
    /// # 參數
    ///
    /// - `alg_name`: 演算法名稱，參見 [`KeyType::from_name`]。
    /// - `bits`: RSA 金鑰長度，未提供時為 2048；橢圓曲線金鑰忽略此參數。
    pub fn new(alg_name: &str, bits: Option<u32>) -> Result<Self> {
        Self::generate(KeyType::from_name(alg_name)?, bits)
    }

    /// 產生指定類型的新金鑰對。
    pub fn generate(key_type: KeyType, bits: Option<u32>) -> Result<Self> {
        let pri_key = match key_type.curve() {
            None => PKey::from_rsa(Rsa::generate(bits.unwrap_or(Self::DEFAULT_RSA_BITS))?)?,
            Some(nid) => {
                let group = EcGroup::from_curve_name(nid)?;
                PKey::from_ec_key(EcKey::generate(&group)?)?
            }
        };
        Self::from_private_key(pri_key)
    }

    /// 由既有私鑰建立金鑰對；不支援的金鑰類型會被拒絕。
    pub fn from_private_key(pri_key: PKey<Private>) -> Result<Self> {
        let key_type = KeyType::of(&pri_key)?;
        let pub_key = Self::derive_public_key(&pri_key)?;
        Ok(Self {
            key_type,
            pri_key,
            pub_key,
        })
    }

    /// 根據 PEM 格式的私鑰資料建立一組金鑰對。
    pub fn from_pem(pri_key_pem: &[u8]) -> Result<Self> {
        Self::from_private_key(PKey::private_key_from_pem(pri_key_pem)?)
    }

    /// 以 PKCS#8 PEM 匯出私鑰，供呼叫者自行保存。
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        Ok(self.pri_key.private_key_to_pem_pkcs8()?)
    }

    fn derive_public_key(pri_key: &PKey<Private>) -> Result<PKey<Public>> {
        Ok(PKey::public_key_from_der(&pri_key.public_key_to_der()?)?)
    }

    /// 此金鑰對應的簽章演算法。
    pub fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::for_key(self.key_type)
    }

    /// 公鑰的 JWK 表示。
    pub fn jwk(&self) -> Result<Jwk> {
        Ok(Jwk::new(self)?)
    }

    /// 計算 RFC 7638 縮影（thumbprint），以 URL-safe Base64 字串回傳。
    pub fn thumbprint(&self) -> Result<String> {
        Ok(self.jwk()?.thumbprint()?)
    }

    /// 金鑰長度（位元）。
    pub fn key_parameters(&self) -> u32 {
        self.pri_key.bits()
    }
}
