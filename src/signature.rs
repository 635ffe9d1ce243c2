use std::fmt;

use openssl::{
    bn::BigNum,
    ecdsa::EcdsaSig,
    error::ErrorStack,
    hash::MessageDigest,
    pkey::{PKey, Public},
    sign::{Signer, Verifier},
};
use thiserror::Error;

use crate::key_pair::{KeyPair, KeyType};

/// 定義簽名操作可能遇到的錯誤類型。
#[derive(Debug, Error)]
pub enum SignatureError {
    /// 簽名或驗證過程中 OpenSSL 回報錯誤。
    #[error("Signing error: {0}")]
    SigningError(#[from] ErrorStack),
    /// 序列化過程中發生錯誤。
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    /// JWS 欄位不是合法的 base64url。
    #[error("Malformed JWS: {0}")]
    Malformed(String),
}

/// 簽章演算法。與 [`KeyType`] 是固定的一對一對照，不做推測。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Rs256,
    Es256,
    Es384,
    Es512,
}

impl SignatureAlgorithm {
    /// 取得金鑰類型對應的演算法。
    pub fn for_key(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Rsa => SignatureAlgorithm::Rs256,
            KeyType::EcP256 => SignatureAlgorithm::Es256,
            KeyType::EcP384 => SignatureAlgorithm::Es384,
            KeyType::EcP521 => SignatureAlgorithm::Es512,
        }
    }

    /// JWS `alg` 欄位的值。
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Rs256 => "RS256",
            SignatureAlgorithm::Es256 => "ES256",
            SignatureAlgorithm::Es384 => "ES384",
            SignatureAlgorithm::Es512 => "ES512",
        }
    }

    fn digest(&self) -> MessageDigest {
        match self {
            SignatureAlgorithm::Rs256 | SignatureAlgorithm::Es256 => MessageDigest::sha256(),
            SignatureAlgorithm::Es384 => MessageDigest::sha384(),
            SignatureAlgorithm::Es512 => MessageDigest::sha512(),
        }
    }

    /// ECDSA 簽章中 r、s 各自的固定位元組長度。
    fn coordinate_len(&self) -> Option<usize> {
        match self {
            SignatureAlgorithm::Rs256 => None,
            SignatureAlgorithm::Es256 => Some(32),
            SignatureAlgorithm::Es384 => Some(48),
            SignatureAlgorithm::Es512 => Some(66),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 定義簽名演算法的介面。
trait SignatureAlgorithmT {
    /// 使用指定的金鑰對資料進行簽名，回傳 JWS 格式的簽章位元組。
    fn sign(&self, data: &[u8], key_pair: &KeyPair) -> Result<Vec<u8>, SignatureError>;

    /// 以公鑰驗證 JWS 格式的簽章。
    fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        key: &PKey<Public>,
    ) -> Result<bool, SignatureError>;
}

/// RSASSA-PKCS1-v1_5 簽名。
struct RsaSignature {
    digest: MessageDigest,
}

impl SignatureAlgorithmT for RsaSignature {
    fn sign(&self, data: &[u8], key_pair: &KeyPair) -> Result<Vec<u8>, SignatureError> {
        let mut signer = Signer::new(self.digest, &key_pair.pri_key)?;
        signer.update(data)?;
        Ok(signer.sign_to_vec()?)
    }

    fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        key: &PKey<Public>,
    ) -> Result<bool, SignatureError> {
        let mut verifier = Verifier::new(self.digest, key)?;
        verifier.update(data)?;
        Ok(verifier.verify(signature)?)
    }
}

/// ECDSA 簽名；OpenSSL 產生 DER，JWS 需要固定長度的 `r || s`。
struct EcdsaSignature {
    digest: MessageDigest,
    coordinate_len: usize,
}

impl SignatureAlgorithmT for EcdsaSignature {
    fn sign(&self, data: &[u8], key_pair: &KeyPair) -> Result<Vec<u8>, SignatureError> {
        let mut signer = Signer::new(self.digest, &key_pair.pri_key)?;
        signer.update(data)?;
        let der = signer.sign_to_vec()?;

        let sig = EcdsaSig::from_der(&der)?;
        let width = self.coordinate_len as i32;
        let mut raw = sig.r().to_vec_padded(width)?;
        raw.extend(sig.s().to_vec_padded(width)?);
        Ok(raw)
    }

    fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        key: &PKey<Public>,
    ) -> Result<bool, SignatureError> {
        if signature.len() != self.coordinate_len * 2 {
            return Ok(false);
        }
        let (r, s) = signature.split_at(self.coordinate_len);
        let sig = EcdsaSig::from_private_components(BigNum::from_slice(r)?, BigNum::from_slice(s)?)?;

        let mut verifier = Verifier::new(self.digest, key)?;
        verifier.update(data)?;
        Ok(verifier.verify(&sig.to_der()?)?)
    }
}

/// 簽名演算法工廠。對照表窮舉所有 [`SignatureAlgorithm`]。
struct SignatureAlgorithmFactory;

impl SignatureAlgorithmFactory {
    fn get_algorithm(alg: SignatureAlgorithm) -> Box<dyn SignatureAlgorithmT> {
        match alg.coordinate_len() {
            None => Box::new(RsaSignature {
                digest: alg.digest(),
            }),
            Some(coordinate_len) => Box::new(EcdsaSignature {
                digest: alg.digest(),
                coordinate_len,
            }),
        }
    }
}

/// 對 `header_b64 "." payload_b64` 產生簽章。
///
/// 演算法由金鑰對的類型決定。
pub fn create_signature(
    header_b64: &str,
    payload_b64: &str,
    key_pair: &KeyPair,
) -> Result<Vec<u8>, SignatureError> {
    let signing_input = format!("{}.{}", header_b64, payload_b64);
    SignatureAlgorithmFactory::get_algorithm(key_pair.algorithm())
        .sign(signing_input.as_bytes(), key_pair)
}

/// 驗證 [`create_signature`] 產生的簽章。
pub fn verify_signature(
    header_b64: &str,
    payload_b64: &str,
    signature: &[u8],
    alg: SignatureAlgorithm,
    key: &PKey<Public>,
) -> Result<bool, SignatureError> {
    let signing_input = format!("{}.{}", header_b64, payload_b64);
    SignatureAlgorithmFactory::get_algorithm(alg).verify(signing_input.as_bytes(), signature, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_table() {
        assert_eq!(SignatureAlgorithm::for_key(KeyType::Rsa).as_str(), "RS256");
        assert_eq!(SignatureAlgorithm::for_key(KeyType::EcP256).as_str(), "ES256");
        assert_eq!(SignatureAlgorithm::for_key(KeyType::EcP384).as_str(), "ES384");
        assert_eq!(SignatureAlgorithm::for_key(KeyType::EcP521).as_str(), "ES512");
    }

    #[test]
    fn test_sign_and_verify_every_key_type() {
        for key_type in [KeyType::Rsa, KeyType::EcP256, KeyType::EcP384, KeyType::EcP521] {
            let key_pair = KeyPair::generate(key_type, Some(2048)).unwrap();
            let signature = create_signature("aGVhZGVy", "cGF5bG9hZA", &key_pair).unwrap();

            if let Some(len) = key_pair.algorithm().coordinate_len() {
                assert_eq!(signature.len(), len * 2);
            }
            assert!(verify_signature(
                "aGVhZGVy",
                "cGF5bG9hZA",
                &signature,
                key_pair.algorithm(),
                &key_pair.pub_key
            )
            .unwrap());
        }
    }

    #[test]
    fn test_tampered_input_fails_verification() {
        let key_pair = KeyPair::generate(KeyType::EcP256, None).unwrap();
        let signature = create_signature("aGVhZGVy", "cGF5bG9hZA", &key_pair).unwrap();
        assert!(!verify_signature(
            "aGVhZGVy",
            "b3RoZXI",
            &signature,
            key_pair.algorithm(),
            &key_pair.pub_key
        )
        .unwrap());
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let signer = KeyPair::generate(KeyType::Rsa, Some(2048)).unwrap();
        let other = KeyPair::generate(KeyType::Rsa, Some(2048)).unwrap();
        let signature = create_signature("aGVhZGVy", "", &signer).unwrap();
        let verified = verify_signature("aGVhZGVy", "", &signature, signer.algorithm(), &other.pub_key);
        assert!(!verified.unwrap_or(false));
    }
}
