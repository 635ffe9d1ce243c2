use openssl::{
    hash::MessageDigest,
    stack::Stack,
    x509::{extension::SubjectAlternativeName, X509NameBuilder, X509Req},
};
use thiserror::Error;

use crate::{key_pair::KeyPair, payload::Identifier};

/// 用於描述建立 CSR（證書簽名請求）過程中可能發生的錯誤。
#[derive(Debug, Error)]
pub enum CsrError {
    #[error("Openssl error: {0}")]
    OpensslError(#[from] openssl::error::ErrorStack),
    #[error("No SAN entries")]
    NoSanEntries,
    #[error("Unsupported identifier type: {0}")]
    UnsupportedIdentifier(String),
}

/// 為簡化錯誤處理定義 Result 類型
type Result<T> = std::result::Result<T, CsrError>;

/// 主體替代名稱項目。
#[derive(Debug, Clone, PartialEq, Eq)]
enum SanEntry {
    Dns(String),
    Ip(String),
}

/// CSR 建構器，產生包含主體替代名稱 (SAN) 擴展的證書簽名請求。
///
/// 第一個 DNS 名稱同時作為主體的 CN。
#[derive(Debug, Default)]
pub struct Csr {
    san_entries: Vec<SanEntry>,
}

impl Csr {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增一個 DNS 主體替代名稱。
    pub fn add_domain(mut self, dns_name: &str) -> Self {
        self.san_entries.push(SanEntry::Dns(dns_name.to_owned()));
        self
    }

    /// 新增一個 IP 主體替代名稱。
    pub fn add_ip(mut self, address: &str) -> Self {
        self.san_entries.push(SanEntry::Ip(address.to_owned()));
        self
    }

    /// 依訂單識別項新增主體替代名稱；只接受 `dns` 與 `ip`。
    pub fn add_identifier(self, identifier: &Identifier) -> Result<Self> {
        match identifier.type_.as_str() {
            "dns" => Ok(self.add_domain(&identifier.value)),
            "ip" => Ok(self.add_ip(&identifier.value)),
            other => Err(CsrError::UnsupportedIdentifier(other.to_owned())),
        }
    }

    /// 以指定的金鑰對簽署 CSR。
    ///
    /// # 錯誤
    ///
    /// 未設定任何 SAN 項目時回傳 `CsrError::NoSanEntries`。
    pub fn build(self, key_pair: &KeyPair) -> Result<X509Req> {
        if self.san_entries.is_empty() {
            return Err(CsrError::NoSanEntries);
        }

        let mut req_builder = X509Req::builder()?;

        if let Some(SanEntry::Dns(common_name)) =
            self.san_entries.iter().find(|e| matches!(e, SanEntry::Dns(_)))
        {
            let mut name = X509NameBuilder::new()?;
            name.append_entry_by_text("CN", common_name)?;
            req_builder.set_subject_name(&name.build())?;
        }

        let mut san_builder = SubjectAlternativeName::new();
        for entry in &self.san_entries {
            match entry {
                SanEntry::Dns(name) => san_builder.dns(name),
                SanEntry::Ip(address) => san_builder.ip(address),
            };
        }
        let san_extension = san_builder.build(&req_builder.x509v3_context(None))?;

        let mut stack = Stack::new()?;
        stack.push(san_extension)?;
        req_builder.add_extensions(&stack)?;

        req_builder.set_pubkey(&key_pair.pri_key)?;
        req_builder.sign(&key_pair.pri_key, MessageDigest::sha256())?;

        Ok(req_builder.build())
    }

    /// 簽署並回傳 DER 編碼。
    pub fn to_der(self, key_pair: &KeyPair) -> Result<Vec<u8>> {
        Ok(self.build(key_pair)?.to_der()?)
    }
}
