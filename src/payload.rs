use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// 載荷驗證失敗的原因。
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Contact must be a URI with a scheme: {0}")]
    InvalidContact(String),
    #[error("At least one identifier is required")]
    NoIdentifiers,
    #[error("Identifier value cannot be empty")]
    EmptyIdentifier,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 定義所有 API 載荷（Payload）必須實作的功能。
pub trait PayloadT: Serialize {
    /// 驗證載荷資料是否符合預期的規範。
    fn validate(&self) -> Result<(), PayloadError>;

    /// 驗證後轉成 JSON 值，作為簽名請求的 claims。
    fn to_claims(&self) -> Result<Value, PayloadError> {
        self.validate()?;
        Ok(serde_json::to_value(self)?)
    }
}

/// 識別項，描述訂單或授權所涵蓋的主機名稱或 IP。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub type_: String,
    pub value: String,
}

impl Identifier {
    pub fn dns(domain: impl Into<String>) -> Self {
        Identifier {
            type_: "dns".to_owned(),
            value: domain.into(),
        }
    }

    pub fn ip(address: impl Into<String>) -> Self {
        Identifier {
            type_: "ip".to_owned(),
            value: address.into(),
        }
    }
}

/// 建立新帳號所需的載荷資料。
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NewAccountPayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    contact: Vec<String>,
    #[serde(
        rename = "termsOfServiceAgreed",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    terms_of_service_agreed: Option<bool>,
    #[serde(
        rename = "onlyReturnExisting",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    only_return_existing: Option<bool>,
}

impl NewAccountPayload {
    pub fn new(contact: Vec<String>, terms_agreed: bool, only_existing: bool) -> Self {
        NewAccountPayload {
            contact,
            terms_of_service_agreed: terms_agreed.then_some(true),
            only_return_existing: only_existing.then_some(true),
        }
    }
}

impl PayloadT for NewAccountPayload {
    fn validate(&self) -> Result<(), PayloadError> {
        validate_contacts(&self.contact)
    }
}

/// 更新帳戶聯絡資訊。
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountUpdatePayload {
    contact: Vec<String>,
}

impl AccountUpdatePayload {
    pub fn new(contact: Vec<String>) -> Self {
        AccountUpdatePayload { contact }
    }
}

impl PayloadT for AccountUpdatePayload {
    fn validate(&self) -> Result<(), PayloadError> {
        validate_contacts(&self.contact)
    }
}

/// 停用帳戶或授權。
#[derive(Debug, Serialize, Deserialize)]
pub struct DeactivationPayload {
    status: String,
}

impl Default for DeactivationPayload {
    fn default() -> Self {
        DeactivationPayload {
            status: "deactivated".to_owned(),
        }
    }
}

impl PayloadT for DeactivationPayload {
    fn validate(&self) -> Result<(), PayloadError> {
        Ok(())
    }
}

/// 建立新訂單時所需的載荷資料。
#[derive(Debug, Serialize, Deserialize)]
pub struct NewOrderPayload {
    pub identifiers: Vec<Identifier>,
    #[serde(rename = "notBefore", skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(rename = "notAfter", skip_serializing_if = "Option::is_none")]
    pub not_after: Option<String>,
}

impl NewOrderPayload {
    pub fn new(identifiers: Vec<Identifier>) -> Self {
        NewOrderPayload {
            identifiers,
            not_before: None,
            not_after: None,
        }
    }
}

impl PayloadT for NewOrderPayload {
    fn validate(&self) -> Result<(), PayloadError> {
        if self.identifiers.is_empty() {
            return Err(PayloadError::NoIdentifiers);
        }
        if self.identifiers.iter().any(|id| id.value.is_empty()) {
            return Err(PayloadError::EmptyIdentifier);
        }
        Ok(())
    }
}

/// 觸發挑戰驗證的載荷：空物件。
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ChallengeValidationPayload {}

impl PayloadT for ChallengeValidationPayload {
    fn validate(&self) -> Result<(), PayloadError> {
        Ok(())
    }
}

/// 最終化訂單時所需的載荷資料。
#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeOrderPayload {
    csr: String,
}

impl FinalizeOrderPayload {
    /// 以 DER 編碼的 CSR 建立載荷。
    pub fn new(csr_der: &[u8]) -> Self {
        FinalizeOrderPayload {
            csr: crate::base64::encode_url(csr_der),
        }
    }
}

impl PayloadT for FinalizeOrderPayload {
    fn validate(&self) -> Result<(), PayloadError> {
        Ok(())
    }
}

/// 撤銷憑證的載荷資料。
#[derive(Debug, Serialize, Deserialize)]
pub struct RevocationPayload {
    certificate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<u8>,
}

impl RevocationPayload {
    /// 以 DER 編碼的憑證與可選的原因碼建立載荷。
    pub fn new(certificate_der: &[u8], reason: Option<u8>) -> Self {
        RevocationPayload {
            certificate: crate::base64::encode_url(certificate_der),
            reason,
        }
    }
}

impl PayloadT for RevocationPayload {
    fn validate(&self) -> Result<(), PayloadError> {
        Ok(())
    }
}

fn validate_contacts(contacts: &[String]) -> Result<(), PayloadError> {
    match contacts.iter().find(|c| !c.contains(':')) {
        Some(contact) => Err(PayloadError::InvalidContact(contact.clone())),
        None => Ok(()),
    }
}
