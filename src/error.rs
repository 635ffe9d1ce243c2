//! 協議引擎對外回報的錯誤分類。
//!
//! 所有狀態機操作都回傳 [`AcmeError`]；各子模組的錯誤型別透過 `#[from]` 併入。

use std::time::Duration;

use thiserror::Error;

use crate::{
    csr::CsrError, key_pair::KeyError, payload::PayloadError, problem::ProtocolError,
    resource::Status, signature::SignatureError,
};

/// 網路或 I/O 層級的失敗，本層從不自動重試。
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP 客戶端回報的錯誤。
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 無法連線到授權伺服器。
    #[error("Authority unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },
}

/// 回應內容（JSON、憑證、標頭）格式錯誤。
#[derive(Debug, Error)]
pub enum DecodingError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("Unexpected content type: {0}")]
    ContentType(String),
    #[error("Malformed certificate: {0}")]
    Certificate(#[from] openssl::error::ErrorStack),
    #[error("Empty certificate chain")]
    EmptyChain,
    #[error("Missing {0} header")]
    MissingHeader(&'static str),
    #[error("Invalid {name} header: {value}")]
    InvalidHeader { name: &'static str, value: String },
    #[error("Invalid URL {value}: {reason}")]
    InvalidUrl { value: String, reason: String },
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

/// 取得或吸收 nonce 時的錯誤。
///
/// 伺服器以 `badNonce` 拒絕請求的情況不在此列：那是可重試的 [`ProtocolError`]。
#[derive(Debug, Error)]
pub enum NonceError {
    /// 回應中缺少 `Replay-Nonce` 標頭。
    #[error("No Replay-Nonce header found in response from {0}")]
    NoNonceHeader(String),
    /// 標頭值無法轉換成字串。
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::ToStrError),
    /// nonce 不是合法的 base64url 字串。
    #[error("Invalid replay nonce: {0}")]
    InvalidNonce(String),
}

/// 協議引擎的統一錯誤型別。
#[derive(Debug, Error)]
pub enum AcmeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    /// 已分類的問題文件；訊息即伺服器提供的 detail 原文。
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
    #[error("Nonce error: {0}")]
    Nonce(#[from] NonceError),
    #[error("Decoding error: {0}")]
    Decoding(#[from] DecodingError),
    /// 輪詢期限已到但資源仍未達終結狀態；資源之後仍可能完成。
    #[error("Timed out after {waited:?} waiting for {location} (last status: {status})")]
    Timeout {
        location: String,
        status: Status,
        waited: Duration,
    },
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),
    #[error("CSR error: {0}")]
    Csr(#[from] CsrError),
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),
    #[error("Directory does not provide the {0} endpoint")]
    MissingEndpoint(&'static str),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Illegal state: {0}")]
    IllegalState(String),
}

impl From<serde_json::Error> for AcmeError {
    fn from(e: serde_json::Error) -> Self {
        AcmeError::Decoding(DecodingError::Json(e))
    }
}

impl AcmeError {
    /// 是否為輪詢逾時（或被取消）。
    pub fn is_timeout(&self) -> bool {
        matches!(self, AcmeError::Timeout { .. })
    }

    /// 若為協議錯誤，回傳其分類結果。
    pub fn protocol(&self) -> Option<&ProtocolError> {
        match self {
            AcmeError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

/// 結果類型，失敗時為 [`AcmeError`]。
pub type Result<T> = std::result::Result<T, AcmeError>;
