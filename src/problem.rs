//! 問題文件（problem document）解析與錯誤分類。
//!
//! 非成功的回應會在回到呼叫者之前經過 [`Classifier`]，轉成帶有
//! [`ProblemKind`] 與 [`Verdict`] 的 [`ProtocolError`]。

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payload::Identifier;

/// 問題文件的 Content-Type。
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// RFC 8555 錯誤型別 URI 的共同前綴。
pub const ACME_ERROR_PREFIX: &str = "urn:ietf:params:acme:error:";

/// 伺服器回傳的結構化錯誤內容。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// 錯誤型別 URI。
    #[serde(rename = "type", default = "default_problem_type")]
    pub problem_type: String,
    /// 人類可讀的描述。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// 子問題所針對的識別項。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subproblems: Vec<Problem>,
}

fn default_problem_type() -> String {
    "about:blank".to_owned()
}

impl Problem {
    /// 由 HTTP 狀態碼合成一個通用問題文件，用於回應不是問題文件的情況。
    pub fn from_status(status: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown Status");
        Problem {
            problem_type: default_problem_type(),
            detail: Some(format!("HTTP {} {}", status, reason)),
            title: None,
            status: Some(status),
            instance: None,
            identifier: None,
            subproblems: Vec::new(),
        }
    }

    /// 回傳 detail 原文；沒有 detail 時退而使用 title 或型別 URI。
    pub fn detail_text(&self) -> &str {
        self.detail
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or(&self.problem_type)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail_text())?;
        for sub in &self.subproblems {
            match &sub.identifier {
                Some(id) => write!(f, "; {}: {}", id.value, sub.detail_text())?,
                None => write!(f, "; {}", sub.detail_text())?,
            }
        }
        Ok(())
    }
}

/// 錯誤種類。涵蓋 RFC 8555 定義的所有錯誤型別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    AccountDoesNotExist,
    AlreadyRevoked,
    BadCsr,
    BadNonce,
    BadPublicKey,
    BadRevocationReason,
    BadSignatureAlgorithm,
    Caa,
    Compound,
    Connection,
    Dns,
    ExternalAccountRequired,
    IncorrectResponse,
    InvalidContact,
    Malformed,
    OrderNotReady,
    RateLimited,
    RejectedIdentifier,
    ServerInternal,
    Tls,
    Unauthorized,
    UnsupportedContact,
    UnsupportedIdentifier,
    UserActionRequired,
    Unknown,
}

/// 分類後對呼叫者的處置建議。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 以新的 nonce 重新簽名並重送。
    RetryWithFreshNonce,
    /// 本次操作失敗；引擎不做任何自動恢復。
    Fatal,
}

/// 錯誤型別 URI 到 [`ProblemKind`] 的對照表。
///
/// 先比對完整 URI，再比對最後一個 `:` 之後的片段，因此
/// `urn:ietf:params:acme:error:badNonce` 與舊版 `urn:acme:error:badNonce`
/// 都會落到 [`ProblemKind::BadNonce`]。部署特有的型別可以用
/// [`register_uri`](Self::register_uri) 或 [`register_suffix`](Self::register_suffix) 補上。
#[derive(Debug, Clone)]
pub struct ProblemTypes {
    exact: HashMap<String, ProblemKind>,
    suffixes: HashMap<String, ProblemKind>,
}

impl ProblemTypes {
    const RFC8555: &'static [(&'static str, ProblemKind)] = &[
        ("accountDoesNotExist", ProblemKind::AccountDoesNotExist),
        ("alreadyRevoked", ProblemKind::AlreadyRevoked),
        ("badCSR", ProblemKind::BadCsr),
        ("badNonce", ProblemKind::BadNonce),
        ("badPublicKey", ProblemKind::BadPublicKey),
        ("badRevocationReason", ProblemKind::BadRevocationReason),
        ("badSignatureAlgorithm", ProblemKind::BadSignatureAlgorithm),
        ("caa", ProblemKind::Caa),
        ("compound", ProblemKind::Compound),
        ("connection", ProblemKind::Connection),
        ("dns", ProblemKind::Dns),
        ("externalAccountRequired", ProblemKind::ExternalAccountRequired),
        ("incorrectResponse", ProblemKind::IncorrectResponse),
        ("invalidContact", ProblemKind::InvalidContact),
        ("malformed", ProblemKind::Malformed),
        ("orderNotReady", ProblemKind::OrderNotReady),
        ("rateLimited", ProblemKind::RateLimited),
        ("rejectedIdentifier", ProblemKind::RejectedIdentifier),
        ("serverInternal", ProblemKind::ServerInternal),
        ("tls", ProblemKind::Tls),
        ("unauthorized", ProblemKind::Unauthorized),
        ("unsupportedContact", ProblemKind::UnsupportedContact),
        ("unsupportedIdentifier", ProblemKind::UnsupportedIdentifier),
        ("userActionRequired", ProblemKind::UserActionRequired),
    ];

    /// 建立一個空的對照表；所有型別都會被歸為 [`ProblemKind::Unknown`]。
    pub fn empty() -> Self {
        ProblemTypes {
            exact: HashMap::new(),
            suffixes: HashMap::new(),
        }
    }

    /// 以完整 URI 註冊一個錯誤型別。
    pub fn register_uri(&mut self, uri: impl Into<String>, kind: ProblemKind) -> &mut Self {
        self.exact.insert(uri.into(), kind);
        self
    }

    /// 以 URI 最後一個 `:` 之後的片段註冊一個錯誤型別。
    pub fn register_suffix(&mut self, suffix: impl Into<String>, kind: ProblemKind) -> &mut Self {
        self.suffixes.insert(suffix.into(), kind);
        self
    }

    /// 查詢型別 URI 對應的錯誤種類。
    pub fn kind_of(&self, type_uri: &str) -> ProblemKind {
        if let Some(kind) = self.exact.get(type_uri) {
            return *kind;
        }
        type_uri
            .rsplit_once(':')
            .and_then(|(_, suffix)| self.suffixes.get(suffix))
            .copied()
            .unwrap_or(ProblemKind::Unknown)
    }
}

impl Default for ProblemTypes {
    fn default() -> Self {
        let mut types = Self::empty();
        for (suffix, kind) in Self::RFC8555 {
            types.register_suffix(*suffix, *kind);
        }
        types
    }
}

/// 已分類的協議錯誤。
///
/// `Display` 只輸出伺服器的 detail 原文（含子問題），呼叫者可直接呈現給使用者。
#[derive(Debug, Clone, Error)]
#[error("{problem}")]
pub struct ProtocolError {
    /// 錯誤種類。
    pub kind: ProblemKind,
    /// HTTP 狀態碼。
    pub status: u16,
    /// 原始或合成的問題文件。
    pub problem: Problem,
    /// 伺服器透過 `Retry-After` 給出的建議重試時間。
    pub retry_after: Option<DateTime<Utc>>,
}

impl ProtocolError {
    pub fn verdict(&self) -> Verdict {
        match self.kind {
            ProblemKind::BadNonce => Verdict::RetryWithFreshNonce,
            _ => Verdict::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.verdict() == Verdict::RetryWithFreshNonce
    }

    /// 伺服器提供的 detail 原文。
    pub fn detail(&self) -> &str {
        self.problem.detail_text()
    }

    pub fn subproblems(&self) -> &[Problem] {
        &self.problem.subproblems
    }
}

/// 將非成功回應轉為 [`ProtocolError`]。
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    types: ProblemTypes,
}

impl Classifier {
    pub fn new(types: ProblemTypes) -> Self {
        Classifier { types }
    }

    pub fn types(&self) -> &ProblemTypes {
        &self.types
    }

    /// 依 Content-Type 決定是否解析問題文件，再依型別 URI 判定種類。
    ///
    /// 不是問題文件（或解析失敗）時，依狀態碼合成：`5xx` 視為
    /// [`ProblemKind::ServerInternal`]，其餘為 [`ProblemKind::Unknown`]。
    pub fn classify(
        &self,
        status: u16,
        content_type: Option<&str>,
        body: &[u8],
        retry_after: Option<DateTime<Utc>>,
    ) -> ProtocolError {
        let parsed = content_type
            .filter(|ct| mime_essence(ct) == PROBLEM_CONTENT_TYPE)
            .and_then(|_| serde_json::from_slice::<Problem>(body).ok());

        let (kind, problem) = match parsed {
            Some(problem) => (self.types.kind_of(&problem.problem_type), problem),
            None if (500..600).contains(&status) => {
                (ProblemKind::ServerInternal, Problem::from_status(status))
            }
            None => (ProblemKind::Unknown, Problem::from_status(status)),
        };

        ProtocolError {
            kind,
            status,
            problem,
            retry_after,
        }
    }
}

/// 取出 MIME 型別本體（去掉參數並轉小寫）。
pub(crate) fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
