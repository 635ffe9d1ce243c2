use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodingError;

/// 目錄中可能出現的端點。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    NewNonce,
    NewAccount,
    NewOrder,
    NewAuthz,
    RevokeCert,
    KeyChange,
    RenewalInfo,
}

impl Endpoint {
    const ALL: [Endpoint; 7] = [
        Endpoint::NewNonce,
        Endpoint::NewAccount,
        Endpoint::NewOrder,
        Endpoint::NewAuthz,
        Endpoint::RevokeCert,
        Endpoint::KeyChange,
        Endpoint::RenewalInfo,
    ];

    /// RFC 8555 使用的鍵名。
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::NewNonce => "newNonce",
            Endpoint::NewAccount => "newAccount",
            Endpoint::NewOrder => "newOrder",
            Endpoint::NewAuthz => "newAuthz",
            Endpoint::RevokeCert => "revokeCert",
            Endpoint::KeyChange => "keyChange",
            Endpoint::RenewalInfo => "renewalInfo",
        }
    }

    /// 早期草案使用的連字號鍵名。
    fn legacy_key(self) -> &'static str {
        match self {
            Endpoint::NewNonce => "new-nonce",
            Endpoint::NewAccount => "new-reg",
            Endpoint::NewOrder => "new-order",
            Endpoint::NewAuthz => "new-authz",
            Endpoint::RevokeCert => "revoke-cert",
            Endpoint::KeyChange => "key-change",
            Endpoint::RenewalInfo => "renewal-info",
        }
    }
}

/// 伺服器提供的描述性中繼資料（目錄中的 `meta` 物件）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// 服務條款的 URL。
    #[serde(
        rename = "termsOfService",
        alias = "terms-of-service",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub terms_of_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// CA 在 CAA 記錄中承認的主機名稱。
    #[serde(
        rename = "caaIdentities",
        alias = "caa-identities",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub caa_identities: Vec<String>,
    #[serde(
        rename = "externalAccountRequired",
        alias = "external-account-required",
        default
    )]
    pub external_account_required: bool,
    /// 其餘未識別的欄位，原樣保留。
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 授權伺服器的目錄：端點對照與中繼資料。取得後即不可變。
#[derive(Debug, Clone)]
pub struct Directory {
    url: String,
    endpoints: HashMap<Endpoint, String>,
    metadata: Metadata,
}

impl Directory {
    /// 解析目錄文件。
    ///
    /// # 參數
    ///
    /// - `url`: 目錄本身的 URL，僅作為紀錄。
    /// - `json`: 伺服器回傳的目錄物件。
    pub fn from_json(url: impl Into<String>, json: Value) -> Result<Self, DecodingError> {
        let Value::Object(mut map) = json else {
            return Err(DecodingError::NotAnObject("directory"));
        };

        let metadata = match map.remove("meta") {
            Some(meta) => serde_json::from_value(meta)?,
            None => Metadata::default(),
        };

        let endpoints = Endpoint::ALL
            .into_iter()
            .filter_map(|endpoint| {
                map.get(endpoint.as_str())
                    .or_else(|| map.get(endpoint.legacy_key()))
                    .and_then(Value::as_str)
                    .map(|url| (endpoint, url.to_owned()))
            })
            .collect();

        Ok(Directory {
            url: url.into(),
            endpoints,
            metadata,
        })
    }

    /// 目錄所在的 URL。
    pub fn location(&self) -> &str {
        &self.url
    }

    /// 取得指定端點的 URL；伺服器未提供時回傳 `None`。
    pub fn url(&self, endpoint: Endpoint) -> Option<&str> {
        self.endpoints.get(&endpoint).map(String::as_str)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}
