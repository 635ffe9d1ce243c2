use chrono::{Duration, Utc};
use openssl::{asn1::Asn1Time, x509::X509};
use tracing::debug;

use crate::{
    connection::ResponseBody,
    directory::Endpoint,
    error::{DecodingError, Result},
    payload::{PayloadT, RevocationPayload},
    session::Session,
};

/// RFC 5280 定義的撤銷原因碼。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    Unspecified = 0,
    KeyCompromise = 1,
    CaCompromise = 2,
    AffiliationChanged = 3,
    Superseded = 4,
    CessationOfOperation = 5,
    CertificateHold = 6,
    RemoveFromCrl = 8,
    PrivilegeWithdrawn = 9,
    AaCompromise = 10,
}

impl RevocationReason {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// 已簽發的憑證鏈，葉憑證在前。
#[derive(Debug, Clone)]
pub struct Certificate {
    /// 下載位置；由 PEM 載入時為 `None`。
    location: Option<String>,
    chain: Vec<X509>,
    /// 伺服器以 `Link: rel="alternate"` 提供的替代鏈。
    alternates: Vec<String>,
}

impl Certificate {
    /// 以 POST-as-GET 下載憑證鏈。
    pub fn download(session: &Session, url: &str) -> Result<Self> {
        let conn = session.connect();
        let response = conn.post_as_get_certificate(url)?;
        conn.accept(&response, &[200])?;

        let chain = match response.body()? {
            ResponseBody::Certificate(chain) => chain,
            ResponseBody::Other {
                content_type: None,
                bytes,
            } => decode_chain(&bytes)?,
            _ => {
                return Err(DecodingError::ContentType(
                    response.content_type().unwrap_or_else(|| "<none>".to_owned()),
                )
                .into())
            }
        };
        let alternates = response.links("alternate")?;
        debug!(
            certificate = %url,
            chain_len = chain.len(),
            alternates = alternates.len(),
            "certificate downloaded"
        );

        Ok(Certificate {
            location: Some(url.to_owned()),
            chain,
            alternates,
        })
    }

    /// 由 PEM 格式的憑證鏈建立。
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        Ok(Certificate {
            location: None,
            chain: decode_chain(pem)?,
            alternates: Vec::new(),
        })
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// 葉憑證。
    pub fn leaf(&self) -> &X509 {
        // 建構時已保證鏈不為空
        &self.chain[0]
    }

    pub fn chain(&self) -> &[X509] {
        &self.chain
    }

    pub fn alternates(&self) -> &[String] {
        &self.alternates
    }

    /// 以 PEM 格式輸出整條鏈。
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        Ok(encode_chain(&self.chain)?)
    }

    /// 葉憑證是否會在 `within` 之內到期（已到期也算）。
    pub fn expires_within(&self, within: Duration) -> Result<bool> {
        let now = Asn1Time::from_unix(Utc::now().timestamp()).map_err(DecodingError::from)?;
        let diff = now
            .diff(self.leaf().not_after())
            .map_err(DecodingError::from)?;
        let remaining = Duration::days(diff.days.into()) + Duration::seconds(diff.secs.into());
        Ok(remaining <= within)
    }

    /// 以帳戶金鑰撤銷葉憑證。
    pub fn revoke(&self, session: &Session, reason: Option<RevocationReason>) -> Result<()> {
        let url = session.endpoint(Endpoint::RevokeCert)?;
        let der = self.leaf().to_der().map_err(DecodingError::from)?;
        let claims = RevocationPayload::new(&der, reason.map(RevocationReason::code)).to_claims()?;

        let conn = session.connect();
        let response = conn.post_as_signed(&url, &claims)?;
        conn.accept(&response, &[200])?;
        debug!(reason = ?reason, "certificate revoked");
        Ok(())
    }
}

/// 解析 PEM 憑證鏈，保持原有順序。
pub fn decode_chain(pem: &[u8]) -> std::result::Result<Vec<X509>, DecodingError> {
    let chain = X509::stack_from_pem(pem)?;
    if chain.is_empty() {
        return Err(DecodingError::EmptyChain);
    }
    Ok(chain)
}

/// 將憑證鏈依序編碼為 PEM。
pub fn encode_chain(chain: &[X509]) -> std::result::Result<Vec<u8>, DecodingError> {
    let mut pem = Vec::new();
    for cert in chain {
        pem.extend_from_slice(&cert.to_pem()?);
    }
    Ok(pem)
}
