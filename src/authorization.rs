use serde_json::Value;
use tracing::debug;

use crate::{
    challenge::{Challenge, ChallengeType},
    error::Result,
    payload::{DeactivationPayload, Identifier, PayloadT},
    resource::{fetch, Resource, Status},
    session::Session,
};

/// 對單一識別項的授權，內含可選用的挑戰。
#[derive(Debug, Clone)]
pub struct Authorization<'a> {
    session: &'a Session,
    location: String,
    json: Value,
    status: Status,
}

impl<'a> Authorization<'a> {
    /// 以授權 URL 取得授權。
    pub fn bind(session: &'a Session, url: &str) -> Result<Self> {
        let mut authorization = Authorization {
            session,
            location: url.to_owned(),
            json: Value::Null,
            status: Status::Unknown,
        };
        fetch(&mut authorization)?;
        Ok(authorization)
    }

    pub fn url(&self) -> &str {
        &self.location
    }

    /// 授權涵蓋的識別項。
    pub fn identifier(&self) -> Option<Identifier> {
        self.json
            .get("identifier")
            .and_then(|id| serde_json::from_value(id.clone()).ok())
    }

    /// 授權到期時間（RFC 3339 字串）。
    pub fn expires(&self) -> Option<&str> {
        self.json.get("expires").and_then(Value::as_str)
    }

    pub fn is_wildcard(&self) -> bool {
        self.json
            .get("wildcard")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// 伺服器提供的所有挑戰。
    pub fn challenges(&self) -> Result<Vec<Challenge<'a>>> {
        self.json
            .get("challenges")
            .and_then(Value::as_array)
            .map(|challenges| {
                challenges
                    .iter()
                    .map(|c| Challenge::from_json(self.session, c.clone()))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// 找出指定類型的挑戰。
    pub fn find_challenge(&self, challenge_type: &ChallengeType) -> Result<Option<Challenge<'a>>> {
        Ok(self
            .challenges()?
            .into_iter()
            .find(|c| c.challenge_type() == challenge_type))
    }

    /// 停用授權。
    pub fn deactivate(&mut self) -> Result<Status> {
        let claims = DeactivationPayload::default().to_claims()?;
        let conn = self.session.connect();
        let response = conn.post_as_signed(&self.location, &claims)?;
        conn.accept(&response, &[200])?;
        self.apply(response.json()?)?;
        debug!(authorization = %self.location, status = %self.status, "authorization deactivated");
        Ok(self.status)
    }
}

impl Resource for Authorization<'_> {
    const KIND: &'static str = "authorization";

    fn session(&self) -> &Session {
        self.session
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn status(&self) -> Status {
        self.status
    }

    fn json(&self) -> &Value {
        &self.json
    }

    fn apply(&mut self, json: Value) -> Result<()> {
        self.status = Status::of(&json);
        self.json = json;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        http::{mock::payload_of, HttpResponse},
        session::tests::scripted_session,
    };

    const AUTHZ_URL: &str = "https://ca.example/acme/authz/PAniVnsZcis";

    fn authz_json(status: &str) -> Value {
        json!({
            "status": status,
            "expires": "2016-01-02T14:09:30Z",
            "identifier": { "type": "dns", "value": "www.example.org" },
            "challenges": [
                {
                    "url": "https://ca.example/acme/chall/prV_B7yEyA4",
                    "type": "http-01",
                    "status": "pending",
                    "token": "DGyRejmCefe7v4NfDGDKfA"
                },
                {
                    "url": "https://ca.example/acme/chall/Rg5dV14Gh1Q",
                    "type": "dns-01",
                    "status": "pending",
                    "token": "DGyRejmCefe7v4NfDGDKfA"
                }
            ]
        })
    }

    #[test]
    fn test_challenges_and_lookup() {
        let (client, session) = scripted_session();
        client.push(HttpResponse::json(200, authz_json("pending")).with_nonce("n1"));

        let authz = Authorization::bind(&session, AUTHZ_URL).unwrap();
        assert_eq!(authz.status(), Status::Pending);
        assert_eq!(authz.identifier(), Some(Identifier::dns("www.example.org")));
        assert_eq!(authz.expires(), Some("2016-01-02T14:09:30Z"));
        assert!(!authz.is_wildcard());
        assert_eq!(authz.challenges().unwrap().len(), 2);

        let dns = authz.find_challenge(&ChallengeType::Dns01).unwrap().unwrap();
        assert_eq!(dns.url(), "https://ca.example/acme/chall/Rg5dV14Gh1Q");
        assert!(authz
            .find_challenge(&ChallengeType::TlsAlpn01)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_deactivate() {
        let (client, session) = scripted_session();
        client.push(HttpResponse::json(200, authz_json("valid")).with_nonce("n1"));
        client.push(HttpResponse::json(200, authz_json("deactivated")).with_nonce("n2"));

        let mut authz = Authorization::bind(&session, AUTHZ_URL).unwrap();
        assert_eq!(authz.deactivate().unwrap(), Status::Deactivated);
        assert_eq!(payload_of(&client.posts()[1])["status"], "deactivated");
    }
}
