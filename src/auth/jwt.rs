use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::{
    claims::Claims,
    error::{AuthError, TokenError},
};
use crate::config::JwtConfig;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// A signed token as it travels on the wire, plus its decoded claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    raw: String,
    claims: Claims,
}

impl Token {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn signature(&self) -> &str {
        self.raw.rsplit('.').next().unwrap_or_default()
    }

    pub fn issued_at(&self) -> OffsetDateTime {
        from_unix(self.claims.iat)
    }

    pub fn expires_at(&self) -> OffsetDateTime {
        from_unix(self.claims.exp)
    }
}

fn from_unix(ts: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(ts).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Issues and checks HS512 bearer tokens.
///
/// Built once at startup from [`JwtConfig`]; the key material is never
/// replaced afterwards, so a shared reference is safe across requests.
/// Changing the secret invalidates every token issued under the old one.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenService {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::seconds(cfg.ttl_minutes.saturating_mul(60)),
        }
    }

    pub fn issue(&self, subject: &str, now: OffsetDateTime) -> Result<Token, AuthError> {
        let expires = match now.checked_add(self.ttl) {
            Some(at) if at > now => at,
            _ => return Err(AuthError::Lifetime),
        };
        let claims = Claims {
            sub: subject.to_owned(),
            iat: now.unix_timestamp(),
            exp: expires.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let raw = encode(&Header::new(ALGORITHM), &claims, &self.encoding)?;
        debug!(subject, "jwt signed");
        Ok(Token { raw, claims })
    }

    /// Decodes structure and claims without checking the signature.
    pub fn parse(&self, text: &str) -> Result<Token, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(text, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt does not decode");
            TokenError::Malformed
        })?;

        let signature = text.rsplit('.').next().unwrap_or_default();
        if signature.is_empty() || !signature.bytes().all(is_base64url) {
            return Err(TokenError::Malformed);
        }

        Ok(Token {
            raw: text.to_owned(),
            claims: data.claims,
        })
    }

    /// Recomputes the signature over the token's own header and claims,
    /// then checks expiry against `now`. Yields the subject.
    pub fn validate(&self, token: &Token, now: OffsetDateTime) -> Result<String, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        // expiry is judged below against the caller's clock
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<Claims>(&token.raw, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt signature check failed");
            TokenError::InvalidSignature
        })?;

        if now.unix_timestamp() >= token.claims.exp {
            debug!(subject = %token.claims.sub, "jwt expired");
            return Err(TokenError::Expired);
        }

        debug!(subject = %token.claims.sub, "jwt verified");
        Ok(token.claims.sub.clone())
    }
}

fn is_base64url(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);

    fn make_service(secret: &str, issuer: &str, audience: &str) -> TokenService {
        TokenService::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 60,
        })
    }

    fn service() -> TokenService {
        make_service("unit-test-secret-that-is-long-enough!!", "test-issuer", "test-aud")
    }

    #[test]
    fn issue_sets_claims_from_clock() {
        let svc = service();
        let token = svc.issue("alice", T0).expect("issue");
        assert_eq!(token.subject(), "alice");
        assert_eq!(token.issued_at(), T0);
        assert_eq!(token.expires_at(), T0 + Duration::minutes(60));
        assert_eq!(token.claims().iss, "test-issuer");
        assert_eq!(token.claims().aud, "test-aud");
        assert_eq!(token.as_str().split('.').count(), 3);
    }

    #[test]
    fn issued_token_is_url_safe() {
        let token = service().issue("alice", T0).unwrap();
        assert!(token
            .as_str()
            .bytes()
            .all(|b| is_base64url(b) || b == b'.'));
    }

    #[test]
    fn validate_yields_subject_before_expiry() {
        let svc = service();
        let token = svc.issue("alice", T0).unwrap();
        let parsed = svc.parse(token.as_str()).expect("parse");
        assert_eq!(parsed, token);
        assert_eq!(svc.validate(&parsed, T0).unwrap(), "alice");
        let last_second = token.expires_at() - Duration::seconds(1);
        assert_eq!(svc.validate(&parsed, last_second).unwrap(), "alice");
    }

    #[test]
    fn validate_fails_at_and_after_expiry() {
        let svc = service();
        let token = svc.issue("alice", T0).unwrap();
        assert_eq!(svc.validate(&token, token.expires_at()), Err(TokenError::Expired));
        assert_eq!(
            svc.validate(&token, token.expires_at() + Duration::days(3)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let svc = service();
        let token = svc.issue("alice", T0).unwrap();
        let raw = token.as_str();
        let sig_start = raw.rfind('.').unwrap() + 1;
        let idx = sig_start + 5;
        let original = raw.as_bytes()[idx];
        let replacement = if original == b'A' { 'B' } else { 'A' };
        let mut tampered = raw.to_string();
        tampered.replace_range(idx..idx + 1, &replacement.to_string());

        let parsed = svc.parse(&tampered).expect("still well-formed");
        assert_ne!(parsed.signature(), token.signature());
        assert_eq!(parsed.claims(), token.claims());
        assert_eq!(svc.validate(&parsed, T0), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn tampered_claims_are_invalid() {
        let svc = service();
        let alice = svc.issue("alice", T0).unwrap();
        let mallory = svc.issue("mallory", T0).unwrap();
        let a: Vec<&str> = alice.as_str().split('.').collect();
        let m: Vec<&str> = mallory.as_str().split('.').collect();
        // alice's claims under mallory's signature
        let spliced = format!("{}.{}.{}", a[0], a[1], m[2]);
        let parsed = svc.parse(&spliced).unwrap();
        assert_eq!(svc.validate(&parsed, T0), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn foreign_secret_is_invalid_signature() {
        let ours = service();
        let theirs = make_service("another-secret-also-long-enough-here!", "test-issuer", "test-aud");
        let token = theirs.issue("alice", T0).unwrap();
        let parsed = ours.parse(token.as_str()).expect("structure is fine");
        assert_eq!(ours.validate(&parsed, T0), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let secret = "shared-secret-shared-secret-shared!!";
        let good = make_service(secret, "good-iss", "good-aud");
        let bad = make_service(secret, "bad-iss", "bad-aud");
        let token = good.issue("alice", T0).unwrap();
        let parsed = bad.parse(token.as_str()).unwrap();
        assert_eq!(bad.validate(&parsed, T0), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn unusable_lifetime_is_an_error_not_a_panic() {
        for minutes in [10_000_000_000, i64::MAX, 0, -5] {
            let svc = TokenService::new(&JwtConfig {
                secret: "unit-test-secret-that-is-long-enough!!".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: minutes,
            });
            let err = svc.issue("alice", T0).unwrap_err();
            assert!(matches!(err, AuthError::Lifetime), "{minutes}");
        }
    }

    #[test]
    fn garbage_is_malformed() {
        let svc = service();
        for text in ["", "abc", "a.b", "a.b.c", "not a token at all"] {
            assert_eq!(svc.parse(text), Err(TokenError::Malformed), "{text:?}");
        }
    }

    #[test]
    fn undecodable_signature_is_malformed() {
        let svc = service();
        let token = svc.issue("alice", T0).unwrap();
        let raw = token.as_str();
        let cut = raw.rfind('.').unwrap();
        assert_eq!(svc.parse(&format!("{}.", &raw[..cut])), Err(TokenError::Malformed));
        assert_eq!(svc.parse(&format!("{}.@@@", &raw[..cut])), Err(TokenError::Malformed));
    }
}
