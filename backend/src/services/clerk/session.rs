use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::errors::ClerkError;

/// Claims of a Clerk session token. Only `sub` and `exp` are relied upon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Clerk user id.
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
}

#[derive(Clone)]
pub struct SessionVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier").finish_non_exhaustive()
    }
}

impl SessionVerifier {
    /// Clerk signs session tokens with RS256; the PEM is the instance's JWT
    /// verification key.
    pub fn from_rsa_pem(pem: &str, issuer: Option<&str>) -> Result<Self, ClerkError> {
        let decoding = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| ClerkError::InvalidToken(format!("bad verification key: {e}")))?;
        Ok(Self::with_key(decoding, Algorithm::RS256, issuer))
    }

    /// HS256 verifier, used where no RSA key pair is at hand.
    pub fn from_secret(secret: &[u8], issuer: Option<&str>) -> Self {
        Self::with_key(DecodingKey::from_secret(secret), Algorithm::HS256, issuer)
    }

    fn with_key(decoding: DecodingKey, alg: Algorithm, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(alg);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }
        Self {
            decoding,
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, ClerkError> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| ClerkError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
pub fn issue_test_token(secret: &[u8], sub: &str, ttl_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let exp = (chrono::Utc::now().timestamp() + ttl_secs).max(0) as usize;
    let claims = SessionClaims {
        sub: sub.to_string(),
        exp,
        sid: Some("sess_test".into()),
        iss: None,
        azp: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .unwrap()
}
