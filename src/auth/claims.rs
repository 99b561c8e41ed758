use serde::{Deserialize, Serialize};

/// JWT payload. The subject is the username; timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub iat: i64,    // issued at
    pub exp: i64,    // expires at
    pub iss: String, // issuer
    pub aud: String, // audience
}
