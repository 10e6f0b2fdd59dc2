use thiserror::Error;

/// Reasons a cookie or signature was rejected.
///
/// These never reach the client: the gate turns every one of them into a
/// denial and only logs the cause.
#[derive(Debug, Error)]
pub enum Error {
    #[error("auth cookie not present")]
    MissingCookie,
    #[error("auth cookie is not valid utf-8")]
    CookieEncoding(#[from] std::str::Utf8Error),
    #[error("invalid auth cookie payload")]
    CookiePayload(#[from] serde_json::Error),
    #[error("invalid hex signature")]
    SignatureEncoding(#[from] hex::FromHexError),
    #[error("invalid hmac key")]
    InvalidKey,
    #[error("signature mismatch")]
    SignatureMismatch,
}
