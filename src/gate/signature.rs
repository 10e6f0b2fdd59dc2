//! HMAC-SHA256 signatures over the username carried in the auth cookie.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use super::Error;

type HmacSha256 = Hmac<Sha256>;

/// Sign `data` with `secret`, returning the lower-case hex digest.
///
/// # Errors
/// Returns [`Error::InvalidKey`] if the MAC cannot be keyed.
pub fn sign(secret: &str, data: &str) -> Result<String, Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| Error::InvalidKey)?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex signature over `data`.
///
/// Decoding and MAC failures are logged and reported as `false`.
#[must_use]
pub fn verify(secret: &str, data: &str, signature: &str) -> bool {
    match try_verify(secret, data, signature) {
        Ok(()) => true,
        Err(err) => {
            debug!("Signature rejected: {err}");
            false
        }
    }
}

fn try_verify(secret: &str, data: &str, signature: &str) -> Result<(), Error> {
    let expected = hex::decode(signature)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| Error::InvalidKey)?;
    mac.update(data.as_bytes());
    // verify_slice compares in constant time
    mac.verify_slice(&expected)
        .map_err(|_| Error::SignatureMismatch)?;
    Ok(())
}
