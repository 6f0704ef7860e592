//! # Authentication Message
//!
//! The text-phase message a peer sends before any binary traffic:
//!
//! ```text
//! [LOGIN(4)] [SALT_HEX(16)] [HASH_HEX(56)]      76 bytes, no separator
//! ```
//!
//! `SALT_HEX` is 8 salt bytes in hexadecimal; `HASH_HEX` is the SHA-224 digest of
//! `salt_bytes || secret`, also in hexadecimal. Both accept either letter case.
//! The server answers with the literal [`REPLY_OK`] or [`REPLY_ERR`].

use crate::error::AuthFormatError;

/// Length of the login field.
pub const LOGIN_LEN: usize = 4;

/// Length of the hex-encoded salt (8 raw bytes).
pub const SALT_HEX_LEN: usize = 16;

/// Raw salt length once decoded.
pub const SALT_LEN: usize = SALT_HEX_LEN / 2;

/// Length of the hex-encoded SHA-224 digest (28 raw bytes).
pub const HASH_HEX_LEN: usize = 56;

/// Total length of a well-formed authentication message.
pub const AUTH_MESSAGE_LEN: usize = LOGIN_LEN + SALT_HEX_LEN + HASH_HEX_LEN;

/// Successful authentication reply.
pub const REPLY_OK: &[u8] = b"OK";

/// Failed authentication reply (format or credentials).
pub const REPLY_ERR: &[u8] = b"ERR";

/// Number of leading hash digits that may appear in logs.
const HASH_LOG_PREFIX: usize = 16;

/// A parsed authentication request. Field lengths are guaranteed by [`AuthRequest::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    login: String,
    salt: String,
    claimed_hash: String,
}

impl AuthRequest {
    /// Parse a raw inbound message.
    ///
    /// Checks run in wire order: total length, login, salt, hash. The first
    /// failing check wins, so a 75-byte message is rejected before anything
    /// else is looked at.
    pub fn parse(raw: &[u8], accepted_login: &str) -> Result<Self, AuthFormatError> {
        if raw.len() != AUTH_MESSAGE_LEN {
            return Err(AuthFormatError::WrongLength(raw.len()));
        }

        let (login, rest) = raw.split_at(LOGIN_LEN);
        let (salt, hash) = rest.split_at(SALT_HEX_LEN);

        if login != accepted_login.as_bytes() {
            return Err(AuthFormatError::LoginNotAccepted(
                String::from_utf8_lossy(login).into_owned(),
            ));
        }
        if !is_hex(salt) {
            return Err(AuthFormatError::InvalidSalt);
        }
        if !is_hex(hash) {
            return Err(AuthFormatError::InvalidHash);
        }

        // All three fields are ASCII at this point.
        Ok(Self {
            login: accepted_login.to_owned(),
            salt: String::from_utf8_lossy(salt).into_owned(),
            claimed_hash: String::from_utf8_lossy(hash).into_owned(),
        })
    }

    /// Build a request from already-encoded fields (peer side).
    pub fn new(login: &str, salt_hex: &str, hash_hex: &str) -> Result<Self, AuthFormatError> {
        let mut raw = Vec::with_capacity(AUTH_MESSAGE_LEN);
        raw.extend_from_slice(login.as_bytes());
        raw.extend_from_slice(salt_hex.as_bytes());
        raw.extend_from_slice(hash_hex.as_bytes());
        Self::parse(&raw, login)
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn claimed_hash(&self) -> &str {
        &self.claimed_hash
    }

    /// The claimed hash shortened for log output.
    pub fn redacted_hash(&self) -> String {
        format!("{}...", &self.claimed_hash[..HASH_LOG_PREFIX])
    }

    /// Serialize to the 76-byte wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(AUTH_MESSAGE_LEN);
        out.extend_from_slice(self.login.as_bytes());
        out.extend_from_slice(self.salt.as_bytes());
        out.extend_from_slice(self.claimed_hash.as_bytes());
        out
    }
}

#[inline]
fn is_hex(field: &[u8]) -> bool {
    field.iter().all(u8::is_ascii_hexdigit)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SALT: &str = "0123456789abcdef";
    const HASH: &str = "2A1150048DAC2B36EEFAF2C09655C0B3BE4C8242F8CC8BD7DA36B576";

    fn message(login: &str, salt: &str, hash: &str) -> Vec<u8> {
        format!("{login}{salt}{hash}").into_bytes()
    }

    #[test]
    fn test_parse_valid_message() {
        let req = AuthRequest::parse(&message("user", SALT, HASH), "user").unwrap();
        assert_eq!(req.login(), "user");
        assert_eq!(req.salt(), SALT);
        assert_eq!(req.claimed_hash(), HASH);
    }

    #[test]
    fn test_parse_accepts_lowercase_hash() {
        let lower = HASH.to_ascii_lowercase();
        assert!(AuthRequest::parse(&message("user", SALT, &lower), "user").is_ok());
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let mut raw = message("user", SALT, HASH);
        raw.pop();
        assert_eq!(
            AuthRequest::parse(&raw, "user"),
            Err(AuthFormatError::WrongLength(75))
        );

        raw.extend_from_slice(b"AB");
        assert_eq!(
            AuthRequest::parse(&raw, "user"),
            Err(AuthFormatError::WrongLength(77))
        );
    }

    #[test]
    fn test_parse_rejects_other_login() {
        assert_eq!(
            AuthRequest::parse(&message("root", SALT, HASH), "user"),
            Err(AuthFormatError::LoginNotAccepted("root".into()))
        );
    }

    #[test]
    fn test_parse_rejects_non_hex_fields() {
        assert_eq!(
            AuthRequest::parse(&message("user", "0123456789abcdeg", HASH), "user"),
            Err(AuthFormatError::InvalidSalt)
        );

        let mut bad_hash = HASH.to_string();
        bad_hash.replace_range(55.., "Z");
        assert_eq!(
            AuthRequest::parse(&message("user", SALT, &bad_hash), "user"),
            Err(AuthFormatError::InvalidHash)
        );
    }

    #[test]
    fn test_redacted_hash_keeps_prefix_only() {
        let req = AuthRequest::parse(&message("user", SALT, HASH), "user").unwrap();
        assert_eq!(req.redacted_hash(), "2A1150048DAC2B36...");
    }

    #[test]
    fn test_to_bytes_matches_wire_layout() {
        let req = AuthRequest::new("user", SALT, HASH).unwrap();
        assert_eq!(req.to_bytes(), message("user", SALT, HASH));
        assert_eq!(req.to_bytes().len(), AUTH_MESSAGE_LEN);
    }
}
