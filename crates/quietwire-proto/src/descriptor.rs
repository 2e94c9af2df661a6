//! Shared control-code convention between two peers.
//!
//! Both endpoints hold an identical [`ControlCodeDescriptor`]: a random
//! session secret plus a table mapping symbolic control events to literal
//! marker text. Control events travel *in-band*, embedded in the decrypted
//! application text as `marker_start + secret + delimiter + literal +
//! marker_end`, e.g. `"[<50-char-secret>::NEWLINE]"`.
//!
//! The secret is what makes a marker "ours": a scanner walking arbitrary
//! application text can hand every bracketed span to
//! [`ControlCodeDescriptor::validate_control_code`] and treat anything with
//! the wrong secret as plain text instead of aborting. That is why a secret
//! mismatch is a [`TokenValidation`] value, not an error.
//!
//! The descriptor is negotiated out-of-band: one side builds it, serializes
//! it to JSON and hands it to the peer before encrypted traffic begins. It is
//! immutable for the lifetime of the session.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Length of a generated session secret, in characters.
pub const DEFAULT_SECRET_LEN: usize = 50;

/// Symbolic control events both peers understand.
///
/// The set is closed: new events require a protocol revision on both sides,
/// so this is an enum rather than a free-form string table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlCode {
    /// Terminates one application-level message inside the byte stream.
    End,
    /// Requests an orderly shutdown of the peer.
    Shutdown,
    /// Asks the peer to read a line of input.
    Input,
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::End => write!(f, "end"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::Input => write!(f, "input"),
        }
    }
}

/// Outcome of validating a candidate marker token.
///
/// Only a structurally broken token (missing markers) is an *error*; the
/// other outcomes are ordinary values so scanners can keep walking a text
/// stream that happens to contain bracketed spans from other sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidation {
    /// The token carries our secret and a known code literal.
    Recognized(ControlCode),
    /// The token is well-formed but carries a different secret.
    WrongKey,
    /// The secret matches but the trailing literal is not in the code table.
    UnknownCode,
}

impl TokenValidation {
    /// Returns the recognized code, if any.
    #[must_use]
    pub fn code(self) -> Option<ControlCode> {
        match self {
            Self::Recognized(code) => Some(code),
            Self::WrongKey | Self::UnknownCode => None,
        }
    }
}

/// Immutable per-session control-code convention.
///
/// See the [module docs](self) for the marker text form. Construction
/// enforces the one structural invariant the scanner relies on: the secret
/// must not contain the delimiter or either marker, otherwise marker
/// boundaries inside a token become ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCodeDescriptor {
    secret: String,
    delimiter: String,
    marker_start: String,
    marker_end: String,
    codes: BTreeMap<ControlCode, String>,
}

impl ControlCodeDescriptor {
    /// Create a descriptor with a fresh random secret and the default
    /// delimiter, markers, and code table.
    pub fn new() -> Self {
        let descriptor = Self {
            secret: generate_secret(DEFAULT_SECRET_LEN),
            delimiter: "::".to_string(),
            marker_start: "[".to_string(),
            marker_end: "]".to_string(),
            codes: default_codes(),
        };
        debug_assert!(descriptor.validate().is_ok());
        descriptor
    }

    /// Create a descriptor from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidDescriptor`] if the delimiter or a
    /// marker is empty, or if the secret contains any of them.
    pub fn with_parts(
        secret: impl Into<String>,
        delimiter: impl Into<String>,
        marker_start: impl Into<String>,
        marker_end: impl Into<String>,
        codes: BTreeMap<ControlCode, String>,
    ) -> Result<Self, ProtocolError> {
        let descriptor = Self {
            secret: secret.into(),
            delimiter: delimiter.into(),
            marker_start: marker_start.into(),
            marker_end: marker_end.into(),
            codes,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// The shared session secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Separator between the secret and the code literal inside a token.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Opening marker of a control token.
    #[must_use]
    pub fn marker_start(&self) -> &str {
        &self.marker_start
    }

    /// Closing marker of a control token.
    #[must_use]
    pub fn marker_end(&self) -> &str {
        &self.marker_end
    }

    /// The code table.
    #[must_use]
    pub fn codes(&self) -> &BTreeMap<ControlCode, String> {
        &self.codes
    }

    /// Render the in-band marker text for a control code.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownControlName`] if the code table has no
    /// literal for `code` (possible with a custom table).
    pub fn get_control_code(&self, code: ControlCode) -> Result<String, ProtocolError> {
        let literal = self
            .codes
            .get(&code)
            .ok_or(ProtocolError::UnknownControlName { code })?;
        Ok(format!(
            "{}{}{}{}{}",
            self.marker_start, self.secret, self.delimiter, literal, self.marker_end
        ))
    }

    /// Classify a candidate marker token.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedToken`] if the token does not start
    /// with `marker_start` and end with `marker_end`. Secret or literal
    /// mismatches are reported through [`TokenValidation`], not as errors.
    pub fn validate_control_code(&self, token: &str) -> Result<TokenValidation, ProtocolError> {
        let inner = token
            .strip_prefix(self.marker_start.as_str())
            .and_then(|rest| rest.strip_suffix(self.marker_end.as_str()))
            .ok_or(ProtocolError::MalformedToken)?;

        // Byte-indexed prefix extraction; a slice that lands off a char
        // boundary cannot equal the secret, so it is a plain mismatch.
        let Some(shipped) = inner.get(..self.secret.len()) else {
            return Ok(TokenValidation::WrongKey);
        };
        if shipped != self.secret {
            return Ok(TokenValidation::WrongKey);
        }

        let rest = &inner[self.secret.len()..];
        let Some(literal) = rest.get(self.delimiter.len()..) else {
            return Ok(TokenValidation::UnknownCode);
        };
        match self.codes.iter().find(|(_, v)| v.as_str() == literal) {
            Some((code, _)) => Ok(TokenValidation::Recognized(*code)),
            None => Ok(TokenValidation::UnknownCode),
        }
    }

    /// Serialize the descriptor to its transmissible JSON form.
    pub fn serialize(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Reconstruct a descriptor from its JSON form, re-validating the
    /// construction invariants.
    pub fn deserialize(data: &str) -> Result<Self, ProtocolError> {
        let descriptor: Self =
            serde_json::from_str(data).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        let invalid = |reason: &str| ProtocolError::InvalidDescriptor {
            reason: reason.to_string(),
        };
        if self.delimiter.is_empty() {
            return Err(invalid("delimiter must not be empty"));
        }
        if self.marker_start.is_empty() || self.marker_end.is_empty() {
            return Err(invalid("markers must not be empty"));
        }
        if self.secret.contains(&self.delimiter) {
            return Err(invalid("secret must not contain the delimiter"));
        }
        if self.secret.contains(&self.marker_start) || self.secret.contains(&self.marker_end) {
            return Err(invalid("secret must not contain a marker"));
        }
        Ok(())
    }
}

impl Default for ControlCodeDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

/// Default code table: message end, shutdown request, input request.
#[must_use]
pub fn default_codes() -> BTreeMap<ControlCode, String> {
    BTreeMap::from([
        (ControlCode::End, "NEWLINE".to_string()),
        (ControlCode::Shutdown, "SHUTDOWN 0xC000013A".to_string()),
        (ControlCode::Input, "IN".to_string()),
    ])
}

/// Generate a URL-safe base64 secret of exactly `length` characters from
/// CSPRNG bytes.
fn generate_secret(length: usize) -> String {
    // 3 source bytes yield 4 base64 characters; round down and truncate the
    // encoded form so the result is exactly `length` characters.
    let mut raw = vec![0u8; (length * 3).div_ceil(4)];
    OsRng.fill_bytes(&mut raw);
    let mut encoded = URL_SAFE_NO_PAD.encode(raw);
    encoded.truncate(length);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_has_requested_length() {
        let descriptor = ControlCodeDescriptor::new();
        assert_eq!(descriptor.secret().len(), DEFAULT_SECRET_LEN);
    }

    #[test]
    fn control_code_round_trip() {
        let descriptor = ControlCodeDescriptor::new();
        let token = descriptor.get_control_code(ControlCode::Shutdown).unwrap();
        assert_eq!(
            descriptor.validate_control_code(&token).unwrap(),
            TokenValidation::Recognized(ControlCode::Shutdown)
        );
    }

    #[test]
    fn foreign_secret_reports_wrong_key() {
        let ours = ControlCodeDescriptor::new();
        let theirs = ControlCodeDescriptor::new();
        let token = theirs.get_control_code(ControlCode::End).unwrap();
        assert_eq!(
            ours.validate_control_code(&token).unwrap(),
            TokenValidation::WrongKey
        );
    }

    #[test]
    fn unknown_literal_is_not_fatal() {
        let descriptor = ControlCodeDescriptor::new();
        let token = format!(
            "{}{}{}{}{}",
            descriptor.marker_start(),
            descriptor.secret(),
            descriptor.delimiter(),
            "NO SUCH CODE",
            descriptor.marker_end()
        );
        assert_eq!(
            descriptor.validate_control_code(&token).unwrap(),
            TokenValidation::UnknownCode
        );
    }

    #[test]
    fn unmarked_token_is_malformed() {
        let descriptor = ControlCodeDescriptor::new();
        assert_eq!(
            descriptor.validate_control_code("no markers here"),
            Err(ProtocolError::MalformedToken)
        );
    }

    #[test]
    fn missing_table_entry_fails_lookup() {
        let mut codes = default_codes();
        codes.remove(&ControlCode::Input);
        let descriptor =
            ControlCodeDescriptor::with_parts("secret", "::", "[", "]", codes).unwrap();
        assert_eq!(
            descriptor.get_control_code(ControlCode::Input),
            Err(ProtocolError::UnknownControlName {
                code: ControlCode::Input
            })
        );
    }

    #[test]
    fn secret_containing_delimiter_is_rejected() {
        let result =
            ControlCodeDescriptor::with_parts("left::right", "::", "[", "]", default_codes());
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn secret_containing_marker_is_rejected() {
        let result =
            ControlCodeDescriptor::with_parts("odd]secret", "::", "[", "]", default_codes());
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn serialization_round_trip_preserves_all_fields() {
        let descriptor = ControlCodeDescriptor::new();
        let json = descriptor.serialize().unwrap();
        let restored = ControlCodeDescriptor::deserialize(&json).unwrap();
        assert_eq!(restored, descriptor);
    }

    #[test]
    fn deserialization_re_validates_invariants() {
        let json = r#"{
            "secret": "has::delimiter",
            "delimiter": "::",
            "marker_start": "[",
            "marker_end": "]",
            "codes": {"end": "NEWLINE"}
        }"#;
        assert!(matches!(
            ControlCodeDescriptor::deserialize(json),
            Err(ProtocolError::InvalidDescriptor { .. })
        ));
    }
}
