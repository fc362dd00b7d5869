//! Claim extraction from bearer tokens
//!
//! Tokens are decoded structurally only: the header and payload segments are
//! base64url-decoded and parsed as JSON, and the signature is never checked.
//! Callers forward tokens that an upstream system has already verified, so the
//! extracted claims are exactly as trustworthy as that upstream check.
//!
//! Extraction never fails outward. Anything that cannot be decoded degrades
//! to an anonymous result (`logged_in = false`).

use std::sync::Arc;

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::diagnostics::{DiagnosticEvent, Diagnostics};

/// Longest token text, in characters, that will be decoded
pub const MAX_TOKEN_CHARS: usize = 16_384;

/// Claim and output field name for the authentication flag
pub const LOGGED_IN: &str = "logged_in";

/// Claim whose value is kept as a list of strings
pub const ROLES: &str = "roles";

const BEARER_PREFIX: &str = "Bearer ";

// JWT segments are unpadded base64url, but padded input is tolerated.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const DEFAULT_MAPPING: [(&str, &str); 15] = [
    ("sub", "subject"),
    ("email", "user_email"),
    ("name", "user_name"),
    ("user_id", "user_id"),
    ("org", "user_org"),
    ("country_name", "user_country_name"),
    ("nih_ico", "nih_ico"),
    ("eRA_commons_id", "eRA_commons_id"),
    ("permission_group", "user_permission_group"),
    ("session_id", "session_id"),
    ("uuid", "uuid"),
    ("roles", "roles"),
    ("logged_in", "logged_in"),
    ("idp", "user_id_provider"),
    ("cadr_name", "cadr_name"),
];

/// One claim → output field translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimMappingEntry {
    /// Claim name in the token payload
    pub claim: String,
    /// Field name in the emitted record
    pub field: String,
}

/// Errors raised while parsing a claim mapping from JSON
#[derive(Debug, Error)]
pub enum ClaimMappingError {
    /// Not valid JSON at all
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON, but not an object
    #[error("expected a JSON object of claim name to field name")]
    NotAnObject,

    /// An entry whose output field is not a string
    #[error("output field for claim '{0}' must be a string")]
    NonStringField(String),
}

/// Ordered mapping from claim name to output field name
///
/// Claim names are unique; a later entry for the same claim replaces the
/// earlier one in place. Iteration follows insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ClaimMappingEntry>", into = "Vec<ClaimMappingEntry>")]
pub struct ClaimMapping {
    entries: Vec<ClaimMappingEntry>,
}

impl ClaimMapping {
    /// Build a mapping from `(claim, field)` pairs
    pub fn from_pairs<I, C, F>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, F)>,
        C: Into<String>,
        F: Into<String>,
    {
        let mut mapping = Self {
            entries: Vec::new(),
        };
        for (claim, field) in pairs {
            mapping.insert(claim.into(), field.into());
        }
        mapping
    }

    /// Parse a mapping from a JSON object such as `{"sub": "subject"}`
    ///
    /// Object key order becomes the mapping order.
    pub fn from_json(json: &str) -> Result<Self, ClaimMappingError> {
        let Value::Object(object) = serde_json::from_str::<Value>(json)? else {
            return Err(ClaimMappingError::NotAnObject);
        };

        let mut pairs = Vec::with_capacity(object.len());
        for (claim, field) in object {
            match field {
                Value::String(field) => pairs.push((claim, field)),
                _ => return Err(ClaimMappingError::NonStringField(claim)),
            }
        }
        Ok(Self::from_pairs(pairs))
    }

    fn insert(&mut self, claim: String, field: String) {
        match self.entries.iter_mut().find(|e| e.claim == claim) {
            Some(entry) => entry.field = field,
            None => self.entries.push(ClaimMappingEntry { claim, field }),
        }
    }

    /// Output field for a claim, if mapped
    pub fn field_for(&self, claim: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.claim == claim)
            .map(|e| e.field.as_str())
    }

    /// Entries in mapping order
    pub fn iter(&self) -> impl Iterator<Item = &ClaimMappingEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ClaimMapping {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_MAPPING)
    }
}

impl From<Vec<ClaimMappingEntry>> for ClaimMapping {
    fn from(entries: Vec<ClaimMappingEntry>) -> Self {
        Self::from_pairs(entries.into_iter().map(|e| (e.claim, e.field)))
    }
}

impl From<ClaimMapping> for Vec<ClaimMappingEntry> {
    fn from(mapping: ClaimMapping) -> Self {
        mapping.entries
    }
}

/// A claim value after coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimValue {
    /// String form of the claim
    Text(String),
    /// Boolean claim (only `logged_in`)
    Flag(bool),
    /// List of strings (only `roles`)
    List(Vec<String>),
}

impl ClaimValue {
    /// Coerce a raw payload value according to the claim it came from
    ///
    /// `roles` stays a list when every element is a string, `logged_in` stays a
    /// boolean when it is one, and everything else becomes text.
    pub fn coerce(claim: &str, raw: &Value) -> Self {
        match (claim, raw) {
            (ROLES, Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(ClaimValue::List)
                .unwrap_or_else(|| ClaimValue::Text(raw.to_string())),
            (LOGGED_IN, Value::Bool(flag)) => ClaimValue::Flag(*flag),
            (_, Value::String(text)) => ClaimValue::Text(text.clone()),
            (_, other) => ClaimValue::Text(other.to_string()),
        }
    }
}

impl From<ClaimValue> for Value {
    fn from(value: ClaimValue) -> Self {
        match value {
            ClaimValue::Text(text) => Value::String(text),
            ClaimValue::Flag(flag) => Value::Bool(flag),
            ClaimValue::List(items) => Value::Array(items.into_iter().map(Value::String).collect()),
        }
    }
}

/// Output fields produced from one token, in mapping order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedClaims {
    fields: Vec<(String, ClaimValue)>,
}

impl ExtractedClaims {
    /// The result for a missing or unusable token
    pub fn anonymous() -> Self {
        let mut claims = Self::default();
        claims.insert(LOGGED_IN, ClaimValue::Flag(false));
        claims
    }

    fn insert(&mut self, field: impl Into<String>, value: ClaimValue) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Value for an output field
    pub fn get(&self, field: &str) -> Option<&ClaimValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Whether an output field is present
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Number of output fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no output fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Output fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClaimValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl IntoIterator for ExtractedClaims {
    type Item = (String, ClaimValue);
    type IntoIter = std::vec::IntoIter<(String, ClaimValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[derive(Debug, Error)]
enum TokenDecodeError {
    #[error("token must have exactly three dot-separated segments")]
    Segments,

    #[error("{0} segment is not valid base64url: {1}")]
    Base64(&'static str, base64::DecodeError),

    #[error("{0} segment is not valid JSON: {1}")]
    Json(&'static str, serde_json::Error),

    #[error("{0} segment is not a JSON object")]
    NotAnObject(&'static str),
}

/// Decodes bearer tokens into output fields under a [`ClaimMapping`]
#[derive(Clone)]
pub struct ClaimExtractor {
    mapping: ClaimMapping,
    diagnostics: Arc<dyn Diagnostics>,
}

impl ClaimExtractor {
    /// Create an extractor for the given mapping
    pub fn new(mapping: ClaimMapping, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            mapping,
            diagnostics,
        }
    }

    /// The mapping in use
    pub fn mapping(&self) -> &ClaimMapping {
        &self.mapping
    }

    /// Extract output fields from an `Authorization` header value
    ///
    /// Accepts `Bearer <token>` (prefix matched case-insensitively) or bare
    /// token text. The result always carries exactly one authentication flag:
    /// `logged_in = false` when the header is absent, blank, oversized or
    /// undecodable, and otherwise `true` unless the token itself says
    /// differently.
    pub fn extract(&self, authorization: Option<&str>) -> ExtractedClaims {
        let Some(token) = bearer_token(authorization) else {
            return ExtractedClaims::anonymous();
        };

        if token.len() > MAX_TOKEN_CHARS {
            let length = token.chars().count();
            if length > MAX_TOKEN_CHARS {
                self.diagnostics.report(DiagnosticEvent::OversizedToken {
                    length,
                    limit: MAX_TOKEN_CHARS,
                });
                return ExtractedClaims::anonymous();
            }
        }

        let payload = match decode_payload(token) {
            Ok(payload) => payload,
            Err(e) => {
                self.diagnostics.report(DiagnosticEvent::TokenDecodeFailed {
                    reason: e.to_string(),
                });
                return ExtractedClaims::anonymous();
            }
        };

        let mut claims = ExtractedClaims::default();
        for entry in self.mapping.iter() {
            match payload.get(&entry.claim) {
                None | Some(Value::Null) => continue,
                Some(raw) => claims.insert(entry.field.clone(), ClaimValue::coerce(&entry.claim, raw)),
            }
        }

        // A decodable token counts as authenticated even when none of the
        // mapped claims were present.
        match self.mapping.field_for(LOGGED_IN) {
            Some(field) if !claims.contains(field) => {
                claims.insert(field, ClaimValue::Flag(true));
            }
            Some(_) => {}
            None => claims.insert(LOGGED_IN, ClaimValue::Flag(true)),
        }

        claims
    }
}

impl std::fmt::Debug for ClaimExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimExtractor")
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

/// Strip an optional `Bearer ` prefix, returning `None` for blank input
fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    let value = authorization?.trim();
    let token = match value.get(..BEARER_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_PREFIX) => {
            value[BEARER_PREFIX.len()..].trim()
        }
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

fn decode_payload(token: &str) -> Result<Map<String, Value>, TokenDecodeError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenDecodeError::Segments);
    };

    decode_segment("header", header)?;
    decode_segment("payload", payload)
}

fn decode_segment(part: &'static str, segment: &str) -> Result<Map<String, Value>, TokenDecodeError> {
    let bytes = TOKEN_ENGINE
        .decode(segment)
        .map_err(|e| TokenDecodeError::Base64(part, e))?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(TokenDecodeError::NotAnObject(part)),
        Err(e) => Err(TokenDecodeError::Json(part, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mint_token, RecordingDiagnostics};
    use base64::Engine as _;
    use serde_json::json;

    fn mapping() -> ClaimMapping {
        ClaimMapping::from_pairs([
            ("sub", "subject"),
            ("email", "user_email"),
            ("name", "user_name"),
            ("roles", "roles"),
            ("logged_in", "logged_in"),
        ])
    }

    fn extractor(mapping: ClaimMapping) -> (ClaimExtractor, Arc<RecordingDiagnostics>) {
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        (ClaimExtractor::new(mapping, diagnostics.clone()), diagnostics)
    }

    fn text(value: &str) -> ClaimValue {
        ClaimValue::Text(value.to_string())
    }

    #[test]
    fn test_default_mapping_table() {
        let mapping = ClaimMapping::default();
        assert_eq!(mapping.len(), 15);
        assert_eq!(mapping.field_for("sub"), Some("subject"));
        assert_eq!(mapping.field_for("email"), Some("user_email"));
        assert_eq!(mapping.field_for("idp"), Some("user_id_provider"));
        assert_eq!(mapping.field_for("logged_in"), Some("logged_in"));
        assert_eq!(mapping.iter().next().map(|e| e.claim.as_str()), Some("sub"));
    }

    #[test]
    fn test_mapping_from_json_keeps_order() {
        let mapping =
            ClaimMapping::from_json(r#"{"z_claim": "z_field", "a_claim": "a_field"}"#).unwrap();
        let claims: Vec<_> = mapping.iter().map(|e| e.claim.as_str()).collect();
        assert_eq!(claims, vec!["z_claim", "a_claim"]);
    }

    #[test]
    fn test_mapping_from_json_rejects_bad_input() {
        assert!(matches!(
            ClaimMapping::from_json("not json"),
            Err(ClaimMappingError::Json(_))
        ));
        assert!(matches!(
            ClaimMapping::from_json(r#"["sub"]"#),
            Err(ClaimMappingError::NotAnObject)
        ));
        assert!(matches!(
            ClaimMapping::from_json(r#"{"sub": 1}"#),
            Err(ClaimMappingError::NonStringField(claim)) if claim == "sub"
        ));
    }

    #[test]
    fn test_mapping_duplicate_claim_replaces_field() {
        let mapping = ClaimMapping::from_pairs([("sub", "a"), ("email", "b"), ("sub", "c")]);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.field_for("sub"), Some("c"));
    }

    #[test]
    fn test_valid_token_extracts_claims() {
        let (extractor, _) = extractor(mapping());
        let token = mint_token(json!({
            "sub": "user123",
            "email": "user@example.com",
            "name": "John Doe"
        }));

        let claims = extractor.extract(Some(&format!("Bearer {token}")));

        assert_eq!(claims.get("subject"), Some(&text("user123")));
        assert_eq!(claims.get("user_email"), Some(&text("user@example.com")));
        assert_eq!(claims.get("user_name"), Some(&text("John Doe")));
        assert_eq!(claims.get("logged_in"), Some(&ClaimValue::Flag(true)));
    }

    #[test]
    fn test_claims_follow_mapping_order() {
        let (extractor, _) = extractor(mapping());
        let token = mint_token(json!({ "name": "John", "sub": "user123" }));

        let claims = extractor.extract(Some(&token));
        let fields: Vec<_> = claims.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, vec!["subject", "user_name", "logged_in"]);
    }

    #[test]
    fn test_absent_header_is_anonymous() {
        let (extractor, diagnostics) = extractor(mapping());
        let claims = extractor.extract(None);

        assert_eq!(claims, ExtractedClaims::anonymous());
        assert_eq!(claims.len(), 1);
        assert_eq!(claims.get("logged_in"), Some(&ClaimValue::Flag(false)));
        assert!(diagnostics.events().is_empty());
    }

    #[test]
    fn test_blank_header_is_anonymous() {
        let (extractor, _) = extractor(mapping());
        for header in ["", "   ", "\t\n", "Bearer ", "bearer    "] {
            let claims = extractor.extract(Some(header));
            assert_eq!(
                claims.get("logged_in"),
                Some(&ClaimValue::Flag(false)),
                "header {header:?}"
            );
            assert_eq!(claims.len(), 1);
        }
    }

    #[test]
    fn test_malformed_token_is_anonymous() {
        let (extractor, diagnostics) = extractor(mapping());
        for header in ["Bearer not.a.jwt", "Bearer abc", "Bearer a.b.c.d", "Bearer ..."] {
            assert_eq!(extractor.extract(Some(header)), ExtractedClaims::anonymous());
        }
        let events = diagnostics.events();
        assert_eq!(events.len(), 4);
        assert!(events
            .iter()
            .all(|e| matches!(e, DiagnosticEvent::TokenDecodeFailed { .. })));
    }

    #[test]
    fn test_payload_must_be_an_object() {
        let (extractor, _) = extractor(mapping());
        let header = TOKEN_ENGINE.encode(r#"{"alg":"none"}"#);
        let payload = TOKEN_ENGINE.encode(r#"["sub"]"#);
        let token = format!("{header}.{payload}.");

        assert_eq!(extractor.extract(Some(&token)), ExtractedClaims::anonymous());
    }

    #[test]
    fn test_unsigned_token_still_decodes() {
        let (extractor, _) = extractor(mapping());
        let header = TOKEN_ENGINE.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = TOKEN_ENGINE.encode(r#"{"sub":"user123"}"#);
        let token = format!("{header}.{payload}.");

        let claims = extractor.extract(Some(&token));
        assert_eq!(claims.get("subject"), Some(&text("user123")));
        assert_eq!(claims.get("logged_in"), Some(&ClaimValue::Flag(true)));
    }

    #[test]
    fn test_bearer_prefix_is_case_insensitive_and_optional() {
        let (extractor, _) = extractor(mapping());
        let token = mint_token(json!({ "sub": "user123" }));

        for header in [
            token.clone(),
            format!("Bearer {token}"),
            format!("bearer {token}"),
            format!("BEARER   {token}  "),
        ] {
            let claims = extractor.extract(Some(&header));
            assert_eq!(claims.get("subject"), Some(&text("user123")), "header {header:?}");
        }
    }

    #[test]
    fn test_missing_and_null_claims_are_omitted() {
        let (extractor, _) = extractor(mapping());
        let token = mint_token(json!({ "sub": "user123", "email": null }));

        let claims = extractor.extract(Some(&format!("Bearer {token}")));
        assert_eq!(claims.get("subject"), Some(&text("user123")));
        assert!(!claims.contains("user_email"));
        assert!(!claims.contains("user_name"));
    }

    #[test]
    fn test_roles_preserved_as_list() {
        let (extractor, _) = extractor(mapping());
        let token = mint_token(json!({ "roles": ["ADMIN", "USER"] }));

        let claims = extractor.extract(Some(&format!("Bearer {token}")));
        assert_eq!(
            claims.get("roles"),
            Some(&ClaimValue::List(vec!["ADMIN".into(), "USER".into()]))
        );
    }

    #[test]
    fn test_roles_fall_back_to_text() {
        let (extractor, _) = extractor(mapping());

        let token = mint_token(json!({ "roles": "ADMIN" }));
        let claims = extractor.extract(Some(&token));
        assert_eq!(claims.get("roles"), Some(&text("ADMIN")));

        let token = mint_token(json!({ "roles": ["ADMIN", 7] }));
        let claims = extractor.extract(Some(&token));
        assert_eq!(claims.get("roles"), Some(&text(r#"["ADMIN",7]"#)));
    }

    #[test]
    fn test_logged_in_claim_is_preserved() {
        let (extractor, _) = extractor(mapping());

        let token = mint_token(json!({ "logged_in": true }));
        let claims = extractor.extract(Some(&format!("Bearer {token}")));
        assert_eq!(claims.get("logged_in"), Some(&ClaimValue::Flag(true)));

        let token = mint_token(json!({ "logged_in": false }));
        let claims = extractor.extract(Some(&format!("Bearer {token}")));
        assert_eq!(claims.get("logged_in"), Some(&ClaimValue::Flag(false)));
        assert_eq!(claims.len(), 1);

        let token = mint_token(json!({ "logged_in": "yes" }));
        let claims = extractor.extract(Some(&format!("Bearer {token}")));
        assert_eq!(claims.get("logged_in"), Some(&text("yes")));
    }

    #[test]
    fn test_non_string_claims_use_text_form() {
        let (extractor, _) = extractor(ClaimMapping::from_pairs([
            ("user_id", "user_id"),
            ("verified", "verified"),
            ("org", "org"),
        ]));
        let token = mint_token(json!({
            "user_id": 42,
            "verified": true,
            "org": { "id": "o1" }
        }));

        let claims = extractor.extract(Some(&token));
        assert_eq!(claims.get("user_id"), Some(&text("42")));
        assert_eq!(claims.get("verified"), Some(&text("true")));
        assert_eq!(claims.get("org"), Some(&text(r#"{"id":"o1"}"#)));
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let (extractor, _) = extractor(mapping());
        let token = mint_token(json!({
            "sub": "user123",
            "email": "user@example.com",
            "exp": 1_000_000_000
        }));

        let claims = extractor.extract(Some(&format!("Bearer {token}")));
        assert_eq!(claims.get("subject"), Some(&text("user123")));
        assert_eq!(claims.get("user_email"), Some(&text("user@example.com")));
    }

    #[test]
    fn test_custom_mapping_without_logged_in_adds_fallback_flag() {
        let (extractor, _) = extractor(ClaimMapping::from_pairs([
            ("custom_id", "my_id"),
            ("custom_email", "my_email"),
        ]));
        let token = mint_token(json!({
            "custom_id": "abc",
            "custom_email": "test@test.com"
        }));

        let claims = extractor.extract(Some(&format!("Bearer {token}")));
        assert_eq!(claims.get("my_id"), Some(&text("abc")));
        assert_eq!(claims.get("my_email"), Some(&text("test@test.com")));
        assert_eq!(claims.get("logged_in"), Some(&ClaimValue::Flag(true)));
    }

    #[test]
    fn test_decodable_token_without_matching_claims_is_logged_in() {
        let (extractor, _) = extractor(ClaimMapping::from_pairs([("custom_id", "my_id")]));
        let token = mint_token(json!({ "unrelated": "value" }));

        let claims = extractor.extract(Some(&token));
        assert_eq!(claims.len(), 1);
        assert_eq!(claims.get("logged_in"), Some(&ClaimValue::Flag(true)));
    }

    #[test]
    fn test_renamed_logged_in_field_is_used_instead_of_fallback() {
        let (extractor, _) = extractor(ClaimMapping::from_pairs([
            ("sub", "subject"),
            ("logged_in", "authenticated"),
        ]));
        let token = mint_token(json!({ "sub": "user123" }));

        let claims = extractor.extract(Some(&token));
        assert_eq!(claims.get("authenticated"), Some(&ClaimValue::Flag(true)));
        assert!(!claims.contains("logged_in"));
    }

    #[test]
    fn test_oversized_token_is_anonymous() {
        let (extractor, diagnostics) = extractor(mapping());
        let header = format!("Bearer {}", "a".repeat(17_000));

        let claims = extractor.extract(Some(&header));
        assert_eq!(claims, ExtractedClaims::anonymous());
        assert_eq!(claims.len(), 1);
        assert_eq!(
            diagnostics.events(),
            vec![DiagnosticEvent::OversizedToken {
                length: 17_000,
                limit: MAX_TOKEN_CHARS
            }]
        );
    }

    /// A decodable unsigned token padded to `chars` characters with `filler`
    /// in the (uninspected) signature segment
    fn token_of_length(chars: usize, filler: char) -> String {
        let header = TOKEN_ENGINE.encode(r#"{"alg":"none"}"#);
        let payload = TOKEN_ENGINE.encode(r#"{"sub":"user123"}"#);
        let mut token = format!("{header}.{payload}.");
        let padding = chars - token.chars().count();
        token.extend(std::iter::repeat(filler).take(padding));
        token
    }

    #[test]
    fn test_token_at_size_limit_decodes() {
        let (extractor, diagnostics) = extractor(mapping());
        let token = token_of_length(MAX_TOKEN_CHARS, 'A');
        assert_eq!(token.len(), MAX_TOKEN_CHARS);

        let claims = extractor.extract(Some(&format!("Bearer {token}")));
        assert_eq!(claims.get("subject"), Some(&text("user123")));
        assert!(diagnostics.events().is_empty());
    }

    #[test]
    fn test_token_one_over_size_limit_is_anonymous() {
        let (extractor, diagnostics) = extractor(mapping());
        let token = token_of_length(MAX_TOKEN_CHARS + 1, 'A');

        let claims = extractor.extract(Some(&format!("Bearer {token}")));
        assert_eq!(claims, ExtractedClaims::anonymous());
        assert_eq!(
            diagnostics.events(),
            vec![DiagnosticEvent::OversizedToken {
                length: MAX_TOKEN_CHARS + 1,
                limit: MAX_TOKEN_CHARS
            }]
        );
    }

    #[test]
    fn test_multibyte_token_limit_counts_characters() {
        let (extractor, diagnostics) = extractor(mapping());

        let at_limit = token_of_length(MAX_TOKEN_CHARS, 'é');
        assert!(at_limit.len() > MAX_TOKEN_CHARS);
        let claims = extractor.extract(Some(&at_limit));
        assert_eq!(claims.get("subject"), Some(&text("user123")));
        assert!(diagnostics.events().is_empty());

        let over_limit = token_of_length(MAX_TOKEN_CHARS + 1, 'é');
        assert_eq!(extractor.extract(Some(&over_limit)), ExtractedClaims::anonymous());
        assert_eq!(
            diagnostics.events(),
            vec![DiagnosticEvent::OversizedToken {
                length: MAX_TOKEN_CHARS + 1,
                limit: MAX_TOKEN_CHARS
            }]
        );
    }

    #[test]
    fn test_token_under_size_limit_still_works() {
        let (extractor, _) = extractor(mapping());
        let token = mint_token(json!({ "sub": "user123" }));
        assert!(token.len() < MAX_TOKEN_CHARS);

        let claims = extractor.extract(Some(&format!("Bearer {token}")));
        assert_eq!(claims.get("subject"), Some(&text("user123")));
        assert_eq!(claims.get("logged_in"), Some(&ClaimValue::Flag(true)));
    }

    #[test]
    fn test_claim_value_into_json() {
        assert_eq!(Value::from(text("a")), json!("a"));
        assert_eq!(Value::from(ClaimValue::Flag(true)), json!(true));
        assert_eq!(
            Value::from(ClaimValue::List(vec!["A".into(), "B".into()])),
            json!(["A", "B"])
        );
    }
}
