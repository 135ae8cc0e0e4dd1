use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::error::{ConfigError, VerificationError};
use crate::types::Secret;

/// Keyed digest used to sign webhook bodies.
///
/// Implement this to support another algorithm; the verification call
/// site does not change.
pub trait DigestAlgorithm: fmt::Debug + Send + Sync {
    /// Token used before `=` in the signature header, e.g. `sha256`.
    fn name(&self) -> &'static str;

    /// Header the platform sends this signature in.
    fn header_name(&self) -> &'static str;

    /// HMAC of `data` keyed by `key`.
    fn mac(&self, key: &[u8], data: &[u8]) -> Vec<u8>;
}

/// HMAC-SHA256, sent as `X-Hub-Signature-256: sha256=<hex>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha256;

impl DigestAlgorithm for HmacSha256 {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn header_name(&self) -> &'static str {
        "X-Hub-Signature-256"
    }

    fn mac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut mac = Hmac::<sha2::Sha256>::new_from_slice(key)
            .expect("HMAC can take key of any size");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Legacy HMAC-SHA1, sent as `X-Hub-Signature: sha1=<hex>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha1;

impl DigestAlgorithm for HmacSha1 {
    fn name(&self) -> &'static str {
        "sha1"
    }

    fn header_name(&self) -> &'static str {
        "X-Hub-Signature"
    }

    fn mac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut mac = Hmac::<sha1::Sha1>::new_from_slice(key)
            .expect("HMAC can take key of any size");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Configuration-level algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha1,
    #[default]
    Sha256,
}

impl HashAlgorithm {
    pub fn digest(self) -> Arc<dyn DigestAlgorithm> {
        match self {
            HashAlgorithm::Sha1 => Arc::new(HmacSha1),
            HashAlgorithm::Sha256 => Arc::new(HmacSha256),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Secret and algorithm for a verifier, as loaded from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifierConfig {
    pub secret: Secret,
    #[serde(default)]
    pub algorithm: HashAlgorithm,
}

impl VerifierConfig {
    pub const SECRET_ENV: &'static str = "WEBHOOK_SECRET";
    pub const ALGORITHM_ENV: &'static str = "WEBHOOK_ALGORITHM";

    /// Read `WEBHOOK_SECRET` and optional `WEBHOOK_ALGORITHM` (default `sha256`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var(Self::SECRET_ENV)
            .map_err(|_| ConfigError::MissingEnv(Self::SECRET_ENV))?;
        let algorithm = match std::env::var(Self::ALGORITHM_ENV) {
            Ok(value) => value.parse()?,
            Err(_) => HashAlgorithm::default(),
        };
        Ok(Self {
            secret: Secret::from(secret),
            algorithm,
        })
    }
}

/// `<algorithm>=<hex-digest>` split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignature {
    pub algorithm: String,
    pub digest: Vec<u8>,
}

/// Parse a signature header such as `sha256=b328...`.
///
/// Never panics; anything that is not a non-empty alphanumeric token,
/// `=`, and a non-empty even-length hex string is `Malformed`.
pub fn parse_signature_header(header: &str) -> Result<ParsedSignature, VerificationError> {
    let (algorithm, hex_digest) = header
        .trim()
        .split_once('=')
        .ok_or(VerificationError::Malformed)?;

    if algorithm.is_empty() || !algorithm.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(VerificationError::Malformed);
    }
    if hex_digest.is_empty() {
        return Err(VerificationError::Malformed);
    }

    let digest = hex::decode(hex_digest).map_err(|_| VerificationError::Malformed)?;
    Ok(ParsedSignature {
        algorithm: algorithm.to_ascii_lowercase(),
        digest,
    })
}

/// Compute the raw HMAC digest a sender would sign `payload` with.
pub fn compute_signature(secret: &[u8], payload: &[u8], algorithm: &dyn DigestAlgorithm) -> Vec<u8> {
    algorithm.mac(secret, payload)
}

/// Format a digest as a header value, e.g. `sha256=<hex>`.
pub fn format_signature_header(algorithm: &dyn DigestAlgorithm, digest: &[u8]) -> String {
    format!("{}={}", algorithm.name(), hex::encode(digest))
}

/// Compare two byte strings without exiting early on the first difference.
///
/// Only the length comparison is variable-time; lengths are public.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Checks inbound bodies against a shared secret.
///
/// Immutable after construction and cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Secret,
    algorithm: Arc<dyn DigestAlgorithm>,
}

impl SignatureVerifier {
    pub fn new(
        secret: impl Into<Secret>,
        algorithm: Arc<dyn DigestAlgorithm>,
    ) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        Ok(Self { secret, algorithm })
    }

    pub fn sha256(secret: impl Into<Secret>) -> Result<Self, ConfigError> {
        Self::new(secret, Arc::new(HmacSha256))
    }

    pub fn sha1(secret: impl Into<Secret>) -> Result<Self, ConfigError> {
        Self::new(secret, Arc::new(HmacSha1))
    }

    pub fn from_config(config: &VerifierConfig) -> Result<Self, ConfigError> {
        Self::new(config.secret.clone(), config.algorithm.digest())
    }

    pub fn algorithm(&self) -> &dyn DigestAlgorithm {
        self.algorithm.as_ref()
    }

    /// Header this verifier expects the signature in.
    pub fn header_name(&self) -> &'static str {
        self.algorithm.header_name()
    }

    /// Verify `raw_body`, exactly as received, against `signature_header`.
    pub fn verify(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), VerificationError> {
        let header = signature_header.ok_or(VerificationError::Missing)?;
        let parsed = parse_signature_header(header)?;

        let expected = self.algorithm.mac(self.secret.expose(), raw_body);
        let algorithm_ok = parsed.algorithm == self.algorithm.name();
        let digest_ok = constant_time_eq(&expected, &parsed.digest);

        if algorithm_ok && digest_ok {
            Ok(())
        } else {
            Err(VerificationError::Mismatch)
        }
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("algorithm", &self.algorithm.name())
            .finish_non_exhaustive()
    }
}

/// Whether the dispatcher checks signatures.
///
/// `Disabled` is an explicit choice for development and tests, never a
/// fallback on error.
#[derive(Debug, Clone)]
pub enum Verification {
    Enabled(SignatureVerifier),
    Disabled,
}

impl Verification {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Verification::Enabled(_))
    }

    /// Signature header name, when verification is enabled.
    pub fn header_name(&self) -> Option<&'static str> {
        match self {
            Verification::Enabled(verifier) => Some(verifier.header_name()),
            Verification::Disabled => None,
        }
    }
}

impl From<SignatureVerifier> for Verification {
    fn from(verifier: SignatureVerifier) -> Self {
        Verification::Enabled(verifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FOO_SHA256: &str =
        "sha256=b3282a0e9609a79c78608f16e3bca802c02fdd43988bbc78aed0dfbf7c9a910a";
    const FOO_SHA1: &str = "sha1=239fff28115aaad359ede61542d2a9eedd5f5f6c";

    fn sign(verifier: &SignatureVerifier, secret: &[u8], body: &[u8]) -> String {
        let digest = compute_signature(secret, body, verifier.algorithm());
        format_signature_header(verifier.algorithm(), &digest)
    }

    #[test]
    fn test_known_sha256_vector() {
        let verifier = SignatureVerifier::sha256("mysecret").unwrap();
        assert_eq!(verifier.verify(b"foo", Some(FOO_SHA256)), Ok(()));
        assert_eq!(sign(&verifier, b"mysecret", b"foo"), FOO_SHA256);
    }

    #[test]
    fn test_known_sha1_vector() {
        let verifier = SignatureVerifier::sha1("mysecret").unwrap();
        assert_eq!(verifier.verify(b"foo", Some(FOO_SHA1)), Ok(()));
        assert_eq!(sign(&verifier, b"mysecret", b"foo"), FOO_SHA1);
    }

    #[test]
    fn test_missing_header() {
        let verifier = SignatureVerifier::sha256("mysecret").unwrap();
        assert_eq!(verifier.verify(b"foo", None), Err(VerificationError::Missing));
    }

    #[test]
    fn test_malformed_headers() {
        let verifier = SignatureVerifier::sha256("mysecret").unwrap();
        for header in ["", "sha256", "sha256=", "=abcd", "sha256=xyz", "sha256=abc", "sha 256=ab"] {
            assert_eq!(
                verifier.verify(b"foo", Some(header)),
                Err(VerificationError::Malformed),
                "header {:?}",
                header
            );
        }
    }

    #[test]
    fn test_algorithm_mismatch_is_rejected() {
        let verifier = SignatureVerifier::sha256("mysecret").unwrap();
        assert_eq!(
            verifier.verify(b"foo", Some(FOO_SHA1)),
            Err(VerificationError::Mismatch)
        );
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let verifier = SignatureVerifier::sha256("mysecret").unwrap();
        let upper = format!("sha256={}", FOO_SHA256["sha256=".len()..].to_ascii_uppercase());
        assert_eq!(verifier.verify(b"foo", Some(upper.as_str())), Ok(()));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert_eq!(
            SignatureVerifier::sha256("").unwrap_err(),
            ConfigError::EmptySecret
        );
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("SHA1".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha1);
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert!(matches!(
            "md5".parse::<HashAlgorithm>(),
            Err(ConfigError::UnknownAlgorithm(ref a)) if a == "md5"
        ));
    }

    #[test]
    fn test_verifier_config_deserializes() {
        let config: VerifierConfig =
            serde_json::from_str(r#"{"secret":"mysecret","algorithm":"sha1"}"#).unwrap();
        let verifier = SignatureVerifier::from_config(&config).unwrap();
        assert_eq!(verifier.algorithm().name(), "sha1");
        assert_eq!(verifier.header_name(), "X-Hub-Signature");

        let config: VerifierConfig = serde_json::from_str(r#"{"secret":"s"}"#).unwrap();
        assert_eq!(config.algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_debug_hides_secret() {
        let verifier = SignatureVerifier::sha256("mysecret").unwrap();
        let text = format!("{:?}", verifier);
        assert!(!text.contains("mysecret"));
        assert!(text.contains("sha256"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"xbc"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    proptest! {
        #[test]
        fn prop_sign_verify_roundtrip(body in any::<Vec<u8>>(), secret in prop::collection::vec(any::<u8>(), 1..64)) {
            for verifier in [
                SignatureVerifier::sha256(secret.clone()).unwrap(),
                SignatureVerifier::sha1(secret.clone()).unwrap(),
            ] {
                let header = sign(&verifier, &secret, &body);
                prop_assert_eq!(verifier.verify(&body, Some(header.as_str())), Ok(()));
            }
        }

        #[test]
        fn prop_single_byte_tamper_detected(
            body in prop::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut tampered = body.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= flip;

            for verifier in [
                SignatureVerifier::sha256("mysecret").unwrap(),
                SignatureVerifier::sha1("mysecret").unwrap(),
            ] {
                let header = sign(&verifier, b"mysecret", &body);
                prop_assert_eq!(
                    verifier.verify(&tampered, Some(header.as_str())),
                    Err(VerificationError::Mismatch)
                );
            }
        }

        #[test]
        fn prop_arbitrary_header_never_panics(header in any::<String>(), body in any::<Vec<u8>>()) {
            let verifier = SignatureVerifier::sha256("mysecret").unwrap();
            let _ = parse_signature_header(&header);
            let _ = verifier.verify(&body, Some(header.as_str()));
        }
    }
}
