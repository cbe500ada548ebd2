//! HTTP Digest Authentication (RFC 7616).
//!
//! Supports MD5 and SHA-256, their `-sess` variants, and `qop=auth`.

use boring::hash::{hash, MessageDigest};
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("challenge has no nonce")]
    MissingNonce,
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),
    #[error("malformed parameter {0:?}")]
    MalformedParam(String),
    #[error("hash failed: {0}")]
    Crypto(#[from] boring::error::ErrorStack),
}

/// Digest authentication algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// No `algorithm` parameter; hashed as MD5 and not echoed back.
    #[default]
    Unspecified,
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl DigestAlgorithm {
    fn parse(s: &str) -> Result<Self, DigestError> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "md5-sess" => Ok(Self::Md5Sess),
            "sha-256" => Ok(Self::Sha256),
            "sha-256-sess" => Ok(Self::Sha256Sess),
            _ => Err(DigestError::UnsupportedAlgorithm(s.to_string())),
        }
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Self::Unspecified => None,
            Self::Md5 => Some("MD5"),
            Self::Md5Sess => Some("MD5-sess"),
            Self::Sha256 => Some("SHA-256"),
            Self::Sha256Sess => Some("SHA-256-sess"),
        }
    }

    fn digest(self) -> MessageDigest {
        match self {
            Self::Sha256 | Self::Sha256Sess => MessageDigest::sha256(),
            _ => MessageDigest::md5(),
        }
    }

    fn is_session(self) -> bool {
        matches!(self, Self::Md5Sess | Self::Sha256Sess)
    }
}

/// State parsed from one `WWW-Authenticate: Digest` challenge.
#[derive(Debug, Clone)]
pub struct DigestAuthHandler {
    realm: String,
    nonce: String,
    opaque: Option<String>,
    algorithm: DigestAlgorithm,
    /// Server offered `qop=auth`.
    qop_auth: bool,
    stale: bool,
    nonce_count: u32,
}

impl DigestAuthHandler {
    /// Parse the parameters of a challenge (the part after `Digest `).
    pub fn parse_challenge(params: &str) -> Result<Self, DigestError> {
        let mut handler = Self {
            realm: String::new(),
            nonce: String::new(),
            opaque: None,
            algorithm: DigestAlgorithm::default(),
            qop_auth: false,
            stale: false,
            nonce_count: 0,
        };

        for part in split_params(params) {
            let (key, value) = parse_param(part)?;
            match key.to_ascii_lowercase().as_str() {
                "realm" => handler.realm = value.to_string(),
                "nonce" => handler.nonce = value.to_string(),
                "opaque" => handler.opaque = Some(value.to_string()),
                "algorithm" => handler.algorithm = DigestAlgorithm::parse(value)?,
                "qop" => {
                    handler.qop_auth = value
                        .split(',')
                        .any(|q| q.trim().eq_ignore_ascii_case("auth"))
                }
                "stale" => handler.stale = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        if handler.nonce.is_empty() {
            return Err(DigestError::MissingNonce);
        }
        Ok(handler)
    }

    /// Build the `Authorization` header value for one request.
    pub fn generate_auth_token(
        &mut self,
        method: &str,
        uri: &str,
        username: &str,
        password: &str,
    ) -> Result<String, DigestError> {
        self.nonce_count += 1;
        let nc = format!("{:08x}", self.nonce_count);
        let cnonce = make_cnonce()?;

        let mut ha1 = self.hex_hash(&format!("{}:{}:{}", username, self.realm, password))?;
        if self.algorithm.is_session() {
            ha1 = self.hex_hash(&format!("{}:{}:{}", ha1, self.nonce, cnonce))?;
        }
        let ha2 = self.hex_hash(&format!("{}:{}", method, uri))?;
        let response = if self.qop_auth {
            self.hex_hash(&format!(
                "{}:{}:{}:{}:auth:{}",
                ha1, self.nonce, nc, cnonce, ha2
            ))?
        } else {
            self.hex_hash(&format!("{}:{}:{}", ha1, self.nonce, ha2))?
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{}\"",
            username, self.realm, self.nonce, uri, response
        );
        if let Some(name) = self.algorithm.name() {
            let _ = write!(header, ", algorithm={}", name);
        }
        if let Some(opaque) = &self.opaque {
            let _ = write!(header, ", opaque=\"{}\"", opaque);
        }
        if self.qop_auth {
            let _ = write!(header, ", qop=auth, nc={}, cnonce=\"{}\"", nc, cnonce);
        }
        Ok(header)
    }

    fn hex_hash(&self, input: &str) -> Result<String, DigestError> {
        let digest = hash(self.algorithm.digest(), input.as_bytes())?;
        Ok(to_hex(&digest))
    }

    /// The nonce expired but the credentials were accepted.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }
}

fn make_cnonce() -> Result<String, DigestError> {
    let mut buf = [0u8; 8];
    boring::rand::rand_bytes(&mut buf)?;
    Ok(to_hex(&buf))
}

fn to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

/// Split on commas outside quoted strings.
fn split_params(header: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (i, c) in header.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(header[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(header[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn parse_param(param: &str) -> Result<(&str, &str), DigestError> {
    let (key, value) = param
        .split_once('=')
        .ok_or_else(|| DigestError::MalformedParam(param.to_string()))?;
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Ok((key.trim(), value))
}
