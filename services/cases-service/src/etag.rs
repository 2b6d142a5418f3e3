//! Opaque entity tags.
//!
//! An etag names a record together with the version the client last saw.
//! Clients pass it back on update and delete so that concurrent writers do
//! not silently overwrite each other.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::fmt;
use thiserror::Error;

/// Kind of record an etag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EtagKind {
    /// A case.
    Case,
    /// A comment on a case.
    CaseComment,
    /// A link attached to a case.
    CaseLink,
}

impl EtagKind {
    const fn tag(self) -> &'static str {
        match self {
            Self::Case => "case",
            Self::CaseComment => "case_comment",
            Self::CaseLink => "case_link",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        [Self::Case, Self::CaseComment, Self::CaseLink]
            .into_iter()
            .find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for EtagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Errors decoding an etag.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EtagError {
    /// No etag was supplied.
    #[error("{0} etag is required")]
    Missing(EtagKind),
    /// The etag is not valid base64 or not in the expected layout.
    #[error("malformed {kind} etag: {raw}")]
    Malformed {
        /// Expected kind.
        kind: EtagKind,
        /// Offending input.
        raw: String,
    },
    /// The etag belongs to another kind of record.
    #[error("expected {expected} etag, got {found}")]
    KindMismatch {
        /// Expected kind.
        expected: EtagKind,
        /// Kind encoded in the etag.
        found: EtagKind,
    },
}

/// Decoded etag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Etag {
    /// Record kind.
    pub kind: EtagKind,
    /// Record id.
    pub id: i64,
    /// Record version; `None` when the client passed a bare id.
    pub ver: Option<i32>,
}

impl Etag {
    /// Etag of a record at a known version.
    #[must_use]
    pub const fn new(kind: EtagKind, id: i64, ver: i32) -> Self {
        Self {
            kind,
            id,
            ver: Some(ver),
        }
    }

    /// Encode as URL-safe base64 of `kind:id[:ver]`.
    #[must_use]
    pub fn encode(&self) -> String {
        let plain = match self.ver {
            Some(ver) => format!("{}:{}:{ver}", self.kind, self.id),
            None => format!("{}:{}", self.kind, self.id),
        };
        URL_SAFE_NO_PAD.encode(plain)
    }

    /// Decode an etag of the expected kind.
    ///
    /// A bare positive integer is accepted as an id without version.
    ///
    /// # Errors
    ///
    /// Returns [`EtagError`] when the input is empty, malformed, or names a
    /// different kind of record.
    pub fn parse(kind: EtagKind, raw: &str) -> Result<Self, EtagError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(EtagError::Missing(kind));
        }
        let malformed = || EtagError::Malformed {
            kind,
            raw: raw.to_string(),
        };

        if raw.bytes().all(|b| b.is_ascii_digit()) {
            let id = raw.parse::<i64>().ok().filter(|id| *id > 0).ok_or_else(malformed)?;
            return Ok(Self { kind, id, ver: None });
        }

        let bytes = URL_SAFE_NO_PAD.decode(raw).map_err(|_| malformed())?;
        let plain = String::from_utf8(bytes).map_err(|_| malformed())?;
        let mut parts = plain.split(':');

        let found = parts
            .next()
            .and_then(EtagKind::from_tag)
            .ok_or_else(malformed)?;
        if found != kind {
            return Err(EtagError::KindMismatch {
                expected: kind,
                found,
            });
        }

        let id = parts
            .next()
            .and_then(|id| id.parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(malformed)?;
        let ver = match parts.next() {
            Some(ver) => Some(
                ver.parse::<i32>()
                    .ok()
                    .filter(|ver| *ver >= 0)
                    .ok_or_else(malformed)?,
            ),
            None => None,
        };
        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(Self { kind, id, ver })
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_bare_id() {
        let etag = Etag::parse(EtagKind::Case, "42").expect("etag");
        assert_eq!(etag.id, 42);
        assert_eq!(etag.ver, None);
        assert!(Etag::parse(EtagKind::Case, "0").is_err());
    }

    #[test]
    fn test_parse_rejects_foreign_kind() {
        let link = Etag::new(EtagKind::CaseLink, 3, 1).encode();
        assert_eq!(
            Etag::parse(EtagKind::CaseComment, &link),
            Err(EtagError::KindMismatch {
                expected: EtagKind::CaseComment,
                found: EtagKind::CaseLink,
            })
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            Etag::parse(EtagKind::Case, "  "),
            Err(EtagError::Missing(EtagKind::Case))
        );
        for raw in ["!!!", "Y2FzZQ", "Y2FzZTphYmM", "Y2FzZTo1OjE6OQ"] {
            // "case", "case:abc", "case:5:1:9"
            assert!(
                matches!(
                    Etag::parse(EtagKind::Case, raw),
                    Err(EtagError::Malformed { .. })
                ),
                "{raw} should be malformed"
            );
        }
    }

    #[test]
    fn test_encoding_is_url_safe() {
        let etag = Etag::new(EtagKind::CaseComment, i64::MAX, i32::MAX).encode();
        assert!(etag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    proptest! {
        #[test]
        fn prop_encoded_etags_decode(id in 1i64.., ver in 0i32..) {
            for kind in [EtagKind::Case, EtagKind::CaseComment, EtagKind::CaseLink] {
                let etag = Etag::new(kind, id, ver);
                prop_assert_eq!(Etag::parse(kind, &etag.encode()), Ok(etag));
            }
        }
    }
}
