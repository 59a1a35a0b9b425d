// src/version/mod.rs

//! Version handling and constraint satisfaction for package dependencies
//!
//! Registry tags are semantic versions with an optional leading `v`
//! (`v1.2.0`). Dependency constraints use the range language common to
//! package dependencies:
//!
//! - `>=1.0.0`, `<2.0.0`, `!=1.3.0`, `~1.2`, `^1.2`, `1.x`, `*`
//! - a bare version (`1.0.0`) means an exact match
//! - `,` or whitespace separated comparators are ANDed
//! - `||` separates alternatives
//! - `1.2 - 1.4.5` is an inclusive range
//!
//! A constraint may instead be a content digest (`sha256:<hex>`), which pins
//! an exact build and bypasses version selection entirely.

use semver::{Version, VersionReq};
use std::fmt;
use thiserror::Error;

/// Digest algorithms accepted in a pinned reference, with their hex length
const DIGEST_ALGORITHMS: &[(&str, usize)] = &[("sha256", 64), ("sha512", 128)];

/// Operators recognized at the start of a comparator, longest first
const OPERATORS: &[&str] = &[
    "==", "!=", ">=", "<=", "=<", "~>", "=", ">", "<", "~", "^",
];

/// Errors from parsing a constraint string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintParseError {
    #[error("empty constraint")]
    Empty,
    #[error("empty alternative in '{0}'")]
    EmptyAlternative(String),
    #[error("missing version after operator in '{0}'")]
    MissingVersion(String),
    #[error("invalid comparator '{comparator}': {reason}")]
    InvalidComparator { comparator: String, reason: String },
}

/// Check whether a string is a content digest reference
///
/// Format: `<algorithm>:<lowercase hex>` where the hex length is fixed by
/// the algorithm (`sha256` → 64, `sha512` → 128).
pub fn is_digest(s: &str) -> bool {
    let Some((algorithm, encoded)) = s.split_once(':') else {
        return false;
    };

    let Some(&(_, len)) = DIGEST_ALGORITHMS.iter().find(|(name, _)| *name == algorithm) else {
        return false;
    };

    encoded.len() == len
        && !encoded.bytes().any(|b| b.is_ascii_uppercase())
        && hex::decode(encoded).is_ok()
}

/// Parse a registry tag or version string into a semantic version
///
/// Accepts an optional leading `v` and partial versions (`1`, `1.2`), which
/// are padded with zeros. Returns `None` for anything else (e.g. `latest`).
pub fn parse_version(s: &str) -> Option<Version> {
    let s = s.trim();
    let s = s.strip_prefix('v').unwrap_or(s);

    if let Ok(v) = Version::parse(s) {
        return Some(v);
    }

    // Pad partial versions: "1.2" -> "1.2.0", "1.2-rc.1" -> "1.2.0-rc.1"
    let split = s.find(['-', '+']).unwrap_or(s.len());
    let (core, suffix) = s.split_at(split);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() >= 3
        || !parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);

    Version::parse(&padded).ok()
}

/// A registry tag that parsed as a semantic version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedVersion {
    /// The tag exactly as the registry reported it
    pub tag: String,
    pub version: Version,
}

/// Keep only tags that are semantic versions, sorted ascending
///
/// Non-semver tags are skipped. Sorting is stable, so tags naming the same
/// version (`1.0.0` and `v1.0.0`) keep their registry order.
pub fn semver_tags(tags: &[String]) -> Vec<TaggedVersion> {
    let mut versions: Vec<TaggedVersion> = tags
        .iter()
        .filter_map(|tag| {
            let parsed = parse_version(tag);
            if parsed.is_none() {
                tracing::debug!("Skipping non-semver tag {}", tag);
            }
            parsed.map(|version| TaggedVersion {
                tag: tag.clone(),
                version,
            })
        })
        .collect();

    versions.sort_by(|a, b| a.version.cmp(&b.version));
    versions
}

/// A single comparator within an alternative
#[derive(Debug, Clone, PartialEq, Eq)]
enum Comparator {
    /// Anything `semver` can express directly
    Req(VersionReq),
    /// `!=` has no `semver` equivalent
    NotEqual(Version),
}

impl Comparator {
    fn matches(&self, version: &Version) -> bool {
        match self {
            Comparator::Req(req) => req.matches(version),
            Comparator::NotEqual(v) => version != v,
        }
    }
}

/// A parsed version range
///
/// Satisfied when every comparator of at least one alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    original: String,
    alternatives: Vec<Vec<Comparator>>,
}

impl VersionConstraint {
    /// Parse a constraint string
    ///
    /// Examples:
    /// - ">=1.0.0" → at least 1.0.0
    /// - "1.0.0" → exactly 1.0.0
    /// - ">=1.0.0 <2.0.0" → 1.x
    /// - "^1.2 || ^2.0" → either major line
    pub fn parse(s: &str) -> Result<Self, ConstraintParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ConstraintParseError::Empty);
        }

        let alternatives = trimmed
            .split("||")
            .map(|alt| {
                let alt = alt.trim();
                if alt.is_empty() {
                    return Err(ConstraintParseError::EmptyAlternative(trimmed.to_string()));
                }
                parse_alternative(alt)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            original: trimmed.to_string(),
            alternatives,
        })
    }

    /// Check if a version satisfies this constraint
    pub fn satisfies(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|alt| alt.iter().all(|c| c.matches(version)))
    }

    /// The constraint text as written
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

fn parse_alternative(alt: &str) -> Result<Vec<Comparator>, ConstraintParseError> {
    if let Some((low, high)) = alt.split_once(" - ") {
        return Ok(vec![
            parse_comparator(&format!(">={}", low.trim()))?,
            parse_comparator(&format!("<={}", high.trim()))?,
        ]);
    }

    // Join dangling operators with their version: ">= 1.0" -> ">=1.0"
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;
    for word in alt.split([',', ' ', '\t']).filter(|w| !w.is_empty()) {
        if OPERATORS.contains(&word) {
            if pending_op.is_some() {
                return Err(ConstraintParseError::MissingVersion(alt.to_string()));
            }
            pending_op = Some(word);
            continue;
        }
        match pending_op.take() {
            Some(op) => tokens.push(format!("{op}{word}")),
            None => tokens.push(word.to_string()),
        }
    }
    if pending_op.is_some() {
        return Err(ConstraintParseError::MissingVersion(alt.to_string()));
    }

    tokens.iter().map(|t| parse_comparator(t)).collect()
}

fn parse_comparator(token: &str) -> Result<Comparator, ConstraintParseError> {
    let op = OPERATORS
        .iter()
        .find(|op| token.starts_with(**op))
        .copied()
        .unwrap_or("");
    let rest = token[op.len()..].trim();
    let rest = rest.strip_prefix('v').unwrap_or(rest);

    if rest.is_empty() {
        return Err(ConstraintParseError::MissingVersion(token.to_string()));
    }

    let invalid = |reason: String| ConstraintParseError::InvalidComparator {
        comparator: token.to_string(),
        reason,
    };

    if op == "!=" {
        let version =
            parse_version(rest).ok_or_else(|| invalid("not a version".to_string()))?;
        return Ok(Comparator::NotEqual(version));
    }

    let rest = rest
        .split('.')
        .map(|part| if part == "x" || part == "X" { "*" } else { part })
        .collect::<Vec<_>>()
        .join(".");
    let is_wildcard = rest.contains('*');
    let normalized = match op {
        "==" | "=" => format!("={rest}"),
        "=<" => format!("<={rest}"),
        "~>" => format!("~{rest}"),
        // Bare versions are exact; bare wildcards are ranges
        "" if is_wildcard => rest,
        "" => format!("={rest}"),
        _ => format!("{op}{rest}"),
    };

    VersionReq::parse(&normalized)
        .map(Comparator::Req)
        .map_err(|e| invalid(e.to_string()))
}
