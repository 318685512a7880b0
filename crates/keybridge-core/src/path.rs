//! BIP32 derivation paths and the textual path resolver
//!
//! Paths are written in the usual hierarchical notation, e.g. `m/44'/0'/0'/0/1`.
//! The root marker is optional and a hardened index may be marked with `'`,
//! `h` or `H`.

use bitcoin::bip32::{self, ChildNumber};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::trace;

/// First hardened index; normal and hardened indices must stay below it
pub const HARDENED_OFFSET: u32 = 1 << 31;

/// Longest path string accepted by the resolver
pub const MAX_PATH_LEN: usize = 510;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Path string empty")]
    Empty,
    #[error("Path string too long ({len} > {max} bytes)")]
    TooLong { len: usize, max: usize },
    #[error("Malformed path segment '{segment}'")]
    Malformed { segment: String },
    #[error("Path index out of range in segment '{segment}'")]
    Overflow { segment: String },
}

/// A single step in a derivation path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildIndex {
    Normal(u32),
    Hardened(u32),
}

impl ChildIndex {
    /// Index without the hardened flag
    pub fn index(&self) -> u32 {
        match *self {
            Self::Normal(i) | Self::Hardened(i) => i,
        }
    }

    pub fn is_hardened(&self) -> bool {
        matches!(self, Self::Hardened(_))
    }

    /// BIP32 wire form, hardened indices carry the high bit
    pub fn to_u32(&self) -> u32 {
        match *self {
            Self::Normal(i) => i,
            Self::Hardened(i) => i | HARDENED_OFFSET,
        }
    }
}

impl From<u32> for ChildIndex {
    fn from(raw: u32) -> Self {
        if raw & HARDENED_OFFSET != 0 {
            Self::Hardened(raw & !HARDENED_OFFSET)
        } else {
            Self::Normal(raw)
        }
    }
}

impl From<ChildIndex> for ChildNumber {
    fn from(child: ChildIndex) -> Self {
        match child {
            ChildIndex::Normal(index) => ChildNumber::Normal { index },
            ChildIndex::Hardened(index) => ChildNumber::Hardened { index },
        }
    }
}

impl fmt::Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal(i) => write!(f, "{}", i),
            Self::Hardened(i) => write!(f, "{}'", i),
        }
    }
}

/// Ordered sequence of child indices from the master key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildIndex>);

impl DerivationPath {
    pub fn new(children: Vec<ChildIndex>) -> Self {
        Self(children)
    }

    /// Path used when a caller does not supply one: the single root index 0
    pub fn default_root() -> Self {
        Self(vec![ChildIndex::Normal(0)])
    }

    pub fn children(&self) -> &[ChildIndex] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Indices in BIP32 wire form
    pub fn to_u32_vec(&self) -> Vec<u32> {
        self.0.iter().map(ChildIndex::to_u32).collect()
    }
}

impl From<&DerivationPath> for bip32::DerivationPath {
    fn from(path: &DerivationPath) -> Self {
        path.0
            .iter()
            .copied()
            .map(ChildNumber::from)
            .collect::<Vec<_>>()
            .into()
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for child in &self.0 {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for DerivationPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s)
    }
}

/// Parse a textual derivation path
pub fn resolve(text: &str) -> Result<DerivationPath, PathError> {
    if text.is_empty() {
        return Err(PathError::Empty);
    }
    if text.len() > MAX_PATH_LEN {
        return Err(PathError::TooLong {
            len: text.len(),
            max: MAX_PATH_LEN,
        });
    }

    let mut segments = text.split('/').peekable();
    if matches!(segments.peek(), Some(&"m") | Some(&"M")) {
        segments.next();
    }

    let children = segments
        .map(parse_segment)
        .collect::<Result<Vec<_>, _>>()?;

    if children.is_empty() {
        return Err(PathError::Empty);
    }

    trace!(path = %text, depth = children.len(), "Resolved derivation path");
    Ok(DerivationPath(children))
}

fn parse_segment(segment: &str) -> Result<ChildIndex, PathError> {
    let (digits, hardened) = match segment.strip_suffix(['\'', 'h', 'H']) {
        Some(rest) => (rest, true),
        None => (segment, false),
    };

    // u32::from_str would also accept a leading '+'
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PathError::Malformed {
            segment: segment.to_string(),
        });
    }

    let index = digits
        .parse::<u32>()
        .ok()
        .filter(|&i| i < HARDENED_OFFSET)
        .ok_or_else(|| PathError::Overflow {
            segment: segment.to_string(),
        })?;

    Ok(if hardened {
        ChildIndex::Hardened(index)
    } else {
        ChildIndex::Normal(index)
    })
}
