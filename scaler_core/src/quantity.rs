//! Exact-integer-bytes memory quantity, replacing the ad-hoc suffix parsing
//! of the original `memory_optimizer.py`/`node_scaler.py` (§9 design note).

use std::fmt;
use std::str::FromStr;

const KI: i64 = 1024;
const MI: i64 = 1024 * 1024;
const GI: i64 = 1024 * 1024 * 1024;
const K: i64 = 1000;
const M: i64 = 1000 * 1000;
const G: i64 = 1000 * 1000 * 1000;

/// A memory quantity with exact integer byte semantics. Parses the suffixes
/// `Ki, Mi, Gi, K, M, G` and bare decimal byte counts; formats back out as
/// the largest binary unit that divides evenly into whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quantity {
  bytes: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuantityError {
  #[error("invalid quantity string: {0}")]
  Invalid(String),
}

impl Quantity {
  pub fn from_bytes(bytes: i64) -> Self {
    Self { bytes }
  }

  pub fn bytes(&self) -> i64 {
    self.bytes
  }

  pub fn clamp(&self, min: Quantity, max: Quantity) -> Quantity {
    Quantity::from_bytes(self.bytes.clamp(min.bytes, max.bytes))
  }

  pub fn scale(&self, factor: f64) -> Quantity {
    Quantity::from_bytes((self.bytes as f64 * factor) as i64)
  }
}

impl FromStr for Quantity {
  type Err = QuantityError;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return Err(QuantityError::Invalid(raw.to_string()));
    }

    let (numeric, multiplier) = if let Some(n) = trimmed.strip_suffix("Gi") {
      (n, GI)
    } else if let Some(n) = trimmed.strip_suffix("Mi") {
      (n, MI)
    } else if let Some(n) = trimmed.strip_suffix("Ki") {
      (n, KI)
    } else if let Some(n) = trimmed.strip_suffix('G') {
      (n, G)
    } else if let Some(n) = trimmed.strip_suffix('M') {
      (n, M)
    } else if let Some(n) = trimmed.strip_suffix('K') {
      (n, K)
    } else {
      (trimmed, 1)
    };

    let value: f64 = numeric
      .parse()
      .map_err(|_| QuantityError::Invalid(raw.to_string()))?;

    Ok(Quantity::from_bytes((value * multiplier as f64) as i64))
  }
}

impl fmt::Display for Quantity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.bytes >= GI && self.bytes % GI == 0 {
      write!(f, "{}Gi", self.bytes / GI)
    } else if self.bytes >= MI {
      write!(f, "{}Mi", self.bytes / MI)
    } else {
      write!(f, "{}Ki", self.bytes / KI)
    }
  }
}

/// Parses a memory string, defaulting to 256Mi when absent/unset — matches
/// the memory optimiser's "first container's limit, default 256Mi" rule.
pub fn parse_or_default_256mi(raw: Option<&str>) -> Quantity {
  raw
    .and_then(|s| Quantity::from_str(s).ok())
    .unwrap_or_else(|| Quantity::from_str("256Mi").unwrap())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_binary_and_decimal_suffixes() {
    assert_eq!(Quantity::from_str("256Mi").unwrap().bytes(), 256 * MI);
    assert_eq!(Quantity::from_str("2Gi").unwrap().bytes(), 2 * GI);
    assert_eq!(Quantity::from_str("128Ki").unwrap().bytes(), 128 * KI);
    assert_eq!(Quantity::from_str("5G").unwrap().bytes(), 5 * G);
    assert_eq!(Quantity::from_str("10M").unwrap().bytes(), 10 * M);
    assert_eq!(Quantity::from_str("100K").unwrap().bytes(), 100 * K);
    assert_eq!(Quantity::from_str("1024").unwrap().bytes(), 1024);
  }

  #[test]
  fn rejects_malformed_strings() {
    assert!(Quantity::from_str("notanumber").is_err());
    assert!(Quantity::from_str("").is_err());
  }

  #[test]
  fn formats_back_to_largest_whole_unit() {
    assert_eq!(Quantity::from_bytes(384 * MI).to_string(), "384Mi");
    assert_eq!(Quantity::from_bytes(2 * GI).to_string(), "2Gi");
  }

  #[test]
  fn clamp_bounds_to_128mi_2gi() {
    let min = Quantity::from_str("128Mi").unwrap();
    let max = Quantity::from_str("2Gi").unwrap();
    let huge = Quantity::from_bytes(100 * GI);
    assert_eq!(huge.clamp(min, max), max);
    let tiny = Quantity::from_bytes(1);
    assert_eq!(tiny.clamp(min, max), min);
  }

  #[test]
  fn default_when_absent() {
    assert_eq!(parse_or_default_256mi(None).bytes(), 256 * MI);
  }
}
