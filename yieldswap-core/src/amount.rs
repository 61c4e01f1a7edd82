//! Base-unit amount handling.
//!
//! Amounts travel between services as integer strings in the asset's
//! smallest unit. They are never parsed as decimals or floats on the way from
//! a quote to a deposit request.

use std::fmt;

use crate::error::CoreError;

/// A non-negative amount in base units, paired with its decimal exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmountUnit {
  base_units: u64,
  exponent: u8,
}

impl AmountUnit {
  #[must_use]
  pub const fn new(base_units: u64, exponent: u8) -> AmountUnit {
    AmountUnit {
      base_units,
      exponent,
    }
  }

  /// Parses an integer string of base units.
  ///
  /// # Errors
  /// * Empty string, any non-ASCII-digit character, or a value beyond `u64`
  pub fn parse(encoded: &str, exponent: u8) -> Result<AmountUnit, CoreError> {
    let invalid = || CoreError::InvalidAmountEncoding(encoded.to_owned());
    if encoded.is_empty() || !encoded.bytes().all(|b| b.is_ascii_digit()) {
      return Err(invalid());
    }
    let base_units = encoded.parse::<u64>().map_err(|_| invalid())?;
    Ok(AmountUnit::new(base_units, exponent))
  }

  #[must_use]
  pub const fn base_units(&self) -> u64 {
    self.base_units
  }

  #[must_use]
  pub const fn exponent(&self) -> u8 {
    self.exponent
  }

  #[must_use]
  pub fn to_base_units_string(&self) -> String {
    self.base_units.to_string()
  }
}

impl fmt::Display for AmountUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.base_units)
  }
}

/// Translates a routing-service output amount into the deposit service's
/// amount field.
///
/// Both services speak base units, so this is an identity on valid input.
/// Its job is to refuse anything that is not an integer string.
///
/// # Errors
/// * `routed` is not an integer string that fits in `u64`
pub fn to_base_units(
  routed: &str,
  source_exponent: u8,
) -> Result<String, CoreError> {
  AmountUnit::parse(routed, source_exponent)?;
  Ok(routed.to_owned())
}

/// Parses a base-unit amount that must be strictly positive.
///
/// # Errors
/// * Invalid encoding, or zero
pub fn require_positive(encoded: &str) -> Result<u64, CoreError> {
  match AmountUnit::parse(encoded, 0)?.base_units() {
    0 => Err(CoreError::InvalidAmountEncoding(encoded.to_owned())),
    units => Ok(units),
  }
}
