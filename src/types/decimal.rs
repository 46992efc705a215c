/*!
The fixed-point `decimal(P,S)` type (spec §3.1) and its canonical
unscaled two's-complement big-endian wire encoding (spec §4.2).
*/

use num_bigint::BigInt;

use crate::error::{IcebergError, Result};

/// A decimal value: an arbitrary-precision unscaled integer plus `(precision, scale)`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Decimal {
    value: BigInt,
    precision: u32,
    scale: u32,
}

impl Decimal {
    /// Creates a new [Decimal], validating precision/scale bounds and that
    /// the unscaled value fits within `precision` digits.
    pub fn new(value: BigInt, precision: u32, scale: u32) -> Result<Self> {
        if precision > 38 {
            return Err(IcebergError::InvalidInput(format!(
                "precision {precision} must be 38 or less"
            )));
        }
        if scale > precision {
            return Err(IcebergError::InvalidInput(format!(
                "scale {scale} is greater than precision {precision}"
            )));
        }
        let bytes = value.to_signed_bytes_be().len();
        if max_precision_for_byte_len(bytes) < precision as usize {
            return Err(IcebergError::InvalidInput(format!(
                "{bytes} bytes cannot hold precision {precision}"
            )));
        }
        Ok(Decimal {
            value,
            precision,
            scale,
        })
    }

    /// The unscaled integer value.
    pub fn unscaled(&self) -> &BigInt {
        &self.value
    }

    /// Total number of digits.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Number of digits right of the decimal point.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Encodes the unscaled value as minimal-length two's-complement big-endian bytes
    /// (the canonical statistics-bound encoding of spec §4.2).
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.value.to_signed_bytes_be()
    }

    /// Decodes a [Decimal] from minimal-length two's-complement big-endian bytes.
    pub fn from_be_bytes(bytes: &[u8], precision: u32, scale: u32) -> Result<Self> {
        Decimal::new(BigInt::from_signed_bytes_be(bytes), precision, scale)
    }
}

/// Largest decimal precision representable in `len` bytes of two's-complement storage.
fn max_precision_for_byte_len(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let bits = 8 * len as i32 - 1;
    (2.0_f64.powi(bits) - 1.0).log10().floor() as usize
}
