//! Sized integer kinds
//!
//! Script integers carry a 64-bit payload plus a kind tag drawn from the
//! closed set of eight fixed-width representations. This module is the pure,
//! stateless side of integer semantics: ranges, promotion, literal suffixes.
//! The arithmetic that consumes these rules lives in the type dispatch layer.

use crate::runtime::error::{RtResult, RuntimeError};
use std::fmt;
use std::str::FromStr;

/// A fixed-width integer representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

/// The kind an unsuffixed integer literal gets.
pub const DEFAULT_INT: IntKind = IntKind::I32;

impl IntKind {
    /// All kinds, in declaration order. Handy for exhaustive tests.
    pub const ALL: [IntKind; 8] = [
        IntKind::I8,
        IntKind::I16,
        IntKind::I32,
        IntKind::I64,
        IntKind::U8,
        IntKind::U16,
        IntKind::U32,
        IntKind::U64,
    ];

    pub fn is_signed(self) -> bool {
        matches!(self, IntKind::I8 | IntKind::I16 | IntKind::I32 | IntKind::I64)
    }

    pub fn is_unsigned(self) -> bool {
        !self.is_signed()
    }

    pub fn bit_size(self) -> u32 {
        match self {
            IntKind::I8 | IntKind::U8 => 8,
            IntKind::I16 | IntKind::U16 => 16,
            IntKind::I32 | IntKind::U32 => 32,
            IntKind::I64 | IntKind::U64 => 64,
        }
    }

    pub fn byte_size(self) -> u32 {
        self.bit_size() / 8
    }

    /// Smallest payload representable by this kind.
    pub fn min_value(self) -> i64 {
        match self {
            IntKind::I8 => -128,
            IntKind::I16 => -32768,
            IntKind::I32 => -2147483648,
            IntKind::I64 => i64::MIN,
            IntKind::U8 | IntKind::U16 | IntKind::U32 | IntKind::U64 => 0,
        }
    }

    /// Largest payload representable by this kind.
    ///
    /// `U64` reports `i64::MAX`, not 2^64-1: the payload is an `i64`, so the
    /// upper half of the true unsigned range is not representable. Kept this
    /// way deliberately; see DESIGN.md.
    pub fn max_value(self) -> i64 {
        match self {
            IntKind::I8 => 127,
            IntKind::I16 => 32767,
            IntKind::I32 => 2147483647,
            IntKind::I64 => i64::MAX,
            IntKind::U8 => 255,
            IntKind::U16 => 65535,
            IntKind::U32 => 4294967295,
            IntKind::U64 => i64::MAX,
        }
    }

    /// Whether `value` is within this kind's range.
    pub fn value_fits(
        self,
        value: i64,
    ) -> bool {
        value >= self.min_value() && value <= self.max_value()
    }

    /// Clamp `value` into this kind's range.
    pub fn clamp_to_range(
        self,
        value: i64,
    ) -> i64 {
        value.clamp(self.min_value(), self.max_value())
    }

    /// The unsigned kind of the same width (identity for unsigned kinds).
    pub fn to_unsigned(self) -> IntKind {
        match self {
            IntKind::I8 => IntKind::U8,
            IntKind::I16 => IntKind::U16,
            IntKind::I32 => IntKind::U32,
            IntKind::I64 => IntKind::U64,
            other => other,
        }
    }

    /// The signed kind of the same width (identity for signed kinds).
    pub fn to_signed(self) -> IntKind {
        match self {
            IntKind::U8 => IntKind::I8,
            IntKind::U16 => IntKind::I16,
            IntKind::U32 => IntKind::I32,
            IntKind::U64 => IntKind::I64,
            other => other,
        }
    }

    /// Whether a value of kind `self` converts implicitly to kind `to`.
    ///
    /// Widening within the same signedness is implicit, as is unsigned to a
    /// strictly wider signed kind. Everything else needs an explicit cast.
    pub fn can_convert_to(
        self,
        to: IntKind,
    ) -> bool {
        if self == to {
            return true;
        }
        let from_bits = self.bit_size();
        let to_bits = to.bit_size();
        if self.is_signed() == to.is_signed() && to_bits >= from_bits {
            return true;
        }
        self.is_unsigned() && to.is_signed() && to_bits > from_bits
    }

    /// Name with the classic `int` alias for the default kind.
    pub fn canonical_name(
        self,
        prefer_classic: bool,
    ) -> &'static str {
        if prefer_classic && self == DEFAULT_INT {
            "int"
        } else {
            self.name()
        }
    }

    fn name(self) -> &'static str {
        match self {
            IntKind::I8 => "i8",
            IntKind::I16 => "i16",
            IntKind::I32 => "i32",
            IntKind::I64 => "i64",
            IntKind::U8 => "u8",
            IntKind::U16 => "u16",
            IntKind::U32 => "u32",
            IntKind::U64 => "u64",
        }
    }
}

impl fmt::Display for IntKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IntKind {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i8" => Ok(IntKind::I8),
            "i16" => Ok(IntKind::I16),
            "i32" => Ok(IntKind::I32),
            "i64" => Ok(IntKind::I64),
            "u8" => Ok(IntKind::U8),
            "u16" => Ok(IntKind::U16),
            "u32" => Ok(IntKind::U32),
            "u64" => Ok(IntKind::U64),
            // "int" is the literal alias for the default kind
            "int" => Ok(DEFAULT_INT),
            _ => Err(RuntimeError::Value(format!("Unknown integer kind: {s}"))),
        }
    }
}

/// Kind for the result of mixed-kind arithmetic.
///
/// Equal kinds stay put; differing widths widen to the larger. Mixed
/// signedness promotes to a signed kind wide enough for the unsigned
/// operand's range: u8 -> i16, u16 -> i32, and anything involving u32 or a
/// 64-bit operand lands on i64. Commutative by construction.
pub fn promote_kinds(
    left: IntKind,
    right: IntKind,
) -> IntKind {
    if left == right {
        return left;
    }

    let left_bits = left.bit_size();
    let right_bits = right.bit_size();

    if left.is_signed() == right.is_signed() {
        return if left_bits >= right_bits { left } else { right };
    }

    // Mixed signedness. Identify the operand that dominates by width, with
    // the unsigned one winning ties so its range drives the widening below.
    let larger = if left_bits > right_bits {
        left
    } else if right_bits > left_bits {
        right
    } else if right.is_unsigned() {
        right
    } else {
        left
    };

    if left_bits.max(right_bits) > 32 || larger == IntKind::U32 {
        return IntKind::I64;
    }

    match larger {
        IntKind::U8 => IntKind::I16,
        IntKind::U16 => IntKind::I32,
        other => other,
    }
}

/// Smallest kind whose range contains `value`.
///
/// Negative values force signed kinds. For non-negative values the signed
/// ladder is tried first when `prefer_signed`, otherwise the unsigned one.
pub fn smallest_kind_for_value(
    value: i64,
    prefer_signed: bool,
) -> IntKind {
    if value < 0 {
        if value >= -128 {
            return IntKind::I8;
        }
        if value >= -32768 {
            return IntKind::I16;
        }
        if value >= -2147483648 {
            return IntKind::I32;
        }
        return IntKind::I64;
    }

    if prefer_signed {
        if value <= 127 {
            return IntKind::I8;
        }
        if value <= 32767 {
            return IntKind::I16;
        }
        if value <= 2147483647 {
            return IntKind::I32;
        }
        return IntKind::I64;
    }

    if value <= 255 {
        return IntKind::U8;
    }
    if value <= 65535 {
        return IntKind::U16;
    }
    if value <= 4294967295 {
        return IntKind::U32;
    }
    IntKind::U64
}

/// Kind for an integer literal suffix, case-insensitive.
///
/// An empty suffix yields [`DEFAULT_INT`]; anything outside the closed set is
/// a `ValueError`.
pub fn parse_literal_suffix(suffix: &str) -> RtResult<IntKind> {
    if suffix.is_empty() {
        return Ok(DEFAULT_INT);
    }
    let lower = suffix.to_ascii_lowercase();
    if lower == "int" {
        // The "int" alias is a type name, not a literal suffix.
        return Err(RuntimeError::Value(format!(
            "Invalid integer literal suffix: {suffix}"
        )));
    }
    lower
        .parse::<IntKind>()
        .map_err(|_| RuntimeError::Value(format!("Invalid integer literal suffix: {suffix}")))
}
