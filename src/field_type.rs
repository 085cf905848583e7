//! Component B — the closed field-type tag set and display bases.
//!
//! Grounded in `epan/proto.c`'s `ftenum_t`/`field_display_e` pair
//! (`examples/original_source/epan/proto.c`) and in the hand-written Rust
//! enums other dissector-style crates in the pack use for the same purpose,
//! e.g. `examples/other_examples/92962008_..._ethernet_ii.rs.rs`.

use serde::{Deserialize, Serialize};

/// The closed set of semantic field types a `Value` can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    None,
    Protocol,
    Bytes,
    UintBytes,
    Bool,
    Uint8,
    Uint16,
    Uint24,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int24,
    Int32,
    Int64,
    FrameNum,
    IPv4,
    IPv6,
    IpxNet,
    Ether,
    String,
    StringZ,
    UintString,
    AbsTime,
    RelTime,
    Float,
    Double,
}

impl FieldType {
    /// Intrinsic serialized width in bytes, where the type has a fixed one.
    /// `None`/`Protocol`/`Bytes`/`String`/`StringZ`/`UintString` have no
    /// fixed width — their length is resolved per-call (see `builder`).
    pub fn fixed_width(self) -> Option<usize> {
        use FieldType::*;
        match self {
            Uint8 | Int8 | Bool => Some(1),
            Uint16 | Int16 => Some(2),
            Uint24 | Int24 => Some(3),
            Uint32 | Int32 | FrameNum | IPv4 | IpxNet | Float => Some(4),
            Uint64 | Int64 | Double | AbsTime | RelTime => Some(8),
            IPv6 => Some(16),
            Ether => Some(6),
            None | Protocol | Bytes | UintBytes | String | StringZ | UintString => None,
        }
    }

    /// Bit width used when rendering a bitmask diagram, derived from the
    /// integer/boolean type's byte width; grounded in proto.c's
    /// `hfinfo_bitwidth`.
    pub fn bit_width(self) -> Option<u32> {
        use FieldType::*;
        match self {
            Uint8 | Int8 | Bool => Some(8),
            Uint16 | Int16 => Some(16),
            Uint24 | Int24 => Some(24),
            Uint32 | Int32 => Some(32),
            _ => None,
        }
    }

    /// Whether a `bitmask` is permitted on an HFI of this type.
    pub fn allows_bitmask(self) -> bool {
        use FieldType::*;
        matches!(
            self,
            Bool | Uint8
                | Uint16
                | Uint24
                | Uint32
                | Uint64
                | Int8
                | Int16
                | Int24
                | Int32
                | Int64
        )
    }

    /// Whether a `value_map`/`true_false` mapping is permitted.
    pub fn allows_value_map(self) -> bool {
        use FieldType::*;
        matches!(
            self,
            Bool | Uint8
                | Uint16
                | Uint24
                | Uint32
                | Int8
                | Int16
                | Int24
                | Int32
                | FrameNum
        )
    }

    /// Whether this type requires a non-`None` `DisplayBase`.
    pub fn requires_display_base(self) -> bool {
        use FieldType::*;
        matches!(
            self,
            Uint8 | Uint16 | Uint24 | Uint32 | Uint64 | Int8 | Int16 | Int24 | Int32 | Int64
        )
    }

    pub fn is_integer(self) -> bool {
        self.requires_display_base()
    }
}

/// Permitted display bases for integer-family fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DisplayBase {
    #[default]
    None,
    Dec,
    Hex,
    Oct,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_matches_serialized_size() {
        assert_eq!(FieldType::Uint24.fixed_width(), Some(3));
        assert_eq!(FieldType::IPv6.fixed_width(), Some(16));
        assert_eq!(FieldType::Ether.fixed_width(), Some(6));
        assert_eq!(FieldType::String.fixed_width(), None);
    }

    #[test]
    fn frame_num_allows_value_map_but_never_a_bitmask() {
        assert!(!FieldType::FrameNum.allows_bitmask());
        assert!(FieldType::FrameNum.allows_value_map());
    }

    #[test]
    fn bit_width_only_defined_for_sub_64_bit_integers() {
        assert_eq!(FieldType::Uint32.bit_width(), Some(32));
        assert_eq!(FieldType::Uint64.bit_width(), None);
    }
}
