//! Bit-field codec: decode 1–64 bit integers at arbitrary bit offsets.
//!
//! # Layout rules
//! Fields are little-endian and bit-packed.  Bit `n` of a resource is bit
//! `n % 8` of byte `n / 8`; a field of width `w` at bit offset `o` occupies
//! bits `o .. o + w`, its least significant bit first.  Fields are not byte
//! aligned unless the schema declares byte-sized widths.
//!
//! # Bounds
//! The codec never checks bounds.  Every resource ends in an 8-byte zero
//! padding tail, so any field lying inside a declared struct layout can be
//! read without consulting the resource length.  Reads past the end of a
//! [`ByteSource`] yield zero bits.
//!
//! # Signedness
//! Signed fields are two's complement of their declared width and are
//! sign-extended to 64 bits before narrowing to the target type.

use crate::source::ByteSource;

/// Widest field the codec decodes.
pub const MAX_FIELD_WIDTH: u32 = 64;

// ── Raw reads ─────────────────────────────────────────────────────────────────

/// Read `width` bits starting at `bit_offset`, zero-extended.
///
/// `width` must be in `1..=64`.
pub fn read_bits<S: ByteSource + ?Sized>(source: &S, bit_offset: usize, width: u32) -> u64 {
    debug_assert!((1..=MAX_FIELD_WIDTH).contains(&width), "field width {width} out of range");

    let mut index     = bit_offset / 8;
    let local_offset  = (bit_offset % 8) as u32;
    let mut bits_left = width;
    let mut result: u64 = 0;

    if local_offset != 0 {
        let current = u64::from(source.byte_at(index)) >> local_offset;
        let available = 8 - local_offset;
        if bits_left <= available {
            return current & low_mask(bits_left);
        }
        result = current;
        bits_left -= available;
        index += 1;
    }

    while bits_left >= 8 {
        result |= u64::from(source.byte_at(index)) << (width - bits_left);
        bits_left -= 8;
        index += 1;
    }

    if bits_left != 0 {
        let tail = u64::from(source.byte_at(index)) & low_mask(bits_left);
        result |= tail << (width - bits_left);
    }

    result
}

/// Read a two's-complement field of `width` bits, sign-extended to `i64`.
pub fn read_signed<S: ByteSource + ?Sized>(source: &S, bit_offset: usize, width: u32) -> i64 {
    sign_extend(read_bits(source, bit_offset, width), width)
}

/// Read a field and narrow it to `T`.
///
/// Signed targets are sign-extended from bit `width - 1`; unsigned targets
/// are taken as-is.  Narrowing truncates, so `width` should not exceed
/// `T::BITS`.
#[inline]
pub fn read<T: Primitive, S: ByteSource + ?Sized>(source: &S, bit_offset: usize, width: u32) -> T {
    let raw = read_bits(source, bit_offset, width);
    if T::SIGNED {
        T::from_u64(sign_extend(raw, width) as u64)
    } else {
        T::from_u64(raw)
    }
}

/// Widen a `width`-bit two's-complement value held in the low bits of `raw`.
#[inline]
pub fn sign_extend(raw: u64, width: u32) -> i64 {
    let sign = 1u64 << (width - 1);
    let magnitude = (raw & (sign - 1)) as i64;
    magnitude.wrapping_sub((raw & sign) as i64)
}

#[inline]
fn low_mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

// ── Primitive ─────────────────────────────────────────────────────────────────

/// Integer types a bit field can be decoded into.
pub trait Primitive: Copy {
    const BITS:   u32;
    const SIGNED: bool;

    /// Truncating conversion from a (possibly sign-extended) 64-bit word.
    fn from_u64(value: u64) -> Self;
}

macro_rules! impl_primitive {
    ($($ty:ty => $signed:expr),* $(,)?) => {$(
        impl Primitive for $ty {
            const BITS:   u32  = <$ty>::BITS;
            const SIGNED: bool = $signed;

            #[inline]
            fn from_u64(value: u64) -> Self { value as $ty }
        }
    )*};
}

impl_primitive! {
    u8 => false, u16 => false, u32 => false, u64 => false,
    i8 => true,  i16 => true,  i32 => true,  i64 => true,
}

impl Primitive for bool {
    const BITS:   u32  = 1;
    const SIGNED: bool = false;

    #[inline]
    fn from_u64(value: u64) -> Self { value != 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    /// Pack `value` into a fresh buffer at `bit_offset`, leaving room for
    /// the codec's trailing reads.
    fn packed(value: u64, bit_offset: usize, width: u32) -> MemorySource {
        let mut buf = vec![0u8; (bit_offset + width as usize) / 8 + 9];
        for bit in 0..width as usize {
            if value >> bit & 1 == 1 {
                let at = bit_offset + bit;
                buf[at / 8] |= 1 << (at % 8);
            }
        }
        MemorySource::new(buf)
    }

    #[test]
    fn reads_within_single_byte() {
        let src = MemorySource::new(vec![0b1011_0110]);
        assert_eq!(read_bits(&src, 0, 3), 0b110);
        assert_eq!(read_bits(&src, 1, 3), 0b011);
        assert_eq!(read_bits(&src, 4, 4), 0b1011);
        assert_eq!(read_bits(&src, 7, 1), 1);
    }

    #[test]
    fn reads_across_byte_boundaries() {
        let src = MemorySource::new(vec![0xFF, 0xAC, 0x68, 0x24, 0x00, 0x0B, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(read_signed(&src, 0, 5), -1);
        assert_eq!(read_bits(&src, 5, 32), 0x0123_4567);
        assert_eq!(read_signed(&src, 37, 7), -0x28);
        assert_eq!(read_bits(&src, 44, 32), 0);
    }

    #[test]
    fn full_width_unsigned_and_signed() {
        let src = packed(u64::MAX, 3, 64);
        assert_eq!(read_bits(&src, 3, 64), u64::MAX);
        assert_eq!(read_signed(&src, 3, 64), -1);

        let src = packed(i64::MIN as u64, 0, 64);
        assert_eq!(read_signed(&src, 0, 64), i64::MIN);
    }

    #[test]
    fn sign_extension_edges() {
        assert_eq!(sign_extend(0b1, 1), -1);
        assert_eq!(sign_extend(0b0, 1), 0);
        assert_eq!(sign_extend(0b10, 2), -2);
        assert_eq!(sign_extend(0b01, 2), 1);
        assert_eq!(sign_extend(0x7F, 8), 127);
        assert_eq!(sign_extend(0x80, 8), -128);
    }

    #[test]
    fn every_width_and_alignment_round_trips() {
        for width in 1..=64u32 {
            let max = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
            for offset in 0..8usize {
                for value in [0, 1, max / 3, max - 1, max] {
                    let src = packed(value, offset, width);
                    assert_eq!(read_bits(&src, offset, width), value, "w={width} o={offset}");
                }
            }
        }
    }

    #[test]
    fn narrowing_reads() {
        let src = packed(0b1_1111, 0, 5);
        assert_eq!(read::<i16, _>(&src, 0, 5), -1);
        assert_eq!(read::<u8, _>(&src, 0, 5), 31);
        assert!(read::<bool, _>(&src, 0, 1));
        assert!(!read::<bool, _>(&MemorySource::new(vec![0u8]), 0, 1));
    }

    #[test]
    fn reads_past_end_are_zero() {
        let src = MemorySource::new(vec![0xFF]);
        assert_eq!(read_bits(&src, 4, 12), 0x0F);
    }
}
