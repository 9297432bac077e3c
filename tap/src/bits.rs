//! LSB-first bit packing shared by the Transport and Adapter boundary
//! (§4.3, §4.4, §9 "Bit packing").

use bitvec::prelude::*;

/// Packs `bits` (index 0 first) into bytes, LSB-first within each byte,
/// zero-padded to a byte boundary.
pub fn pack(bits: &[bool]) -> Vec<u8> {
    let mut bv: BitVec<u8, Lsb0> = BitVec::with_capacity(bits.len());
    for &b in bits {
        bv.push(b);
    }
    bv.into_vec()
}

/// Unpacks the first `len` bits from `bytes`, LSB-first within each byte.
pub fn unpack(bytes: &[u8], len: usize) -> Vec<bool> {
    let bv = BitSlice::<u8, Lsb0>::from_slice(bytes);
    bv.iter().by_vals().take(len).collect()
}

/// Number of bytes needed to hold `bits` bits, rounded up.
pub fn byte_len(bits: usize) -> usize {
    (bits + 7) / 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trip() {
        let bits = vec![true, false, true, true, false, false, false, true, true];
        let packed = pack(&bits);
        assert_eq!(packed.len(), byte_len(bits.len()));
        let unpacked = unpack(&packed, bits.len());
        assert_eq!(unpacked, bits);
    }

    #[test]
    fn bit_zero_is_lsb_of_first_byte() {
        let bits = vec![true, false, false, false, false, false, false, false];
        let packed = pack(&bits);
        assert_eq!(packed, vec![0x01]);
    }

    #[test]
    fn byte_len_rounds_up() {
        assert_eq!(byte_len(0), 0);
        assert_eq!(byte_len(1), 1);
        assert_eq!(byte_len(8), 1);
        assert_eq!(byte_len(9), 2);
    }
}
