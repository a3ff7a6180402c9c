//! Bit-packing codec for polynomials (FIPS 203 §4.3, Algorithms 4-5).
//!
//! `ByteEncode_d`/`ByteDecode_d` pack 256 coefficients into `32*d` bytes,
//! LSB-first, for any `1 <= d <= 12`. Only `d = 12` can produce a decoded
//! value outside `[0, q)` — that rejection is the protocol's authenticity
//! check on public and private key material (spec §4.3).

use crate::error::{ensure, Error};
use crate::types::Z;
use crate::Q;

/// Algorithm 4 `ByteEncode_d(F)`. Caller guarantees every coefficient is
/// already reduced to its output range (`2^d` for `d<12`, `q` for `d=12`);
/// this is always true on this crate's call paths because encode only ever
/// follows a compress or an NTT encode of an already-field-reduced value.
pub(crate) fn byte_encode(d: u32, integers_f: &[Z; 256], bytes_b: &mut [u8]) {
    debug_assert_eq!(bytes_b.len(), 32 * d as usize);
    let mut temp = 0u64;
    let mut bit_index = 0;
    let mut byte_index = 0;
    for coeff in integers_f {
        let coeff = u64::from(coeff.get_u16()) & (2u64.pow(d) - 1);
        temp |= coeff << bit_index;
        bit_index += d as usize;
        while bit_index > 7 {
            bytes_b[byte_index] = temp as u8;
            temp >>= 8;
            byte_index += 1;
            bit_index -= 8;
        }
    }
}

/// Algorithm 5 `ByteDecode_d(B)`. Rejects (for `d = 12` only) any decoded
/// coefficient `>= q`; see module docs.
pub(crate) fn byte_decode(d: u32, bytes_b: &[u8]) -> Result<[Z; 256], Error> {
    debug_assert_eq!(bytes_b.len(), 32 * d as usize);
    let mut integers_f = [Z::ZERO; 256];
    let mut temp = 0u64;
    let mut int_index = 0;
    let mut bit_index = 0;
    for byte in bytes_b {
        temp |= u64::from(*byte) << bit_index;
        bit_index += 8;
        while bit_index >= d as usize {
            let mask = temp & (2u64.pow(d) - 1);
            integers_f[int_index].set_u16(mask as u16);
            bit_index -= d as usize;
            temp >>= d;
            int_index += 1;
        }
    }
    let max = if d < 12 { 2u16.pow(d) } else { Q as u16 };
    ensure!(
        integers_f.iter().all(|e| e.get_u16() < max),
        Error::InvalidEncoding("ByteDecode_12 produced a coefficient >= q")
    );
    Ok(integers_f)
}

#[cfg(test)]
mod tests {
    use super::{byte_decode, byte_encode};
    use crate::types::Z;
    use alloc::vec;
    use alloc::vec::Vec;
    use rand::{Rng, SeedableRng};

    #[test]
    fn round_trips_for_every_d() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(123);
        for d in [1u32, 4, 5, 10, 11] {
            for _ in 0..50 {
                let num_bytes = 32 * d as usize;
                let bytes1: Vec<u8> = (0..num_bytes).map(|_| rng.gen()).collect();
                let decoded = byte_decode(d, &bytes1).unwrap();
                let mut bytes2 = vec![0u8; num_bytes];
                byte_encode(d, &decoded, &mut bytes2);
                assert_eq!(bytes1, bytes2);
            }
        }
    }

    #[test]
    fn decode_12_rejects_out_of_range_coefficient() {
        let mut bytes = [0u8; 384];
        bytes[0] = 0xFF;
        bytes[1] = 0xFF; // first 12-bit word = 0xFFF = 4095 >= 3329
        assert!(byte_decode(12, &bytes).is_err());
    }

    #[test]
    fn decode_12_accepts_every_reduced_coefficient() {
        let mut f = [Z::ZERO; 256];
        for (i, c) in f.iter_mut().enumerate() {
            c.set_u16((i as u16 * 37) % 3329);
        }
        let mut bytes = [0u8; 384];
        byte_encode(12, &f, &mut bytes);
        let back = byte_decode(12, &bytes).unwrap();
        for (a, b) in f.iter().zip(back.iter()) {
            assert_eq!(a.get_u16(), b.get_u16());
        }
    }
}
