//! Number-Theoretic Transform over `Z_q[X]/(X^256+1)` (FIPS 203 §4.2).
//!
//! `ntt`/`ntt_inv` switch a 256-coefficient polynomial between the
//! time-domain and NTT-domain interpretations described in spec §3; the
//! representation in memory (`[Z; 256]`) never changes, only which
//! operations are valid to call next. `multiply_ntts` is the only op that
//! requires both operands already in NTT domain.
//!
//! All three of FIPS 203's zeta tables (`ZETA_NTT`, `ZETA_INV_NTT`,
//! `ZETA_MOD`) are views into one underlying table of `17^bitrev(i) mod q`:
//! the forward and inverse transforms read it at `i*2` for increasing /
//! decreasing `i`, and base-case multiplication reads it at `i ^ 0x80`. This
//! single-table construction is the one the crate this core is grounded on
//! ships and tests against FIPS 203 Appendix A; splitting it into three
//! physical arrays would be equivalent but not simpler.

use crate::types::Z;
use crate::{Q, ZETA};

/// Algorithm 9 `NTT(f)`. Seven layers of Cooley-Tukey butterflies.
#[must_use]
pub(crate) fn ntt(array_f: &[Z; 256]) -> [Z; 256] {
    let mut f_hat: [Z; 256] = *array_f;
    let mut i = 1;

    for len in [128, 64, 32, 16, 8, 4, 2] {
        for start in (0..256).step_by(2 * len) {
            let zeta = ZETA_TABLE[i << 1];
            i += 1;

            for j in start..(start + len) {
                let t = zeta.mul(f_hat[j + len]);
                f_hat[j + len] = f_hat[j].sub(t);
                f_hat[j] = f_hat[j].add(t);
            }
        }
    }
    f_hat
}

/// Algorithm 10 `NTT^{-1}(f_hat)`. Mirror structure; final layer scales by
/// `N_INV = 3303`, the modular inverse of 128 (the transform omits the
/// 256th layer since `q` has no 512th root of unity).
#[must_use]
pub(crate) fn ntt_inv(f_hat: &[Z; 256]) -> [Z; 256] {
    let mut f: [Z; 256] = *f_hat;
    let mut i = 127;

    for len in [2, 4, 8, 16, 32, 64, 128] {
        for start in (0..256).step_by(2 * len) {
            let zeta = ZETA_TABLE[i << 1];
            i -= 1;

            for j in start..(start + len) {
                let t = f[j];
                f[j] = t.add(f[j + len]);
                f[j + len] = zeta.mul(f[j + len].sub(t));
            }
        }
    }

    let n_inv = Z(N_INV);
    f.iter_mut().for_each(|c| *c = c.mul(n_inv));
    f
}

/// Modular inverse of 128 mod q.
const N_INV: u16 = 3303;

/// Algorithm 11 `MultiplyNTTs`: 128 independent base-case multiplies, one
/// per conjugate pair `(f_hat[2i], f_hat[2i+1])`.
#[must_use]
pub(crate) fn multiply_ntts(f_hat: &[Z; 256], g_hat: &[Z; 256]) -> [Z; 256] {
    let mut h_hat = [Z::ZERO; 256];
    for i in 0..128 {
        let gamma = ZETA_TABLE[i ^ 0x80];
        let (c0, c1) =
            base_case_multiply(f_hat[2 * i], f_hat[2 * i + 1], g_hat[2 * i], g_hat[2 * i + 1], gamma);
        h_hat[2 * i] = c0;
        h_hat[2 * i + 1] = c1;
    }
    h_hat
}

/// Algorithm 12 `BaseCaseMultiply`: multiplies `a0 + a1X` by `b0 + b1X`
/// modulo `X^2 - gamma`.
#[must_use]
pub(crate) fn base_case_multiply(a0: Z, a1: Z, b0: Z, b1: Z, gamma: Z) -> (Z, Z) {
    let c0 = a0.mul(b0).add(a1.mul(b1).mul(gamma));
    let c1 = a0.mul(b1).add(a1.mul(b0));
    (c0, c1)
}

// The zeta table is generated at compile time; not constant-time (it has no
// secret-dependent input) and not on any hot path.
#[allow(clippy::cast_possible_truncation)]
const fn gen_zeta_table() -> [Z; 256] {
    let mut result = [Z(0); 256];
    let mut x = 1u32;
    let mut i = 0u32;
    while i < 256 {
        result[(i as u8).reverse_bits() as usize] = Z(x as u16);
        x = (x * ZETA) % Q;
        i += 1;
    }
    result
}

pub(crate) static ZETA_TABLE: [Z; 256] = gen_zeta_table();

#[cfg(test)]
mod tests {
    use super::{gen_zeta_table, multiply_ntts, ntt, ntt_inv};
    use crate::types::Z;

    #[test]
    fn zeta_table_known_value() {
        let table = gen_zeta_table();
        assert_eq!(table[4].get_u16(), 2580);
        assert_eq!(table[0].get_u16(), 1); // zeta^0
    }

    #[test]
    fn ntt_round_trip_is_identity() {
        let mut f = [Z::ZERO; 256];
        for (i, c) in f.iter_mut().enumerate() {
            c.set_u16((i as u16 * 7 + 3) % 3329);
        }
        let recovered = ntt_inv(&ntt(&f));
        for (a, b) in f.iter().zip(recovered.iter()) {
            assert_eq!(a.get_u16(), b.get_u16());
        }
    }

    #[test]
    fn multiply_by_ntt_of_one_is_identity() {
        let mut one = [Z::ZERO; 256];
        one[0].set_u16(1);
        let one_hat = ntt(&one);

        let mut f = [Z::ZERO; 256];
        for (i, c) in f.iter_mut().enumerate() {
            c.set_u16((i as u16 * 13 + 1) % 3329);
        }
        let f_hat = ntt(&f);

        let product_hat = multiply_ntts(&f_hat, &one_hat);
        let product = ntt_inv(&product_hat);
        for (a, b) in f.iter().zip(product.iter()) {
            assert_eq!(a.get_u16(), b.get_u16());
        }
    }
}
