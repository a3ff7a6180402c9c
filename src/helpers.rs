//! Vector/matrix composition primitives and the hash/XOF adapters (FIPS 203
//! §4.4-§4.5): `PRF`, the matrix XOF, and the three named hashes `G`/`H`/`J`.

use crate::ntt::multiply_ntts;
use crate::types::{compress, decompress, Z};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Digest, Sha3_256, Sha3_512, Shake128, Shake256};

/// `z_hat = u_hat + v_hat`, component-wise.
#[must_use]
pub(crate) fn add_vecs<const K: usize>(
    vec_a: &[[Z; 256]; K], vec_b: &[[Z; 256]; K],
) -> [[Z; 256]; K] {
    core::array::from_fn(|k| core::array::from_fn(|n| vec_a[k][n].add(vec_b[k][n])))
}

/// `w_hat = a_hat . u_hat`, a fresh output vector that never aliases its inputs.
#[must_use]
pub(crate) fn mul_mat_vec<const K: usize>(
    a_hat: &[[[Z; 256]; K]; K], u_hat: &[[Z; 256]; K],
) -> [[Z; 256]; K] {
    let mut w_hat = [[Z::ZERO; 256]; K];
    #[allow(clippy::needless_range_loop)]
    for i in 0..K {
        #[allow(clippy::needless_range_loop)]
        for j in 0..K {
            let tmp = multiply_ntts(&a_hat[i][j], &u_hat[j]);
            w_hat[i] = add_vecs(&[w_hat[i]], &[tmp])[0];
        }
    }
    w_hat
}

/// `y_hat = a_hat^T . u_hat`.
#[must_use]
pub(crate) fn mul_mat_t_vec<const K: usize>(
    a_hat: &[[[Z; 256]; K]; K], u_hat: &[[Z; 256]; K],
) -> [[Z; 256]; K] {
    let mut y_hat = [[Z::ZERO; 256]; K];
    #[allow(clippy::needless_range_loop)]
    for i in 0..K {
        #[allow(clippy::needless_range_loop)]
        for j in 0..K {
            let tmp = multiply_ntts(&a_hat[j][i], &u_hat[j]); // i,j swapped vs mul_mat_vec
            y_hat[i] = add_vecs(&[y_hat[i]], &[tmp])[0];
        }
    }
    y_hat
}

/// `z_hat = u_hat^T . v_hat`, a single running accumulator of pairwise products.
#[must_use]
pub(crate) fn dot_t_prod<const K: usize>(u_hat: &[[Z; 256]; K], v_hat: &[[Z; 256]; K]) -> [Z; 256] {
    let mut result = [Z::ZERO; 256];
    for j in 0..K {
        let tmp = multiply_ntts(&u_hat[j], &v_hat[j]);
        result = add_vecs(&[result], &[tmp])[0];
    }
    result
}

/// `PRF` (SHAKE256, §4.4): `ETA_64` bytes of output keyed by `sigma ‖ ctr`.
#[must_use]
pub(crate) fn prf<const ETA_64: usize>(sigma: &[u8; 32], ctr: u8) -> [u8; ETA_64] {
    let mut hasher = Shake256::default();
    hasher.update(sigma);
    hasher.update(&[ctr]);
    let mut reader = hasher.finalize_xof();
    let mut result = [0u8; ETA_64];
    reader.read(&mut result);
    result
}

/// Matrix XOF (SHAKE128, §4.5), keyed by `rho ‖ i ‖ j`.
#[must_use]
pub(crate) fn xof(rho: &[u8; 32], i: u8, j: u8) -> impl XofReader {
    let mut hasher = Shake128::default();
    hasher.update(rho);
    hasher.update(&[i]);
    hasher.update(&[j]);
    hasher.finalize_xof()
}

/// `G` (SHA3-512, §4.4): splits a 64-byte digest into `(rho, sigma)` or `(K, r)`.
pub(crate) fn g(bytes: &[&[u8]]) -> ([u8; 32], [u8; 32]) {
    let mut hasher = Sha3_512::new();
    bytes.iter().for_each(|b| Digest::update(&mut hasher, b));
    let digest = hasher.finalize();
    let a = digest[0..32].try_into().expect("sha3-512 digest is 64 bytes");
    let b = digest[32..64].try_into().expect("sha3-512 digest is 64 bytes");
    (a, b)
}

/// `H` (SHA3-256, §4.4): hashes the encoded public key.
#[must_use]
pub(crate) fn h(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    Digest::update(&mut hasher, bytes);
    hasher.finalize().into()
}

/// `J` (SHAKE256, §4.4): derives the implicit-rejection key from `z ‖ c`.
#[must_use]
pub(crate) fn j(z: &[u8; 32], ct: &[u8]) -> [u8; 32] {
    let mut hasher = Shake256::default();
    hasher.update(z);
    hasher.update(ct);
    let mut reader = hasher.finalize_xof();
    let mut result = [0u8; 32];
    reader.read(&mut result);
    result
}

/// `Compress_d` applied coefficient-wise in place (§4.7).
pub(crate) fn compress_vector(d: u32, inout: &mut [Z]) {
    for x in &mut *inout {
        x.set_u16(compress(x.get_u16(), d));
    }
}

/// `Decompress_d` applied coefficient-wise in place (§4.8).
pub(crate) fn decompress_vector(d: u32, inout: &mut [Z]) {
    for y in &mut *inout {
        y.set_u16(decompress(y.get_u16(), d));
    }
}
