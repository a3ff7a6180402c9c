//! K-PKE: the underlying IND-CPA-secure public-key encryption scheme FIPS
//! 203's FO wrapper (`ml_kem.rs`) builds on (§4.6, Algorithms 12-14).

use crate::byte_fns::{byte_decode, byte_encode};
use crate::error::Error;
use crate::helpers::{
    add_vecs, compress_vector, decompress_vector, dot_t_prod, g, mul_mat_t_vec, mul_mat_vec, prf,
    xof,
};
use crate::ntt::{ntt, ntt_inv};
use crate::sampling::{sample_ntt, sample_poly_cbd};
use crate::types::Z;

/// A rank-`K` vector of NTT-domain polynomials.
pub(crate) type Vector<const K: usize> = [[Z; 256]; K];
/// A rank-`K` square matrix of NTT-domain polynomials, stored as the
/// transpose of FIPS 203's `A` (see module docs on [`gen_a_hat`]).
pub(crate) type Matrix<const K: usize> = [[[Z; 256]; K]; K];

/// `K-PKE.KeyGen(d)`: expands `d ‖ k` into `(rho, sigma)` via `G`, expands
/// the matrix from `rho`, samples `(s, e)` from `CBD_eta1` keyed by `sigma`,
/// and sets `t_hat = A_hat . s_hat + e_hat`.
#[allow(clippy::similar_names)]
pub(crate) fn k_pke_key_gen<const K: usize, const ETA1_64: usize>(
    d: [u8; 32], ek_pke: &mut [u8], dk_pke: &mut [u8],
) {
    debug_assert_eq!(ek_pke.len(), 384 * K + 32);
    debug_assert_eq!(dk_pke.len(), 384 * K);

    let mut d_k = [0u8; 33]; // d || k, the FIPS 203 final-fix domain separator
    d_k[0..32].copy_from_slice(&d);
    d_k[32] = K.to_le_bytes()[0];
    let (rho, sigma) = g(&[&d_k]);

    let mut n = 0u8;
    let a_hat = gen_a_hat(&rho);

    let s: [[Z; 256]; K] = core::array::from_fn(|_| {
        let x = sample_poly_cbd(&prf::<ETA1_64>(&sigma, n));
        n += 1;
        x
    });
    let e: [[Z; 256]; K] = core::array::from_fn(|_| {
        let x = sample_poly_cbd(&prf::<ETA1_64>(&sigma, n));
        n += 1;
        x
    });

    let s_hat: [[Z; 256]; K] = core::array::from_fn(|i| ntt(&s[i]));
    let e_hat: [[Z; 256]; K] = core::array::from_fn(|i| ntt(&e[i]));

    let as_hat = mul_mat_vec(&a_hat, &s_hat);
    let t_hat = add_vecs(&as_hat, &e_hat);

    for (i, chunk) in ek_pke.chunks_mut(384).enumerate().take(K) {
        byte_encode(12, &t_hat[i], chunk);
    }
    ek_pke[K * 384..].copy_from_slice(&rho);

    for (i, chunk) in dk_pke.chunks_mut(384).enumerate() {
        byte_encode(12, &s_hat[i], chunk);
    }
}

/// Shared matrix-expansion step of `k_pke_key_gen` and `k_pke_encrypt`: the
/// expensive part of populating a key (`K^2` rejection-sampling draws from
/// the matrix XOF), so callers that retain a key should expand once via
/// [`expand_a_hat`] and reuse the result rather than re-deriving it from
/// `rho` on every encrypt/decrypt call.
fn gen_a_hat<const K: usize>(rho: &[u8; 32]) -> Matrix<K> {
    core::array::from_fn(|i| {
        core::array::from_fn(|j| sample_ntt(xof(rho, j.to_le_bytes()[0], i.to_le_bytes()[0])))
    })
}

/// Public entry point for [`gen_a_hat`], for callers (`crate::key`) that
/// cache the expanded matrix instead of re-deriving it per call.
#[must_use]
pub(crate) fn expand_a_hat<const K: usize>(rho: &[u8; 32]) -> Matrix<K> {
    gen_a_hat(rho)
}

/// `K-PKE.Encrypt(ek_PKE, m, r)`: samples `(y, e1, e2)` from `r`, forms
/// `u = NTT^{-1}(A_hat^T . y_hat) + e1` and `v = NTT^{-1}(t_hat^T . y_hat) + e2
/// + Decompress_1(Decode_1(m))`, then compresses and encodes both halves.
#[allow(clippy::many_single_char_names, clippy::too_many_arguments)]
pub(crate) fn k_pke_encrypt<const K: usize, const ETA1_64: usize, const ETA2_64: usize>(
    du: u32, dv: u32, ek_pke: &[u8], m: &[u8], r: &[u8; 32], ct: &mut [u8],
) -> Result<(), Error> {
    debug_assert_eq!(ek_pke.len(), 384 * K + 32);

    let mut t_hat = [[Z::ZERO; 256]; K];
    for (i, chunk) in ek_pke.chunks(384).enumerate().take(K) {
        t_hat[i] = byte_decode(12, chunk)?;
    }
    let rho: &[u8; 32] = &ek_pke[384 * K..(384 * K + 32)].try_into().unwrap();
    let a_hat = gen_a_hat(rho);

    k_pke_encrypt_cached::<K, ETA1_64, ETA2_64>(du, dv, &a_hat, &t_hat, m, r, ct)
}

/// Same as [`k_pke_encrypt`], but for callers (`crate::key`) that already
/// hold `A_hat` and `t_hat` from a populated key instead of raw `ek_PKE`
/// bytes — skips the re-expansion of the matrix and the `t_hat` decode.
#[allow(clippy::many_single_char_names, clippy::too_many_arguments)]
pub(crate) fn k_pke_encrypt_cached<const K: usize, const ETA1_64: usize, const ETA2_64: usize>(
    du: u32, dv: u32, a_hat: &Matrix<K>, t_hat: &Vector<K>, m: &[u8], r: &[u8; 32], ct: &mut [u8],
) -> Result<(), Error> {
    debug_assert_eq!(m.len(), 32);

    let mut n = 0u8;

    let y: [[Z; 256]; K] = core::array::from_fn(|_| {
        let x = sample_poly_cbd(&prf::<ETA1_64>(r, n));
        n += 1;
        x
    });
    let e1: [[Z; 256]; K] = core::array::from_fn(|_| {
        let x = sample_poly_cbd(&prf::<ETA2_64>(r, n));
        n += 1;
        x
    });
    let e2 = sample_poly_cbd(&prf::<ETA2_64>(r, n));

    let y_hat: [[Z; 256]; K] = core::array::from_fn(|i| ntt(&y[i]));

    let mut u = mul_mat_t_vec(a_hat, &y_hat);
    for u_i in &mut u {
        *u_i = ntt_inv(u_i);
    }
    u = add_vecs(&u, &e1);

    let mut mu = byte_decode(1, m)?;
    decompress_vector(1, &mut mu);

    let mut v = ntt_inv(&dot_t_prod(t_hat, &y_hat));
    v = add_vecs(&add_vecs(&[v], &[e2]), &[mu])[0];

    let step = 32 * du as usize;
    for (i, chunk) in ct.chunks_mut(step).enumerate().take(K) {
        compress_vector(du, &mut u[i]);
        byte_encode(du, &u[i], chunk);
    }

    compress_vector(dv, &mut v);
    byte_encode(dv, &v, &mut ct[K * step..]);

    Ok(())
}

/// `K-PKE.Decrypt(dk_PKE, c)`: recovers `m = Compress_1(v - s_hat^T . NTT(u))`.
pub(crate) fn k_pke_decrypt<const K: usize>(
    du: u32, dv: u32, dk_pke: &[u8], ct: &[u8],
) -> Result<[u8; 32], Error> {
    debug_assert_eq!(dk_pke.len(), 384 * K);

    let mut s_hat = [[Z::ZERO; 256]; K];
    for (i, chunk) in dk_pke.chunks(384).enumerate() {
        s_hat[i] = byte_decode(12, chunk)?;
    }

    k_pke_decrypt_cached::<K>(du, dv, &s_hat, ct)
}

/// Same as [`k_pke_decrypt`], but for callers (`crate::key`) that already
/// hold `s_hat` from a populated private key instead of raw `dk_PKE` bytes —
/// skips the `s_hat` decode.
pub(crate) fn k_pke_decrypt_cached<const K: usize>(
    du: u32, dv: u32, s_hat: &Vector<K>, ct: &[u8],
) -> Result<[u8; 32], Error> {
    debug_assert_eq!(ct.len(), 32 * (du as usize * K + dv as usize));

    let c1 = &ct[0..32 * du as usize * K];
    let c2 = &ct[32 * du as usize * K..32 * (du as usize * K + dv as usize)];

    let mut u = [[Z::ZERO; 256]; K];
    for (i, chunk) in c1.chunks(32 * du as usize).enumerate().take(K) {
        u[i] = byte_decode(du, chunk)?;
        decompress_vector(du, &mut u[i]);
    }

    let mut v = byte_decode(dv, c2)?;
    decompress_vector(dv, &mut v);

    let ntt_u: [[Z; 256]; K] = core::array::from_fn(|i| ntt(&u[i]));
    let st_ntt_u = dot_t_prod(s_hat, &ntt_u);
    let w_pre = ntt_inv(&st_ntt_u);
    let mut w = [Z::ZERO; 256];
    for i in 0..256 {
        w[i] = v[i].sub(w_pre[i]);
    }

    compress_vector(1, &mut w);
    let mut m = [0u8; 32];
    byte_encode(1, &w, &mut m);

    Ok(m)
}

#[cfg(test)]
mod tests {
    use rand_core::{RngCore, SeedableRng};

    use crate::k_pke::{k_pke_decrypt, k_pke_encrypt, k_pke_key_gen};

    const ETA1_64: usize = 3 * 64;
    const ETA2_64: usize = 2 * 64;
    const DU: u32 = 10;
    const DV: u32 = 4;
    const K: usize = 2;
    const EK_LEN: usize = 800;
    const DK_LEN: usize = 1632;
    const CT_LEN: usize = 768;

    #[test]
    fn round_trip_and_length_validation() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(123);
        let mut ek = [0u8; EK_LEN];
        let mut dk = [0u8; DK_LEN];
        let mut ct = [0u8; CT_LEN];
        let m = [0u8; 32];
        let r = [0u8; 32];

        let mut d = [0u8; 32];
        rng.try_fill_bytes(&mut d).unwrap();
        k_pke_key_gen::<K, ETA1_64>(d, &mut ek, &mut dk[0..384 * K]);

        k_pke_encrypt::<K, ETA1_64, ETA2_64>(DU, DV, &ek, &m, &r, &mut ct).unwrap();
        let recovered = k_pke_decrypt::<K>(DU, DV, &dk[0..384 * K], &ct).unwrap();
        assert_eq!(recovered, m);

        let ff_ek = [0xFFu8; EK_LEN]; // every coefficient word >= q
        let res = k_pke_encrypt::<K, ETA1_64, ETA2_64>(DU, DV, &ff_ek, &m, &r, &mut ct);
        assert!(res.is_err());
    }
}
