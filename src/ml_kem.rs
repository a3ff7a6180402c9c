//! ML-KEM's Fujisaki-Okamoto wrapper around K-PKE (§4.7, Algorithms 15-18):
//! keypair generation, encapsulation, and implicit-rejection decapsulation.

use crate::byte_fns::{byte_decode, byte_encode};
use crate::error::Error;
use crate::helpers::{g, h, j};
use crate::k_pke::{k_pke_decrypt, k_pke_encrypt, k_pke_key_gen};
use crate::SharedSecretKey;
use rand_core::CryptoRngCore;
use subtle::{ConditionallySelectable, ConstantTimeEq};

/// `ML-KEM.KeyGen_internal(d, z)`: runs K-PKE.KeyGen, then assembles the
/// expanded decapsulation key `dk_PKE ‖ ek ‖ H(ek) ‖ z`.
pub(crate) fn ml_kem_key_gen_internal<const K: usize, const ETA1_64: usize>(
    d: [u8; 32], z: [u8; 32], ek: &mut [u8], dk: &mut [u8],
) {
    debug_assert_eq!(ek.len(), 384 * K + 32);
    debug_assert_eq!(dk.len(), 768 * K + 96);

    let p1 = 384 * K;
    k_pke_key_gen::<K, ETA1_64>(d, ek, &mut dk[..p1]);

    let h_ek = h(ek);
    let p2 = p1 + ek.len();
    let p3 = p2 + h_ek.len();
    dk[p1..p2].copy_from_slice(ek);
    dk[p2..p3].copy_from_slice(&h_ek);
    dk[p3..].copy_from_slice(&z);
}

/// `ML-KEM.Encaps_internal(ek, m)`: `(K, r) = G(m ‖ H(ek))`, then
/// `c = K-PKE.Encrypt(ek, m, r)`.
fn ml_kem_encaps_internal<const K: usize, const ETA1_64: usize, const ETA2_64: usize>(
    du: u32, dv: u32, m: &[u8; 32], ek: &[u8], ct: &mut [u8],
) -> Result<SharedSecretKey, Error> {
    let h_ek = h(ek);
    let (k, r) = g(&[m, &h_ek]);
    k_pke_encrypt::<K, ETA1_64, ETA2_64>(du, dv, ek, m, &r, ct)?;
    Ok(SharedSecretKey(k))
}

/// `ML-KEM.Decaps_internal(dk, c)`: decrypt, re-derive, re-encrypt, and
/// select between the real key and the implicit-rejection key `J(z ‖ c)`
/// via a constant-time mask — never by branching on the comparison result.
#[allow(clippy::similar_names)]
fn ml_kem_decaps_internal<
    const K: usize,
    const ETA1_64: usize,
    const ETA2_64: usize,
    const CT_LEN: usize,
>(
    du: u32, dv: u32, dk: &[u8], ct: &[u8; CT_LEN],
) -> Result<SharedSecretKey, Error> {
    debug_assert_eq!(dk.len(), 768 * K + 96);

    let dk_pke = &dk[0..384 * K];
    let ek_pke = &dk[384 * K..768 * K + 32];
    let h_ek = &dk[768 * K + 32..768 * K + 64];
    let z = &dk[768 * K + 64..768 * K + 96];

    let m_prime = k_pke_decrypt::<K>(du, dv, dk_pke, ct)?;
    let (mut k_prime, r_prime) = g(&[&m_prime, h_ek]);
    let k_bar = j(z.try_into().unwrap(), ct);

    let mut c_prime = [0u8; CT_LEN];
    k_pke_encrypt::<K, ETA1_64, ETA2_64>(du, dv, ek_pke, &m_prime, &r_prime, &mut c_prime[0..ct.len()])?;

    k_prime.conditional_assign(&k_bar, ct.ct_ne(&c_prime));
    Ok(SharedSecretKey(k_prime))
}

/// `ML-KEM.KeyGen()`: draws `(d, z)` from `rng` and runs `KeyGen_internal`.
pub(crate) fn ml_kem_key_gen<const K: usize, const ETA1_64: usize>(
    rng: &mut impl CryptoRngCore, ek: &mut [u8], dk: &mut [u8],
) -> Result<(), Error> {
    debug_assert_eq!(ek.len(), 384 * K + 32);
    debug_assert_eq!(dk.len(), 768 * K + 96);

    let mut d = [0u8; 32];
    rng.try_fill_bytes(&mut d).map_err(|_| Error::Rng)?;
    let mut z = [0u8; 32];
    rng.try_fill_bytes(&mut z).map_err(|_| Error::Rng)?;

    ml_kem_key_gen_internal::<K, ETA1_64>(d, z, ek, dk);
    Ok(())
}

/// `ML-KEM.Encaps(ek)`: draws 32 bytes of entropy `m` from `rng` and runs
/// `Encaps_internal`. `ek`'s modulus check (`ek == ByteEncode12(ByteDecode12(ek))`)
/// is enforced once at parse time by [`crate::byte_fns::byte_decode`]; external
/// `ek` values can only reach here via that check, so it is not repeated here.
pub(crate) fn ml_kem_encaps<const K: usize, const ETA1_64: usize, const ETA2_64: usize>(
    rng: &mut impl CryptoRngCore, du: u32, dv: u32, ek: &[u8], ct: &mut [u8],
) -> Result<SharedSecretKey, Error> {
    debug_assert_eq!(ek.len(), 384 * K + 32);
    debug_assert_eq!(ct.len(), 32 * (du as usize * K + dv as usize));

    let mut m = [0u8; 32];
    rng.try_fill_bytes(&mut m).map_err(|_| Error::Rng)?;
    ml_kem_encaps_internal::<K, ETA1_64, ETA2_64>(du, dv, &m, ek, ct)
}

/// `ML-KEM.Encaps` with caller-supplied entropy (seeded/deterministic mode).
pub(crate) fn ml_kem_encaps_seed<const K: usize, const ETA1_64: usize, const ETA2_64: usize>(
    du: u32, dv: u32, entropy: &[u8; 32], ek: &[u8], ct: &mut [u8],
) -> Result<SharedSecretKey, Error> {
    ml_kem_encaps_internal::<K, ETA1_64, ETA2_64>(du, dv, entropy, ek, ct)
}

/// `ML-KEM.Decaps(c, dk)`. Always returns `Ok`: the FO transform's implicit
/// rejection means there is no distinguishable "ciphertext invalid" error for
/// well-formed-length input (spec §7) — see [`ml_kem_decaps_internal`].
#[allow(clippy::similar_names)]
pub(crate) fn ml_kem_decaps<
    const K: usize,
    const ETA1_64: usize,
    const ETA2_64: usize,
    const CT_LEN: usize,
>(
    du: u32, dv: u32, dk: &[u8], ct: &[u8; CT_LEN],
) -> Result<SharedSecretKey, Error> {
    debug_assert_eq!(ct.len(), 32 * (du as usize * K + dv as usize));
    debug_assert_eq!(dk.len(), 768 * K + 96);
    ml_kem_decaps_internal::<K, ETA1_64, ETA2_64, CT_LEN>(du, dv, dk, ct)
}

#[cfg(test)]
mod tests {
    use rand_core::SeedableRng;

    use crate::ml_kem::{ml_kem_decaps, ml_kem_encaps, ml_kem_key_gen};

    const ETA1_64: usize = 3 * 64;
    const ETA2_64: usize = 2 * 64;
    const DU: u32 = 10;
    const DV: u32 = 4;
    const K: usize = 2;
    const EK_LEN: usize = 800;
    const DK_LEN: usize = 1632;
    const CT_LEN: usize = 768;

    #[test]
    fn keygen_encaps_decaps_round_trip() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(123);
        let mut ek = [0u8; EK_LEN];
        let mut dk = [0u8; DK_LEN];
        let mut ct = [0u8; CT_LEN];

        ml_kem_key_gen::<K, ETA1_64>(&mut rng, &mut ek, &mut dk).unwrap();
        let ssk1 =
            ml_kem_encaps::<K, ETA1_64, ETA2_64>(&mut rng, DU, DV, &ek, &mut ct).unwrap();
        let ssk2 = ml_kem_decaps::<K, ETA1_64, ETA2_64, CT_LEN>(DU, DV, &dk, &ct).unwrap();
        assert_eq!(ssk1, ssk2);
    }

    #[test]
    fn bit_flip_triggers_implicit_rejection() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        let mut ek = [0u8; EK_LEN];
        let mut dk = [0u8; DK_LEN];
        let mut ct = [0u8; CT_LEN];

        ml_kem_key_gen::<K, ETA1_64>(&mut rng, &mut ek, &mut dk).unwrap();
        let ssk1 =
            ml_kem_encaps::<K, ETA1_64, ETA2_64>(&mut rng, DU, DV, &ek, &mut ct).unwrap();
        ct[0] ^= 1;
        let ssk2 = ml_kem_decaps::<K, ETA1_64, ETA2_64, CT_LEN>(DU, DV, &dk, &ct).unwrap();
        assert_ne!(ssk1, ssk2);

        // deterministic: decapsulating the same flipped ciphertext twice agrees
        let ssk3 = ml_kem_decaps::<K, ETA1_64, ETA2_64, CT_LEN>(DU, DV, &dk, &ct).unwrap();
        assert_eq!(ssk2, ssk3);
    }
}
