//! Runtime variant dispatch over `alloc::vec::Vec<u8>`. The fixed-size,
//! `alloc`-free per-variant modules (`ml_kem_512`/`768`/`1024`) are the
//! primary API; this module exists for callers that only learn which
//! parameter set they need at runtime (e.g. reading it off the wire), the
//! same shape as OpenSSL's `ossl_ml_kem_genkey_seed`/`case_genkey_seed`
//! switch-on-size dispatch (see `original_source/crypto/ml_kem/ml_kem.c`)
//! that resolves a `ML_KEM_PARAMS` struct for a requested key size.

use crate::error::{check_len, Error};
use crate::key::Key;
use crate::traits::SerDes;
use crate::SharedSecretKey;
use alloc::vec;
use alloc::vec::Vec;
use rand_core::CryptoRngCore;

/// `eta2 * 64` is 128 for every standardized variant.
const ETA2_64: usize = 128;

/// One of the three standardized ML-KEM parameter sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Category 1 security (128-bit), rank 2.
    MlKem512,
    /// Category 3 security (192-bit), rank 3.
    MlKem768,
    /// Category 5 security (256-bit), rank 4.
    MlKem1024,
}

impl Variant {
    /// `(du, dv, ek_len, dk_len, ct_len)` for this variant.
    fn sizes(self) -> (u32, u32, usize, usize, usize) {
        match self {
            Variant::MlKem512 => (10, 4, 800, 1632, 768),
            Variant::MlKem768 => (10, 4, 1184, 2400, 1088),
            Variant::MlKem1024 => (11, 5, 1568, 3168, 1568),
        }
    }
}

enum KeyInner {
    K512(Key<2, 192, ETA2_64>),
    K768(Key<3, 128, ETA2_64>),
    K1024(Key<4, 128, ETA2_64>),
}

/// A populated key for a runtime-selected [`Variant`].
pub struct DynKey {
    variant: Variant,
    inner: KeyInner,
}

impl DynKey {
    /// Which parameter set this key was populated for.
    #[must_use]
    pub fn variant(&self) -> Variant { self.variant }

    /// `genkey_seed(variant, seed)`: deterministic generation from a 64-byte
    /// `d ‖ z` seed. Returns the key and its encoded public key.
    pub fn genkey_seed(variant: Variant, seed: &[u8; 64]) -> Result<(Self, Vec<u8>), Error> {
        let (_, _, ek_len, _, _) = variant.sizes();
        let mut d = [0u8; 32];
        d.copy_from_slice(&seed[..32]);
        let mut z = [0u8; 32];
        z.copy_from_slice(&seed[32..]);

        let mut ek_scratch = vec![0u8; ek_len];
        let mut dk_pke_scratch = vec![0u8; ek_len - 32];

        let inner = match variant {
            Variant::MlKem512 => {
                KeyInner::K512(Key::genkey_seed(d, z, &mut ek_scratch, &mut dk_pke_scratch)?)
            }
            Variant::MlKem768 => {
                KeyInner::K768(Key::genkey_seed(d, z, &mut ek_scratch, &mut dk_pke_scratch)?)
            }
            Variant::MlKem1024 => {
                KeyInner::K1024(Key::genkey_seed(d, z, &mut ek_scratch, &mut dk_pke_scratch)?)
            }
        };
        let key = DynKey { variant, inner };
        let pubkey_bytes = key.encode_public()?;
        Ok((key, pubkey_bytes))
    }

    /// `genkey_rand(variant, rng)`: draws a 64-byte seed from `rng` and runs
    /// [`DynKey::genkey_seed`]; also returns the seed, for callers that want
    /// to retain it for later re-derivation.
    pub fn genkey_rand(
        variant: Variant, rng: &mut impl CryptoRngCore,
    ) -> Result<(Self, Vec<u8>, [u8; 64]), Error> {
        let mut seed = [0u8; 64];
        rng.try_fill_bytes(&mut seed).map_err(|_| Error::Rng)?;
        let (key, pubkey_bytes) = Self::genkey_seed(variant, &seed)?;
        Ok((key, pubkey_bytes, seed))
    }

    /// `parse_public(variant, bytes)`.
    pub fn parse_public(variant: Variant, bytes: &[u8]) -> Result<Self, Error> {
        let inner = match variant {
            Variant::MlKem512 => KeyInner::K512(Key::parse_public(bytes)?),
            Variant::MlKem768 => KeyInner::K768(Key::parse_public(bytes)?),
            Variant::MlKem1024 => KeyInner::K1024(Key::parse_public(bytes)?),
        };
        Ok(DynKey { variant, inner })
    }

    /// `parse_private(variant, bytes)`.
    pub fn parse_private(variant: Variant, bytes: &[u8]) -> Result<Self, Error> {
        let inner = match variant {
            Variant::MlKem512 => KeyInner::K512(Key::parse_private(bytes)?),
            Variant::MlKem768 => KeyInner::K768(Key::parse_private(bytes)?),
            Variant::MlKem1024 => KeyInner::K1024(Key::parse_private(bytes)?),
        };
        Ok(DynKey { variant, inner })
    }

    /// `encode_public(key)`.
    pub fn encode_public(&self) -> Result<Vec<u8>, Error> {
        let (_, _, ek_len, _, _) = self.variant.sizes();
        let mut out = vec![0u8; ek_len];
        match &self.inner {
            KeyInner::K512(k) => k.encode_public(&mut out)?,
            KeyInner::K768(k) => k.encode_public(&mut out)?,
            KeyInner::K1024(k) => k.encode_public(&mut out)?,
        }
        Ok(out)
    }

    /// `encode_private(key)`.
    pub fn encode_private(&self) -> Result<Vec<u8>, Error> {
        let (_, _, _, dk_len, _) = self.variant.sizes();
        let mut out = vec![0u8; dk_len];
        match &self.inner {
            KeyInner::K512(k) => k.encode_private(&mut out)?,
            KeyInner::K768(k) => k.encode_private(&mut out)?,
            KeyInner::K1024(k) => k.encode_private(&mut out)?,
        }
        Ok(out)
    }

    /// `encaps_seed(key, entropy)`.
    pub fn encaps_seed(&self, entropy: &[u8; 32]) -> Result<(Vec<u8>, SharedSecretKey), Error> {
        let (du, dv, _, _, ct_len) = self.variant.sizes();
        let mut ct = vec![0u8; ct_len];
        let ssk = match &self.inner {
            KeyInner::K512(k) => k.encaps_seed(du, dv, entropy, &mut ct)?,
            KeyInner::K768(k) => k.encaps_seed(du, dv, entropy, &mut ct)?,
            KeyInner::K1024(k) => k.encaps_seed(du, dv, entropy, &mut ct)?,
        };
        Ok((ct, ssk))
    }

    /// `encaps(key, rng)`.
    pub fn encaps(
        &self, rng: &mut impl CryptoRngCore,
    ) -> Result<(Vec<u8>, SharedSecretKey), Error> {
        let (du, dv, _, _, ct_len) = self.variant.sizes();
        let mut ct = vec![0u8; ct_len];
        let ssk = match &self.inner {
            KeyInner::K512(k) => k.encaps(rng, du, dv, &mut ct)?,
            KeyInner::K768(k) => k.encaps(rng, du, dv, &mut ct)?,
            KeyInner::K1024(k) => k.encaps(rng, du, dv, &mut ct)?,
        };
        Ok((ct, ssk))
    }

    /// `decaps(key, ciphertext, rng)`. On a ciphertext of the wrong length
    /// for this key's variant, this still produces a shared secret — drawn
    /// fresh from `rng`, since there is no committed ciphertext to key an
    /// implicit-rejection derivation on — alongside `Err(Error::InvalidLength)`,
    /// matching `ossl_ml_kem_decap`'s out-parameter contract (it calls
    /// `RAND_bytes_ex` into `shared_secret` before returning failure on a
    /// length mismatch; see `original_source/crypto/ml_kem/ml_kem.c`). A
    /// correctly-sized but otherwise invalid ciphertext never reaches this
    /// path at all: the implicit-rejection path inside [`Key::decaps`]
    /// already returns `Ok` with no distinguishable failure signal for that
    /// case.
    pub fn decaps(
        &self, ct: &[u8], rng: &mut impl CryptoRngCore,
    ) -> (SharedSecretKey, Result<(), Error>) {
        let (du, dv, _, _, ct_len) = self.variant.sizes();
        if let Err(e) = check_len(ct.len(), ct_len) {
            return Self::random_secret_with_error(rng, e);
        }
        let mut scratch = vec![0u8; ct.len()];
        let result = match &self.inner {
            KeyInner::K512(k) => k.decaps(du, dv, ct, &mut scratch),
            KeyInner::K768(k) => k.decaps(du, dv, ct, &mut scratch),
            KeyInner::K1024(k) => k.decaps(du, dv, ct, &mut scratch),
        };
        match result {
            Ok(ssk) => (ssk, Ok(())),
            Err(e) => Self::random_secret_with_error(rng, e),
        }
    }

    /// Draws a fresh 32-byte secret from `rng` to pair with a decapsulation
    /// error. If `rng` itself fails, the original error is superseded by
    /// [`Error::Rng`], since at that point not even the fallback secret could
    /// be produced.
    fn random_secret_with_error(
        rng: &mut impl CryptoRngCore, err: Error,
    ) -> (SharedSecretKey, Result<(), Error>) {
        let mut bytes = [0u8; 32];
        let err = match rng.try_fill_bytes(&mut bytes) {
            Ok(()) => err,
            Err(_) => Error::Rng,
        };
        let secret =
            SharedSecretKey::try_from_bytes(bytes).expect("SharedSecretKey::try_from_bytes never fails");
        (secret, Err(err))
    }

    /// `public_equal(key1, key2)`: different variants are never equal.
    #[must_use]
    pub fn public_equal(&self, other: &Self) -> bool {
        if self.variant != other.variant {
            return false;
        }
        match (&self.inner, &other.inner) {
            (KeyInner::K512(a), KeyInner::K512(b)) => a.public_equal(b),
            (KeyInner::K768(a), KeyInner::K768(b)) => a.public_equal(b),
            (KeyInner::K1024(a), KeyInner::K1024(b)) => a.public_equal(b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DynKey, Variant};
    use rand_core::SeedableRng;

    #[test]
    fn round_trip_across_every_variant() {
        for variant in [Variant::MlKem512, Variant::MlKem768, Variant::MlKem1024] {
            let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
            let (key, ek_bytes, _seed) = DynKey::genkey_rand(variant, &mut rng).unwrap();
            let dk_bytes = key.encode_private().unwrap();

            let pub_only = DynKey::parse_public(variant, &ek_bytes).unwrap();
            let (ct, ssk1) = pub_only.encaps(&mut rng).unwrap();

            let priv_key = DynKey::parse_private(variant, &dk_bytes).unwrap();
            assert!(key.public_equal(&priv_key));
            let (ssk2, result) = priv_key.decaps(&ct, &mut rng);
            result.unwrap();
            assert_eq!(ssk1, ssk2);
        }
    }

    #[test]
    fn cross_variant_keys_are_never_public_equal() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
        let (key512, _, _) = DynKey::genkey_rand(Variant::MlKem512, &mut rng).unwrap();
        let (key768, _, _) = DynKey::genkey_rand(Variant::MlKem768, &mut rng).unwrap();
        assert!(!key512.public_equal(&key768));
    }

    #[test]
    fn decaps_rejects_wrong_length_ciphertext_but_still_returns_a_secret() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(2);
        let (key, _, _) = DynKey::genkey_rand(Variant::MlKem512, &mut rng).unwrap();
        let (_secret, result) = key.decaps(&[0u8; 1], &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn decaps_error_path_does_not_reuse_the_same_fallback_secret_twice() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(3);
        let (key, _, _) = DynKey::genkey_rand(Variant::MlKem512, &mut rng).unwrap();
        let (secret_a, result_a) = key.decaps(&[0u8; 1], &mut rng);
        let (secret_b, result_b) = key.decaps(&[0u8; 1], &mut rng);
        assert!(result_a.is_err());
        assert!(result_b.is_err());
        assert_ne!(secret_a, secret_b);
    }
}
