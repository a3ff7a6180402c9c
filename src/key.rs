//! Cached key state — the variant-tagged "Key" record: once populated via
//! generate-from-seed, generate-from-random, parse-public, or parse-private,
//! a `Key` retains its decoded vector(s) and expanded matrix rather than
//! re-deriving them from raw bytes on every `encaps`/`decaps` call. This
//! mirrors the caching OpenSSL's `ML_KEM_KEY` performs at populate time
//! (`ossl_ml_kem_genkey`/`parse_public_key`/`parse_private_key` in
//! `ml_kem.c`), where `ML_KEM_KEY` keeps its decoded `t`, expanded matrix,
//! `rho`, and public-key hash for the lifetime of the key rather than
//! recomputing them per operation.
//!
//! A key is created empty and populated exactly once; `populate_*` consumes
//! `self` by value and rejects a second populate with
//! [`Error::MutationRejected`], matching the immutable-once-populated
//! lifecycle.

use crate::byte_fns::{byte_decode, byte_encode};
use crate::error::{check_len, ensure, Error};
use crate::helpers::{g, h, j};
use crate::k_pke::{expand_a_hat, k_pke_decrypt_cached, k_pke_encrypt_cached, k_pke_key_gen, Matrix, Vector};
use crate::SharedSecretKey;
use rand_core::CryptoRngCore;
use subtle::{ConditionallySelectable, ConstantTimeEq};
use zeroize::Zeroize;

use crate::types::Z;

/// The cached contents of a [`Key`], tagged by how much material it holds.
enum KeyState<const K: usize> {
    Empty,
    /// Holds everything needed for `encaps`/`encaps_seed` and nothing else.
    Public { t_hat: Vector<K>, m_hat: Matrix<K>, rho: [u8; 32], pkhash: [u8; 32] },
    /// Public fields plus the private vector and FO failure secret needed
    /// for `decaps`.
    Private {
        t_hat: Vector<K>,
        m_hat: Matrix<K>,
        rho: [u8; 32],
        pkhash: [u8; 32],
        s_hat: Vector<K>,
        z: [u8; 32],
    },
}

/// A populated (or not-yet-populated) key for one ML-KEM parameter set.
/// `ETA1_64`/`ETA2_64` are `eta1`/`eta2` scaled by the 64-byte PRF block
/// size, the same manual constant-folding `lib.rs`'s per-variant modules do.
pub(crate) struct Key<const K: usize, const ETA1_64: usize, const ETA2_64: usize> {
    state: KeyState<K>,
}

impl<const K: usize, const ETA1_64: usize, const ETA2_64: usize> Key<K, ETA1_64, ETA2_64> {
    /// An unpopulated key. Never observable outside this module: every
    /// constructor below returns an already-populated key.
    pub(crate) fn empty() -> Self { Key { state: KeyState::Empty } }

    /// `genkey_seed(variant, seed)`: deterministic generation from `d ‖ z`.
    /// `ek_scratch`/`dk_pke_scratch` are caller-provided transient buffers
    /// (sized `384*K+32` and `384*K`) used to run the existing byte-oriented
    /// `k_pke_key_gen` and then decoded back into cached vector form; the
    /// caller already owns buffers this size for the key's wire encoding, so
    /// no allocation is introduced here.
    pub(crate) fn genkey_seed(
        d: [u8; 32], z: [u8; 32], ek_scratch: &mut [u8], dk_pke_scratch: &mut [u8],
    ) -> Result<Self, Error> {
        Key::empty().populate_seed(d, z, ek_scratch, dk_pke_scratch)
    }

    /// `genkey_rand(variant, rng)`: draws `(d, z)` from `rng` and runs
    /// [`Key::genkey_seed`].
    pub(crate) fn genkey_rand(
        rng: &mut impl CryptoRngCore, ek_scratch: &mut [u8], dk_pke_scratch: &mut [u8],
    ) -> Result<Self, Error> {
        let mut d = [0u8; 32];
        rng.try_fill_bytes(&mut d).map_err(|_| Error::Rng)?;
        let mut z = [0u8; 32];
        rng.try_fill_bytes(&mut z).map_err(|_| Error::Rng)?;
        Key::genkey_seed(d, z, ek_scratch, dk_pke_scratch)
    }

    /// `parse_public(variant, bytes)`.
    pub(crate) fn parse_public(bytes: &[u8]) -> Result<Self, Error> {
        Key::empty().populate_public(bytes)
    }

    /// `parse_private(variant, bytes)`: verifies the embedded `H(ek)` against
    /// a recomputation; mismatch is a parse failure.
    pub(crate) fn parse_private(bytes: &[u8]) -> Result<Self, Error> {
        Key::empty().populate_private(bytes)
    }

    fn populate_seed(
        mut self, d: [u8; 32], z: [u8; 32], ek_scratch: &mut [u8], dk_pke_scratch: &mut [u8],
    ) -> Result<Self, Error> {
        ensure!(matches!(self.state, KeyState::Empty), Error::MutationRejected);
        debug_assert_eq!(ek_scratch.len(), 384 * K + 32);
        debug_assert_eq!(dk_pke_scratch.len(), 384 * K);

        k_pke_key_gen::<K, ETA1_64>(d, ek_scratch, dk_pke_scratch);

        let mut t_hat = [[Z::ZERO; 256]; K];
        for (i, chunk) in ek_scratch.chunks(384).enumerate().take(K) {
            t_hat[i] = byte_decode(12, chunk)?;
        }
        let rho: [u8; 32] = ek_scratch[384 * K..].try_into().unwrap();
        let pkhash = h(ek_scratch);
        let m_hat = expand_a_hat(&rho);

        let mut s_hat = [[Z::ZERO; 256]; K];
        for (i, chunk) in dk_pke_scratch.chunks(384).enumerate() {
            s_hat[i] = byte_decode(12, chunk)?;
        }

        self.state = KeyState::Private { t_hat, m_hat, rho, pkhash, s_hat, z };
        Ok(self)
    }

    fn populate_public(mut self, bytes: &[u8]) -> Result<Self, Error> {
        ensure!(matches!(self.state, KeyState::Empty), Error::MutationRejected);
        check_len(bytes.len(), 384 * K + 32)?;

        let mut t_hat = [[Z::ZERO; 256]; K];
        for (i, chunk) in bytes.chunks(384).enumerate().take(K) {
            t_hat[i] = byte_decode(12, chunk)?;
        }
        let rho: [u8; 32] = bytes[384 * K..].try_into().unwrap();
        let m_hat = expand_a_hat(&rho);
        let pkhash = h(bytes);

        self.state = KeyState::Public { t_hat, m_hat, rho, pkhash };
        Ok(self)
    }

    fn populate_private(mut self, bytes: &[u8]) -> Result<Self, Error> {
        ensure!(matches!(self.state, KeyState::Empty), Error::MutationRejected);
        let dk_pke_len = 384 * K;
        let ek_len = 384 * K + 32;
        check_len(bytes.len(), dk_pke_len + ek_len + 32 + 32)?;

        let sk_bytes = &bytes[..dk_pke_len];
        let ek_bytes = &bytes[dk_pke_len..dk_pke_len + ek_len];
        let h_ek_stored = &bytes[dk_pke_len + ek_len..dk_pke_len + ek_len + 32];
        let z: [u8; 32] = bytes[dk_pke_len + ek_len + 32..].try_into().unwrap();

        let pkhash = h(ek_bytes);
        ensure!(
            bool::from(pkhash.as_slice().ct_eq(h_ek_stored)),
            Error::InvalidEncoding("decapsulation key's embedded H(ek) does not match ek")
        );

        let mut s_hat = [[Z::ZERO; 256]; K];
        for (i, chunk) in sk_bytes.chunks(384).enumerate() {
            s_hat[i] = byte_decode(12, chunk)?;
        }
        let mut t_hat = [[Z::ZERO; 256]; K];
        for (i, chunk) in ek_bytes.chunks(384).enumerate().take(K) {
            t_hat[i] = byte_decode(12, chunk)?;
        }
        let rho: [u8; 32] = ek_bytes[384 * K..].try_into().unwrap();
        let m_hat = expand_a_hat(&rho);

        self.state = KeyState::Private { t_hat, m_hat, rho, pkhash, s_hat, z };
        Ok(self)
    }

    /// `encode_public(key)`: writes `Encode12(t) ‖ rho` into `out` (length
    /// `384*K+32`).
    pub(crate) fn encode_public(&self, out: &mut [u8]) -> Result<(), Error> {
        let (t_hat, _, rho, _) = self.public_parts()?;
        debug_assert_eq!(out.len(), 384 * K + 32);
        for (i, chunk) in out.chunks_mut(384).enumerate().take(K) {
            byte_encode(12, &t_hat[i], chunk);
        }
        out[384 * K..].copy_from_slice(rho);
        Ok(())
    }

    /// `encode_private(key)`: writes `Encode12(s) ‖ ek ‖ H(ek) ‖ z` into
    /// `out` (length `384*K + (384*K+32) + 32 + 32`).
    pub(crate) fn encode_private(&self, out: &mut [u8]) -> Result<(), Error> {
        let (s_hat, z) = self.private_parts()?;
        let dk_pke_len = 384 * K;
        let ek_len = 384 * K + 32;
        debug_assert_eq!(out.len(), dk_pke_len + ek_len + 32 + 32);

        for (i, chunk) in out[..dk_pke_len].chunks_mut(384).enumerate() {
            byte_encode(12, &s_hat[i], chunk);
        }
        let (ek_out, rest) = out[dk_pke_len..].split_at_mut(ek_len);
        self.encode_public(ek_out)?;
        let (h_ek_out, z_out) = rest.split_at_mut(32);
        h_ek_out.copy_from_slice(&h(ek_out));
        z_out.copy_from_slice(z);
        Ok(())
    }

    /// `encaps_seed(key, entropy)`: deterministic encapsulation from
    /// caller-supplied 32-byte entropy.
    pub(crate) fn encaps_seed(
        &self, du: u32, dv: u32, entropy: &[u8; 32], ct: &mut [u8],
    ) -> Result<SharedSecretKey, Error> {
        let (t_hat, m_hat, _, pkhash) = self.public_parts()?;
        let (k, r) = g(&[entropy, pkhash]);
        k_pke_encrypt_cached::<K, ETA1_64, ETA2_64>(du, dv, m_hat, t_hat, entropy, &r, ct)?;
        Ok(SharedSecretKey(k))
    }

    /// `encaps(key, rng)`: draws 32 bytes of entropy from `rng` and runs
    /// [`Key::encaps_seed`].
    pub(crate) fn encaps(
        &self, rng: &mut impl CryptoRngCore, du: u32, dv: u32, ct: &mut [u8],
    ) -> Result<SharedSecretKey, Error> {
        let mut entropy = [0u8; 32];
        rng.try_fill_bytes(&mut entropy).map_err(|_| Error::Rng)?;
        self.encaps_seed(du, dv, &entropy, ct)
    }

    /// `decaps(key, ciphertext)`. Always returns `Ok`: implicit rejection
    /// means there is no observable "ciphertext invalid" outcome for a
    /// well-formed-length ciphertext. `c_prime_scratch` is a caller-supplied
    /// buffer the same length as `ct`, used for the re-encryption check.
    pub(crate) fn decaps(
        &self, du: u32, dv: u32, ct: &[u8], c_prime_scratch: &mut [u8],
    ) -> Result<SharedSecretKey, Error> {
        debug_assert_eq!(c_prime_scratch.len(), ct.len());
        let (t_hat, m_hat, _, pkhash) = self.public_parts()?;
        let (s_hat, z) = self.private_parts()?;

        let m_prime = k_pke_decrypt_cached::<K>(du, dv, s_hat, ct)?;
        let (mut k_prime, r_prime) = g(&[&m_prime, pkhash]);
        let k_bar = j(z, ct);

        k_pke_encrypt_cached::<K, ETA1_64, ETA2_64>(
            du, dv, m_hat, t_hat, &m_prime, &r_prime, c_prime_scratch,
        )?;

        k_prime.conditional_assign(&k_bar, ct.ct_ne(&*c_prime_scratch));
        Ok(SharedSecretKey(k_prime))
    }

    /// `public_equal(key1, key2)`: compares `pkhash`. Public information —
    /// no constant-time requirement.
    pub(crate) fn public_equal(&self, other: &Self) -> bool {
        match (self.public_parts(), other.public_parts()) {
            (Ok((_, _, _, a)), Ok((_, _, _, b))) => a == b,
            _ => false,
        }
    }

    pub(crate) fn is_populated(&self) -> bool { !matches!(self.state, KeyState::Empty) }

    #[allow(clippy::type_complexity)]
    fn public_parts(&self) -> Result<(&Vector<K>, &Matrix<K>, &[u8; 32], &[u8; 32]), Error> {
        match &self.state {
            KeyState::Empty => {
                Err(Error::InvalidEncoding("operation requires a populated key"))
            }
            KeyState::Public { t_hat, m_hat, rho, pkhash }
            | KeyState::Private { t_hat, m_hat, rho, pkhash, .. } => Ok((t_hat, m_hat, rho, pkhash)),
        }
    }

    fn private_parts(&self) -> Result<(&Vector<K>, &[u8; 32]), Error> {
        match &self.state {
            KeyState::Private { s_hat, z, .. } => Ok((s_hat, z)),
            _ => Err(Error::InvalidEncoding("operation requires a populated private key")),
        }
    }
}

impl<const K: usize, const ETA1_64: usize, const ETA2_64: usize> Drop for Key<K, ETA1_64, ETA2_64> {
    fn drop(&mut self) {
        if let KeyState::Private { s_hat, z, .. } = &mut self.state {
            for poly in s_hat.iter_mut() {
                for coeff in poly.iter_mut() {
                    coeff.set_u16(0);
                }
            }
            z.zeroize();
        }
    }
}
