//! All functionality is covered by traits, so that consumers can work with
//! trait objects or generic code instead of the concrete per-variant types.

use crate::error::Error;
use rand_core::{CryptoRng, CryptoRngCore, RngCore};

#[cfg(feature = "default-rng")]
use rand_core::OsRng;

/// Key generation, specific to one security parameter set.
pub trait KeyGen {
    /// The (public) encapsulation key sent from the originator to the remote party.
    type EncapsKey;
    /// The (private) decapsulation key used by the originator to generate the shared secret.
    type DecapsKey;
    /// A serialized encapsulation key byte array of the correct length.
    type EncapsByteArray;
    /// A serialized decapsulation key byte array of the correct length.
    type DecapsByteArray;

    /// Generates a keypair using the OS default random number generator.
    ///
    /// # Example
    /// ```rust
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// # #[cfg(feature = "ml-kem-512")] {
    /// use ml_kem_core::ml_kem_512;
    /// use ml_kem_core::traits::{KeyGen, SerDes, Decaps, Encaps};
    ///
    /// let (ek1, dk1) = ml_kem_512::KG::try_keygen()?;
    /// let ek2 = ml_kem_512::EncapsKey::try_from_bytes(ek1.clone().into_bytes())?;
    /// let (ssk2, ct2) = ek2.try_encaps()?;
    /// let ssk1 = dk1.try_decaps_vt(&ml_kem_512::CipherText::try_from_bytes(ct2.into_bytes())?)?;
    /// assert_eq!(ssk1, ssk2);
    /// # }
    /// # Ok(())}
    /// ```
    ///
    /// # Errors
    /// Returns an error if the random number generator fails.
    #[cfg(feature = "default-rng")]
    fn try_keygen() -> Result<(Self::EncapsKey, Self::DecapsKey), Error> {
        Self::try_keygen_with_rng_vt(&mut OsRng)
    }

    /// Generates a keypair using a caller-supplied random number generator.
    ///
    /// # Errors
    /// Returns an error if the random number generator fails.
    fn try_keygen_with_rng_vt(
        rng: &mut impl CryptoRngCore,
    ) -> Result<(Self::EncapsKey, Self::DecapsKey), Error>;

    /// Generates a keypair deterministically from a 64-byte seed `d || z`
    /// (spec's `genkey_seed`).
    #[must_use]
    fn keygen_from_seed(d: [u8; 32], z: [u8; 32]) -> (Self::EncapsKey, Self::DecapsKey);

    /// Validates that an encapsulation key and a decapsulation key correspond,
    /// e.g. after both have been serialized, stored, and retrieved separately.
    /// Not constant-time.
    fn validate_keypair_vt(ek: &Self::EncapsByteArray, dk: &Self::DecapsByteArray) -> bool;
}

/// Encapsulation: producing a shared secret and ciphertext from a public key.
pub trait Encaps {
    /// The shared secret key type generated during encapsulation.
    type SharedSecretKey;
    /// The ciphertext type transmitted to the decapsulating party.
    type CipherText;

    /// Encapsulates using the OS default random number generator.
    ///
    /// # Errors
    /// Returns an error if the random number generator fails.
    #[cfg(feature = "default-rng")]
    fn try_encaps(&self) -> Result<(Self::SharedSecretKey, Self::CipherText), Error> {
        self.try_encaps_with_rng_vt(&mut OsRng)
    }

    /// Encapsulates using a caller-supplied random number generator.
    ///
    /// # Errors
    /// Returns an error if the random number generator fails.
    fn try_encaps_with_rng_vt(
        &self, rng: &mut impl CryptoRngCore,
    ) -> Result<(Self::SharedSecretKey, Self::CipherText), Error>;

    /// Encapsulates using caller-supplied 32-byte entropy instead of an RNG
    /// (spec's `encaps_seed`) — deterministic for a fixed entropy value.
    ///
    /// # Errors
    /// Returns an error if the underlying encryption step fails.
    fn encaps_with_seed(
        &self, seed: &[u8; 32],
    ) -> Result<(Self::SharedSecretKey, Self::CipherText), Error> {
        self.try_encaps_with_rng_vt(&mut DummyRng { data: *seed })
    }
}

/// A RNG stand-in that always returns a fixed 32-byte value, letting
/// `encaps_with_seed` reuse the RNG-shaped encapsulation path for a single
/// 32-byte draw of entropy. Not suitable for any other use.
struct DummyRng {
    data: [u8; 32],
}

impl RngCore for DummyRng {
    fn next_u32(&mut self) -> u32 { unimplemented!() }

    fn next_u64(&mut self) -> u64 { unimplemented!() }

    fn fill_bytes(&mut self, _out: &mut [u8]) { unimplemented!() }

    fn try_fill_bytes(&mut self, out: &mut [u8]) -> Result<(), rand_core::Error> {
        out.copy_from_slice(&self.data);
        Ok(())
    }
}

impl CryptoRng for DummyRng {}

/// Decapsulation: recovering the shared secret from a ciphertext and private key.
pub trait Decaps {
    /// The ciphertext type received from the encapsulating party.
    type CipherText;
    /// The shared secret key type generated during decapsulation.
    type SharedSecretKey;

    /// Recovers the shared secret. Always succeeds for a well-formed-length
    /// ciphertext: on a mismatched re-encryption, this returns the
    /// implicit-rejection secret rather than an error (spec §7) — there is no
    /// observable "ciphertext invalid" outcome to distinguish.
    ///
    /// # Errors
    /// Returns an error only if the underlying primitives fail outright.
    fn try_decaps_vt(&self, ct: &Self::CipherText) -> Result<Self::SharedSecretKey, Error>;
}

/// Serialization to and from the fixed-size wire format of a cryptographic object.
pub trait SerDes {
    /// The fixed-size byte array type used for serialization.
    type ByteArray;

    /// Serializes to the fixed-size wire format.
    fn into_bytes(self) -> Self::ByteArray;

    /// Deserializes from the fixed-size wire format, validating as specified
    /// (e.g. the modulus check on an encapsulation key, or the `H(ek)` check
    /// on an expanded decapsulation key).
    ///
    /// # Errors
    /// Returns an error on malformed input.
    fn try_from_bytes(ba: Self::ByteArray) -> Result<Self, Error>
    where
        Self: Sized;
}
