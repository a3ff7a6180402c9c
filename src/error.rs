//! Typed error kinds for the core, per FIPS 203 §7 error handling design.
//!
//! Decapsulation never produces a distinguishable "ciphertext invalid" variant
//! of this enum on well-formed-length input: see [`crate::ml_kem::ml_kem_decaps`],
//! which always returns `Ok` (either the real shared secret or the
//! implicit-rejection one) once the input lengths check out.

use core::fmt;

/// Errors surfaced at the public entry points of the core.
///
/// All errors surface atomically at the entry point of the failing
/// operation; a failed populate leaves a [`crate::key::Key`] empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// An input byte slice had the wrong length for the declared variant.
    InvalidLength {
        /// Length required by the variant.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
    /// A decoded value failed a format check: `ByteDecode_12` produced a
    /// coefficient ≥ q, or a private-key parse's recomputed `H(ek)` did not
    /// match the embedded hash.
    InvalidEncoding(&'static str),
    /// A key that was already populated (by keygen or parse) was asked to
    /// populate again. Keys are immutable once populated.
    MutationRejected,
    /// The underlying hash/XOF primitive failed. Treated as a fatal setup
    /// error, distinct from a secret-dependent fault.
    ///
    /// Reserved per the mandated error taxonomy rather than currently
    /// reachable: every hash/XOF call in this crate goes through `sha3`'s
    /// `Digest`/`XofReader` traits directly, and those are infallible, so
    /// there is no primitive-level failure for this crate to report today.
    /// Kept so a caller matching on `Error` exhaustively doesn't need to
    /// change if a future primitive backend can fail.
    PrimitiveFailure(&'static str),
    /// The supplied random number generator failed to produce bytes.
    Rng,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidLength { expected, actual } => {
                write!(f, "invalid length: expected {expected} bytes, got {actual}")
            }
            Error::InvalidEncoding(msg) => write!(f, "invalid encoding: {msg}"),
            Error::MutationRejected => write!(f, "key is already populated"),
            Error::PrimitiveFailure(msg) => write!(f, "primitive failure: {msg}"),
            Error::Rng => write!(f, "random number generator failed"),
        }
    }
}

impl core::error::Error for Error {}

/// If the condition is not met, return the given error. Mirrors the
/// teacher's `ensure!` (itself borrowed from `anyhow`), but typed.
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err);
        }
    };
}

pub(crate) use ensure;

/// Checks a byte slice against the expected length for an operation,
/// returning [`Error::InvalidLength`] on mismatch.
pub(crate) fn check_len(actual: usize, expected: usize) -> Result<(), Error> {
    ensure!(actual == expected, Error::InvalidLength { expected, actual });
    Ok(())
}
