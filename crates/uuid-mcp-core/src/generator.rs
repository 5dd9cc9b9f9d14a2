use crate::{Error, Result};
use rand::{RngCore, TryRngCore, rng, rngs::OsRng};
use uuid::{Builder, Uuid};

/// A trait for sources of the 16 random bytes behind a UUID.
///
/// This abstraction allows you to plug in a real random source or a mocked
/// random source in tests. Sources may fail; a failure surfaces to clients as
/// an internal error.
///
/// # Example
/// ```
/// use uuid_mcp_core::{RandSource, Result, UuidGenerator};
///
/// struct FixedRand;
/// impl RandSource for FixedRand {
///     fn rand(&self) -> Result<[u8; 16]> {
///         Ok([0; 16])
///     }
/// }
///
/// let generator = UuidGenerator::new(FixedRand);
/// assert_eq!(
///     generator.generate().unwrap().to_string(),
///     "00000000-0000-4000-8000-000000000000"
/// );
/// ```
pub trait RandSource {
    /// Returns 16 random bytes.
    fn rand(&self) -> Result<[u8; 16]>;
}

impl<R: RandSource + ?Sized> RandSource for Box<R> {
    fn rand(&self) -> Result<[u8; 16]> {
        (**self).rand()
    }
}

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// This RNG is fast, cryptographically secure (ChaCha-based), and
/// automatically reseeded periodically. It never reports failure.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn rand(&self) -> Result<[u8; 16]> {
        let mut bytes = [0_u8; 16];
        rng().fill_bytes(&mut bytes);
        Ok(bytes)
    }
}

/// A `RandSource` that reads straight from the operating system's entropy
/// source on every call.
///
/// Slower than [`ThreadRandom`], and fallible: an OS error is reported as
/// [`Error::Entropy`].
#[derive(Default, Clone, Copy, Debug)]
pub struct OsRandom;

impl RandSource for OsRandom {
    fn rand(&self) -> Result<[u8; 16]> {
        let mut bytes = [0_u8; 16];
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| Error::Entropy {
            context: e.to_string(),
        })?;
        Ok(bytes)
    }
}

/// Produces version 4 UUIDs from a [`RandSource`].
///
/// Of the 128 bits, the version nibble is forced to `4` and the two variant
/// bits to `10`; the remaining 122 come from the source unchanged.
#[derive(Clone, Debug)]
pub struct UuidGenerator<R> {
    rng: R,
}

impl<R: RandSource> UuidGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&self) -> Result<Uuid> {
        let bytes = self.rng.rand()?;
        Ok(Builder::from_random_bytes(bytes).into_uuid())
    }
}
