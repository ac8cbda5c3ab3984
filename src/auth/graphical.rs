//! Graphical password enrollment and verification.
//!
//! A graphical password is an ordered sequence of image identifiers taken
//! from the [`ImagePool`]. It is stored as `Digest(salt || encode(images))`
//! where `encode` writes every identifier as a big-endian `u32` byte length
//! followed by its UTF-8 bytes, so sequence boundaries can never collide
//! (`["ab", "c"]` and `["a", "bc"]` encode differently).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::images::ImagePool;
use crate::config::{GraphicalConfig, MIN_SALT_LENGTH};
use crate::{GraphAuthError, Result};

/// Graphical password errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphicalError {
    /// Sequence length is outside the configured bounds.
    #[error("select between {min} and {max} images for your graphical password (got {actual})")]
    InvalidSequenceLength {
        /// Submitted length.
        actual: usize,
        /// Minimum allowed length.
        min: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// Identifier is not part of the image pool.
    #[error("unknown image: {0}")]
    UnknownImage(String),

    /// The same image appears more than once in the sequence.
    #[error("image selected more than once: {0}")]
    DuplicateImage(String),

    /// Identifier cannot be used in an image pool.
    #[error("invalid image identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Digest function used for graphical passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// SHA-256 (32-byte output).
    #[default]
    Sha256,
    /// SHA-512 (64-byte output).
    Sha512,
}

impl DigestAlgorithm {
    /// Name stored alongside each record.
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Compute `Digest(salt || encode(images))`.
    pub fn digest<S: AsRef<str>>(&self, salt: &[u8], images: &[S]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha256 => digest_sequence::<Sha256, S>(salt, images),
            DigestAlgorithm::Sha512 => digest_sequence::<Sha512, S>(salt, images),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(format!("unknown digest algorithm: {s}")),
        }
    }
}

fn digest_sequence<D: Digest, S: AsRef<str>>(salt: &[u8], images: &[S]) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(salt);
    for image in images {
        let bytes = image.as_ref().as_bytes();
        hasher.update((bytes.len() as u32).to_be_bytes());
        hasher.update(bytes);
    }
    hasher.finalize().to_vec()
}

/// Output of a successful enrollment, ready to be persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Enrollment {
    /// Random per-user salt.
    pub salt: Vec<u8>,
    /// Digest over salt and encoded sequence.
    pub hash: Vec<u8>,
    /// Algorithm that produced `hash`.
    pub algorithm: DigestAlgorithm,
}

impl Enrollment {
    /// Hex-encoded salt for storage.
    pub fn salt_hex(&self) -> String {
        hex::encode(&self.salt)
    }

    /// Hex-encoded digest for storage.
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

// The digest stays out of debug output.
impl fmt::Debug for Enrollment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enrollment")
            .field("salt", &self.salt_hex())
            .field("hash", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Enrolls and verifies graphical passwords against an image pool.
#[derive(Debug, Clone)]
pub struct GraphicalVerifier {
    pool: ImagePool,
    min_images: usize,
    max_images: usize,
    salt_length: usize,
    algorithm: DigestAlgorithm,
}

impl GraphicalVerifier {
    /// Default minimum sequence length.
    pub const DEFAULT_MIN_IMAGES: usize = 4;
    /// Default maximum sequence length.
    pub const DEFAULT_MAX_IMAGES: usize = 6;
    /// Default salt length in bytes.
    pub const DEFAULT_SALT_LENGTH: usize = 16;

    /// Create a verifier with default bounds (4..=6 images, 16-byte salt, SHA-256).
    pub fn new(pool: ImagePool) -> Self {
        Self {
            pool,
            min_images: Self::DEFAULT_MIN_IMAGES,
            max_images: Self::DEFAULT_MAX_IMAGES,
            salt_length: Self::DEFAULT_SALT_LENGTH,
            algorithm: DigestAlgorithm::default(),
        }
    }

    /// Create a verifier from configuration.
    pub fn from_config(config: &GraphicalConfig, pool: ImagePool) -> Result<Self> {
        let algorithm = config
            .algorithm
            .parse::<DigestAlgorithm>()
            .map_err(GraphAuthError::Config)?;

        Self::new(pool)
            .with_bounds(config.min_images, config.max_images)?
            .with_salt_length(config.salt_length)
            .map(|v| v.with_algorithm(algorithm))
    }

    /// Set the allowed sequence length bounds (inclusive).
    pub fn with_bounds(mut self, min_images: usize, max_images: usize) -> Result<Self> {
        if min_images == 0 || min_images > max_images {
            return Err(GraphAuthError::Config(format!(
                "invalid graphical password bounds: {min_images}..={max_images}"
            )));
        }
        self.min_images = min_images;
        self.max_images = max_images;
        Ok(self)
    }

    /// Set the salt length in bytes.
    pub fn with_salt_length(mut self, salt_length: usize) -> Result<Self> {
        if salt_length < MIN_SALT_LENGTH {
            return Err(GraphAuthError::Config(format!(
                "salt length must be at least {MIN_SALT_LENGTH} bytes"
            )));
        }
        self.salt_length = salt_length;
        Ok(self)
    }

    /// Set the digest algorithm used for new enrollments.
    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The image pool sequences are drawn from.
    pub fn pool(&self) -> &ImagePool {
        &self.pool
    }

    /// Minimum sequence length.
    pub fn min_images(&self) -> usize {
        self.min_images
    }

    /// Maximum sequence length.
    pub fn max_images(&self) -> usize {
        self.max_images
    }

    /// Algorithm used for new enrollments.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Check length, pool membership and uniqueness of a sequence.
    pub fn validate_sequence<S: AsRef<str>>(
        &self,
        images: &[S],
    ) -> std::result::Result<(), GraphicalError> {
        if images.len() < self.min_images || images.len() > self.max_images {
            return Err(GraphicalError::InvalidSequenceLength {
                actual: images.len(),
                min: self.min_images,
                max: self.max_images,
            });
        }

        let mut seen = HashSet::with_capacity(images.len());
        for image in images {
            let image = image.as_ref();
            if !self.pool.contains(image) {
                return Err(GraphicalError::UnknownImage(image.to_string()));
            }
            if !seen.insert(image) {
                return Err(GraphicalError::DuplicateImage(image.to_string()));
            }
        }

        Ok(())
    }

    /// Enroll a new graphical password.
    ///
    /// Validates the sequence, draws a fresh salt from the OS RNG and returns
    /// the salt and digest. Nothing is persisted here.
    ///
    /// # Examples
    ///
    /// ```
    /// use graphauth::auth::{GraphicalVerifier, ImagePool};
    ///
    /// let verifier = GraphicalVerifier::new(ImagePool::builtin());
    /// let images = ["bitcoin.png", "ethereum.png", "dogecoin.png", "litecoin.png"];
    ///
    /// let enrollment = verifier.enroll(&images).unwrap();
    /// assert!(verifier.verify(&images, &enrollment.salt, &enrollment.hash));
    /// ```
    pub fn enroll<S: AsRef<str>>(
        &self,
        images: &[S],
    ) -> std::result::Result<Enrollment, GraphicalError> {
        self.validate_sequence(images)?;

        let mut salt = vec![0u8; self.salt_length];
        OsRng.fill_bytes(&mut salt);

        let hash = self.algorithm.digest(&salt, images);

        Ok(Enrollment {
            salt,
            hash,
            algorithm: self.algorithm,
        })
    }

    /// Verify a submitted sequence against a stored salt and digest.
    ///
    /// Uses this verifier's algorithm. Returns `false` for any mismatch,
    /// including wrong length or unknown images.
    pub fn verify<S: AsRef<str>>(&self, images: &[S], salt: &[u8], expected: &[u8]) -> bool {
        Self::verify_with(self.algorithm, images, salt, expected)
    }

    /// Verify using an explicit algorithm (the one recorded with the credential).
    pub fn verify_with<S: AsRef<str>>(
        algorithm: DigestAlgorithm,
        images: &[S],
        salt: &[u8],
        expected: &[u8],
    ) -> bool {
        let actual = algorithm.digest(salt, images);
        actual.ct_eq(expected).into()
    }
}
