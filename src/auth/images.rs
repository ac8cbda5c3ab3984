//! The pool of images a graphical password is chosen from.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use super::graphical::GraphicalError;
use crate::config::GraphicalConfig;
use crate::{GraphAuthError, Result};

/// Maximum identifier length in bytes.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// File extensions picked up when loading a pool from a directory.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// Built-in image identifiers.
pub const BUILTIN_IMAGES: &[&str] = &[
    "anonymity.png",
    "bitcoin.png",
    "blackcoin.png",
    "block_chain.png",
    "centralized.png",
    "conversion.png",
    "currency_cap.png",
    "decentralized.png",
    "decryption.png",
    "digital_key.png",
    "disclosed_identity.png",
    "distributed.png",
    "dogecoin.png",
    "emercoin.png",
    "encryption.png",
    "ethereum.png",
    "feathercoin.png",
    "free.png",
    "ledger.png",
    "litecoin.png",
    "lost_key.png",
    "mastercoin.png",
    "miner.png",
    "miner2.png",
    "mining.png",
    "mining2.png",
    "mining_center.png",
    "mining_pool.png",
    "mining_pool2.png",
    "monero.png",
    "myriad.png",
    "namecoin.png",
    "no_double_spending.png",
    "nxt.png",
    "p2p.png",
    "peercoin.png",
    "ponzi_scheme.png",
    "primecoin.png",
    "pseudonimity.png",
    "pyramid_scheme.png",
    "receive.png",
    "ripple.png",
    "send.png",
    "siacoin.png",
    "stellar_lumen.png",
    "transaction.png",
    "tumbler.png",
    "wallet.png",
    "zcash.png",
    "zcoin.png",
];

/// Check that an identifier can be part of a pool.
///
/// Identifiers double as file names under `/images/`, so they must be
/// non-empty, at most [`MAX_IDENTIFIER_LENGTH`] bytes, and free of control
/// characters and path separators.
pub fn validate_identifier(id: &str) -> std::result::Result<(), GraphicalError> {
    let invalid = id.is_empty()
        || id.len() > MAX_IDENTIFIER_LENGTH
        || id == "."
        || id == ".."
        || id.chars().any(|c| c.is_control() || c == '/' || c == '\\');

    if invalid {
        return Err(GraphicalError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

/// Ordered, duplicate-free set of image identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePool {
    images: Vec<String>,
    index: HashSet<String>,
}

impl ImagePool {
    /// Build a pool from identifiers. Order is kept; repeats are dropped.
    pub fn new<I, S>(ids: I) -> std::result::Result<Self, GraphicalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut images = Vec::new();
        let mut index = HashSet::new();

        for id in ids {
            let id = id.into();
            validate_identifier(&id)?;
            if index.insert(id.clone()) {
                images.push(id);
            }
        }

        Ok(Self { images, index })
    }

    /// The 50 built-in images.
    pub fn builtin() -> Self {
        let images: Vec<String> = BUILTIN_IMAGES.iter().map(|s| s.to_string()).collect();
        let index = images.iter().cloned().collect();
        Self { images, index }
    }

    /// Load identifiers from the image files in a directory, sorted by name.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut names = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false);
            if !is_image {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!(?name, "Skipping non UTF-8 image file name"),
            }
        }

        if names.is_empty() {
            return Err(GraphAuthError::Config(format!(
                "no image files found in {}",
                dir.display()
            )));
        }

        names.sort();
        Self::new(names).map_err(|e| GraphAuthError::Config(e.to_string()))
    }

    /// Resolve the pool for a deployment.
    ///
    /// An explicit `graphical.images` list wins, then the image directory if it
    /// exists, then the built-in pool.
    pub fn from_config<P: AsRef<Path>>(config: &GraphicalConfig, image_dir: P) -> Result<Self> {
        let image_dir = image_dir.as_ref();

        let pool = if !config.images.is_empty() {
            Self::new(config.images.iter().cloned())
                .map_err(|e| GraphAuthError::Config(e.to_string()))?
        } else if image_dir.is_dir() {
            Self::from_dir(image_dir)?
        } else {
            Self::builtin()
        };

        info!(images = pool.len(), "Image pool loaded");
        Ok(pool)
    }

    /// Whether `id` is part of the pool.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Iterate identifiers in pool order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.images.iter().map(String::as_str)
    }

    /// Identifiers in pool order.
    pub fn as_slice(&self) -> &[String] {
        &self.images
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl Default for ImagePool {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_pool() {
        let pool = ImagePool::builtin();
        assert_eq!(pool.len(), 50);
        assert!(pool.contains("bitcoin.png"));
        assert!(pool.contains("zcoin.png"));
        assert!(!pool.contains("btc"));
        assert_eq!(pool.iter().next(), Some("anonymity.png"));
    }

    #[test]
    fn test_builtin_identifiers_are_valid_and_unique() {
        for id in BUILTIN_IMAGES {
            assert!(validate_identifier(id).is_ok(), "{id}");
        }
        assert_eq!(ImagePool::new(BUILTIN_IMAGES.iter().copied()).unwrap().len(), 50);
    }

    #[test]
    fn test_new_keeps_order_and_drops_repeats() {
        let pool = ImagePool::new(["btc", "eth", "btc", "doge"]).unwrap();
        assert_eq!(pool.as_slice(), &["btc", "eth", "doge"]);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_invalid_identifiers() {
        let too_long = "x".repeat(MAX_IDENTIFIER_LENGTH + 1);
        for id in ["", "..", "a/b", "a\\b", "line\nbreak", too_long.as_str()] {
            assert!(
                matches!(
                    validate_identifier(id),
                    Err(GraphicalError::InvalidIdentifier(_))
                ),
                "{id:?}"
            );
        }
        assert!(validate_identifier(&"x".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
        assert!(ImagePool::new(["ok.png", "bad/one.png"]).is_err());
    }

    #[test]
    fn test_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta.png", "alpha.PNG", "beta.svg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"img").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let pool = ImagePool::from_dir(dir.path()).unwrap();
        assert_eq!(pool.as_slice(), &["alpha.PNG", "beta.svg", "zeta.png"]);
    }

    #[test]
    fn test_from_dir_without_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), b"text").unwrap();

        let result = ImagePool::from_dir(dir.path());
        assert!(matches!(result, Err(GraphAuthError::Config(_))));
    }

    #[test]
    fn test_from_config_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.png"), b"img").unwrap();

        let explicit = GraphicalConfig {
            images: vec!["btc".into(), "eth".into()],
            ..Default::default()
        };
        let pool = ImagePool::from_config(&explicit, dir.path()).unwrap();
        assert_eq!(pool.as_slice(), &["btc", "eth"]);

        let pool = ImagePool::from_config(&GraphicalConfig::default(), dir.path()).unwrap();
        assert_eq!(pool.as_slice(), &["one.png"]);

        let missing = dir.path().join("missing");
        let pool = ImagePool::from_config(&GraphicalConfig::default(), missing).unwrap();
        assert_eq!(pool, ImagePool::builtin());
    }
}
