//! Asset keys and byte-addressable image stores.
//!
//! The renderer only needs "read bytes by key, and tell me if they are
//! absent". [`FsAssetStore`] serves the on-disk layout; [`MemoryAssetStore`]
//! keeps everything in memory.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

// ============================================================================
// AssetKey
// ============================================================================

/// Identifies one image asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKey {
    /// Character portrait, either stock art or player-submitted art.
    Character { id: u32, custom: bool },

    /// Dyeable mask layer of a frame.
    Mask { frame: String, glow: bool },

    /// Fixed-color decoration layer of a frame.
    Static { frame: String, glow: bool },
}

impl AssetKey {
    pub fn character(id: u32, custom: bool) -> Self {
        Self::Character { id, custom }
    }

    pub fn mask(frame: impl Into<String>, glow: bool) -> Self {
        Self::Mask {
            frame: frame.into(),
            glow,
        }
    }

    pub fn static_layer(frame: impl Into<String>, glow: bool) -> Self {
        Self::Static {
            frame: frame.into(),
            glow,
        }
    }

    /// Path of this asset relative to the store root, using `/` separators.
    pub fn relative_path(&self) -> String {
        match self {
            Self::Character { id, custom: false } => format!("public/character/{id}.png"),
            Self::Character { id, custom: true } => format!("public/custom-character/{id}.png"),
            Self::Mask { frame, glow } => {
                format!("private/frame/{frame}/{}mask.png", glow_prefix(*glow))
            }
            Self::Static { frame, glow } => {
                format!("private/frame/{frame}/{}static.png", glow_prefix(*glow))
            }
        }
    }
}

fn glow_prefix(glow: bool) -> &'static str {
    if glow { "glow-" } else { "" }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative_path())
    }
}

// ============================================================================
// AssetStore
// ============================================================================

/// Failure to read an asset.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("asset not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Source of raw asset bytes.
///
/// Implementations must be safe to call from several render threads at once
/// if the renderer is shared between them.
pub trait AssetStore {
    fn read(&self, key: &AssetKey) -> Result<Vec<u8>, StoreError>;
}

impl<S: AssetStore + ?Sized> AssetStore for &S {
    fn read(&self, key: &AssetKey) -> Result<Vec<u8>, StoreError> {
        (**self).read(key)
    }
}

/// Store backed by the CDN directory layout under `root`.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of an asset on disk.
    pub fn path_of(&self, key: &AssetKey) -> PathBuf {
        self.root.join(key.relative_path())
    }
}

impl AssetStore for FsAssetStore {
    fn read(&self, key: &AssetKey) -> Result<Vec<u8>, StoreError> {
        std::fs::read(self.path_of(key)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound,
            _ => StoreError::Io(e),
        })
    }
}

/// In-memory store, mostly useful for embedding assets and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: HashMap<AssetKey, Vec<u8>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw bytes under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: AssetKey, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(key, bytes.into());
    }

    /// Encodes `image` as PNG and stores it under `key`.
    pub fn insert_image(&mut self, key: AssetKey, image: &RgbaImage) -> image::ImageResult<()> {
        let bytes = encode_png(image)?;
        self.insert(key, bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetStore for MemoryAssetStore {
    fn read(&self, key: &AssetKey) -> Result<Vec<u8>, StoreError> {
        self.assets.get(key).cloned().ok_or(StoreError::NotFound)
    }
}

// ============================================================================
// Codec helpers
// ============================================================================

/// Decodes image bytes of any supported format into RGBA8.
pub fn decode_rgba(bytes: &[u8]) -> image::ImageResult<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Encodes an RGBA raster as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
