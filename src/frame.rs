//! Frame geometry and the frame registry.
//!
//! A frame decides the canvas size of a card and which decorative layers
//! exist for it. The registry is built once and then only read, so it can be
//! shared by reference between concurrent renders without locking.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RenderError, RenderResult};

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

// ============================================================================
// FrameGeometry
// ============================================================================

/// Geometry and layer capabilities of one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct FrameGeometry {
    /// Identifier used by requests. Equals the frame's index in the registry.
    pub id: u32,

    /// Asset directory name under `private/frame/`.
    pub name: String,

    /// Human-readable name.
    pub display_name: String,

    /// Whether the frame has a dyeable mask layer.
    pub has_mask_layer: bool,

    /// Whether the frame has a fixed-color decoration layer. Static layers
    /// are never dyed.
    pub has_static_layer: bool,

    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        display_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: display_name.into(),
            has_mask_layer: false,
            has_static_layer: false,
            width,
            height,
        }
    }

    pub fn with_mask_layer(mut self) -> Self {
        self.has_mask_layer = true;
        self
    }

    pub fn with_static_layer(mut self) -> Self {
        self.has_static_layer = true;
        self
    }

    /// Canvas size of cards rendered with this frame.
    pub fn size(&self) -> SizePx {
        SizePx::new(self.width, self.height)
    }
}

// ============================================================================
// FrameRegistry
// ============================================================================

/// Read-only table of frames indexed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRegistry {
    frames: Vec<FrameGeometry>,
}

impl FrameRegistry {
    /// Builds a registry, checking that ids run `0..n` in order and that
    /// every canvas is non-empty.
    pub fn new(frames: Vec<FrameGeometry>) -> Result<Self, ConfigError> {
        if frames.is_empty() {
            return Err(ConfigError::NoFrames);
        }

        for (index, frame) in frames.iter().enumerate() {
            let expected = index as u32;
            if frame.id != expected {
                return Err(ConfigError::FrameOutOfOrder {
                    expected,
                    found: frame.id,
                });
            }
            if frame.width == 0 || frame.height == 0 {
                return Err(ConfigError::EmptyFrame {
                    name: frame.name.clone(),
                    width: frame.width,
                    height: frame.height,
                });
            }
        }

        Ok(Self { frames })
    }

    /// The frames shipped with the card service.
    pub fn builtin() -> Self {
        Self {
            frames: vec![
                FrameGeometry::new(0, "default", "Default", 245, 370).with_mask_layer(),
                FrameGeometry::new(1, "beta", "Beta", 251, 376).with_mask_layer(),
                FrameGeometry::new(2, "edo-higan", "Edo Higan", 303, 428)
                    .with_mask_layer()
                    .with_static_layer(),
            ],
        }
    }

    /// Resolves a frame id, failing with `UnknownFrame` when out of range.
    pub fn lookup(&self, frame: u32) -> RenderResult<&FrameGeometry> {
        self.frames
            .get(frame as usize)
            .ok_or(RenderError::UnknownFrame {
                frame,
                available: self.frames.len(),
            })
    }

    /// Finds a frame by its asset directory name.
    pub fn find_by_name(&self, name: &str) -> Option<&FrameGeometry> {
        self.frames.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameGeometry> {
        self.frames.iter()
    }
}

impl Default for FrameRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl<'a> IntoIterator for &'a FrameRegistry {
    type Item = &'a FrameGeometry;
    type IntoIter = std::slice::Iter<'a, FrameGeometry>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
