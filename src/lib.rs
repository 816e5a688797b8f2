//! card-renderer: layered card rendering with dyeable frames
//!
//! This crate composites a character portrait with a decorative frame. The
//! frame's mask layer is recolored with a caller-chosen dye, its static layer
//! is painted on top unchanged, and the whole render can be cancelled
//! cooperatively at fixed checkpoints.
//!
//! # Example
//!
//! ```no_run
//! use card_renderer::{CardRenderer, RenderConfig, RenderRequest};
//!
//! let config = RenderConfig::new("/srv/cdn");
//! let registry = config.registry().unwrap();
//! let renderer = CardRenderer::new(&registry, config.asset_store())
//!     .with_recolor_mode(config.recolor_mode);
//!
//! // Frame 2 has both a dyeable mask and static trim
//! let request = RenderRequest::new(1).with_frame(2).with_dye(0xC0_30_30);
//! let card = renderer.render(&request, &config.deadline()).unwrap();
//! let png = card_renderer::encode_png(&card).unwrap();
//! ```
//!
//! Several cards can be composed into one image with
//! [`CardRenderer::render_album`] (a grid) or [`CardRenderer::render_fan`]
//! (an arc of tilted cards).
//!
//! # Card Hashes
//!
//! Requests usually arrive as base64-wrapped JSON:
//!
//! ```
//! use card_renderer::RenderRequest;
//!
//! let request = RenderRequest::from_hash("eyJpZCI6MSwiZnJhbWUiOjJ9").unwrap();
//! assert_eq!(request, RenderRequest::new(1).with_frame(2));
//! ```

mod asset;
mod config;
mod deadline;
mod error;
mod frame;
mod layer;
mod layout;
mod renderer;
mod request;

pub use asset::{
    AssetKey, AssetStore, FsAssetStore, MemoryAssetStore, StoreError, decode_rgba, encode_png,
};
pub use config::RenderConfig;
pub use deadline::{CancelFlag, CancelSignal, Checkpoint, Deadline, DeadlineGuard, NeverCancel};
pub use error::{ConfigError, RenderError, RenderResult, RequestError};
pub use frame::{FrameGeometry, FrameRegistry, SizePx};
pub use layer::{
    CardLayer, CharacterLayer, MaskLayer, RecolorMode, RenderContext, StaticLayer, blend_over,
    composite_over, paint_replace, recolor,
};
pub use layout::{
    AlbumLayout, FAN_CARD_ANGLE, FAN_RADIUS, FanSlot, fan_slots, fan_stacking_order,
};
pub use renderer::CardRenderer;
pub use request::{CardSet, Dye, RenderRequest};
