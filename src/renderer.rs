//! Card compositor.

use image::RgbaImage;
use tracing::{debug, error, warn};

use crate::asset::{AssetKey, AssetStore, StoreError, decode_rgba};
use crate::deadline::{CancelSignal, Checkpoint, DeadlineGuard};
use crate::error::{RenderError, RenderResult};
use crate::frame::FrameRegistry;
use crate::layer::{CardLayer, CharacterLayer, MaskLayer, RecolorMode, RenderContext, StaticLayer};
use crate::request::RenderRequest;

// ============================================================================
// CardRenderer
// ============================================================================

/// Renders cards from a frame registry and an asset store.
///
/// The renderer holds no per-request state, so one instance can serve many
/// threads at once as long as the store allows it. Each call owns its
/// canvas and decoded layers.
///
/// # Example
///
/// ```
/// use card_renderer::{
///     AssetKey, CardRenderer, FrameRegistry, MemoryAssetStore, NeverCancel, RenderRequest,
/// };
/// use image::{Rgba, RgbaImage};
///
/// let mut store = MemoryAssetStore::new();
/// store
///     .insert_image(AssetKey::character(1, false), &RgbaImage::from_pixel(245, 370, Rgba([9, 9, 9, 255])))
///     .unwrap();
/// store
///     .insert_image(AssetKey::mask("default", false), &RgbaImage::new(245, 370))
///     .unwrap();
///
/// let registry = FrameRegistry::builtin();
/// let renderer = CardRenderer::new(&registry, store);
/// let card = renderer.render(&RenderRequest::new(1), &NeverCancel).unwrap();
/// assert_eq!(card.dimensions(), (245, 370));
/// ```
pub struct CardRenderer<'r, S> {
    registry: &'r FrameRegistry,
    store: S,
    recolor_mode: RecolorMode,
}

impl<'r, S: AssetStore> CardRenderer<'r, S> {
    pub fn new(registry: &'r FrameRegistry, store: S) -> Self {
        Self {
            registry,
            store,
            recolor_mode: RecolorMode::default(),
        }
    }

    pub fn with_recolor_mode(mut self, mode: RecolorMode) -> Self {
        self.recolor_mode = mode;
        self
    }

    pub fn registry(&self) -> &'r FrameRegistry {
        self.registry
    }

    /// Renders one card.
    ///
    /// Layers are painted character, then mask, then static. `signal` is
    /// polled at each [`Checkpoint`]; a trip aborts with `Cancelled` and no
    /// partial canvas is returned.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(character = request.character_id, frame = request.frame, glow = request.glow)
    )]
    pub fn render(
        &self,
        request: &RenderRequest,
        signal: &dyn CancelSignal,
    ) -> RenderResult<RgbaImage> {
        let frame = self.registry.lookup(request.frame)?;
        let guard = DeadlineGuard::new(signal);
        let mut ctx = RenderContext::new(request, frame);

        let character = self.fetch(&CharacterLayer, &ctx)?;
        guard.check(Checkpoint::CharacterDecoded)?;
        self.paint(&CharacterLayer, &mut ctx, character);

        guard.check(Checkpoint::BeforeMask)?;
        if frame.has_mask_layer {
            let layer = MaskLayer::new(request.dye, self.recolor_mode);
            let mask = self.fetch(&layer, &ctx)?;
            self.paint(&layer, &mut ctx, mask);
        }

        guard.check(Checkpoint::BeforeStatic)?;
        if frame.has_static_layer {
            let decoration = self.fetch(&StaticLayer, &ctx)?;
            self.paint(&StaticLayer, &mut ctx, decoration);
        }

        Ok(ctx.into_canvas())
    }

    /// Reads and decodes the asset a layer needs.
    fn fetch<L: CardLayer>(&self, layer: &L, ctx: &RenderContext<'_>) -> RenderResult<RgbaImage> {
        let key = layer.asset_key(ctx);
        let bytes = self.read(&key)?;

        decode_rgba(&bytes).map_err(|source| {
            error!(%key, layer = layer.name(), "failed to decode asset: {source}");
            RenderError::DecodeFailure { key, source }
        })
    }

    fn read(&self, key: &AssetKey) -> RenderResult<Vec<u8>> {
        self.store.read(key).map_err(|e| {
            match e {
                StoreError::NotFound => warn!(%key, "asset does not exist"),
                StoreError::Io(err) => warn!(%key, "failed to read asset: {err}"),
            }
            RenderError::MissingAsset { key: key.clone() }
        })
    }

    fn paint<L: CardLayer>(&self, layer: &L, ctx: &mut RenderContext<'_>, source: RgbaImage) {
        debug!(
            layer = layer.name(),
            width = source.width(),
            height = source.height(),
            "painting layer"
        );
        layer.paint(ctx, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAssetStore;
    use crate::deadline::{CancelFlag, Deadline, NeverCancel};
    use crate::frame::FrameGeometry;
    use image::Rgba;
    use std::cell::RefCell;
    use std::time::Duration;

    /// Records every key read from the inner store.
    struct RecordingStore {
        inner: MemoryAssetStore,
        reads: RefCell<Vec<AssetKey>>,
    }

    impl RecordingStore {
        fn new(inner: MemoryAssetStore) -> Self {
            Self {
                inner,
                reads: RefCell::new(Vec::new()),
            }
        }

        fn reads(&self) -> Vec<AssetKey> {
            self.reads.borrow().clone()
        }
    }

    impl AssetStore for RecordingStore {
        fn read(&self, key: &AssetKey) -> Result<Vec<u8>, StoreError> {
            self.reads.borrow_mut().push(key.clone());
            self.inner.read(key)
        }
    }

    /// Signal that trips after a number of polls.
    struct TripAfter {
        polls: RefCell<usize>,
        limit: usize,
    }

    impl CancelSignal for TripAfter {
        fn is_cancelled(&self) -> bool {
            let mut polls = self.polls.borrow_mut();
            *polls += 1;
            *polls > self.limit
        }
    }

    fn trip_after(limit: usize) -> TripAfter {
        TripAfter {
            polls: RefCell::new(0),
            limit,
        }
    }

    /// Three 8x6 frames: mask only, mask + static, and a bare frame.
    fn registry() -> FrameRegistry {
        FrameRegistry::new(vec![
            FrameGeometry::new(0, "plain", "Plain", 8, 6).with_mask_layer(),
            FrameGeometry::new(1, "ornate", "Ornate", 8, 6)
                .with_mask_layer()
                .with_static_layer(),
            FrameGeometry::new(2, "bare", "Bare", 8, 6),
        ])
        .unwrap()
    }

    fn full_store() -> MemoryAssetStore {
        let mut store = MemoryAssetStore::new();

        let character = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        store.insert_image(AssetKey::character(1, false), &character).unwrap();

        let custom = RgbaImage::from_pixel(4, 4, Rgba([90, 90, 90, 255]));
        store.insert_image(AssetKey::character(1, true), &custom).unwrap();

        // Mask: white border column at x = 0, transparent elsewhere
        let mut mask = RgbaImage::new(8, 6);
        for y in 0..6 {
            mask.put_pixel(0, y, Rgba([255, 255, 255, 255]));
        }
        for frame in ["plain", "ornate"] {
            store.insert_image(AssetKey::mask(frame, false), &mask).unwrap();
        }

        let mut glow_mask = RgbaImage::new(8, 6);
        glow_mask.put_pixel(7, 5, Rgba([255, 255, 255, 255]));
        store.insert_image(AssetKey::mask("plain", true), &glow_mask).unwrap();

        // Static trim: opaque gold at (0, 0)
        let mut trim = RgbaImage::new(8, 6);
        trim.put_pixel(0, 0, Rgba([212, 175, 55, 255]));
        store.insert_image(AssetKey::static_layer("ornate", false), &trim).unwrap();

        store
    }

    #[test]
    fn canvas_matches_frame_geometry() {
        let registry = registry();
        let renderer = CardRenderer::new(&registry, full_store());

        for frame in registry.iter() {
            let request = RenderRequest::new(1).with_frame(frame.id);
            let card = renderer.render(&request, &NeverCancel).unwrap();
            assert_eq!(card.dimensions(), (frame.width, frame.height));
        }
    }

    #[test]
    fn character_is_centered_under_tinted_mask() {
        let registry = registry();
        let renderer = CardRenderer::new(&registry, full_store());
        let request = RenderRequest::new(1).with_dye(0xFF_00_00);

        let card = renderer.render(&request, &NeverCancel).unwrap();

        // 4x4 character centered in 8x6 -> origin (2, 1)
        assert_eq!(card.get_pixel(2, 1).0, [10, 20, 30, 255]);
        assert_eq!(card.get_pixel(5, 4).0, [10, 20, 30, 255]);
        assert_eq!(card.get_pixel(1, 1).0, [0, 0, 0, 0]);
        assert_eq!(card.get_pixel(6, 0).0, [0, 0, 0, 0]);
        // Mask column dyed red
        assert_eq!(card.get_pixel(0, 3).0, [255, 0, 0, 255]);
    }

    #[test]
    fn static_wins_over_mask() {
        let registry = registry();
        let renderer = CardRenderer::new(&registry, full_store());
        let request = RenderRequest::new(1).with_frame(1).with_dye(0x00_00_FF);

        let card = renderer.render(&request, &NeverCancel).unwrap();

        assert_eq!(card.get_pixel(0, 0).0, [212, 175, 55, 255]);
        assert_eq!(card.get_pixel(0, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn unknown_frame_reads_nothing() {
        let registry = registry();
        let store = RecordingStore::new(full_store());
        let renderer = CardRenderer::new(&registry, &store);

        let err = renderer
            .render(&RenderRequest::new(1).with_frame(99), &NeverCancel)
            .unwrap_err();

        assert!(matches!(
            err,
            RenderError::UnknownFrame {
                frame: 99,
                available: 3
            }
        ));
        assert!(store.reads().is_empty());
    }

    #[test]
    fn reads_only_the_layers_the_frame_has() {
        let registry = registry();
        let store = RecordingStore::new(full_store());
        let renderer = CardRenderer::new(&registry, &store);

        renderer.render(&RenderRequest::new(1).with_frame(2), &NeverCancel).unwrap();
        assert_eq!(store.reads(), vec![AssetKey::character(1, false)]);

        renderer.render(&RenderRequest::new(1).with_frame(1), &NeverCancel).unwrap();
        assert_eq!(
            store.reads()[1..].to_vec(),
            vec![
                AssetKey::character(1, false),
                AssetKey::mask("ornate", false),
                AssetKey::static_layer("ornate", false),
            ]
        );
    }

    #[test]
    fn pre_tripped_signal_skips_frame_assets() {
        let registry = registry();
        let store = RecordingStore::new(full_store());
        let renderer = CardRenderer::new(&registry, &store);
        let request = RenderRequest::new(1).with_frame(1);

        let err = renderer
            .render(&request, &Deadline::after(Duration::ZERO))
            .unwrap_err();

        assert!(matches!(
            err,
            RenderError::Cancelled {
                stage: Checkpoint::CharacterDecoded
            }
        ));
        assert_eq!(store.reads(), vec![AssetKey::character(1, false)]);
    }

    #[test]
    fn cancellation_stops_at_the_next_checkpoint() {
        let registry = registry();
        let store = RecordingStore::new(full_store());
        let renderer = CardRenderer::new(&registry, &store);
        let request = RenderRequest::new(1).with_frame(1);

        let err = renderer.render(&request, &trip_after(2)).unwrap_err();

        assert!(matches!(
            err,
            RenderError::Cancelled {
                stage: Checkpoint::BeforeStatic
            }
        ));
        assert!(!store.reads().contains(&AssetKey::static_layer("ornate", false)));
    }

    #[test]
    fn cancel_flag_aborts_render() {
        let registry = registry();
        let renderer = CardRenderer::new(&registry, full_store());
        let flag = CancelFlag::new();
        flag.cancel();

        let err = renderer.render(&RenderRequest::new(1), &flag).unwrap_err();
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn missing_assets_are_reported_by_key() {
        let registry = registry();
        let renderer = CardRenderer::new(&registry, full_store());

        let err = renderer
            .render(&RenderRequest::new(404), &NeverCancel)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingAsset { ref key } if *key == AssetKey::character(404, false)
        ));

        // "ornate" has no glow art
        let request = RenderRequest::new(1).with_frame(1).with_glow(true);
        let err = renderer.render(&request, &NeverCancel).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingAsset { ref key } if *key == AssetKey::mask("ornate", true)
        ));
    }

    #[test]
    fn corrupt_asset_is_a_decode_failure() {
        let registry = registry();
        let mut store = full_store();
        store.insert(AssetKey::mask("plain", false), b"not an image".to_vec());
        let renderer = CardRenderer::new(&registry, store);

        let err = renderer
            .render(&RenderRequest::new(1), &NeverCancel)
            .unwrap_err();
        assert!(matches!(err, RenderError::DecodeFailure { .. }));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn glow_and_custom_select_variants() {
        let registry = registry();
        let renderer = CardRenderer::new(&registry, full_store());
        let request = RenderRequest::new(1)
            .with_custom_image(true)
            .with_glow(true)
            .with_dye(0x00_FF_00);

        let card = renderer.render(&request, &NeverCancel).unwrap();

        assert_eq!(card.get_pixel(3, 2).0, [90, 90, 90, 255]);
        assert_eq!(card.get_pixel(7, 5).0, [0, 255, 0, 255]);
        assert_eq!(card.get_pixel(0, 3).0, [0, 0, 0, 0]);
    }

    #[test]
    fn offsets_move_every_layer() {
        let registry = registry();
        let renderer = CardRenderer::new(&registry, full_store());
        let request = RenderRequest::new(1).with_offset(1, 0).with_dye(0xFF_FF_FF);

        let card = renderer.render(&request, &NeverCancel).unwrap();

        assert_eq!(card.get_pixel(3, 1).0, [10, 20, 30, 255]);
        assert_eq!(card.get_pixel(2, 1).0, [0, 0, 0, 0]);
        assert_eq!(card.get_pixel(1, 3).0, [255, 255, 255, 255]);
        assert_eq!(card.get_pixel(0, 3).0, [0, 0, 0, 0]);
    }

    #[test]
    fn rendering_is_deterministic() {
        let registry = registry();
        let renderer = CardRenderer::new(&registry, full_store());
        let request = RenderRequest::new(1).with_frame(1).with_dye(0x12_34_56);

        let first = renderer.render(&request, &NeverCancel).unwrap();
        let second = renderer.render(&request, &NeverCancel).unwrap();
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn oklab_mode_changes_mask_only() {
        let registry = registry();
        let renderer =
            CardRenderer::new(&registry, full_store()).with_recolor_mode(RecolorMode::Oklab);
        let request = RenderRequest::new(1).with_dye(0xFF_00_00);

        let card = renderer.render(&request, &NeverCancel).unwrap();

        assert_eq!(card.get_pixel(2, 1).0, [10, 20, 30, 255]);
        let [r, g, b, a] = card.get_pixel(0, 3).0;
        assert_eq!(a, 255);
        assert!(r > g && r > b);
    }
}
