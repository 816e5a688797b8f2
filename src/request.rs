//! Render requests and their transport encodings.
//!
//! A [`RenderRequest`] travels as JSON, usually wrapped in base64 so it fits
//! in a URL path segment (the "card hash").
//!
//! # Example
//!
//! ```
//! use card_renderer::{Dye, RenderRequest};
//!
//! let request = RenderRequest::from_hash("eyJpZCI6MSwiZnJhbWUiOjJ9").unwrap();
//! assert_eq!(request.character_id, 1);
//! assert_eq!(request.frame, 2);
//! assert_eq!(request.dye, Dye::DEFAULT);
//! ```

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine as _, alphabet};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Standard alphabet, padding optional on decode.
const HASH_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ============================================================================
// Dye
// ============================================================================

/// A packed `0xRRGGBB` dye color.
///
/// Bits above the low 24 are ignored; alpha always comes from the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct Dye(pub u32);

impl Dye {
    /// Neutral gray used when a request carries no dye (`0x7E7E7E`).
    pub const DEFAULT: Self = Self(8289918);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self((u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b))
    }

    /// Unpacks the red, green and blue channels.
    pub fn rgb(self) -> [u8; 3] {
        [
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        ]
    }
}

impl Default for Dye {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for Dye {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// ============================================================================
// RenderRequest
// ============================================================================

/// Everything needed to render one card.
///
/// # JSON Format
///
/// ```json
/// {
///   "id": 1,
///   "dye": 8289918,
///   "frame": 0,
///   "custom_image": false,
///   "glow": false,
///   "offset_x": 0,
///   "offset_y": 0
/// }
/// ```
///
/// Only `id` is required; everything else falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct RenderRequest {
    /// Character id, or the player card id when `custom_image` is set.
    #[serde(rename = "id")]
    pub character_id: u32,

    pub dye: Dye,

    /// Index into the frame registry.
    pub frame: u32,

    /// Use player-submitted art instead of stock art.
    pub custom_image: bool,

    /// Use the glow variants of the frame layers.
    pub glow: bool,

    /// Horizontal shift applied to every layer, in pixels.
    pub offset_x: i32,

    /// Vertical shift applied to every layer, in pixels.
    pub offset_y: i32,
}

impl RenderRequest {
    /// Creates a request for stock art of `character_id` in the default frame.
    pub fn new(character_id: u32) -> Self {
        Self {
            character_id,
            ..Self::default()
        }
    }

    pub fn with_dye(mut self, dye: impl Into<Dye>) -> Self {
        self.dye = dye.into();
        self
    }

    pub fn with_frame(mut self, frame: u32) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_custom_image(mut self, custom_image: bool) -> Self {
        self.custom_image = custom_image;
        self
    }

    pub fn with_glow(mut self, glow: bool) -> Self {
        self.glow = glow;
        self
    }

    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    /// Serializes the request to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a request from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Decodes a base64 card hash carrying the JSON request.
    pub fn from_hash(hash: &str) -> Result<Self, RequestError> {
        let bytes = HASH_ENGINE.decode(hash.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Encodes the request as a padded base64 card hash.
    pub fn to_hash(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(HASH_ENGINE.encode(json))
    }
}

// ============================================================================
// CardSet
// ============================================================================

/// Several cards composed into one image (album or fan).
///
/// Travels like a single request: `{"cards": [{"id": 1}, {"id": 2, "frame": 2}]}`,
/// optionally wrapped in base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct CardSet {
    pub cards: Vec<RenderRequest>,
}

impl CardSet {
    pub fn new(cards: impl IntoIterator<Item = RenderRequest>) -> Self {
        Self {
            cards: cards.into_iter().collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Decodes a base64 hash carrying the JSON card list.
    pub fn from_hash(hash: &str) -> Result<Self, RequestError> {
        let bytes = HASH_ENGINE.decode(hash.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn to_hash(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(HASH_ENGINE.encode(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dye_unpacks_channels() {
        assert_eq!(Dye(0x12_34_56).rgb(), [0x12, 0x34, 0x56]);
        assert_eq!(Dye(0xFF_12_34_56).rgb(), [0x12, 0x34, 0x56]);
        assert_eq!(Dye::DEFAULT.rgb(), [0x7E, 0x7E, 0x7E]);
        assert_eq!(Dye::from_rgb(1, 2, 3), Dye(0x01_02_03));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let request = RenderRequest::from_json(r#"{"id": 5}"#).unwrap();
        assert_eq!(request, RenderRequest::new(5));
        assert_eq!(request.dye, Dye::DEFAULT);
        assert_eq!(request.frame, 0);
        assert!(!request.custom_image && !request.glow);
        assert_eq!((request.offset_x, request.offset_y), (0, 0));
    }

    #[test]
    fn explicit_zero_dye_is_black() {
        let request = RenderRequest::from_json(r#"{"id": 5, "dye": 0}"#).unwrap();
        assert_eq!(request.dye.rgb(), [0, 0, 0]);
    }

    #[test]
    fn json_uses_wire_field_names() {
        let request = RenderRequest::new(3)
            .with_custom_image(true)
            .with_offset(-4, 9);
        let json = request.to_json().unwrap();

        assert!(json.contains("\"id\":3"));
        assert!(json.contains("\"custom_image\":true"));
        assert!(json.contains("\"offset_x\":-4"));
        assert!(json.contains("\"offset_y\":9"));
    }

    #[test]
    fn decodes_padded_and_unpadded_hashes() {
        let padded = RenderRequest::from_hash("eyJpZCI6N30=").unwrap();
        let unpadded = RenderRequest::from_hash("eyJpZCI6N30").unwrap();
        assert_eq!(padded, RenderRequest::new(7));
        assert_eq!(unpadded, padded);
    }

    #[test]
    fn decodes_full_hash() {
        let request =
            RenderRequest::from_hash("eyJpZCI6NDIsImR5ZSI6MTY3MTE2ODAsImdsb3ciOnRydWV9").unwrap();
        assert_eq!(request.character_id, 42);
        assert_eq!(request.dye.rgb(), [0xFF, 0, 0]);
        assert!(request.glow);
    }

    #[test]
    fn hash_roundtrip_keeps_every_field() {
        let request = RenderRequest::new(9)
            .with_dye(0x00_80_FF)
            .with_frame(2)
            .with_glow(true)
            .with_offset(3, -3);
        let hash = request.to_hash().unwrap();
        assert_eq!(RenderRequest::from_hash(&hash).unwrap(), request);
    }

    #[test]
    fn rejects_bad_hashes() {
        assert!(matches!(
            RenderRequest::from_hash("not base64!"),
            Err(RequestError::InvalidHash(_))
        ));
        // "hello" in base64 is valid encoding but not JSON
        assert!(matches!(
            RenderRequest::from_hash("aGVsbG8="),
            Err(RequestError::InvalidJson(_))
        ));
    }

    #[test]
    fn card_set_fills_per_card_defaults() {
        let set = CardSet::from_json(r#"{"cards": [{"id": 1}, {"id": 2, "frame": 2}]}"#).unwrap();
        assert_eq!(
            set,
            CardSet::new([RenderRequest::new(1), RenderRequest::new(2).with_frame(2)])
        );

        let hash = set.to_hash().unwrap();
        assert_eq!(CardSet::from_hash(hash.trim_end_matches('=')).unwrap(), set);
    }

    #[test]
    fn card_set_requires_card_list() {
        assert!(CardSet::from_json(r#"{"id": 1}"#).is_err());
        assert!(matches!(
            CardSet::from_hash("e30="),
            Err(RequestError::InvalidJson(_))
        ));
    }
}
