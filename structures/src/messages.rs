//! JSON frames exchanged with the placement server.
//!
//! Only the shapes live here. Signing, the outer `{pkey, signature, inner}`
//! frame and the socket itself belong to the transport, which hands us
//! already-validated frames and signs the [`Inner`] bodies we produce.

use crate::Rgba;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlacePixel {
    pub x: u32,
    pub y: u32,
    /// Three (RGB) or four (RGBA) channels.
    pub color: Vec<u8>,
}

impl PlacePixel {
    /// Builds a placement from a fractional canvas position, flooring both
    /// coordinates. Returns `None` for points left of or above the canvas.
    pub fn from_canvas_point(x: f64, y: f64, color: &[u8]) -> Option<Self> {
        let (x, y) = (x.floor(), y.floor());
        if !(x >= 0.0 && y >= 0.0 && x <= u32::MAX as f64 && y <= u32::MAX as f64) {
            return None;
        }

        Some(Self {
            x: x as u32,
            y: y as u32,
            color: color.to_vec(),
        })
    }

    /// Expands the wire color to RGBA. RGB colors get an opaque alpha.
    pub fn rgba(&self) -> Option<Rgba> {
        match self.color.as_slice() {
            [r, g, b] => Some([*r, *g, *b, 0xff]),
            [r, g, b, a] => Some([*r, *g, *b, *a]),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum Content {
    PlacePixel(PlacePixel),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Inner {
    #[serde(default)]
    pub nonce: u64,
    pub content: Content,
}

impl Inner {
    pub fn place_pixel(nonce: u64, pixel: PlacePixel) -> Self {
        Self {
            nonce,
            content: Content::PlacePixel(pixel),
        }
    }

    /// The exact bytes the transport hashes and signs.
    pub fn signing_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum KeyRef {
    Ed25519(String),
}

impl KeyRef {
    pub fn as_str(&self) -> &str {
        match self {
            KeyRef::Ed25519(key) => key,
        }
    }
}

/// A frame pushed by the server for every accepted placement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PixelUpdate {
    #[serde(default)]
    pub pkey: Option<KeyRef>,
    pub inner: Inner,
}

impl PixelUpdate {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn place_pixel(&self) -> &PlacePixel {
        match &self.inner.content {
            Content::PlacePixel(pixel) => pixel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_payload_is_compact_inner_json() {
        let inner = Inner::place_pixel(
            777,
            PlacePixel {
                x: 1,
                y: 2,
                color: vec![1, 2, 3],
            },
        );

        assert_eq!(
            inner.signing_payload().unwrap(),
            r#"{"nonce":777,"content":{"PlacePixel":{"x":1,"y":2,"color":[1,2,3]}}}"#
        );
    }

    #[test]
    fn parses_server_frame() {
        let frame = r#"{"pkey":{"Ed25519":"edpktfpdouHjAze9TeFcihdpeMng7FSCWbY4BozpSffZ9z85nyyBBB"},"signature":{"Ed25519":"edsig"},"inner":{"nonce":777,"content":{"PlacePixel":{"x":227,"y":357,"color": [0, 1, 2]}}}} "#;

        let update = PixelUpdate::from_json(frame).unwrap();

        assert_eq!(
            update.pkey.as_ref().map(KeyRef::as_str),
            Some("edpktfpdouHjAze9TeFcihdpeMng7FSCWbY4BozpSffZ9z85nyyBBB")
        );
        let pixel = update.place_pixel();
        assert_eq!((pixel.x, pixel.y), (227, 357));
        assert_eq!(pixel.rgba(), Some([0, 1, 2, 0xff]));
    }

    #[test]
    fn parses_frame_without_key_or_nonce() {
        let frame = r#"{"inner":{"content":{"PlacePixel":{"x":4,"y":5,"color":[9,8,7,6]}}}}"#;

        let update = PixelUpdate::from_json(frame).unwrap();

        assert_eq!(update.pkey, None);
        assert_eq!(update.inner.nonce, 0);
        assert_eq!(update.place_pixel().rgba(), Some([9, 8, 7, 6]));
    }

    #[test]
    fn rejects_odd_channel_counts() {
        let pixel = PlacePixel {
            x: 0,
            y: 0,
            color: vec![1, 2],
        };
        assert_eq!(pixel.rgba(), None);
    }

    #[test]
    fn canvas_points_are_floored() {
        let pixel = PlacePixel::from_canvas_point(12.9, 0.2, &[1, 2, 3]).unwrap();
        assert_eq!((pixel.x, pixel.y), (12, 0));

        assert_eq!(PlacePixel::from_canvas_point(-0.5, 3.0, &[1, 2, 3]), None);
        assert_eq!(PlacePixel::from_canvas_point(f64::NAN, 3.0, &[1, 2, 3]), None);
    }
}
