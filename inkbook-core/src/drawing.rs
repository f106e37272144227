//! Drawing blobs - the opaque unit of vector content stored in a notebook.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque, immutable chunk of vector drawing content.
///
/// The bytes are shared, so cloning a blob (and therefore snapshotting a whole
/// model) never copies drawing data. A blob is changed only by replacing it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DrawingBlob(Arc<[u8]>);

impl DrawingBlob {
    /// Wrap raw drawing bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    /// An empty drawing (no strokes).
    #[must_use]
    pub fn empty() -> Self {
        crate::ink::Ink::default().to_blob()
    }

    /// The raw bytes of the drawing.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the encoded drawing in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the blob holds no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for DrawingBlob {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for DrawingBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DrawingBlob({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for DrawingBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl Serialize for DrawingBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.0);
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for DrawingBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BlobVisitor;

        impl Visitor<'_> for BlobVisitor {
            type Value = DrawingBlob;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a base64 encoded drawing")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                base64::engine::general_purpose::STANDARD
                    .decode(value)
                    .map(DrawingBlob::new)
                    .map_err(|e| E::custom(format!("invalid drawing encoding: {e}")))
            }
        }

        deserializer.deserialize_str(BlobVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_serializes_as_base64_string() {
        let blob = DrawingBlob::new(vec![0_u8, 1, 2, 255]);
        let json = serde_json::to_string(&blob).expect("serialize");
        assert_eq!(json, "\"AAEC/w==\"");

        let back: DrawingBlob = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, blob);
    }

    #[test]
    fn test_zero_length_blob_survives_encoding() {
        let blob = DrawingBlob::new(Vec::new());
        assert!(blob.is_empty());
        let json = serde_json::to_string(&blob).expect("serialize");
        let back: DrawingBlob = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.as_bytes(), &[] as &[u8]);
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let result: Result<DrawingBlob, _> = serde_json::from_str("\"not base64!!\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_clone_shares_bytes() {
        let blob = DrawingBlob::new(vec![7_u8; 64]);
        let copy = blob.clone();
        assert!(Arc::ptr_eq(&blob.0, &copy.0));
    }
}
