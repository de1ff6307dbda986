//! crates/tutorial_core/src/encoder.rs
//!
//! Turns an uploaded screenshot into a size-bounded base64 payload that can be
//! sent to providers as JSON and shown back to the user as a data URL.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::PathBuf;

/// A screenshot as it arrives from the caller.
#[derive(Debug, Clone)]
pub enum RawImage {
    /// Bytes already in memory, e.g. a multipart upload, with the declared content type if any.
    Bytes {
        data: Vec<u8>,
        declared_mime: Option<String>,
    },
    /// A file on disk that still has to be read.
    File(PathBuf),
}

impl RawImage {
    pub fn from_bytes(data: impl Into<Vec<u8>>, declared_mime: Option<String>) -> Self {
        Self::Bytes {
            data: data.into(),
            declared_mime,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("Failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("The image is empty")]
    Empty,
    #[error("The image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: usize },
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// A transfer-safe image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: String,
    base64: String,
    byte_len: usize,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Standard base64 of the original bytes, without any data URL prefix.
    pub fn base64(&self) -> &str {
        &self.base64
    }

    /// Size of the original, unencoded image.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

#[derive(Debug, Clone)]
pub struct ImageEncoder {
    max_bytes: usize,
}

impl Default for ImageEncoder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_BYTES)
    }
}

impl ImageEncoder {
    pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub async fn encode(&self, raw: RawImage) -> Result<EncodedImage, EncodingError> {
        let (data, declared_mime) = match raw {
            RawImage::Bytes {
                data,
                declared_mime,
            } => (data, declared_mime),
            RawImage::File(path) => (self.read_file(path).await?, None),
        };

        if data.is_empty() {
            return Err(EncodingError::Empty);
        }
        if data.len() > self.max_bytes {
            return Err(EncodingError::TooLarge {
                size: data.len() as u64,
                limit: self.max_bytes,
            });
        }

        let mime_type = match sniff_mime(&data) {
            Some(mime) => mime.to_string(),
            None => match declared_mime {
                Some(mime) if mime.starts_with("image/") => mime,
                Some(mime) => return Err(EncodingError::UnsupportedFormat(mime)),
                None => {
                    return Err(EncodingError::UnsupportedFormat(
                        "unrecognized image data".to_string(),
                    ))
                }
            },
        };

        Ok(EncodedImage {
            mime_type,
            base64: STANDARD.encode(&data),
            byte_len: data.len(),
        })
    }

    async fn read_file(&self, path: PathBuf) -> Result<Vec<u8>, EncodingError> {
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(source) => return Err(EncodingError::Read { path, source }),
        };
        if metadata.len() > self.max_bytes as u64 {
            return Err(EncodingError::TooLarge {
                size: metadata.len(),
                limit: self.max_bytes,
            });
        }
        tokio::fs::read(&path)
            .await
            .map_err(|source| EncodingError::Read { path, source })
    }
}

/// Recognizes the image formats screenshots come in by their magic bytes.
fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn png_bytes() -> Vec<u8> {
        let mut data = PNG_HEADER.to_vec();
        data.extend_from_slice(&[0, 0, 0, 13, b'I', b'H', b'D', b'R']);
        data
    }

    #[tokio::test]
    async fn encodes_png_bytes_with_sniffed_type() {
        let encoded = ImageEncoder::default()
            .encode(RawImage::from_bytes(png_bytes(), None))
            .await
            .unwrap();

        assert_eq!(encoded.mime_type(), "image/png");
        assert_eq!(encoded.byte_len(), 16);
        assert_eq!(STANDARD.decode(encoded.base64()).unwrap(), png_bytes());
        assert!(encoded.data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[tokio::test]
    async fn sniffed_type_wins_over_declared_type() {
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        let encoded = ImageEncoder::default()
            .encode(RawImage::from_bytes(jpeg, Some("image/png".to_string())))
            .await
            .unwrap();
        assert_eq!(encoded.mime_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn declared_image_type_is_used_for_unknown_formats() {
        let encoded = ImageEncoder::default()
            .encode(RawImage::from_bytes(
                b"BM\x00\x00".to_vec(),
                Some("image/bmp".to_string()),
            ))
            .await
            .unwrap();
        assert_eq!(encoded.mime_type(), "image/bmp");
    }

    #[tokio::test]
    async fn rejects_empty_and_unrecognized_input() {
        let encoder = ImageEncoder::default();
        assert!(matches!(
            encoder.encode(RawImage::from_bytes(Vec::new(), None)).await,
            Err(EncodingError::Empty)
        ));
        assert!(matches!(
            encoder
                .encode(RawImage::from_bytes(b"not an image".to_vec(), None))
                .await,
            Err(EncodingError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            encoder
                .encode(RawImage::from_bytes(
                    b"%PDF-1.7".to_vec(),
                    Some("application/pdf".to_string())
                ))
                .await,
            Err(EncodingError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn enforces_the_size_bound() {
        let result = ImageEncoder::new(8)
            .encode(RawImage::from_bytes(png_bytes(), None))
            .await;
        assert!(matches!(
            result,
            Err(EncodingError::TooLarge { size: 16, limit: 8 })
        ));
    }

    #[tokio::test]
    async fn reads_images_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png_bytes()).unwrap();

        let encoded = ImageEncoder::default()
            .encode(RawImage::from_path(file.path()))
            .await
            .unwrap();
        assert_eq!(encoded.mime_type(), "image/png");
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageEncoder::default()
            .encode(RawImage::from_path(dir.path().join("gone.png")))
            .await;
        assert!(matches!(result, Err(EncodingError::Read { .. })));
    }
}
