use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::error::MediaError;
use super::hash::ContentHash;

/// Image types accepted for recipe pictures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// Raw image bytes together with their declared format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Decode a `data:image/<type>;base64,<payload>` URI.
pub fn decode_data_uri(input: &str, max_bytes: u64) -> Result<DecodedImage, MediaError> {
    let rest = input
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| MediaError::InvalidDataUri("expected a data: URI".into()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| MediaError::InvalidDataUri("missing ',' separator".into()))?;

    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| MediaError::InvalidDataUri("only base64 encoding is supported".into()))?;

    let format =
        ImageFormat::from_mime(mime).ok_or_else(|| MediaError::UnsupportedFormat(mime.into()))?;

    // Reject before decoding; 4 base64 chars carry 3 bytes.
    let estimated = (payload.len() as u64 / 4) * 3;
    if estimated > max_bytes + 3 {
        return Err(MediaError::SizeLimitExceeded {
            actual: estimated,
            limit: max_bytes,
        });
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| MediaError::InvalidDataUri(format!("bad base64 payload: {e}")))?;

    if bytes.is_empty() {
        return Err(MediaError::InvalidDataUri("image is empty".into()));
    }
    if bytes.len() as u64 > max_bytes {
        return Err(MediaError::SizeLimitExceeded {
            actual: bytes.len() as u64,
            limit: max_bytes,
        });
    }

    Ok(DecodedImage { format, bytes })
}

/// Public name of a stored image: `{sha256 hex}.{ext}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageName {
    pub hash: ContentHash,
    pub format: ImageFormat,
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.hash, self.format.extension())
    }
}

impl FromStr for ImageName {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stem, ext) = s
            .rsplit_once('.')
            .ok_or_else(|| MediaError::InvalidName(s.to_string()))?;
        let format =
            ImageFormat::from_extension(ext).ok_or_else(|| MediaError::InvalidName(s.to_string()))?;
        let hash = ContentHash::from_hex(stem)?;
        Ok(Self { hash, format })
    }
}
