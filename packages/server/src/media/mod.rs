//! Recipe image storage.
//!
//! Images arrive as base64 data URIs, are decoded and validated, then stored
//! content-addressed so that identical uploads share one file.

mod error;
mod hash;
mod image;

pub mod filesystem;

use async_trait::async_trait;

pub use error::MediaError;
pub use hash::ContentHash;
pub use image::{DecodedImage, ImageFormat, ImageName, decode_data_uri};

/// Content-addressed image storage.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store a decoded image and return the name it is served under.
    async fn put(&self, image: &DecodedImage) -> Result<ImageName, MediaError>;

    /// Read back all bytes of a stored image.
    async fn get(&self, name: &ImageName) -> Result<Vec<u8>, MediaError>;

    /// Check whether an image exists.
    async fn exists(&self, name: &ImageName) -> Result<bool, MediaError>;
}
