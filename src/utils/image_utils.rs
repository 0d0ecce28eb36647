use image::{GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized image format: {0}")]
    UnknownFormat(String),

    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image loading task failed: {0}")]
    Task(String),
}

/// Raw bytes of a local image, as picked by the user.
#[derive(Debug, Clone)]
pub struct LocalImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Re-encoded, size-bounded image ready to inline into a model request.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

const REMOTE_SCHEMES: [&str; 4] = ["http://", "https://", "gs://", "content://"];

/// True when `uri` points somewhere that cannot be opened as a local file.
pub fn is_remote_uri(uri: &str) -> bool {
    REMOTE_SCHEMES.iter().any(|scheme| uri.starts_with(scheme))
}

/// Reads an image file and checks that its bytes are a known image format.
pub fn read_image(path: &Path) -> Result<LocalImage, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let format = image::guess_format(&bytes)
        .map_err(|_| DecodeError::UnknownFormat(path.display().to_string()))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    Ok(LocalImage {
        file_name,
        mime_type: format.to_mime_type().to_string(),
        bytes,
    })
}

/// Decodes an image and scales it down so neither side exceeds `max_side`.
///
/// The result is always PNG encoded.
pub fn load_thumbnail(path: &Path, max_side: u32) -> Result<InlineImage, DecodeError> {
    let reader = image::ImageReader::open(path)
        .map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    if reader.format().is_none() {
        return Err(DecodeError::UnknownFormat(path.display().to_string()));
    }

    let mut decoded = reader.decode()?;
    let (width, height) = decoded.dimensions();
    if width > max_side || height > max_side {
        decoded = decoded.thumbnail(max_side, max_side);
    }

    let mut bytes = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

    Ok(InlineImage {
        mime_type: ImageFormat::Png.to_mime_type().to_string(),
        bytes,
    })
}

/// Runs [`load_thumbnail`] on the blocking pool.
pub async fn load_thumbnail_async(path: PathBuf, max_side: u32) -> Result<InlineImage, DecodeError> {
    tokio::task::spawn_blocking(move || load_thumbnail(&path, max_side))
        .await
        .map_err(|e| DecodeError::Task(e.to_string()))?
}

/// Runs [`read_image`] on the blocking pool.
pub async fn read_image_async(path: PathBuf) -> Result<LocalImage, DecodeError> {
    tokio::task::spawn_blocking(move || read_image(&path))
        .await
        .map_err(|e| DecodeError::Task(e.to_string()))?
}
