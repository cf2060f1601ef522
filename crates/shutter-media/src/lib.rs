//! On-disk storage for uploaded photos.
//!
//! Every photo is kept twice under the media root: the uploaded bytes in
//! `raw/` and a JPEG copy bounded to [`MAX_COMPRESSED_SIZE`] pixels in
//! `compressed/`. Decoding and encoding run on the blocking pool.

pub mod error;

use std::{
  fs::File,
  io::{Cursor, Write as _},
  path::{Path, PathBuf},
};

use image::{DynamicImage, ImageFormat, codecs::jpeg::JpegEncoder};
use sha2::{Digest as _, Sha256};
use shutter_core::event::Transform;
use uuid::Uuid;

pub use self::error::{Error, Result};

/// Longest side of the compressed copy, in pixels.
pub const MAX_COMPRESSED_SIZE: u32 = 1280;

const JPEG_QUALITY: u8 = 85;

/// What an upload turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
  /// SHA-256 of the bytes, lowercase hex.
  pub hash:         String,
  pub content_type: &'static str,
}

/// Identify an upload from its magic bytes. Only JPEG and PNG are accepted.
pub fn probe(bytes: &[u8]) -> Result<Probe> {
  let format = image::guess_format(bytes)
    .map_err(|_| Error::UnsupportedMediaType("unrecognized".into()))?;
  let content_type = match format {
    ImageFormat::Jpeg | ImageFormat::Png => format.to_mime_type(),
    other => {
      return Err(Error::UnsupportedMediaType(other.to_mime_type().to_owned()));
    }
  };
  Ok(Probe { hash: hex::encode(Sha256::digest(bytes)), content_type })
}

/// The raw and compressed files of every photo, under one root directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
  root: PathBuf,
}

impl MediaStore {
  /// Use `root` as the media directory, creating its layout if needed.
  pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
    let store = Self { root: root.into() };
    tokio::fs::create_dir_all(store.root.join("raw")).await?;
    tokio::fs::create_dir_all(store.root.join("compressed")).await?;
    Ok(store)
  }

  fn raw_path(&self, id: Uuid) -> PathBuf {
    self.root.join("raw").join(id.simple().to_string())
  }

  fn compressed_path(&self, id: Uuid) -> PathBuf {
    self.root.join("compressed").join(format!("{}.jpg", id.simple()))
  }

  /// Store a new upload and its compressed copy.
  ///
  /// The bytes must decode as an image; nothing is written otherwise.
  pub async fn save(&self, id: Uuid, bytes: Vec<u8>) -> Result<()> {
    let (raw, compressed) = (self.raw_path(id), self.compressed_path(id));

    tokio::task::spawn_blocking(move || -> Result<()> {
      let img = image::load_from_memory(&bytes)?;
      atomic_write(&raw, &bytes)?;
      write_compressed(&compressed, &img)
    })
    .await??;

    tracing::debug!(%id, "stored photo files");
    Ok(())
  }

  /// Apply `transform` to both stored copies.
  pub async fn transform(&self, id: Uuid, transform: Transform) -> Result<()> {
    let (raw, compressed) = (self.raw_path(id), self.compressed_path(id));
    let bytes = read_or_not_found(id, &raw).await?;

    tokio::task::spawn_blocking(move || -> Result<()> {
      let format = image::guess_format(&bytes)?;
      let img = apply(image::load_from_memory_with_format(&bytes, format)?, transform);

      let mut encoded = Vec::new();
      img.write_to(&mut Cursor::new(&mut encoded), format)?;
      atomic_write(&raw, &encoded)?;
      write_compressed(&compressed, &img)
    })
    .await??;

    tracing::debug!(%id, ?transform, "transformed photo files");
    Ok(())
  }

  pub async fn read_raw(&self, id: Uuid) -> Result<Vec<u8>> {
    read_or_not_found(id, &self.raw_path(id)).await
  }

  pub async fn read_compressed(&self, id: Uuid) -> Result<Vec<u8>> {
    read_or_not_found(id, &self.compressed_path(id)).await
  }

  /// Remove both files. Missing files are not an error.
  pub async fn delete(&self, id: Uuid) -> Result<()> {
    for path in [self.raw_path(id), self.compressed_path(id)] {
      match tokio::fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
          tracing::warn!(%id, path = %path.display(), "photo file already gone");
        }
        Err(e) => return Err(e.into()),
      }
    }
    Ok(())
  }
}

fn apply(img: DynamicImage, transform: Transform) -> DynamicImage {
  match transform {
    Transform::Rotation { degrees: 90 } => img.rotate90(),
    Transform::Rotation { degrees: 180 } => img.rotate180(),
    Transform::Rotation { degrees: 270 } => img.rotate270(),
    Transform::Rotation { .. } => img,
  }
}

async fn read_or_not_found(id: Uuid, path: &Path) -> Result<Vec<u8>> {
  match tokio::fs::read(path).await {
    Ok(bytes) => Ok(bytes),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(id)),
    Err(e) => Err(e.into()),
  }
}

fn write_compressed(path: &Path, img: &DynamicImage) -> Result<()> {
  let bounded = if img.width() > MAX_COMPRESSED_SIZE
    || img.height() > MAX_COMPRESSED_SIZE
  {
    img.thumbnail(MAX_COMPRESSED_SIZE, MAX_COMPRESSED_SIZE)
  } else {
    img.clone()
  };

  let mut encoded = Vec::new();
  JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY)
    .encode_image(&bounded.to_rgb8())?;
  atomic_write(path, &encoded)?;
  Ok(())
}

/// Write to a sibling temp file, then rename it over `path`.
fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
  let tmp = path.with_extension(format!("tmp.{}", Uuid::new_v4().simple()));
  {
    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
  }
  if let Err(e) = std::fs::rename(&tmp, path) {
    let _ = std::fs::remove_file(&tmp);
    return Err(e);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use image::{GenericImageView as _, RgbImage};

  use super::*;

  fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
      image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
      .write_to(&mut Cursor::new(&mut bytes), format)
      .unwrap();
    bytes
  }

  async fn media() -> (tempfile::TempDir, MediaStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = MediaStore::open(dir.path()).await.unwrap();
    (dir, store)
  }

  #[test]
  fn probe_accepts_png_and_jpeg() {
    let png = probe(&encoded(4, 2, ImageFormat::Png)).unwrap();
    assert_eq!(png.content_type, "image/png");
    assert_eq!(png.hash.len(), 64);

    let jpeg = probe(&encoded(4, 2, ImageFormat::Jpeg)).unwrap();
    assert_eq!(jpeg.content_type, "image/jpeg");
  }

  #[test]
  fn probe_rejects_other_formats() {
    assert!(matches!(
      probe(b"plain text, not an image"),
      Err(Error::UnsupportedMediaType(_))
    ));
    assert!(matches!(
      probe(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;"),
      Err(Error::UnsupportedMediaType(t)) if t == "image/gif"
    ));
  }

  #[test]
  fn hash_depends_only_on_content() {
    let bytes = encoded(3, 3, ImageFormat::Png);
    assert_eq!(probe(&bytes).unwrap().hash, probe(&bytes.clone()).unwrap().hash);
    assert_ne!(
      probe(&bytes).unwrap().hash,
      probe(&encoded(3, 4, ImageFormat::Png)).unwrap().hash
    );
  }

  #[tokio::test]
  async fn save_keeps_raw_bytes_and_writes_jpeg_copy() {
    let (_dir, media) = media().await;
    let id = Uuid::new_v4();
    let bytes = encoded(8, 4, ImageFormat::Png);

    media.save(id, bytes.clone()).await.unwrap();

    assert_eq!(media.read_raw(id).await.unwrap(), bytes);
    let compressed = media.read_compressed(id).await.unwrap();
    assert_eq!(image::guess_format(&compressed).unwrap(), ImageFormat::Jpeg);
    assert_eq!(image::load_from_memory(&compressed).unwrap().dimensions(), (8, 4));
  }

  #[tokio::test]
  async fn compressed_copy_is_bounded() {
    let (_dir, media) = media().await;
    let id = Uuid::new_v4();
    media.save(id, encoded(2560, 1280, ImageFormat::Png)).await.unwrap();

    let compressed = media.read_compressed(id).await.unwrap();
    let (w, h) = image::load_from_memory(&compressed).unwrap().dimensions();
    assert_eq!(w, MAX_COMPRESSED_SIZE);
    assert_eq!(h, MAX_COMPRESSED_SIZE / 2);
  }

  #[tokio::test]
  async fn undecodable_upload_writes_nothing() {
    let (_dir, media) = media().await;
    let id = Uuid::new_v4();
    let mut bytes = encoded(4, 4, ImageFormat::Png);
    bytes.truncate(20);

    assert!(media.save(id, bytes).await.is_err());
    assert!(matches!(media.read_raw(id).await, Err(Error::NotFound(_))));
  }

  #[tokio::test]
  async fn rotation_turns_both_copies() {
    let (_dir, media) = media().await;
    let id = Uuid::new_v4();
    media.save(id, encoded(6, 2, ImageFormat::Png)).await.unwrap();

    media
      .transform(id, Transform::Rotation { degrees: 90 })
      .await
      .unwrap();

    let raw = media.read_raw(id).await.unwrap();
    assert_eq!(image::guess_format(&raw).unwrap(), ImageFormat::Png);
    assert_eq!(image::load_from_memory(&raw).unwrap().dimensions(), (2, 6));
    let compressed = media.read_compressed(id).await.unwrap();
    assert_eq!(image::load_from_memory(&compressed).unwrap().dimensions(), (2, 6));
  }

  #[tokio::test]
  async fn half_turn_keeps_dimensions() {
    let (_dir, media) = media().await;
    let id = Uuid::new_v4();
    media.save(id, encoded(6, 2, ImageFormat::Jpeg)).await.unwrap();

    media
      .transform(id, Transform::Rotation { degrees: 180 })
      .await
      .unwrap();

    let raw = media.read_raw(id).await.unwrap();
    assert_eq!(image::load_from_memory(&raw).unwrap().dimensions(), (6, 2));
  }

  #[tokio::test]
  async fn transforming_missing_photo_is_not_found() {
    let (_dir, media) = media().await;
    let id = Uuid::new_v4();
    assert!(matches!(
      media.transform(id, Transform::Rotation { degrees: 90 }).await,
      Err(Error::NotFound(missing)) if missing == id
    ));
  }

  #[tokio::test]
  async fn delete_removes_files_and_tolerates_missing_ones() {
    let (_dir, media) = media().await;
    let id = Uuid::new_v4();
    media.save(id, encoded(2, 2, ImageFormat::Png)).await.unwrap();

    media.delete(id).await.unwrap();
    assert!(matches!(media.read_raw(id).await, Err(Error::NotFound(_))));
    assert!(matches!(media.read_compressed(id).await, Err(Error::NotFound(_))));
    media.delete(id).await.unwrap();
  }
}
