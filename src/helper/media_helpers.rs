use actix_multipart::Multipart;
use actix_web::web;
use futures_util::{Stream, StreamExt};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::AppError;

/// Upload form field carrying the image.
const FILE_FIELD: &str = "file";
/// Enough leading bytes to recognise every accepted format.
const SNIFF_LEN: usize = 12;

/// Maps an accepted image MIME type to the extension it is stored under.
/// Anything not listed here is refused.
fn image_extension(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Checks the file signature against the extension chosen from the declared type.
fn signature_matches(extension: &str, head: &[u8]) -> bool {
    match extension {
        "png" => head.starts_with(b"\x89PNG\r\n\x1a\n"),
        "jpg" => head.starts_with(&[0xFF, 0xD8, 0xFF]),
        "gif" => head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a"),
        "webp" => head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WEBP",
        _ => false,
    }
}

async fn remove_partial(path: PathBuf) {
    match web::block(move || fs::remove_file(path)).await {
        Ok(Err(e)) if e.kind() != io::ErrorKind::NotFound => {
            log::warn!("Could not remove partial upload: {}", e);
        }
        _ => {}
    }
}

/// Writes `chunks` to a new file at `final_path`, enforcing `max_bytes`.
/// Returns the byte count and the leading bytes used for signature checks.
async fn write_chunks<S, E>(
    mut chunks: S,
    final_path: PathBuf,
    max_bytes: u64,
) -> Result<(u64, Vec<u8>), AppError>
where
    S: Stream<Item = Result<web::Bytes, E>> + Unpin,
    E: fmt::Display,
{
    let mut file = web::block(move || fs::File::create(final_path)).await??;

    let mut written: u64 = 0;
    let mut head: Vec<u8> = Vec::with_capacity(SNIFF_LEN);
    while let Some(chunk) = chunks.next().await {
        let data = chunk.map_err(|e| AppError::Validation(format!("Malformed upload: {}", e)))?;
        written += data.len() as u64;
        if written > max_bytes {
            return Err(AppError::Validation(format!(
                "File is too large. Maximum size is {}MB.",
                max_bytes / (1024 * 1024)
            )));
        }
        if head.len() < SNIFF_LEN {
            let take = (SNIFF_LEN - head.len()).min(data.len());
            head.extend_from_slice(&data[..take]);
        }
        file = web::block(move || file.write_all(&data).map(|_| file)).await??;
    }
    Ok((written, head))
}

/// Stores one upload at `final_path`. Any failure removes whatever was written.
async fn store_upload<S, E>(
    chunks: S,
    final_path: PathBuf,
    extension: &str,
    max_bytes: u64,
) -> Result<u64, AppError>
where
    S: Stream<Item = Result<web::Bytes, E>> + Unpin,
    E: fmt::Display,
{
    let (written, head) = match write_chunks(chunks, final_path.clone(), max_bytes).await {
        Ok(result) => result,
        Err(e) => {
            remove_partial(final_path).await;
            return Err(e);
        }
    };
    if !signature_matches(extension, &head) {
        remove_partial(final_path).await;
        return Err(AppError::Validation(format!("File content is not a valid {} image.", extension)));
    }
    Ok(written)
}

/// Public URL for a stored file, relative to the `/media` mount.
fn public_path(relative: &Path) -> String {
    format!("/media/{}", relative.to_string_lossy().replace('\\', "/"))
}

/// Streams the `file` field of an upload form to
/// `<media_path>/posts/<xx>/<yy>/<uuid>.<ext>` and returns its public path.
pub async fn save_post_image(
    media_path: &str,
    max_bytes: u64,
    mut payload: Multipart,
) -> Result<String, AppError> {
    let file_id = Uuid::new_v4().to_string();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::Validation(format!("Malformed upload: {}", e)))?;
        if field.content_disposition().get_name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .ok_or_else(|| AppError::Validation("Upload is missing a Content-Type.".to_string()))?;
        let extension = image_extension(&content_type).ok_or_else(|| {
            AppError::Validation(format!(
                "Unsupported file type '{}'. Upload a PNG, JPEG, GIF or WebP image.",
                content_type
            ))
        })?;

        let relative_dir = PathBuf::from("posts").join(&file_id[0..2]).join(&file_id[2..4]);
        let relative_file = relative_dir.join(format!("{}.{}", file_id, extension));
        let dir = PathBuf::from(media_path).join(&relative_dir);
        let final_path = PathBuf::from(media_path).join(&relative_file);

        web::block(move || fs::create_dir_all(dir)).await??;
        let written = store_upload(&mut field, final_path.clone(), extension, max_bytes).await?;

        log::info!("Stored post image {} ({} bytes).", final_path.display(), written);
        return Ok(public_path(&relative_file));
    }

    Err(AppError::Validation("No file was uploaded.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_images_are_accepted() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("application/pdf"), None);
        assert_eq!(image_extension("image/svg+xml"), None);
    }

    #[test]
    fn signatures_must_match_declared_type() {
        assert!(signature_matches("png", b"\x89PNG\r\n\x1a\n\0\0\0\r"));
        assert!(signature_matches("gif", b"GIF89a......"));
        assert!(signature_matches("webp", b"RIFF\0\0\0\0WEBPVP8 "));
        assert!(!signature_matches("png", b"<svg onload=alert(1)>"));
        assert!(!signature_matches("jpg", b""));
    }

    fn chunks(
        parts: Vec<Result<&'static [u8], &'static str>>,
    ) -> impl Stream<Item = Result<web::Bytes, String>> + Unpin {
        futures_util::stream::iter(
            parts.into_iter().map(|part| part.map(web::Bytes::from_static).map_err(str::to_string)),
        )
    }

    const PNG_HEAD: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\r";

    #[actix_web::test]
    async fn stores_every_chunk_of_a_valid_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");

        let written = store_upload(chunks(vec![Ok(PNG_HEAD), Ok(&b"IHDR"[..])]), path.clone(), "png", 1024)
            .await
            .unwrap();
        assert_eq!(written, 16);
        assert_eq!(fs::read(&path).unwrap().len(), 16);
    }

    #[actix_web::test]
    async fn failed_uploads_leave_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cases: Vec<(&str, Vec<Result<&'static [u8], &'static str>>, u64)> = vec![
            ("reset.png", vec![Ok(PNG_HEAD), Err("connection reset")], 1024),
            ("oversized.png", vec![Ok(PNG_HEAD), Ok(PNG_HEAD)], 20),
            ("disguised.png", vec![Ok(&b"<svg onload=alert(1)>"[..])], 1024),
        ];
        for (name, parts, max_bytes) in cases {
            let path = dir.path().join(name);
            let result = store_upload(chunks(parts), path.clone(), "png", max_bytes).await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{}", name);
            assert!(!path.exists(), "{} was left on disk", name);
        }

        // File system failures take the same cleanup path.
        let unwritable = dir.path().join("missing-dir").join("file.png");
        let result = store_upload(chunks(vec![Ok(PNG_HEAD)]), unwritable.clone(), "png", 1024).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(!unwritable.exists());

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn public_paths_use_forward_slashes() {
        let relative = PathBuf::from("posts").join("ab").join("cd").join("abcd.png");
        assert_eq!(public_path(&relative), "/media/posts/ab/cd/abcd.png");
    }
}
