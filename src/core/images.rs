use crate::domain::model::ImageAttachment;
use crate::utils::error::{BotError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const RECENT_IMAGE_LIMIT: usize = 10;

/// Strip whitespace and the quotes a drag-and-drop into a terminal leaves behind.
pub fn clean_path(raw: &str) -> String {
    raw.trim().trim_matches('"').trim_matches('\'').to_string()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn media_type(path: &Path) -> &'static str {
    match extension_of(path).as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    }
}

/// 檢查檔案存在、大小與格式
pub fn validate_image(raw_path: &str) -> Result<PathBuf> {
    let cleaned = clean_path(raw_path);
    if cleaned.is_empty() {
        return Err(BotError::ImageError {
            path: raw_path.to_string(),
            reason: "No image path provided".to_string(),
        });
    }

    let path = PathBuf::from(&cleaned);
    let metadata = std::fs::metadata(&path).map_err(|_| BotError::ImageError {
        path: cleaned.clone(),
        reason: "Image file not found".to_string(),
    })?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(BotError::ImageError {
            path: cleaned,
            reason: format!(
                "Image file too large: {:.1}MB (max {}MB)",
                metadata.len() as f64 / (1024.0 * 1024.0),
                MAX_FILE_SIZE / (1024 * 1024)
            ),
        });
    }

    match extension_of(&path) {
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(path),
        other => Err(BotError::ImageError {
            path: cleaned,
            reason: format!(
                "Unsupported format: {}. Supported: {}",
                other.unwrap_or_else(|| "none".to_string()),
                SUPPORTED_EXTENSIONS.join(", ")
            ),
        }),
    }
}

pub fn load_image(raw_path: &str) -> Result<ImageAttachment> {
    let path = validate_image(raw_path)?;
    let bytes = std::fs::read(&path)?;

    Ok(ImageAttachment {
        media_type: media_type(&path).to_string(),
        size_bytes: bytes.len() as u64,
        data: STANDARD.encode(&bytes),
        path,
    })
}

/// Invalid images are skipped with a warning; having none left is an error.
pub fn load_images(raw_paths: &[String]) -> Result<Vec<ImageAttachment>> {
    let mut images = Vec::new();

    for (i, raw) in raw_paths.iter().enumerate() {
        tracing::info!("Processing image {}/{}: {}", i + 1, raw_paths.len(), clean_path(raw));
        match load_image(raw) {
            Ok(image) => images.push(image),
            Err(e) => tracing::warn!("Skipping invalid image: {}", e),
        }
    }

    if images.is_empty() {
        return Err(BotError::ImageError {
            path: raw_paths.join(", "),
            reason: "No valid images to process".to_string(),
        });
    }

    tracing::info!("✅ Prepared {} image(s) for analysis", images.len());
    Ok(images)
}

/// Newest images across `dirs`, deduplicated by file name.
pub fn find_recent_images(dirs: &[PathBuf], limit: usize) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut found: Vec<(PathBuf, SystemTime)> = Vec::new();

    for dir in dirs {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let supported = extension_of(&path)
                .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false);
            if !supported || !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !seen.insert(name) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((path, modified));
        }
    }

    found.sort_by(|a, b| b.1.cmp(&a.1));
    found.into_iter().take(limit).map(|(p, _)| p).collect()
}

/// Desktop, Downloads, Pictures and ~/dashboard-images.
pub fn default_image_dirs() -> Vec<PathBuf> {
    let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) else {
        return Vec::new();
    };
    let home = PathBuf::from(home);
    ["Desktop", "Downloads", "Pictures", "dashboard-images"]
        .iter()
        .map(|d| home.join(d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_clean_path_strips_quotes() {
        assert_eq!(clean_path("  \"/tmp/a b.png\" "), "/tmp/a b.png");
        assert_eq!(clean_path("'/tmp/c.jpg'"), "/tmp/c.jpg");
    }

    #[test]
    fn test_media_type_is_case_insensitive() {
        assert_eq!(media_type(Path::new("a.PNG")), "image/png");
        assert_eq!(media_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(media_type(Path::new("a.webp")), "image/webp");
    }

    #[test]
    fn test_validate_image() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("dash.png");
        fs::write(&png, [0x89, b'P', b'N', b'G']).unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, "hello").unwrap();

        assert!(validate_image(png.to_str().unwrap()).is_ok());
        assert!(validate_image(txt.to_str().unwrap()).is_err());
        assert!(validate_image(dir.path().join("missing.png").to_str().unwrap()).is_err());
        assert!(validate_image("   ").is_err());
    }

    #[test]
    fn test_load_images_skips_invalid() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("dash.png");
        fs::write(&png, b"abc").unwrap();

        let images = load_images(&[
            png.to_str().unwrap().to_string(),
            dir.path().join("gone.jpg").to_str().unwrap().to_string(),
        ])
        .unwrap();

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].data, "YWJj");
        assert_eq!(images[0].media_type, "image/png");
        assert_eq!(images[0].size_bytes, 3);
    }

    #[test]
    fn test_load_images_requires_one_valid() {
        assert!(matches!(
            load_images(&["/definitely/not/here.png".to_string()]),
            Err(BotError::ImageError { .. })
        ));
    }

    #[test]
    fn test_find_recent_images_dedupes_by_name() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("view.png"), b"1").unwrap();
        fs::write(second.path().join("view.png"), b"2").unwrap();
        fs::write(second.path().join("other.jpg"), b"3").unwrap();
        fs::write(second.path().join("readme.md"), b"4").unwrap();

        let found = find_recent_images(
            &[first.path().to_path_buf(), second.path().to_path_buf()],
            RECENT_IMAGE_LIMIT,
        );

        assert_eq!(found.len(), 2);
        let names: HashSet<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains("view.png"));
        assert!(names.contains("other.jpg"));
    }
}
