use std::path::Path;

use realtyfeed_transfer::LocalFile;

/// MIME type guessed from the file extension. Unknown extensions map to
/// `application/octet-stream`, which the validator rejects.
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

pub fn read_all(paths: &[impl AsRef<Path>]) -> anyhow::Result<Vec<LocalFile>> {
    paths
        .iter()
        .map(|p| {
            let p = p.as_ref();
            LocalFile::read(p, mime_for(p))
                .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", p.display()))
        })
        .collect()
}
