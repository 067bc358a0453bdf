use std::{fs, path::Path};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use color_eyre::{Result, eyre::WrapErr as _};

pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// MIME type by (lowercased) file extension. Unknown extensions are treated as PNG.
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// Reads the whole file and embeds it as `data:<mime>;base64,<payload>`.
pub fn encode(path: &Path) -> Result<String> {
    let bytes = fs::read(path).wrap_err_with(|| format!("failed reading {}", path.display()))?;
    Ok(format!("data:{};base64,{}", mime_type(path), BASE64.encode(bytes)))
}
