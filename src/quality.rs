use std::sync::LazyLock;

use regex::Regex;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

// Ordered; the first matching rule names the quality.
static QUALITY_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\b(2160p|4k|uhd)\b", "4K"),
        (r"(?i)\b1080p?\b", "1080p"),
        (r"(?i)\b720p?\b", "720p"),
        (r"(?i)\b(480p|576p|sd)\b", "480p"),
        (r"(?i)\b(hdcam|cam|camrip|telesync|ts)\b", "CAM"),
        (r"(?i)\b(screener|scr|dvdscr)\b", "SCREENER"),
        (r"(?i)\b(bdrip|brrip|bluray|blu-ray)\b", "BDRip"),
        (r"(?i)\bdvdrip\b", "DVDRip"),
        (r"(?i)\b(hdrip|webrip|web-dl|webdl)\b", "HDRip"),
    ]
    .into_iter()
    .filter_map(|(pattern, label)| Regex::new(pattern).ok().map(|re| (re, label)))
    .collect()
});

/// Derive a quality label from a file name. Returns an empty string when no
/// rule matches.
pub fn detect_quality(file_name: &str) -> &'static str {
    // `\b` treats '_' as a word character, so normalise it like '.' separators
    let normalized = file_name.replace('_', ".");

    QUALITY_RULES
        .iter()
        .find(|(re, _)| re.is_match(&normalized))
        .map(|(_, label)| *label)
        .unwrap_or("")
}

/// Size in GiB, unrounded, for comparison with a configured ceiling.
pub fn size_gb(size_bytes: u64) -> f64 {
    size_bytes as f64 / GIB
}

pub fn size_human(size_bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    if size_bytes as f64 >= GIB {
        format!("{:.2} GB", size_gb(size_bytes))
    } else {
        format!("{:.1} MB", size_bytes as f64 / MB)
    }
}
