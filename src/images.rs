//! Image references: extraction from markdown, location rules and path
//! rewriting for the generated pages.

use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;

lazy_static! {
    // Tolerates optional whitespace before ')' and an optional quoted title.
    static ref MD_IMG_RE: Regex =
        Regex::new(r#"!\[[^\]]*\]\(\s*([^)\s]+)\s*(?:"[^"]*"|'[^']*')?\s*\)"#).unwrap();
    static ref HTML_IMG_RE: Regex = Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).unwrap();
    static ref MD_IMG_REWRITE_RE: Regex = Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap();
    static ref HTML_IMG_REWRITE_RE: Regex =
        Regex::new(r#"(<img[^>]+src=["'])([^"']+)(["'])"#).unwrap();
}

/// Why a document fails the image location rules.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("no images found in markdown (must include at least one)")]
    NoImages,
    #[error("local image path not in required folder: '{path}' (expected prefix: '{expected}')")]
    OutsideRequiredFolder { path: String, expected: String },
    #[error("referenced local image does not exist on disk: '{path}'")]
    MissingOnDisk { path: String },
}

#[derive(Debug)]
pub struct ImageCheck {
    pub images: Vec<String>,
    pub required_folder: String,
    pub errors: Vec<ImageError>,
}

impl ImageCheck {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Extracts image references from markdown text, raw as written: markdown
/// `![alt](path "title")` images first, then HTML `<img src>` tags.
pub fn extract_image_paths(markdown: &str) -> Vec<String> {
    let md = MD_IMG_RE.captures_iter(markdown).map(|c| c[1].to_string());
    let html = HTML_IMG_RE.captures_iter(markdown).map(|c| c[1].to_string());
    md.chain(html).collect()
}

/// External references (URLs and data URIs) are exempt from location rules.
pub fn is_external(path: &str) -> bool {
    let p = path.trim().to_lowercase();
    p.contains("://") || p.starts_with("data:")
}

/// The folder all of a document's local images must live in, with a trailing
/// '/': a shared compact-date directory ('2025-11-06' -> `images/251106/`)
/// when the document carries the reserved publication date, a per-slug
/// figures directory otherwise.
pub fn required_folder(date: &str, slug: &str, shared_date: &str) -> String {
    if !shared_date.is_empty() && date.starts_with(shared_date) {
        let digits: String = shared_date.chars().filter(|c| c.is_ascii_digit()).collect();
        format!("images/{}/", digits.get(2..).unwrap_or(&digits))
    } else {
        format!("figures/{}/", slug)
    }
}

/// Rewrites relative image references so they resolve from the generated
/// articles directory: unanchored paths get `../<required folder>` prefixed,
/// paths under `images/` or `figures/` get `../`. External URLs, data URIs
/// and already-anchored paths are left untouched, which makes this safe to
/// apply repeatedly.
pub fn normalize_paths(markdown: &str, slug: &str, date: &str, shared_date: &str) -> String {
    let prefix = format!("../{}", required_folder(date, slug, shared_date));

    let rewritten = MD_IMG_REWRITE_RE.replace_all(markdown, |caps: &Captures| {
        match rewrite_src(caps[2].trim(), &prefix) {
            Some(new_src) => format!("![{}]({})", &caps[1], new_src),
            None => caps[0].to_string(),
        }
    });

    HTML_IMG_REWRITE_RE
        .replace_all(&rewritten, |caps: &Captures| {
            match rewrite_src(caps[2].trim(), &prefix) {
                Some(new_src) => format!("{}{}{}", &caps[1], new_src, &caps[3]),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn rewrite_src(src: &str, prefix: &str) -> Option<String> {
    if src.starts_with("http") || src.starts_with("//") || src.starts_with("data:") {
        return None;
    }
    if src.starts_with("../images/") || src.starts_with("../figures/") {
        return None;
    }
    if src.starts_with("images/") || src.starts_with("figures/") {
        return Some(format!("../{}", src));
    }
    Some(format!("{}{}", prefix, src))
}

/// Checks a document's image references against the location rules: at least
/// one image, every local reference under the required folder, every local
/// reference present on disk under `dir`. All violations are collected, not
/// just the first.
pub fn validate(dir: &Path, slug: &str, date: &str, shared_date: &str, markdown: &str) -> ImageCheck {
    let images = extract_image_paths(markdown);
    let required_folder = required_folder(date, slug, shared_date);
    let mut errors = Vec::new();

    if images.is_empty() {
        errors.push(ImageError::NoImages);
    }

    for raw in &images {
        if is_external(raw) {
            continue;
        }

        let normalized = normalize_local(raw);
        if !normalized.starts_with(&required_folder) {
            errors.push(ImageError::OutsideRequiredFolder {
                path: raw.clone(),
                expected: required_folder.clone(),
            });
            continue;
        }

        if !dir.join(&normalized).exists() {
            errors.push(ImageError::MissingOnDisk { path: raw.clone() });
        }
    }

    ImageCheck { images, required_folder, errors }
}

/// Strips leading './' noise and normalizes separators before prefix checks.
fn normalize_local(path: &str) -> String {
    path.trim().trim_start_matches(['.', '/']).replace('\\', "/")
}
