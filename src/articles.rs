//! Representation of the markdown articles that make up the writing section.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::Config;
use crate::frontmatter::{self, FrontMatter, Mapping, Value};

/// Metadata recorded in the article index, one entry per published article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Source file name
    pub path: String,
    pub title: String,
    pub date: String,
    #[serde(rename = "type")]
    pub article_type: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Folder all of the article's local images must live in
    pub figures_path: String,
    /// Relative path of the generated HTML page, filled in by the build step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_path: Option<String>,
}

/// A source document: slug, parsed metadata and body text.
#[derive(Debug)]
pub struct Article {
    pub slug: String,
    pub file_name: String,
    pub meta: ArticleMeta,
    pub body: String,
}

#[derive(Debug, Default, Clone)]
pub struct ArticleMeta {
    pub title: String,
    pub description: String,
    pub date: String,
    pub article_type: String,
    pub tags: Vec<String>,
}

impl ArticleMeta {
    /// Applies the documented defaults: title falls back to the file stem,
    /// type to "Article", everything else to empty.
    pub fn from_mapping(mapping: &Mapping, slug: &str) -> ArticleMeta {
        ArticleMeta {
            title: text(mapping, "title").unwrap_or_else(|| slug.to_string()),
            description: text(mapping, "description").unwrap_or_default(),
            date: text(mapping, "date").map(|d| d.trim().to_string()).unwrap_or_default(),
            article_type: text(mapping, "type").unwrap_or_else(|| "Article".to_string()),
            tags: list(mapping, "tags"),
        }
    }
}

fn text(mapping: &Mapping, key: &str) -> Option<String> {
    mapping.get(key).and_then(Value::as_str).map(str::to_string)
}

fn list(mapping: &Mapping, key: &str) -> Vec<String> {
    match mapping.get(key) {
        Some(Value::List(items)) => items.clone(),
        Some(Value::Text(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Lists the markdown documents in `dir`, excluding the template and
/// READMEs, sorted by file name. A missing directory is simply empty.
pub fn list_documents(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }

    for entry in fs::read_dir(dir).with_context(|| format!("Cannot read directory {:?}", dir))? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "md") {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if stem == "template" || stem.starts_with("README") {
                continue;
            }
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// All document locations for a run: the `src/` subdirectory plus the
/// writing directory itself (legacy location).
pub fn discover(config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = list_documents(&config.src_dir())?;
    files.extend(list_documents(&config.writing_dir)?);
    Ok(files)
}

/// Reads and parses a document. `Ok(None)` means the document has no usable
/// frontmatter; this is reported and the document is skipped.
pub fn load(path: &Path) -> anyhow::Result<Option<Article>> {
    let raw = fs::read_to_string(path).with_context(|| format!("Cannot read {:?}", path))?;

    let slug = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid file name {:?}", path))?
        .to_string();
    let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or(&slug).to_string();

    let (front_matter, body) = frontmatter::extract(&raw);
    let mapping = match front_matter {
        FrontMatter::Parsed(mapping) => mapping,
        FrontMatter::Empty { warning } => {
            match warning {
                Some(warning) => eprintln!("  Unparseable frontmatter in {}: {}", file_name, warning),
                None => eprintln!("  No frontmatter found in {}", file_name),
            }
            return Ok(None);
        }
    };

    let meta = ArticleMeta::from_mapping(&mapping, &slug);
    Ok(Some(Article { slug, file_name, meta, body: body.to_string() }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frontmatter::Value;

    #[test]
    fn defaults_apply_to_absent_keys() {
        let mut mapping = Mapping::new();
        mapping.insert("date".to_string(), Value::Text("2025-01-01".to_string()));

        let meta = ArticleMeta::from_mapping(&mapping, "my-post");
        assert_eq!(meta.title, "my-post");
        assert_eq!(meta.article_type, "Article");
        assert_eq!(meta.date, "2025-01-01");
        assert!(meta.tags.is_empty());
        assert!(meta.description.is_empty());
    }

    #[test]
    fn a_scalar_tag_becomes_a_single_tag() {
        let mut mapping = Mapping::new();
        mapping.insert("tags".to_string(), Value::Text("rust".to_string()));

        let meta = ArticleMeta::from_mapping(&mapping, "post");
        assert_eq!(meta.tags, vec!["rust".to_string()]);
    }

    #[test]
    fn template_and_readme_files_are_not_documents() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.md", "template.md", "README.md", "notes.txt"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }

        let files = list_documents(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md"]);
    }

    #[test]
    fn loading_without_frontmatter_skips_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.md");
        std::fs::write(&path, "just text\n").unwrap();

        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn loading_parses_metadata_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.md");
        std::fs::write(&path, "---\ntitle: Hello\ndate: 2025-03-04\n---\nBody.\n").unwrap();

        let article = load(&path).unwrap().expect("article");
        assert_eq!(article.slug, "post");
        assert_eq!(article.meta.title, "Hello");
        assert_eq!(article.body, "Body.\n");
    }
}
