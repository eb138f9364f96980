//! Article index maintenance: scan, validate and persist.

use std::fs;
use std::path::Path;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::articles::{self, ArticleMeta, IndexEntry};
use crate::config::Config;
use crate::images;

lazy_static! {
    /// Patterns locating the inline data block in the listing page, tried in
    /// order of specificity.
    static ref INLINE_DATA_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?s)(// Inline data for instant loading\s+function getInlineArticlesData\(\) \{\s+return\s+)(\[.*?\])(;\s+\})").unwrap(),
        Regex::new(r"(?s)(function getInlineArticlesData\(\) \{\s+return\s+)(\[.*?\])(;\s+\})").unwrap(),
        Regex::new(r"(?sm)(return\s+)(\[.*?\])(;\s+\}\s*$)").unwrap(),
    ];
}

/// Outcome of patching the listing page's inline data block.
#[derive(Debug, PartialEq, Eq)]
pub enum InlineData {
    Updated,
    UpToDate,
    PatternNotFound,
    PageNotFound,
}

/// Rebuilds the article index from the documents on disk, then refreshes the
/// inline copy embedded in the listing page.
pub fn update_index(config: &Config) -> anyhow::Result<()> {
    let entries = scan_articles(config)?;

    if entries.is_empty() {
        println!("No articles passed validation (or no valid frontmatter)");
        return Ok(());
    }

    let index_path = config.index_path();
    println!("Writing {} article(s) to {:?}", entries.len(), index_path);
    write_index(&entries, &index_path)?;

    match update_inline_data(&entries, &config.listing_page_path())? {
        InlineData::Updated => println!("Inline listing data updated"),
        InlineData::UpToDate => println!("Inline listing data is already up to date"),
        InlineData::PatternNotFound => {
            eprintln!("Could not find an inline data block in the listing page, leaving it untouched")
        }
        InlineData::PageNotFound => println!("No listing page found, skipping inline data update"),
    }

    Ok(())
}

/// Discovers and validates every document, returning the index entries of the
/// documents that passed, newest first. A failing document is reported and
/// excluded, never fatal to the batch.
fn scan_articles(config: &Config) -> anyhow::Result<Vec<IndexEntry>> {
    let files = articles::discover(config)?;
    println!("Found {} markdown file(s) to process", files.len());

    let mut entries = Vec::new();

    for path in &files {
        println!("Processing '{}'", path.display());

        let article = match articles::load(path) {
            Ok(Some(article)) => article,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("  Error processing {:?}: {:#}", path, e);
                continue;
            }
        };

        // The required folder must exist before anyone drops images in it.
        let required_folder =
            images::required_folder(&article.meta.date, &article.slug, &config.shared_images_date);
        fs::create_dir_all(config.writing_dir.join(&required_folder))
            .with_context(|| format!("Cannot create image folder {}", required_folder))?;

        let check = images::validate(
            &config.writing_dir,
            &article.slug,
            &article.meta.date,
            &config.shared_images_date,
            &article.body,
        );
        if !check.ok() {
            eprintln!("  Image validation failed for '{}':", article.slug);
            for error in &check.errors {
                eprintln!("    - {}", error);
            }
            eprintln!("  Skipping this article");
            continue;
        }

        println!(
            "  Added '{}' ({} image(s), folder {})",
            article.meta.title,
            check.images.len(),
            check.required_folder
        );

        let ArticleMeta { title, description, date, article_type, tags } = article.meta;
        entries.push(IndexEntry {
            path: article.file_name,
            title,
            date,
            article_type,
            description,
            tags,
            figures_path: check.required_folder,
            html_path: None,
        });
    }

    sort_by_date(&mut entries);
    Ok(entries)
}

/// Newest first; articles without a date sort last.
pub fn sort_by_date(entries: &mut [IndexEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
}

fn write_index(entries: &[IndexEntry], path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(path, json).with_context(|| format!("Cannot write index {:?}", path))?;
    Ok(())
}

/// Replaces the inline article data embedded in the listing page so it can
/// render without fetching the index file.
pub fn update_inline_data(entries: &[IndexEntry], page_path: &Path) -> anyhow::Result<InlineData> {
    if !page_path.exists() {
        return Ok(InlineData::PageNotFound);
    }

    let html = fs::read_to_string(page_path).with_context(|| format!("Cannot read {:?}", page_path))?;
    let json = serde_json::to_string_pretty(entries)?;

    for pattern in INLINE_DATA_PATTERNS.iter() {
        if !pattern.is_match(&html) {
            continue;
        }

        let new_html = pattern.replace(&html, |caps: &Captures| {
            format!("{}{}{}", &caps[1], json, &caps[3])
        });
        return if new_html == html {
            Ok(InlineData::UpToDate)
        } else {
            fs::write(page_path, new_html.as_ref())
                .with_context(|| format!("Cannot write {:?}", page_path))?;
            Ok(InlineData::Updated)
        };
    }

    Ok(InlineData::PatternNotFound)
}
