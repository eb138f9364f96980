//! Sitemap maintenance: append missing article URLs to an existing
//! sitemap.xml, never touching what is already there.

use std::collections::HashSet;
use std::fs;

use anyhow::{bail, Context};
use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::articles::IndexEntry;
use crate::config::Config;

/// Adds a `<url>` entry for every indexed article whose URL is not already
/// present. Returns the number of entries added; zero additions leave the
/// file untouched. Fails when the index or the sitemap is missing.
pub fn update_sitemap(config: &Config) -> anyhow::Result<usize> {
    let index_path = config.index_path();
    let json = fs::read_to_string(&index_path)
        .with_context(|| format!("Cannot read index {:?}", &index_path))?;
    let entries: Vec<IndexEntry> =
        serde_json::from_str(&json).with_context(|| format!("Malformed index {:?}", &index_path))?;

    let sitemap_path = config.sitemap_path();
    let sitemap = fs::read_to_string(&sitemap_path)
        .with_context(|| format!("Cannot read sitemap {:?}", &sitemap_path))?;

    let article_prefix = format!("{}articles/", config.article_url_path);
    let existing = existing_urls(&sitemap, &article_prefix)?;

    let mut additions = String::new();
    let mut added = 0;

    for entry in &entries {
        let html_path = match entry.html_path.as_deref() {
            Some(html_path) => html_path,
            None => continue,
        };

        let url = config.article_url(html_path);
        if existing.contains(&url) {
            continue;
        }

        let lastmod = if entry.date.is_empty() {
            Utc::now().format("%Y-%m-%d").to_string()
        } else {
            entry.date.clone()
        };

        additions.push_str("  <url>\n");
        additions.push_str(&format!("    <loc>{}</loc>\n", quick_xml::escape::escape(&url)));
        additions.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod));
        additions.push_str("    <changefreq>monthly</changefreq>\n");
        additions.push_str("    <priority>0.70</priority>\n");
        additions.push_str("  </url>\n");

        println!("  Added {}", url);
        added += 1;
    }

    if added == 0 {
        println!("No new articles to add to the sitemap");
        return Ok(0);
    }

    let close_pos = match sitemap.rfind("</urlset>") {
        Some(pos) => pos,
        None => bail!("No closing </urlset> tag in {:?}", sitemap_path),
    };

    let mut updated = String::with_capacity(sitemap.len() + additions.len());
    updated.push_str(&sitemap[..close_pos]);
    updated.push_str(&additions);
    updated.push_str(&sitemap[close_pos..]);

    fs::write(&sitemap_path, updated)
        .with_context(|| format!("Cannot write sitemap {:?}", &sitemap_path))?;
    println!("Added {} article URL(s) to {:?}", added, sitemap_path);

    Ok(added)
}

/// Every `<loc>` URL already present under the article path prefix.
fn existing_urls(sitemap: &str, article_prefix: &str) -> anyhow::Result<HashSet<String>> {
    let mut reader = Reader::from_str(sitemap);
    let mut urls = HashSet::new();
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event().context("Malformed sitemap XML")? {
            Event::Start(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = true;
                current.clear();
            }
            Event::End(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                if current.contains(article_prefix) {
                    urls.insert(current.clone());
                }
            }
            Event::Text(e) if in_loc => {
                current.push_str(&reader.decoder().decode(&e)?);
            }
            Event::GeneralRef(e) if in_loc => {
                let name = reader.decoder().decode(&e)?.into_owned();
                current.push_str(&decode_entity(&name));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(urls)
}

/// Minimal entity decoding for URL text.
fn decode_entity(name: &str) -> String {
    match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        other => format!("&{};", other),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    const SITEMAP: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url>
            <loc>https://example.com/</loc>
            <lastmod>2024-01-01</lastmod>
          </url>
          <url>
            <loc>https://example.com/writing/articles/older.html</loc>
            <lastmod>2024-06-01</lastmod>
          </url>
        </urlset>
    "#};

    #[test]
    fn collects_only_article_urls() {
        let urls = existing_urls(SITEMAP, "/writing/articles/").unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls.contains("https://example.com/writing/articles/older.html"));
    }

    #[test]
    fn decodes_escaped_locs() {
        let sitemap = indoc! {r#"
            <urlset>
              <url><loc>https://example.com/writing/articles/a.html?x=1&amp;y=2</loc></url>
            </urlset>
        "#};
        let urls = existing_urls(sitemap, "/writing/articles/").unwrap();
        assert!(urls.contains("https://example.com/writing/articles/a.html?x=1&y=2"));
    }
}
