//! Rendering articles to standalone HTML pages.

use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use maplit::hashmap;
use regex::Regex;

use crate::articles::{self, Article, ArticleMeta, IndexEntry};
use crate::config::Config;
use crate::images;
use crate::render;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\w+").unwrap();
}

struct BuiltPage {
    title: String,
    html_path: String,
}

/// Renders every document to a standalone HTML page, then records the
/// generated page paths in the index. A failing document is reported and
/// skipped; the batch continues.
pub fn build_all(config: &Config) -> anyhow::Result<()> {
    let template_path = config.template_path();
    let template = fs::read_to_string(&template_path)
        .with_context(|| format!("Cannot read template {:?}", &template_path))?;

    let output_dir = config.output_dir();
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Cannot create directory {:?}", &output_dir))?;

    let files = articles::discover(config)?;
    println!("Building {} article(s)", files.len());

    let mut built = Vec::new();
    for path in &files {
        match build_article(path, &template, &output_dir, config) {
            Ok(Some(page)) => built.push(page),
            Ok(None) => {}
            Err(e) => eprintln!("  Error processing {:?}: {:#}", path, e),
        }
    }

    update_html_paths(&built, &config.index_path())?;

    println!("Built {} article(s) into {:?}", built.len(), output_dir);
    Ok(())
}

fn build_article(
    path: &Path,
    template: &str,
    output_dir: &Path,
    config: &Config,
) -> anyhow::Result<Option<BuiltPage>> {
    println!("Processing '{}'", path.display());

    let article = match articles::load(path)? {
        Some(article) => article,
        None => return Ok(None),
    };

    let page = assemble_page(&article, template, config)?;

    let output_file = output_dir.join(format!("{}.html", article.slug));
    fs::write(&output_file, page).with_context(|| format!("Cannot write to {:?}", &output_file))?;
    println!("  Generated '{}.html'", article.slug);

    Ok(Some(BuiltPage {
        title: article.meta.title,
        html_path: format!("articles/{}.html", article.slug),
    }))
}

/// Populates the page template. All user-supplied text substituted into
/// attribute or text positions is HTML-escaped.
pub fn assemble_page(article: &Article, template: &str, config: &Config) -> anyhow::Result<String> {
    let meta = &article.meta;

    let body = images::normalize_paths(&article.body, &article.slug, &meta.date, &config.shared_images_date);
    let content = render::render_markdown(&body, &meta.title);
    let toc = render::toc_html(&render::extract_headings(&content));

    let substitutions = hashmap! {
        "{{TITLE}}" => render::escape(&meta.title),
        "{{DESCRIPTION}}" => render::escape(&meta.description),
        "{{DATE}}" => format_date(&meta.date),
        "{{ISO_DATE}}" => meta.date.clone(),
        "{{TYPE}}" => render::escape(&meta.article_type),
        "{{READING_TIME}}" => reading_time(&article.body).to_string(),
        "{{TAGS}}" => tags_html(&meta.tags),
        "{{TABLE_OF_CONTENTS}}" => toc,
        "{{CONTENT}}" => content,
        "{{JSON_LD}}" => json_ld(meta, config)?,
        "{{SLUG}}" => article.slug.clone(),
    };

    let mut page = template.to_string();
    for (token, value) in &substitutions {
        page = page.replace(token, value);
    }
    Ok(page)
}

/// `2025-11-06` -> `November 06, 2025`. Unparseable dates pass through as-is.
pub fn format_date(iso: &str) -> String {
    NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .map(|date| date.format("%B %d, %Y").to_string())
        .unwrap_or_else(|_| iso.to_string())
}

/// Estimated reading time in minutes at 200 words per minute, never below 1.
pub fn reading_time(text: &str) -> u32 {
    let words = WORD_RE.find_iter(text).count();
    ((words as f64 / 200.0).round() as u32).max(1)
}

fn tags_html(tags: &[String]) -> String {
    if tags.is_empty() {
        return String::new();
    }

    let spans: String = tags
        .iter()
        .map(|tag| format!("<span class=\"article-tag\">{}</span>", render::escape(tag)))
        .collect();
    format!("<div class=\"article-tags\">{}</div>", spans)
}

/// The schema.org structured-data block for search engines.
fn json_ld(meta: &ArticleMeta, config: &Config) -> anyhow::Result<String> {
    let author_name = config.author_name.as_deref().unwrap_or_default();
    let mut data = serde_json::json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": meta.title,
        "description": meta.description,
        "datePublished": meta.date,
        "author": {
            "@type": "Person",
            "name": author_name,
            "url": config.author_url.as_deref().unwrap_or_default(),
        },
        "publisher": {
            "@type": "Person",
            "name": author_name,
        },
    });

    if !meta.tags.is_empty() {
        data["keywords"] = meta.tags.join(", ").into();
    }

    Ok(format!(
        "<script type=\"application/ld+json\">{}</script>",
        serde_json::to_string_pretty(&data)?
    ))
}

/// Records the generated page path of every built article in the index,
/// matching entries by title. The index step owns the file; a missing index
/// just skips the update.
fn update_html_paths(built: &[BuiltPage], index_path: &Path) -> anyhow::Result<()> {
    if !index_path.exists() {
        return Ok(());
    }

    let json = fs::read_to_string(index_path)
        .with_context(|| format!("Cannot read index {:?}", index_path))?;
    let mut entries: Vec<IndexEntry> =
        serde_json::from_str(&json).with_context(|| format!("Malformed index {:?}", index_path))?;

    for entry in &mut entries {
        if let Some(page) = built.iter().find(|p| p.title == entry.title) {
            entry.html_path = Some(page.html_path.clone());
        }
    }

    fs::write(index_path, serde_json::to_string_pretty(&entries)?)
        .with_context(|| format!("Cannot write index {:?}", index_path))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_config() -> Config {
        Config {
            base_url: "https://example.com".to_string(),
            writing_dir: "writing".into(),
            site_dir: ".".into(),
            article_url_path: "/writing/".to_string(),
            shared_images_date: "2025-11-06".to_string(),
            author_name: Some("Jane Doe".to_string()),
            author_url: Some("https://example.com".to_string()),
        }
    }

    #[test]
    fn formats_iso_dates_for_humans() {
        assert_eq!(format_date("2025-11-06"), "November 06, 2025");
        assert_eq!(format_date("not-a-date"), "not-a-date");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn reading_time_is_at_least_one_minute() {
        assert_eq!(reading_time(""), 1);
        assert_eq!(reading_time("word"), 1);
    }

    #[test]
    fn reading_time_rounds_word_count() {
        let text = vec!["word"; 300].join(" ");
        assert_eq!(reading_time(&text), 2);
    }

    #[test]
    fn tags_are_rendered_and_escaped() {
        insta::assert_snapshot!(
            tags_html(&["rust".to_string(), "a<b".to_string()]),
            @r###"<div class="article-tags"><span class="article-tag">rust</span><span class="article-tag">a&lt;b</span></div>"###
        );
        assert_eq!(tags_html(&[]), "");
    }

    #[test]
    fn assembles_every_placeholder() {
        let template = "<title>{{TITLE}}</title>\n<meta content=\"{{DESCRIPTION}}\">\n\
                        <time datetime=\"{{ISO_DATE}}\">{{DATE}}</time>\n\
                        {{TYPE}} | {{READING_TIME}} min | {{SLUG}}\n\
                        {{TAGS}}\n{{TABLE_OF_CONTENTS}}\n{{JSON_LD}}\n<main>{{CONTENT}}</main>\n";

        let article = Article {
            slug: "first-post".to_string(),
            file_name: "first-post.md".to_string(),
            meta: ArticleMeta {
                title: "Tools & Toys".to_string(),
                description: "A \"quoted\" summary".to_string(),
                date: "2025-03-04".to_string(),
                article_type: "Article".to_string(),
                tags: vec!["misc".to_string()],
            },
            body: "Hello **world**.\n".to_string(),
        };

        let page = assemble_page(&article, template, &test_config()).unwrap();

        assert!(page.contains("<title>Tools &amp; Toys</title>"));
        assert!(page.contains("<meta content=\"A &quot;quoted&quot; summary\">"));
        assert!(page.contains("<time datetime=\"2025-03-04\">March 04, 2025</time>"));
        assert!(page.contains("Article | 1 min | first-post"));
        assert!(page.contains("<span class=\"article-tag\">misc</span>"));
        assert!(page.contains("<main><p>Hello <strong>world</strong>.</p>\n</main>"));
        assert!(page.contains("\"headline\": \"Tools & Toys\""));
        assert!(page.contains("\"keywords\": \"misc\""));
        assert!(!page.contains("{{"));
    }
}
