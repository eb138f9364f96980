//! Markdown rendering: HTML conversion, heading anchors and the table of
//! contents.

use std::collections::HashSet;

use itertools::Itertools;
use pulldown_cmark_escape::escape_html;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use scraper::Selector;

/// A level-2/3 heading extracted from rendered HTML.
#[derive(Debug, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// Renders a document body to HTML. A leading `# title` that repeats the
/// document title is dropped (the page template renders the title itself),
/// and every heading gets an anchor id.
pub fn render_markdown(body: &str, title: &str) -> String {
    let body = strip_title_heading(body, title);

    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    let events = add_heading_ids(Parser::new_ext(&body, options).collect());

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

fn strip_title_heading(body: &str, title: &str) -> String {
    if title.is_empty() {
        return body.to_string();
    }
    let re = Regex::new(&format!(r"(?m)^#\s+{}\s*\n", regex::escape(title))).unwrap();
    re.replace(body, "").into_owned()
}

/// Gives every heading without an explicit id a slugified anchor id derived
/// from its text, deduplicated with a numeric suffix.
fn add_heading_ids(mut events: Vec<Event>) -> Vec<Event> {
    let mut used = HashSet::new();

    for i in 0..events.len() {
        let needs_id = match &events[i] {
            Event::Start(Tag::Heading { id: Some(id), .. }) => {
                used.insert(id.to_string());
                false
            }
            Event::Start(Tag::Heading { id: None, .. }) => true,
            _ => false,
        };

        if needs_id {
            let text = heading_text(&events[i..]);
            let id = unique_id(&slug::slugify(text), &mut used);
            if let Event::Start(Tag::Heading { id: heading_id, .. }) = &mut events[i] {
                *heading_id = Some(CowStr::from(id));
            }
        }
    }

    events
}

/// Concatenated text of the heading starting at `events[0]`.
fn heading_text(events: &[Event]) -> String {
    events
        .iter()
        .skip(1)
        .take_while(|ev| !matches!(ev, Event::End(TagEnd::Heading(_))))
        .filter_map(|ev| match ev {
            Event::Text(text) | Event::Code(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect()
}

fn unique_id(base: &str, used: &mut HashSet<String>) -> String {
    let base = if base.is_empty() { "section" } else { base };
    let mut id = base.to_string();
    let mut n = 1;
    while !used.insert(id.clone()) {
        id = format!("{}-{}", base, n);
        n += 1;
    }
    id
}

/// Extracts level-2/3 headings (with their anchor ids) from rendered HTML,
/// in document order.
pub fn extract_headings(html: &str) -> Vec<Heading> {
    let selector = Selector::parse("h2[id], h3[id]").unwrap();
    let fragment = scraper::Html::parse_fragment(html);

    fragment
        .select(&selector)
        .map(|elt| Heading {
            level: if elt.value().name() == "h2" { 2 } else { 3 },
            id: elt.value().attr("id").unwrap_or_default().to_string(),
            text: elt.text().join("").trim().to_string(),
        })
        .collect()
}

/// Builds the table-of-contents fragment. Fewer than 3 headings produce no
/// table of contents at all.
pub fn toc_html(headings: &[Heading]) -> String {
    if headings.len() < 3 {
        return String::new();
    }

    let mut toc = String::from("<nav class=\"table-of-contents\">\n<h4>Table of Contents</h4>\n<ul>\n");
    for heading in headings {
        let class = if heading.level == 3 { "toc-level-3" } else { "" };
        toc.push_str(&format!(
            "<li class=\"{}\"><a href=\"#{}\">{}</a></li>\n",
            class,
            heading.id,
            escape(&heading.text)
        ));
    }
    toc.push_str("</ul></nav>");
    toc
}

/// HTML-escapes text for element or attribute positions.
pub fn escape(text: &str) -> String {
    let mut out = String::new();
    escape_html(&mut out, text).unwrap();
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_a_leading_title_heading() {
        let html = render_markdown("# My Post\n\nHello.\n", "My Post");
        assert!(!html.contains("My Post"));
        assert!(html.contains("<p>Hello.</p>"));
    }

    #[test]
    fn keeps_a_non_matching_heading() {
        let html = render_markdown("# Something Else\n\nHello.\n", "My Post");
        assert!(html.contains("<h1"));
    }

    #[test]
    fn headings_get_anchor_ids() {
        let html = render_markdown("## First Section\n\n### Sub Section\n", "t");
        assert!(html.contains("<h2 id=\"first-section\">"));
        assert!(html.contains("<h3 id=\"sub-section\">"));
    }

    #[test]
    fn duplicate_headings_get_unique_ids() {
        let html = render_markdown("## FAQ\n\n## FAQ\n\n## FAQ\n", "t");
        assert!(html.contains("id=\"faq\""));
        assert!(html.contains("id=\"faq-1\""));
        assert!(html.contains("id=\"faq-2\""));
    }

    #[test]
    fn extracts_headings_in_document_order() {
        let html = render_markdown("## One\n\nx\n\n### Two\n\ny\n\n## Three\n", "t");
        let headings = extract_headings(&html);
        assert_eq!(headings.len(), 3);
        assert_eq!((headings[0].level, headings[0].id.as_str()), (2, "one"));
        assert_eq!((headings[1].level, headings[1].text.as_str()), (3, "Two"));
        assert_eq!((headings[2].level, headings[2].id.as_str()), (2, "three"));
    }

    #[test]
    fn level_one_and_four_headings_are_ignored() {
        let html = render_markdown("# Top\n\n#### Deep\n", "t");
        assert!(extract_headings(&html).is_empty());
    }

    #[test]
    fn no_toc_below_three_headings() {
        let headings = vec![
            Heading { level: 2, id: "a".to_string(), text: "A".to_string() },
            Heading { level: 2, id: "b".to_string(), text: "B".to_string() },
        ];
        assert_eq!(toc_html(&headings), "");
    }

    #[test]
    fn toc_links_every_heading() {
        let headings = vec![
            Heading { level: 2, id: "setup".to_string(), text: "Setup".to_string() },
            Heading { level: 3, id: "details".to_string(), text: "Details & More".to_string() },
            Heading { level: 2, id: "results".to_string(), text: "Results".to_string() },
        ];
        insta::assert_snapshot!(toc_html(&headings), @r###"
        <nav class="table-of-contents">
        <h4>Table of Contents</h4>
        <ul>
        <li class=""><a href="#setup">Setup</a></li>
        <li class="toc-level-3"><a href="#details">Details &amp; More</a></li>
        <li class=""><a href="#results">Results</a></li>
        </ul></nav>
        "###);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b> & \"q\""), "&lt;b&gt; &amp; &quot;q&quot;");
    }
}
