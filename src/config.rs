use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;

//----- Command line parameters

/// From markdown articles to a published writing section
#[derive(Parser, Debug)]
pub struct RootCommand {
    /// Path to the config file
    #[clap(global = true, long, default_value = "md2site.yml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

impl RootCommand {
    // Avoids importing Parser in main
    pub fn read() -> RootCommand {
        RootCommand::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan articles and rebuild the JSON index
    Index,

    /// Render articles to static HTML pages
    Build {
        /// Rebuild the index before rendering
        #[clap(long)]
        index: bool,
    },

    /// Add missing article URLs to the sitemap
    Sitemap,
}

//----- Config file

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Site base URL, without a trailing '/'
    pub base_url: String,
    #[serde(default = "default_writing_dir")]
    pub writing_dir: PathBuf,
    /// Directory holding sitemap.xml
    #[serde(default = "default_site_dir")]
    pub site_dir: PathBuf,
    /// URL path of the writing section, with leading and trailing '/'
    #[serde(default = "default_article_url_path")]
    pub article_url_path: String,
    /// Publication date whose articles share a dated images directory
    #[serde(default = "default_shared_images_date")]
    pub shared_images_date: String,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
}

fn default_writing_dir() -> PathBuf {
    "writing".into()
}

fn default_site_dir() -> PathBuf {
    ".".into()
}

fn default_article_url_path() -> String {
    "/writing/".to_string()
}

fn default_shared_images_date() -> String {
    "2025-11-06".to_string()
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config = serde_yaml::from_reader(file).with_context(|| format!("Failed to read {:?}", path))?;
        Ok(config)
    }

    /// Preferred location of the markdown sources.
    pub fn src_dir(&self) -> PathBuf {
        self.writing_dir.join("src")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.writing_dir.join("articles")
    }

    pub fn template_path(&self) -> PathBuf {
        self.writing_dir.join("article-template.html")
    }

    pub fn index_path(&self) -> PathBuf {
        self.writing_dir.join("articles-index.json")
    }

    /// The listing page carrying an inline copy of the index.
    pub fn listing_page_path(&self) -> PathBuf {
        self.writing_dir.join("index.html")
    }

    pub fn sitemap_path(&self) -> PathBuf {
        self.site_dir.join("sitemap.xml")
    }

    pub fn article_url(&self, html_path: &str) -> String {
        format!("{}{}{}", self.base_url, self.article_url_path, html_path)
    }
}
