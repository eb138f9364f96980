#[macro_use]
extern crate serde_derive;

pub mod articles;
pub mod config;
pub mod frontmatter;
pub mod images;
pub mod index;
pub mod publish;
pub mod render;
pub mod sitemap;
