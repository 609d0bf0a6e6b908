pub mod archive;
pub mod current;
pub mod db;
pub mod loader;
pub mod parser;
pub mod scraper;
pub mod types;
pub mod utils;

pub use loader::{ConflictResolver, LoadError, Policy, Prompt};
pub use scraper::{PageSource, ScraperError, WebScraper};
