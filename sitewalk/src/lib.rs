pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{load_urls_from_file, load_urls_from_source, parse_start_url, parse_url_line};

// Re-export crawl functionality from sitewalk-core
pub use sitewalk_core::crawl::{
    CrawlOptions, CrawlProgressCallback, HostCrawl, execute_crawl, extract_url_path,
};
