pub mod crawl;
pub mod graph;
pub mod report;
