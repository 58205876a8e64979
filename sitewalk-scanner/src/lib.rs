pub mod crawler;
pub mod error;
pub mod expander;
pub mod frontier;
pub mod reference;
pub mod result;
pub mod scope;
pub mod visited;
mod wavefront;
pub mod worker;

pub use crawler::{CancelToken, Crawler, Phase, Strategy, traverse};
pub use error::{ExpandError, ScanError};
pub use expander::{Expander, LinkGraph};
pub use reference::reference_crawl;
pub use result::{CrawlResult, CrawlStats};
pub use scope::{HostScope, Scope, ScopeKey};
pub use worker::ProgressCallback;
