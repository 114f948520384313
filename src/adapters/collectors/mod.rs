pub mod command;
pub mod crawl;
pub mod html;
pub mod http;

pub use command::CommandCollector;
pub use crawl::CrawlCollector;
pub use html::SiteSelectors;
pub use http::StaticPageCollector;
