pub mod caching;
pub mod http;
pub mod scraping;
pub mod structured;

pub use caching::CachingFetcher;
pub use http::ReqwestFetcher;
pub use scraping::HtmlSource;
pub use structured::StructuredApiSource;
