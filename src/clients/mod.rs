pub mod endpoint;
pub mod fetcher;
pub mod models;
pub mod transport;

pub use endpoint::EndpointBuilder;
pub use fetcher::ApiFetcher;
pub use transport::{ApiPage, HttpTransport, Pagination, Transport};
