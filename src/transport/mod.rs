mod http_transport;
mod upstream_request;

pub use http_transport::HttpTransport;
pub use upstream_request::UpstreamRequest;
