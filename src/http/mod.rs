//! HTTP executor for listings
//!
//! [`JsonEndpoint`] fetches a JSON resource with the paginator's query
//! parameters, feeds the body through the pagination middleware and hands
//! back the page's items. It is the stock action executor for an
//! [`AsyncListing`](crate::listing::AsyncListing).

mod endpoint;

pub use endpoint::JsonEndpoint;
