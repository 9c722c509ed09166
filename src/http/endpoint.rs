//! JSON endpoint executor

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::listing::{ListingAction, ListingRequest};
use crate::pagination::{
    apply_pagination, value_at, PaginationRequestDetails, Paginator, RequestInit,
};
use crate::runner::Action;
use crate::types::{JsonObject, JsonValue, StringMap};
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// A JSON resource fetched with GET, one page per call
#[derive(Debug, Clone)]
pub struct JsonEndpoint {
    client: Client,
    /// URL template; `{name}` placeholders are filled from `url_args`
    url: String,
    result_path: Option<String>,
    headers: StringMap,
}

impl JsonEndpoint {
    /// Endpoint with default HTTP settings
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_config(url, &HttpConfig::default())
    }

    /// Endpoint with explicit HTTP settings
    pub fn with_config(url: impl Into<String>, config: &HttpConfig) -> Result<Self> {
        let url = url.into();
        Url::parse(&url)?;

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(format!("async-listing/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url,
            result_path: None,
            headers: config.headers.clone(),
        })
    }

    /// Read the paginated value from a dotted path inside the body
    #[must_use]
    pub fn with_result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = Some(path.into()).filter(|p: &String| !p.is_empty());
        self
    }

    /// Send a header with every request
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// URL template
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn result_path(&self) -> Option<&str> {
        self.result_path.as_deref()
    }

    /// Fetch one page of items
    ///
    /// The paginator, when given, shapes the query and receives the
    /// response. A body that is not a list (and not paginated) comes back as
    /// a single item.
    pub async fn fetch<P: Paginator>(
        &self,
        query: JsonObject,
        paginator: Option<&P>,
    ) -> Result<Vec<JsonValue>> {
        self.fetch_with(RequestInit::from_query(query), paginator)
            .await
    }

    /// Fetch one page with full request options
    ///
    /// `url_args` fill `{name}` placeholders in the URL template and
    /// `headers` are sent after the endpoint's own.
    pub async fn fetch_with<P: Paginator>(
        &self,
        init: RequestInit,
        paginator: Option<&P>,
    ) -> Result<Vec<JsonValue>> {
        let init = match paginator {
            Some(paginator) => paginator.get_request_init(init),
            None => init,
        };
        let url = self.resolve_url(&init.url_args)?;

        let mut request = self.client.get(url.clone()).query(&init.query_pairs());
        for (name, value) in self.headers.iter().chain(&init.headers) {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!(url = %url, query = ?init.query, "Fetching page");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }
        let body: JsonValue = response.json().await?;

        let value = match paginator {
            Some(paginator) => {
                let details = PaginationRequestDetails::new(body)
                    .with_query(init.query)
                    .with_url(url.as_str());
                apply_pagination(paginator, &details, self.result_path.as_deref())?
            }
            None => body,
        };
        Ok(self.items(value))
    }

    /// Wrap the endpoint as a listing executor
    pub fn into_action<P: Paginator>(self) -> ListingAction<JsonValue, P> {
        let endpoint = Arc::new(self);
        Action::new(move |request: ListingRequest<P>| {
            let endpoint = Arc::clone(&endpoint);
            async move {
                endpoint
                    .fetch(request.query, request.paginator.as_deref())
                    .await
            }
        })
    }

    fn resolve_url(&self, url_args: &JsonObject) -> Result<Url> {
        let mut url = self.url.clone();
        for (name, value) in url_args {
            let value = match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            url = url.replace(&format!("{{{name}}}"), &value);
        }
        Ok(Url::parse(&url)?)
    }

    fn items(&self, value: JsonValue) -> Vec<JsonValue> {
        let found = self
            .result_path
            .as_deref()
            .and_then(|path| value_at(&value, path))
            .cloned();
        match found.unwrap_or(value) {
            JsonValue::Array(items) => items,
            JsonValue::Null => Vec::new(),
            other => vec![other],
        }
    }
}
