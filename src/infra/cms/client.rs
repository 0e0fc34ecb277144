use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::application::source::ContentSource;
use crate::config::CmsSettings;
use crate::domain::{CategoriesResponse, Collection, Grouping, ListQueryOptions, PaginatedDocs};

use super::error::CmsError;
use super::query::QueryParams;

const METRIC_UPSTREAM_REQUEST: &str = "cms_upstream_request_total";

/// Authenticated client for the headless CMS REST API.
///
/// One HTTP request per call: no retries, no batching. Cheap to clone.
#[derive(Clone, Debug)]
pub struct CmsClient {
    http: Client,
    base: Url,
    auth: HeaderValue,
}

impl CmsClient {
    /// Builds a client from settings, failing when the server URL or API key is missing.
    pub fn new(settings: &CmsSettings) -> Result<Self, CmsError> {
        let server_url = required(settings.server_url.as_deref(), "cms.server_url")?;
        let api_key = required(settings.api_key.as_deref(), "cms.api_key")?;
        Self::connect(server_url, api_key, settings.request_timeout)
    }

    pub fn connect(
        server_url: &str,
        api_key: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, CmsError> {
        let base = with_trailing_slash(Url::parse(server_url)?);

        let mut auth = HeaderValue::from_str(&format!("users API-Key {api_key}")).map_err(
            |err| CmsError::configuration(format!("api key is not a valid header value: {err}")),
        )?;
        auth.set_sensitive(true);

        let mut builder = Client::builder().user_agent(Self::user_agent());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| CmsError::configuration(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { http, base, auth })
    }

    pub fn user_agent() -> &'static str {
        concat!("storefront-cms/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, path: &str, params: &QueryParams) -> Result<Url, CmsError> {
        let mut url = self.base.join(path.trim_start_matches('/'))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params.pairs() {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Sends one request and decodes the JSON response.
    ///
    /// Transport failures map to [`CmsError::UpstreamUnavailable`]; non-2xx
    /// answers to [`CmsError::Upstream`] with the CMS-supplied message.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &QueryParams,
        body: Option<&Value>,
    ) -> Result<T, CmsError> {
        let url = self.url(path, params)?;
        debug!(%method, %url, "Sending CMS request");

        let mut request = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, self.auth.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        counter!(METRIC_UPSTREAM_REQUEST).increment(1);
        let response = request.send().await.map_err(|err| {
            warn!(error = %err, "CMS unreachable");
            CmsError::UpstreamUnavailable(err)
        })?;
        Self::handle(response).await
    }

    async fn handle<T: DeserializeOwned>(response: Response) -> Result<T, CmsError> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(CmsError::UpstreamUnavailable)?;

        if !status.is_success() {
            let message = upstream_message(&bytes);
            warn!(
                status = status.as_u16(),
                message = message.as_deref(),
                "CMS request failed"
            );
            return Err(CmsError::upstream(status.as_u16(), message));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn find<T: DeserializeOwned>(
        &self,
        collection: &Collection,
        params: QueryParams,
    ) -> Result<PaginatedDocs<T>, CmsError> {
        self.request(Method::GET, &collection_path(collection), &params, None)
            .await
    }

    pub async fn find_published_list<T: DeserializeOwned>(
        &self,
        collection: &Collection,
        options: &ListQueryOptions,
    ) -> Result<PaginatedDocs<T>, CmsError> {
        self.find(collection, QueryParams::new().published().list_options(options))
            .await
    }

    /// First document with `slug`, regardless of status. Absence is `Ok(None)`.
    pub async fn find_by_slug<T: DeserializeOwned>(
        &self,
        collection: &Collection,
        slug: &str,
        locale: Option<&str>,
    ) -> Result<Option<T>, CmsError> {
        self.find_first(
            collection,
            QueryParams::new().where_equals("slug", slug),
            locale,
        )
        .await
    }

    pub async fn find_published_slug<T: DeserializeOwned>(
        &self,
        collection: &Collection,
        slug: &str,
        locale: Option<&str>,
    ) -> Result<Option<T>, CmsError> {
        self.find_first(
            collection,
            QueryParams::new().where_equals("slug", slug).published(),
            locale,
        )
        .await
    }

    async fn find_first<T: DeserializeOwned>(
        &self,
        collection: &Collection,
        params: QueryParams,
        locale: Option<&str>,
    ) -> Result<Option<T>, CmsError> {
        let page: PaginatedDocs<T> = self
            .find(collection, params.limit(1).locale(locale))
            .await?;
        Ok(page.docs.into_iter().next())
    }

    pub async fn categories<T: DeserializeOwned>(
        &self,
        grouping: Grouping,
        locale: Option<&str>,
        category_slug: Option<&str>,
    ) -> Result<CategoriesResponse<T>, CmsError> {
        let params = QueryParams::new()
            .locale(locale)
            .push_opt("categorySlug", category_slug);
        self.request(
            Method::GET,
            &format!("api/{}", grouping.endpoint()),
            &params,
            None,
        )
        .await
    }
}

#[async_trait]
impl ContentSource for CmsClient {
    async fn find_published_by_slug(
        &self,
        collection: &Collection,
        slug: &str,
        locale: Option<&str>,
    ) -> Result<Option<Value>, CmsError> {
        self.find_published_slug(collection, slug, locale).await
    }

    async fn find_published(
        &self,
        collection: &Collection,
        options: &ListQueryOptions,
    ) -> Result<PaginatedDocs<Value>, CmsError> {
        self.find_published_list(collection, options).await
    }

    async fn categories_with_children(
        &self,
        grouping: Grouping,
        locale: Option<&str>,
        category_slug: Option<&str>,
    ) -> Result<CategoriesResponse<Value>, CmsError> {
        self.categories(grouping, locale, category_slug).await
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str, CmsError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CmsError::configuration(format!("`{key}` is required")))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn collection_path(collection: &Collection) -> String {
    format!("api/{}", collection.as_str())
}

/// Message from a CMS error body: `message`, else `errors[0].message`.
fn upstream_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| value.get("errors")?.get(0)?.get("message")?.as_str())
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}
