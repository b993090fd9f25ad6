//! Billomat API client
//!
//! [`BillomatClient`] ties the HTTP transport, the response envelope parser
//! and the two pagination strategies together into resource-level
//! operations.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RateLimitHandler, RequestConfig};
use crate::pagination::{
    envelope, BatchCollector, BatchOutcome, PageFetcher, PageRequest, PageResult, Paginator,
};
use crate::resource::Resource;
use crate::types::{Filters, JsonObject, JsonValue, Record};
use async_trait::async_trait;
use reqwest::Method;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Async client for one Billomat account
#[derive(Debug)]
pub struct BillomatClient {
    http: HttpClient,
    config: ClientConfig,
}

impl BillomatClient {
    /// Create a client after validating `config`
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::with_auth(config.http_config(), config.credentials())?;
        Ok(Self { http, config })
    }

    /// Create a client from `BILLOMAT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Replace the hook consulted when the API answers 429
    pub fn set_rate_limit_handler(&mut self, handler: Arc<dyn RateLimitHandler>) {
        self.http.set_rate_limit_handler(handler);
    }

    /// The configuration this client was built from
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A first-page request for `resource` using the configured page size
    pub fn page_request(&self, resource: Resource, filters: Filters) -> PageRequest {
        PageRequest::new(resource)
            .per_page(self.config.pagination.per_page)
            .filters(filters)
    }

    // ========================================================================
    // Collections
    // ========================================================================

    /// Fetch every record of `resource`, one page after another
    pub async fn list(&self, resource: Resource, filters: Filters) -> Result<Vec<Record>> {
        self.list_request(self.page_request(resource, filters)).await
    }

    /// Sequential retrieval starting from an explicit request
    pub async fn list_request(&self, request: PageRequest) -> Result<Vec<Record>> {
        Paginator::new(self, request)
            .policy(self.config.pagination.sequential_policy)
            .fetch_all()
            .await
    }

    /// Fetch every record of `resource`, requesting pages 2..N concurrently.
    ///
    /// Records come back in page order.
    pub async fn list_concurrent(
        &self,
        resource: Resource,
        filters: Filters,
    ) -> Result<BatchOutcome> {
        self.list_concurrent_request(self.page_request(resource, filters))
            .await
    }

    /// Concurrent retrieval starting from an explicit request
    pub async fn list_concurrent_request(&self, base: PageRequest) -> Result<BatchOutcome> {
        self.collector()
            .collect_all_pages(&base, |request| async move {
                self.fetch_page(&request).await
            })
            .await
    }

    /// Fetch the child records of several parents at once.
    ///
    /// One request is issued per distinct parent id, filtered by the
    /// resource's parent key. Records arrive in completion order.
    pub async fn list_children<I, S>(&self, resource: Resource, parent_ids: I) -> Result<BatchOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requests = self.child_requests(resource, parent_ids)?;
        debug!("{resource}: batching {} parent id(s)", requests.len());

        self.collector()
            .collect_with_outcome(requests, |request| async move {
                self.fetch_page(&request).await
            })
            .await
    }

    /// One first-page request per distinct parent id, in first-seen order
    pub fn child_requests<I, S>(&self, resource: Resource, parent_ids: I) -> Result<Vec<PageRequest>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parent_key = resource.parent_key.ok_or_else(|| {
            Error::config(format!("'{resource}' cannot be listed by parent id"))
        })?;

        let mut seen = HashSet::new();
        Ok(parent_ids
            .into_iter()
            .filter_map(|id| {
                let id = id.as_ref().trim().to_string();
                (!id.is_empty() && seen.insert(id.clone())).then(|| {
                    PageRequest::new(resource)
                        .per_page(self.config.pagination.batch_per_page)
                        .filter(parent_key, id)
                })
            })
            .collect())
    }

    fn collector(&self) -> BatchCollector {
        BatchCollector::new(self.config.pagination.batch_options())
    }

    // ========================================================================
    // Single records
    // ========================================================================

    /// Fetch one record by id
    pub async fn get(&self, resource: Resource, id: &str) -> Result<Record> {
        let body: JsonValue = self.http.get_json(&resource.item_path(id)).await?;
        envelope::extract_single(body, &resource)
    }

    /// Create a record; `data` is wrapped under the resource's data key
    pub async fn create(&self, resource: Resource, data: Record) -> Result<Record> {
        let body = wrap(resource.data_key, data);
        let created: JsonValue = self
            .http
            .send_json(Method::POST, resource.path, body)
            .await?;
        envelope::extract_single(created, &resource)
    }

    /// Update a record; `data` is wrapped under the resource's data key
    pub async fn update(&self, resource: Resource, id: &str, data: Record) -> Result<Record> {
        let body = wrap(resource.data_key, data);
        let updated: JsonValue = self
            .http
            .send_json(Method::PUT, &resource.item_path(id), body)
            .await?;
        envelope::extract_single(updated, &resource)
    }

    /// Delete a record
    pub async fn delete(&self, resource: Resource, id: &str) -> Result<()> {
        self.http.delete(&resource.item_path(id)).await?;
        debug!("{resource}: deleted {id}");
        Ok(())
    }

    // ========================================================================
    // Document actions
    // ========================================================================

    /// Finalise a draft document (`PUT {id}/complete`)
    pub async fn complete(&self, resource: Resource, id: &str, data: Record) -> Result<()> {
        self.action(Method::PUT, resource, id, "complete", wrap("complete", data))
            .await
    }

    /// Cancel a document (`PUT {id}/cancel`)
    pub async fn cancel(&self, resource: Resource, id: &str) -> Result<()> {
        self.action(Method::PUT, resource, id, "cancel", JsonValue::Object(JsonObject::new()))
            .await
    }

    /// Send a document by email (`POST {id}/email`)
    pub async fn send_email(&self, resource: Resource, id: &str, data: Record) -> Result<()> {
        self.action(Method::POST, resource, id, "email", wrap("email", data))
            .await
    }

    /// PDF metadata of a document, including the base64 encoded file
    pub async fn pdf(&self, resource: Resource, id: &str) -> Result<Record> {
        let body: JsonValue = self
            .http
            .get_json(&resource.action_path(id, "pdf"))
            .await?;
        envelope::extract_single(body, &Resource::new(resource.path, "pdf"))
    }

    /// The raw PDF file of a document
    pub async fn pdf_file(&self, resource: Resource, id: &str) -> Result<Vec<u8>> {
        self.http
            .get_bytes(
                &resource.action_path(id, "pdf"),
                RequestConfig::new()
                    .query("format", "pdf")
                    .header("Accept", "application/pdf"),
            )
            .await
    }

    async fn action(
        &self,
        method: Method,
        resource: Resource,
        id: &str,
        action: &str,
        body: JsonValue,
    ) -> Result<()> {
        let path = resource.action_path(id, action);
        self.http
            .request(method, &path, RequestConfig::new().json(body))
            .await?;
        debug!("{path}: done");
        Ok(())
    }
}

/// `{ key: data }`
fn wrap(key: &str, data: Record) -> JsonValue {
    let mut body = JsonObject::new();
    body.insert(key.to_string(), JsonValue::Object(data));
    JsonValue::Object(body)
}

#[async_trait]
impl PageFetcher for BillomatClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult> {
        let config = RequestConfig::new().query_pairs(request.query_params());
        let body: JsonValue = self
            .http
            .get_json_with_config(request.resource.path, config)
            .await?;
        envelope::parse_page(&body, &request.resource, request.page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{CLIENTS, INVOICE_ITEMS};
    use pretty_assertions::assert_eq;

    fn client() -> BillomatClient {
        let mut config = ClientConfig::new("acme", "key").without_rate_limit();
        config.pagination.batch_per_page = 50;
        BillomatClient::new(config).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = BillomatClient::new(ClientConfig::new("acme", "")).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }

    #[test]
    fn test_child_requests_dedupe_in_first_seen_order() {
        let requests = client()
            .child_requests(INVOICE_ITEMS, ["7", "3", "7", " ", "3", "9"])
            .unwrap();

        let ids: Vec<&str> = requests
            .iter()
            .map(|r| r.filters["invoice_id"].as_str())
            .collect();
        assert_eq!(ids, vec!["7", "3", "9"]);
        assert!(requests.iter().all(|r| r.page == 1 && r.per_page == 50));
    }

    #[test]
    fn test_child_requests_need_parent_key() {
        let err = client().child_requests(CLIENTS, ["1"]).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_page_request_uses_configured_size() {
        let mut filters = Filters::new();
        filters.insert("name".to_string(), "Acme".to_string());
        let request = client().page_request(CLIENTS, filters);

        assert_eq!(request.per_page, 1000);
        assert_eq!(request.page, 1);
        assert_eq!(request.filters["name"], "Acme");
    }
}
