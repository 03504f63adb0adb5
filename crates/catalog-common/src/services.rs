//! CRUD services for the catalog resources.

use std::marker::PhantomData;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{ApiResponse, Blog, ListParams, Page, Product, Project, UserRequest};
use crate::notify::Notification;

/// A REST resource under the API root.
pub trait Resource: Serialize + DeserializeOwned {
    /// Collection path, e.g. `/products`.
    const PATH: &'static str;
    /// Singular display name, e.g. `Product`.
    const LABEL: &'static str;

    fn id(&self) -> &str;

    /// Text fields that client-side search looks at.
    fn search_fields(&self) -> Vec<&str>;
}

impl Resource for Product {
    const PATH: &'static str = "/products";
    const LABEL: &'static str = "Product";

    fn id(&self) -> &str {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        fields.extend(self.range.iter().map(String::as_str));
        fields
    }
}

impl Resource for Project {
    const PATH: &'static str = "/projects";
    const LABEL: &'static str = "Project";

    fn id(&self) -> &str {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.industry.as_str()]
    }
}

impl Resource for Blog {
    const PATH: &'static str = "/blogs";
    const LABEL: &'static str = "Blog";

    fn id(&self) -> &str {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.tag.as_str()]
    }
}

impl Resource for UserRequest {
    const PATH: &'static str = "/user-requests";
    const LABEL: &'static str = "Request";

    fn id(&self) -> &str {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.company_name.as_str(), self.email.as_str()]
    }
}

/// Case-insensitive substring match over a resource's search fields. An
/// empty term matches everything.
pub fn matches_search<R: Resource>(item: &R, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || item
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
}

/// Generic CRUD over one resource type.
#[derive(Debug, Clone)]
pub struct CatalogService<R> {
    client: ApiClient,
    _resource: PhantomData<fn() -> R>,
}

pub type ProductService = CatalogService<Product>;
pub type ProjectService = CatalogService<Project>;
pub type BlogService = CatalogService<Blog>;

impl<R: Resource> CatalogService<R> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn item_path(id: &str) -> String {
        format!("{}/{}", R::PATH, id)
    }

    pub async fn list(&self, params: &ListParams) -> Result<Page<R>, ApiError> {
        let response: ApiResponse<Page<R>> = self.client.get_query(R::PATH, params).await?;
        tracing::debug!(
            resource = R::LABEL,
            count = response.data.data.len(),
            total = response.data.total,
            "listed"
        );
        Ok(response.data)
    }

    pub async fn get(&self, id: &str) -> Result<R, ApiError> {
        let response: ApiResponse<R> = self.client.get(&Self::item_path(id)).await?;
        Ok(response.data)
    }

    pub async fn create(&self, item: &R) -> Result<R, ApiError> {
        let response: ApiResponse<R> = self.client.post(R::PATH, item).await?;
        self.client.notify(Notification::info(
            "Success",
            format!("{} created successfully", R::LABEL),
        ));
        Ok(response.data)
    }

    pub async fn update(&self, id: &str, item: &R) -> Result<R, ApiError> {
        let response: ApiResponse<R> = self.client.put(&Self::item_path(id), item).await?;
        self.client.notify(Notification::info(
            "Success",
            format!("{} updated successfully", R::LABEL),
        ));
        Ok(response.data)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self.client.delete(&Self::item_path(id)).await?;
        self.client.notify(Notification::info(
            "Success",
            format!("{} deleted successfully", R::LABEL),
        ));
        Ok(())
    }
}

/// User requests: the generic CRUD plus the spreadsheet export.
#[derive(Debug, Clone)]
pub struct UserRequestService {
    inner: CatalogService<UserRequest>,
}

impl UserRequestService {
    pub const EXPORT_PATH: &'static str = "/user-requests/export";
    /// File name the console saves exports under.
    pub const EXPORT_FILE_NAME: &'static str = "user-requests.xlsx";

    pub fn new(client: ApiClient) -> Self {
        Self {
            inner: CatalogService::new(client),
        }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Page<UserRequest>, ApiError> {
        self.inner.list(params).await
    }

    pub async fn get(&self, id: &str) -> Result<UserRequest, ApiError> {
        self.inner.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.inner.delete(id).await
    }

    /// All requests as an `.xlsx` workbook.
    pub async fn export_xlsx(&self) -> Result<Bytes, ApiError> {
        let bytes = self.inner.client().get_bytes(Self::EXPORT_PATH).await?;
        tracing::debug!(size = bytes.len(), "exported user requests");
        Ok(bytes)
    }
}
