//! Shared plumbing for the catalog console: configuration, the API client and
//! its notification pipeline, the admin session, and the resource services.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;
pub mod telemetry;
pub mod upload;

pub use crate::auth::{AdminUser, AuthService, Session};
pub use crate::client::ApiClient;
pub use crate::config::Config;
pub use crate::error::{ApiError, CatalogError, ConfigError, Result, SessionError};
pub use crate::models::{
    ApiResponse, Blog, Industry, ListParams, Page, Product, Project, UserRequest,
};
pub use crate::notify::{
    CollectingNotifier, Notification, Notifier, Severity, TracingNotifier,
    notification_for_status,
};
pub use crate::services::{
    BlogService, CatalogService, ProductService, ProjectService, Resource, UserRequestService,
    matches_search,
};
pub use crate::upload::{UploadService, UploadedFiles};
