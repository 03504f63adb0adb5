//! Admin session and login.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::client::ApiClient;
use crate::error::{ApiError, CatalogError, SessionError};
use crate::models::ApiResponse;
use crate::notify::Notification;

/// The logged-in administrator, as persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Process-wide admin session.
///
/// Clones share the same state. With a backing file the session survives
/// restarts: `init` reads it and every change writes it back.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Arc<RwLock<Option<AdminUser>>>,
    path: Option<Arc<Path>>,
}

impl Session {
    /// A session that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the session stored at `path`. A missing file is an empty session.
    pub async fn init(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path: PathBuf = path.into();
        let user = match tokio::fs::read_to_string(&path).await {
            Ok(text) => Some(serde_json::from_str::<AdminUser>(&text).map_err(|source| {
                SessionError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => return Err(SessionError::Io { path, source }),
        };

        if let Some(user) = &user {
            tracing::debug!(email = %user.email, "restored session");
        }
        Ok(Self {
            user: Arc::new(RwLock::new(user)),
            path: Some(Arc::from(path.as_path())),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn user(&self) -> Option<AdminUser> {
        self.user.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.user.read().await.as_ref().and_then(|u| u.token.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.user.read().await.is_some()
    }

    /// Replace the current user and persist it.
    pub async fn set_user(&self, user: AdminUser) -> Result<(), SessionError> {
        let mut guard = self.user.write().await;
        if let Some(path) = &self.path {
            let text = serde_json::to_string_pretty(&user).map_err(|source| {
                SessionError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            tokio::fs::write(path, text)
                .await
                .map_err(|source| SessionError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        *guard = Some(user);
        Ok(())
    }

    /// Forget the user in memory and on disk.
    pub async fn teardown(&self) -> Result<(), SessionError> {
        let mut guard = self.user.write().await;
        *guard = None;
        if let Some(path) = &self.path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(SessionError::Io {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
        tracing::debug!("session cleared");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    user: LoginUser,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(alias = "_id")]
    id: String,
    email: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RefreshData {
    token: String,
}

/// Login, logout and token refresh against `/auth`.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Log in and persist the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminUser, CatalogError> {
        let response: ApiResponse<LoginData> = self
            .client
            .post("/auth/local/login", &Credentials { email, password })
            .await?;

        let LoginData { user, token } = response.data;
        let token = token.filter(|t| !t.is_empty()).ok_or(SessionError::MissingToken)?;
        let user = AdminUser {
            id: user.id,
            email: user.email,
            name: user.name,
            token: Some(token),
        };
        self.client.session().set_user(user.clone()).await?;
        tracing::info!(email = %user.email, "logged in");
        self.client
            .notify(Notification::info("Welcome!", "Login successful"));
        Ok(user)
    }

    /// Log out. The local session is cleared even if the server call fails.
    pub async fn logout(&self) -> Result<(), CatalogError> {
        let result: Result<ApiResponse<serde_json::Value>, ApiError> = self
            .client
            .post("/auth/logout", &serde_json::json!({}))
            .await;
        if let Err(err) = &result {
            tracing::debug!(error = %err, "logout request failed, clearing session anyway");
        }
        self.client.session().teardown().await?;
        self.client
            .notify(Notification::info("Goodbye!", "Logged out successfully"));
        Ok(())
    }

    /// Swap the session token for a fresh one.
    pub async fn refresh_token(&self) -> Result<(), CatalogError> {
        let response: ApiResponse<RefreshData> =
            self.client.post("/auth/refresh", &serde_json::json!({})).await?;
        let session = self.client.session();
        let Some(mut user) = session.user().await else {
            return Err(ApiError::Unauthorized.into());
        };
        user.token = Some(response.data.token);
        session.set_user(user).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AdminUser {
        AdminUser {
            id: "u1".into(),
            email: "admin@example.com".into(),
            name: "Admin".into(),
            token: Some("t0k3n".into()),
        }
    }

    #[tokio::test]
    async fn test_session_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin_user.json");

        let session = Session::init(&path).await.unwrap();
        assert!(!session.is_authenticated().await);

        session.set_user(admin()).await.unwrap();
        assert_eq!(session.token().await.as_deref(), Some("t0k3n"));

        let reopened = Session::init(&path).await.unwrap();
        assert_eq!(reopened.user().await, Some(admin()));

        reopened.teardown().await.unwrap();
        assert!(!path.exists());
        assert_eq!(reopened.user().await, None);
        // Tearing down twice is fine
        reopened.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let session = Session::in_memory();
        let other = session.clone();
        session.set_user(admin()).await.unwrap();
        assert!(other.is_authenticated().await);
        other.teardown().await.unwrap();
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_corrupt_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin_user.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Session::init(&path).await,
            Err(SessionError::Corrupt { .. })
        ));
    }
}
