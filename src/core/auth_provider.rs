use crate::domain::model::{AuthMode, BackendResponse, Credentials};
use crate::domain::ports::{AuthBackend, ConfigProvider, KeyValueStore};
use crate::utils::error::{ProviderError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Login state as seen by the admin UI. Written only when a backend call completes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub logged_in: bool,
    pub profile: Option<Value>,
    pub permission: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
    /// `email`, `universal` or `external`; the configured default applies when absent.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorParams {
    #[serde(default)]
    status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
    Login(LoginParams),
    Logout,
    Error { status: Option<u16> },
    Check,
    GetPermissions,
}

impl AuthRequest {
    pub fn from_kind(kind: &str, params: Value) -> Result<Self> {
        let request = match kind {
            "AUTH_LOGIN" => AuthRequest::Login(serde_json::from_value(params)?),
            "AUTH_LOGOUT" => AuthRequest::Logout,
            "AUTH_ERROR" => {
                let params: ErrorParams = if params.is_null() {
                    ErrorParams::default()
                } else {
                    serde_json::from_value(params)?
                };
                AuthRequest::Error {
                    status: params.status,
                }
            }
            "AUTH_CHECK" => AuthRequest::Check,
            "AUTH_GET_PERMISSIONS" => AuthRequest::GetPermissions,
            other => {
                return Err(ProviderError::UnsupportedRequest {
                    kind: other.to_string(),
                })
            }
        };
        Ok(request)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuthRequest::Login(_) => "AUTH_LOGIN",
            AuthRequest::Logout => "AUTH_LOGOUT",
            AuthRequest::Error { .. } => "AUTH_ERROR",
            AuthRequest::Check => "AUTH_CHECK",
            AuthRequest::GetPermissions => "AUTH_GET_PERMISSIONS",
        }
    }
}

pub struct AuthProvider<B, S, C> {
    backend: B,
    store: S,
    config: C,
    session: SessionState,
}

impl<B, S, C> AuthProvider<B, S, C>
where
    B: AuthBackend,
    S: KeyValueStore,
    C: ConfigProvider,
{
    pub fn new(backend: B, store: S, config: C) -> Self {
        Self {
            backend,
            store,
            config,
            session: SessionState::default(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs a raw request kind. Resolves to the permission for `AUTH_GET_PERMISSIONS`,
    /// `None` for everything else.
    pub async fn execute(&mut self, kind: &str, params: Value) -> Result<Option<String>> {
        let request = AuthRequest::from_kind(kind, params)?;
        self.handle(request).await
    }

    pub async fn handle(&mut self, request: AuthRequest) -> Result<Option<String>> {
        tracing::debug!("---> auth request {}", request.kind());

        match request {
            AuthRequest::Login(params) => self.login(params).await.map(|_| None),
            AuthRequest::Logout => self.logout().await.map(|_| None),
            AuthRequest::Error { status } => self.check_error(status).map(|_| None),
            AuthRequest::Check => self.check_session().await.map(|_| None),
            AuthRequest::GetPermissions => self.get_permissions().await,
        }
    }

    pub async fn login(&mut self, params: LoginParams) -> Result<()> {
        let mode = match params.mode.as_deref() {
            Some(name) => AuthMode::from_name(name, params.provider.as_deref())?,
            None => self.config.default_auth_mode(),
        };
        tracing::debug!("---> Login {} with {:?}", params.username, mode);

        let credentials = Credentials {
            username: params.username,
            password: params.password,
            mode,
        };
        let response = self.backend.authenticate(&credentials).await;
        self.validate_login(response).await
    }

    pub async fn logout(&mut self) -> Result<()> {
        self.session = SessionState::default();
        self.store.remove(&self.permission_key()).await
    }

    /// 401 and 403 from any call mean the session is gone.
    pub fn check_error(&mut self, status: Option<u16>) -> Result<()> {
        tracing::debug!("---> Checking for AUTH_ERROR: {:?}", status);
        match status {
            Some(status @ (401 | 403)) => {
                self.session.logged_in = false;
                Err(ProviderError::Unauthorized { status })
            }
            _ => Ok(()),
        }
    }

    pub async fn check_session(&mut self) -> Result<()> {
        let has_session = self.backend.is_authenticated()
            || self
                .store
                .get(&self.session_key())
                .await?
                .is_some_and(|id| !id.is_empty());

        if self.session.logged_in && has_session {
            tracing::debug!("---> Already logged-in and authenticated");
            return Ok(());
        }

        if has_session {
            tracing::debug!("---> Attempting to restore session");
            let response = self.backend.restore_session().await;
            return self.validate_login(response).await;
        }

        tracing::debug!("---> No session, login required");
        Err(ProviderError::NotAuthenticated)
    }

    pub async fn get_permissions(&mut self) -> Result<Option<String>> {
        let permission = self.store.get(&self.permission_key()).await?;
        tracing::debug!("---> Getting permission {:?}", permission);
        self.session.permission = permission.clone();
        Ok(permission)
    }

    async fn validate_login(&mut self, response: BackendResponse) -> Result<()> {
        let profile = match response.into_result() {
            Ok(profile) => profile,
            Err(e) => {
                tracing::debug!("---> Authentication rejected: {}", e);
                self.session.logged_in = false;
                return Err(e);
            }
        };

        self.session.logged_in = true;
        self.session.profile = Some(profile);

        match self.backend.get_attributes().await.into_result() {
            Ok(data) => {
                let permission = data
                    .get("attributes")
                    .and_then(|attributes| attributes.get(self.config.role_attribute()))
                    .and_then(attribute_to_string);

                let key = self.permission_key();
                match &permission {
                    Some(value) => self.store.set(&key, value).await?,
                    None => self.store.remove(&key).await?,
                }
                tracing::debug!(
                    "---> User permission from {} is {:?}",
                    self.config.role_attribute(),
                    permission
                );
                self.session.permission = permission;
            }
            Err(e) if matches!(e.status(), 401 | 403) => {
                tracing::debug!("---> Attribute read unauthorized: {}", e);
                self.session.logged_in = false;
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Could not read user attributes: {}", e);
            }
        }

        Ok(())
    }

    fn permission_key(&self) -> String {
        format!("{}.permission", self.config.wrapper_name())
    }

    fn session_key(&self) -> String {
        format!("{}.sessionId", self.config.wrapper_name())
    }
}

fn attribute_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
