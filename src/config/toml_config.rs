use crate::core::ConfigProvider;
use crate::domain::model::AuthMode;
use crate::utils::error::{ProviderError, Result};
use crate::utils::validation::{
    validate_min, validate_non_empty_string, validate_path, validate_required_field,
    validate_resource_names, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ROLE_ATTRIBUTE: &str = "react-admin-role";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Namespace for every local-store key (`<wrapper_name>.permission`).
    pub wrapper_name: String,
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_role_attribute")]
    pub role_attribute: String,
    #[serde(default = "default_auth_mode")]
    pub default_mode: String,
    #[serde(default)]
    pub external_provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub indexed_id_resources: Vec<String>,
    #[serde(default = "default_time_to_live")]
    pub default_time_to_live: i64,
    #[serde(default = "default_acl")]
    pub default_acl: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_role_attribute() -> String {
    DEFAULT_ROLE_ATTRIBUTE.to_string()
}

fn default_auth_mode() -> String {
    "email".to_string()
}

fn default_time_to_live() -> i64 {
    -1
}

fn default_acl() -> serde_json::Value {
    serde_json::json!({ "other": 1 })
}

fn default_storage_path() -> String {
    "./.bc-admin".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            role_attribute: default_role_attribute(),
            default_mode: default_auth_mode(),
            external_provider: None,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            indexed_id_resources: Vec::new(),
            default_time_to_live: default_time_to_live(),
            default_acl: default_acl(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl ProviderConfig {
    /// 以預設值建立配置，只需要 wrapper 名稱
    pub fn new(wrapper_name: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig {
                wrapper_name: wrapper_name.into(),
                verbose: false,
            },
            auth: AuthConfig::default(),
            data: DataConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    pub fn with_indexed_id_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data.indexed_id_resources = resources.into_iter().map(Into::into).collect();
        self
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProviderError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ProviderError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BC_WRAPPER})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ProviderError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("backend.wrapper_name", &self.backend.wrapper_name)?;
        validate_non_empty_string("auth.role_attribute", &self.auth.role_attribute)?;

        if self.auth.default_mode == "external" {
            validate_required_field("auth.external_provider", &self.auth.external_provider)?;
        }
        AuthMode::from_name(
            &self.auth.default_mode,
            self.auth.external_provider.as_deref(),
        )
        .map_err(|e| ProviderError::InvalidConfigValueError {
            field: "auth.default_mode".to_string(),
            value: self.auth.default_mode.clone(),
            reason: e.to_string(),
        })?;

        validate_resource_names("data.indexed_id_resources", &self.data.indexed_id_resources)?;
        validate_min("data.default_time_to_live", self.data.default_time_to_live, -1)?;
        if !self.data.default_acl.is_object() {
            return Err(ProviderError::InvalidConfigValueError {
                field: "data.default_acl".to_string(),
                value: self.data.default_acl.to_string(),
                reason: "ACL must be a table".to_string(),
            });
        }

        validate_path("storage.path", &self.storage.path)?;

        Ok(())
    }

    pub fn storage_path(&self) -> &str {
        &self.storage.path
    }

    pub fn verbose(&self) -> bool {
        self.backend.verbose
    }
}

impl ConfigProvider for ProviderConfig {
    fn wrapper_name(&self) -> &str {
        &self.backend.wrapper_name
    }

    fn role_attribute(&self) -> &str {
        &self.auth.role_attribute
    }

    fn default_auth_mode(&self) -> AuthMode {
        // validated configs always parse; fall back to email/password otherwise
        AuthMode::from_name(
            &self.auth.default_mode,
            self.auth.external_provider.as_deref(),
        )
        .unwrap_or(AuthMode::EmailPassword)
    }

    fn indexed_id_resources(&self) -> &[String] {
        &self.data.indexed_id_resources
    }

    fn default_time_to_live(&self) -> i64 {
        self.data.default_time_to_live
    }

    fn default_acl(&self) -> serde_json::Value {
        self.data.default_acl.clone()
    }
}

impl Validate for ProviderConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
