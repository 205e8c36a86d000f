pub mod api;
pub mod deploy;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod signature;
pub mod webhook;

use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use deploy::DeploySettings;
use error::{HookError, Result};
use hooks::CompletionProvider;

const DEFAULT_HOOK_API_BIND_ADDRESS: &str = "0.0.0.0:8000";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SYSTEM_PROMPT_PATH: &str = "linkedin_hook_system_prompt.md";
const DEFAULT_CORS_ORIGIN_REGEX: &str = r"^http://localhost(:[0-9]+)?$";

/// Configuration of the hook generation service, read once at startup.
#[derive(Debug)]
pub struct HookApiConfig {
    pub bind_address: String,
    pub api_key: SecretString,
    pub openai_api_key: SecretString,
    pub openai_base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub cors_origins: Regex,
}

impl HookApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from a variable lookup. Missing keys, an unreadable or
    /// empty system prompt and a broken CORS pattern are all fatal.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required_secret(&var, "API_KEY")?;
        let openai_api_key = required_secret(&var, "OPENAI_API_KEY")?;

        let prompt_path =
            var("SYSTEM_PROMPT_PATH").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT_PATH.to_string());
        let system_prompt = load_system_prompt(Path::new(&prompt_path))?;

        let pattern =
            var("CORS_ORIGIN_REGEX").unwrap_or_else(|| DEFAULT_CORS_ORIGIN_REGEX.to_string());
        let cors_origins = Regex::new(&pattern).map_err(|e| {
            HookError::Config(format!("Invalid CORS_ORIGIN_REGEX '{}': {}", pattern, e))
        })?;

        Ok(Self {
            bind_address: var("HOOK_API_BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_HOOK_API_BIND_ADDRESS.to_string()),
            api_key,
            openai_api_key,
            openai_base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            system_prompt,
            cors_origins,
        })
    }
}

/// Reads and trims the system prompt file.
pub fn load_system_prompt(path: &Path) -> Result<String> {
    let prompt = std::fs::read_to_string(path).map_err(|e| {
        HookError::Config(format!(
            "Failed to read system prompt '{}': {}",
            path.display(),
            e
        ))
    })?;
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(HookError::Config(format!(
            "System prompt '{}' is empty",
            path.display()
        )));
    }
    Ok(prompt.to_string())
}

fn required_secret<F>(var: &F, key: &str) -> Result<SecretString>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) if !value.is_empty() => Ok(SecretString::new(value)),
        _ => Err(HookError::Config(format!("{} is not set", key))),
    }
}

/// Non-secret webhook receiver settings, from the TOML config file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReceiverSettings {
    pub bind_address: String,
    pub deploy_script: PathBuf,
    /// Empty means the script is executed directly
    pub interpreter: String,
    pub timeout_secs: u64,
    pub main_ref: String,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9001".to_string(),
            deploy_script: PathBuf::from("/var/www/mrcomment_api/deploy.sh"),
            interpreter: "bash".to_string(),
            timeout_secs: 120,
            main_ref: "refs/heads/main".to_string(),
        }
    }
}

/// Load and parse the receiver settings file. A missing file yields the defaults.
pub fn load_receiver_settings(path: &Path) -> Result<ReceiverSettings> {
    if !path.exists() {
        return Ok(ReceiverSettings::default());
    }
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        HookError::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let settings: ReceiverSettings = toml::from_str(&config_str).map_err(|e| {
        HookError::Config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    if settings.timeout_secs == 0 {
        return Err(HookError::Config("timeout_secs must be greater than 0".into()));
    }
    Ok(settings)
}

/// Configuration of the webhook receiver, read once at startup.
#[derive(Debug)]
pub struct ReceiverConfig {
    pub settings: ReceiverSettings,
    pub webhook_secret: SecretString,
}

impl ReceiverConfig {
    pub fn from_env(config_path: &Path) -> Result<Self> {
        Self::from_vars(config_path, |key| std::env::var(key).ok())
    }

    /// The secret comes only from `GITHUB_WEBHOOK_SECRET`; the receiver refuses
    /// to start without it.
    pub fn from_vars<F>(config_path: &Path, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let webhook_secret = required_secret(&var, "GITHUB_WEBHOOK_SECRET")?;
        let mut settings = load_receiver_settings(config_path)?;
        if let Some(bind_address) = var("BIND_ADDRESS") {
            settings.bind_address = bind_address;
        }
        if let Some(script) = var("DEPLOY_SCRIPT_PATH") {
            settings.deploy_script = PathBuf::from(script);
        }
        Ok(Self {
            settings,
            webhook_secret,
        })
    }

    pub fn deploy_settings(&self) -> DeploySettings {
        let interpreter = Some(self.settings.interpreter.trim())
            .filter(|i| !i.is_empty())
            .map(str::to_string);
        DeploySettings {
            script: self.settings.deploy_script.clone(),
            interpreter,
            timeout: Duration::from_secs(self.settings.timeout_secs),
        }
    }
}

pub struct HookApiState {
    pub config: HookApiConfig,
    pub provider: Arc<dyn CompletionProvider>,
}

pub type SharedHookApiState = Arc<HookApiState>;

pub struct ReceiverState {
    pub config: ReceiverConfig,
    pub deploy: DeploySettings,
}

impl ReceiverState {
    pub fn new(config: ReceiverConfig) -> Self {
        let deploy = config.deploy_settings();
        Self { config, deploy }
    }
}

pub type SharedReceiverState = Arc<ReceiverState>;
