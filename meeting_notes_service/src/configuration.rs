use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub gemini: GeminiSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Where uploaded meeting files are buffered while a request is processed
    pub upload_directory: PathBuf,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_upload_bytes: usize,
}

/// Settings of the Gemini completion API
#[derive(Debug, Deserialize, Clone)]
pub struct GeminiSettings {
    /// Not required to start the server: requests fail until a key is configured
    #[serde(default)]
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub base_url: String,
}

impl GeminiSettings {
    /// The configured API key, an empty value counting as no key at all
    pub fn api_key(&self) -> Option<Secret<String>> {
        self.api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .cloned()
    }
}

/// Extracts app settings from configuration files and env variables
///
/// `base.yaml` should contain shared settings for all environments.
/// A specific env file should be created for each environment: `local.yaml` and `production.yaml`
/// The environment is set with the env var `APP_ENVIRONMENT`.
/// If `APP_ENVIRONMENT` is not set, `local.yaml` is the default.
///
/// Settings are also taken from environment variables: with a prefix of APP and '__' as separator
/// For ex: `APP_APPLICATION__PORT=5001` would set `Settings.application.port`
///
/// Finally, the usual `PORT` and `GEMINI_API_KEY` variables override everything else.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|error| config::ConfigError::Foreign(Box::new(error)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("application.port", std::env::var("PORT").ok())?
        .set_override_option("gemini.api_key", std::env::var("GEMINI_API_KEY").ok())?
        .build()?;

    settings.try_deserialize::<Settings>()
}

/// The possible runtime environment for our application.
#[derive(Debug, PartialEq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
