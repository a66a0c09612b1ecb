//! Run configuration.
//!
//! Connection and mail parameters come from a flat `config.properties` file
//! located under the deployment root. The root itself is resolved from the
//! environment through [`EnvConfig`].
//!
//! ```text
//! # <root>/config/config.properties
//! dw.hostname=sqlprod01
//! dw.port=1433
//! mail.server=smtp.example.com
//! mail.server.port=587
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

#[cfg(windows)]
pub const DEFAULT_ROOT_DIR: &str = r"C:\Projects\ETL\bi-hospitalar-etl";
#[cfg(not(windows))]
pub const DEFAULT_ROOT_DIR: &str = "/opt/bi-hospitalar-etl";

/// File name of the transient report written under the root directory.
pub const REPORT_FILE_NAME: &str = "Relatorio_Erros.txt";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("missing required config keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("environment error: {0}")]
    Environment(#[from] config::ConfigError),
}

pub trait EnvConfig: Sized {
    fn from_env() -> Result<Self, config::ConfigError>;
    fn from_env_with_prefix(prefix: &str) -> Result<Self, config::ConfigError>;
}

impl<D> EnvConfig for D
where
    D: DeserializeOwned,
{
    fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix(prefix))
            .build()?
            .try_deserialize()
    }
}

/// Process environment consulted at startup.
#[derive(Debug, Default, Deserialize)]
pub struct Environment {
    /// `ROOT_DIR`
    pub root_dir: Option<PathBuf>,
}

impl Environment {
    /// Root directory, falling back to [`DEFAULT_ROOT_DIR`].
    pub fn root_dir(&self) -> PathBuf {
        self.root_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR))
    }
}

/// `<root>/config/config.properties`
pub fn properties_path(root: &Path) -> PathBuf {
    root.join("config").join("config.properties")
}

/// `<root>/Relatorio_Erros.txt`
pub fn report_path(root: &Path) -> PathBuf {
    root.join(REPORT_FILE_NAME)
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

/// Flat `key=value` mapping read from a properties file.
///
/// Blank lines, `#` comments and lines without `=` are skipped. The first `=`
/// splits key from value, both are trimmed, and later keys overwrite earlier
/// ones. Values are never coerced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(HashMap<String, String>);

impl Properties {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let props = Self::parse(&content);
        tracing::debug!(path = %path.display(), keys = props.len(), "loaded properties");
        Ok(props)
    }

    pub fn parse(content: &str) -> Self {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Properties(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// -------------------------------------------------------------------------
// Typed settings
// -------------------------------------------------------------------------

/// Connection parameters for one SQL Server database.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Transport security used for the SMTP relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    #[default]
    StartTls,
    Tls,
    None,
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "tls" => Ok(Self::Tls),
            "none" => Ok(Self::None),
            other => Err(format!("unknown TLS mode `{other}` (expected starttls, tls or none)")),
        }
    }
}

/// SMTP relay and addressing.
#[derive(Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    /// Sender address, also used as the SMTP login.
    pub sender: String,
    pub password: String,
    pub recipients: Vec<String>,
    pub tls: TlsMode,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &"***")
            .field("recipients", &self.recipients)
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Everything a run needs, validated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `dw.*`, the warehouse that also hosts the orchestration catalog.
    pub warehouse: DbConfig,
    /// `sa.*`, present only when `sa.hostname` is set.
    pub staging: Option<DbConfig>,
    pub mail: MailConfig,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_properties(&Properties::load(path)?)
    }

    /// Reports every missing key at once rather than the first one found.
    pub fn from_properties(props: &Properties) -> Result<Self, ConfigError> {
        let mut fields = Fields::new(props);

        let warehouse = fields.database("dw");
        let staging = if props.contains("sa.hostname") {
            Some(fields.database("sa"))
        } else {
            None
        };

        let recipient_key = if props.contains("mail.addr.destination") {
            "mail.addr.destination"
        } else {
            "mail.recipient"
        };
        let recipients: Vec<String> = fields
            .required(recipient_key)
            .split([',', ';'])
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(String::from)
            .collect();
        if recipients.is_empty() && props.contains(recipient_key) {
            fields.invalid(recipient_key, "no recipient address given");
        }

        let mail = MailConfig {
            host: fields.required("mail.server"),
            port: fields.parsed("mail.server.port"),
            sender: fields.required("mail.addr.sender"),
            password: fields.required("mail.server.password"),
            recipients,
            tls: fields.optional("mail.server.tls").unwrap_or_default(),
            timeout: fields
                .optional::<u64>("mail.server.timeout")
                .map(Duration::from_secs),
        };

        fields.finish()?;
        Ok(Settings {
            warehouse,
            staging,
            mail,
        })
    }
}

/// Accumulates lookup failures while settings are assembled.
struct Fields<'a> {
    props: &'a Properties,
    missing: Vec<String>,
    invalid: Option<ConfigError>,
}

impl<'a> Fields<'a> {
    fn new(props: &'a Properties) -> Self {
        Self {
            props,
            missing: Vec::new(),
            invalid: None,
        }
    }

    fn required(&mut self, key: &str) -> String {
        match self.props.get(key) {
            Some(value) => value.to_string(),
            None => {
                self.missing.push(key.to_string());
                String::new()
            }
        }
    }

    fn parsed<T>(&mut self, key: &str) -> T
    where
        T: FromStr + Default,
        T::Err: fmt::Display,
    {
        let props = self.props;
        match props.get(key) {
            Some(raw) => self.convert(key, raw).unwrap_or_default(),
            None => {
                self.missing.push(key.to_string());
                T::default()
            }
        }
    }

    fn optional<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let props = self.props;
        let raw = props.get(key)?;
        self.convert(key, raw)
    }

    fn convert<T>(&mut self, key: &str, raw: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match raw.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                self.invalid(key, &format!("`{raw}`: {e}"));
                None
            }
        }
    }

    fn invalid(&mut self, key: &str, reason: &str) {
        if self.invalid.is_none() {
            self.invalid = Some(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: reason.to_string(),
            });
        }
    }

    fn database(&mut self, prefix: &str) -> DbConfig {
        DbConfig {
            host: self.required(&format!("{prefix}.hostname")),
            port: self.parsed(&format!("{prefix}.port")),
            database: self.required(&format!("{prefix}.database")),
            username: self.required(&format!("{prefix}.username")),
            password: self.required(&format!("{prefix}.password")),
        }
    }

    fn finish(self) -> Result<(), ConfigError> {
        if !self.missing.is_empty() {
            return Err(ConfigError::MissingKeys(self.missing));
        }
        match self.invalid {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
