use clap::{Parser, builder::BoolishValueParser};
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use catalog_core::catalog::HttpCatalogConfig;
use catalog_model::schema::DEFAULT_MAX_PAGE_SIZE;

const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4020";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "catalog-mcpd", version, about = "Catalog MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "CATALOG_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "CATALOG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long = "fixture", env = "CATALOG_FIXTURE_PATH")]
    fixture_path: Option<PathBuf>,

    #[arg(long, env = "CATALOG_MAX_PAGE_SIZE", default_value_t = DEFAULT_MAX_PAGE_SIZE)]
    max_page_size: usize,

    #[arg(
        long,
        env = "CATALOG_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    request_timeout_secs: u64,

    #[arg(
        long = "stdio",
        env = "CATALOG_ENABLE_STDIO",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(
        long,
        env = "CATALOG_MCP_SERVE",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    mcp_serve: bool,

    #[arg(long, env = "CATALOG_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(long = "log", env = "CATALOG_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
}

/// Where catalog operations are served from.
#[derive(Clone)]
pub enum CatalogBackend {
    /// Offline catalog seeded from a JSON fixture.
    Fixture(PathBuf),
    Remote(HttpCatalogConfig),
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone)]
pub struct CatalogConfig {
    pub backend: CatalogBackend,
    pub max_page_size: usize,
    pub enable_stdio: bool,
    pub mcp_serve: bool,
    pub mcp_http_addr: SocketAddr,
    pub log_filter: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
    NoTransport,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
            Self::NoTransport => {
                write!(f, "no transport enabled: set CATALOG_ENABLE_STDIO or CATALOG_MCP_SERVE")
            }
        }
    }
}

impl Error for ConfigError {}

impl CatalogConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl TryFrom<CliArgs> for CatalogConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_page_size == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "CATALOG_MAX_PAGE_SIZE",
                value: args.max_page_size.to_string(),
            });
        }
        if args.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "CATALOG_REQUEST_TIMEOUT_SECS",
                value: args.request_timeout_secs.to_string(),
            });
        }
        if !args.enable_stdio && !args.mcp_serve {
            return Err(ConfigError::NoTransport);
        }

        let fixture_path = args
            .fixture_path
            .filter(|path| !path.as_os_str().is_empty());
        let backend = if let Some(path) = fixture_path {
            CatalogBackend::Fixture(path)
        } else {
            let base_url =
                non_empty(args.base_url).ok_or(ConfigError::MissingSetting("CATALOG_BASE_URL"))?;
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(ConfigError::InvalidSetting {
                    name: "CATALOG_BASE_URL",
                    value: base_url,
                });
            }
            let api_key =
                non_empty(args.api_key).ok_or(ConfigError::MissingSetting("CATALOG_API_KEY"))?;
            CatalogBackend::Remote(
                HttpCatalogConfig::new(base_url, api_key)
                    .with_timeout(Duration::from_secs(args.request_timeout_secs)),
            )
        };

        Ok(Self {
            backend,
            max_page_size: args.max_page_size,
            enable_stdio: args.enable_stdio,
            mcp_serve: args.mcp_serve,
            mcp_http_addr: args.mcp_http_addr,
            log_filter: args.log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            base_url: Some("https://tenant.example.com".to_string()),
            api_key: Some("secret".to_string()),
            fixture_path: None,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            enable_stdio: false,
            mcp_serve: true,
            mcp_http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    #[test]
    fn remote_backend_carries_timeout() {
        let mut args = base_args();
        args.request_timeout_secs = 5;
        let config = CatalogConfig::try_from(args).expect("config should parse");
        match config.backend {
            CatalogBackend::Remote(remote) => {
                assert_eq!(remote.base_url, "https://tenant.example.com");
                assert_eq!(remote.timeout, Duration::from_secs(5));
            }
            CatalogBackend::Fixture(_) => panic!("expected remote backend"),
        }
    }

    #[test]
    fn fixture_path_skips_remote_credentials() {
        let mut args = base_args();
        args.base_url = None;
        args.api_key = None;
        args.fixture_path = Some(PathBuf::from("catalog.json"));
        let config = CatalogConfig::try_from(args).expect("config should parse");
        assert!(matches!(config.backend, CatalogBackend::Fixture(path) if path == PathBuf::from("catalog.json")));
    }

    #[test]
    fn remote_backend_requires_credentials() {
        let mut args = base_args();
        args.api_key = Some("  ".to_string());
        let err = CatalogConfig::try_from(args).err().expect("missing key");
        assert_eq!(err, ConfigError::MissingSetting("CATALOG_API_KEY"));

        let mut args = base_args();
        args.base_url = Some("tenant.example.com".to_string());
        let err = CatalogConfig::try_from(args).err().expect("bad url");
        assert!(matches!(err, ConfigError::InvalidSetting { name: "CATALOG_BASE_URL", .. }));
    }

    #[test]
    fn rejects_zero_limits_and_missing_transports() {
        let mut args = base_args();
        args.max_page_size = 0;
        assert!(CatalogConfig::try_from(args).is_err());

        let mut args = base_args();
        args.mcp_serve = false;
        let err = CatalogConfig::try_from(args).err().expect("no transport");
        assert_eq!(err, ConfigError::NoTransport);
    }
}
