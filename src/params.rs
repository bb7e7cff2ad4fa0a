//! Process wide parameters.
//!
//! Constants live at module level, tunable values are collected in [`Configurables`] and
//! read once from the environment on first access.

use std::sync::OnceLock;
use std::time::Duration;

use log::warn;

/// Environment variable names
pub mod env {
    pub const DATABASE_URL: &str = "DBFUNC_DATABASE_URL";
    pub const SCHEMA: &str = "DBFUNC_SCHEMA";
    pub const OBJECT_QUALIFIER: &str = "DBFUNC_OBJECT_QUALIFIER";
    pub const MAX_CONNECTIONS: &str = "DBFUNC_MAX_CONNECTIONS";
    pub const ACQUIRE_TIMEOUT_SECS: &str = "DBFUNC_ACQUIRE_TIMEOUT_SECS";
    pub const EXPAND_ENTITIES: &str = "DBFUNC_EXPAND_ENTITIES";
}

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct Configurables {
    pub database_url: Option<String>,
    /// Schema of generic commands, `None` uses the connection search path
    pub schema: Option<String>,
    /// Prefix prepended to every generic command name
    pub object_qualifier: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Expand entity arguments into one parameter per field
    pub expand_entities: bool,
}

impl Default for Configurables {
    fn default() -> Self {
        Self {
            database_url: None,
            schema: None,
            object_qualifier: String::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            expand_entities: false,
        }
    }
}

impl Configurables {
    /// Builds the configurables from a variable lookup function, unset or malformed
    /// variables fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            database_url: non_empty(env::DATABASE_URL),
            schema: non_empty(env::SCHEMA),
            object_qualifier: non_empty(env::OBJECT_QUALIFIER).unwrap_or_default(),
            max_connections: parse_or(
                env::MAX_CONNECTIONS,
                non_empty(env::MAX_CONNECTIONS),
                default.max_connections,
            ),
            acquire_timeout: Duration::from_secs(parse_or(
                env::ACQUIRE_TIMEOUT_SECS,
                non_empty(env::ACQUIRE_TIMEOUT_SECS),
                default.acquire_timeout.as_secs(),
            )),
            expand_entities: parse_or(
                env::EXPAND_ENTITIES,
                non_empty(env::EXPAND_ENTITIES),
                default.expand_entities,
            ),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            warn!("invalid value `{}` for {}, using default", v, key);
            default
        }),
        None => default,
    }
}

static CONFIGURABLES: OnceLock<Configurables> = OnceLock::new();

/// Returns the process configurables, reading them from the environment on first call.
pub fn configurables() -> &'static Configurables {
    CONFIGURABLES.get_or_init(Configurables::from_env)
}

/// Installs explicit configurables. Returns `false` if they were already initialized.
pub fn init_configurables(c: Configurables) -> bool {
    CONFIGURABLES.set(c).is_ok()
}
