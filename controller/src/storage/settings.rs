//! Settings file management

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Controller settings, read once from `settings.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Emit JSON logs on stdout
    #[serde(default)]
    pub json_logs: bool,

    /// Selects the production endpoint set
    #[serde(default)]
    pub production: bool,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Collaborator endpoints per environment
    #[serde(default)]
    pub endpoints: EndpointSets,

    /// Facilities the controller may deploy to
    #[serde(default = "default_facilities")]
    pub facilities: Vec<String>,

    /// OS variants merged for multi-variant releases, lowest priority first
    #[serde(default = "default_os_variants")]
    pub os_variants: Vec<String>,

    /// Number of deployment workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Task record time-to-live in seconds
    #[serde(default = "default_task_ttl")]
    pub task_ttl_secs: u64,

    /// Delay before a finished task's scratch directory is removed
    #[serde(default = "default_cleanup_delay")]
    pub cleanup_delay_secs: u64,

    /// Age after which an abandoned scratch directory is swept
    #[serde(default = "default_orphan_max_age")]
    pub orphan_max_age_secs: u64,

    /// Interval between orphan sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Users allowed to register components without provisioning
    #[serde(default)]
    pub admin_users: Vec<String>,

    /// Logbook credentials
    #[serde(default)]
    pub logbook: LogbookSettings,
}

fn default_facilities() -> Vec<String> {
    vec!["LCLS".to_string(), "FACET".to_string(), "TESTFAC".to_string()]
}

fn default_os_variants() -> Vec<String> {
    vec!["rhel7".to_string(), "rocky9".to_string()]
}

fn default_workers() -> usize {
    4
}

fn default_task_ttl() -> u64 {
    300
}

fn default_cleanup_delay() -> u64 {
    60
}

fn default_orphan_max_age() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_dir: None,
            json_logs: false,
            production: false,
            server: ServerSettings::default(),
            endpoints: EndpointSets::default(),
            facilities: default_facilities(),
            os_variants: default_os_variants(),
            workers: default_workers(),
            task_ttl_secs: default_task_ttl(),
            cleanup_delay_secs: default_cleanup_delay(),
            orphan_max_age_secs: default_orphan_max_age(),
            sweep_interval_secs: default_sweep_interval(),
            admin_users: Vec::new(),
            logbook: LogbookSettings::default(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Endpoints for one environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    pub registry_url: String,
    pub logbook_url: String,
    pub release_url: String,
    pub playbook_root: String,
}

/// Production and development endpoint sets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSets {
    #[serde(default = "default_production_endpoints")]
    pub production: Endpoints,

    #[serde(default = "default_development_endpoints")]
    pub development: Endpoints,
}

fn default_production_endpoints() -> Endpoints {
    Endpoints {
        registry_url: "https://registry.controls.local/api/v1".to_string(),
        logbook_url: "https://logbook.controls.local/api".to_string(),
        release_url: "https://releases.controls.local".to_string(),
        playbook_root: "/opt/deployctl/playbooks".to_string(),
    }
}

fn default_development_endpoints() -> Endpoints {
    Endpoints {
        registry_url: "http://localhost:8001/api/v1".to_string(),
        logbook_url: "http://localhost:8002/api".to_string(),
        release_url: "http://localhost:8003".to_string(),
        playbook_root: "./playbooks".to_string(),
    }
}

impl Default for EndpointSets {
    fn default() -> Self {
        Self {
            production: default_production_endpoints(),
            development: default_development_endpoints(),
        }
    }
}

impl EndpointSets {
    /// Pick the endpoint set for the environment
    pub fn select(&self, production: bool) -> &Endpoints {
        if production {
            &self.production
        } else {
            &self.development
        }
    }
}

/// Logbook credentials as they appear in the settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogbookSettings {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}
