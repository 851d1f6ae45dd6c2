use anyhow::Context;
use config::{Config, File, FileFormat};
#[allow(unused_imports)]
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use serde::Deserialize;

lazy_static! {
    pub static ref SETTINGS: RwLock<Config> = RwLock::new(Config::default());
}

pub fn settings() -> &'static RwLock<Config> {
    &*SETTINGS
}

/// The `access_log` section of the service config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessLogSettings {
    /// Template string, e.g. `":method :path - :status-code in :duration"`.
    /// Absent means the sink fires without a message.
    pub format: Option<String>,
    /// Switches the standard token set from the iso-time variant to the
    /// content-type/content-length variant.
    #[serde(default)]
    pub content_headers: bool,
}

pub fn access_log_settings() -> AccessLogSettings {
    settings()
        .read()
        .get::<AccessLogSettings>("access_log")
        .unwrap_or_default()
}

pub fn load_global_config(base_dir: &str, env: &str) -> anyhow::Result<()> {
    let mut write_guard = settings().write();

    let mut builder = Config::builder();
    let default_config_file = format!("{}/service-default.yml", base_dir);
    builder = builder.add_source(File::new(&default_config_file, FileFormat::Yaml));

    let env_config_file = format!("{}/service-{}.yml", base_dir, env);
    builder = builder.add_source(File::new(&env_config_file, FileFormat::Yaml));

    let config = builder.build()
        .with_context(|| format!("Error in loading config from dir: {} for env: {}", base_dir, env))?;

    *write_guard = config;

    Ok(())
}
