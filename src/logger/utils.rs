#[cfg(any(feature = "settings", feature = "log_file"))]
use anyhow::Context;

#[cfg(feature = "settings")]
use crate::logger::settings;

#[cfg(feature = "settings")]
pub fn load_config(config_dir: &str, env: &str) -> anyhow::Result<()> {
    settings::load_global_config(config_dir, env)
        .with_context(|| format!("Error in loading config from dir: {}", config_dir))?;
    Ok(())
}

#[cfg(feature = "log_file")]
pub fn setup_logging(log4rs_file: &str) -> anyhow::Result<()> {
    log4rs::init_file(std::path::Path::new(log4rs_file), Default::default())
        .with_context(|| format!("Error in opening log config file: {}", log4rs_file))?;
    Ok(())
}
