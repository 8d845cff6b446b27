use std::path::Path;

use crate::config::SimConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads simulation configuration by merging defaults, a TOML file and
    /// `WAGER_`-prefixed environment variables (nested keys split on `__`).
    ///
    /// A missing file is not an error; the defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the merged
    /// configuration fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<SimConfig> {
        let path = path.as_ref();
        let config: SimConfig = Self::base()
            .merge(Toml::file(path))
            .merge(Env::prefixed("WAGER_").split("__"))
            .extract()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration with a profile overlay: `Sim.toml`, then
    /// `Sim.<profile>.toml` next to it, then the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the merged
    /// configuration fails validation.
    pub fn load_with_profile(path: impl AsRef<Path>, profile: &str) -> Result<SimConfig> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Sim");
        let profile_path = path.with_file_name(format!("{stem}.{profile}.toml"));

        let config: SimConfig = Self::base()
            .merge(Toml::file(path))
            .merge(Toml::file(&profile_path))
            .merge(Env::prefixed("WAGER_").split("__"))
            .extract()
            .with_context(|| {
                format!(
                    "Failed to read configuration from {} with profile {profile}",
                    path.display()
                )
            })?;

        config.validate()?;
        Ok(config)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(SimConfig::default()))
    }
}
