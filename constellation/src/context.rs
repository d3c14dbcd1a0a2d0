use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use constellation_core::{
    inventory::metal::{
        MetalInventory, MetalInventoryBuilder, METAL_API_URL_ENV_VAR, METAL_AUTH_TOKEN_ENV_VAR,
        METAL_PROJECT_ID_ENV_VAR,
    },
    spec::Constellation,
    store::VipStore,
};
use log::debug;

use crate::config::{CliConfig, DEFAULT_CONFIG_FILENAME};

pub const CONSTELLATION_HOME_ENV_VAR: &str = "CONSTELLATION_HOME";
pub const DEFAULT_CONFIG_DIR_NAME: &str = ".constellation";
pub const STATE_RELATIVE_FOLDER: &str = "state";

pub struct ConfigContext {
    config_dir: PathBuf,
    cli_config: CliConfig,
    constellation_override: Option<String>,
}

impl ConfigContext {
    pub fn new(config_dir: Option<&Path>, constellation: Option<&str>) -> anyhow::Result<Self> {
        let config_dir = match config_dir {
            Some(path) => path.to_owned(),
            None => std::env::var(CONSTELLATION_HOME_ENV_VAR)
                .map(PathBuf::from)
                .or_else(|_| {
                    home::home_dir()
                        .map(|d| d.join(DEFAULT_CONFIG_DIR_NAME))
                        .ok_or(anyhow!("Missing home dir!"))
                })?,
        };

        debug!("Used config directory: {config_dir:?}");

        let cli_config = CliConfig::load_or_create(&config_dir.join(DEFAULT_CONFIG_FILENAME))
            .context("Couldn't load the configuration file!")?;

        Ok(Self {
            config_dir,
            cli_config,
            constellation_override: constellation.map(str::to_owned),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn state_dir(&self) -> PathBuf {
        self.config_dir.join(STATE_RELATIVE_FOLDER)
    }

    pub fn cli_config(&self) -> &CliConfig {
        &self.cli_config
    }

    pub fn cli_config_mut(&mut self) -> &mut CliConfig {
        &mut self.cli_config
    }

    pub fn constellation_name(&self) -> anyhow::Result<&str> {
        self.constellation_override
            .as_deref()
            .or(self.cli_config.constellation.as_deref())
            .ok_or(anyhow!(
                "No constellation selected! Run `constellation use <name>` or pass --constellation!"
            ))
    }

    pub fn load_constellation(&self) -> anyhow::Result<Constellation> {
        let name = self.constellation_name()?;

        Constellation::load(&self.config_dir, name)
            .with_context(|| format!("Couldn't load the '{name}' constellation spec!"))
    }

    pub fn store(&self, constellation: &Constellation) -> VipStore {
        VipStore::new(&self.state_dir(), &constellation.name)
    }

    pub fn create_inventory(
        &self,
        project_id: Option<String>,
        api_url: Option<String>,
    ) -> anyhow::Result<MetalInventory> {
        let auth_token = std::env::var(METAL_AUTH_TOKEN_ENV_VAR)
            .with_context(|| format!("{METAL_AUTH_TOKEN_ENV_VAR} must be set!"))?;
        let project_id = match project_id {
            Some(project_id) => project_id,
            None => std::env::var(METAL_PROJECT_ID_ENV_VAR).with_context(|| {
                format!("Either --metal-project or {METAL_PROJECT_ID_ENV_VAR} must be set!")
            })?,
        };
        let api_url = api_url.or_else(|| std::env::var(METAL_API_URL_ENV_VAR).ok());

        let mut builder = MetalInventoryBuilder::default();
        builder.auth_token(auth_token).project_id(project_id);

        if let Some(api_url) = api_url {
            builder.api_url(api_url);
        }

        builder
            .build()
            .context("Couldn't configure the provider API client!")
    }
}
