// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::load_config::{find_in_parent, resolve_config_path};
use crate::paths_engine::{PathsEngine, DEFAULT_CONFIG_NAME};
use alloy_primitives::Address;
use anyhow::{anyhow, bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, path::PathBuf, time::Duration};
use tracing::debug;

pub const ENV_PREFIX: &str = "CIPHERBATCH_";

/// Settings for the local oracle that stands in for the external decryption service
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    /// Secret mixed into every attestation
    pub attestation_secret: String,
    /// How long the relay waits before answering a decryption request
    pub relay_delay_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            attestation_secret: String::from("cipherbatch-local-oracle"),
            relay_delay_ms: 0,
        }
    }
}

/// One ledger deployment within the unscoped configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct NodeDefinition {
    /// Identity of this ledger. Bound into every integrity digest.
    pub address: Address,
    /// Account allowed to apply corrections. Also authorized for everything else.
    pub owner: Option<Address>,
    /// Accounts allowed to open, close, submit and reveal
    pub submitters: Vec<Address>,
    /// Reject every guarded operation while set
    pub paused: bool,
    /// Minimum seconds between two guarded calls by the same caller
    pub cooldown_secs: u64,
    /// The name for the database
    pub db_file: PathBuf,
    /// Override the data dir which defaults to the OS local data dir
    pub data_dir: PathBuf,
    /// Keep everything in memory. Nothing survives the process.
    pub in_mem: bool,
    pub oracle: OracleConfig,
    /// Where completed reveals are appended as json lines
    pub reveal_write_path: Option<PathBuf>,
}

impl Default for NodeDefinition {
    fn default() -> Self {
        Self {
            address: Address::ZERO,
            owner: None,
            submitters: vec![],
            paused: false,
            cooldown_secs: 0,
            db_file: PathBuf::from("db"),
            data_dir: PathBuf::new(),
            in_mem: false,
            oracle: OracleConfig::default(),
            reveal_write_path: None,
        }
    }
}

/// The config actually used throughout the app
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    name: String,
    node: NodeDefinition,
    paths: PathsEngine,
    /// Open Telemetry collector grpc endpoint. Eg. 127.0.0.1:4317
    otel: Option<String>,
}

impl AppConfig {
    pub fn try_from_unscoped(
        name: &str,
        config: UnscopedAppConfig,
        default_data_dir: &PathBuf,
        default_config_dir: &PathBuf,
        cwd: &PathBuf,
    ) -> Result<Self> {
        let mut nodes = config.nodes;

        if nodes.contains_key("_default") {
            bail!("Cannot use the `_default` node profile name as it is a reserved node name. In order to configure the _default profile use the `node` key in your yaml configuration.");
        }

        nodes.insert("_default".to_string(), config.node);

        let Some(node) = nodes.remove(name) else {
            bail!("Could not find node definition for node '{}'. Did you forget to include it in your configuration?", name);
        };

        let data_dir_override = (node.data_dir != PathBuf::new())
            .then_some(&node.data_dir)
            .or(config.data_dir.as_ref());

        let paths = PathsEngine::new(
            name,
            cwd,
            default_data_dir,
            default_config_dir,
            config.found_config_file.as_ref(),
            data_dir_override,
            Some(&node.db_file),
        );

        Ok(AppConfig {
            name: name.to_owned(),
            node,
            paths,
            otel: config.otel,
        })
    }

    pub fn name(&self) -> String {
        self.name.clone()
    }

    pub fn db_file(&self) -> PathBuf {
        self.paths.db_file()
    }

    pub fn config_file(&self) -> PathBuf {
        self.paths.config_file()
    }

    pub fn use_in_mem_store(&self) -> bool {
        self.node.in_mem
    }

    pub fn otel(&self) -> Option<String> {
        self.otel.clone()
    }

    /// Identity of this ledger deployment
    pub fn address(&self) -> Address {
        self.node.address
    }

    pub fn owner(&self) -> Option<Address> {
        self.node.owner
    }

    pub fn submitters(&self) -> &[Address] {
        &self.node.submitters
    }

    pub fn paused(&self) -> bool {
        self.node.paused
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.node.cooldown_secs)
    }

    pub fn oracle(&self) -> &OracleConfig {
        &self.node.oracle
    }

    /// Caller used when the cli gets no explicit `--as`
    pub fn default_caller(&self) -> Result<Address> {
        self.owner()
            .or_else(|| self.submitters().first().copied())
            .ok_or_else(|| anyhow!("No owner or submitter configured for node '{}'", self.name))
    }

    /// Relative write paths resolve against the config file location
    pub fn reveal_write_path(&self) -> Option<PathBuf> {
        self.node
            .reveal_write_path
            .as_ref()
            .map(|p| self.paths.relative_to_config(p))
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UnscopedAppConfig {
    /// The data dir which defaults to the OS local data dir
    data_dir: Option<PathBuf>,
    /// Set by the loader to the resolved config file. Not meant to be configured.
    found_config_file: Option<PathBuf>,
    /// The node used when no `--name` is given
    node: NodeDefinition,
    /// Additional named nodes
    nodes: HashMap<String, NodeDefinition>,
    otel: Option<String>,
}

impl UnscopedAppConfig {
    /// Scope using OS based default directories
    pub fn into_scoped(self, name: &str) -> Result<AppConfig> {
        AppConfig::try_from_unscoped(
            name,
            self,
            &OsDirs::data_dir()?,
            &OsDirs::config_dir()?,
            &env::current_dir()?,
        )
    }

    /// Scope with injected default directories
    pub fn into_scoped_with_defaults(
        self,
        name: &str,
        default_data_dir: &PathBuf,
        default_config_dir: &PathBuf,
        cwd: &PathBuf,
    ) -> Result<AppConfig> {
        AppConfig::try_from_unscoped(name, self, default_data_dir, default_config_dir, cwd)
    }
}

/// Values from the cli that take precedence over everything else
#[derive(Default, Serialize, Deserialize, Clone, Debug)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    otel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    found_config_file: Option<PathBuf>,
}

/// Load the config at `config_file` or at the resolved default location.
///
/// Layers in increasing precedence: defaults, yaml file, `CIPHERBATCH_` environment variables
/// (`__` separates nesting, eg. `CIPHERBATCH_NODE__PAUSED=true`), cli overrides. An explicitly
/// passed file must exist. A missing default file just means defaults.
pub fn load_config(
    name: &str,
    config_file: Option<String>,
    otel: Option<String>,
) -> Result<AppConfig> {
    let explicit = config_file.is_some();
    let resolved_config_path = resolve_config_path(
        find_in_parent,
        env::current_dir()?,
        OsDirs::config_dir()?,
        DEFAULT_CONFIG_NAME,
        config_file.map(PathBuf::from),
    );

    if explicit && !resolved_config_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{}", resolved_config_path.display()),
        ))
        .context("Configuration file not found");
    }
    debug!("loading configuration from {:?}", resolved_config_path);

    let found_config_file = resolved_config_path
        .exists()
        .then(|| resolved_config_path.clone());

    let config: UnscopedAppConfig =
        Figment::from(Serialized::defaults(&UnscopedAppConfig::default()))
            .merge(Yaml::file(&resolved_config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(&CliOverrides {
                otel,
                found_config_file,
            }))
            .extract()
            .context("Could not parse configuration")?;

    config
        .into_scoped(name)
        .with_context(|| format!("Could not apply scope '{}' to configuration.", name))
}

pub struct OsDirs;
impl OsDirs {
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| anyhow!("cipherbatch may only be run on an OS that can provide a config dir. See https://docs.rs/dirs for more information."))?
            .join("cipherbatch"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        Ok(dirs::data_local_dir()
            .ok_or_else(|| anyhow!("cipherbatch may only be run on an OS that can provide a data dir. See https://docs.rs/dirs for more information."))?
            .join("cipherbatch"))
    }
}
