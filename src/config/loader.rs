use crate::config::schema::{DashboardConfig, OutputConfig};
use crate::error::{Error, Result};
use crate::output::{
    console::ConsoleOutput, csv::CsvOutput, json::JsonOutput, sqlite::SqliteOutput, OutputHandler,
};
use crate::poller::Poller;
use crate::rpc::JsonRpcClient;
use crate::sampler::ChainSampler;
use config::{Config, Environment};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use validator::Validate;

pub const ENV_PREFIX: &str = "MONASCOPE";

type Table = Map<String, Value>;

/// Settings that may be overridden from `MONASCOPE_*` environment variables.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    rpc_url: Option<String>,
    poll_interval_ms: Option<u64>,
    window_size: Option<u64>,
    concurrency: Option<usize>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DashboardConfig> {
        let config = Self::load_resolved(path.as_ref())?;
        Self::finish(config, Environment::with_prefix(ENV_PREFIX))
    }

    /// Built-in defaults plus environment overrides, for running without a file.
    pub fn load_default() -> Result<DashboardConfig> {
        Self::finish(DashboardConfig::default(), Environment::with_prefix(ENV_PREFIX))
    }

    fn finish(config: DashboardConfig, env: Environment) -> Result<DashboardConfig> {
        let config = Self::apply_env(config, env)?;
        config.validate().map_err(Error::Validation)?;
        Ok(config)
    }

    /// Resolves the `extends` chain and deserializes the merged keys.
    fn load_resolved(path: &Path) -> Result<DashboardConfig> {
        let mut visited = HashSet::new();
        let mut table = Self::load_with_inheritance(path, &mut visited)?;
        table.remove("extends");
        Ok(serde_json::from_value(Value::Object(table))?)
    }

    fn load_with_inheritance(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<Table> {
        let path = fs::canonicalize(path).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;

        if !visited.insert(path.clone()) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }

        let table = Self::load_file(&path)?;

        let parent_path_str = match table.get("extends") {
            None | Some(Value::Null) => return Ok(table),
            Some(Value::String(parent)) => parent.clone(),
            Some(other) => {
                return Err(Error::Config(format!(
                    "{}: extends must be a path, got {}",
                    path.display(),
                    other
                )));
            }
        };

        let parent_path = path
            .parent()
            .ok_or_else(|| Error::Config(format!(
                "Cannot determine parent directory for {}",
                path.display()
            )))?
            .join(parent_path_str);

        let parent_table = Self::load_with_inheritance(&parent_path, visited)?;
        Ok(Self::merge_tables(parent_table, table))
    }

    fn load_file(path: &Path) -> Result<Table> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        let value: Value = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(Error::Config(format!(
                    "Unsupported file extension: {}",
                    path.display()
                )));
            }
        };

        match value {
            Value::Object(table) => Ok(table),
            Value::Null => Ok(Table::new()),
            _ => Err(Error::Config(format!(
                "{}: top level must be a mapping",
                path.display()
            ))),
        }
    }

    /// Keys present in the child replace the parent's, whatever their value.
    fn merge_tables(mut parent: Table, child: Table) -> Table {
        for (key, value) in child {
            parent.insert(key, value);
        }
        parent
    }

    fn apply_env(mut config: DashboardConfig, env: Environment) -> Result<DashboardConfig> {
        let overrides: EnvOverrides = Config::builder()
            .add_source(env.try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(format!("environment: {}", e)))?;

        if let Some(rpc_url) = overrides.rpc_url {
            log::debug!("rpc_url overridden from environment");
            config.rpc_url = rpc_url;
        }
        if let Some(interval) = overrides.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(window_size) = overrides.window_size {
            config.window_size = window_size;
        }
        if let Some(concurrency) = overrides.concurrency {
            config.concurrency = concurrency;
        }
        Ok(config)
    }

    pub fn create_sampler(config: &DashboardConfig) -> Result<ChainSampler> {
        let client = JsonRpcClient::new(&config.rpc_url, config.request_timeout())?;
        Ok(ChainSampler::new(
            Arc::new(client),
            config.sampler_options(),
            None,
        ))
    }

    pub fn create_poller(config: &DashboardConfig) -> Result<Poller> {
        let sampler = Self::create_sampler(config)?;
        Ok(Poller::new(sampler, config.poll_interval()))
    }

    pub async fn create_output(
        config: &DashboardConfig,
        multi: Option<Arc<indicatif::MultiProgress>>,
    ) -> Result<Box<dyn OutputHandler>> {
        let handler: Box<dyn OutputHandler> = match &config.output {
            None | Some(OutputConfig::Console) => {
                Box::new(ConsoleOutput::new(config.window_size, config.network_launch, multi))
            }
            Some(OutputConfig::Json { path }) => Box::new(JsonOutput::new(PathBuf::from(path))?),
            Some(OutputConfig::Csv { path }) => Box::new(CsvOutput::new(PathBuf::from(path))?),
            Some(OutputConfig::Sqlite { path, table }) => {
                Box::new(SqliteOutput::new(PathBuf::from(path), table.clone()).await?)
            }
        };
        Ok(handler)
    }
}
