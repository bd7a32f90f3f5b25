use anyhow::Context;
use grotto_core::{Address, EngineConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    /// Acting address when `--as` is not given, and the admin `init` grants.
    pub operator: Address,
    pub engine: EngineConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("grotto"),
            operator: Address::from("operator"),
            engine: EngineConfig::default(),
        }
    }
}

/// Optional `config.json` in the data directory.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    operator: Option<Address>,
    engine: Option<EngineConfig>,
}

impl CliConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("grotto.db")
    }

    pub fn load_overrides(mut self) -> anyhow::Result<Self> {
        let path = self.data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(self);
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;

        if let Some(operator) = file.operator {
            self.operator = operator;
        }
        if let Some(engine) = file.engine {
            engine.validate()?;
            self.engine = engine;
        }
        tracing::debug!("Loaded overrides from {}", path.display());
        Ok(self)
    }
}
