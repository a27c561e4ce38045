//! Loop configuration stored under `.loop_agent/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Loop configuration (TOML).
///
/// Every field is optional; a missing file yields the defaults. The iteration
/// bound and the validator timeout are deliberately not configurable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoopConfig {
    /// Cleanup attempts beyond this count log a loud warning on every retry.
    pub cleanup_warn_after: u32,

    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Coding-agent executable, looked up on `PATH`.
    pub program: String,
    /// Arguments placed before `--prompt`.
    pub args: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            program: "iflow".to_string(),
            args: vec!["-y".to_string(), "-d".to_string(), "--thinking".to_string()],
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cleanup_warn_after: 20,
            agent: AgentConfig::default(),
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cleanup_warn_after == 0 {
            return Err(anyhow!("cleanup_warn_after must be > 0"));
        }
        if self.agent.program.trim().is_empty() {
            return Err(anyhow!("agent.program must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LoopConfig::default()`.
pub fn load_config(path: &Path) -> Result<LoopConfig> {
    if !path.exists() {
        let cfg = LoopConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LoopConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
