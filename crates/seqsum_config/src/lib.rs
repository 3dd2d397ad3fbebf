use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, String>;

/// Default location of the computation module, relative to the working directory.
pub const DEFAULT_MODULE_PATH: &str = "sum.wasm";

/// Smallest memory limit that still admits one Wasm page.
pub const MIN_MEMORY_BYTES: usize = 65536;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SeqsumConfig {
    /// Where the computation module is loaded from.
    #[serde(default)]
    pub module: ModuleConfig,
    /// Resource limits applied to each module instance.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Directory relative module paths are resolved against.
    /// Set to the config file's directory by `load`, empty (the working directory) otherwise.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl SeqsumConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config: SeqsumConfig = serde_yaml::from_reader(
            std::fs::File::open(path).map_err(|e| format!("Failed to open file: {}", e))?,
        )
        .map_err(|e| format!("Failed to parse YAML: {}", e))?;

        let path = path
            .canonicalize()
            .map_err(|e| format!("Failed to canonicalize path: {}", e))?;
        config.base_dir = path
            .parent()
            .ok_or_else(|| format!("Failed to get parent directory of path: {}", path.display()))?
            .to_path_buf();
        config.validate()?;

        Ok(config)
    }

    /// Parse a config from YAML text. Relative module paths resolve against the working directory.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: SeqsumConfig =
            serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse YAML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the configured module path, e.g. from a command-line flag.
    /// The override is taken as-is, so relative paths stay relative to the working directory.
    pub fn override_module_path(&mut self, path: PathBuf) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err("Module path must not be empty".to_string());
        }
        self.module.path = path;
        self.module.from_override = true;
        Ok(())
    }

    pub fn get_module_path(&self) -> PathBuf {
        let path = &self.module.path;
        if path.is_relative() && !self.module.from_override {
            self.base_dir.join(path)
        } else {
            path.clone()
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.base_dir.as_os_str().is_empty() && !self.base_dir.is_dir() {
            return Err(format!(
                "Broken config path: base directory is not a directory: {}",
                self.base_dir.display()
            ));
        }

        if self.module.path.as_os_str().is_empty() {
            return Err("Module path must not be empty".to_string());
        }

        if self.limits.max_memory_bytes < MIN_MEMORY_BYTES {
            return Err(format!(
                "max_memory_bytes must be at least {} (one Wasm page)",
                MIN_MEMORY_BYTES
            ));
        }

        if self.limits.max_sequence_len == 0 {
            return Err("max_sequence_len must be at least 1".to_string());
        }

        if self.limits.fuel == Some(0) {
            return Err("fuel must be non-zero when set".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    /// Path to the compiled computation module.
    /// If relative, it is relative to the directory of the config file.
    #[serde(default = "ModuleConfig::default_path")]
    pub path: PathBuf,

    #[serde(skip)]
    from_override: bool,
}

impl ModuleConfig {
    fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_MODULE_PATH)
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            from_override: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Upper bound on the linear memory of one instance, in bytes.
    ///
    /// Default: 256 MiB.
    #[serde(default = "LimitsConfig::default_max_memory_bytes")]
    pub max_memory_bytes: usize,

    /// Longest sequence the host will ask the module to construct.
    ///
    /// Default: 2^24 elements.
    #[serde(default = "LimitsConfig::default_max_sequence_len")]
    pub max_sequence_len: u64,

    /// Instruction budget for one instance. Unlimited when omitted.
    #[serde(default)]
    pub fuel: Option<u64>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: Self::default_max_memory_bytes(),
            max_sequence_len: Self::default_max_sequence_len(),
            fuel: None,
        }
    }
}

impl LimitsConfig {
    fn default_max_memory_bytes() -> usize {
        256 * 1024 * 1024
    }

    fn default_max_sequence_len() -> u64 {
        1 << 24
    }
}
