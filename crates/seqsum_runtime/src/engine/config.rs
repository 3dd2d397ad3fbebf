use seqsum_config::{LimitsConfig, SeqsumConfig};

#[derive(Debug, Clone)]
pub struct SeqsumRuntimeConfig {
    /// Upper bound on the instance's linear memory, in bytes.
    pub max_memory_bytes: usize,
    /// Longest sequence `init` will forward to the module.
    pub max_sequence_len: u64,
    /// Instruction budget. `None` disables fuel metering.
    pub fuel: Option<u64>,
}

impl SeqsumRuntimeConfig {
    pub fn create_from_seqsum_config(config: &SeqsumConfig) -> Self {
        Self::from_limits(&config.limits)
    }

    pub fn from_limits(limits: &LimitsConfig) -> Self {
        Self {
            max_memory_bytes: limits.max_memory_bytes,
            max_sequence_len: limits.max_sequence_len,
            fuel: limits.fuel,
        }
    }
}

impl Default for SeqsumRuntimeConfig {
    fn default() -> Self {
        Self::from_limits(&LimitsConfig::default())
    }
}
