use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct MapperConfig {
    /// Expected number of distinct schemas.
    pub initial_capacity: usize,
    /// Cache shard count; must be a power of two greater than one.
    pub shard_amount: Option<usize>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            shard_amount: None,
        }
    }
}

impl MapperConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(shards) = self.shard_amount {
            if shards < 2 || !shards.is_power_of_two() {
                return Err(Error::Other(
                    "shard_amount must be a power of two greater than one".to_string(),
                ));
            }
        }
        Ok(())
    }
}
