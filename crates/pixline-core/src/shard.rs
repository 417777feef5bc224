use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Presence of this variable enables distributed sharding for the train split.
pub const TRAINING_ROLE_ENV: &str = "PIXLINE_TRAINING_ROLE";
/// Zero-based rank of this worker. Defaults to 0.
pub const TRAINER_ID_ENV: &str = "PIXLINE_TRAINER_ID";
/// Total number of workers. Defaults to 1.
pub const TRAINER_COUNT_ENV: &str = "PIXLINE_TRAINER_COUNT";

/// This worker's slot in a distributed training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSpec {
    pub rank: u32,
    pub world_size: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShardError {
    #[error("{var} is not an unsigned integer: {value:?}")]
    BadEnvInt { var: &'static str, value: String },
    #[error("world_size must be > 0")]
    ZeroWorldSize,
    #[error("rank {rank} out of range for world_size {world_size}")]
    RankOutOfRange { rank: u32, world_size: u32 },
}

impl ShardSpec {
    pub fn new(rank: u32, world_size: u32) -> Result<Self, ShardError> {
        if world_size == 0 {
            return Err(ShardError::ZeroWorldSize);
        }
        if rank >= world_size {
            return Err(ShardError::RankOutOfRange { rank, world_size });
        }
        Ok(Self { rank, world_size })
    }

    /// Read the shard assignment from the environment.
    ///
    /// Returns `Ok(None)` when the role indicator is absent, which disables
    /// sharding entirely.
    pub fn from_env() -> Result<Option<Self>, ShardError> {
        if std::env::var_os(TRAINING_ROLE_ENV).is_none() {
            return Ok(None);
        }
        let rank = parse_env_u32(TRAINER_ID_ENV, 0)?;
        let world_size = parse_env_u32(TRAINER_COUNT_ENV, 1)?;
        Self::new(rank, world_size).map(Some)
    }

    /// The contiguous index block assigned to this rank.
    ///
    /// Each rank receives exactly `floor(n / world_size)` records; the
    /// trailing `n % world_size` records are left unassigned on every rank.
    /// That drop is inherited, documented behavior, not an oversight to fix.
    pub fn slice(&self, n: usize) -> Range<usize> {
        let per_rank = n / self.world_size as usize;
        let start = per_rank * self.rank as usize;
        start..start + per_rank
    }
}

fn parse_env_u32(var: &'static str, default: u32) -> Result<u32, ShardError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<u32>()
            .map_err(|_| ShardError::BadEnvInt { var, value }),
        Err(_) => Ok(default),
    }
}
