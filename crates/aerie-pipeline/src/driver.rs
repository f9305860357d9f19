//! Fetch loop shared by the main loop variants.
//!
//! Each variant supplies the per-bag routing; the driver owns the stop
//! conditions: source exhaustion, `Terminate`, the termination limit and
//! the first error.

use aerie_types::{Bag, Configuration, NestError};
use tracing::{debug, error, info};

use crate::chain::ChainOutcome;
use crate::errors::PipelineError;
use crate::stats::LoopStats;
use crate::traits::{Direction, ModuleResult, Named, Source};

pub(crate) const UPDATE_FREQUENCY: &str = "updateFrequency";
pub(crate) const TERMINATION_LIMIT: &str = "terminationLimit";

/// Progress logging interval and optional bag limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoopSettings {
    /// Log progress every this many bags; 0 disables progress logs.
    pub update_frequency: u64,
    /// Stop once this many bags were fetched.
    pub termination_limit: Option<u64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            update_frequency: 10_000,
            termination_limit: None,
        }
    }
}

impl LoopSettings {
    /// Declare `updateFrequency` (10000) and `terminationLimit` (-1, unbounded).
    pub fn declare(config: &mut Configuration) -> Result<(), NestError> {
        config
            .parameter_default(UPDATE_FREQUENCY, 10_000)?
            .parameter_default(TERMINATION_LIMIT, -1)?;
        Ok(())
    }

    pub fn from_config(config: &Configuration) -> Result<Self, NestError> {
        let update_frequency = config.get_parameter::<i32>(UPDATE_FREQUENCY)?;
        let termination_limit = config.get_parameter::<i32>(TERMINATION_LIMIT)?;
        Ok(Self {
            update_frequency: u64::try_from(update_frequency).unwrap_or(0),
            termination_limit: u64::try_from(termination_limit).ok().filter(|&n| n > 0),
        })
    }
}

/// Mutable state a main loop keeps across one `execute()`.
#[derive(Debug, Default)]
pub(crate) struct LoopState {
    pub stats: LoopStats,
    pub last_result: Option<ModuleResult>,
}

/// Pull bags from `source` and hand each to `route` until a stop condition.
pub(crate) fn drive<F>(
    main_loop: &str,
    source: &Named<dyn Source>,
    direction: Direction,
    settings: LoopSettings,
    state: &mut LoopState,
    mut route: F,
) -> Result<(), PipelineError>
where
    F: FnMut(&mut Bag, u64) -> Result<ChainOutcome, PipelineError>,
{
    *state = LoopState::default();
    info!(
        "[{}] Starting {} loop over source '{}'",
        main_loop, direction, source.name
    );

    loop {
        if let Some(limit) = settings.termination_limit {
            if state.stats.fetched >= limit {
                info!(
                    "[{}] Reached the termination limit of {} bags",
                    main_loop, limit
                );
                break;
            }
        }

        let fetched = source.handle.lock().fetch(direction);
        let mut bag = match fetched {
            Ok(Some(bag)) => bag,
            Ok(None) => {
                debug!("[{}] Source '{}' exhausted", main_loop, source.name);
                break;
            }
            Err(err) => {
                error!("[{}] Source '{}' failed: {}", main_loop, source.name, err);
                return Err(PipelineError::SourceFailed {
                    source_name: source.name.clone(),
                    error: err,
                });
            }
        };

        state.stats.record_fetch();
        let index = state.stats.fetched;
        if settings.update_frequency > 0 && index % settings.update_frequency == 0 {
            info!("[{}] Processing bag number {}", main_loop, index);
        }

        let outcome = route(&mut bag, index)?;
        state.last_result = Some(outcome.result());
        state.stats.record_outcome(&outcome);

        if let ChainOutcome::Terminated { module } = &outcome {
            info!(
                "[{}] Terminated by '{}' after {} bags",
                main_loop, module, index
            );
            break;
        }
    }

    info!(
        "[{}] Done: fetched={} completed={} filtered={}",
        main_loop, state.stats.fetched, state.stats.completed, state.stats.filtered
    );
    Ok(())
}
