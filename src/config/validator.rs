//! Configuration validation

use super::*;
use anyhow::Result;

/// Largest accepted group, coordinator included
///
/// Standalone mode runs one thread per walker.
pub const MAX_GROUP_SIZE: usize = 65_536;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_simulation(&config.simulation)?;
    validate_group(&config.group)?;
    validate_runtime(&config.runtime)?;

    Ok(())
}

/// Validate walk parameters
pub fn validate_simulation(simulation: &SimulationConfig) -> Result<()> {
    if simulation.domain_bound == 0 {
        anyhow::bail!("domain_bound must be positive, got 0");
    }

    if simulation.step_budget == 0 {
        anyhow::bail!("step_budget must be positive, got 0");
    }

    // Positions are tracked as i64
    if simulation.domain_bound > i64::MAX as u64 {
        anyhow::bail!(
            "domain_bound must be at most {}, got {}",
            i64::MAX,
            simulation.domain_bound
        );
    }

    Ok(())
}

/// Validate group topology
pub fn validate_group(group: &GroupConfig) -> Result<()> {
    if group.size == 0 {
        anyhow::bail!("group size must include at least the coordinator, got 0");
    }

    if group.size > MAX_GROUP_SIZE {
        anyhow::bail!("group size must be at most {}, got {}", MAX_GROUP_SIZE, group.size);
    }

    Ok(())
}

/// Validate runtime settings
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<()> {
    if runtime.receive_timeout_secs == Some(0) {
        anyhow::bail!("receive_timeout_secs must be positive when set");
    }

    Ok(())
}
