//! Config validation
//!
//! Rules:
//! - channel names non-empty and pairwise distinct
//! - caption and progress paths non-empty
//! - interval_secs > 0, margins >= 0, all finite and representable as a Duration
//! - link_button label non-empty when present
//! - provider params complete for the selected kind
//! - command queue capacity > 0

use std::time::Duration;

use contracts::{ContractError, ForwarderBlueprint, ProviderKind};
use validator::Validate;

/// Params the replay provider cannot run without
const REPLAY_REQUIRED_PARAMS: &[&str] = &["export_dir"];

/// Validate a ForwarderBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &ForwarderBlueprint) -> Result<(), ContractError> {
    validate_channels(blueprint)?;
    validate_paths(blueprint)?;
    validate_pacing(blueprint)?;
    validate_post(blueprint)?;
    validate_provider(blueprint)?;
    validate_control(blueprint)?;
    Ok(())
}

/// Channel names: present and distinct
fn validate_channels(blueprint: &ForwarderBlueprint) -> Result<(), ContractError> {
    let channels = &blueprint.channels;
    channels
        .validate()
        .map_err(|e| ContractError::config_validation("channels", e.to_string()))?;

    if channels.media == channels.links {
        return Err(ContractError::config_validation(
            "channels.links",
            format!("media and links channels must differ, both are '{}'", channels.media),
        ));
    }

    if channels.destination == channels.media || channels.destination == channels.links {
        return Err(ContractError::config_validation(
            "channels.destination",
            format!(
                "destination '{}' must not be one of the source channels",
                channels.destination
            ),
        ));
    }

    Ok(())
}

/// File paths
fn validate_paths(blueprint: &ForwarderBlueprint) -> Result<(), ContractError> {
    if blueprint.captions.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "captions.path",
            "caption file path cannot be empty",
        ));
    }
    if blueprint.progress.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "progress.path",
            "progress file path cannot be empty",
        ));
    }
    Ok(())
}

/// Pacing ranges
fn validate_pacing(blueprint: &ForwarderBlueprint) -> Result<(), ContractError> {
    let pacing = &blueprint.pacing;

    for (field, value) in [
        ("pacing.interval_secs", pacing.interval_secs),
        ("pacing.rate_limit_margin_secs", pacing.rate_limit_margin_secs),
        ("pacing.transient_cooldown_secs", pacing.transient_cooldown_secs),
    ] {
        if !value.is_finite() {
            return Err(ContractError::config_validation(
                field,
                format!("must be a finite number, got {value}"),
            ));
        }
        if Duration::try_from_secs_f64(value).is_err() {
            return Err(ContractError::config_validation(
                field,
                format!("{value} seconds is out of range"),
            ));
        }
    }

    pacing
        .validate()
        .map_err(|e| ContractError::config_validation("pacing", e.to_string()))
}

/// Post layout
fn validate_post(blueprint: &ForwarderBlueprint) -> Result<(), ContractError> {
    if let Some(label) = &blueprint.post.link_button {
        if label.trim().is_empty() {
            return Err(ContractError::config_validation(
                "post.link_button",
                "button label cannot be blank",
            ));
        }
    }
    Ok(())
}

/// Provider params
fn validate_provider(blueprint: &ForwarderBlueprint) -> Result<(), ContractError> {
    let provider = &blueprint.provider;
    let required: &[&str] = match provider.kind {
        ProviderKind::Mock => &[],
        ProviderKind::Replay => REPLAY_REQUIRED_PARAMS,
    };

    for key in required {
        let present = provider
            .params
            .get(*key)
            .is_some_and(|value| !value.trim().is_empty());
        if !present {
            return Err(ContractError::config_validation(
                format!("provider.params.{key}"),
                format!("required for provider kind {:?}", provider.kind),
            ));
        }
    }
    Ok(())
}

/// Command surface
fn validate_control(blueprint: &ForwarderBlueprint) -> Result<(), ContractError> {
    if blueprint.control.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "control.queue_capacity",
            "queue capacity must be > 0",
        ));
    }
    Ok(())
}
