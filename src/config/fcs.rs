use serde::{Deserialize, Serialize};

use crate::utils::errors::SimError;

/// Optional control-law definition. When no channel drives an effector the
/// position simply tracks the command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FcsConfig {
    #[serde(default)]
    pub channels: Vec<FcsChannelConfig>,
}

/// One signal path: an input (a pilot command or another channel, prefixed
/// `channel:`), optional summed inputs, a component chain, and the effector
/// it drives. Channels referencing channels form a DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcsChannelConfig {
    pub name: String,
    pub input: String,
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub components: Vec<FcsComponentConfig>,
    #[serde(default)]
    pub output: Option<FcsTarget>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FcsComponentConfig {
    Gain { gain: f64 },
    Bias { bias: f64 },
    Lag { coeff: f64 },
    RateLimit { limit: f64 },
    Clamp { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum FcsTarget {
    Aileron,
    Elevator,
    Rudder,
    Flap,
    Speedbrake,
    Spoiler,
    Steer,
    Gear,
    Hook,
    Throttle { engine: usize },
    Mixture { engine: usize },
    Advance { engine: usize },
}

/// Command identifiers a channel may name as input.
pub const COMMAND_INPUTS: &[&str] = &[
    "aileron-cmd",
    "elevator-cmd",
    "rudder-cmd",
    "flap-cmd",
    "speedbrake-cmd",
    "spoiler-cmd",
    "steer-cmd",
    "gear-cmd",
    "hook-cmd",
];

impl FcsConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        for channel in &self.channels {
            if self
                .channels
                .iter()
                .filter(|c| c.name == channel.name)
                .count()
                > 1
            {
                return Err(SimError::InvalidConfig(format!(
                    "FCS channel name {} is not unique",
                    channel.name
                )));
            }
            for input in std::iter::once(&channel.input).chain(channel.add.iter()) {
                if let Some(upstream) = input.strip_prefix("channel:") {
                    if !self.channels.iter().any(|c| c.name == upstream) {
                        return Err(SimError::InvalidConfig(format!(
                            "FCS channel {} references unknown channel {}",
                            channel.name, upstream
                        )));
                    }
                } else if !COMMAND_INPUTS.contains(&input.as_str()) {
                    return Err(SimError::InvalidConfig(format!(
                        "FCS channel {} references unknown command {}",
                        channel.name, input
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command_rejected() {
        let config = FcsConfig {
            channels: vec![FcsChannelConfig {
                name: "pitch".into(),
                input: "stick-cmd".into(),
                add: Vec::new(),
                components: Vec::new(),
                output: Some(FcsTarget::Elevator),
            }],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_channel_reference_resolves() {
        let config = FcsConfig {
            channels: vec![
                FcsChannelConfig {
                    name: "pitch-trim".into(),
                    input: "elevator-cmd".into(),
                    add: Vec::new(),
                    components: vec![FcsComponentConfig::Gain { gain: 0.1 }],
                    output: None,
                },
                FcsChannelConfig {
                    name: "pitch".into(),
                    input: "elevator-cmd".into(),
                    add: vec!["channel:pitch-trim".into()],
                    components: vec![FcsComponentConfig::Clamp {
                        min: -1.0,
                        max: 1.0,
                    }],
                    output: Some(FcsTarget::Elevator),
                },
            ],
        };
        assert!(config.validate().is_ok());
    }
}
