use std::any::Any;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::config::{FcsComponentConfig, FcsConfig, FcsTarget};
use crate::models::Model;
use crate::state::SimState;
use crate::utils::errors::SimError;
use crate::utils::filter::LagFilter;

enum SignalSource {
    Command(String),
    Channel(usize),
}

enum ComponentState {
    Gain(f64),
    Bias(f64),
    Lag(LagFilter),
    RateLimit { limit: f64, last: f64 },
    Clamp { min: f64, max: f64 },
}

impl ComponentState {
    fn execute(&mut self, input: f64, dt: f64) -> f64 {
        match self {
            ComponentState::Gain(gain) => input * *gain,
            ComponentState::Bias(bias) => input + *bias,
            ComponentState::Lag(filter) => filter.execute(input),
            ComponentState::RateLimit { limit, last } => {
                let max_step = *limit * dt;
                let output = input.clamp(*last - max_step, *last + max_step);
                *last = output;
                output
            }
            ComponentState::Clamp { min, max } => input.clamp(*min, *max),
        }
    }
}

struct Channel {
    input: SignalSource,
    adds: Vec<SignalSource>,
    components: Vec<ComponentState>,
    output: Option<FcsTarget>,
}

/// Maps pilot commands to effector positions. With no channels configured
/// every position simply tracks its command; configured channels form a DAG
/// evaluated in topological order and override the effectors they drive.
pub struct FcsModel {
    channels: Vec<Channel>,
    channel_values: Vec<f64>,
    n_engines: usize,
}

impl FcsModel {
    pub fn new(config: &FcsConfig, n_engines: usize, dt: f64) -> Result<Self, SimError> {
        config.validate()?;

        // Topological order over channel-to-channel references.
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> =
            (0..config.channels.len()).map(|i| graph.add_node(i)).collect();
        let index_of = |name: &str| config.channels.iter().position(|c| c.name == name);
        for (i, channel) in config.channels.iter().enumerate() {
            for input in std::iter::once(&channel.input).chain(channel.add.iter()) {
                if let Some(upstream) = input.strip_prefix("channel:") {
                    let j = index_of(upstream).expect("validated above");
                    graph.add_edge(nodes[j], nodes[i], ());
                }
            }
        }
        let order = toposort(&graph, None)
            .map_err(|_| SimError::InvalidConfig("FCS channel graph has a cycle".into()))?;

        let mut channels = Vec::with_capacity(config.channels.len());
        let mut slot_of = vec![0usize; config.channels.len()];
        for (slot, node) in order.iter().enumerate() {
            slot_of[graph[*node]] = slot;
        }
        for node in order {
            let spec = &config.channels[graph[node]];
            let resolve = |input: &String| match input.strip_prefix("channel:") {
                Some(upstream) => SignalSource::Channel(slot_of[index_of(upstream).unwrap()]),
                None => SignalSource::Command(input.clone()),
            };
            channels.push(Channel {
                input: resolve(&spec.input),
                adds: spec.add.iter().map(resolve).collect(),
                components: spec
                    .components
                    .iter()
                    .map(|c| match *c {
                        FcsComponentConfig::Gain { gain } => ComponentState::Gain(gain),
                        FcsComponentConfig::Bias { bias } => ComponentState::Bias(bias),
                        FcsComponentConfig::Lag { coeff } => {
                            ComponentState::Lag(LagFilter::new(coeff, dt))
                        }
                        FcsComponentConfig::RateLimit { limit } => {
                            ComponentState::RateLimit { limit, last: 0.0 }
                        }
                        FcsComponentConfig::Clamp { min, max } => {
                            ComponentState::Clamp { min, max }
                        }
                    })
                    .collect(),
                output: spec.output,
            });
        }

        let channel_values = vec![0.0; channels.len()];
        Ok(Self {
            channels,
            channel_values,
            n_engines,
        })
    }

    fn command(state: &SimState, id: &str) -> f64 {
        match id {
            "aileron-cmd" => state.bus.get_double_or("fcs/aileron-cmd-norm", 0.0),
            "elevator-cmd" => state.bus.get_double_or("fcs/elevator-cmd-norm", 0.0),
            "rudder-cmd" => state.bus.get_double_or("fcs/rudder-cmd-norm", 0.0),
            "flap-cmd" => state.bus.get_double_or("fcs/flap-cmd-norm", 0.0),
            "speedbrake-cmd" => state.bus.get_double_or("fcs/speedbrake-cmd-norm", 0.0),
            "spoiler-cmd" => state.bus.get_double_or("fcs/spoiler-cmd-norm", 0.0),
            "steer-cmd" => state.bus.get_double_or("fcs/steer-cmd-norm", 0.0),
            "gear-cmd" => state.bus.get_double_or("gear/gear-cmd-norm", 1.0),
            "hook-cmd" => state.bus.get_double_or("fcs/hook-cmd-norm", 0.0),
            _ => 0.0,
        }
    }
}

impl Model for FcsModel {
    fn name(&self) -> &str {
        "fcs"
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        // Default path: position = command.
        let mut out = crate::state::FcsOutput {
            aileron_pos: Self::command(state, "aileron-cmd"),
            elevator_pos: Self::command(state, "elevator-cmd"),
            rudder_pos: Self::command(state, "rudder-cmd"),
            flap_pos: Self::command(state, "flap-cmd"),
            speedbrake_pos: Self::command(state, "speedbrake-cmd"),
            spoiler_pos: Self::command(state, "spoiler-cmd"),
            steer_pos_norm: Self::command(state, "steer-cmd"),
            gear_pos: Self::command(state, "gear-cmd").clamp(0.0, 1.0),
            hook_pos: Self::command(state, "hook-cmd"),
            ..Default::default()
        };

        for i in 0..self.n_engines {
            out.throttle_pos.push(
                state
                    .bus
                    .get_double_or(&format!("fcs/throttle-cmd-norm[{}]", i), 0.0)
                    .clamp(0.0, 1.0),
            );
            out.mixture_pos.push(
                state
                    .bus
                    .get_double_or(&format!("fcs/mixture-cmd-norm[{}]", i), 1.0)
                    .clamp(0.0, 1.0),
            );
            out.advance_pos.push(
                state
                    .bus
                    .get_double_or(&format!("fcs/advance-cmd-norm[{}]", i), 1.0)
                    .clamp(0.0, 1.0),
            );
            out.feather
                .push(state.bus.get_bool(&format!("fcs/feather-cmd[{}]", i)));
        }

        let parking = state
            .bus
            .get_double_or("fcs/parking-brake-cmd-norm", 0.0)
            .clamp(0.0, 1.0);
        out.brake_left = state
            .bus
            .get_double_or("fcs/left-brake-cmd-norm", 0.0)
            .clamp(0.0, 1.0)
            .max(parking);
        out.brake_right = state
            .bus
            .get_double_or("fcs/right-brake-cmd-norm", 0.0)
            .clamp(0.0, 1.0)
            .max(parking);
        out.brake_center = state
            .bus
            .get_double_or("fcs/center-brake-cmd-norm", 0.0)
            .clamp(0.0, 1.0)
            .max(parking);
        out.parking_brake = parking;

        // Configured channels override the effectors they drive.
        for i in 0..self.channels.len() {
            let mut value = match &self.channels[i].input {
                SignalSource::Command(id) => Self::command(state, id),
                SignalSource::Channel(slot) => self.channel_values[*slot],
            };
            for add in &self.channels[i].adds {
                value += match add {
                    SignalSource::Command(id) => Self::command(state, id),
                    SignalSource::Channel(slot) => self.channel_values[*slot],
                };
            }
            for component in self.channels[i].components.iter_mut() {
                value = component.execute(value, state.dt);
            }
            self.channel_values[i] = value;

            match self.channels[i].output {
                Some(FcsTarget::Aileron) => out.aileron_pos = value,
                Some(FcsTarget::Elevator) => out.elevator_pos = value,
                Some(FcsTarget::Rudder) => out.rudder_pos = value,
                Some(FcsTarget::Flap) => out.flap_pos = value,
                Some(FcsTarget::Speedbrake) => out.speedbrake_pos = value,
                Some(FcsTarget::Spoiler) => out.spoiler_pos = value,
                Some(FcsTarget::Steer) => out.steer_pos_norm = value,
                Some(FcsTarget::Gear) => out.gear_pos = value.clamp(0.0, 1.0),
                Some(FcsTarget::Hook) => out.hook_pos = value,
                Some(FcsTarget::Throttle { engine }) => {
                    if let Some(slot) = out.throttle_pos.get_mut(engine) {
                        *slot = value.clamp(0.0, 1.0);
                    }
                }
                Some(FcsTarget::Mixture { engine }) => {
                    if let Some(slot) = out.mixture_pos.get_mut(engine) {
                        *slot = value.clamp(0.0, 1.0);
                    }
                }
                Some(FcsTarget::Advance { engine }) => {
                    if let Some(slot) = out.advance_pos.get_mut(engine) {
                        *slot = value.clamp(0.0, 1.0);
                    }
                }
                None => {}
            }
        }

        state.fcs = out;
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let fcs = &state.fcs;
        state.bus.set_double("fcs/aileron-pos-norm", fcs.aileron_pos);
        state.bus.set_double("fcs/elevator-pos-norm", fcs.elevator_pos);
        state.bus.set_double("fcs/rudder-pos-norm", fcs.rudder_pos);
        state.bus.set_double("fcs/flap-pos-norm", fcs.flap_pos);
        state
            .bus
            .set_double("fcs/speedbrake-pos-norm", fcs.speedbrake_pos);
        state.bus.set_double("fcs/spoiler-pos-norm", fcs.spoiler_pos);
        state.bus.set_double("gear/gear-pos-norm", fcs.gear_pos);
        state.bus.set_double("fcs/steer-pos-norm", fcs.steer_pos_norm);
        for (i, throttle) in fcs.throttle_pos.iter().enumerate() {
            state
                .bus
                .set_double(&format!("fcs/throttle-pos-norm[{}]", i), *throttle);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
