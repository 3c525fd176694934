use std::any::Any;

use crate::models::Model;
use crate::state::SimState;
use crate::utils::errors::SimError;

/// Applies queued external writes (pilot commands, environment overrides,
/// presets) to the property bus at the top of the tick. This is the only
/// model that stays active while the executor is holding.
pub struct InputModel;

impl InputModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InputModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for InputModel {
    fn name(&self) -> &str {
        "input"
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        state.bus.drain_pending();
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queued_commands_become_visible() {
        let mut state = SimState::new(0.01);
        let mut model = InputModel::new();

        state.bus.queue_double("fcs/aileron-cmd-norm", 0.25);
        assert_eq!(state.bus.get_double("fcs/aileron-cmd-norm"), None);

        model.run(&mut state).unwrap();
        assert_eq!(state.bus.get_double("fcs/aileron-cmd-norm"), Some(0.25));
    }
}
