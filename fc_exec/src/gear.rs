//! Landing gear state machine
//!
//! Debounces the operator gear switch so that an up-command held through
//! takeoff does not retract the gear the moment the wheels leave the ground.
//! The switch must first be seen in the down position while airborne (or on
//! the ground) since the last landed period before an up-command is obeyed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use ctrl_if::{act::GearState, sp::GearSwitch};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Landing gear manager state
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LandingGear {
    /// The switch has been seen in the down position since the vehicle last
    /// stood on the ground. Up-commands are ignored until this is set.
    switch_initialised: bool,

    /// The gear demand issued on the last update.
    gear: GearState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LandingGear {
    /// Derive the gear demand for this step from the operator switch and the
    /// vehicle state.
    pub fn update(&mut self, switch: GearSwitch, landed: bool, armed: bool) -> GearState {
        // On the ground (or disarmed) the gear stays down and the switch
        // must be cycled through down again before the next retraction
        if landed || !armed {
            self.switch_initialised = false;
            self.gear = GearState::Down;
        }

        match switch {
            GearSwitch::Down => {
                self.switch_initialised = true;
                self.gear = GearState::Down;
            }
            GearSwitch::Up if self.switch_initialised && !landed && armed => {
                self.gear = GearState::Up;
            }
            // Up-command before the switch was initialised, hold the last
            // demand
            GearSwitch::Up => (),
        }

        self.gear
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_nominal_retract_extend() {
        let mut lg = LandingGear::default();

        // Armed on the ground with the switch down
        assert_eq!(lg.update(GearSwitch::Down, true, true), GearState::Down);

        // Takeoff, then the operator commands up
        assert_eq!(lg.update(GearSwitch::Down, false, true), GearState::Down);
        assert_eq!(lg.update(GearSwitch::Up, false, true), GearState::Up);

        // And back down for landing
        assert_eq!(lg.update(GearSwitch::Down, false, true), GearState::Down);
    }

    #[test]
    fn test_up_held_through_takeoff_ignored() {
        let mut lg = LandingGear::default();

        // Switch already up while still on the ground
        assert_eq!(lg.update(GearSwitch::Up, true, true), GearState::Down);

        // Airborne with the switch still held up, the command is ignored
        assert_eq!(lg.update(GearSwitch::Up, false, true), GearState::Down);
        assert_eq!(lg.update(GearSwitch::Up, false, true), GearState::Down);

        // Only once the operator cycles the switch down does up work again
        assert_eq!(lg.update(GearSwitch::Down, false, true), GearState::Down);
        assert_eq!(lg.update(GearSwitch::Up, false, true), GearState::Up);
    }

    #[test]
    fn test_landing_resets_initialisation() {
        let mut lg = LandingGear::default();

        lg.update(GearSwitch::Down, false, true);
        assert_eq!(lg.update(GearSwitch::Up, false, true), GearState::Up);

        // Touch down with the switch still up
        assert_eq!(lg.update(GearSwitch::Up, true, true), GearState::Down);

        // Back in the air, the held up-command stays ignored
        assert_eq!(lg.update(GearSwitch::Up, false, true), GearState::Down);
    }

    #[test]
    fn test_disarm_forces_down() {
        let mut lg = LandingGear::default();

        lg.update(GearSwitch::Down, false, true);
        assert_eq!(lg.update(GearSwitch::Up, false, true), GearState::Up);

        // Disarming in the air drops the gear and clears the initialisation
        assert_eq!(lg.update(GearSwitch::Up, false, false), GearState::Down);
        assert_eq!(lg.update(GearSwitch::Up, false, true), GearState::Down);
    }
}
