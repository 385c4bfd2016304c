//! Inter-frame delay policies.

use crate::context::{ContextId, FramerateMode};
use crate::error::{FatalBug, Result};

use super::Core;

/// Milliseconds of one speed step.
pub const SPEED_STEP_MS: u64 = 16;

/// Delay owed under [`FramerateMode::Speed`]: `16 * (speed - 1)` minus the
/// time the cycle already took, floored at zero. Speed 1 never waits.
pub fn speed_delay_ms(speed: u32, elapsed_ms: u64) -> u64 {
    if speed <= 1 {
        return 0;
    }
    (SPEED_STEP_MS * u64::from(speed - 1)).saturating_sub(elapsed_ms)
}

impl Core {
    /// Wait for the next tick according to the active context's policy and
    /// poll input.
    pub(crate) fn apply_framerate(&mut self, active: ContextId, start_ticks: u64) -> Result<()> {
        let Some(mode) = self.framerate_mode(active) else {
            return Err(self.fatal(FatalBug::UnknownContext(active)));
        };

        match mode {
            FramerateMode::Ui => self.platform.update_event_status_delay(),
            FramerateMode::UiInterrupt => self.platform.update_event_status_intake(),
            FramerateMode::Speed => {
                let speed = self
                    .world(active)
                    .map_or_else(|| self.world.speed(), |world| world.speed());
                if speed > 1 {
                    let elapsed = self.platform.ticks().saturating_sub(start_ticks);
                    self.platform.delay(speed_delay_ms(speed, elapsed));
                }
                self.platform.update_event_status()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_delay_subtracts_elapsed_time() {
        assert_eq!(speed_delay_ms(4, 0), 48);
        assert_eq!(speed_delay_ms(4, 10), 38);
        assert_eq!(speed_delay_ms(4, 48), 0);
        assert_eq!(speed_delay_ms(4, 500), 0);
    }

    #[test]
    fn fastest_speed_never_waits() {
        assert_eq!(speed_delay_ms(1, 0), 0);
        assert_eq!(speed_delay_ms(0, 0), 0);
        assert_eq!(speed_delay_ms(2, 0), 16);
    }
}
