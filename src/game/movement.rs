//! Plausibility checks for client-reported movement

use std::time::Duration;

use super::math::Vec3;

/// A single update may never move a reference this far (one exterior cell)
pub const MAX_STEP_DISTANCE: f32 = 4096.0;

/// Shortest interval the speed check divides by; covers bursty clients
pub const MIN_SPEED_WINDOW: Duration = Duration::from_millis(250);

/// Why a movement update was refused
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum MovementRejection {
    #[error("cell or world changed from {current:#x} to {claimed:#x}")]
    CellMismatch { current: u32, claimed: u32 },

    #[error("moved {distance} units in a single update")]
    TooFar { distance: f32 },

    #[error("moved {distance} units while {allowed} were allowed")]
    TooFast { distance: f32, allowed: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementVerdict {
    /// Apply the claimed placement
    Accepted,
    /// A teleport is pending; keep the current placement but take the rest of the update
    HoldPosition,
    /// Skip the update; the acting client gets its authoritative placement back
    Rejected(MovementRejection),
}

/// Movement validation system
pub struct MovementValidator;

impl MovementValidator {
    /// Validate a claimed position against the last confirmed one.
    ///
    /// `elapsed` is the time since the last accepted update of this index,
    /// `None` if there never was one (no speed check is possible then).
    pub fn validate(
        current_pos: Vec3,
        current_cell_or_world: u32,
        claimed_pos: Vec3,
        claimed_cell_or_world: u32,
        elapsed: Option<Duration>,
        max_speed: f32,
    ) -> MovementVerdict {
        if claimed_pos.is_really_wrong() {
            return MovementVerdict::HoldPosition;
        }

        if current_cell_or_world != claimed_cell_or_world {
            return MovementVerdict::Rejected(MovementRejection::CellMismatch {
                current: current_cell_or_world,
                claimed: claimed_cell_or_world,
            });
        }

        let distance = (claimed_pos - current_pos).length();
        if !(distance < MAX_STEP_DISTANCE) {
            return MovementVerdict::Rejected(MovementRejection::TooFar { distance });
        }

        if let Some(elapsed) = elapsed {
            let window = elapsed.max(MIN_SPEED_WINDOW).as_secs_f32();
            let allowed = max_speed * window;
            if distance > allowed {
                return MovementVerdict::Rejected(MovementRejection::TooFast { distance, allowed });
            }
        }

        MovementVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: u32 = 0x3c;
    const SPEED: f32 = 4096.0;

    fn validate(claimed: Vec3, cell: u32, elapsed: Option<Duration>) -> MovementVerdict {
        MovementValidator::validate(Vec3::ZERO, CELL, claimed, cell, elapsed, SPEED)
    }

    #[test]
    fn sentinel_holds_position_regardless_of_distance() {
        assert_eq!(
            MovementValidator::validate(
                Vec3::new(1e9, -1e9, 0.0),
                CELL,
                Vec3::REALLY_WRONG,
                0x999,
                Some(Duration::ZERO),
                0.0
            ),
            MovementVerdict::HoldPosition
        );
    }

    #[test]
    fn small_step_is_accepted() {
        assert_eq!(
            validate(Vec3::new(100.0, 50.0, 0.0), CELL, Some(Duration::from_millis(100))),
            MovementVerdict::Accepted
        );
        assert_eq!(validate(Vec3::new(4000.0, 0.0, 0.0), CELL, None), MovementVerdict::Accepted);
    }

    #[test]
    fn cell_change_is_rejected() {
        assert!(matches!(
            validate(Vec3::ZERO, 0x1a, None),
            MovementVerdict::Rejected(MovementRejection::CellMismatch { current: CELL, claimed: 0x1a })
        ));
    }

    #[test]
    fn one_cell_width_is_too_far() {
        assert!(matches!(
            validate(Vec3::new(4096.0, 0.0, 0.0), CELL, None),
            MovementVerdict::Rejected(MovementRejection::TooFar { .. })
        ));
        assert!(matches!(
            validate(Vec3::new(f32::NAN, 0.0, 0.0), CELL, None),
            MovementVerdict::Rejected(MovementRejection::TooFar { .. })
        ));
    }

    #[test]
    fn speed_is_limited_by_elapsed_time() {
        // 0.5 s at 4096 u/s allows 2048 units
        assert_eq!(
            validate(Vec3::new(2000.0, 0.0, 0.0), CELL, Some(Duration::from_millis(500))),
            MovementVerdict::Accepted
        );
        assert!(matches!(
            validate(Vec3::new(2100.0, 0.0, 0.0), CELL, Some(Duration::from_millis(500))),
            MovementVerdict::Rejected(MovementRejection::TooFast { .. })
        ));
    }

    #[test]
    fn very_short_intervals_use_the_minimum_window() {
        assert_eq!(
            validate(Vec3::new(1000.0, 0.0, 0.0), CELL, Some(Duration::from_millis(1))),
            MovementVerdict::Accepted
        );
    }
}
