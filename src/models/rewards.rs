//! XP awarded for answers. Nothing here feeds back into review intervals.

use super::Quality;

/// XP for one passing answer before multipliers.
pub const BASE_XP: f64 = 10.0;

/// Bonus factor for a perfect answer.
pub const PERFECT_BONUS: f64 = 1.5;

/// XP earned by one answer in a deck with the given multiplier.
///
/// Failed answers earn nothing.
pub fn xp_for_answer(quality: Quality, xp_multiplier: f64) -> u32 {
    if !quality.is_passing() {
        return 0;
    }
    let bonus = if quality == Quality::PERFECT {
        PERFECT_BONUS
    } else {
        1.0
    };
    (BASE_XP * xp_multiplier.max(0.0) * bonus).round() as u32
}
