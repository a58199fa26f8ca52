//! Achievement calculation for goal cells.
//!
//! Pure functions only. Persistence and cascading are the controller's job.

use super::{GoalCell, GoalStatus, MIDDLE_COUNT, MINOR_COUNT};

/// Map an achievement percentage to its status bucket.
pub fn status_from_achievement(value: u8) -> GoalStatus {
    match value {
        0 => GoalStatus::NotStarted,
        100.. => GoalStatus::Achieved,
        _ => GoalStatus::InProgress,
    }
}

/// Count checked leaves, capped at the chart size.
pub fn checked_count(leaves: &[GoalCell]) -> usize {
    leaves.iter().filter(|leaf| leaf.checked()).count().min(MINOR_COUNT)
}

/// Fraction of checked leaves in a minor chart (0.0 - 1.0).
pub fn ring_ratio(leaves: &[GoalCell]) -> f64 {
    checked_count(leaves) as f64 / MINOR_COUNT as f64
}

/// Achievement of a middle cell from its minor leaves.
///
/// `round(100 * checked / 10)`, always in 0-100.
pub fn middle_achievement(leaves: &[GoalCell]) -> u8 {
    let ratio = 100.0 * checked_count(leaves) as f64 / MINOR_COUNT as f64;
    ratio.round() as u8
}

/// Achievement of a major cell from its middle cells.
///
/// Averages the already rounded middle percentages over the fixed fan-out of 8,
/// then rounds again. This can differ by a point from a computation on raw
/// fractions and must stay that way.
pub fn major_achievement(middles: &[GoalCell]) -> u8 {
    let sum: u32 = middles
        .iter()
        .take(MIDDLE_COUNT)
        .map(|cell| u32::from(cell.achievement.min(100)))
        .sum();
    let average = f64::from(sum) / MIDDLE_COUNT as f64;
    average.round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(checked: usize) -> Vec<GoalCell> {
        (1..=MINOR_COUNT)
            .map(|i| {
                let mut leaf = GoalCell::new_leaf(format!("leaf-{}", i));
                leaf.is_checked = Some(i <= checked);
                leaf
            })
            .collect()
    }

    fn middles(values: &[u8]) -> Vec<GoalCell> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let mut cell = GoalCell::new(format!("middle-{}", i));
                cell.set_achievement(*value);
                cell
            })
            .collect()
    }

    #[test]
    fn test_status_buckets() {
        assert_eq!(status_from_achievement(0), GoalStatus::NotStarted);
        assert_eq!(status_from_achievement(1), GoalStatus::InProgress);
        assert_eq!(status_from_achievement(99), GoalStatus::InProgress);
        assert_eq!(status_from_achievement(100), GoalStatus::Achieved);
    }

    #[test]
    fn test_middle_achievement_steps_by_ten() {
        for checked in 0..=MINOR_COUNT {
            assert_eq!(middle_achievement(&leaves(checked)), (checked * 10) as u8);
        }
    }

    #[test]
    fn test_major_achievement_single_complete_middle() {
        // 100 / 8 = 12.5 rounds up
        assert_eq!(major_achievement(&middles(&[100, 0, 0, 0, 0, 0, 0, 0])), 13);
    }

    #[test]
    fn test_major_achievement_averages_rounded_values() {
        assert_eq!(major_achievement(&middles(&[10, 10, 10, 0, 0, 0, 0, 0])), 4);
        assert_eq!(major_achievement(&middles(&[100; 8])), 100);
        assert_eq!(major_achievement(&middles(&[0; 8])), 0);
        // 30 / 8 = 3.75
        assert_eq!(major_achievement(&middles(&[10, 20, 0, 0, 0, 0, 0, 0])), 4);
    }

    #[test]
    fn test_ring_ratio() {
        assert_eq!(ring_ratio(&leaves(0)), 0.0);
        assert_eq!(ring_ratio(&leaves(5)), 0.5);
        assert_eq!(ring_ratio(&leaves(10)), 1.0);
    }

    #[test]
    fn test_checked_count_ignores_non_leaf_cells() {
        let mut cells = leaves(3);
        cells.push(GoalCell::new("extra".to_string()));
        assert_eq!(checked_count(&cells), 3);
    }
}
