pub mod aggregate;
pub mod competency;
pub mod merge;
pub mod ranking;
pub mod record;
pub mod rollup;
pub mod submission;
pub mod summary;

/// Half-up rounding to 2 decimals used for every displayed percentage:
/// `Int(100*x + 0.5) / 100`
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_off_is_half_up() {
        assert_eq!(round_off_2_decimals(0.0), 0.0);
        assert_eq!(round_off_2_decimals(26.25), 26.25);
        assert_eq!(round_off_2_decimals(66.666_666), 66.67);
        assert_eq!(round_off_2_decimals(12.344), 12.34);
        assert_eq!(round_off_2_decimals(12.345_01), 12.35);
    }
}
