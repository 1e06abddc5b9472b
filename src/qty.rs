// ===============================
// src/qty.rs (quantity normalizer)
// ===============================
//
// Exchanges only accept quantities on a step-size grid (LOT_SIZE filter).
// Everything that touches a tradable quantity must pass through here first.
// Decimal arithmetic keeps exact multiples exact — a float version would
// occasionally lose one step at the boundary.
//
use rust_decimal::Decimal;

/// Largest multiple of `step` not exceeding `raw`. Returns 0 when
/// `raw < step`. `step` must be positive (caller contract).
pub fn floor_to_step(raw: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (raw / step).floor() * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_down_to_grid() {
        assert_eq!(floor_to_step(dec!(33.337), dec!(0.01)), dec!(33.33));
        assert_eq!(floor_to_step(dec!(22.119), dec!(0.01)), dec!(22.11));
        assert_eq!(floor_to_step(dec!(7.9), dec!(0.5)), dec!(7.5));
    }

    #[test]
    fn exact_multiple_survives_unchanged() {
        // 100 * 0.33 = 33.00 sits exactly on the 0.01 grid.
        assert_eq!(floor_to_step(dec!(100) * dec!(0.33), dec!(0.01)), dec!(33.00));
        assert_eq!(floor_to_step(dec!(44.89), dec!(0.01)), dec!(44.89));
    }

    #[test]
    fn below_one_step_is_zero() {
        assert_eq!(floor_to_step(dec!(0.009), dec!(0.01)), Decimal::ZERO);
        assert_eq!(floor_to_step(Decimal::ZERO, dec!(0.01)), Decimal::ZERO);
    }

    #[test]
    fn result_is_max_multiple_not_exceeding_input() {
        let step = dec!(0.01);
        for raw in [dec!(0.015), dec!(1.0), dec!(66.999), dec!(100.004)] {
            let q = floor_to_step(raw, step);
            assert!(q <= raw);
            assert_eq!((q / step).fract(), Decimal::ZERO);
            assert!(q + step > raw, "one more step would overshoot");
        }
    }
}
