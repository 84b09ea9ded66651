//! Fixed-point conversions used by the MDP payloads.
//!
//! Voltages and currents travel as milli-units in a `u16`, temperatures as
//! deci-degrees, radio frequencies as an offset from 2400 MHz.

/// Base of the radio frequency offset, in MHz.
pub const FREQUENCY_BASE_MHZ: u16 = 2400;

/// Highest frequency an offset byte can express.
pub const FREQUENCY_MAX_MHZ: u16 = FREQUENCY_BASE_MHZ + u8::MAX as u16;

/// Largest value (in base units) a milli-unit `u16` can carry.
pub const MILLI_MAX: f64 = u16::MAX as f64 / 1000.0;

/// mV/mA to V/A.
#[inline]
pub fn milli_to_base(raw: u16) -> f64 {
    raw as f64 / 1000.0
}

/// Deci-degrees to degrees.
#[inline]
pub fn deci_to_base(raw: u16) -> f64 {
    raw as f64 / 10.0
}

/// V/A to mV/mA, rounded to the nearest milli-unit (ties away from zero).
///
/// Returns `None` for non-finite values or anything outside `0..=65535`
/// after rounding.
pub fn base_to_milli(value: f64) -> Option<u16> {
    if !value.is_finite() {
        return None;
    }
    let milli = (value * 1000.0).round();
    if !(0.0..=u16::MAX as f64).contains(&milli) {
        return None;
    }
    Some(milli as u16)
}

/// Degrees to deci-degrees, with the same rounding and range as
/// [`base_to_milli`].
pub fn base_to_deci(value: f64) -> Option<u16> {
    if !value.is_finite() {
        return None;
    }
    let deci = (value * 10.0).round();
    if !(0.0..=u16::MAX as f64).contains(&deci) {
        return None;
    }
    Some(deci as u16)
}

/// Offset byte to MHz.
#[inline]
pub fn offset_to_frequency(offset: u8) -> u16 {
    FREQUENCY_BASE_MHZ + offset as u16
}

/// MHz to offset byte, `None` outside `2400..=2655`.
pub fn frequency_to_offset(mhz: u16) -> Option<u8> {
    if !(FREQUENCY_BASE_MHZ..=FREQUENCY_MAX_MHZ).contains(&mhz) {
        return None;
    }
    u8::try_from(mhz - FREQUENCY_BASE_MHZ).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milli_scaling() {
        assert_eq!(milli_to_base(3300), 3.3);
        assert_eq!(milli_to_base(u16::MAX), 65.535);
        assert_eq!(base_to_milli(3.3), Some(3300));
        assert_eq!(base_to_milli(0.5), Some(500));
        assert_eq!(base_to_milli(65.535), Some(u16::MAX));
    }

    #[test]
    fn test_milli_rounding_is_nearest() {
        assert_eq!(base_to_milli(1.2344), Some(1234));
        assert_eq!(base_to_milli(1.2346), Some(1235));
        assert_eq!(base_to_milli(0.0004), Some(0));
        assert_eq!(base_to_milli(-0.0004), Some(0));
    }

    #[test]
    fn test_milli_rejects_out_of_range() {
        assert_eq!(base_to_milli(65.536), None);
        assert_eq!(base_to_milli(-0.001), None);
        assert_eq!(base_to_milli(f64::NAN), None);
        assert_eq!(base_to_milli(f64::INFINITY), None);
    }

    #[test]
    fn test_deci_scaling() {
        assert_eq!(deci_to_base(281), 28.1);
        assert_eq!(deci_to_base(0), 0.0);
        assert_eq!(deci_to_base(u16::MAX), 6553.5);
        assert_eq!(base_to_deci(28.1), Some(281));
        assert_eq!(base_to_deci(6553.5), Some(u16::MAX));
        assert_eq!(base_to_deci(6553.6), None);
    }

    #[test]
    fn test_frequency_offset() {
        assert_eq!(offset_to_frequency(0), 2400);
        assert_eq!(offset_to_frequency(40), 2440);
        assert_eq!(offset_to_frequency(u8::MAX), FREQUENCY_MAX_MHZ);
        assert_eq!(frequency_to_offset(2440), Some(40));
        assert_eq!(frequency_to_offset(2399), None);
        assert_eq!(frequency_to_offset(2656), None);
    }
}
