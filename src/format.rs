//! Decimal text output for integers and floats, on top of [`Writer::write_bytes`].

use crate::{hardware::Hardware, serial::Writer};

/// Scratch space for one integer: the 20 digits of `u64::MAX`, or the sign and 19
/// digits of `i64::MIN`.
pub const INTEGER_BUF_LEN: usize = 20;

/// Most fractional digits [`Writer::write_float`] prints. Larger requests are clamped.
///
/// Digits past what an `f64` fraction can represent would be noise anyway.
pub const MAX_FLOAT_PRECISION: u8 = 9;

/// Added to the scaled fraction before truncating, so that values like `0.29` whose
/// binary form sits just below the decimal one still print their own digits.
const FRACTION_BIAS: f64 = 1e-6;

/// Writes the decimal digits of `value` into the end of `buf` and returns them.
pub fn format_unsigned(mut value: u64, buf: &mut [u8; INTEGER_BUF_LEN]) -> &[u8] {
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    &buf[start..]
}

/// Writes `value` in decimal, with a leading `-` when negative, into the end of `buf`
/// and returns it.
pub fn format_integer(value: i64, buf: &mut [u8; INTEGER_BUF_LEN]) -> &[u8] {
    // `unsigned_abs` keeps `i64::MIN` in range.
    let digits = format_unsigned(value.unsigned_abs(), buf).len();
    let mut start = buf.len() - digits;
    if value < 0 {
        start -= 1;
        buf[start] = b'-';
    }
    &buf[start..]
}

/// Splits a finite, non-negative `value` into its integer part and its first
/// `precision` fractional digits.
///
/// The fraction is truncated after adding [`FRACTION_BIAS`]. When that carries into a
/// whole unit, the integer part is incremented instead.
fn split_float(value: f64, precision: u8) -> (u64, u64) {
    let scale = 10u64.pow(u32::from(precision));
    // Saturates above `u64::MAX`, where there is no fraction left to print.
    let integer = value as u64;
    if integer == u64::MAX {
        return (integer, 0);
    }

    let fraction = ((value - integer as f64) * scale as f64 + FRACTION_BIAS) as u64;
    if fraction >= scale {
        (integer + 1, fraction - scale)
    } else {
        (integer, fraction)
    }
}

impl<H: Hardware, const N: usize> Writer<'_, H, N> {
    /// Sends `value` in decimal, with a leading `-` when negative.
    ///
    /// Returns the number of bytes sent.
    pub fn write_integer(&mut self, value: i64) -> usize {
        let mut buf = [0; INTEGER_BUF_LEN];
        self.write_bytes(format_integer(value, &mut buf))
    }

    /// Sends `value` in decimal.
    ///
    /// Returns the number of bytes sent.
    pub fn write_unsigned(&mut self, value: u64) -> usize {
        let mut buf = [0; INTEGER_BUF_LEN];
        self.write_bytes(format_unsigned(value, &mut buf))
    }

    /// Sends `value` with exactly `precision` fractional digits, and no decimal point when
    /// `precision` is 0.
    ///
    /// Fractional digits are truncated, not rounded: `write_float(-0.005, 2)` sends
    /// `-0.00`. A bias of one millionth of the last digit absorbs binary representation
    /// error, so `write_float(0.29, 2)` sends `0.29`. `precision` is clamped to
    /// [`MAX_FLOAT_PRECISION`]. NaN is sent as `nan` and infinities as `inf` / `-inf`.
    ///
    /// Returns the number of bytes sent.
    pub fn write_float(&mut self, value: f64, precision: u8) -> usize {
        if value.is_nan() {
            return self.write_string("nan");
        }

        let mut n = 0;
        let magnitude = if value < 0.0 {
            n += self.write(b'-');
            -value
        } else {
            value
        };
        if magnitude.is_infinite() {
            return n + self.write_string("inf");
        }

        let precision = precision.min(MAX_FLOAT_PRECISION);
        let (integer, fraction) = split_float(magnitude, precision);
        n += self.write_unsigned(integer);

        if precision > 0 {
            n += self.write(b'.');
            let mut buf = [0; INTEGER_BUF_LEN];
            let digits = format_unsigned(fraction, &mut buf);
            for _ in digits.len()..usize::from(precision) {
                n += self.write(b'0');
            }
            n += self.write_bytes(digits);
        }
        n
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use super::*;
    use crate::{Config, Serial, sim::SimUart, sim::drain};
    use std::{string::String, vec::Vec};

    fn integer(value: i64) -> Vec<u8> {
        let mut buf = [0; INTEGER_BUF_LEN];
        format_integer(value, &mut buf).to_vec()
    }

    /// Runs `f` against a fresh line and returns what went out on the wire and the count
    /// `f` reported.
    fn sent(f: impl FnOnce(&mut Writer<'_, SimUart, 64>) -> usize) -> (String, usize) {
        let s = Serial::<SimUart, 64>::new(SimUart::new());
        let (mut tx, _rx) = s.init(&Config::default()).unwrap();
        let n = f(&mut tx);
        drain(&s);
        (String::from_utf8(s.hardware().wire()).unwrap(), n)
    }

    fn float(value: f64, precision: u8) -> String {
        let (text, n) = sent(|w| w.write_float(value, precision));
        assert_eq!(n, text.len());
        text
    }

    #[test]
    fn integers() {
        assert_eq!(integer(0), b"0");
        assert_eq!(integer(7), b"7");
        assert_eq!(integer(-42), b"-42");
        assert_eq!(integer(1_000_000), b"1000000");
        assert_eq!(integer(i64::MAX), b"9223372036854775807");
        assert_eq!(integer(i64::MIN), b"-9223372036854775808");
    }

    #[test]
    fn unsigned_max_fills_buffer() {
        let mut buf = [0; INTEGER_BUF_LEN];
        assert_eq!(format_unsigned(u64::MAX, &mut buf), b"18446744073709551615");
    }

    #[test]
    fn write_integer_counts_sign() {
        assert_eq!(sent(|w| w.write_integer(0)), (String::from("0"), 1));
        assert_eq!(sent(|w| w.write_integer(-42)), (String::from("-42"), 3));
        assert_eq!(
            sent(|w| w.write_integer(i64::MIN)),
            (String::from("-9223372036854775808"), 20)
        );
        assert_eq!(sent(|w| w.write_unsigned(65_535)), (String::from("65535"), 5));
    }

    #[test]
    fn floats() {
        assert_eq!(float(3.14159, 2), "3.14");
        assert_eq!(float(5.0, 0), "5");
        assert_eq!(float(2.5, 1), "2.5");
        assert_eq!(float(0.0, 3), "0.000");
        assert_eq!(float(123.456, 3), "123.456");
        assert_eq!(float(-7.25, 2), "-7.25");
    }

    #[test]
    fn float_truncates_toward_zero() {
        assert_eq!(float(-0.005, 2), "-0.00");
        assert_eq!(float(0.019, 2), "0.01");
        assert_eq!(float(9.99, 1), "9.9");
        assert_eq!(float(-1.999, 0), "-1");
    }

    #[test]
    fn float_bias_absorbs_representation_error() {
        // 0.29 is stored as 0.28999999999999998002.
        assert_eq!(float(0.29, 2), "0.29");
        assert_eq!(float(1.1, 1), "1.1");
        assert_eq!(float(4.35, 2), "4.35");
    }

    #[test]
    fn float_keeps_leading_fraction_zeros() {
        assert_eq!(float(1.05, 2), "1.05");
        assert_eq!(float(3.0007, 4), "3.0007");
    }

    #[test]
    fn float_carry_into_integer() {
        assert_eq!(float(0.99999999999, 3), "1.000");
        assert_eq!(float(-9.9999999999, 2), "-10.00");
    }

    #[test]
    fn float_precision_is_clamped() {
        assert_eq!(float(0.5, 20), "0.500000000");
    }

    #[test]
    fn float_special_values() {
        assert_eq!(float(f64::NAN, 2), "nan");
        assert_eq!(float(f64::INFINITY, 2), "inf");
        assert_eq!(float(f64::NEG_INFINITY, 2), "-inf");
        assert_eq!(float(1e30, 1), "18446744073709551615.0");
    }
}
