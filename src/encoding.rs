//! Exposition format implementations.

use std::fmt::Write;

pub mod text;

pub use text::{DescriptorEncoder, MetricEncoder};

/// A sample value encodable in the text exposition format.
pub trait EncodeValue {
    /// Write oneself to the given writer.
    fn encode(&self, writer: &mut dyn Write) -> Result<(), std::fmt::Error>;
}

impl EncodeValue for f64 {
    fn encode(&self, writer: &mut dyn Write) -> Result<(), std::fmt::Error> {
        let v = *self;
        if v.is_nan() {
            writer.write_str("NaN")
        } else if v.is_infinite() {
            writer.write_str(if v.is_sign_positive() { "+Inf" } else { "-Inf" })
        } else if v.fract() == 0.0 && v.abs() < 1e15 {
            // Whole numbers are written without a trailing `.0`.
            (v as i64).encode(writer)
        } else {
            writer.write_str(dtoa::Buffer::new().format_finite(v))
        }
    }
}

impl EncodeValue for i64 {
    fn encode(&self, writer: &mut dyn Write) -> Result<(), std::fmt::Error> {
        writer.write_str(itoa::Buffer::new().format(*self))
    }
}

impl EncodeValue for u64 {
    fn encode(&self, writer: &mut dyn Write) -> Result<(), std::fmt::Error> {
        writer.write_str(itoa::Buffer::new().format(*self))
    }
}

pub(crate) fn is_valid_legacy_char(c: char, i: usize) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || (c.is_ascii_digit() && i > 0)
}

pub(crate) fn is_valid_label_char(c: char, i: usize) -> bool {
    c.is_ascii_alphabetic() || c == '_' || (c.is_ascii_digit() && i > 0)
}

/// Whether `name` is a valid metric name, i.e. matches
/// `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .enumerate()
            .all(|(i, c)| is_valid_legacy_char(c, i))
}

/// Whether `name` is a valid label name, i.e. matches
/// `[a-zA-Z_][a-zA-Z0-9_]*`.
pub(crate) fn is_valid_label_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .enumerate()
            .all(|(i, c)| is_valid_label_char(c, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<V: EncodeValue>(v: V) -> String {
        let mut buffer = String::new();
        v.encode(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn encode_float_values() {
        assert_eq!("3", encoded(3.0f64));
        assert_eq!("-42", encoded(-42.0f64));
        assert_eq!("0.5", encoded(0.5f64));
        assert_eq!("+Inf", encoded(f64::INFINITY));
        assert_eq!("-Inf", encoded(f64::NEG_INFINITY));
        assert_eq!("NaN", encoded(f64::NAN));
    }

    #[test]
    fn encode_integer_values() {
        assert_eq!("18446744073709551615", encoded(u64::MAX));
        assert_eq!("-7", encoded(-7i64));
    }

    #[test]
    fn metric_name_is_legacy_valid() {
        struct Scenario {
            input: &'static str,
            expected: bool,
        }

        let scenarios = vec![
            Scenario {
                input: "Avalid_23name",
                expected: true,
            },
            Scenario {
                input: "_Avalid_23name",
                expected: true,
            },
            Scenario {
                input: "1valid_23name",
                expected: false,
            },
            Scenario {
                input: "Ava:lid_23name",
                expected: true,
            },
            Scenario {
                input: "a lid_23name",
                expected: false,
            },
            Scenario {
                input: ":leading_colon",
                expected: true,
            },
            Scenario {
                input: "",
                expected: false,
            },
            Scenario {
                input: "aÅz",
                expected: false,
            },
        ];

        for scenario in scenarios {
            assert_eq!(
                scenario.expected,
                is_valid_metric_name(scenario.input),
                "{}",
                scenario.input
            );
        }
    }

    #[test]
    fn label_name_is_legacy_valid() {
        assert!(is_valid_label_name("Avalid_23name"));
        assert!(is_valid_label_name("_leading_underscore"));
        assert!(!is_valid_label_name("1valid_23name"));
        assert!(!is_valid_label_name("colon:in:the:middle"));
        assert!(!is_valid_label_name(""));
        assert!(!is_valid_label_name("aÅz"));
    }
}
