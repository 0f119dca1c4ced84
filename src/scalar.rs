//! [`Scalar`] implementations for standard leaf types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::schema::{Node, Scalar, ScalarKind, Slot};

macro_rules! scalar_from_str {
    ($kind:expr => $($ty:ty),+ $(,)?) => {$(
        impl Scalar for $ty {
            fn kind(&self) -> ScalarKind {
                $kind
            }

            fn set_str(&mut self, raw: &str) -> Result<(), String> {
                *self = raw.trim().parse::<$ty>().map_err(|e| e.to_string())?;
                Ok(())
            }

            fn is_zero(&self) -> bool {
                *self == <$ty>::default()
            }

            fn display(&self) -> String {
                self.to_string()
            }
        }

        impl Node for $ty {
            fn slot(&mut self) -> Slot<'_> {
                Slot::Scalar(self)
            }
        }
    )+};
}

scalar_from_str!(ScalarKind::Int => i8, i16, i32, i64, i128, isize);
scalar_from_str!(ScalarKind::Uint => u8, u16, u32, u64, u128, usize);
scalar_from_str!(ScalarKind::Float => f32, f64);

impl Scalar for String {
    fn kind(&self) -> ScalarKind {
        ScalarKind::String
    }

    fn set_str(&mut self, raw: &str) -> Result<(), String> {
        *self = raw.to_string();
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn display(&self) -> String {
        self.clone()
    }
}

impl Scalar for PathBuf {
    fn kind(&self) -> ScalarKind {
        ScalarKind::String
    }

    fn set_str(&mut self, raw: &str) -> Result<(), String> {
        *self = PathBuf::from(raw);
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.as_os_str().is_empty()
    }

    fn display(&self) -> String {
        Path::display(self).to_string()
    }
}

impl Scalar for char {
    fn kind(&self) -> ScalarKind {
        ScalarKind::String
    }

    fn set_str(&mut self, raw: &str) -> Result<(), String> {
        *self = raw.parse::<char>().map_err(|e| e.to_string())?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        *self == '\0'
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

impl Scalar for bool {
    fn kind(&self) -> ScalarKind {
        ScalarKind::Bool
    }

    fn set_str(&mut self, raw: &str) -> Result<(), String> {
        *self = parse_bool(raw.trim())?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

impl Scalar for Duration {
    fn kind(&self) -> ScalarKind {
        ScalarKind::Duration
    }

    fn set_str(&mut self, raw: &str) -> Result<(), String> {
        *self = parse_duration(raw.trim())?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.is_zero()
    }

    fn display(&self) -> String {
        format_duration(*self)
    }
}

macro_rules! scalar_node {
    ($($ty:ty),+) => {$(
        impl Node for $ty {
            fn slot(&mut self) -> Slot<'_> {
                Slot::Scalar(self)
            }
        }
    )+};
}

scalar_node!(String, PathBuf, char, bool, Duration);

/// `None` is the zero value; writing a string always produces `Some`.
impl<T: Scalar + Default> Scalar for Option<T> {
    fn kind(&self) -> ScalarKind {
        match self {
            Some(inner) => inner.kind(),
            None => T::default().kind(),
        }
    }

    fn set_str(&mut self, raw: &str) -> Result<(), String> {
        let mut inner = T::default();
        inner.set_str(raw)?;
        *self = Some(inner);
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn display(&self) -> String {
        self.as_ref().map(Scalar::display).unwrap_or_default()
    }
}

impl<T: Scalar + Default> Node for Option<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Scalar(self)
    }
}

/// Accepts `1 t T true TRUE True` and `0 f F false FALSE False`.
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(format!("invalid boolean {other:?}")),
    }
}

/// Parse a duration such as `300ms`, `2h45m` or `1.5h`. A bare number is
/// taken as seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    if raw.is_empty() {
        return Err("empty duration".into());
    }
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    match humantime::parse_duration(raw) {
        Ok(d) => Ok(d),
        Err(humantime::DurationError::NumberOverflow) => {
            Err(format!("duration {raw:?} is too large"))
        }
        Err(_) if raw.contains('.') => parse_fractional(raw),
        Err(e) => Err(e.to_string()),
    }
}

/// Fractional parts per unit, `1.5h` or `0.25s`.
fn parse_fractional(raw: &str) -> Result<Duration, String> {
    let mut total = 0f64;
    let mut rest = raw;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {raw:?}"))?;
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("invalid duration {raw:?}"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let secs_per_unit = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            unit => return Err(format!("unknown unit {unit:?} in duration {raw:?}")),
        };
        total += value * secs_per_unit;
        rest = &rest[unit_len..];
    }
    Duration::try_from_secs_f64(total).map_err(|_| format!("duration {raw:?} is too large"))
}

/// Render a duration in the syntax [`parse_duration`] reads back, without
/// spaces so it stays a single shell or `.env` word.
pub fn format_duration(d: Duration) -> String {
    humantime::format_duration(d).to_string().replace(' ', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_parses_and_rejects() {
        let mut v = 0i32;
        v.set_str("900").unwrap();
        assert_eq!(v, 900);
        assert!(v.set_str("900ERROR").is_err());
        assert_eq!(v, 900);
    }

    #[test]
    fn unsigned_rejects_negative() {
        let mut v = 0u16;
        assert!(v.set_str("-1").is_err());
    }

    #[test]
    fn zero_values() {
        assert!(0i64.is_zero());
        assert!(String::new().is_zero());
        assert!(!false.display().is_empty());
        assert!(Duration::ZERO.is_zero());
        assert!(None::<u8>.is_zero());
        assert!(!Some(0u8).is_zero());
    }

    #[test]
    fn bool_tokens() {
        for t in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(parse_bool(t), Ok(true), "{t}");
        }
        for f in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(parse_bool(f), Ok(false), "{f}");
        }
        assert!(parse_bool("yes").is_err());
        assert!(parse_bool("").is_err());
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration("300ms"), Ok(Duration::from_millis(300)));
        assert_eq!(parse_duration("2h45m"), Ok(Duration::from_secs(2 * 3600 + 45 * 60)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("10"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
    }

    #[test]
    fn duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("ms").is_err());
        assert!(parse_duration("1.5").is_err());
        assert!(parse_duration("1.5x").is_err());
    }

    #[test]
    fn duration_overflow_is_an_error() {
        assert_eq!(
            parse_duration("9999999999h"),
            Ok(Duration::from_secs(9_999_999_999 * 3600))
        );
        assert!(parse_duration("99999999999999999999s").is_err());
        assert!(parse_duration("9999999999999999999h").is_err());
        assert!(parse_duration("99999999999999999.5h").is_err());
    }

    #[test]
    fn duration_display_is_compact() {
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_millis(150)), "150ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn duration_display_round_trips() {
        for d in [
            Duration::from_secs(9000),
            Duration::from_millis(250),
            Duration::from_nanos(15),
            Duration::from_secs(61),
        ] {
            assert_eq!(parse_duration(&format_duration(d)), Ok(d));
        }
    }

    #[test]
    fn option_sets_some() {
        let mut v: Option<String> = None;
        v.set_str("x").unwrap();
        assert_eq!(v.as_deref(), Some("x"));
        assert_eq!(v.kind(), ScalarKind::String);
        assert_eq!(None::<f64>.kind(), ScalarKind::Float);
    }

    #[test]
    fn path_and_char() {
        let mut p = PathBuf::new();
        assert!(p.is_zero());
        p.set_str("/etc/app").unwrap();
        assert_eq!(Scalar::display(&p), "/etc/app");
        assert_eq!(Some(p).display(), "/etc/app");

        let mut c = '\0';
        c.set_str("x").unwrap();
        assert_eq!(c, 'x');
        assert!(c.set_str("xy").is_err());
    }
}
