//! Number-shaped counter keys.
//!
//! `0x1f++` should answer `0x20` instead of creating a counter called `0x1f`. Keys are
//! tried as decimal int, binary (`0b…`), hex (`0x…`) and float, in that order.

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumberLiteral {
    Int(i64),
    Hex(i64),
    Binary(i64),
    Float(f64),
    NotANumber,
}

impl NumberLiteral {
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if let Ok(n) = s.parse::<i64>() {
            return NumberLiteral::Int(n);
        }
        if let Some(n) = s.strip_prefix("0b").and_then(|d| parse_radix(d, 2)) {
            return NumberLiteral::Binary(n);
        }
        if let Some(n) = s.strip_prefix("0x").and_then(|d| parse_radix(d, 16)) {
            return NumberLiteral::Hex(n);
        }
        if let Ok(f) = s.parse::<f64>() {
            return NumberLiteral::Float(f);
        }
        NumberLiteral::NotANumber
    }

    pub fn is_number(&self) -> bool {
        !matches!(self, NumberLiteral::NotANumber)
    }

    /// Shift by `delta`, keeping the notation. Integer overflow degrades to float.
    pub fn offset(self, delta: i64) -> Self {
        let bump = |n: i64| n.checked_add(delta);
        match self {
            NumberLiteral::Int(n) => bump(n)
                .map(NumberLiteral::Int)
                .unwrap_or(NumberLiteral::Float(n as f64 + delta as f64)),
            NumberLiteral::Hex(n) => bump(n)
                .map(NumberLiteral::Hex)
                .unwrap_or(NumberLiteral::Float(n as f64 + delta as f64)),
            NumberLiteral::Binary(n) => bump(n)
                .map(NumberLiteral::Binary)
                .unwrap_or(NumberLiteral::Float(n as f64 + delta as f64)),
            NumberLiteral::Float(f) => NumberLiteral::Float(f + delta as f64),
            NumberLiteral::NotANumber => NumberLiteral::NotANumber,
        }
    }

    pub fn render(&self) -> String {
        match *self {
            NumberLiteral::Int(n) => n.to_string(),
            NumberLiteral::Hex(n) => signed_radix(n, "0x", |m| format!("{m:x}")),
            NumberLiteral::Binary(n) => signed_radix(n, "0b", |m| format!("{m:b}")),
            NumberLiteral::Float(f) if f.is_nan() => "nan".to_string(),
            NumberLiteral::Float(f) if f.is_infinite() => {
                if f > 0.0 { "inf" } else { "-inf" }.to_string()
            }
            NumberLiteral::Float(f) => format!("{f:?}"),
            NumberLiteral::NotANumber => String::new(),
        }
    }
}

fn parse_radix(digits: &str, radix: u32) -> Option<i64> {
    if digits.is_empty() || digits.starts_with(['-', '+']) {
        return None;
    }
    i64::from_str_radix(digits, radix).ok()
}

fn signed_radix(n: i64, prefix: &str, fmt: impl Fn(u64) -> String) -> String {
    let sign = if n < 0 { "-" } else { "" };
    format!("{sign}{prefix}{}", fmt(n.unsigned_abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump(s: &str, d: i64) -> String {
        NumberLiteral::parse(s).offset(d).render()
    }

    #[test]
    fn tries_notations_in_order() {
        assert_eq!(NumberLiteral::parse("42"), NumberLiteral::Int(42));
        assert_eq!(NumberLiteral::parse("-7"), NumberLiteral::Int(-7));
        assert_eq!(NumberLiteral::parse("0b101"), NumberLiteral::Binary(5));
        assert_eq!(NumberLiteral::parse("0x1f"), NumberLiteral::Hex(31));
        assert_eq!(NumberLiteral::parse("1.5"), NumberLiteral::Float(1.5));
        assert_eq!(NumberLiteral::parse("beer"), NumberLiteral::NotANumber);
        assert_eq!(NumberLiteral::parse("0b"), NumberLiteral::NotANumber);
        assert_eq!(NumberLiteral::parse("0x-1"), NumberLiteral::NotANumber);
        assert_eq!(NumberLiteral::parse("a.b-c"), NumberLiteral::NotANumber);
    }

    #[test]
    fn offsets_keep_notation() {
        assert_eq!(bump("41", 1), "42");
        assert_eq!(bump("0x1f", 1), "0x20");
        assert_eq!(bump("0b101", -1), "0b100");
        assert_eq!(bump("0x0", -1), "-0x1");
        assert_eq!(bump("1.5", 1), "2.5");
        assert_eq!(bump("2.0", 1), "3.0");
        assert_eq!(bump("inf", 1), "inf");
    }

    #[test]
    fn integer_overflow_degrades_to_float() {
        let max = i64::MAX.to_string();
        assert!(matches!(
            NumberLiteral::parse(&max).offset(1),
            NumberLiteral::Float(_)
        ));
    }
}
