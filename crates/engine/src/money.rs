use std::str::FromStr;

use crate::EngineError;

/// A decimal amount typed by a person, converted to the integer cents the
/// engine stores.
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10,5".parse::<Money>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Money(i64);

impl Money {
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Amounts moved by an operation must be strictly positive.
    pub fn parse_positive(input: &str) -> Result<Money, EngineError> {
        let amount: Money = input.parse()?;
        if amount.0 <= 0 {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }
        Ok(amount)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// `.` or `,` separate the centavos; at most two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::Validation(format!("invalid amount '{}'", s.trim()));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (units, fraction) = match digits.split_once(['.', ',']) {
            Some((units, fraction)) => (units, fraction),
            None => (digits, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if units.is_empty() || !all_digits(units) || !all_digits(fraction) {
            return Err(invalid());
        }
        if fraction.len() > 2 {
            return Err(EngineError::Validation("too many decimals".to_string()));
        }

        let units: i64 = units.parse().map_err(|_| invalid())?;
        let centavos: i64 = format!("{fraction:0<2}").parse().map_err(|_| invalid())?;
        let cents = units
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(centavos))
            .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(raw: &str) -> i64 {
        raw.parse::<Money>().unwrap().cents()
    }

    #[test]
    fn either_separator_is_accepted() {
        assert_eq!(cents("10"), 1_000);
        assert_eq!(cents("10.5"), 1_050);
        assert_eq!(cents("10,50"), 1_050);
        assert_eq!(cents("7."), 700);
        assert_eq!(cents(" +1.00 "), 100);
        assert_eq!(cents("-0.01"), -1);
    }

    #[test]
    fn malformed_amounts_are_rejected() {
        for raw in ["", "-", "abc", ".5", "1.2.3", "1,2.3", "12.345", "1 000", "--1"] {
            assert!(raw.parse::<Money>().is_err(), "{raw:?} should not parse");
        }
        assert!("92233720368547758.07".parse::<Money>().is_err());
    }

    #[test]
    fn operation_amounts_must_be_positive() {
        assert_eq!(Money::parse_positive("0.01").unwrap().cents(), 1);
        assert!(Money::parse_positive("0").is_err());
        assert!(Money::parse_positive("-5").is_err());
    }
}
