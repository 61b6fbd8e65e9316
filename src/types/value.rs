//! Runtime values

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use num::bigint::Sign;
use num::{BigInt, Integer, Signed, ToPrimitive, Zero};

/// Arbitrary-precision decimal, represented as `unscaled * 10 ^ -scale`.
#[derive(Debug, Clone)]
pub struct Decimal {
    unscaled: BigInt,
    scale: u32,
}

impl Decimal {
    pub fn new(unscaled: impl Into<BigInt>, scale: u32) -> Self {
        Self {
            unscaled: unscaled.into(),
            scale,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.unscaled.is_zero()
    }

    /// Nearest double; infinite when the magnitude exceeds `f64::MAX`
    pub fn to_f64(&self) -> f64 {
        format!("{}e-{}", self.unscaled, self.scale)
            .parse::<f64>()
            .unwrap_or(f64::NAN)
    }

    fn rescaled(&self, scale: u32) -> BigInt {
        debug_assert!(scale >= self.scale);
        &self.unscaled * pow10(scale - self.scale)
    }

    pub fn add(&self, other: &Decimal) -> Decimal {
        let scale = self.scale.max(other.scale);
        Decimal::new(self.rescaled(scale) + other.rescaled(scale), scale)
    }

    pub fn sub(&self, other: &Decimal) -> Decimal {
        let scale = self.scale.max(other.scale);
        Decimal::new(self.rescaled(scale) - other.rescaled(scale), scale)
    }

    pub fn mul(&self, other: &Decimal) -> Decimal {
        Decimal::new(&self.unscaled * &other.unscaled, self.scale + other.scale)
    }

    /// Quotient at the dividend's scale, rounded half to even.
    /// Returns `None` on a zero divisor.
    pub fn div(&self, other: &Decimal) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        let numerator = &self.unscaled * pow10(other.scale);
        let unscaled = div_half_even(&numerator, &other.unscaled);
        Some(Decimal::new(unscaled, self.scale))
    }
}

fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u8).pow(exp)
}

fn div_half_even(numerator: &BigInt, denominator: &BigInt) -> BigInt {
    let (quotient, remainder) = numerator.div_rem(denominator);
    if remainder.is_zero() {
        return quotient;
    }
    let step = if numerator.is_negative() != denominator.is_negative() {
        BigInt::from(-1)
    } else {
        BigInt::from(1)
    };
    let twice = remainder.abs() * 2u8;
    match twice.cmp(&denominator.abs()) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + step,
        Ordering::Equal if quotient.is_even() => quotient,
        Ordering::Equal => quotient + step,
    }
}

/// Numeric equality: `1.0 == 1.00`. Scale is ignored, unlike a
/// scale-sensitive decimal `equals`, so `==`, `!=` and SWITCH matching agree
/// with `<` and `>`.
impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        self.rescaled(scale).cmp(&other.rescaled(scale))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.abs().to_string();
        let sign = if self.unscaled.sign() == Sign::Minus { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError(String);

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal: {}", self.0)
    }
}

impl std::error::Error for ParseDecimalError {}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_string());
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        let unsigned = int_part.strip_prefix(['-', '+']).unwrap_or(int_part);
        if unsigned.is_empty() || !digits_only(unsigned) || !digits_only(frac_part) {
            return Err(err());
        }
        let scale = u32::try_from(frac_part.len()).map_err(|_| err())?;
        let unscaled = format!("{}{}", int_part, frac_part)
            .parse::<BigInt>()
            .map_err(|_| err())?;
        Ok(Decimal::new(unscaled, scale))
    }
}

/// A runtime value.
///
/// Values carry no static type; the interpreter dispatches on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(Decimal),
    Character(char),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Name of the runtime tag, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "Nil",
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::Decimal(_) => "Decimal",
            Self::Character(_) => "Character",
            Self::String(_) => "String",
            Self::List(_) => "List",
        }
    }

    /// Exit status for a program result
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Integer(n) => n
                .to_i32()
                .unwrap_or(if n.is_negative() { i32::MIN } else { i32::MAX }),
            _ => 0,
        }
    }

    /// Ordering between two values of the same orderable kind
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Decimal(a), Self::Decimal(b)) => Some(a.cmp(b)),
            (Self::Character(a), Self::Character(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(BigInt::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// Textual form, as written by `print`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Character(c) => write!(f, "{}", c),
            Self::String(s) => write!(f, "{}", s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}
