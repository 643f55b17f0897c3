//! Integer and real numbers.

use crate::object::{object, Object, ObjectLike};
use crate::reader::{Readable, Reader, ReaderContext, Skippable};

/// A PDF number: an integer or a real.
///
/// PDF reals have no exponent syntax; a number with a decimal point is a
/// real, everything else an integer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Number {
    /// An integer.
    Int(i64),
    /// A real number.
    Real(f64),
}

impl Number {
    /// The value as an f64.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Real(r) => *r,
        }
    }

    /// The value as an f32.
    #[inline]
    pub fn as_f32(&self) -> f32 {
        self.as_f64() as f32
    }

    /// The value as an i64. Reals are rounded to the nearest integer.
    #[inline]
    pub fn as_i64(&self) -> i64 {
        match self {
            Number::Int(i) => *i,
            Number::Real(r) => r.round() as i64,
        }
    }
}

object!(Number, Number);

impl Skippable for Number {
    fn skip(r: &mut Reader<'_>, _: bool) -> Option<()> {
        let _ = r.eat(|b| b == b'+' || b == b'-');

        let mut digits = 0;
        while r.eat(|b| b.is_ascii_digit()).is_some() {
            digits += 1;
        }

        if r.eat(|b| b == b'.').is_some() {
            while r.eat(|b| b.is_ascii_digit()).is_some() {
                digits += 1;
            }
        }

        if digits == 0 {
            return None;
        }

        Some(())
    }
}

impl Readable<'_> for Number {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        let negative = match r.peek_byte()? {
            b'+' => {
                r.forward();
                false
            }
            b'-' => {
                r.forward();
                true
            }
            _ => false,
        };

        let mut int_part: i64 = 0;
        let mut digits = 0;

        while let Some(b) = r.eat(|b| b.is_ascii_digit()) {
            int_part = int_part
                .saturating_mul(10)
                .saturating_add(i64::from(b - b'0'));
            digits += 1;
        }

        if r.eat(|b| b == b'.').is_some() {
            let mut frac: i64 = 0;
            let mut frac_digits = 0i32;

            while let Some(b) = r.eat(|b| b.is_ascii_digit()) {
                // Digits beyond the precision of an i64 cannot influence
                // the value anymore.
                if frac_digits < 18 {
                    frac = frac * 10 + i64::from(b - b'0');
                    frac_digits += 1;
                }
                digits += 1;
            }

            if digits == 0 {
                return None;
            }

            let v = int_part as f64 + frac as f64 / 10f64.powi(frac_digits);

            Some(Number::Real(if negative { -v } else { v }))
        } else {
            if digits == 0 {
                return None;
            }

            Some(Number::Int(if negative { -int_part } else { int_part }))
        }
    }
}

macro_rules! int_object {
    ($($t:ty),*) => {
        $(
            impl<'a> TryFrom<Object<'a>> for $t {
                type Error = ();

                fn try_from(value: Object<'a>) -> Result<Self, ()> {
                    let num: Number = value.try_into()?;
                    <$t>::try_from(num.as_i64()).map_err(|_| ())
                }
            }

            impl<'a> Readable<'a> for $t {
                fn read(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Self> {
                    <$t>::try_from(Number::read(r, ctx)?.as_i64()).ok()
                }
            }

            impl<'a> ObjectLike<'a> for $t {}
        )*
    };
}

int_object!(u8, u16, u32, i32, i64, usize);

macro_rules! float_object {
    ($($t:ty),*) => {
        $(
            impl<'a> TryFrom<Object<'a>> for $t {
                type Error = ();

                fn try_from(value: Object<'a>) -> Result<Self, ()> {
                    let num: Number = value.try_into()?;
                    Ok(num.as_f64() as $t)
                }
            }

            impl<'a> Readable<'a> for $t {
                fn read(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Self> {
                    Some(Number::read(r, ctx)?.as_f64() as $t)
                }
            }

            impl<'a> ObjectLike<'a> for $t {}
        )*
    };
}

float_object!(f32, f64);

#[cfg(test)]
mod tests {
    use crate::object::Number;
    use crate::reader::Readable;

    fn num(data: &[u8]) -> Option<Number> {
        Number::from_bytes(data)
    }

    #[test]
    fn integer_1() {
        assert_eq!(num(b"42"), Some(Number::Int(42)));
    }

    #[test]
    fn integer_2() {
        assert_eq!(num(b"-17"), Some(Number::Int(-17)));
    }

    #[test]
    fn integer_3() {
        assert_eq!(num(b"+9"), Some(Number::Int(9)));
    }

    #[test]
    fn real_1() {
        assert_eq!(num(b"34.5"), Some(Number::Real(34.5)));
    }

    #[test]
    fn real_2() {
        assert_eq!(num(b"-.002"), Some(Number::Real(-0.002)));
    }

    #[test]
    fn real_3() {
        assert_eq!(num(b"4."), Some(Number::Real(4.0)));
    }

    #[test]
    fn real_4() {
        assert_eq!(num(b".5"), Some(Number::Real(0.5)));
    }

    #[test]
    fn sign_only() {
        assert!(num(b"-").is_none());
        assert!(num(b"+").is_none());
        assert!(num(b".").is_none());
    }

    #[test]
    fn int_conversion() {
        assert_eq!(i32::from_bytes(b"123"), Some(123));
        assert_eq!(u8::from_bytes(b"300"), None);
        // Integer contexts accept reals leniently.
        assert_eq!(i32::from_bytes(b"2.6"), Some(3));
    }
}
