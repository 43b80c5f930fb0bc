use num::Float;

const POW10: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
    1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

// Largest mantissa that still accepts another decimal digit without overflow.
const MANTISSA_LIMIT: u64 = (u64::MAX - 9) / 10;

pub fn is_space(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

pub fn is_token_end(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | 0)
}

/// Parses `sign? digit+ ('.' digit*)? (('e'|'E') sign? digit+)?` from the
/// start of `s`, stopping at the first byte outside the grammar.
///
/// Returns `None` when `s` is empty, starts with neither a sign nor a digit,
/// has no integer digits, or has an exponent marker without digits.
pub fn try_parse_double(s: &[u8]) -> Option<f64> {
    let mut i = 0;
    let negative = match *s.first()? {
        b'+' => {
            i += 1;
            false
        }
        b'-' => {
            i += 1;
            true
        }
        b if b.is_ascii_digit() => false,
        _ => return None,
    };

    let mut mantissa: u64 = 0;
    let mut exponent: i32 = 0;

    let mut integer_digits = 0;
    while let Some(digit) = s.get(i).filter(|b| b.is_ascii_digit()) {
        if mantissa <= MANTISSA_LIMIT {
            mantissa = mantissa * 10 + u64::from(digit - b'0');
        } else {
            exponent = exponent.saturating_add(1);
        }
        integer_digits += 1;
        i += 1;
    }
    if integer_digits == 0 {
        return None;
    }

    if s.get(i) == Some(&b'.') {
        i += 1;
        while let Some(digit) = s.get(i).filter(|b| b.is_ascii_digit()) {
            if mantissa <= MANTISSA_LIMIT {
                mantissa = mantissa * 10 + u64::from(digit - b'0');
                exponent = exponent.saturating_sub(1);
            }
            i += 1;
        }
    }

    if matches!(s.get(i), Some(b'e' | b'E')) {
        i += 1;
        let exponent_negative = match s.get(i) {
            Some(b'+') => {
                i += 1;
                false
            }
            Some(b'-') => {
                i += 1;
                true
            }
            _ => false,
        };

        let mut written: i32 = 0;
        let mut exponent_digits = 0;
        while let Some(digit) = s.get(i).filter(|b| b.is_ascii_digit()) {
            written = written
                .saturating_mul(10)
                .saturating_add(i32::from(digit - b'0'));
            exponent_digits += 1;
            i += 1;
        }
        if exponent_digits == 0 {
            return None;
        }

        exponent = if exponent_negative {
            exponent.saturating_sub(written)
        } else {
            exponent.saturating_add(written)
        };
    }

    let value = scale_by_power_of_ten(mantissa, exponent);
    Some(if negative { -value } else { value })
}

fn scale_by_power_of_ten(mantissa: u64, exponent: i32) -> f64 {
    let m = mantissa as f64;
    if mantissa == 0 {
        return 0.0;
    }

    match exponent {
        0 => m,
        1..=22 => m * POW10[exponent as usize],
        -22..=-1 => m / POW10[exponent.unsigned_abs() as usize],
        e if e > 22 => m * 10f64.powi(e),
        e => (m / POW10[22]) * 10f64.powi(e + 22),
    }
}

/// `atoi` semantics: optional sign, then digits; `0` when no digit follows.
pub fn parse_leading_int(s: &[u8]) -> i64 {
    let (negative, digits) = match s.first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let magnitude = digits
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i64, |acc, b| {
            acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
        });

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Forward-only cursor over the bytes of one line.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied().filter(|&b| b != 0)
    }

    pub fn skip_space(&mut self) {
        while self.current().is_some_and(is_space) {
            self.pos += 1;
        }
    }

    /// True at end of span, NUL, CR or LF.
    pub fn at_line_end(&self) -> bool {
        matches!(self.current(), None | Some(b'\r' | b'\n'))
    }

    /// Skips leading spaces and returns the bytes up to the next token end.
    pub fn next_token(&mut self) -> &'a [u8] {
        self.skip_space();
        let start = self.pos;
        while self.current().is_some_and(|b| !is_token_end(b)) {
            self.pos += 1;
        }
        &self.bytes[start..self.pos]
    }

    pub fn try_parse_real<F: Float>(&mut self) -> Option<F> {
        let token = self.next_token();
        try_parse_double(token).and_then(num::cast)
    }

    pub fn parse_real<F: Float>(&mut self, default: F) -> F {
        self.try_parse_real().unwrap_or(default)
    }

    pub fn parse_int(&mut self) -> i64 {
        parse_leading_int(self.next_token())
    }

    /// Remainder of the line with surrounding whitespace removed.
    pub fn rest(&mut self) -> &'a [u8] {
        self.skip_space();
        let start = self.pos;
        let end = self.bytes[start..]
            .iter()
            .position(|&b| b == 0)
            .map_or(self.bytes.len(), |offset| start + offset);
        self.pos = end;
        self.bytes[start..end].trim_ascii_end()
    }
}
