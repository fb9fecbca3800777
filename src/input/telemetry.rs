//! micro:bit telemetry lines: `<p0>,<p1>,<s>\n`

/// One parsed telemetry record
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Telemetry {
    pub p0: i32,
    pub p1: i32,
    pub s: f32,
}

/// Splits a byte stream into lines and parses the complete ones.
#[derive(Default)]
pub struct TelemetryParser {
    pending: Vec<u8>,
}

impl TelemetryParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record completed by it. A trailing
    /// partial line stays buffered until its newline arrives.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Telemetry> {
        self.pending.extend_from_slice(bytes);

        let mut records = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.pending[start..end]);
            let line = line.trim();
            if !line.is_empty() {
                match parse_line(line) {
                    Some(t) => records.push(t),
                    None => tracing::debug!(line, "dropped malformed telemetry"),
                }
            }
            start = end + 1;
        }
        self.pending.drain(..start);
        records
    }

    /// Bytes still waiting for a newline
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// Parse one trimmed line. Lines with fewer than three fields give `None`.
pub fn parse_line(line: &str) -> Option<Telemetry> {
    let mut fields = line.split(',');
    let (a, b, c) = (fields.next()?, fields.next()?, fields.next()?);
    Some(Telemetry {
        p0: to_int32(to_number(a)),
        p1: to_int32(to_number(b)),
        s: sound_level(to_number(c)),
    })
}

/// Lenient numeric coercion: blank is zero, garbage is NaN
fn to_number(field: &str) -> f64 {
    let field = field.trim();
    if field.is_empty() {
        return 0.0;
    }
    let radix = match field.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&field[2..], radix)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    field.parse::<f64>().unwrap_or(f64::NAN)
}

/// Truncate toward zero and wrap into 32 bits. Non-finite values are zero.
fn to_int32(v: f64) -> i32 {
    if !v.is_finite() {
        return 0;
    }
    const TWO_32: f64 = 4_294_967_296.0;
    let m = v.trunc().rem_euclid(TWO_32);
    if m >= TWO_32 / 2.0 {
        (m - TWO_32) as i32
    } else {
        m as i32
    }
}

fn sound_level(v: f64) -> f32 {
    if v.is_finite() {
        v.max(0.0) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_line() {
        assert_eq!(parse_line("1,0,57"), Some(Telemetry { p0: 1, p1: 0, s: 57.0 }));
    }

    #[test]
    fn short_lines_are_rejected() {
        assert_eq!(parse_line("1,0"), None);
        assert_eq!(parse_line("1"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn pins_truncate_toward_zero() {
        let t = parse_line("1.9,-1.7,3").unwrap();
        assert_eq!(t.p0, 1);
        assert_eq!(t.p1, -1);
    }

    #[test]
    fn non_numeric_fields_are_zero() {
        let t = parse_line("on,,loud").unwrap();
        assert_eq!(t, Telemetry { p0: 0, p1: 0, s: 0.0 });
        assert_eq!(parse_line("1,1,NaN").unwrap().s, 0.0);
        assert_eq!(parse_line("inf,1,inf").unwrap().p0, 0);
    }

    #[test]
    fn sound_is_clamped_non_negative() {
        assert_eq!(parse_line("0,0,-40").unwrap().s, 0.0);
        assert_eq!(parse_line("0,0,212.5").unwrap().s, 212.5);
    }

    #[test]
    fn pins_wrap_like_32_bit_ints() {
        assert_eq!(parse_line("4294967297,2147483648,0").unwrap().p0, 1);
        assert_eq!(parse_line("0,2147483648,0").unwrap().p1, i32::MIN);
        assert_eq!(parse_line("0x1,0b1,0x10").unwrap(), Telemetry { p0: 1, p1: 1, s: 16.0 });
    }

    #[test]
    fn extra_fields_ignored() {
        assert_eq!(parse_line(" 1 , 1 , 250 ,9").unwrap(), Telemetry { p0: 1, p1: 1, s: 250.0 });
    }

    #[test]
    fn partial_lines_stay_pending() {
        let mut parser = TelemetryParser::new();
        assert!(parser.feed(b"1,0,4").is_empty());
        assert_eq!(parser.pending(), b"1,0,4");

        let out = parser.feed(b"0\r\n0,1,");
        assert_eq!(out, vec![Telemetry { p0: 1, p1: 0, s: 40.0 }]);
        assert_eq!(parser.pending(), b"0,1,");

        let out = parser.feed(b"9\n\n  \nbad\n1,1,300\n");
        assert_eq!(
            out,
            vec![
                Telemetry { p0: 0, p1: 1, s: 9.0 },
                Telemetry { p0: 1, p1: 1, s: 300.0 },
            ]
        );
        assert!(parser.pending().is_empty());
    }

    #[test]
    fn multibyte_split_across_reads() {
        let mut parser = TelemetryParser::new();
        let bytes = "1,1,5\u{e9}\n".as_bytes();
        let (head, tail) = bytes.split_at(bytes.len() - 2);
        assert!(parser.feed(head).is_empty());
        let out = parser.feed(tail);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].s, 0.0);
    }
}
