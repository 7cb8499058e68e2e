//! Token scanning over a byte cursor
//!
//! Text inputs are ASCII: decimal integers, optional signs, simple floats,
//! and `%`/`#` comments running to end of line. The scanner decodes tokens
//! and navigates between them without ever reading past the cursor's end.
//! Comment skipping is interleaved with integer seeking, so comments may
//! appear anywhere between tokens.
//!
//! Every navigation primitive stops silently at the end of the region;
//! truncated trailing tokens are simply not read.

use crate::cursor::Cursor;
use crate::traits::Label;

const fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

const fn is_fp_char(b: u8) -> bool {
    matches!(b, b'0'..=b'9' | b'e' | b'E' | b'-' | b'+' | b'.')
}

fn pow10(k: u32) -> f64 {
    let mut r = 1.0f64;
    let mut i = 0;
    while i < k {
        r *= 10.0;
        i += 1;
    }
    r
}

impl<'a> Cursor<'a> {
    /// Skip any run of comment lines starting at the cursor
    pub fn skip_comments(&mut self) {
        while matches!(self.peek(), Some(b'%') | Some(b'#')) {
            while let Some(b) = self.peek() {
                self.advance(1);
                if b == b'\n' {
                    break;
                }
            }
        }
    }

    /// Skip a run of spaces and tabs
    pub fn skip_space_tab(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.advance(1);
        }
    }

    /// Read a whitespace-delimited word, advancing past it
    pub fn read_word(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'\t' | b'\r' | b'\n') {
                break;
            }
            self.advance(1);
        }
        self.slice(start, self.pos)
    }

    /// Decode an unsigned decimal integer
    ///
    /// Skips to the first digit, then folds digits until the first
    /// non-digit. Overflow wraps; the caller chooses a wide enough type.
    pub fn read_unsigned<T: Label>(&mut self) -> T {
        while let Some(b) = self.peek() {
            if is_digit(b) {
                break;
            }
            self.advance(1);
        }
        let mut v = T::ZERO;
        while let Some(b) = self.peek() {
            if !is_digit(b) {
                break;
            }
            v = v.fold_digit(b - b'0');
            self.advance(1);
        }
        v
    }

    /// Decode a signed decimal integer with an optional leading sign
    ///
    /// The cursor must already be at the sign or first digit.
    pub fn read_signed(&mut self) -> i64 {
        let negative = match self.peek() {
            Some(b'-') => {
                self.advance(1);
                true
            }
            Some(b'+') => {
                self.advance(1);
                false
            }
            _ => false,
        };
        let magnitude: u64 = self.read_unsigned();
        if negative {
            -(magnitude as i64)
        } else {
            magnitude as i64
        }
    }

    /// Decode a floating point value
    ///
    /// Grammar: `[+-]?D*('.'D*)?([eE][+-]?D+)?`, folded as the integer part
    /// plus `frac / 10^k`, scaled by `10^exp`. Close enough for graph
    /// weights; the last couple of ULPs are not guaranteed. The cursor must
    /// already be at the first character of the number.
    pub fn read_float(&mut self) -> f64 {
        let negative = match self.peek() {
            Some(b'-') => {
                self.advance(1);
                true
            }
            Some(b'+') => {
                self.advance(1);
                false
            }
            _ => false,
        };
        let mut v = 0.0f64;
        while let Some(b) = self.peek() {
            if !is_digit(b) {
                break;
            }
            v = v * 10.0 + f64::from(b - b'0');
            self.advance(1);
        }
        if self.peek() == Some(b'.') {
            self.advance(1);
            let mut frac = 0.0f64;
            let mut digits = 0u32;
            while let Some(b) = self.peek() {
                if !is_digit(b) {
                    break;
                }
                frac = frac * 10.0 + f64::from(b - b'0');
                digits += 1;
                self.advance(1);
            }
            if digits > 0 {
                v += frac / pow10(digits);
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            self.advance(1);
            let exp_negative = match self.peek() {
                Some(b'-') => {
                    self.advance(1);
                    true
                }
                Some(b'+') => {
                    self.advance(1);
                    false
                }
                _ => false,
            };
            let mut exp = 0u32;
            while let Some(b) = self.peek() {
                if !is_digit(b) {
                    break;
                }
                exp = exp.wrapping_mul(10).wrapping_add(u32::from(b - b'0'));
                self.advance(1);
            }
            if exp_negative {
                v /= pow10(exp);
            } else {
                v *= pow10(exp);
            }
        }
        if negative {
            -v
        } else {
            v
        }
    }

    /// Move past the digits of the current integer
    pub fn move_to_non_int(&mut self) {
        while let Some(b) = self.peek() {
            if !is_digit(b) {
                break;
            }
            self.advance(1);
        }
    }

    /// Move to the first digit at or after the cursor, skipping comments
    pub fn move_to_first_int(&mut self) {
        self.skip_comments();
        while let Some(b) = self.peek() {
            if is_digit(b) {
                break;
            }
            self.advance(1);
            self.skip_comments();
        }
    }

    /// Move through the current integer and on to the next one
    pub fn move_to_next_int(&mut self) {
        self.move_to_non_int();
        self.move_to_first_int();
    }

    /// Move through the current value and on to the next integer or sign
    pub fn move_to_next_signed_int(&mut self) {
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.advance(1);
        }
        self.move_to_non_int();
        self.skip_comments();
        while let Some(b) = self.peek() {
            if is_digit(b) || b == b'+' || b == b'-' {
                break;
            }
            self.advance(1);
            self.skip_comments();
        }
    }

    /// Move to the next character that can start a floating point value
    pub fn move_to_fp(&mut self) {
        while let Some(b) = self.peek() {
            if is_fp_char(b) {
                break;
            }
            self.advance(1);
        }
    }

    /// Move past the current run of floating point characters
    pub fn move_to_non_fp(&mut self) {
        while let Some(b) = self.peek() {
            if !is_fp_char(b) {
                break;
            }
            self.advance(1);
        }
    }

    /// Move to the next newline (or the end of the region)
    pub fn move_to_eol(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.advance(1);
        }
    }

    /// True when only spaces or carriage returns remain before the newline
    pub fn at_end_of_line(&self) -> bool {
        let mut probe = *self;
        while let Some(b) = probe.peek() {
            if b == b'\n' {
                break;
            }
            if b != b' ' && b != b'\r' {
                return false;
            }
            probe.advance(1);
        }
        true
    }

    /// Count the separating gaps between numeric tokens up to end of line
    ///
    /// Advances to the newline. A line holding `k` numeric tokens reports
    /// `k - 1`; trailing whitespace and comments do not count as a gap.
    pub fn count_spaces_to_eol(&mut self) -> usize {
        let mut gaps = 0;
        loop {
            // Find the next token start on this line
            while let Some(b) = self.peek() {
                if b == b'\n' || b == b'%' || b == b'#' || is_digit(b) {
                    break;
                }
                self.advance(1);
            }
            match self.peek() {
                None | Some(b'\n') => break,
                Some(b'%') | Some(b'#') => {
                    self.move_to_eol();
                    break;
                }
                _ => {}
            }
            // Read through the token
            while let Some(b) = self.peek() {
                if !is_digit(b) && b != b'.' {
                    break;
                }
                self.advance(1);
            }
            match self.peek() {
                None | Some(b'\n') => break,
                Some(b'%') | Some(b'#') => {
                    self.move_to_eol();
                    break;
                }
                _ => {}
            }
            gaps += 1;
            while self.peek() == Some(b' ') {
                self.advance(1);
            }
            // Un-count a gap that turned out to be trailing whitespace
            match self.peek() {
                None | Some(b'\n') => {
                    gaps -= 1;
                    break;
                }
                Some(b'%') | Some(b'#') => {
                    gaps -= 1;
                    self.move_to_eol();
                    break;
                }
                _ => {}
            }
        }
        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_decoding_stops_at_non_digits() {
        let mut c = Cursor::new(b"  1234x");
        assert_eq!(c.read_unsigned::<u32>(), 1234);
        assert_eq!(c.peek(), Some(b'x'));
    }

    #[test]
    fn unsigned_overflow_wraps() {
        let mut c = Cursor::new(b"300");
        let v: u32 = c.read_unsigned();
        assert_eq!(v, 300);
        let mut c = Cursor::new(b"4294967296");
        let v: u32 = c.read_unsigned();
        assert_eq!(v, 0);
    }

    #[test]
    fn signed_decoding() {
        let mut c = Cursor::new(b"-42");
        assert_eq!(c.read_signed(), -42);
        let mut c = Cursor::new(b"+7");
        assert_eq!(c.read_signed(), 7);
        let mut c = Cursor::new(b"9");
        assert_eq!(c.read_signed(), 9);
    }

    #[test]
    fn float_decoding() {
        let mut c = Cursor::new(b"0.5");
        assert_eq!(c.read_float(), 0.5);
        let mut c = Cursor::new(b"-2.25");
        assert_eq!(c.read_float(), -2.25);
        let mut c = Cursor::new(b"1e3");
        assert_eq!(c.read_float(), 1000.0);
        let mut c = Cursor::new(b"2.5e-2");
        assert_eq!(c.read_float(), 0.025);
        let mut c = Cursor::new(b".5");
        assert_eq!(c.read_float(), 0.5);
        let mut c = Cursor::new(b"3.");
        assert_eq!(c.read_float(), 3.0);
    }

    #[test]
    fn comments_are_skipped_between_integers() {
        let mut c = Cursor::new(b"% header\n# more\n12 34");
        c.move_to_first_int();
        assert_eq!(c.read_unsigned::<u32>(), 12);
        c.move_to_next_int();
        assert_eq!(c.read_unsigned::<u32>(), 34);
    }

    #[test]
    fn comments_between_tokens_mid_stream() {
        let mut c = Cursor::new(b"5 % trailing\n6");
        assert_eq!(c.read_unsigned::<u32>(), 5);
        c.move_to_next_int();
        assert_eq!(c.read_unsigned::<u32>(), 6);
    }

    #[test]
    fn signed_seeking_stops_at_signs() {
        let mut c = Cursor::new(b"17 -3");
        c.move_to_next_signed_int();
        assert_eq!(c.read_signed(), -3);
    }

    #[test]
    fn eol_probing() {
        let c = Cursor::new(b"  \r\nrest");
        assert!(c.at_end_of_line());
        let c = Cursor::new(b" 5\n");
        assert!(!c.at_end_of_line());
        let mut c = Cursor::new(b"1 2 3  \nnext");
        assert_eq!(c.count_spaces_to_eol(), 2);
        assert_eq!(c.peek(), Some(b'\n'));
        let mut c = Cursor::new(b"8\n");
        assert_eq!(c.count_spaces_to_eol(), 0);
        let mut c = Cursor::new(b"1 2 % note\n");
        assert_eq!(c.count_spaces_to_eol(), 1);
    }

    #[test]
    fn truncated_numbers_stop_silently() {
        let mut c = Cursor::new(b"12");
        c.move_to_next_int();
        assert!(!c.good());
        let mut c = Cursor::new(b"");
        assert_eq!(c.read_unsigned::<u64>(), 0);
        assert!(!c.good());
    }
}
