//! Minimal tokenizers for the MaxMind CSV dialect and for dotted-quad /
//! header parsing. Deliberately not a general CSV parser: no escaped quotes,
//! no multi-line fields. Ported from the original `csv.hpp`.

use smallvec::SmallVec;

/// Fields of one CSV line. Stack-allocated up to 9 (the widest parser,
/// `location.csv`'s) before spilling to the heap.
pub type Fields<'a> = SmallVec<[&'a str; 9]>;

/// Parse a leading run of decimal digits as `u32`, like C's `strtoul(s, 0,
/// 10)`: stops at the first non-digit, and returns 0 if there were no
/// digits at all (instead of erroring).
pub fn to_u(s: &str) -> u32 {
    let digits: String = s.trim_start().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Split a single CSV line into fields.
///
/// Fields are separated by `,`; a field beginning with `"` runs until the
/// next `"` (no escaping of embedded quotes); otherwise a field runs until
/// the next `,` or end of line.
pub fn csv_split(line: &str) -> Fields<'_> {
    let bytes = line.as_bytes();
    let mut toks = Fields::new();
    let mut i = 0usize;

    if bytes.is_empty() {
        return toks;
    }

    loop {
        if i >= bytes.len() {
            toks.push("");
            break;
        }

        if bytes[i] == b'"' {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && bytes[j] != b'"' {
                j += 1;
            }
            toks.push(&line[start..j]);
            i = if j < bytes.len() { j + 1 } else { j };
        } else {
            let start = i;
            let mut j = i;
            while j < bytes.len() && bytes[j] != b',' {
                j += 1;
            }
            toks.push(&line[start..j]);
            i = j;
        }

        if i >= bytes.len() {
            break;
        }
        // consume the separating comma
        i += 1;
    }

    toks
}

/// Split on a single character with no quote handling at all.
pub fn char_split(s: &str, delim: char) -> Vec<&str> {
    s.split(delim).collect()
}
