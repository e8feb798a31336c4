//! Plain-text row format for distance matrices.
//!
//! ```text
//! 0,1.5,2.25
//! 1.5,0,0.333333
//! 2.25,0.333333,0
//! ```
//!
//! One line per row, values separated by `,`, `.` as decimal separator, no
//! grouping, at most [`MAX_FRACTION_DIGITS`] fractional digits with trailing
//! zeros dropped.

use crate::constants::format::{MAX_FRACTION_DIGITS, SEPARATOR};
use crate::error::{MeanShiftError, Result};

/// Format a single value.
pub fn format_value(value: f32) -> String {
    let mut s = format!("{:.*}", MAX_FRACTION_DIGITS, value);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Format a full row without a trailing newline.
pub fn format_row(row: &[f32]) -> String {
    let mut line = String::with_capacity(row.len() * (MAX_FRACTION_DIGITS + 3));
    for (j, &v) in row.iter().enumerate() {
        if j > 0 {
            line.push(SEPARATOR);
        }
        line.push_str(&format_value(v));
    }
    line
}

/// Parse one row. `line_no` is 1-based and only used in error messages.
pub fn parse_row(line: &str, line_no: usize) -> Result<Vec<f32>> {
    line.split(SEPARATOR)
        .map(|piece| {
            let piece = piece.trim();
            piece.parse::<f32>().map_err(|_| {
                MeanShiftError::invalid_format(line_no, format!("bad number '{}'", piece))
            })
        })
        .collect()
}
