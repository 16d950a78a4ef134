//! # Whitespace-delimited column reader
//!
//! Minimal parser for the flat observational tables shipped with the model:
//! one record per line, numeric fields separated by spaces or tabs, `#` starting
//! a comment (whole line or trailing).
//!
//! The reader selects columns by explicit index, so the on-disk tables may carry
//! extra columns the constraints never look at.
use camino::Utf8Path;
use nom::{
    character::complete::{space0, space1},
    multi::separated_list1,
    number::complete::double,
    sequence::delimited,
    IResult, Parser,
};
use thiserror::Error;

use crate::constraint_errors::ConstraintError;

/// Line-level parsing errors.
#[derive(Error, Debug, PartialEq)]
pub enum ParseColumnError {
    #[error("Invalid numeric field near: '{0}'")]
    InvalidNumber(String),
    #[error("Unexpected trailing content: '{0}'")]
    TrailingContent(String),
}

fn parse_fields(input: &str) -> IResult<&str, Vec<f64>> {
    delimited(space0, separated_list1(space1, double), space0).parse(input)
}

/// Strip a trailing `#` comment, if any.
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Parse every numeric field of a single data line.
///
/// Return
/// ----------
/// * `Ok(None)` for blank and comment-only lines.
/// * `Ok(Some(fields))` for a data line.
/// * `Err(ParseColumnError)` when a field is not a number.
pub(crate) fn parse_line(line: &str) -> Result<Option<Vec<f64>>, ParseColumnError> {
    let content = strip_comment(line);
    if content.trim().is_empty() {
        return Ok(None);
    }

    let (rest, fields) = parse_fields(content)
        .map_err(|_| ParseColumnError::InvalidNumber(content.trim().to_string()))?;

    // `double` stops on the first non numeric char, so "1.0 abc" leaves "abc".
    if !rest.is_empty() {
        return Err(ParseColumnError::TrailingContent(rest.to_string()));
    }

    Ok(Some(fields))
}

/// Read selected columns from a whitespace-delimited table.
///
/// Arguments
/// -----------------
/// * `content`: Full text of the table.
/// * `path`: Origin of `content`, only used in error messages.
/// * `cols`: Zero-based indices of the columns to extract, in output order.
///
/// Return
/// ----------
/// * One vector per requested column, all of the same length (one entry per data line).
/// * [`ConstraintError::ObservationParse`] if a line holds a non numeric field.
/// * [`ConstraintError::MissingColumn`] if a line is too short for a requested column.
pub(crate) fn read_columns(
    content: &str,
    path: &Utf8Path,
    cols: &[usize],
) -> Result<Vec<Vec<f64>>, ConstraintError> {
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); cols.len()];

    for (line_no, line) in content.lines().enumerate() {
        let fields = match parse_line(line) {
            Ok(Some(fields)) => fields,
            Ok(None) => continue,
            Err(source) => {
                return Err(ConstraintError::ObservationParse {
                    path: path.to_owned(),
                    line: line_no + 1,
                    source,
                })
            }
        };

        for (out, &col) in columns.iter_mut().zip(cols) {
            let value = fields
                .get(col)
                .copied()
                .ok_or_else(|| ConstraintError::MissingColumn {
                    path: path.to_owned(),
                    line: line_no + 1,
                    column: col,
                    available: fields.len(),
                })?;
            out.push(value);
        }
    }

    Ok(columns)
}
