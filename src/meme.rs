use crate::error::MotifError;
use crate::types::*;
use polars::lazy::dsl::*;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::Peekable;

/// Advances the iterator until a line starting with one of `prefixes` is next
fn skip_until<I>(lines: &mut Peekable<I>, prefixes: &[&str])
where
    I: Iterator<Item = Result<String, std::io::Error>>,
{
    while let Some(Ok(line)) = lines.peek() {
        let line = line.trim_start();
        if prefixes.iter().any(|prefix| line.starts_with(prefix)) {
            break;
        }
        lines.next();
    }
}

fn is_matrix_row(line: &str) -> bool {
    line.trim_start()
        .starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

/// Parses a single PWM from the iterator
fn parse_pwm<I>(lines: &mut Peekable<I>) -> Result<Option<(String, PWM)>, MotifError>
where
    I: Iterator<Item = Result<String, std::io::Error>>,
{
    // Get motif ID from MOTIF line
    let motif_line = match lines.next() {
        Some(Ok(line)) if line.starts_with("MOTIF") => line,
        Some(Err(e)) => return Err(MotifError::Io(e)),
        _ => return Ok(None),
    };

    let motif_id = motif_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| MotifError::InvalidFileFormat("Missing motif ID".into()))?
        .to_string();

    // Skip to the matrix header, then past it; the header must precede the next motif
    skip_until(lines, &["letter-probability", "MOTIF"]);
    match lines.peek() {
        Some(Ok(line)) if line.trim_start().starts_with("letter-probability") => {
            lines.next();
        }
        _ => {
            return Err(MotifError::InvalidFileFormat(format!(
                "Missing letter-probability matrix for motif {}",
                motif_id
            )))
        }
    }

    let mut pwm_rows: Vec<[f64; 4]> = Vec::new();
    while let Some(Ok(line)) = lines.peek() {
        if !is_matrix_row(line) {
            break;
        }
        let values: Vec<f64> = line
            .split_whitespace()
            .map(|s| s.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MotifError::InvalidFileFormat(format!("Invalid PWM value: {}", e)))?;
        let row: [f64; 4] = values.try_into().map_err(|v: Vec<f64>| {
            MotifError::InvalidFileFormat(format!(
                "Motif {} has a row with {} values, expected 4",
                motif_id,
                v.len()
            ))
        })?;
        pwm_rows.push(row);
        lines.next();
    }

    if pwm_rows.is_empty() {
        return Err(MotifError::InvalidFileFormat(format!(
            "Empty PWM for motif {}",
            motif_id
        )));
    }

    // Create PWM DataFrame
    let columns = NUCLEOTIDES
        .iter()
        .enumerate()
        .map(|(j, name)| {
            Column::new(
                (*name).into(),
                pwm_rows.iter().map(|row| row[j]).collect::<Vec<f64>>(),
            )
        })
        .collect::<Vec<_>>();
    let pwm = DataFrame::new(columns).map_err(|e| MotifError::DataError(e.to_string()))?;

    Ok(Some((motif_id, pwm)))
}

/// Reads the raw letter-probability matrices of a MEME format file
///
/// # Arguments
/// * `filename` - Path to the MEME format file to read
///
/// # Returns
/// * `Result<PWMCollection, MotifError>` - A HashMap where keys are motif IDs and values are their matrices
///   as DataFrames with columns A, C, G, T
///
/// # Errors
/// * `MotifError::Io` - If the file cannot be opened or read
/// * `MotifError::InvalidFileFormat` - If the file format is invalid, a motif has no matrix,
///   a motif ID repeats, or no PWMs are found
/// * `MotifError::DataError` - If there are issues creating the PWM DataFrame
pub fn read_pwm_files(filename: &str) -> Result<PWMCollection, MotifError> {
    let file = File::open(filename)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines().peekable();
    let mut pwms = HashMap::new();

    // Skip header until first MOTIF
    skip_until(&mut lines, &["MOTIF"]);

    while let Some((id, pwm)) = parse_pwm(&mut lines)? {
        if pwms.contains_key(&id) {
            return Err(MotifError::InvalidFileFormat(format!(
                "Duplicate motif ID {}",
                id
            )));
        }
        pwms.insert(id, pwm);
        skip_until(&mut lines, &["MOTIF"]);
    }

    if pwms.is_empty() {
        return Err(MotifError::InvalidFileFormat("No PWMs found".into()));
    }

    Ok(pwms)
}

/// Reads a MEME file into validated PPMs, ordered by motif ID
///
/// # Example
/// ```ignore
/// use motif_cluster_rs::meme::read_ppm_file;
///
/// let motifs = read_ppm_file("path/to/motifs.meme").unwrap();
/// for (motif_id, ppm) in &motifs {
///     println!("{}: {} positions", motif_id, ppm.len());
/// }
/// ```
///
/// Rows are checked as printed. Files that round probabilities (six decimals
/// can leave a row summing to 1.000002) should go through
/// [`read_ppm_file_with_pseudocount`], which renormalises every row.
///
/// # Errors
/// Everything [`read_pwm_files`] reports, plus `MotifError::Validation` for a
/// row that does not sum to 1
pub fn read_ppm_file(filename: &str) -> Result<MotifCollection, MotifError> {
    read_pwm_files(filename)?
        .iter()
        .map(|(id, pwm)| {
            Ppm::try_from(pwm)
                .map(|ppm| (id.clone(), ppm))
                .map_err(|e| MotifError::validation(format!("motif {}: {}", id, e)))
        })
        .collect()
}

/// Reads a MEME file and smooths every matrix with a pseudocount
///
/// Each probability becomes `(p + pseudocount) / (row sum + 4 * pseudocount)`,
/// which leaves no zero entries for the KL and Jensen-Shannon metrics. With a
/// pseudocount of 0 this only renormalises each row to sum to 1.
///
/// # Errors
/// * `MotifError::InvalidParameter` - negative or non-finite pseudocount
/// * Everything [`read_ppm_file`] reports
pub fn read_ppm_file_with_pseudocount(
    filename: &str,
    pseudocount: f64,
) -> Result<MotifCollection, MotifError> {
    if !pseudocount.is_finite() || pseudocount < 0.0 {
        return Err(MotifError::invalid_parameter(
            "pseudocount",
            pseudocount,
            "must be a finite non-negative number",
        ));
    }
    let pwms = read_pwm_files(filename)?;

    pwms.into_iter()
        .map(|(id, pwm)| {
            let total = col("A") + col("C") + col("G") + col("T") + lit(4.0 * pseudocount);
            let smoothed = pwm
                .lazy()
                .select(
                    NUCLEOTIDES
                        .iter()
                        .map(|name| ((col(*name) + lit(pseudocount)) / total.clone()).alias(*name))
                        .collect::<Vec<_>>(),
                )
                .collect()
                .map_err(|e| MotifError::DataError(e.to_string()))?;

            let ppm = Ppm::try_from(&smoothed)
                .map_err(|e| MotifError::validation(format!("motif {}: {}", id, e)))?;
            Ok((id, ppm))
        })
        .collect()
}
