//! CSV codec for sales uploads and aggregated results
//!
//! Parsing is lenient: the first line is always treated as a header, and any
//! data line that does not yield a department, a date and an integer sales
//! count is skipped instead of failing the whole upload. Each line is read as
//! its own record with the `csv` crate, so quoted fields may contain commas but
//! never span lines; a line whose quoting is broken falls back to a plain comma
//! split. A stray pair of single or double quotes around a field is stripped.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::aggregate::AggregatedTotal;

/// Header line of every result CSV
pub const RESULT_HEADER: &str = "Department Name,Total Number of Sales";

/// One data line of an uploaded sales CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesRow {
    pub department_name: String,
    /// Kept verbatim, never validated
    pub date: String,
    pub number_of_sales: i64,
}

/// Errors raised when an upload has no usable data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("CSV must have at least header and one data row")]
    MissingDataRows,

    #[error("CSV has no valid data rows ({skipped} malformed line(s) skipped)")]
    NoValidRows { skipped: usize },
}

/// Rows recovered from an upload plus the number of lines that were dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub rows: Vec<SalesRow>,
    pub skipped: usize,
}

/// Parse raw sales CSV text into rows.
pub fn parse(raw: &str) -> Result<Vec<SalesRow>, FormatError> {
    parse_report(raw).map(|report| report.rows)
}

/// Parse raw sales CSV text, reporting how many data lines were skipped.
///
/// Fails with [`FormatError::MissingDataRows`] when the trimmed input has fewer
/// than two lines and with [`FormatError::NoValidRows`] when every data line was
/// malformed.
pub fn parse_report(raw: &str) -> Result<ParseReport, FormatError> {
    let trimmed = raw.trim();
    if trimmed.lines().take(2).count() < 2 {
        return Err(FormatError::MissingDataRows);
    }

    let mut report = ParseReport::default();

    for (index, line) in data_lines(trimmed).enumerate() {
        let fields = split_fields(line, 3);
        match row_from_fields(&fields) {
            Some(row) => report.rows.push(row),
            None => {
                trace!("Skipping malformed CSV line {}: {:?}", index + 1, line);
                report.skipped += 1;
            }
        }
    }

    debug!(
        "Parsed {} valid rows ({} skipped)",
        report.rows.len(),
        report.skipped
    );

    if report.rows.is_empty() {
        return Err(FormatError::NoValidRows {
            skipped: report.skipped,
        });
    }

    Ok(report)
}

/// Parse a result CSV produced by [`serialize`] back into totals.
///
/// Uses the same lenient rules as [`parse`]: lines without a department and an
/// integer total are skipped. A header-only document yields an empty list.
pub fn parse_totals(raw: &str) -> Vec<AggregatedTotal> {
    data_lines(raw.trim())
        .filter_map(|line| {
            let fields = split_fields(line, 2);
            if fields.len() < 2 || fields[0].is_empty() {
                return None;
            }
            Some(AggregatedTotal {
                department_name: fields[0].clone(),
                total_sales: fields[1].parse::<i64>().ok()?,
            })
        })
        .collect()
}

/// Serialize aggregated totals into the result CSV format.
///
/// Every line, including the header, is newline-terminated. Department names
/// are always double-quoted with embedded quotes doubled.
pub fn serialize(results: &[AggregatedTotal]) -> String {
    let mut out = String::with_capacity(RESULT_HEADER.len() + 1 + results.len() * 32);
    out.push_str(RESULT_HEADER);
    out.push('\n');

    for total in results {
        out.push_str(&format!(
            "\"{}\",{}\n",
            total.department_name.replace('"', "\"\""),
            total.total_sales
        ));
    }

    out
}

/// Non-blank lines after the header
fn data_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().skip(1).filter(|line| !line.trim().is_empty())
}

/// Cleaned fields of one line, RFC-4180 first and a plain split otherwise
fn split_fields(line: &str, min_fields: usize) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) if record.len() >= min_fields => record.iter().map(clean_field).collect(),
        _ => line.split(',').map(clean_field).collect(),
    }
}

fn row_from_fields(fields: &[String]) -> Option<SalesRow> {
    let [department_name, date, number_of_sales, ..] = fields else {
        return None;
    };
    if department_name.is_empty() {
        return None;
    }

    Some(SalesRow {
        department_name: department_name.clone(),
        date: date.clone(),
        number_of_sales: number_of_sales.parse::<i64>().ok()?,
    })
}

fn clean_field(field: &str) -> String {
    let field = field.trim();
    let field = field.strip_prefix(is_quote).unwrap_or(field);
    let field = field.strip_suffix(is_quote).unwrap_or(field);
    field.trim().to_string()
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;

    const SAMPLE: &str = "Department Name,Date,Number of Sales\n\
                          Electronics,2023-08-01,100\n\
                          Clothing,2023-08-01,200\n\
                          Electronics,2023-08-02,150\n";

    #[test]
    fn test_parse_skips_header() {
        let rows = parse(SAMPLE).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            SalesRow {
                department_name: "Electronics".to_string(),
                date: "2023-08-01".to_string(),
                number_of_sales: 100,
            }
        );
    }

    #[test]
    fn test_parse_header_is_skipped_regardless_of_content() {
        let rows = parse("Toys,2023-01-01,5\nBooks,2023-01-02,7").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].department_name, "Books");
    }

    #[test]
    fn test_parse_header_only_is_missing_data() {
        assert_eq!(
            parse("Department Name,Date,Number of Sales\n"),
            Err(FormatError::MissingDataRows)
        );
        assert_eq!(parse(""), Err(FormatError::MissingDataRows));
        assert_eq!(
            parse("Department Name,Date,Number of Sales\n\n   \n"),
            Err(FormatError::MissingDataRows)
        );
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let input = "Department Name,Date,Number of Sales\n\
                     Toys,2023-08-01,notanumber\n\
                     Garden,2023-08-01\n\
                     ,2023-08-01,12\n\
                     Books,2023-08-01,42\n";
        let report = parse_report(input).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].department_name, "Books");
        assert_eq!(report.skipped, 3);
    }

    #[test]
    fn test_parse_all_malformed_is_no_valid_rows() {
        let input = "Department Name,Date,Number of Sales\nToys,2023-08-01,lots\n";
        assert_eq!(parse(input), Err(FormatError::NoValidRows { skipped: 1 }));
    }

    #[test]
    fn test_parse_strips_quotes_and_whitespace() {
        let input = "h1,h2,h3\n  \"Home Goods\" , '2023-08-01', 12 \n'Toys',2023-08-02,\"3\"\n";
        let rows = parse(input).unwrap();
        assert_eq!(rows[0].department_name, "Home Goods");
        assert_eq!(rows[0].date, "2023-08-01");
        assert_eq!(rows[0].number_of_sales, 12);
        assert_eq!(rows[1].department_name, "Toys");
        assert_eq!(rows[1].number_of_sales, 3);
    }

    #[test]
    fn test_parse_quoted_field_with_comma() {
        let input = "h1,h2,h3\n\"Garden, Outdoor\",2023-08-01,9\n";
        let rows = parse(input).unwrap();
        assert_eq!(rows[0].department_name, "Garden, Outdoor");
        assert_eq!(rows[0].number_of_sales, 9);
    }

    #[test]
    fn test_broken_quote_only_affects_its_own_line() {
        let input = "h1,h2,h3\nBooks,2023-08-01,7\n\"Toys,2023-08-01,many\nGarden,2023-08-01,9\n";
        let report = parse_report(input).unwrap();
        let departments: Vec<_> = report
            .rows
            .iter()
            .map(|row| row.department_name.as_str())
            .collect();
        assert_eq!(departments, ["Books", "Garden"]);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_stray_leading_quote_is_recovered() {
        let input = "h1,h2,h3\n\"Toys,2023-08-01,5\nBooks,2023-08-01,7\nGarden,2023-08-01,9\n";
        let rows = parse(input).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].department_name, "Toys");
        assert_eq!(rows[0].number_of_sales, 5);
        assert_eq!(rows[2].department_name, "Garden");
    }

    #[test]
    fn test_blank_lines_are_not_counted_as_skipped() {
        let input = "h1,h2,h3\nToys,2023-08-01,5\n\n   \nBooks,2023-08-01,7\n";
        let report = parse_report(input).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_sales_count_must_be_whole_integer() {
        let input = "h1,h2,h3\nToys,2023-08-01,12.5\nBooks,2023-08-01,12 units\nGarden,2023-08-01, 12 \n";
        let report = parse_report(input).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].department_name, "Garden");
        assert_eq!(report.rows[0].number_of_sales, 12);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_parse_accepts_negative_and_extra_fields() {
        let input = "h1,h2,h3\nReturns,2023-08-01,-4,extra,fields\n";
        let rows = parse(input).unwrap();
        assert_eq!(rows[0].number_of_sales, -4);
    }

    #[test]
    fn test_parse_handles_crlf() {
        let input = "h1,h2,h3\r\nToys,2023-08-01,5\r\nToys,2023-08-02,6\r\n";
        let rows = parse(input).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].number_of_sales, 6);
    }

    #[test]
    fn test_serialize_matches_expected_layout() {
        let totals = vec![
            AggregatedTotal {
                department_name: "Electronics".to_string(),
                total_sales: 250,
            },
            AggregatedTotal {
                department_name: "Clothing".to_string(),
                total_sales: 200,
            },
        ];
        assert_eq!(
            serialize(&totals),
            "Department Name,Total Number of Sales\n\"Electronics\",250\n\"Clothing\",200\n"
        );
    }

    #[test]
    fn test_serialize_empty_is_header_only() {
        assert_eq!(serialize(&[]), "Department Name,Total Number of Sales\n");
        assert!(parse_totals(&serialize(&[])).is_empty());
    }

    #[test]
    fn test_serialize_escapes_embedded_quotes() {
        let totals = vec![AggregatedTotal {
            department_name: "The \"Best\" Shop".to_string(),
            total_sales: 1,
        }];
        let csv = serialize(&totals);
        assert!(csv.contains("\"The \"\"Best\"\" Shop\",1"));
        assert_eq!(parse_totals(&csv), totals);
    }

    #[test]
    fn test_totals_survive_reparse() {
        let input = "Department Name,Date,Number of Sales\n\
                     Toys,d,5\nGarden,d,9\nToys,d,4\nBooks,d,1\nGarden,d,-2\n";
        let totals = aggregate(&parse(input).unwrap());
        let reparsed = parse_totals(&serialize(&totals));
        assert_eq!(reparsed, totals);
    }
}
