//! Incident export reader with encoding and delimiter auto-detection.
//!
//! Turns the raw bytes of an export into a [`Dataset`]. No matching logic here.

use std::path::Path;
use std::sync::Arc;

use crate::error::{CsvError, CsvResult};
use crate::models::{Dataset, Record, Schema};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records
    pub dataset: Dataset,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
}

impl ParseResult {
    pub fn headers(&self) -> &[String] {
        self.dataset.schema().columns()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-15" | "latin-9" => "iso-8859-15".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the specified encoding.
///
/// A leading byte-order mark is dropped so it does not leak into the first
/// column name.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        // Latin-1 maps every byte to the code point of the same value
        "iso-8859-1" | "latin-1" | "latin1" => {
            bytes.iter().map(|&b| b as char).collect::<String>()
        }
        "iso-8859-15" | "latin-9" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // utf-8 and unknown charsets
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Detect the delimiter by counting occurrences in the header line.
///
/// Falls back to `,` when none of the candidates appear.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Every data row must have exactly as many fields as the header.
/// Blank lines are skipped. Values are kept verbatim.
pub fn parse_csv(content: &str, delimiter: char) -> CsvResult<Dataset> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(false)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let schema = Arc::new(Schema::new(headers).map_err(CsvError::DuplicateColumn)?);

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| row_error(content, e))?;
        let line = row
            .position()
            .map(|p| line_at(content, p.byte()))
            .unwrap_or(0);
        let values = row.iter().map(str::to_string).collect();
        records.push(Record::new(Arc::clone(&schema), values, line));
    }

    Ok(Dataset::new(schema, records))
}

/// 1-based physical line holding byte offset `byte`.
///
/// The reader's own line counter skips blank lines, so it drifts from what
/// an editor shows.
fn line_at(content: &str, byte: u64) -> u64 {
    let end = (byte as usize).min(content.len());
    content.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() as u64 + 1
}

fn row_error(content: &str, err: csv::Error) -> CsvError {
    if let csv::ErrorKind::UnequalLengths {
        pos: Some(pos),
        expected_len,
        len,
    } = err.kind()
    {
        return CsvError::RowWidth {
            line: line_at(content, pos.byte()),
            expected: *expected_len as usize,
            found: *len as usize,
        };
    }
    CsvError::from(err)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let dataset = parse_csv(&content, delimiter)?;

    Ok(ParseResult {
        dataset,
        encoding,
        delimiter,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_csv_file_auto("RMS_Crime_Incidents.csv")?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Records: {}", result.dataset.len());
/// ```
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let csv = "neighborhood,incident_year\nDowntown,2021\nMidtown,2019";
        let dataset = parse_csv(csv, ',').unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[0].get("neighborhood"), Some("Downtown"));
        assert_eq!(dataset.records()[1].get("incident_year"), Some("2019"));
    }

    #[test]
    fn test_quoted_values_keep_commas() {
        let csv = "nearest_intersection,zip_code\n\"Woodward, Mack\",48201";
        let dataset = parse_csv(csv, ',').unwrap();

        assert_eq!(
            dataset.records()[0].get("nearest_intersection"),
            Some("Woodward, Mack")
        );
    }

    #[test]
    fn test_values_kept_verbatim() {
        let csv = "offense_description,police_precinct\nASSAULT   ,08";
        let dataset = parse_csv(csv, ',').unwrap();

        assert_eq!(dataset.records()[0].get("offense_description"), Some("ASSAULT   "));
        assert_eq!(dataset.records()[0].get("police_precinct"), Some("08"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let csv = "a,b\n1,2\n\n3,4\n";
        let dataset = parse_csv(csv, ',').unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[1].line(), 4);
    }

    #[test]
    fn test_record_lines_are_physical() {
        let csv = "a,b\n1,2\n\n3,4\n\"x\ny\",5\n6,7\n";
        let dataset = parse_csv(csv, ',').unwrap();

        let lines: Vec<u64> = dataset.records().iter().map(|r| r.line()).collect();
        assert_eq!(lines, vec![2, 4, 5, 7]);
    }

    #[test]
    fn test_row_width_line_counts_blank_lines() {
        let csv = "a,b\n1,2\n\n\n3\n";
        match parse_csv(csv, ',') {
            Err(CsvError::RowWidth { line, .. }) => assert_eq!(line, 5),
            other => panic!("expected row width error, got {other:?}"),
        }
    }

    #[test]
    fn test_row_width_mismatch_is_error() {
        let csv = "a,b,c\n1,2,3\n4,5";
        match parse_csv(csv, ',') {
            Err(CsvError::RowWidth { line, expected, found }) => {
                assert_eq!(line, 3);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("expected row width error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_header_is_error() {
        let result = parse_csv("a,b,a\n1,2,3", ',');
        assert!(matches!(result, Err(CsvError::DuplicateColumn(ref c)) if c == "a"));
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_csv("", ','), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_csv("\n\n", ','), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_auto_parse_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"X,Y\n-83.1,42.3\n");
        let result = parse_bytes_auto(&bytes).unwrap();

        assert_eq!(result.delimiter, ',');
        assert_eq!(result.headers(), ["X".to_string(), "Y".to_string()]);
        assert_eq!(result.dataset.records()[0].get("X"), Some("-83.1"));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_is_not_latin9() {
        assert_eq!(decode_content(&[0xA4, 0xBD], "iso-8859-1"), "¤½");
        assert_eq!(decode_content(&[0xA4, 0xBD], "iso-8859-15"), "€œ");
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("incidents.csv");
        std::fs::write(&path, "neighborhood\nDowntown\n").unwrap();

        let result = parse_csv_file_auto(&path).unwrap();
        assert_eq!(result.dataset.len(), 1);

        let missing = parse_csv_file_auto(dir.path().join("nope.csv"));
        assert!(matches!(missing, Err(CsvError::IoError(_))));
    }
}
