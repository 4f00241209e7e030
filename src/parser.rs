// 🧾 Delimited-Text Parser
// Raw registry export text → ordered, header-keyed records
//
// Policy:
// - First line is the header row (BOM stripped)
// - A `"` anywhere toggles quoting; the delimiter only splits outside quotes
// - Rows whose field count differs from the header count are DROPPED (never an error)
// - Cells that look like unsigned decimals become numbers, everything else stays text
// - The cleaned cell text is kept next to the value, so text fields stay exact

use csv::WriterBuilder;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::debug;

/// UTF-8 byte-order-mark, as left at the start of some registry exports
pub const BOM: char = '\u{FEFF}';

pub const COMMA: u8 = b',';
pub const SEMICOLON: u8 = b';';

// ============================================================================
// CORE TYPES
// ============================================================================

/// A single cell value after coercion
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Cell matched `digits` or `digits.digits`
    Number(f64),
    /// Anything else, quotes and surrounding whitespace removed
    Text(String),
}

impl Value {
    /// Coerce a cleaned cell into a value
    pub fn from_cell(cell: &str) -> Self {
        if looks_numeric(cell) {
            if let Ok(number) = cell.parse::<f64>() {
                return Value::Number(number);
            }
        }
        Value::Text(cell.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Number(_) => None,
            Value::Text(s) => Some(s),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Record - one parsed data row keyed by header name
///
/// All records of one parse share the same header list, so every record
/// has exactly the same keys in the order of the source header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    headers: Arc<[String]>,
    values: Vec<Value>,
    cells: Vec<String>,
}

impl Record {
    // With duplicated headers the last column wins
    fn index(&self, key: &str) -> Option<usize> {
        self.headers.iter().rposition(|h| h == key)
    }

    /// Lookup by header name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index(key).and_then(|idx| self.values.get(idx))
    }

    /// Cleaned cell text exactly as exported, before number coercion
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.index(key)
            .and_then(|idx| self.cells.get(idx))
            .map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.headers.iter().any(|h| h == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.headers.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cell as text, digits kept as written ("007" stays "007"); missing keys give ""
    pub fn text(&self, key: &str) -> String {
        self.raw(key).map(str::to_string).unwrap_or_default()
    }

    /// Cell as a number; text cells and missing keys give None
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ============================================================================
// PARSER
// ============================================================================

/// Parse raw delimited text into records.
///
/// Total over its input: empty text or a header-only text yields an empty
/// vector, malformed rows are skipped.
pub fn parse(text: &str, delimiter: u8) -> Vec<Record> {
    let text = text.trim_start_matches(BOM).trim();
    let mut lines = text.split('\n');

    let header_line = match lines.next() {
        Some(line) => line.trim_start_matches(BOM),
        None => return Vec::new(),
    };

    let headers: Arc<[String]> = split_line(header_line, delimiter)
        .iter()
        .map(|h| clean_cell(h))
        .collect();

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for line in lines {
        let fields = split_line(line, delimiter);

        // Malformed row policy: skip silently
        if fields.len() != headers.len() {
            dropped += 1;
            continue;
        }

        let cells: Vec<String> = fields.iter().map(|f| clean_cell(f)).collect();
        let values = cells.iter().map(|c| Value::from_cell(c)).collect();
        records.push(Record {
            headers: Arc::clone(&headers),
            values,
            cells,
        });
    }

    debug!(
        columns = headers.len(),
        kept = records.len(),
        dropped,
        "parsed delimited text"
    );

    records
}

/// Split one line on `delimiter`.
///
/// Every `"` flips the inside-quotes flag wherever it appears, so a quote
/// after a space or in the middle of a field still protects the delimiter.
/// Quote characters are kept here and removed by the cell cleaning step.
pub fn split_line(line: &str, delimiter: u8) -> Vec<String> {
    let delimiter = char::from(delimiter);
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            current.push(ch);
        } else if ch == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }

    // A blank line is still one (empty) field
    fields.push(current);
    fields
}

/// Strip quote characters and surrounding whitespace
fn clean_cell(cell: &str) -> String {
    if cell.contains('"') {
        cell.replace('"', "").trim().to_string()
    } else {
        cell.trim().to_string()
    }
}

/// `^\d+(\.\d+)?$`, ASCII digits only
pub fn looks_numeric(cell: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    match cell.split_once('.') {
        Some((int, frac)) => all_digits(int) && all_digits(frac),
        None => all_digits(cell),
    }
}

// ============================================================================
// WRITER
// ============================================================================

/// Write typed rows back out as delimited text, header row first.
///
/// Column names come from the rows' serde field names, so the output uses
/// the same headers as the registry export and can be parsed again.
pub fn write_rows<T, W>(rows: &[T], delimiter: u8, writer: W) -> Result<(), csv::Error>
where
    T: Serialize,
    W: io::Write,
{
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!(rows = rows.len(), "wrote delimited rows");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_field_keeps_delimiter() {
        let records = parse("x,y,z\na,\"b,c\",d", COMMA);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("x"), Some(&Value::Text("a".to_string())));
        assert_eq!(records[0].get("y"), Some(&Value::Text("b,c".to_string())));
        assert_eq!(records[0].get("z"), Some(&Value::Text("d".to_string())));
    }

    #[test]
    fn test_quote_after_space_keeps_field_together() {
        let records = parse("x,y,z\na, \"b,c\",d", COMMA);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("x"), "a");
        assert_eq!(records[0].text("y"), "b,c");
        assert_eq!(records[0].text("z"), "d");
    }

    #[test]
    fn test_quote_inside_field_toggles() {
        let records = parse("x,y,z\na,b\"c,d\"e,f", COMMA);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("y"), "bc,de");
        assert_eq!(records[0].text("z"), "f");
    }

    #[test]
    fn test_split_line_keeps_quotes_for_cleaning() {
        assert_eq!(split_line("a;\"b;c\";d", SEMICOLON), vec!["a", "\"b;c\"", "d"]);
        assert_eq!(split_line("", COMMA), vec![""]);
        assert_eq!(split_line("a,,", COMMA), vec!["a", "", ""]);
        // An unbalanced quote protects the rest of the line
        assert_eq!(split_line("a,\"b,c", COMMA), vec!["a", "\"b,c"]);
    }

    #[test]
    fn test_malformed_row_is_dropped() {
        let text = "a,b,c\n1,2,3\n4,5\n6,7,8,9\n10,11,12";
        let records = parse(text, COMMA);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].number("a"), Some(1.0));
        assert_eq!(records[1].number("a"), Some(10.0));
    }

    #[test]
    fn test_numeric_coercion() {
        let records = parse("amount,code,empty\n123.45,12a,\n", COMMA);
        // Trailing newline is trimmed away, single data row remains
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.get("amount"), Some(&Value::Number(123.45)));
        assert_eq!(r.get("code"), Some(&Value::Text("12a".to_string())));
        assert_eq!(r.get("empty"), Some(&Value::Text(String::new())));
    }

    #[test]
    fn test_signed_and_exponent_stay_text() {
        let records = parse("a,b,c,d\n-5,1e3,1.,1,000", COMMA);
        // "1,000" splits into two fields → row has 5 fields → dropped
        assert!(records.is_empty());

        let records = parse("a,b,c\n-5,1e3,1.", COMMA);
        assert_eq!(records[0].get("a"), Some(&Value::Text("-5".to_string())));
        assert_eq!(records[0].get("b"), Some(&Value::Text("1e3".to_string())));
        assert_eq!(records[0].get("c"), Some(&Value::Text("1.".to_string())));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("", COMMA).is_empty());
        assert!(parse("   \n  \n", COMMA).is_empty());
    }

    #[test]
    fn test_header_only() {
        assert!(parse("a,b,c", COMMA).is_empty());
        assert!(parse("a,b,c\n", SEMICOLON).is_empty());
    }

    #[test]
    fn test_bom_and_quoted_headers() {
        let text = "\u{FEFF}\"Fecha de retiro\";\"Proyecto\"\n2024-01-02;\"Bosque; Norte\"";
        let records = parse(text, SEMICOLON);

        assert_eq!(records.len(), 1);
        let keys: Vec<&str> = records[0].keys().collect();
        assert_eq!(keys, vec!["Fecha de retiro", "Proyecto"]);
        assert_eq!(records[0].text("Proyecto"), "Bosque; Norte");
    }

    #[test]
    fn test_whitespace_and_crlf_are_trimmed() {
        let text = "name , value\r\n  Alpha  ,  42 \r\n Beta, 7.5\r\n";
        let records = parse(text, COMMA);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("name"), "Alpha");
        assert_eq!(records[0].number("value"), Some(42.0));
        assert_eq!(records[1].number("value"), Some(7.5));
    }

    #[test]
    fn test_row_order_and_shared_keys() {
        let records = parse("k,v\nb,2\na,1\nb,2", COMMA);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].text("k"), "b");
        assert_eq!(records[1].text("k"), "a");
        assert_eq!(records[2], records[0]);
        for r in &records {
            assert_eq!(r.keys().collect::<Vec<_>>(), vec!["k", "v"]);
        }
    }

    #[test]
    fn test_text_keeps_digits_as_written() {
        let records = parse("Año,Cantidad,Nit,Serial\n2023,10.50,007,12345678901234567890", COMMA);
        let r = &records[0];

        assert_eq!(r.text("Año"), "2023");
        assert_eq!(r.text("Cantidad"), "10.50");
        assert_eq!(r.text("Nit"), "007");
        assert_eq!(r.text("Serial"), "12345678901234567890");
        assert_eq!(r.text("missing"), "");

        // Coercion still applies to the value
        assert_eq!(r.get("Nit"), Some(&Value::Number(7.0)));
        assert_eq!(r.number("Cantidad"), Some(10.5));
        assert_eq!(r.raw("Nit"), Some("007"));
    }

    #[test]
    fn test_record_serializes_as_ordered_map() {
        let records = parse("b,a\nx,3", COMMA);
        let json = serde_json::to_string(&records[0]).unwrap();
        assert_eq!(json, r#"{"b":"x","a":3.0}"#);
    }

    #[test]
    fn test_write_rows_is_readable_by_parse() {
        #[derive(serde::Serialize)]
        struct Row {
            #[serde(rename = "Proyecto")]
            project: String,
            #[serde(rename = "COLCERs")]
            colcers: Option<f64>,
        }

        let rows = vec![
            Row {
                project: "Bosque; Norte".to_string(),
                colcers: Some(12.5),
            },
            Row {
                project: "Páramo".to_string(),
                colcers: None,
            },
        ];

        let mut out = Vec::new();
        write_rows(&rows, SEMICOLON, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Proyecto;COLCERs\n"));
        assert!(text.contains("\"Bosque; Norte\";12.5"));

        let records = parse(&text, SEMICOLON);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("Proyecto"), "Bosque; Norte");
        assert_eq!(records[0].number("COLCERs"), Some(12.5));
        assert_eq!(records[1].text("COLCERs"), "");
    }

    #[test]
    fn test_looks_numeric() {
        assert!(looks_numeric("0"));
        assert!(looks_numeric("123.45"));
        assert!(!looks_numeric(""));
        assert!(!looks_numeric(".5"));
        assert!(!looks_numeric("1.2.3"));
        assert!(!looks_numeric("+1"));
    }
}
