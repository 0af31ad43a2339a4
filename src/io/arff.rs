//! ARFF text decoding.
//!
//! [`ArffReader`] consumes the header eagerly on construction, so callers can
//! inspect (and reject) the attribute schema before any row is decoded. Rows
//! are then read either column-major ([`ArffReader::read_dense`]) or as
//! coordinate triples ([`ArffReader::read_coo`]). Both modes accept dense and
//! `{index value, ...}` sparse rows.
//!
//! Nominal values are encoded to their label index while decoding.

use crate::error::{DatasetError, Result};
use crate::io::compression::open_decompressed;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Declared type of an attribute in the ARFF header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeType {
    Numeric,
    Real,
    Integer,
    String,
    /// Explicit label enumeration, in declaration order.
    Nominal(Vec<String>),
}

impl AttributeType {
    /// Keyword spelling used in headers (`NUMERIC`, `{a,b}`, ...).
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Numeric => "NUMERIC".into(),
            Self::Real => "REAL".into(),
            Self::Integer => "INTEGER".into(),
            Self::String => "STRING".into(),
            Self::Nominal(labels) => format!("{{{}}}", labels.join(",")),
        }
    }
}

/// One `@attribute` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeType,
}

/// Everything before `@data`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArffHeader {
    pub relation: String,
    pub attributes: Vec<Attribute>,
}

/// A single decoded cell.
#[derive(Clone, Debug, PartialEq)]
pub enum ArffValue {
    Missing,
    Number(f64),
    Text(String),
    /// Index into the attribute's nominal labels.
    Nominal(usize),
}

/// Column-major dense rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DenseRows {
    pub n_rows: usize,
    /// One vector per attribute, each of length `n_rows`.
    pub columns: Vec<Vec<ArffValue>>,
}

/// Coordinate triples `(value, row, column)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CooRows {
    pub n_rows: usize,
    pub values: Vec<f64>,
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

/// Streaming ARFF reader positioned at the first data line.
pub struct ArffReader<R> {
    lines: std::io::Lines<BufReader<R>>,
    header: ArffHeader,
    line_no: usize,
    source: PathBuf,
}

impl ArffReader<Box<dyn Read>> {
    /// Open a (possibly compressed) ARFF file and read its header.
    ///
    /// # Errors
    /// [`DatasetError::Io`] if the file cannot be read, [`DatasetError::Format`]
    /// for a malformed header.
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_source(open_decompressed(path)?, path)
    }
}

impl<R: Read> ArffReader<R> {
    /// Read the header up to and including the `@data` line.
    ///
    /// # Errors
    /// [`DatasetError::Format`] for malformed declarations or a missing
    /// `@data` section.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_source(reader, Path::new("<memory>"))
    }

    fn with_source(reader: R, source: &Path) -> Result<Self> {
        let mut lines = BufReader::new(reader).lines();
        let mut relation = None;
        let mut attributes = Vec::new();
        let mut line_no = 0usize;

        loop {
            let Some(line) = lines.next() else {
                return Err(DatasetError::Format("ARFF file has no @data section".into()));
            };
            line_no += 1;
            let line = line.map_err(|e| DatasetError::io("read", source, e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('%') {
                continue;
            }
            let (keyword, rest) = split_keyword(trimmed);
            match keyword.to_ascii_lowercase().as_str() {
                "@relation" => {
                    let (name, _) = next_token(rest)
                        .map_err(|e| DatasetError::Format(format!("line {line_no}: {e}")))?;
                    relation = Some(name);
                }
                "@attribute" => {
                    let attribute = parse_attribute(rest)
                        .map_err(|e| DatasetError::Format(format!("line {line_no}: {e}")))?;
                    attributes.push(attribute);
                }
                "@data" => break,
                other => {
                    return Err(DatasetError::Format(format!(
                        "line {line_no}: unexpected declaration {other:?}"
                    )));
                }
            }
        }

        let relation =
            relation.ok_or_else(|| DatasetError::Format("ARFF file has no @relation".into()))?;
        if attributes.is_empty() {
            return Err(DatasetError::Format("ARFF file declares no attributes".into()));
        }

        Ok(Self {
            lines,
            header: ArffHeader {
                relation,
                attributes,
            },
            line_no,
            source: source.to_path_buf(),
        })
    }

    /// The decoded header.
    pub fn header(&self) -> &ArffHeader {
        &self.header
    }

    /// Decode all rows column-major. Sparse rows are expanded with zeros.
    ///
    /// # Errors
    /// [`DatasetError::Format`] when a row does not match the header.
    pub fn read_dense(mut self) -> Result<DenseRows> {
        let width = self.header.attributes.len();
        let mut out = DenseRows {
            n_rows: 0,
            columns: vec![Vec::new(); width],
        };
        while let Some((line_no, line)) = self.next_data_line()? {
            let cells = self.decode_row(line_no, &line)?;
            for (column, cell) in out.columns.iter_mut().zip(cells) {
                column.push(cell);
            }
            out.n_rows += 1;
        }
        Ok(out)
    }

    /// Decode all rows as coordinate triples. Dense rows contribute their
    /// non-zero values only; missing values become NaN.
    ///
    /// # Errors
    /// [`DatasetError::Format`] when a row does not match the header or holds
    /// a value that is not numeric.
    pub fn read_coo(mut self) -> Result<CooRows> {
        let mut out = CooRows::default();
        while let Some((line_no, line)) = self.next_data_line()? {
            let row = out.n_rows;
            if is_sparse_row(&line) {
                for (col, cell) in self.decode_sparse_pairs(line_no, &line)? {
                    out.values.push(cell_to_f64(line_no, col, &cell)?);
                    out.rows.push(row);
                    out.cols.push(col);
                }
            } else {
                for (col, cell) in self.decode_dense_row(line_no, &line)?.into_iter().enumerate() {
                    let value = cell_to_f64(line_no, col, &cell)?;
                    if value != 0.0 {
                        out.values.push(value);
                        out.rows.push(row);
                        out.cols.push(col);
                    }
                }
            }
            out.n_rows += 1;
        }
        Ok(out)
    }

    fn next_data_line(&mut self) -> Result<Option<(usize, String)>> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line.map_err(|e| DatasetError::io("read", &self.source, e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('%') {
                continue;
            }
            return Ok(Some((self.line_no, trimmed.to_string())));
        }
        Ok(None)
    }

    fn decode_row(&self, line_no: usize, line: &str) -> Result<Vec<ArffValue>> {
        if !is_sparse_row(line) {
            return self.decode_dense_row(line_no, line);
        }
        let mut cells = vec![ArffValue::Number(0.0); self.header.attributes.len()];
        for (col, cell) in self.decode_sparse_pairs(line_no, line)? {
            cells[col] = cell;
        }
        Ok(cells)
    }

    fn decode_dense_row(&self, line_no: usize, line: &str) -> Result<Vec<ArffValue>> {
        let tokens = split_values(line)
            .map_err(|e| DatasetError::Format(format!("line {line_no}: {e}")))?;
        let width = self.header.attributes.len();
        if tokens.len() != width {
            return Err(DatasetError::Format(format!(
                "line {line_no}: row has {} values but the header declares {width} attributes",
                tokens.len()
            )));
        }
        tokens
            .into_iter()
            .zip(&self.header.attributes)
            .map(|(token, attribute)| decode_cell(line_no, attribute, token))
            .collect()
    }

    fn decode_sparse_pairs(&self, line_no: usize, line: &str) -> Result<Vec<(usize, ArffValue)>> {
        let inner = line
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| DatasetError::Format(format!("line {line_no}: unterminated sparse row")))?;
        if inner.trim().is_empty() {
            return Ok(Vec::new());
        }
        let width = self.header.attributes.len();
        let mut pairs = Vec::new();
        for entry in split_values(inner)
            .map_err(|e| DatasetError::Format(format!("line {line_no}: {e}")))?
        {
            let (index, value) = entry.text.trim().split_once(char::is_whitespace).ok_or_else(|| {
                DatasetError::Format(format!("line {line_no}: bad sparse entry {:?}", entry.text))
            })?;
            let col: usize = index.parse().map_err(|_| {
                DatasetError::Format(format!("line {line_no}: bad sparse index {index:?}"))
            })?;
            if col >= width {
                return Err(DatasetError::Format(format!(
                    "line {line_no}: sparse index {col} out of range for {width} attributes"
                )));
            }
            let (text, quoted) = match next_token(value.trim()) {
                Ok((text, rest)) if rest.trim().is_empty() => (text, is_quoted(value.trim())),
                _ => (value.trim().to_string(), false),
            };
            let cell = decode_cell(line_no, &self.header.attributes[col], Token { text, quoted })?;
            pairs.push((col, cell));
        }
        Ok(pairs)
    }
}

/// Decode only the header of an in-memory ARFF document.
///
/// # Errors
/// [`DatasetError::Format`] for malformed headers.
pub fn parse_header(text: &str) -> Result<ArffHeader> {
    ArffReader::new(text.as_bytes()).map(|r| r.header)
}

fn is_sparse_row(line: &str) -> bool {
    line.starts_with('{')
}

#[allow(clippy::cast_precision_loss)]
fn cell_to_f64(line_no: usize, col: usize, cell: &ArffValue) -> Result<f64> {
    match cell {
        ArffValue::Missing => Ok(f64::NAN),
        ArffValue::Number(v) => Ok(*v),
        ArffValue::Nominal(i) => Ok(*i as f64),
        ArffValue::Text(t) => Err(DatasetError::Format(format!(
            "line {line_no}: non-numeric value {t:?} in sparse column {col}"
        ))),
    }
}

fn decode_cell(line_no: usize, attribute: &Attribute, token: Token) -> Result<ArffValue> {
    if !token.quoted && token.text == "?" {
        return Ok(ArffValue::Missing);
    }
    match &attribute.kind {
        AttributeType::Numeric | AttributeType::Real | AttributeType::Integer => token
            .text
            .parse::<f64>()
            .map(ArffValue::Number)
            .map_err(|_| {
                DatasetError::Format(format!(
                    "line {line_no}: {:?} is not a number (attribute {})",
                    token.text, attribute.name
                ))
            }),
        AttributeType::String => Ok(ArffValue::Text(token.text)),
        AttributeType::Nominal(labels) => labels
            .iter()
            .position(|label| *label == token.text)
            .map(ArffValue::Nominal)
            .ok_or_else(|| {
                DatasetError::Format(format!(
                    "line {line_no}: bad nominal value {:?} for attribute {}",
                    token.text, attribute.name
                ))
            }),
    }
}

fn split_keyword(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(i) => (&line[..i], line[i..].trim_start()),
        None => (line, ""),
    }
}

fn parse_attribute(rest: &str) -> std::result::Result<Attribute, String> {
    let (name, rest) = next_token(rest)?;
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(format!("attribute {name:?} has no type"));
    }
    let kind = if let Some(body) = rest.strip_prefix('{') {
        let body = body
            .strip_suffix('}')
            .ok_or_else(|| format!("unterminated nominal list for attribute {name:?}"))?;
        let labels: Vec<String> = split_values(body)?.into_iter().map(|t| t.text).collect();
        AttributeType::Nominal(labels)
    } else {
        let (keyword, _) = split_keyword(rest);
        match keyword.to_ascii_lowercase().as_str() {
            "numeric" => AttributeType::Numeric,
            "real" => AttributeType::Real,
            "integer" => AttributeType::Integer,
            "string" => AttributeType::String,
            other => return Err(format!("unsupported type {other:?} for attribute {name:?}")),
        }
    };
    Ok(Attribute { name, kind })
}

/// A value split from a comma separated list.
#[derive(Debug, PartialEq, Eq)]
struct Token {
    text: String,
    quoted: bool,
}

fn is_quoted(s: &str) -> bool {
    s.starts_with('\'') || s.starts_with('"')
}

/// Read one (optionally quoted) token, returning it and the remaining input.
fn next_token(s: &str) -> std::result::Result<(String, &str), String> {
    let s = s.trim_start();
    let mut chars = s.char_indices();
    match chars.next() {
        None => Err("expected a value".into()),
        Some((_, q @ ('\'' | '"'))) => {
            let mut out = String::new();
            let mut escaped = false;
            for (i, c) in chars {
                if escaped {
                    out.push(match c {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    return Ok((out, &s[i + c.len_utf8()..]));
                } else {
                    out.push(c);
                }
            }
            Err(format!("unterminated quoted value in {s:?}"))
        }
        Some(_) => {
            let end = s
                .find(|c: char| c.is_whitespace() || c == ',' || c == '{')
                .unwrap_or(s.len());
            Ok((s[..end].to_string(), &s[end..]))
        }
    }
}

/// Split a comma separated list, honouring quotes and backslash escapes.
fn split_values(s: &str) -> std::result::Result<Vec<Token>, String> {
    let mut out = Vec::new();
    let mut rest = s.trim_start();
    loop {
        if is_quoted(rest) {
            let (text, after) = next_token(rest)?;
            out.push(Token { text, quoted: true });
            rest = after.trim_start();
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            out.push(Token {
                text: rest[..end].trim().to_string(),
                quoted: false,
            });
            rest = &rest[end..];
        }
        match rest.strip_prefix(',') {
            Some(after) => rest = after.trim_start(),
            None if rest.trim().is_empty() => return Ok(out),
            None => return Err(format!("unexpected text {rest:?} after value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEATHER: &str = "% weather\n\
        @RELATION weather\n\
        \n\
        @ATTRIBUTE outlook {sunny, overcast, 'light rain'}\n\
        @ATTRIBUTE temperature REAL\n\
        @ATTRIBUTE 'play tennis' {yes,no}\n\
        @ATTRIBUTE note string\n\
        @DATA\n\
        sunny,85,no,'hot, dry'\n\
        % interleaved comment\n\
        'light rain',?,yes,?\n";

    #[test]
    fn header_declarations() {
        let header = parse_header(WEATHER).unwrap();
        assert_eq!(header.relation, "weather");
        let names: Vec<_> = header.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["outlook", "temperature", "play tennis", "note"]);
        assert_eq!(
            header.attributes[0].kind,
            AttributeType::Nominal(vec!["sunny".into(), "overcast".into(), "light rain".into()])
        );
        assert_eq!(header.attributes[1].kind, AttributeType::Real);
        assert_eq!(header.attributes[3].kind, AttributeType::String);
    }

    #[test]
    fn dense_rows_are_column_major() {
        let rows = ArffReader::new(WEATHER.as_bytes()).unwrap().read_dense().unwrap();
        assert_eq!(rows.n_rows, 2);
        assert_eq!(rows.columns[0], [ArffValue::Nominal(0), ArffValue::Nominal(2)]);
        assert_eq!(rows.columns[1], [ArffValue::Number(85.0), ArffValue::Missing]);
        assert_eq!(rows.columns[2], [ArffValue::Nominal(1), ArffValue::Nominal(0)]);
        assert_eq!(
            rows.columns[3],
            [ArffValue::Text("hot, dry".into()), ArffValue::Missing]
        );
    }

    #[test]
    fn row_width_mismatch_is_rejected() {
        let text = "@relation r\n@attribute a numeric\n@attribute b numeric\n@data\n1,2,3\n";
        let err = ArffReader::new(text.as_bytes()).unwrap().read_dense().unwrap_err();
        assert!(matches!(err, DatasetError::Format(msg) if msg.contains("3 values")));
    }

    #[test]
    fn unknown_nominal_value_is_rejected() {
        let text = "@relation r\n@attribute a {x,y}\n@data\nz\n";
        let err = ArffReader::new(text.as_bytes()).unwrap().read_dense().unwrap_err();
        assert!(matches!(err, DatasetError::Format(msg) if msg.contains("bad nominal value")));
    }

    #[test]
    fn sparse_rows_as_coordinates() {
        let text = "@relation r\n@attribute a numeric\n@attribute b numeric\n@attribute c {0,1}\n\
                    @data\n{0 1.5, 2 1}\n{}\n{1 ?}\n";
        let coo = ArffReader::new(text.as_bytes()).unwrap().read_coo().unwrap();
        assert_eq!(coo.n_rows, 3);
        assert_eq!(coo.rows, [0, 0, 2]);
        assert_eq!(coo.cols, [0, 2, 1]);
        assert_eq!(coo.values[0], 1.5);
        assert_eq!(coo.values[1], 1.0);
        assert!(coo.values[2].is_nan());
    }

    #[test]
    fn sparse_rows_expand_in_dense_mode() {
        let text = "@relation r\n@attribute a numeric\n@attribute b numeric\n@data\n{1 4}\n";
        let rows = ArffReader::new(text.as_bytes()).unwrap().read_dense().unwrap();
        assert_eq!(rows.columns[0], [ArffValue::Number(0.0)]);
        assert_eq!(rows.columns[1], [ArffValue::Number(4.0)]);
    }

    #[test]
    fn sparse_index_out_of_range() {
        let text = "@relation r\n@attribute a numeric\n@data\n{3 1}\n";
        let err = ArffReader::new(text.as_bytes()).unwrap().read_coo().unwrap_err();
        assert!(matches!(err, DatasetError::Format(msg) if msg.contains("out of range")));
    }

    #[test]
    fn date_attributes_are_unsupported() {
        let text = "@relation r\n@attribute d date 'yyyy-MM-dd'\n@data\n";
        assert!(matches!(
            ArffReader::new(text.as_bytes()),
            Err(DatasetError::Format(_))
        ));
    }

    #[test]
    fn missing_data_section() {
        let text = "@relation r\n@attribute a numeric\n";
        assert!(matches!(
            ArffReader::new(text.as_bytes()),
            Err(DatasetError::Format(msg)) if msg.contains("@data")
        ));
    }

    #[test]
    fn quoted_values_keep_escapes() {
        let tokens = split_values(r"'it\'s', plain ,'a,b'").unwrap();
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["it's", "plain", "a,b"]);
        assert!(tokens[0].quoted && !tokens[1].quoted);
    }
}
