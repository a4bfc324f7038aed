//! Parser and writer for the movie data file.
//!
//! Format: one header line naming the columns, then one movie per line.
//!
//! ```text
//! id::title::popularity::genres::actors::directors::genres_bin::actors_bin::directors_bin::poster
//! 155::The Dark Knight::123.4::Action|Crime|Drama::Christian Bale|Heath Ledger::Christopher Nolan::1010::110::1::https://...
//! ```
//!
//! - Fields are separated by `::`, list items by `|`
//! - A backslash makes the next character literal (`\:`, `\|`, `\\`)
//! - Binary vectors are strings of `0` and `1`
//! - Blank lines are skipped anywhere; lines starting with `#` are comments
//!   only before the header (after it, `#Alive` is a title like any other)
//!
//! Every parse function here is pure and reports failure through
//! `DataLoadError::MalformedRecord` with the offending line number.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

pub const FIELD_SEPARATOR: &str = "::";
pub const LIST_SEPARATOR: char = '|';
const ESCAPE: char = '\\';

/// Columns every data file must provide, in the order we write them
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "id",
    "title",
    "popularity",
    "genres",
    "actors",
    "directors",
    "genres_bin",
    "actors_bin",
    "directors_bin",
    "poster",
];

/// Position of each required column within a row
#[derive(Debug, Clone)]
pub struct Header {
    positions: HashMap<&'static str, usize>,
    width: usize,
}

impl Header {
    fn index(&self, column: &str) -> usize {
        // Only called with names from REQUIRED_COLUMNS, all checked in parse_header
        self.positions[column]
    }
}

/// A data row that parsed successfully, with its line number
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub line: usize,
    pub movie: Movie,
}

/// Result of parsing a whole file: good rows plus per-line failures
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub rows: Vec<ParsedRow>,
    pub failures: Vec<DataLoadError>,
}

/// Read and parse a data file.
///
/// Missing or unreadable files and bad headers are `DataUnavailable`.
/// Row-level problems are collected in `failures` so the caller can apply
/// its own policy.
pub fn parse_file(path: &Path) -> Result<ParsedFile> {
    let content = std::fs::read_to_string(path).map_err(|e| DataLoadError::DataUnavailable {
        path: path.display().to_string(),
        reason: match e.kind() {
            ErrorKind::NotFound => "file not found".to_string(),
            _ => e.to_string(),
        },
    })?;

    parse_str(&content).map_err(|e| match e {
        DataLoadError::DataUnavailable { reason, .. } => DataLoadError::DataUnavailable {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// Parse file contents already in memory
pub fn parse_str(content: &str) -> Result<ParsedFile> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    // Once the header is known every line is a row and goes through the
    // malformed-row policy, whatever its first character.
    let (_, header_line) = lines
        .find(|(_, line)| !line.starts_with('#'))
        .ok_or_else(|| DataLoadError::DataUnavailable {
            path: String::new(),
            reason: "file has no header line".to_string(),
        })?;
    let header = parse_header(header_line)?;

    let mut parsed = ParsedFile::default();
    for (line_no, line) in lines {
        match parse_row(line, line_no, &header) {
            Ok(movie) => parsed.rows.push(ParsedRow { line: line_no, movie }),
            Err(e) => parsed.failures.push(e),
        }
    }
    Ok(parsed)
}

/// Parse the header line and locate every required column
pub fn parse_header(line: &str) -> Result<Header> {
    let names: Vec<String> = split_fields(line, 1)?
        .iter()
        .map(|raw| unescape(raw, 1).map(|s| s.trim().to_string()))
        .collect::<Result<_>>()?;

    let mut positions = HashMap::new();
    let mut missing = Vec::new();
    for column in REQUIRED_COLUMNS {
        match names.iter().position(|n| n == column) {
            Some(i) => {
                positions.insert(column, i);
            }
            None => missing.push(column),
        }
    }

    if !missing.is_empty() {
        return Err(DataLoadError::DataUnavailable {
            path: String::new(),
            reason: format!("missing required columns: {}", missing.join(", ")),
        });
    }

    Ok(Header {
        positions,
        width: names.len(),
    })
}

/// Parse one data row into a Movie.
///
/// `normalized_popularity` is left at 0.0; it depends on the whole table and
/// is filled in by the catalogue.
pub fn parse_row(line: &str, line_no: usize, header: &Header) -> Result<Movie> {
    let fields = split_fields(line, line_no)?;
    if fields.len() != header.width {
        return Err(malformed(
            line_no,
            format!("expected {} fields but found {}", header.width, fields.len()),
        ));
    }
    let field = |name: &str| fields[header.index(name)];

    let id_text = unescape(field("id"), line_no)?;
    let id: MovieId = id_text
        .trim()
        .parse()
        .map_err(|e| malformed(line_no, format!("invalid id '{}': {}", id_text, e)))?;

    let title = unescape(field("title"), line_no)?;

    let popularity_text = unescape(field("popularity"), line_no)?;
    let popularity: f64 = popularity_text
        .trim()
        .parse()
        .map_err(|e| malformed(line_no, format!("invalid popularity '{}': {}", popularity_text, e)))?;
    if !popularity.is_finite() {
        return Err(malformed(line_no, format!("popularity must be finite, got {}", popularity)));
    }

    let poster = unescape(field("poster"), line_no)?;
    let poster = (!poster.trim().is_empty()).then(|| poster.trim().to_string());

    Ok(Movie {
        id,
        title,
        popularity,
        normalized_popularity: 0.0,
        poster,
        genres: parse_list(field("genres"), line_no)?,
        actors: parse_list(field("actors"), line_no)?,
        directors: parse_list(field("directors"), line_no)?,
        features: FeatureVectors {
            genres: parse_bits(field("genres_bin"), line_no)?,
            actors: parse_bits(field("actors_bin"), line_no)?,
            directors: parse_bits(field("directors_bin"), line_no)?,
        },
    })
}

/// Split a line on unescaped `::`, keeping escapes in place for later stages
pub fn split_fields(line: &str, line_no: usize) -> Result<Vec<&str>> {
    let bytes = line.as_bytes();
    let mut fields = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if i + 1 >= bytes.len() {
                    return Err(malformed(line_no, "dangling escape at end of line"));
                }
                // Skip the escaped character; it may be multi-byte
                i += 1;
                i += line[i..].chars().next().map_or(1, char::len_utf8);
            }
            b':' if bytes.get(i + 1) == Some(&b':') => {
                fields.push(&line[start..i]);
                i += FIELD_SEPARATOR.len();
                start = i;
            }
            _ => i += 1,
        }
    }
    fields.push(&line[start..]);
    Ok(fields)
}

/// Parse an escaped `|`-separated list. An empty field is an empty list;
/// an empty item inside a non-empty field is malformed.
pub fn parse_list(raw: &str, line_no: usize) -> Result<Vec<String>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err(malformed(line_no, "dangling escape in list")),
            },
            LIST_SEPARATOR => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);

    let items: Vec<String> = items.into_iter().map(|s| s.trim().to_string()).collect();
    if items.iter().any(String::is_empty) {
        return Err(malformed(line_no, format!("empty item in list '{}'", raw)));
    }
    Ok(items)
}

/// Parse a string of `0`/`1` characters
pub fn parse_bits(raw: &str, line_no: usize) -> Result<BinaryVector> {
    let bits = raw
        .trim()
        .chars()
        .map(|c| match c {
            '0' => Ok(0u8),
            '1' => Ok(1u8),
            other => Err(malformed(
                line_no,
                format!("invalid character '{}' in binary vector", other),
            )),
        })
        .collect::<Result<Vec<u8>>>()?;
    // Only 0/1 can reach here
    Ok(BinaryVector::from_bits(bits).unwrap_or_default())
}

/// Remove escapes from a scalar field
fn unescape(raw: &str, line_no: usize) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => return Err(malformed(line_no, "dangling escape")),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn malformed(line: usize, reason: impl Into<String>) -> DataLoadError {
    DataLoadError::MalformedRecord {
        line,
        reason: reason.into(),
    }
}

// =============================================================================
// Writing
// =============================================================================

/// Escape a value so that it survives `split_fields` and `parse_list`
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ESCAPE | ':' | LIST_SEPARATOR) {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Header line in `REQUIRED_COLUMNS` order
pub fn format_header() -> String {
    REQUIRED_COLUMNS.join(FIELD_SEPARATOR)
}

/// Serialize one movie as a data row
pub fn format_row(movie: &Movie) -> String {
    let list = |items: &[String]| {
        items
            .iter()
            .map(|s| escape(s))
            .collect::<Vec<_>>()
            .join("|")
    };
    let bits = |vector: &BinaryVector| {
        vector
            .as_slice()
            .iter()
            .map(|&b| if b == 1 { '1' } else { '0' })
            .collect::<String>()
    };

    [
        movie.id.to_string(),
        escape(&movie.title),
        movie.popularity.to_string(),
        list(&movie.genres),
        list(&movie.actors),
        list(&movie.directors),
        bits(&movie.features.genres),
        bits(&movie.features.actors),
        bits(&movie.features.directors),
        movie.poster.as_deref().map(escape).unwrap_or_default(),
    ]
    .join(FIELD_SEPARATOR)
}
