//! A1-style cell and range addressing.
//!
//! `$` absolute markers and the optional sheet prefix are retained for
//! printing only; identity (`Eq`/`Hash`) covers sheet, row and column.

use once_cell::sync::Lazy;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::{ErrorKind, FormulaError};

// Column lookup table for common columns (A-ZZ = 702 columns)
static COLUMN_LOOKUP: Lazy<Vec<String>> = Lazy::new(|| {
    let mut cols = Vec::with_capacity(702);
    for c in b'A'..=b'Z' {
        cols.push(String::from(c as char));
    }
    for c1 in b'A'..=b'Z' {
        for c2 in b'A'..=b'Z' {
            cols.push(format!("{}{}", c1 as char, c2 as char));
        }
    }
    cols
});

/// Convert a column letter run (e.g. "A", "BC") to a 1-based column number.
pub fn column_to_number(column: &str) -> Result<u32, FormulaError> {
    let bytes = column.as_bytes();
    // Column names cap at three letters (XFD = 16384); longer runs are not
    // column references.
    if bytes.is_empty() || bytes.len() > 3 {
        return Err(FormulaError::new_ref().with_message(format!("invalid column: {column}")));
    }
    let mut result = 0u32;
    for &b in bytes {
        if !b.is_ascii_alphabetic() {
            return Err(FormulaError::new_ref().with_message(format!("invalid column: {column}")));
        }
        result = result * 26 + (b.to_ascii_uppercase() - b'A' + 1) as u32;
    }
    Ok(result)
}

/// Convert a 1-based column number to its letter form.
pub fn number_to_column(mut num: u32) -> String {
    if num > 0 && num <= 702 {
        return COLUMN_LOOKUP[(num - 1) as usize].clone();
    }
    let mut result = String::with_capacity(3);
    while num > 0 {
        num -= 1;
        result.insert(0, ((num % 26) as u8 + b'A') as char);
        num /= 26;
    }
    result
}

/// Whether a sheet name needs single-quoting when printed.
fn sheet_name_needs_quoting(name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    let bytes = name.as_bytes();
    if bytes[0].is_ascii_digit() {
        return true;
    }
    bytes
        .iter()
        .any(|b| !(b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.'))
}

fn format_sheet_prefix(sheet: &str, out: &mut String) {
    if sheet_name_needs_quoting(sheet) {
        out.push('\'');
        out.push_str(&sheet.replace('\'', "''"));
        out.push('\'');
    } else {
        out.push_str(sheet);
    }
    out.push('!');
}

/* ───────────────────────────── Coord ──────────────────────────── */

/// A 1-based (row, col) pair with per-component absolute markers.
#[derive(Debug, Clone, Copy)]
pub struct Coord {
    pub row: u32,
    pub col: u32,
    pub abs_row: bool,
    pub abs_col: bool,
}

impl Coord {
    pub fn new(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            abs_row: false,
            abs_col: false,
        }
    }

    pub fn absolute(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            abs_row: true,
            abs_col: true,
        }
    }
}

// Absolute markers are print-only: they never affect identity.
impl PartialEq for Coord {
    fn eq(&self, other: &Self) -> bool {
        self.row == other.row && self.col == other.col
    }
}
impl Eq for Coord {}
impl std::hash::Hash for Coord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.row.hash(state);
        self.col.hash(state);
    }
}

impl Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.abs_col {
            write!(f, "$")?;
        }
        write!(f, "{}", number_to_column(self.col))?;
        if self.abs_row {
            write!(f, "$")?;
        }
        write!(f, "{}", self.row)
    }
}

/* ──────────────────────────── CellRef ─────────────────────────── */

/// A parsed `[Sheet!]$?Col$?Row` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub sheet: Option<String>,
    pub coord: Coord,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self {
            sheet: None,
            coord: Coord::new(row, col),
        }
    }

    pub fn on_sheet<S: Into<String>>(sheet: S, row: u32, col: u32) -> Self {
        Self {
            sheet: Some(sheet.into()),
            coord: Coord::new(row, col),
        }
    }

    pub fn row(&self) -> u32 {
        self.coord.row
    }

    pub fn col(&self) -> u32 {
        self.coord.col
    }

    /// Shift by a (possibly negative) row/column delta. Fails when the result
    /// would fall above row 1 or left of column A.
    pub fn offset(&self, drow: i64, dcol: i64) -> Result<CellRef, FormulaError> {
        let row = self.coord.row as i64 + drow;
        let col = self.coord.col as i64 + dcol;
        if row < 1 || col < 1 || row > u32::MAX as i64 || col > u32::MAX as i64 {
            return Err(ErrorKind::Ref.into());
        }
        Ok(CellRef {
            sheet: self.sheet.clone(),
            coord: Coord::new(row as u32, col as u32),
        })
    }
}

impl Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if let Some(sheet) = &self.sheet {
            format_sheet_prefix(sheet, &mut out);
        }
        write!(f, "{out}{}", self.coord)
    }
}

/* ──────────────────────────── RangeRef ────────────────────────── */

/// A rectangular `start:end` region. Both endpoints are full cell coords;
/// the stored corners are normalised so `start` is the top-left.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeRef {
    pub sheet: Option<String>,
    pub start: Coord,
    pub end: Coord,
}

impl RangeRef {
    pub fn new(sheet: Option<String>, a: Coord, b: Coord) -> Self {
        let start = Coord {
            row: a.row.min(b.row),
            col: a.col.min(b.col),
            abs_row: a.abs_row,
            abs_col: a.abs_col,
        };
        let end = Coord {
            row: a.row.max(b.row),
            col: a.col.max(b.col),
            abs_row: b.abs_row,
            abs_col: b.abs_col,
        };
        Self { sheet, start, end }
    }

    pub fn rows(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn cols(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    /// Every cell the range covers, row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        let sheet = self.sheet.clone();
        (self.start.row..=self.end.row).flat_map(move |r| {
            let sheet = sheet.clone();
            (self.start.col..=self.end.col).map(move |c| CellRef {
                sheet: sheet.clone(),
                coord: Coord::new(r, c),
            })
        })
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        self.sheet == cell.sheet
            && (self.start.row..=self.end.row).contains(&cell.coord.row)
            && (self.start.col..=self.end.col).contains(&cell.coord.col)
    }
}

impl Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if let Some(sheet) = &self.sheet {
            format_sheet_prefix(sheet, &mut out);
        }
        write!(f, "{out}{}:{}", self.start, self.end)
    }
}

/* ───────────────────────── text parsing ───────────────────────── */

/// Split an optional sheet prefix (`Sheet!` or `'Quoted name'!`) off a
/// reference string.
fn split_sheet(reference: &str) -> Result<(Option<String>, &str), FormulaError> {
    let bytes = reference.as_bytes();
    if bytes.first() == Some(&b'\'') {
        let mut i = 1;
        let mut sheet = String::new();
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    sheet.push('\'');
                    i += 2;
                    continue;
                }
                if bytes.get(i + 1) == Some(&b'!') {
                    return Ok((Some(sheet), &reference[i + 2..]));
                }
                return Err(FormulaError::new_ref()
                    .with_message(format!("bad sheet prefix in '{reference}'")));
            }
            // quoted names are free-form text
            let ch_len = reference[i..].chars().next().map_or(1, char::len_utf8);
            sheet.push_str(&reference[i..i + ch_len]);
            i += ch_len;
        }
        return Err(FormulaError::new_ref().with_message("unterminated sheet quote"));
    }
    if let Some(bang) = reference.find('!') {
        let sheet = &reference[..bang];
        // a ':' left of the '!' means the colon splits two sheet-qualified
        // endpoints — not a single-sheet reference
        if sheet.is_empty() || sheet.contains(':') {
            return Err(FormulaError::new_ref().with_message("bad sheet prefix"));
        }
        return Ok((Some(sheet.to_string()), &reference[bang + 1..]));
    }
    Ok((None, reference))
}

/// Parse a bare `$?Col$?Row` coordinate (no sheet, no colon).
pub fn parse_coord(part: &str) -> Result<Coord, FormulaError> {
    let bytes = part.as_bytes();
    let mut i = 0;

    let abs_col = bytes.first() == Some(&b'$');
    if abs_col {
        i += 1;
    }

    let col_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == col_start {
        return Err(FormulaError::new_ref().with_message(format!("invalid reference: {part}")));
    }
    let col = column_to_number(&part[col_start..i])?;

    let abs_row = bytes.get(i) == Some(&b'$');
    if abs_row {
        i += 1;
    }

    let row_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == row_start || i != bytes.len() {
        return Err(FormulaError::new_ref().with_message(format!("invalid reference: {part}")));
    }
    let row: u32 = part[row_start..i]
        .parse()
        .map_err(|_| FormulaError::new_ref().with_message(format!("invalid row in {part}")))?;
    if row == 0 {
        return Err(FormulaError::new_ref().with_message("row numbers start at 1"));
    }

    Ok(Coord {
        row,
        col,
        abs_row,
        abs_col,
    })
}

impl FromStr for CellRef {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sheet, rest) = split_sheet(s.trim())?;
        if rest.contains(':') {
            return Err(FormulaError::new_ref().with_message("expected a single cell"));
        }
        Ok(CellRef {
            sheet,
            coord: parse_coord(rest)?,
        })
    }
}

impl FromStr for RangeRef {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sheet, rest) = split_sheet(s.trim())?;
        let (a, b) = rest
            .split_once(':')
            .ok_or_else(|| FormulaError::new_ref().with_message("expected start:end"))?;
        Ok(RangeRef::new(sheet, parse_coord(a)?, parse_coord(b)?))
    }
}

/// Parse either a cell or a range reference, as `INDIRECT` does.
pub fn parse_reference(s: &str) -> Result<ReferenceKind, FormulaError> {
    let (sheet, rest) = split_sheet(s.trim())?;
    if let Some((a, b)) = rest.split_once(':') {
        Ok(ReferenceKind::Range(RangeRef::new(
            sheet,
            parse_coord(a)?,
            parse_coord(b)?,
        )))
    } else {
        Ok(ReferenceKind::Cell(CellRef {
            sheet,
            coord: parse_coord(rest)?,
        }))
    }
}

/// A parsed reference of either shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Cell(CellRef),
    Range(RangeRef),
}
