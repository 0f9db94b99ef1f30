//! A1-style cell references used by the XLSX reader and writer.

/// 0-based column index to letters (`0` -> `A`, `26` -> `AA`).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col + 1;
    while n > 0 {
        n -= 1;
        let c = char::from(b'A' + (n % 26) as u8);
        result.insert(0, c);
        n /= 26;
    }
    result
}

/// `A1`-style reference for a 0-based (row, col).
#[must_use]
pub fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letter(col), row + 1)
}

/// Parse a cell reference like "B3" into 0-based (row, col).
#[must_use]
pub fn parse_cell_ref(cell_ref: &str) -> Option<(usize, usize)> {
    let mut col: usize = 0;
    let mut row: usize = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for ch in cell_ref.trim().chars() {
        if ch == '$' {
            continue;
        }
        if ch.is_ascii_alphabetic() {
            if saw_row {
                return None;
            }
            let upper = ch.to_ascii_uppercase();
            col = col
                .checked_mul(26)?
                .checked_add(upper as usize - 'A' as usize + 1)?;
            saw_col = true;
        } else if let Some(digit) = ch.to_digit(10) {
            row = row.checked_mul(10)?.checked_add(digit as usize)?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 {
        return None;
    }

    Some((row - 1, col - 1))
}

/// Parse the end of a `dimension` ref ("A1:C10" or "C10") into a
/// (rows, columns) size.
#[must_use]
pub fn parse_dimension(range: &str) -> Option<(usize, usize)> {
    let end = range.rsplit(':').next()?;
    parse_cell_ref(end).map(|(row, col)| (row + 1, col + 1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, "A")]
    #[test_case(25, "Z")]
    #[test_case(26, "AA")]
    #[test_case(701, "ZZ")]
    #[test_case(702, "AAA")]
    fn test_col_to_letter(col: usize, expected: &str) {
        assert_eq!(col_to_letter(col), expected);
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("$AB$12"), Some((11, 27)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("1A"), None);
        assert_eq!(parse_cell_ref(&cell_ref(41, 3)), Some((41, 3)));
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension("A1:Z1000"), Some((1000, 26)));
        assert_eq!(parse_dimension("C4"), Some((4, 3)));
    }
}
