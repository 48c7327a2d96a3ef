use anyhow::{bail, Context, Result};
use depmap_grid::{compress, decompress, get_char_at, set_char_at};
use serde::Serialize;

/// Implements the `compress-grid` utility command.
pub fn compress_row(raw: &str) -> String {
    compress(raw)
}

/// Implements the `decompress-grid` utility command.
pub fn decompress_row(compressed: &str) -> String {
    decompress(compressed)
}

#[derive(Debug, Serialize)]
pub struct GridCharResult {
    pub index: usize,
    pub value: char,
}

/// Implements `get-char`: reads the character at `index` out of a compressed
/// row without fully decompressing it.
pub fn get_char(compressed: &str, index: usize) -> Result<GridCharResult> {
    let value = get_char_at(compressed, index).with_context(|| format!("index {index} out of range"))?;
    Ok(GridCharResult { index, value })
}

/// Implements `set-char`: rewrites a single cell of a compressed row and
/// returns the re-compressed result.
pub fn set_char(compressed: &str, index: usize, new_char: char) -> Result<String> {
    match set_char_at(compressed, index, new_char) {
        Some(updated) => Ok(updated),
        None => bail!("index {index} out of range for row of decompressed length"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_then_decompress_round_trips() {
        let raw = "ppppoxxxx..";
        let compressed = compress_row(raw);
        assert_eq!(decompress_row(&compressed), raw);
    }

    #[test]
    fn get_and_set_char_operate_on_compressed_rows() {
        let compressed = compress_row("oppp");
        let result = get_char(&compressed, 1).unwrap();
        assert_eq!(result.value, 'p');

        let updated = set_char(&compressed, 1, '>').unwrap();
        assert_eq!(decompress_row(&updated), "o>pp");
    }

    #[test]
    fn get_char_out_of_range_errors() {
        let compressed = compress_row("op");
        assert!(get_char(&compressed, 5).is_err());
    }
}
