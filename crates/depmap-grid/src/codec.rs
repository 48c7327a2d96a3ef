use depmap_core::DIAGONAL_CHAR;

/// Compresses runs of 3+ repeated characters other than the diagonal marker
/// into `char + count` (e.g. `"nnnnnpppdd"` -> `"n5p3dd"`). Shorter runs and
/// the diagonal character are left alone.
pub fn compress(s: &str) -> String {
    if s.chars().count() <= 3 {
        return s.to_string();
    }

    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut run_end = i + 1;
        while run_end < chars.len() && chars[run_end] == c {
            run_end += 1;
        }
        let run_len = run_end - i;
        if c != DIAGONAL_CHAR && run_len >= 3 {
            out.push(c);
            out.push_str(&run_len.to_string());
        } else {
            for _ in 0..run_len {
                out.push(c);
            }
        }
        i = run_end;
    }
    out
}

/// Expands a run-length encoded row back to its full-width form.
pub fn decompress(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 3 && !chars.iter().any(|c| c.is_ascii_digit()) {
        return s.to_string();
    }

    let mut result = String::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
            let ch = chars[i];
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            let count: usize = chars[i + 1..j].iter().collect::<String>().parse().unwrap_or(0);
            for _ in 0..count {
                result.push(ch);
            }
            i = j;
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }
    result
}

/// Reads the decompressed character at `index` without materializing the
/// whole row.
pub fn get_char_at(s: &str, index: usize) -> Option<char> {
    let chars: Vec<char> = s.chars().collect();
    let mut decompressed_index = 0;
    let mut i = 0;
    while i < chars.len() {
        if i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
            let ch = chars[i];
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            let count: usize = chars[i + 1..j].iter().collect::<String>().parse().unwrap_or(0);
            if decompressed_index + count > index {
                return Some(ch);
            }
            decompressed_index += count;
            i = j;
        } else {
            if decompressed_index == index {
                return Some(chars[i]);
            }
            decompressed_index += 1;
            i += 1;
        }
    }
    None
}

/// Sets the decompressed character at `index` and returns the re-compressed
/// row.
pub fn set_char_at(s: &str, index: usize, new_char: char) -> Option<String> {
    let decompressed = decompress(s);
    let mut chars: Vec<char> = decompressed.chars().collect();
    if index >= chars.len() {
        return None;
    }
    chars[index] = new_char;
    Some(compress(&chars.into_iter().collect::<String>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_collapses_runs_of_three_or_more() {
        assert_eq!(compress("nnnnnpppdd"), "n5p3dd");
    }

    #[test]
    fn compress_leaves_short_runs_and_diagonal_alone() {
        assert_eq!(compress("oo"), "oo");
        assert_eq!(compress("ooooo"), "ooooo");
        assert_eq!(compress("pp"), "pp");
    }

    #[test]
    fn decompress_is_inverse_of_compress() {
        let original = "nnnnnpppddoooooxx";
        assert_eq!(decompress(&compress(original)), original);
    }

    #[test]
    fn get_char_at_finds_index_inside_a_run() {
        let compressed = compress("nnnnnpppdd");
        assert_eq!(get_char_at(&compressed, 0), Some('n'));
        assert_eq!(get_char_at(&compressed, 4), Some('n'));
        assert_eq!(get_char_at(&compressed, 5), Some('p'));
        assert_eq!(get_char_at(&compressed, 9), Some('d'));
        assert_eq!(get_char_at(&compressed, 10), None);
    }

    #[test]
    fn set_char_at_updates_single_position() {
        let compressed = compress("ppppp");
        let updated = set_char_at(&compressed, 2, '>').unwrap();
        assert_eq!(decompress(&updated), "pp>pp");
    }
}
