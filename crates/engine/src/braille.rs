//! Text to braille cell transcoding.

use brailleshelf_core::Cell;

/// North American ASCII braille: the character at index `n` has dot pattern `n`.
const ASCII_BRAILLE: &[u8; 64] =
    b" A1B'K2L@CIF/MSP\"E3H9O6R^DJG>NTQ,*5<-U8V.%[$+X!&;:4\\0Z7(_?W]#Y)=";

const NO_CELL: u8 = 0xff;

const ASCII_LOOKUP: [u8; 128] = build_ascii_lookup();

const fn build_ascii_lookup() -> [u8; 128] {
    let mut table = [NO_CELL; 128];
    let mut i = 0;
    while i < ASCII_BRAILLE.len() {
        table[ASCII_BRAILLE[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// Maps one line of source text to braille cells.
pub trait Transcoder {
    /// Braille ASCII, as found in BRF files.
    fn from_ascii(&self, line: &str) -> Vec<Cell>;

    /// Unicode braille patterns, as found in PEF files.
    fn from_unicode(&self, line: &str) -> Vec<Cell>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTranscoder;

impl Transcoder for StandardTranscoder {
    fn from_ascii(&self, line: &str) -> Vec<Cell> {
        line.chars().map(ascii_cell).collect()
    }

    fn from_unicode(&self, line: &str) -> Vec<Cell> {
        line.chars()
            .map(|ch| match u32::from(ch) {
                code @ 0x2800..=0x28ff => Cell((code - 0x2800) as u8),
                _ => ascii_cell(ch),
            })
            .collect()
    }
}

pub fn ascii_cell(ch: char) -> Cell {
    let folded = match ch {
        'a'..='z' => ch.to_ascii_uppercase(),
        '`' => '@',
        '{' => '[',
        '|' => '\\',
        '}' => ']',
        '~' => '^',
        _ => ch,
    };
    if !folded.is_ascii() {
        return Cell::EMPTY;
    }
    match ASCII_LOOKUP[folded as usize] {
        NO_CELL => Cell::EMPTY,
        dots => Cell(dots),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_dot_patterns() {
        let t = StandardTranscoder;
        // a = dot 1, b = dots 1-2, c = dots 1-4
        assert_eq!(t.from_ascii("abc"), vec![Cell(0b1), Cell(0b11), Cell(0b1001)]);
        assert_eq!(t.from_ascii("ABC"), t.from_ascii("abc"));
    }

    #[test]
    fn space_and_unknown_are_empty() {
        let t = StandardTranscoder;
        assert_eq!(t.from_ascii(" \té"), vec![Cell::EMPTY; 3]);
    }

    #[test]
    fn lowercase_punctuation_folds() {
        assert_eq!(ascii_cell('{'), ascii_cell('['));
        assert_eq!(ascii_cell('`'), ascii_cell('@'));
        assert_eq!(ascii_cell('~'), ascii_cell('^'));
    }

    #[test]
    fn unicode_braille_is_direct() {
        let t = StandardTranscoder;
        assert_eq!(
            t.from_unicode("\u{2800}\u{2801}\u{28ff}"),
            vec![Cell(0), Cell(1), Cell(0xff)]
        );
        assert_eq!(t.from_unicode("a"), vec![Cell(1)]);
    }
}
