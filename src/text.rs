//! Text measurement and line wrapping.
//!
//! Both document formats set captions in the standard Helvetica family, so one
//! set of advance widths (the Adobe core font metrics, in 1/1000 em) serves
//! them both. Format providers scale these widths into their own units.
//!
//! Wrapping works on styled [`Span`]s so a caption keeps its bold label and
//! italic description on every line it occupies.

/// Font face used for a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emphasis {
    Regular,
    Strong,
    Italic,
}

/// A run of text set in one face.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub emphasis: Emphasis,
}

impl Span {
    pub fn new(text: impl Into<String>, emphasis: Emphasis) -> Self {
        Self {
            text: text.into(),
            emphasis,
        }
    }
}

/// One wrapped line: its spans in reading order and its measured width.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub spans: Vec<Span>,
    pub width: f64,
}

impl TextLine {
    /// The plain text of the line.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

// Helvetica advance widths for U+0020..=U+007E.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

// Helvetica-Bold advance widths for U+0020..=U+007E.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const FALLBACK_WIDTH: u16 = 556;

/// Accented Latin-1 letters share the advance width of their base letter.
pub(crate) fn base_letter(c: char) -> char {
    match c {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ñ' => 'n',
        'ò'..='ö' | 'ø' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ª' => 'a',
        'º' => 'o',
        '\u{a0}' => ' ',
        other => other,
    }
}

/// Advance width of `c` in 1/1000 em.
pub fn glyph_width(c: char, emphasis: Emphasis) -> u16 {
    let table = match emphasis {
        Emphasis::Strong => &HELVETICA_BOLD,
        // Oblique shares the upright metrics.
        Emphasis::Regular | Emphasis::Italic => &HELVETICA,
    };
    let code = base_letter(c) as u32;
    match code {
        0x20..=0x7E => table[(code - 0x20) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Width of `text` in 1/1000 em.
pub fn string_width(text: &str, emphasis: Emphasis) -> f64 {
    text.chars().map(|c| glyph_width(c, emphasis) as f64).sum()
}

/// Collapse every run of whitespace (newlines included) to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Words of every segment, in order, tagged with their face.
///
/// Segments are joined by a single space: a boundary between two segments is
/// always a word boundary.
fn words(segments: &[Span]) -> impl Iterator<Item = (&str, Emphasis)> {
    segments
        .iter()
        .flat_map(|s| s.text.split_whitespace().map(move |w| (w, s.emphasis)))
}

/// Width of `segments` set on a single line.
pub fn natural_width<F>(segments: &[Span], measure: F) -> f64
where
    F: Fn(&str, Emphasis) -> f64,
{
    let mut width = 0.0;
    for (i, (word, emphasis)) in words(segments).enumerate() {
        let word_w = measure(word, emphasis);
        if i == 0 {
            width += word_w;
        } else {
            width += measure(" ", emphasis) + word_w;
        }
    }
    width
}

#[derive(Default)]
struct LineBuilder {
    spans: Vec<Span>,
    width: f64,
}

impl LineBuilder {
    fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn push(&mut self, text: &str, emphasis: Emphasis, width: f64) {
        match self.spans.last_mut() {
            Some(last) if last.emphasis == emphasis => last.text.push_str(text),
            _ => self.spans.push(Span::new(text, emphasis)),
        }
        self.width += width;
    }

    fn finish(&mut self) -> TextLine {
        let line = TextLine {
            spans: std::mem::take(&mut self.spans),
            width: self.width,
        };
        self.width = 0.0;
        line
    }
}

/// Greedy word wrap of `segments` into lines no wider than `max_width`.
///
/// A single line is returned exactly when the [`natural_width`] fits. Words
/// wider than `max_width` on their own are broken between characters. The
/// separating space travels with the word that follows it, in that word's face.
pub fn wrap_spans<F>(segments: &[Span], max_width: f64, measure: F) -> Vec<TextLine>
where
    F: Fn(&str, Emphasis) -> f64,
{
    let mut lines = Vec::new();
    let mut line = LineBuilder::default();

    for (word, emphasis) in words(segments) {
        let word_w = measure(word, emphasis);

        if !line.is_empty() {
            let space_w = measure(" ", emphasis);
            let step = space_w + word_w;
            if line.width + step <= max_width {
                line.push(&format!(" {word}"), emphasis, step);
                continue;
            }
            lines.push(line.finish());
        }

        if word_w <= max_width {
            line.push(word, emphasis, word_w);
            continue;
        }

        for c in word.chars() {
            let mut buf = [0u8; 4];
            let piece = c.encode_utf8(&mut buf);
            let c_w = measure(piece, emphasis);
            if !line.is_empty() && line.width + c_w > max_width {
                lines.push(line.finish());
            }
            line.push(piece, emphasis, c_w);
        }
    }

    if !line.is_empty() {
        lines.push(line.finish());
    }
    lines
}

/// Encode `text` for a WinAnsi (Windows-1252) PDF font.
///
/// Latin-1 maps straight through; a few common typographic marks map to
/// their 1252 slots; anything else becomes `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}
