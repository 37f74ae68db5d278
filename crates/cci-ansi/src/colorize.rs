// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! SGR escape-code interpretation for build log output
//!
//! [`colorize`] walks a raw log string and splits it into runs of text, each
//! carrying the color/attribute state active at that point in the stream.
//! Anything that is not a well-formed SGR sequence (other CSI sequences,
//! truncated escapes, stray ESC bytes) is kept as literal text; the
//! colorizer never fails.

use crate::scheme::Color;

const ESC: char = '\u{1b}';

/// The 16 indexed slot colors plus the default foreground, produced by
/// [`crate::scheme::ColorScheme::palette`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub slots: [Color; 16],
    pub default_fg: Color,
}

impl Palette {
    pub fn slot(&self, index: u8) -> Color {
        self.slots[index as usize % 16]
    }
}

/// Attribute state for one run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub fg: Color,
    pub bg: Option<Color>,
    pub bold: bool,
}

/// One run of characters sharing a style.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub style: TextStyle,
}

/// Styled text: the colorizer's output, an ordered list of spans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledText {
    pub spans: Vec<Span>,
}

impl StyledText {
    /// Colorize `raw` and append the result.
    ///
    /// Each chunk is interpreted independently, starting from the default
    /// state: escape state deliberately does not carry across appended
    /// chunks, matching how the log view has always behaved for streamed
    /// output. Callers that need continuity must append whole lines.
    pub fn append_raw(&mut self, raw: &str, palette: &Palette) {
        let chunk = colorize(raw, palette);
        self.spans.extend(chunk.spans);
    }

    /// The text with all styling dropped.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

struct Interpreter<'a> {
    palette: &'a Palette,
    fg: Color,
    bg: Option<Color>,
    bold: bool,
    spans: Vec<Span>,
    current: String,
}

impl<'a> Interpreter<'a> {
    fn new(palette: &'a Palette) -> Self {
        Interpreter {
            palette,
            fg: palette.default_fg,
            bg: None,
            bold: false,
            spans: Vec::new(),
            current: String::new(),
        }
    }

    fn style(&self) -> TextStyle {
        TextStyle {
            fg: self.fg,
            bg: self.bg,
            bold: self.bold,
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let text = std::mem::take(&mut self.current);
            self.spans.push(Span {
                text,
                style: self.style(),
            });
        }
    }

    fn apply_code(&mut self, code: u16) {
        match code {
            0 => {
                self.fg = self.palette.default_fg;
                self.bg = None;
                self.bold = false;
            }
            1 => self.bold = true,
            22 => self.bold = false,
            30..=37 => self.fg = self.palette.slot((code - 30) as u8),
            39 => self.fg = self.palette.default_fg,
            90..=97 => self.fg = self.palette.slot((code - 90 + 8) as u8),
            40..=47 => self.bg = Some(self.palette.slot((code - 40) as u8)),
            49 => self.bg = None,
            100..=107 => self.bg = Some(self.palette.slot((code - 100 + 8) as u8)),
            // Unsupported attributes (underline, blink, 256-color
            // introducers, ...) are ignored rather than rejected.
            _ => {}
        }
    }

    fn apply_sgr(&mut self, params: &str) {
        self.flush();
        if params.is_empty() {
            self.apply_code(0);
            return;
        }
        for part in params.split(';') {
            // An empty parameter means 0 per ECMA-48.
            let code = if part.is_empty() {
                0
            } else {
                match part.parse::<u16>() {
                    Ok(code) => code,
                    Err(_) => continue,
                }
            };
            self.apply_code(code);
        }
    }

    fn finish(mut self) -> StyledText {
        self.flush();
        StyledText { spans: self.spans }
    }
}

/// Interpret SGR escape sequences in `raw` against `palette`.
pub fn colorize(raw: &str, palette: &Palette) -> StyledText {
    let mut interp = Interpreter::new(palette);
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ESC {
            interp.current.push(c);
            continue;
        }

        if chars.peek() != Some(&'[') {
            // Bare ESC or a non-CSI escape: keep it literal.
            interp.current.push(c);
            continue;
        }
        chars.next();

        // Collect the parameter bytes. A well-formed SGR sequence is
        // ESC '[' <digits and ';'> 'm'.
        let mut params = String::new();
        let mut terminator = None;
        for t in chars.by_ref() {
            if t.is_ascii_digit() || t == ';' {
                params.push(t);
            } else {
                terminator = Some(t);
                break;
            }
        }

        match terminator {
            Some('m') => interp.apply_sgr(&params),
            Some(other) => {
                // Some other CSI sequence (cursor movement, erase, ...) or a
                // malformed one: surface it as literal text.
                interp.current.push(ESC);
                interp.current.push('[');
                interp.current.push_str(&params);
                interp.current.push(other);
            }
            None => {
                // Truncated sequence at end of input.
                interp.current.push(ESC);
                interp.current.push('[');
                interp.current.push_str(&params);
            }
        }
    }

    interp.finish()
}
