// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Turning styled text and badge colors back into terminal escapes

use cci_ansi::{Color, StyledText};

fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Truecolor foreground escape for a resolved color. Alpha is approximated
/// by scaling toward black, which is close enough for dimmed badges.
pub fn fg_escape(color: Color) -> String {
    let a = color.a.clamp(0.0, 1.0);
    format!(
        "\u{1b}[38;2;{};{};{}m",
        channel(color.r * a),
        channel(color.g * a),
        channel(color.b * a)
    )
}

pub const RESET: &str = "\u{1b}[0m";

/// Render styled text for a terminal, one escape per span.
pub fn render(styled: &StyledText) -> String {
    let mut out = String::new();
    for span in &styled.spans {
        out.push_str(&fg_escape(span.style.fg));
        if span.style.bold {
            out.push_str("\u{1b}[1m");
        }
        out.push_str(&span.text);
        out.push_str(RESET);
    }
    out
}

/// A colored status word, e.g. `success` painted with its badge color.
pub fn badge(text: &str, color: Color) -> String {
    format!("{}{}{}", fg_escape(color), text, RESET)
}
