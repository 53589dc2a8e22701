// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline `--quality` / `--creativity` directives embedded in prompt text.

use std::sync::LazyLock;

use regex::Regex;

pub const DEFAULT_QUALITY: f64 = 3.0;
pub const DEFAULT_CREATIVITY: f64 = 0.6;

static QUALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--quality\s+(\d+(?:\.\d+)?)").expect("valid quality regex")
});

static CREATIVITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--creativity\s+(\d+(?:\.\d+)?)").expect("valid creativity regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Prompt text with its directives extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct Directives {
    /// Text with the directives removed and whitespace normalized.
    pub text: String,
    /// Sampler quality in `[1, 5]`.
    pub quality: f64,
    /// ControlNet strength in `[0.1, 1.0]`.
    pub creativity: f64,
}

impl Directives {
    /// Parses and strips the first occurrence of each directive.
    ///
    /// A missing directive takes its default; an out-of-range value is clamped.
    pub fn parse(prompt_text: &str) -> Self {
        let mut text = prompt_text.to_string();

        let quality = take_value(&QUALITY_RE, &mut text)
            .map(|q| q.clamp(1.0, 5.0))
            .unwrap_or(DEFAULT_QUALITY);
        let creativity = take_value(&CREATIVITY_RE, &mut text)
            .map(|c| c.clamp(0.1, 1.0))
            .unwrap_or(DEFAULT_CREATIVITY);

        let text = WHITESPACE_RE.replace_all(text.trim(), " ").into_owned();
        Self {
            text,
            quality,
            creativity,
        }
    }

    /// Sampler steps: the integer part of quality.
    pub fn steps(&self) -> u32 {
        self.quality.floor() as u32
    }
}

fn take_value(re: &Regex, text: &mut String) -> Option<f64> {
    let (range, value) = {
        let caps = re.captures(text)?;
        let whole = caps.get(0)?;
        let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
        (whole.range(), value)
    };
    text.replace_range(range, " ");
    Some(value)
}
