//! Extraction of raw `@name` / `#name` tokens from free text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Which family of mention a token prefix introduces
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MentionKind {
    /// `@name`, matched against NPCs and players
    Character,
    /// `#name`, matched against regions and subregions
    Region,
}

impl MentionKind {
    pub const ALL: [MentionKind; 2] = [MentionKind::Character, MentionKind::Region];

    pub fn prefix(self) -> char {
        match self {
            MentionKind::Character => '@',
            MentionKind::Region => '#',
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            MentionKind::Character => &CHARACTER_TOKEN,
            MentionKind::Region => &REGION_TOKEN,
        }
    }
}

// A token is a run of name characters where single whitespace characters may
// sit between them. It stops at a whitespace run of two or more, at `.!?,;:`,
// at the next `@` or `#`, or at the end of the text.
const NAME_CHAR: &str = r"[^\s.!?,;:@#]";

static CHARACTER_TOKEN: Lazy<Regex> = Lazy::new(|| token_regex('@'));
static REGION_TOKEN: Lazy<Regex> = Lazy::new(|| token_regex('#'));

fn token_regex(prefix: char) -> Regex {
    let pattern = format!(
        r"{}({NAME_CHAR}(?:{NAME_CHAR}|\s{NAME_CHAR})*)",
        regex::escape(&prefix.to_string())
    );
    Regex::new(&pattern).expect("mention token pattern is valid")
}

/// A token as found in the text, without its prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct RawToken {
    pub kind: MentionKind,
    pub text: String,
    /// Byte offset of the prefix character in the source text
    pub offset: usize,
}

impl RawToken {
    /// The token as typed, prefix included
    pub fn raw(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.text)
    }
}

/// Scan `text` for tokens of one kind, in order of appearance.
pub fn tokenize(text: &str, kind: MentionKind) -> Vec<RawToken> {
    kind.pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(RawToken {
                kind,
                text: name.as_str().to_string(),
                offset: whole.start(),
            })
        })
        .collect()
}
