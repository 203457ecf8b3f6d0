//! Regional dialect post-processing
//!
//! Outgoing replies get a light Pará accent; incoming messages have common
//! chat abbreviations expanded so the model reads them correctly.

use rand::seq::SliceRandom;
use rand::Rng;

/// Replies shorter than this may get the interjection as a prefix
const SHORT_REPLY_CHARS: usize = 60;

const PREFIX_PROBABILITY: f64 = 0.6;
const INFIX_PROBABILITY: f64 = 0.25;
const CLOSING_PROBABILITY: f64 = 0.35;

/// Formal to informal forms, applied in order on whole words
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("você está", "ocê tá"),
    ("você é", "ocê é"),
    ("você", "ocê"),
    ("está", "tá"),
    ("estão", "tão"),
    ("para", "pra"),
    ("por favor", "por favor, viu"),
    ("obrigado", "brigado"),
];

const CLOSINGS: &[&str] = &["Tô aqui, ó.", "Diz aí.", "Num se acanha não, egua."];

const SLANG: &[(&str, &str)] = &[
    ("tlgd", "tá ligado"),
    ("mn", "mano"),
    ("man", "mano"),
    ("dboa", "de boa"),
    ("blz", "beleza"),
    ("bão", "bom"),
    ("obg", "obrigado"),
    ("vlw", "valeu"),
    ("vc", "você"),
    ("num", "não"),
];

/// Give a reply a regional tone. Numbers and data are never touched.
pub fn dialectize<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let mut out = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if out.is_empty() {
        return out;
    }

    if out.chars().count() < SHORT_REPLY_CHARS && rng.gen_bool(PREFIX_PROBABILITY) {
        out = format!("Égua, {}", out);
    } else if rng.gen_bool(INFIX_PROBABILITY) {
        let mut parts: Vec<&str> = out.split(',').collect();
        if parts.len() > 1 {
            let idx = (parts.len() / 2).max(1);
            parts.insert(idx, " égua");
            out = parts.join(",");
        }
    }

    for (formal, informal) in SUBSTITUTIONS {
        out = replace_words(&out, formal, informal);
        out = replace_words(&out, &capitalize(formal), &capitalize(informal));
    }

    if !out.ends_with(&['!', '.', '?'][..]) {
        out.push('.');
    }

    if rng.gen_bool(CLOSING_PROBABILITY) {
        if let Some(closing) = CLOSINGS.choose(rng) {
            out.push(' ');
            out.push_str(closing);
        }
    }

    out
}

/// Expand chat abbreviations word by word, keeping trailing punctuation
pub fn normalize_slang(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let core = word.trim_end_matches(|c: char| c.is_ascii_punctuation());
            let tail = &word[core.len()..];
            let lower = core.to_lowercase();
            match SLANG.iter().find(|(short, _)| *short == lower) {
                Some((_, long)) => format!("{}{}", long, tail),
                None => word.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace `from` where it is not part of a longer word
fn replace_words(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(from) {
        let before = rest[..pos].chars().next_back();
        let after = rest[pos + from.len()..].chars().next();
        let bounded = !before.is_some_and(char::is_alphanumeric)
            && !after.is_some_and(char::is_alphanumeric);

        out.push_str(&rest[..pos]);
        out.push_str(if bounded { to } else { from });
        rest = &rest[pos + from.len()..];
    }

    out.push_str(rest);
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
