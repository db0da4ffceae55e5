// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Spam and gibberish heuristics.
//!
//! A small rule set, not a model. Every function is pure so it can be tested
//! against literal fixtures.

use lettre::Address;

/// Minimum length for a whitespace-free token to be considered a blob.
const BLOB_MIN_CHARS: usize = 20;

/// Consecutive consonants that mark a word as keyboard mash.
const CONSONANT_RUN: usize = 6;

/// Letters needed before the vowel ratio is meaningful.
const RATIO_MIN_LETTERS: usize = 4;

const MIN_VOWEL_RATIO: f64 = 0.15;
const MAX_VOWEL_RATIO: f64 = 0.8;

/// Share of words allowed to carry a consonant run.
const MAX_RUN_WORD_SHARE: f64 = 0.3;

/// A single run-bearing word is tolerated (Mkrtchyan, Szczepański).
const MIN_RUN_WORDS: usize = 2;

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Basic email shape check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return false;
    }

    email.parse::<Address>().is_ok()
}

/// Ratio of vowels to ASCII letters, or `None` when there are no letters.
pub fn vowel_ratio(text: &str) -> Option<f64> {
    let (letters, vowels) = text
        .chars()
        .filter(char::is_ascii_alphabetic)
        .fold((0usize, 0usize), |(letters, vowels), c| {
            (letters + 1, vowels + usize::from(is_vowel(c)))
        });

    if letters == 0 {
        None
    } else {
        Some(vowels as f64 / letters as f64)
    }
}

/// Whether the text contains a run of consecutive ASCII consonants.
pub fn has_consonant_run(text: &str) -> bool {
    let mut run = 0;
    for c in text.chars() {
        if c.is_ascii_alphabetic() && !is_vowel(c) {
            run += 1;
            if run >= CONSONANT_RUN {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// Whether the text is a single encoded-looking blob (base64, tokens, hashes).
pub fn is_base64_like(text: &str) -> bool {
    let text = text.trim();
    if text.chars().count() < BLOB_MIN_CHARS || text.chars().any(char::is_whitespace) {
        return false;
    }

    let symbol = |c: char| matches!(c, '+' | '/' | '=' | '_' | '-');
    if !text.chars().all(|c| c.is_ascii_alphanumeric() || symbol(c)) {
        return false;
    }

    let lower = text.chars().filter(char::is_ascii_lowercase).count();
    let upper = text.chars().filter(char::is_ascii_uppercase).count();
    let digit = text.chars().filter(char::is_ascii_digit).count();
    let symbols = text.chars().filter(|c| symbol(*c)).count();

    let classes = [lower, upper, digit, symbols]
        .iter()
        .filter(|count| **count > 0)
        .count();
    if classes >= 3 {
        return true;
    }

    // Pure-letter blobs: real words rarely have a quarter of their letters
    // capitalised.
    lower > 0 && upper * 4 >= upper + lower
}

/// Number of links in the text.
pub fn count_urls(text: &str) -> usize {
    let lower = text.to_lowercase();
    let schemes = lower.matches("http://").count() + lower.matches("https://").count();
    // `www.` that is not already part of a counted scheme URL
    let bare = lower
        .match_indices("www.")
        .filter(|(idx, _)| !lower[..*idx].ends_with("://"))
        .count();
    schemes + bare
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Whether the text looks like random characters rather than language.
pub fn looks_like_gibberish(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }

    if is_base64_like(text) {
        return true;
    }

    let letters = text.chars().filter(char::is_ascii_alphabetic).count();
    if letters >= RATIO_MIN_LETTERS {
        if let Some(ratio) = vowel_ratio(text) {
            if !(MIN_VOWEL_RATIO..=MAX_VOWEL_RATIO).contains(&ratio) {
                return true;
            }
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let run_words = words.iter().filter(|w| has_consonant_run(w)).count();
    run_words >= MIN_RUN_WORDS && run_words as f64 > words.len() as f64 * MAX_RUN_WORD_SHARE
}
