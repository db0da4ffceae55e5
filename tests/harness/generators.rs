// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for abuse simulation.

use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr};

pub const VALID_TOKEN: &str = "valid-token";

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

const FIRST_NAMES: &[&str] = &["Jane", "Omar", "Lucia", "Kenji", "Amara", "Peter"];
const LAST_NAMES: &[&str] = &["Doe", "Haddad", "Moreno", "Tanaka", "Okafor", "Lindqvist"];
const TOPICS: &[&str] = &["Partnerships", "Volunteering", "Press", "Donations"];

/// A plausible human submission, varied by index.
pub fn legit_payload(i: usize) -> Value {
    let first = FIRST_NAMES[i % FIRST_NAMES.len()];
    let last = LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()];
    json!({
        "name": format!("{} {}", first, last),
        "email": format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        "interest": TOPICS[i % TOPICS.len()],
        "message": format!(
            "Hello, I would like to learn more about your work on project number {} \
             and how our local group could help out this season.",
            i
        ),
        "cf-turnstile-response": VALID_TOKEN,
    })
}

/// Same as [`legit_payload`] but with a token the verifier rejects.
pub fn forged_token_payload(i: usize) -> Value {
    let mut payload = legit_payload(i);
    payload["cf-turnstile-response"] = json!(format!("forged-{}", i));
    payload
}

/// A bot that fills every field, honeypot included.
pub fn honeypot_payload(i: usize) -> Value {
    let mut payload = legit_payload(i);
    payload["_gotcha"] = json!("https://cheap-pills.example/");
    payload
}

/// Messages that must fail the content heuristics.
pub fn junk_messages() -> Vec<&'static str> {
    vec![
        // Encoded blob
        "U29tZSBiYXNlNjQgZW5jb2RlZCBwYXlsb2FkIHRoYXQgaXMgbG9uZw==",
        // Keyboard mash
        "sdfghjkl qwrtypsd zxcvbnm bcdfghjk lkjhgfd",
        // Link spam
        "Buy now https://a.example https://b.example https://c.example https://d.example",
        // Too short
        "hi there",
        // No vowels at all
        "xqzt brrr pfft shhh tsktsk",
    ]
}

/// Submissions that pass the CAPTCHA but carry a junk message.
pub fn junk_payload(i: usize) -> Value {
    let junk = junk_messages();
    let mut payload = legit_payload(i);
    payload["message"] = json!(junk[i % junk.len()]);
    payload
}

/// Names that must fail the name heuristics.
pub fn junk_names() -> Vec<&'static str> {
    vec!["Jane", "xkcdqwrt zzvbnmpl", "QmFzZTY0TmFtZUhlcmU9", "   "]
}

/// Various Content-Type values for bypass testing.
pub fn generate_content_types() -> Vec<Option<&'static str>> {
    vec![
        // Valid
        Some("application/json"),
        Some("application/json; charset=utf-8"),
        Some("APPLICATION/JSON"), // Case variation
        // Invalid - should be rejected
        Some("text/plain"),
        Some("multipart/form-data"),
        Some("application/x-www-form-urlencoded"),
        Some("application/json-patch+json"),
        Some("text/json"),
        None, // Missing
        Some(""), // Empty
        Some("   "), // Whitespace
    ]
}

/// Classify a Content-Type as valid or invalid.
pub fn is_valid_content_type(ct: Option<&str>) -> bool {
    match ct {
        Some(s) => {
            let normalized = s.split(';').next().unwrap_or("").trim().to_lowercase();
            normalized == "application/json"
        }
        None => false,
    }
}

/// Bodies that are not a JSON object.
pub fn malformed_bodies() -> Vec<&'static [u8]> {
    let bodies: [&'static [u8]; 7] = [
        b"",
        b"null",
        b"[]",
        b"\"name\"",
        b"{\"name\": ",
        b"name=Jane&email=jane@example.com",
        b"\xff\xfe\x00",
    ];
    bodies.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_legit_payloads_vary() {
        assert_ne!(legit_payload(0)["name"], legit_payload(1)["name"]);
        assert_eq!(legit_payload(0)["cf-turnstile-response"], VALID_TOKEN);
    }

    #[test]
    fn test_content_type_classification() {
        assert!(is_valid_content_type(Some("application/json")));
        assert!(is_valid_content_type(Some("application/json; charset=utf-8")));
        assert!(!is_valid_content_type(Some("text/json")));
        assert!(!is_valid_content_type(None));
    }
}
