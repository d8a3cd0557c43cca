//! Numeric codec for cloud-variable frames
//!
//! Cloud variables carry digits only, so request and reply text travels as
//! two digits per character over a fixed alphabet. A decoded request frame
//! is `id#name#arg1#...`; a reply frame is `id#payload`, with list
//! payloads joined by `#`.

use gems_core::{GemsError, Result};
use gems_types::{Reply, Request};

/// Every character that can cross the wire. Codes start at 10 so each one
/// is exactly two digits; anything outside the alphabet encodes as `?`.
const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789 -_.#,:;!?@&<>()[]{}'\"/+=%*";

const CODE_OFFSET: usize = 10;

fn code_of(c: char) -> usize {
    let idx = ALPHABET
        .chars()
        .position(|a| a == c)
        .or_else(|| ALPHABET.chars().position(|a| a == '?'))
        .unwrap_or(0);
    idx + CODE_OFFSET
}

/// Encode text into a digit string. Uppercase folds to lowercase; cloud
/// variables are case-insensitive anyway.
pub fn encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars().flat_map(|c| c.to_lowercase()) {
        out.push_str(&format!("{:02}", code_of(c)));
    }
    out
}

/// Decode a digit string back into text.
pub fn decode(digits: &str) -> Result<String> {
    let digits = digits.trim();
    if digits.len() % 2 != 0 {
        return Err(GemsError::Transport("Odd-length cloud frame".to_string()));
    }
    let mut out = String::with_capacity(digits.len() / 2);
    let bytes = digits.as_bytes();
    for pair in bytes.chunks(2) {
        let code: usize = std::str::from_utf8(pair)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| GemsError::Transport("Non-numeric cloud frame".to_string()))?;
        let c = code
            .checked_sub(CODE_OFFSET)
            .and_then(|idx| ALPHABET.chars().nth(idx))
            .ok_or_else(|| {
                GemsError::Transport(format!("Character code {} out of range", code))
            })?;
        out.push(c);
    }
    Ok(out)
}

/// Split a decoded frame into a request: correlation id, operation name,
/// then positional arguments.
pub fn parse_request(text: &str) -> Result<Request> {
    let mut parts = text.split('#');
    let id = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or_default();
    if id.is_empty() || name.is_empty() {
        return Err(GemsError::Transport(format!(
            "Malformed request frame: '{}'",
            text
        )));
    }
    Ok(Request {
        id: id.to_string(),
        name: name.to_string(),
        args: parts.map(|s| s.to_string()).collect(),
    })
}

/// Encode a reply frame for the given request id.
pub fn encode_reply(id: &str, reply: &Reply) -> String {
    let payload = match reply {
        Reply::Text(text) => text.clone(),
        Reply::List(items) => items.join("#"),
    };
    encode(&format!("{}#{}", id, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        for text in ["pong", "42#balance#alice", "12:34 on 05/06/26 - you gave 30 gems to bob!"] {
            assert_eq!(decode(&encode(text)).unwrap(), text);
        }
    }

    #[test]
    fn uppercase_folds_to_lowercase() {
        assert_eq!(decode(&encode("PONG")).unwrap(), "pong");
    }

    #[test]
    fn characters_outside_the_alphabet_become_question_marks() {
        assert_eq!(decode(&encode("caf\u{00e9}")).unwrap(), "caf?");
    }

    #[test]
    fn malformed_digit_strings_are_rejected() {
        assert!(decode("123").is_err());
        assert!(decode("ab").is_err());
        assert!(decode("0199").is_err());
    }

    #[test]
    fn request_frames_split_on_hashes() {
        let req = parse_request("7#give#30#bob alice smith").unwrap();
        assert_eq!(req.id, "7");
        assert_eq!(req.name, "give");
        assert_eq!(req.args, vec!["30", "bob alice smith"]);

        let bare = parse_request("7#ping").unwrap();
        assert!(bare.args.is_empty());

        assert!(parse_request("7").is_err());
        assert!(parse_request("").is_err());
    }

    #[test]
    fn reply_frames_echo_the_request_id() {
        assert_eq!(
            decode(&encode_reply("7", &Reply::from("pong"))).unwrap(),
            "7#pong"
        );
        assert_eq!(
            decode(&encode_reply(
                "7",
                &Reply::List(vec!["a: 1".to_string(), "b: 2".to_string()])
            ))
            .unwrap(),
            "7#a: 1#b: 2"
        );
    }
}
