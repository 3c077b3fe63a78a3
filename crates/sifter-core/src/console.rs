//! Console-formatting-marker stripping
//!
//! Matched text is lifted straight out of captured build output, which
//! may carry embedded console formatting: ANSI color/CSI sequences, OSC
//! title sequences, and concealed host annotations of the form
//! `ESC[8mha:<payload>ESC[0m` that some CI systems weave into log lines.
//! [`strip_markers`] removes all of them so the recorded indication text
//! is plain.  Pure function, no allocation when the text is already
//! clean.

use std::borrow::Cow;

use memchr::memchr;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Preamble of a concealed host annotation.  Everything from here to the
/// closing `ESC[0m` is metadata, not log text.
const CONCEAL_PREAMBLE: &str = "\u{1b}[8mha:";

/// Remove embedded console-formatting markers from `text`.
///
/// Strips CSI sequences (`ESC[` … final byte), OSC sequences (`ESC]` …
/// BEL or `ESC\`), concealed `ha:` annotations including their payload,
/// and bare two-byte escapes.  Returns the input unchanged (borrowed)
/// when it contains no escape byte.
#[must_use]
pub fn strip_markers(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    if memchr(ESC, bytes).is_none() {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != ESC {
            // Copy the plain run up to the next escape byte.  ESC is
            // ASCII, so both ends are char boundaries.
            let end = memchr(ESC, &bytes[i..]).map_or(bytes.len(), |off| i + off);
            out.push_str(&text[i..end]);
            i = end;
            continue;
        }

        if text[i..].starts_with(CONCEAL_PREAMBLE) {
            // Skip the preamble and the concealed payload; the closing
            // ESC[0m is consumed as an ordinary CSI sequence next round.
            i += CONCEAL_PREAMBLE.len();
            i = memchr(ESC, &bytes[i..]).map_or(bytes.len(), |off| i + off);
            continue;
        }

        match bytes.get(i + 1) {
            // CSI: parameters and intermediates, then one final byte in
            // 0x40..=0x7e.
            Some(b'[') => {
                i += 2;
                while i < bytes.len() {
                    let b = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&b) {
                        break;
                    }
                }
            }
            // OSC: terminated by BEL or the ST sequence ESC \.
            Some(b']') => {
                i += 2;
                while i < bytes.len() {
                    if bytes[i] == BEL {
                        i += 1;
                        break;
                    }
                    if bytes[i] == ESC {
                        if bytes.get(i + 1) == Some(&b'\\') {
                            i += 2;
                        }
                        break;
                    }
                    i += 1;
                }
            }
            // Bare escape: drop it and the whole character that
            // follows, which may be multibyte.
            Some(_) => {
                i += 1;
                i += text[i..].chars().next().map_or(0, char::len_utf8);
            }
            None => i += 1,
        }
    }
    Cow::Owned(out)
}
