/// Emphasis pairs the backend likes to wrap answers in, longest first
const EMPHASIS_DELIMITERS: &[&str] = &["```", "**", "__", "*", "_", "`"];

/// Labels occasionally prepended to the answer despite the prompt
const ANSWER_LABELS: &[&str] = &["translation:", "translated text:", "here is the translation:"];

/// Best-effort cosmetic cleanup of raw backend output.
///
/// Trims, drops a leading answer label, then strips one symmetric outer
/// emphasis pair. Never recursive: `**he**llo**` becomes `he**llo`.
pub fn sanitize(raw: &str) -> String {
    let text = strip_label(raw.trim()).trim();
    strip_emphasis(text).trim().to_string()
}

fn strip_label(text: &str) -> &str {
    for label in ANSWER_LABELS {
        if let Some(head) = text.get(..label.len()) {
            if head.eq_ignore_ascii_case(label) {
                return &text[label.len()..];
            }
        }
    }
    text
}

fn strip_emphasis(text: &str) -> &str {
    // The longest delimiter touching either end decides; "**hi*" is left alone
    for delimiter in EMPHASIS_DELIMITERS {
        let opens = text.starts_with(delimiter);
        let closes = text.ends_with(delimiter);
        if !opens && !closes {
            continue;
        }
        if opens && closes && text.len() > delimiter.len() * 2 {
            return &text[delimiter.len()..text.len() - delimiter.len()];
        }
        return text;
    }
    text
}
