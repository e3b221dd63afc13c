const FENCE: &str = "```";

/// Removes the markdown code fence models like to wrap JSON replies in.
///
/// Handles ```` ```json ... ``` ```` as well as a bare ```` ``` ... ``` ````, on one line or several.
/// A reply that does not start with a fence is only trimmed.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();

    let Some(fenced) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    // The opening line may carry a language tag (`json`, `JSON`, `jsonc`...)
    let body = match fenced.split_once('\n') {
        Some((info_string, rest)) if is_language_tag(info_string) => rest,
        _ => fenced.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    let body = body.trim_end();
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

fn is_language_tag(info_string: &str) -> bool {
    info_string
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}
