//! Splits model output into Discord-sized messages without breaking fenced
//! code blocks.

/// Discord allows 2000 characters per message; leave headroom for the
/// synthetic fence lines added at chunk boundaries.
pub const MESSAGE_LIMIT: usize = 1950;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `content` line-by-line into chunks of fewer than `limit` characters.
///
/// A chunk boundary that falls inside an open code block closes the flushed
/// chunk with a terminating fence and reopens the next chunk with a fence
/// carrying the same language tag, so every chunk renders as valid Markdown
/// on its own. A fence marker that does not start its line is moved onto its
/// own line first. Never emits empty chunks.
#[must_use]
pub fn split_message(content: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    // Whether `chunk` has absorbed at least one line; an accumulated empty
    // line is not the same as an empty accumulator.
    let mut started = false;
    // Language tag of the currently open code block, if any.
    let mut fence: Option<String> = None;

    for raw_line in content.split('\n') {
        let mut line = raw_line.to_string();
        let mut toggles_fence = false;
        let mut opened_tag = String::new();

        if let Some(idx) = raw_line.find("```") {
            toggles_fence = true;
            opened_tag = raw_line[idx + 3..].to_string();
            if idx != 0 {
                line = format!("{}\n{}", &raw_line[..idx], &raw_line[idx..]);
            }
        }

        if !chunk.is_empty() && char_len(&chunk) + char_len(&line) >= limit {
            if let Some(tag) = &fence {
                chunk.push_str("\n```");
                let reopened = format!("```{tag}\n{line}");
                chunks.push(std::mem::replace(&mut chunk, reopened));
            } else {
                chunks.push(std::mem::replace(&mut chunk, line));
            }
        } else {
            if started {
                chunk.push('\n');
            }
            chunk.push_str(&line);
            started = true;
        }

        if toggles_fence {
            fence = match fence {
                Some(_) => None,
                None => Some(opened_tag),
            };
        }
    }

    if !chunk.is_empty() {
        chunks.push(chunk);
    }

    chunks
}
