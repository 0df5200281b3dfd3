//! Formatting utilities (plain reply text → Telegram HTML, chunking).
//!
//! Plugins write plain text and may use ```` ``` ```` fences for preformatted blocks.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render reply text as Telegram HTML: escape everything, turn fenced blocks into `<pre>`.
pub fn render_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_pre = false;
    let mut first = true;

    for line in text.split('\n') {
        let mut rest = line;
        let mut piece = String::new();
        while let Some(idx) = rest.find("```") {
            piece.push_str(&escape_html(&rest[..idx]));
            piece.push_str(if in_pre { "</pre>" } else { "<pre>" });
            in_pre = !in_pre;
            rest = &rest[idx + 3..];
        }
        piece.push_str(&escape_html(rest));

        // Fence-only lines: an opening fence starts on its own line, a closing one
        // hugs the block.
        if line.trim() == "```" {
            if in_pre && !first {
                out.push('\n');
            }
            first = false;
            out.push_str(&piece);
            continue;
        }
        if !first && !out.ends_with("<pre>") {
            out.push('\n');
        }
        first = false;
        out.push_str(&piece);
    }

    if in_pre {
        out.push_str("</pre>");
    }
    out
}

/// Room kept at the end of every chunk for a closing fence, or for the `</pre>` that
/// rendering appends to an unterminated block.
const FENCE_SLACK: usize = 8;

/// Split plain reply text into chunks on line boundaries so that each chunk, once sent,
/// takes at most `limit` bytes. With `html` set, a chunk is measured as it will be after
/// [`render_html`].
///
/// A fenced block cut across chunks is closed at the end of one chunk and reopened at
/// the start of the next.
pub fn split_chunks(text: &str, limit: usize, html: bool) -> Vec<String> {
    let whole = if html { render_html(text).len() } else { text.len() };
    if whole <= limit {
        return vec![text.to_string()];
    }

    let budget = limit.saturating_sub(FENCE_SLACK).max(16);
    let mut out = Vec::new();
    let mut chunk = String::new();
    let mut used = 0;
    let mut in_fence = false;

    for line in text.split('\n') {
        for piece in hard_wrap(line, budget - FENCE_SLACK, html) {
            let cost = sent_len(piece, html);
            if !chunk.is_empty() && used + 1 + cost > budget {
                if in_fence {
                    chunk.push_str("\n```");
                }
                out.push(std::mem::take(&mut chunk));
                used = 0;
                if in_fence {
                    chunk.push_str("```");
                    used = sent_len("```", html);
                }
            }
            if !chunk.is_empty() {
                chunk.push('\n');
                used += 1;
            }
            chunk.push_str(piece);
            used += cost;
        }
        if line.matches("```").count() % 2 == 1 {
            in_fence = !in_fence;
        }
    }
    if !chunk.is_empty() {
        out.push(chunk);
    }
    out
}

/// Upper bound on the bytes `c` turns into when sent. Under HTML a backtick counts
/// double so a fence covers the `<pre>`/`</pre>` it renders to.
fn char_cost(c: char, html: bool) -> usize {
    if !html {
        return c.len_utf8();
    }
    match c {
        '&' => 5,
        '<' | '>' => 4,
        '"' => 6,
        '`' => 2,
        c => c.len_utf8(),
    }
}

fn sent_len(piece: &str, html: bool) -> usize {
    piece.chars().map(|c| char_cost(c, html)).sum()
}

/// Cut `line` into pieces whose sent size stays within `width` (always at least one
/// char per piece).
fn hard_wrap(line: &str, width: usize, html: bool) -> Vec<&str> {
    if sent_len(line, html) <= width {
        return vec![line];
    }
    let mut out = Vec::new();
    let mut start = 0;
    let mut used = 0;
    for (idx, c) in line.char_indices() {
        let cost = char_cost(c, html);
        if idx > start && used + cost > width {
            out.push(&line[start..idx]);
            start = idx;
            used = 0;
        }
        used += cost;
    }
    out.push(&line[start..]);
    out
}
