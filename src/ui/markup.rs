use gtk4::glib;

/// Convert a model answer into Pango markup.
/// Everything is escaped. Fenced blocks and `inline code` become monospace,
/// `#` headings are enlarged, bullet markers become dots and `**bold**`
/// spans outside code become bold.
pub fn answer_markup(text: &str) -> String {
    let mut out = String::new();
    let mut in_code = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            out.push_str(if in_code { "</tt>" } else { "<tt>" });
            in_code = !in_code;
            continue;
        }
        let escaped = glib::markup_escape_text(line);
        if in_code {
            out.push_str(escaped.as_str());
        } else {
            out.push_str(&block_line(escaped.as_str()));
        }
        out.push('\n');
    }

    if in_code {
        out.push_str("</tt>");
    }
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Headings and bullet items; everything else is inline text.
fn block_line(line: &str) -> String {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&level) && trimmed[level..].starts_with(' ') {
        let title = inline_spans(trimmed[level..].trim());
        return if level <= 2 {
            format!("<b><big>{title}</big></b>")
        } else {
            format!("<b>{title}</b>")
        };
    }

    let indent = &line[..line.len() - trimmed.len()];
    for marker in ["- ", "* ", "+ "] {
        if let Some(item) = trimmed.strip_prefix(marker) {
            return format!("{indent}\u{2022} {}", inline_spans(item));
        }
    }
    inline_spans(line)
}

/// `code` spans become monospace; text between them gets bold handling.
fn inline_spans(line: &str) -> String {
    let parts: Vec<&str> = line.split('`').collect();
    if parts.len() < 3 {
        return bold_spans(line);
    }
    // An unpaired trailing backtick stays literal.
    let paired = if parts.len() % 2 == 1 {
        parts.len()
    } else {
        parts.len() - 1
    };

    let mut out = String::with_capacity(line.len());
    for (i, part) in parts.iter().enumerate() {
        if i >= paired {
            out.push('`');
            out.push_str(&bold_spans(part));
        } else if i % 2 == 1 {
            out.push_str("<tt>");
            out.push_str(part);
            out.push_str("</tt>");
        } else {
            out.push_str(&bold_spans(part));
        }
    }
    out
}

fn bold_spans(line: &str) -> String {
    let parts: Vec<&str> = line.split("**").collect();
    if parts.len() < 3 {
        return line.to_string();
    }
    // An odd number of markers leaves the last one unpaired; keep it literal.
    let paired = if parts.len() % 2 == 1 {
        parts.len()
    } else {
        parts.len() - 1
    };

    let mut out = String::with_capacity(line.len());
    for (i, part) in parts.iter().enumerate() {
        if i >= paired {
            out.push_str("**");
            out.push_str(part);
        } else if i % 2 == 1 {
            out.push_str("<b>");
            out.push_str(part);
            out.push_str("</b>");
        } else {
            out.push_str(part);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_escaped() {
        assert_eq!(answer_markup("x < y & z"), "x &lt; y &amp; z");
    }

    #[test]
    fn test_code_fence_is_monospace() {
        let markup = answer_markup("Use:\n```rust\nlet v = a < b;\n```\nDone");
        assert_eq!(markup, "Use:\n<tt>let v = a &lt; b;\n</tt>Done");
    }

    #[test]
    fn test_unclosed_fence_is_closed() {
        assert_eq!(answer_markup("```\nfn main() {}"), "<tt>fn main() {}\n</tt>");
    }

    #[test]
    fn test_bold_spans() {
        assert_eq!(answer_markup("The answer is **42**."), "The answer is <b>42</b>.");
        assert_eq!(answer_markup("a**b**c**d"), "a<b>b</b>c**d");
        assert_eq!(answer_markup("2 ** 3"), "2 ** 3");
    }

    #[test]
    fn test_inline_code_is_monospace() {
        assert_eq!(
            answer_markup("Call `len(xs) < 3` first"),
            "Call <tt>len(xs) &lt; 3</tt> first"
        );
        assert_eq!(answer_markup("a `b` **c** `d"), "a <tt>b</tt> <b>c</b> `d");
        assert_eq!(answer_markup("`x**2**`"), "<tt>x**2**</tt>");
    }

    #[test]
    fn test_headings() {
        assert_eq!(answer_markup("# Answer"), "<b><big>Answer</big></b>");
        assert_eq!(answer_markup("### Step `1`"), "<b>Step <tt>1</tt></b>");
        assert_eq!(answer_markup("#include <x>"), "#include &lt;x&gt;");
    }

    #[test]
    fn test_bullet_items() {
        assert_eq!(
            answer_markup("- first\n  * **second**\n3 - 1"),
            "\u{2022} first\n  \u{2022} <b>second</b>\n3 - 1"
        );
    }

    #[test]
    fn test_bold_markers_inside_code_untouched() {
        assert_eq!(answer_markup("```\nx = 2**3**1\n```"), "<tt>x = 2**3**1\n</tt>");
    }
}
