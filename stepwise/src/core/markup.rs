//! Command-span markup helpers.
//!
//! Generated paragraphs embed shell commands as `<cmd>...</cmd>` spans. A span
//! may cover several lines; its trimmed content is one literal command.

use std::sync::LazyLock;

use regex::Regex;

pub const CMD_OPEN: &str = "<cmd>";
pub const CMD_CLOSE: &str = "</cmd>";

pub(crate) static CMD_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<cmd>(.*?)</cmd>").expect("command span regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Collapse whitespace runs to single spaces and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Canonical form of a command, used as the deduplication key.
pub fn normalize_command(cmd: &str) -> String {
    collapse_whitespace(cmd)
}

/// Extract every command span in document order (trimmed, not normalized).
pub fn extract_commands(text: &str) -> Vec<String> {
    CMD_SPAN_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Wrap a command in span markers.
pub fn wrap_command(cmd: &str) -> String {
    format!("{CMD_OPEN}{cmd}{CMD_CLOSE}")
}

/// Collapse whitespace in prose while leaving command span content intact.
///
/// Multi-line commands (heredocs) keep their line breaks.
pub fn collapse_prose_whitespace(text: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for span in CMD_SPAN_RE.find_iter(text) {
        push_collapsed(&mut out, &text[last..span.start()]);
        out.push_str(span.as_str());
        last = span.end();
    }
    push_collapsed(&mut out, &text[last..]);
    out.trim().to_string()
}

fn push_collapsed(out: &mut String, prose: &str) {
    let collapsed = WHITESPACE_RE.replace_all(prose, " ");
    if out.ends_with(' ') {
        out.push_str(collapsed.trim_start());
    } else {
        out.push_str(&collapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_internal_and_outer_whitespace() {
        assert_eq!(
            normalize_command("  python3   -m\tvenv\n .venv "),
            "python3 -m venv .venv"
        );
    }

    #[test]
    fn extract_commands_keeps_document_order_and_multiline_content() {
        let text = "First <cmd>mkdir app</cmd>, then <cmd>cat > app/main.py <<'EOF'\nprint('hi')\nEOF\n</cmd>.";
        let cmds = extract_commands(text);
        assert_eq!(
            cmds,
            vec![
                "mkdir app".to_string(),
                "cat > app/main.py <<'EOF'\nprint('hi')\nEOF".to_string()
            ]
        );
    }

    #[test]
    fn extract_commands_ignores_unclosed_span() {
        assert!(extract_commands("run <cmd>ls -la").is_empty());
    }

    #[test]
    fn collapse_prose_whitespace_preserves_command_lines() {
        let text = "Write   the file\nwith <cmd>cat > a.txt <<'EOF'\nx\nEOF</cmd>   now.";
        assert_eq!(
            collapse_prose_whitespace(text),
            "Write the file with <cmd>cat > a.txt <<'EOF'\nx\nEOF</cmd> now."
        );
    }
}
