//! Denylist for destructive shell commands.
//!
//! Commands are checked after extraction and before any process is spawned.
//! A command line is split on `;`, `&&`, `||` and `|`, and each segment is
//! checked on its own so chained commands cannot hide a match.

use std::sync::LazyLock;

use regex::Regex;

static SEGMENT_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&&|\|\||;|\|").expect("segment split regex"));
static MKFS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmkfs(?:\.\w+)?\b").expect("mkfs regex"));
static DD_DEVICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdd\b.*\bof=/dev/").expect("dd regex"));
static FORK_BOMB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":\s*\(\s*\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;?\s*:").expect("fork bomb regex")
});
static BLOCK_DEVICE_WRITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r">\s*/dev/(?:sd[a-z]|hd[a-z]|vd[a-z]|xvd[a-z]|nvme\d)").expect("device regex")
});

const POWER_PROGRAMS: [&str; 4] = ["shutdown", "reboot", "halt", "poweroff"];
/// Prefixes skipped when locating the program of a segment.
const WRAPPERS: [&str; 3] = ["sudo", "doas", "exec"];

/// Why `command` is refused, or `None` when it may run.
pub fn destructive_reason(command: &str) -> Option<&'static str> {
    if FORK_BOMB_RE.is_match(command) {
        return Some("fork bomb");
    }
    if BLOCK_DEVICE_WRITE_RE.is_match(command) {
        return Some("write redirected to a raw block device");
    }
    SEGMENT_SPLIT_RE
        .split(command)
        .find_map(|segment| segment_reason(segment.trim()))
}

fn segment_reason(segment: &str) -> Option<&'static str> {
    if MKFS_RE.is_match(segment) {
        return Some("filesystem creation (mkfs)");
    }
    if DD_DEVICE_RE.is_match(segment) {
        return Some("dd writing to a device");
    }

    let mut words = segment
        .split_whitespace()
        .skip_while(|word| WRAPPERS.contains(word));
    let program = words.next()?;
    let program = program.rsplit('/').next().unwrap_or(program);
    let args: Vec<&str> = words.collect();

    match program {
        "rm" if has_flag(&args, 'r', "--recursive") && has_flag(&args, 'f', "--force") => {
            Some("recursive forced removal (rm -rf)")
        }
        "chmod" | "chown" if has_flag(&args, 'R', "--recursive") && args.contains(&"/") => {
            Some("recursive permission change on /")
        }
        p if POWER_PROGRAMS.contains(&p) => Some("system power state change"),
        _ => None,
    }
}

/// Short flag clusters (`-rf`) match case-insensitively for `r`; long flags exactly.
fn has_flag(args: &[&str], short: char, long: &str) -> bool {
    args.iter().any(|arg| {
        if *arg == long {
            return true;
        }
        match arg.strip_prefix('-') {
            Some(cluster) if !cluster.starts_with('-') => cluster.chars().any(|c| {
                c == short || (short == 'r' && c == 'R') || (short == 'R' && c == 'r')
            }),
            _ => false,
        }
    })
}
