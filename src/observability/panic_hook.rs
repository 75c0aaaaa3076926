//! Panic hook that prints a short crash report instead of a raw panic.
//!
//! The report names the version, platform and panic location so a bug
//! report can be filed from it directly.

use std::any::Any;
use std::panic::PanicHookInfo;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const WIDTH: usize = 78;

/// Install the crash report hook. Call once, early in `main`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::env::var_os("RUST_BACKTRACE").is_some();
        eprintln!("\n{}", render_report(&crash_lines(info, backtrace)));
        if backtrace {
            eprintln!("\n{}", std::backtrace::Backtrace::capture());
        }
    }));
}

fn render_report(lines: &[String]) -> String {
    let rule = "-".repeat(WIDTH);
    let mut out = format!("{rule}\ntest-analyzer crashed\n{rule}\n");
    for line in lines {
        out.push_str(&truncate(line, WIDTH));
        out.push('\n');
    }
    out.push_str(&rule);
    out
}

fn crash_lines(info: &PanicHookInfo<'_>, backtrace: bool) -> Vec<String> {
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "unknown".to_string());
    let mut lines = vec![
        format!("version   {VERSION} ({})", std::env::consts::OS),
        format!("time      {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")),
        format!("message   {}", payload_text(info.payload())),
        format!("location  {location}"),
    ];
    if !backtrace {
        lines.push("set RUST_BACKTRACE=1 to include a stack trace".to_string());
    }
    lines
}

/// `panic!` payloads are `&str` for literals and `String` for formatted messages.
fn payload_text(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>")
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some(_) => {
            let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_text() {
        let literal: Box<dyn Any + Send> = Box::new("boom");
        let formatted: Box<dyn Any + Send> = Box::new(format!("bad {}", 42));
        let other: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(payload_text(literal.as_ref()), "boom");
        assert_eq!(payload_text(formatted.as_ref()), "bad 42");
        assert_eq!(payload_text(other.as_ref()), "<non-string payload>");
    }

    #[test]
    fn test_render_report_frames_lines() {
        let report = render_report(&["message   boom".to_string()]);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[1], "test-analyzer crashed");
        assert_eq!(lines[3], "message   boom");
        assert_eq!(lines.last().unwrap().len(), WIDTH);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 5), "ééééé");
        assert_eq!(truncate("éééééé", 5), "éé...");
    }
}
