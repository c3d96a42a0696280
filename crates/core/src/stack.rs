//! Call-stack snapshots captured when an error is constructed.

use std::panic::Location;

use serde::Serialize;

/// Upper bound on recorded frames per error.
pub const MAX_FRAMES: usize = 100;

/// Frames belonging to the unwinder and to this module sit below the caller;
/// allow for them when walking so the cap still applies to caller frames.
const WALK_SLACK: usize = 32;

/// One frame of a captured stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
    pub function: String,
}

/// Capture the stack of the caller.
///
/// The first frame is always the construction site reported by
/// `#[track_caller]`; the rest are the frames above it, up to [`MAX_FRAMES`].
#[track_caller]
pub(crate) fn capture() -> Vec<StackFrame> {
    let site = Location::caller();
    let walked = walk();

    let site_index = walked
        .iter()
        .position(|frame| frame.line == site.line() && same_file(&frame.file, site.file()));

    let mut frames = Vec::with_capacity(MAX_FRAMES.min(walked.len() + 1));
    match site_index {
        Some(idx) => {
            frames.extend(walked.into_iter().skip(idx).take(MAX_FRAMES));
            // Prefer the compiler-reported path for the first frame.
            frames[0].file = site.file().to_string();
        }
        None => {
            // Inlined or stripped: fall back to the location alone and whatever
            // resolves above the capture machinery.
            frames.push(StackFrame {
                file: site.file().to_string(),
                line: site.line(),
                function: String::new(),
            });
            frames.extend(
                walked
                    .into_iter()
                    .skip_while(is_capture_frame)
                    .skip(1)
                    .take(MAX_FRAMES - 1),
            );
        }
    }
    frames
}

fn walk() -> Vec<StackFrame> {
    let mut frames = Vec::new();
    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            frames.push(StackFrame {
                file: symbol
                    .filename()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default(),
                line: symbol.lineno().unwrap_or(0),
                function: symbol
                    .name()
                    .map(|name| format!("{name:#}"))
                    .unwrap_or_default(),
            });
        });
        frames.len() < MAX_FRAMES + WALK_SLACK
    });
    frames
}

fn is_capture_frame(frame: &StackFrame) -> bool {
    frame.function.starts_with("backtrace::")
        || frame.function.starts_with("groundwork_core::stack::")
        || frame.function.starts_with("groundwork_core::error::")
}

fn same_file(resolved: &str, reported: &str) -> bool {
    let resolved = resolved.replace('\\', "/");
    let reported = reported.replace('\\', "/");
    resolved == reported || resolved.ends_with(&format!("/{reported}"))
}
