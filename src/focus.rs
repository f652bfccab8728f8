//! Focused-window tracking.
//!
//! The typing engine only needs two things from the platform: the identity of
//! the window that currently has input focus, and a way to compare two such
//! identities. Both are provided through [`FocusProvider`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Identity of a top-level window.
///
/// Two ids are equal when they refer to the same platform handle; the title
/// is carried for display only and may change while the window lives.
#[derive(Debug, Clone)]
pub struct WindowId {
    handle: u64,
    title: String,
}

impl WindowId {
    pub fn new(handle: u64, title: impl Into<String>) -> Self {
        Self {
            handle,
            title: title.into(),
        }
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl PartialEq for WindowId {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for WindowId {}

impl Hash for WindowId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "window 0x{:x}", self.handle)
        } else {
            write!(f, "'{}' (0x{:x})", self.title, self.handle)
        }
    }
}

/// Source of the currently focused window.
pub trait FocusProvider: Send + Sync {
    /// The window that has input focus, or `None` when it cannot be determined.
    fn current_window(&self) -> Option<WindowId>;
}

/// Blocks until `window` no longer has focus.
///
/// Returns `false` if `cancelled` became true first.
pub fn wait_until_unfocused(
    provider: &dyn FocusProvider,
    window: &WindowId,
    poll_interval: Duration,
    cancelled: impl Fn() -> bool,
) -> bool {
    loop {
        if cancelled() {
            return false;
        }
        if provider.current_window().as_ref() != Some(window) {
            return true;
        }
        thread::sleep(poll_interval);
    }
}

/// Focus queries against the running desktop session.
///
/// On Windows this asks `GetForegroundWindow`; on Linux it shells out to
/// `xdotool`, which only works under X11. Elsewhere no window is ever
/// reported and the engine types without focus gating.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformFocus;

impl PlatformFocus {
    pub fn new() -> Self {
        Self
    }
}

impl FocusProvider for PlatformFocus {
    fn current_window(&self) -> Option<WindowId> {
        let window = platform::foreground_window();
        if window.is_none() {
            debug!("no foreground window reported by the platform");
        }
        window
    }
}

#[cfg(windows)]
mod platform {
    use super::WindowId;
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use winapi::um::winuser::{GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW};

    pub fn foreground_window() -> Option<WindowId> {
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.is_null() {
                return None;
            }

            let len = GetWindowTextLengthW(hwnd);
            let mut title = String::new();
            if len > 0 {
                let mut buf: Vec<u16> = vec![0; (len + 1) as usize];
                let copied = GetWindowTextW(hwnd, buf.as_mut_ptr(), buf.len() as i32);
                if copied > 0 {
                    buf.truncate(copied as usize);
                    title = OsString::from_wide(&buf).to_string_lossy().into_owned();
                }
            }

            Some(WindowId::new(hwnd as usize as u64, title))
        }
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::WindowId;
    use std::process::Command;

    pub fn foreground_window() -> Option<WindowId> {
        let handle = xdotool(&["getactivewindow"])?.parse::<u64>().ok()?;
        let title = xdotool(&["getwindowname", &handle.to_string()]).unwrap_or_default();
        Some(WindowId::new(handle, title))
    }

    fn xdotool(args: &[&str]) -> Option<String> {
        let output = Command::new("xdotool").args(args).output().ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(not(any(windows, target_os = "linux")))]
mod platform {
    use super::WindowId;

    pub fn foreground_window() -> Option<WindowId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Sequence {
        windows: Mutex<Vec<Option<WindowId>>>,
        calls: AtomicUsize,
    }

    impl FocusProvider for Sequence {
        fn current_window(&self) -> Option<WindowId> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut windows = self.windows.lock().unwrap();
            if windows.len() > 1 {
                windows.remove(0)
            } else {
                windows[0].clone()
            }
        }
    }

    #[test]
    fn test_window_equality_ignores_title() {
        let a = WindowId::new(42, "Untitled - Notepad");
        let b = WindowId::new(42, "notes.txt - Notepad");
        let c = WindowId::new(43, "Untitled - Notepad");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(b.handle(), 42);
        assert_eq!(b.title(), "notes.txt - Notepad");
        assert_eq!(a.to_string(), "'Untitled - Notepad' (0x2a)");
        assert_eq!(WindowId::new(255, "").to_string(), "window 0xff");
    }

    #[test]
    fn test_wait_until_unfocused_returns_when_focus_moves() {
        let home = WindowId::new(1, "auto-typer");
        let provider = Sequence {
            windows: Mutex::new(vec![
                Some(home.clone()),
                Some(home.clone()),
                Some(WindowId::new(2, "editor")),
            ]),
            calls: AtomicUsize::new(0),
        };

        assert!(wait_until_unfocused(
            &provider,
            &home,
            Duration::from_millis(1),
            || false
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_wait_until_unfocused_cancelled() {
        let home = WindowId::new(1, "auto-typer");
        let provider = Sequence {
            windows: Mutex::new(vec![Some(home.clone())]),
            calls: AtomicUsize::new(0),
        };

        let polls = AtomicUsize::new(0);
        let finished = wait_until_unfocused(&provider, &home, Duration::from_millis(1), || {
            polls.fetch_add(1, Ordering::SeqCst) >= 5
        });
        assert!(!finished);
    }

    #[test]
    fn test_unknown_focus_counts_as_unfocused() {
        let home = WindowId::new(1, "auto-typer");
        let provider = Sequence {
            windows: Mutex::new(vec![None]),
            calls: AtomicUsize::new(0),
        };
        assert!(wait_until_unfocused(
            &provider,
            &home,
            Duration::from_millis(1),
            || false
        ));
    }
}
