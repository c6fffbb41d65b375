//! X11 gateways: screen capture (XGetImage + XFixes) and input injection
//! (XTest).
//!
//! # One display connection, many threads
//!
//! The capture thread and every viewer task talk to the same X server
//! connection.  Xlib is only safe to share after `XInitThreads()` has been
//! called *before* any other Xlib call, and then only when each sequence of
//! requests is bracketed by `XLockDisplay` / `XUnlockDisplay`.  [`X11Display`]
//! enforces both: [`X11Display::open`] initialises threading first, and the
//! raw pointer is only reachable through a [`DisplayGuard`], which holds the
//! display lock for its lifetime.
//!
//! # Permissions
//!
//! The process needs access to the X display named by `DISPLAY`.  If it is
//! unset or the server refuses the connection, [`X11Display::open`] fails and
//! the server does not start.

pub mod capture;
pub mod injection;

use std::ffi::CStr;
use std::os::raw::c_int;
use std::ptr::{self, NonNull};

use thiserror::Error;
use x11::{xfixes, xlib, xtest};

use crate::domain::CaptureTarget;

pub use capture::X11ScreenCapturer;
pub use injection::XTestInputInjector;

/// Fatal X11 startup errors.
#[derive(Debug, Error)]
pub enum X11Error {
    #[error("XInitThreads failed; Xlib cannot be used from several threads")]
    InitThreads,

    #[error("unable to open X display (DISPLAY={0})")]
    OpenDisplay(String),

    #[error("X server lacks the {0} extension")]
    MissingExtension(&'static str),

    #[error("unable to get attributes of window {0:#x}")]
    WindowAttributes(xlib::Window),

    #[error("window {window:#x} has unusable size {width}x{height}")]
    EmptyWindow {
        window: xlib::Window,
        width: i32,
        height: i32,
    },
}

/// A thread-safe Xlib display connection.  Closed on drop.
pub struct X11Display {
    raw: NonNull<xlib::Display>,
}

// SAFETY: `XInitThreads` runs before the connection is opened and every use
// of the pointer goes through `DisplayGuard`, which holds the Xlib display
// lock.
unsafe impl Send for X11Display {}
unsafe impl Sync for X11Display {}

impl X11Display {
    /// Initialises Xlib threading and opens the display named by `DISPLAY`.
    ///
    /// # Errors
    ///
    /// Returns [`X11Error::InitThreads`] or [`X11Error::OpenDisplay`].
    pub fn open() -> Result<Self, X11Error> {
        // SAFETY: no Xlib call has been made on this connection yet.
        if unsafe { xlib::XInitThreads() } == 0 {
            return Err(X11Error::InitThreads);
        }

        // SAFETY: a null name means "use $DISPLAY".  The returned pointer is
        // released by XCloseDisplay in Drop.
        let raw = unsafe { xlib::XOpenDisplay(ptr::null()) };
        let raw = NonNull::new(raw).ok_or_else(|| {
            X11Error::OpenDisplay(std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".into()))
        })?;
        Ok(Self { raw })
    }

    /// Locks the display for a sequence of requests.
    pub fn lock(&self) -> DisplayGuard<'_> {
        // SAFETY: `raw` is a live connection opened after XInitThreads.
        unsafe { xlib::XLockDisplay(self.raw.as_ptr()) };
        DisplayGuard { display: self }
    }

    /// Checks that the XFixes and XTest extensions are present.
    ///
    /// # Errors
    ///
    /// Returns [`X11Error::MissingExtension`] naming the first one missing.
    pub fn require_extensions(&self) -> Result<(), X11Error> {
        let guard = self.lock();
        let (mut a, mut b, mut c, mut d): (c_int, c_int, c_int, c_int) = (0, 0, 0, 0);

        // SAFETY: the display is locked and the out-pointers are valid locals.
        if unsafe { xfixes::XFixesQueryExtension(guard.raw(), &mut a, &mut b) } == 0 {
            return Err(X11Error::MissingExtension("XFixes"));
        }
        // SAFETY: as above.
        if unsafe { xtest::XTestQueryExtension(guard.raw(), &mut a, &mut b, &mut c, &mut d) } == 0 {
            return Err(X11Error::MissingExtension("XTEST"));
        }
        Ok(())
    }

    /// The root window of the default screen.
    pub fn root_window(&self) -> xlib::Window {
        let guard = self.lock();
        // SAFETY: the display is locked.
        unsafe { xlib::XDefaultRootWindow(guard.raw()) }
    }

    /// Maps a [`CaptureTarget`] to an X window id.
    pub fn resolve(&self, target: CaptureTarget) -> xlib::Window {
        match target {
            CaptureTarget::RootWindow => self.root_window(),
            CaptureTarget::Window(id) => id as xlib::Window,
        }
    }

    /// Width and height of `window`, read once at session start.
    ///
    /// # Errors
    ///
    /// Returns [`X11Error::WindowAttributes`] if the window does not exist,
    /// or [`X11Error::EmptyWindow`] if it has no area.
    pub fn window_size(&self, window: xlib::Window) -> Result<(u32, u32), X11Error> {
        let guard = self.lock();
        // SAFETY: XWindowAttributes is a plain C struct; all-zero is a valid
        // bit pattern and XGetWindowAttributes overwrites it on success.
        let mut attrs: xlib::XWindowAttributes = unsafe { std::mem::zeroed() };
        // SAFETY: the display is locked and `attrs` is a valid out-pointer.
        if unsafe { xlib::XGetWindowAttributes(guard.raw(), window, &mut attrs) } == 0 {
            return Err(X11Error::WindowAttributes(window));
        }
        match (u32::try_from(attrs.width), u32::try_from(attrs.height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
            _ => Err(X11Error::EmptyWindow {
                window,
                width: attrs.width,
                height: attrs.height,
            }),
        }
    }

    /// The display name the connection was opened with, for logging.
    pub fn name(&self) -> String {
        let guard = self.lock();
        // SAFETY: the display is locked; XDisplayString returns a pointer
        // owned by the connection that stays valid until XCloseDisplay.
        let name = unsafe { xlib::XDisplayString(guard.raw()) };
        if name.is_null() {
            return String::new();
        }
        // SAFETY: non-null, NUL-terminated, owned by the live connection.
        unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
    }
}

impl Drop for X11Display {
    fn drop(&mut self) {
        // SAFETY: `raw` came from XOpenDisplay and is closed exactly once.
        unsafe { xlib::XCloseDisplay(self.raw.as_ptr()) };
    }
}

/// Holds the Xlib display lock; unlocks on drop.
pub struct DisplayGuard<'a> {
    display: &'a X11Display,
}

impl DisplayGuard<'_> {
    /// The raw connection, valid while the guard lives.
    pub fn raw(&self) -> *mut xlib::Display {
        self.display.raw.as_ptr()
    }
}

impl Drop for DisplayGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: paired with the XLockDisplay in `X11Display::lock`.
        unsafe { xlib::XUnlockDisplay(self.display.raw.as_ptr()) };
    }
}
