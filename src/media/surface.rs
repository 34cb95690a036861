//! The presentation surface seam. The controller drives these operations;
//! what they mean — DOM overlay, kiosk window, external player — is the
//! surface's business. Every operation is synchronous and cheap; anything
//! slow lives behind process boundaries inside the implementation.

use anyhow::Result;

/// Popup window placement, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupGeometry {
    pub width: u32,
    pub height: u32,
    pub left: u32,
    pub top: u32,
}

impl PopupGeometry {
    /// 80% of the screen, centered.
    pub fn centered(screen_width: u32, screen_height: u32) -> Self {
        let width = screen_width * 4 / 5;
        let height = screen_height * 4 / 5;
        Self {
            width,
            height,
            left: (screen_width - width) / 2,
            top: (screen_height - height) / 2,
        }
    }
}

pub trait MediaSurface: Send {
    /// Reveal the inline overlay with the given media source.
    fn show_overlay(&mut self, url: &str) -> Result<()>;
    /// Promote the visible overlay to fullscreen. Err means the request was
    /// rejected or the surface has no fullscreen support.
    fn enter_fullscreen(&mut self) -> Result<()>;
    /// Idempotent; safe with no overlay showing.
    fn hide_overlay(&mut self);
    /// Non-blocking "distracted" cue on the live presentation. Surfaces
    /// without the capability may ignore it.
    fn set_dimmed(&mut self, dimmed: bool);
    /// Open a detached popup window. Err means blocked; the caller does not
    /// retry.
    fn open_popup(&mut self, url: &str, geometry: PopupGeometry) -> Result<()>;
    /// Liveness probe: true when no popup is open anymore, however it went
    /// away.
    fn popup_closed(&mut self) -> bool;
    /// Idempotent; safe with no popup open.
    fn close_popup(&mut self);
}
