//! Shipped presentation surface: an external media player process. Overlay
//! and popup map to player windows the surface owns; popup liveness is the
//! owned child's exit status, which the user cannot fake by hiding a window.

use std::process::{Child, Command, Stdio};

use anyhow::{bail, Context, Result};

use crate::settings::ClientSettings;

use super::surface::{MediaSurface, PopupGeometry};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

const WINDOW_TITLE: &str = "nexus-video";

pub struct PlayerSurface {
    command: String,
    fullscreen_arg: String,
    overlay: Option<Child>,
    overlay_url: Option<String>,
    popup: Option<Child>,
    dimmed: bool,
}

impl PlayerSurface {
    pub fn new(settings: &ClientSettings) -> Self {
        Self {
            command: settings.player_command.clone(),
            fullscreen_arg: settings.player_fullscreen_arg.clone(),
            overlay: None,
            overlay_url: None,
            popup: None,
            dimmed: false,
        }
    }

    fn spawn_player(&self, args: &[String], url: &str) -> Result<Child> {
        if self.command.is_empty() {
            bail!("no media player configured");
        }
        Command::new(&self.command)
            .args(args)
            .arg(format!("--title={WINDOW_TITLE}"))
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to launch player {:?}", self.command))
    }
}

fn reap(child: &mut Option<Child>) {
    if let Some(mut c) = child.take() {
        let _ = c.kill();
        let _ = c.wait();
    }
}

#[cfg(unix)]
fn signal_child(child: &Child, sig: libc::c_int) {
    let pid = child.id() as libc::pid_t;
    unsafe {
        libc::kill(pid, sig);
    }
}

impl MediaSurface for PlayerSurface {
    fn show_overlay(&mut self, url: &str) -> Result<()> {
        let child = self.spawn_player(&[], url)?;
        reap(&mut self.overlay);
        self.overlay = Some(child);
        self.overlay_url = Some(url.to_string());
        Ok(())
    }

    fn enter_fullscreen(&mut self) -> Result<()> {
        if self.fullscreen_arg.is_empty() {
            bail!("player has no fullscreen support");
        }
        let url = self
            .overlay_url
            .clone()
            .context("no overlay to promote to fullscreen")?;
        // The player only takes presentation flags at launch, so promotion is
        // a relaunch. The windowed player stays up until the fullscreen one
        // has actually spawned.
        let fullscreen = self.spawn_player(&[self.fullscreen_arg.clone()], &url)?;
        reap(&mut self.overlay.replace(fullscreen));
        Ok(())
    }

    fn hide_overlay(&mut self) {
        reap(&mut self.overlay);
        self.overlay_url = None;
    }

    fn set_dimmed(&mut self, dimmed: bool) {
        if dimmed == self.dimmed {
            return;
        }
        self.dimmed = dimmed;

        // The closest cue this surface has is pausing playback.
        #[cfg(unix)]
        {
            let sig = if dimmed {
                libc::SIGSTOP
            } else {
                libc::SIGCONT
            };
            if let Some(child) = self.popup.as_ref().or(self.overlay.as_ref()) {
                signal_child(child, sig);
            }
        }
    }

    fn open_popup(&mut self, url: &str, geometry: PopupGeometry) -> Result<()> {
        let placement = format!(
            "--geometry={}x{}+{}+{}",
            geometry.width, geometry.height, geometry.left, geometry.top
        );
        let child = self.spawn_player(&[placement], url)?;
        reap(&mut self.popup);
        self.popup = Some(child);
        Ok(())
    }

    fn popup_closed(&mut self) -> bool {
        match self.popup.as_mut() {
            None => true,
            Some(child) => match child.try_wait() {
                Ok(Some(_)) => {
                    self.popup = None;
                    true
                }
                Ok(None) => false,
                Err(err) => {
                    log_warn!("popup liveness probe failed: {err}");
                    self.popup = None;
                    true
                }
            },
        }
    }

    fn close_popup(&mut self) {
        reap(&mut self.popup);
    }
}

impl Drop for PlayerSurface {
    fn drop(&mut self) {
        reap(&mut self.overlay);
        reap(&mut self.popup);
    }
}
