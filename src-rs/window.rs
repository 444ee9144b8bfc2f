//! Fullscreen surface and input translation.
//!
//! winit 0.30 is driven with `pump_app_events` so the selection loop keeps
//! control: every poll drains whatever the OS has queued and returns at once.
//! Pixels are presented through softbuffer.

use crate::raster::Frame;
use crate::selection::{EventSource, InputEvent};
use anyhow::{anyhow, Result};
use softbuffer::{Context, Surface};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop, OwnedDisplayHandle};
use winit::keyboard::{Key, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

const TITLE: &str = "Application Chooser";
/// Pumps allowed for the window manager to settle the fullscreen size.
const SETTLE_PUMPS: usize = 10;

type SharedWindow = Arc<Window>;
type WindowParts = (
    SharedWindow,
    Context<OwnedDisplayHandle>,
    Surface<OwnedDisplayHandle, SharedWindow>,
);

/// Window plus presentation surface. Fields drop in declaration order:
/// surface, then context, then window, then the event loop.
pub struct PickerWindow {
    surface: Surface<OwnedDisplayHandle, SharedWindow>,
    _context: Context<OwnedDisplayHandle>,
    window: SharedWindow,
    event_loop: Option<EventLoop<()>>,
    pending: Vec<InputEvent>,
    frame: Option<Frame>,
}

impl PickerWindow {
    /// Open the window and its surface. Any failure here is fatal for the run.
    pub fn open(show_cursor: bool, size: Option<(u32, u32)>) -> Result<Self> {
        let mut event_loop =
            EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

        let mut attrs = WindowAttributes::default().with_title(TITLE);
        attrs = match size {
            Some((w, h)) => attrs
                .with_inner_size(PhysicalSize::new(w, h))
                .with_resizable(false),
            None => attrs.with_fullscreen(Some(Fullscreen::Borderless(None))),
        };

        // winit only hands out windows from inside `resumed`.
        struct Creator {
            attrs: Option<WindowAttributes>,
            result: Option<Result<WindowParts>>,
        }

        impl ApplicationHandler for Creator {
            fn resumed(&mut self, event_loop: &ActiveEventLoop) {
                let Some(attrs) = self.attrs.take() else {
                    return;
                };
                self.result = Some(create_parts(event_loop, attrs));
            }

            fn window_event(&mut self, _: &ActiveEventLoop, _: WindowId, _: WindowEvent) {}
        }

        let mut creator = Creator {
            attrs: Some(attrs),
            result: None,
        };
        let _ = event_loop.pump_app_events(Some(Duration::from_millis(100)), &mut creator);
        let (window, context, surface) = creator
            .result
            .ok_or_else(|| anyhow!("window was never created (no resume event)"))??;

        window.set_cursor_visible(show_cursor);

        let mut picker = Self {
            surface,
            _context: context,
            window,
            event_loop: Some(event_loop),
            pending: Vec::new(),
            frame: None,
        };
        picker.settle();
        let (w, h) = picker.size();
        if w == 0 || h == 0 {
            return Err(anyhow!("window has no drawable area ({w}x{h})"));
        }
        log::info!("window ready at {w}x{h}");
        Ok(picker)
    }

    /// Current drawable size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Show `frame`, keeping it for later redraw requests.
    pub fn present(&mut self, frame: Frame) -> Result<()> {
        self.frame = Some(frame);
        self.redraw()
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(frame) = self.frame.as_ref() else {
            return Ok(());
        };
        let (w, h) = self.size();
        let (Some(nz_w), Some(nz_h)) = (NonZeroU32::new(w), NonZeroU32::new(h)) else {
            return Ok(());
        };
        self.surface
            .resize(nz_w, nz_h)
            .map_err(|err| anyhow!("failed to resize surface: {err}"))?;
        let mut buffer = self
            .surface
            .buffer_mut()
            .map_err(|err| anyhow!("failed to map surface buffer: {err}"))?;
        buffer.fill(0);

        let (w, h) = (w as usize, h as usize);
        let copy_w = w.min(frame.width);
        for y in 0..h.min(frame.height) {
            buffer[y * w..y * w + copy_w]
                .copy_from_slice(&frame.pixels[y * frame.width..y * frame.width + copy_w]);
        }

        self.window.pre_present_notify();
        buffer
            .present()
            .map_err(|err| anyhow!("failed to present frame: {err}"))
    }

    /// Give the window manager a few rounds to apply fullscreen geometry.
    fn settle(&mut self) {
        for _ in 0..SETTLE_PUMPS {
            let (w, h) = self.size();
            if w > 0 && h > 0 {
                break;
            }
            self.pump(Duration::from_millis(20));
        }
        self.pending.clear();
    }

    fn pump(&mut self, timeout: Duration) {
        let Some(mut event_loop) = self.event_loop.take() else {
            self.pending.push(InputEvent::Quit);
            return;
        };
        let status = event_loop.pump_app_events(Some(timeout), self);
        if let PumpStatus::Exit(code) = status {
            log::debug!("event loop exited with {code}");
            self.pending.push(InputEvent::Quit);
            return;
        }
        self.event_loop = Some(event_loop);
    }
}

fn create_parts(event_loop: &ActiveEventLoop, attrs: WindowAttributes) -> Result<WindowParts> {
    let window = Arc::new(
        event_loop
            .create_window(attrs)
            .map_err(|err| anyhow!("failed to create window: {err}"))?,
    );
    let context = Context::new(event_loop.owned_display_handle())
        .map_err(|err| anyhow!("failed to create drawing context: {err}"))?;
    let surface = Surface::new(&context, window.clone())
        .map_err(|err| anyhow!("failed to create drawing surface: {err}"))?;
    Ok((window, context, surface))
}

impl ApplicationHandler for PickerWindow {
    fn resumed(&mut self, _: &ActiveEventLoop) {}

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.pending.push(InputEvent::Quit);
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let quit = match &event.logical_key {
                    Key::Named(NamedKey::Escape) => true,
                    Key::Character(text) => text.as_str() == "q",
                    _ => false,
                };
                if quit {
                    self.pending.push(InputEvent::Quit);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.pending.push(InputEvent::PointerMoved {
                    x: position.x as i32,
                    y: position.y as i32,
                });
            }
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => self.pending.push(InputEvent::LeftReleased),
            WindowEvent::Resized(_) | WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    log::warn!("{err:#}");
                }
            }
            _ => {}
        }
    }
}

impl EventSource for PickerWindow {
    fn poll_events(&mut self) -> Vec<InputEvent> {
        self.pump(Duration::ZERO);
        std::mem::take(&mut self.pending)
    }
}
