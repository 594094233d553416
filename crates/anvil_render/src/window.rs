//! Windows
//!
//! A [`Window`] owns a swap chain and the render target wrapping its back
//! buffer. The OS message pump is not part of this crate: whatever drives the
//! window feeds it [`WindowEvent`]s through [`Window::handle_event`], which
//! keeps the back buffer in sync with the window size and forwards the event
//! to the registered callbacks.
//!
//! # Resizing
//!
//! [`Window::resize`] swaps a new backing texture into the existing
//! [`RenderTarget`], so handles obtained from [`Window::back_buffer`] stay
//! valid and keep comparing equal. The immediate context's render targets
//! are unbound first. Other contexts that still reference the old back
//! buffer must rebind it.

use std::fmt;
use std::sync::Arc;

use anvil_core::{PixelFormat, Result};
use anvil_device::{AdapterInfo, Command, ContextKey, Slots, SwapChainKey};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::owner::{DeviceRef, InstanceId, next_object_id};
use crate::resource::RenderTarget;
use crate::resource::texture::{replace_back_buffer, wrap_back_buffer};

const CLASS_NAME_PREFIX: &str = "AnvilWindowClass";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowState {
    #[default]
    Windowed,
    Borderless,
    Fullscreen,
    /// No OS window; the swap chain is only rendered into.
    Headless,
}

/// Window creation parameters.
///
/// A `width` or `height` of 0 takes the adapter's output resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowParams {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub state: WindowState,
    /// Monitor to open on; `None` for the primary one.
    pub monitor_index: Option<u32>,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            title: "Anvil".to_owned(),
            width: 0,
            height: 0,
            state: WindowState::Windowed,
            monitor_index: None,
        }
    }
}

impl WindowParams {
    #[must_use]
    pub fn headless(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            state: WindowState::Headless,
            ..Default::default()
        }
    }

    fn resolved_size(&self, adapter: &AdapterInfo) -> (u32, u32) {
        let width = if self.width == 0 { adapter.output_width } else { self.width };
        let height = if self.height == 0 { adapter.output_height } else { self.height };
        (width, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Input and size notifications from the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Resized { width: u32, height: u32 },
    /// Unaccelerated mouse motion.
    RawMouse { dx: i32, dy: i32 },
    /// Wheel delta in notches of 120.
    Scroll(i16),
    MouseButton { button: MouseButton, pressed: bool },
    /// Virtual key code.
    Key { code: u32, pressed: bool },
    Char(char),
}

// ============================================================================
// Class Names
// ============================================================================

/// Hands out process-unique window class names.
#[derive(Debug)]
pub struct WindowClassRegistry {
    next: Mutex<u64>,
}

static GLOBAL_REGISTRY: WindowClassRegistry = WindowClassRegistry::new();

impl WindowClassRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: Mutex::new(0) }
    }

    /// The registry shared by every window in the process.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL_REGISTRY
    }

    pub fn register(&self, prefix: &str) -> String {
        let mut next = self.next.lock();
        let name = format!("{prefix}{next}");
        *next += 1;
        name
    }
}

impl Default for WindowClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Window
// ============================================================================

type Callback<T> = Option<Arc<dyn Fn(T) + Send + Sync>>;

#[derive(Default)]
struct Callbacks {
    resize: Callback<(u32, u32)>,
    raw_mouse: Callback<(i32, i32)>,
    scroll: Callback<i16>,
    mouse_button: Callback<(MouseButton, bool)>,
    key: Callback<(u32, bool)>,
    char: Callback<char>,
}

struct WindowInner {
    id: u64,
    owner: DeviceRef,
    immediate: ContextKey,
    class_name: String,
    params: WindowParams,
    chain: SwapChainKey,
    back_buffer: RenderTarget,
    size: Mutex<(u32, u32)>,
    keys: Mutex<FxHashSet<u32>>,
    callbacks: Mutex<Callbacks>,
}

impl Drop for WindowInner {
    fn drop(&mut self) {
        self.owner.device.release_swap_chain(self.chain);
        log::debug!("Closed window {}", self.class_name);
    }
}

/// A presentation surface with its back buffer.
#[derive(Clone)]
pub struct Window(Arc<WindowInner>);

impl Window {
    pub(crate) fn create(owner: &DeviceRef, immediate: ContextKey, params: &WindowParams) -> Result<Self> {
        let device = &owner.device;
        let (width, height) = params.resolved_size(device.adapter());
        let (chain, backing) = device.create_swap_chain(width, height, PixelFormat::Bgra8Unorm)?;
        let back_buffer = match wrap_back_buffer(owner, backing, width, height) {
            Ok(target) => target,
            Err(err) => {
                device.release_resource(backing);
                device.release_swap_chain(chain);
                return Err(err);
            }
        };

        let class_name = WindowClassRegistry::global().register(CLASS_NAME_PREFIX);
        log::info!(
            "Opened window '{}' ({class_name}) {width}x{height} {:?}",
            params.title,
            params.state
        );
        Ok(Self(Arc::new(WindowInner {
            id: next_object_id(),
            owner: owner.clone(),
            immediate,
            class_name,
            params: params.clone(),
            chain,
            back_buffer,
            size: Mutex::new((width, height)),
            keys: Mutex::new(FxHashSet::default()),
            callbacks: Mutex::new(Callbacks::default()),
        })))
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[inline]
    #[must_use]
    pub fn instance(&self) -> InstanceId {
        self.0.owner.instance
    }

    #[inline]
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.0.class_name
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &WindowParams {
        &self.0.params
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.size.lock().0
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.size.lock().1
    }

    /// The back-buffer render target. Its identity survives resizes.
    #[must_use]
    pub fn back_buffer(&self) -> RenderTarget {
        self.0.back_buffer.clone()
    }

    pub(crate) fn owner(&self) -> &DeviceRef {
        &self.0.owner
    }

    /// Presents the back buffer. `sync_interval` is 0 to 4 vertical blanks.
    pub fn present(&self, sync_interval: u32) -> Result<u64> {
        self.0.owner.device.present(self.0.chain, sync_interval)
    }

    /// Recreates the back buffer at the new size.
    ///
    /// Zero extents (a minimised window) are ignored.
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            log::warn!("Ignoring resize of {} to {width}x{height}", self.0.class_name);
            return Ok(());
        }
        let inner = &self.0;
        let device = &inner.owner.device;
        device.submit(
            inner.immediate,
            Command::SetRenderTargets {
                targets: Slots::new(),
                depth: None,
            },
        )?;
        let backing = device.resize_swap_chain(inner.chain, width, height)?;
        if let Err(err) = replace_back_buffer(&inner.back_buffer, backing, width, height) {
            device.release_resource(backing);
            return Err(err);
        }
        *inner.size.lock() = (width, height);
        Ok(())
    }

    /// Whether a key is held, as seen through [`WindowEvent::Key`].
    #[must_use]
    pub fn is_key_down(&self, code: u32) -> bool {
        self.0.keys.lock().contains(&code)
    }

    /// Applies an event and forwards it to the matching callback.
    pub fn handle_event(&self, event: WindowEvent) -> Result<()> {
        match event {
            WindowEvent::Resized { width, height } => {
                self.resize(width, height)?;
                if width != 0 && height != 0 {
                    let callback = self.0.callbacks.lock().resize.clone();
                    if let Some(callback) = callback {
                        callback((width, height));
                    }
                }
            }
            WindowEvent::RawMouse { dx, dy } => {
                let callback = self.0.callbacks.lock().raw_mouse.clone();
                if let Some(callback) = callback {
                    callback((dx, dy));
                }
            }
            WindowEvent::Scroll(delta) => {
                let callback = self.0.callbacks.lock().scroll.clone();
                if let Some(callback) = callback {
                    callback(delta);
                }
            }
            WindowEvent::MouseButton { button, pressed } => {
                let callback = self.0.callbacks.lock().mouse_button.clone();
                if let Some(callback) = callback {
                    callback((button, pressed));
                }
            }
            WindowEvent::Key { code, pressed } => {
                {
                    let mut keys = self.0.keys.lock();
                    if pressed {
                        keys.insert(code);
                    } else {
                        keys.remove(&code);
                    }
                }
                let callback = self.0.callbacks.lock().key.clone();
                if let Some(callback) = callback {
                    callback((code, pressed));
                }
            }
            WindowEvent::Char(c) if c.is_control() => {}
            WindowEvent::Char(c) => {
                let callback = self.0.callbacks.lock().char.clone();
                if let Some(callback) = callback {
                    callback(c);
                }
            }
        }
        Ok(())
    }

    pub fn on_resize(&self, f: impl Fn(u32, u32) + Send + Sync + 'static) {
        self.0.callbacks.lock().resize = Some(Arc::new(move |(w, h): (u32, u32)| f(w, h)));
    }

    pub fn on_raw_mouse(&self, f: impl Fn(i32, i32) + Send + Sync + 'static) {
        self.0.callbacks.lock().raw_mouse = Some(Arc::new(move |(dx, dy): (i32, i32)| f(dx, dy)));
    }

    pub fn on_scroll(&self, f: impl Fn(i16) + Send + Sync + 'static) {
        self.0.callbacks.lock().scroll = Some(Arc::new(f));
    }

    pub fn on_mouse_button(&self, f: impl Fn(MouseButton, bool) + Send + Sync + 'static) {
        self.0.callbacks.lock().mouse_button = Some(Arc::new(move |(b, p): (MouseButton, bool)| f(b, p)));
    }

    pub fn on_key(&self, f: impl Fn(u32, bool) + Send + Sync + 'static) {
        self.0.callbacks.lock().key = Some(Arc::new(move |(code, pressed): (u32, bool)| f(code, pressed)));
    }

    pub fn on_char(&self, f: impl Fn(char) + Send + Sync + 'static) {
        self.0.callbacks.lock().char = Some(Arc::new(f));
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Window {}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = *self.0.size.lock();
        f.debug_struct("Window")
            .field("class_name", &self.0.class_name)
            .field("width", &width)
            .field("height", &height)
            .finish()
    }
}
