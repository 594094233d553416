//! Instance
//!
//! The entry point of the facade. An [`Instance`] owns the native device, the
//! default window, the shader compiler and the precomputed state presets.
//! Every object it creates remembers which instance it came from; contexts
//! reject objects from other instances.
//!
//! # Quick start
//!
//! ```rust,ignore
//! let instance = Instance::new(InstanceSettings {
//!     window: WindowParams::headless(1280, 720),
//!     ..Default::default()
//! })?;
//! let ctx = instance.immediate_context();
//! ctx.bind_back_buffer(None, None)?;
//! ctx.clear_render_target(&instance.window().back_buffer(), Vec4::new(0.1, 0.1, 0.1, 1.0))?;
//! instance.window().present(1)?;
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use anvil_core::{AnvilError, CullMode, DepthState, FillMode, PrimitiveTopology, RasterizerDesc, Result, Viewport};
use anvil_device::{
    AdapterInfo, DeviceConfig, DeviceStats, NativeDevice, ReferenceCompiler, ShaderCompiler, enumerate_adapters,
};

use crate::context::{Context, DeferredContext};
use crate::owner::{DeviceRef, InstanceId};
use crate::resource::RenderTarget;
use crate::state::{DepthStencilState, RasterizerState, create_depth_stencil, create_rasterizer};
use crate::window::{Window, WindowParams};

/// Instance construction options.
#[derive(Debug, Clone, Default)]
pub struct InstanceSettings {
    /// Parameters of the default window.
    pub window: WindowParams,
    /// Adapter to create the device on; `None` for the first enumerated one.
    pub adapter: Option<AdapterInfo>,
    /// Allocation budget in bytes, overriding the adapter's video memory.
    pub memory_budget: Option<u64>,
    /// Log every submitted command at trace level.
    pub trace_commands: bool,
}

/// State shared by the instance and all its contexts.
pub(crate) struct InstanceShared {
    pub owner: DeviceRef,
    pub compiler: Arc<dyn ShaderCompiler>,
    /// Indexed by [`RasterizerDesc::preset_index`].
    pub rasterizers: Vec<RasterizerState>,
    /// Indexed by [`DepthState::index`].
    pub depth_presets: Vec<DepthStencilState>,
    /// Set once the default window exists.
    pub window: OnceLock<Window>,
}

impl InstanceShared {
    pub fn window_back_buffer(&self) -> Result<RenderTarget> {
        self.window
            .get()
            .map(Window::back_buffer)
            .ok_or(AnvilError::NullResource("bind_back_buffer"))
    }
}

pub struct Instance {
    shared: Arc<InstanceShared>,
    immediate: Context,
    window: Window,
}

impl Instance {
    /// An instance using the reference shader compiler.
    pub fn new(settings: InstanceSettings) -> Result<Self> {
        Self::with_compiler(settings, ReferenceCompiler)
    }

    pub fn with_compiler(settings: InstanceSettings, compiler: impl ShaderCompiler + 'static) -> Result<Self> {
        let adapter = settings
            .adapter
            .clone()
            .or_else(|| enumerate_adapters().into_iter().next())
            .unwrap_or_else(AdapterInfo::reference);
        let device = NativeDevice::new(
            adapter,
            DeviceConfig {
                memory_budget: settings.memory_budget,
                trace_commands: settings.trace_commands,
            },
        );
        let owner = DeviceRef {
            instance: InstanceId::next(),
            device: Arc::new(device),
        };

        let mut rasterizers = Vec::with_capacity(6);
        for fill in [FillMode::Solid, FillMode::Wireframe] {
            for cull in [CullMode::None, CullMode::Front, CullMode::Back] {
                debug_assert_eq!(rasterizers.len(), RasterizerDesc::preset_index(cull, fill));
                rasterizers.push(create_rasterizer(&owner, RasterizerDesc::preset(cull, fill))?);
            }
        }
        let depth_presets = DepthState::ALL
            .into_iter()
            .map(|state| create_depth_stencil(&owner, state.desc()))
            .collect::<Result<Vec<_>>>()?;

        let shared = Arc::new(InstanceShared {
            owner,
            compiler: Arc::new(compiler),
            rasterizers,
            depth_presets,
            window: OnceLock::new(),
        });
        let immediate = Context::immediate(Arc::clone(&shared));
        let window = Window::create(&shared.owner, immediate.key(), &settings.window)?;
        let _ = shared.window.set(window.clone());

        immediate.set_depth_buffer_state(DepthState::ReadWrite)?;
        immediate.set_primitive_topology(PrimitiveTopology::TriangleList)?;
        immediate.set_viewport(Viewport::from_size(window.width(), window.height()))?;
        immediate.set_cull_and_fill_mode(CullMode::Back, FillMode::Solid)?;

        log::info!(
            "Instance {} created on '{}'",
            shared.owner.instance.get(),
            shared.owner.device.adapter().name
        );
        Ok(Self {
            shared,
            immediate,
            window,
        })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.shared.owner.instance
    }

    pub(crate) fn owner(&self) -> &DeviceRef {
        &self.shared.owner
    }

    pub(crate) fn shared(&self) -> &InstanceShared {
        &self.shared
    }

    /// The one context that executes commands directly.
    #[inline]
    #[must_use]
    pub fn immediate_context(&self) -> &Context {
        &self.immediate
    }

    pub fn create_deferred_context(&self) -> Result<DeferredContext> {
        DeferredContext::create(Arc::clone(&self.shared))
    }

    /// The window created with the instance.
    #[inline]
    #[must_use]
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Opens another window on this instance's device.
    pub fn create_window(&self, params: &WindowParams) -> Result<Window> {
        Window::create(&self.shared.owner, self.immediate.key(), params)
    }

    #[must_use]
    pub fn enumerate_adapters() -> Vec<AdapterInfo> {
        enumerate_adapters()
    }

    #[inline]
    #[must_use]
    pub fn adapter(&self) -> &AdapterInfo {
        self.shared.owner.device.adapter()
    }

    #[must_use]
    pub fn device_stats(&self) -> DeviceStats {
        self.shared.owner.device.stats()
    }

    /// Native objects currently alive on the device.
    #[must_use]
    pub fn live_object_count(&self) -> usize {
        self.shared.owner.device.live_object_count()
    }

    /// Bytes currently allocated for backing stores.
    #[must_use]
    pub fn allocated_bytes(&self) -> u64 {
        self.shared.owner.device.allocated_bytes()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id())
            .field("adapter", &self.adapter().name)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
