//! Resources
//!
//! Buffers and textures share one record type, [`Resource`]: a shared handle
//! to the native backing store, its views and the usage policy it was
//! created with. Kind-specific data lives in a per-kind layout.
//!
//! # Ownership
//!
//! Cloning a handle is cheap and aliases the same backing store. Equality
//! and hashing are by identity. When the last handle drops, the views are
//! released first, then the backing store.
//!
//! A buffer can be reallocated in place: the handle keeps its identity while
//! the backing store and views are replaced. Contexts holding bindings to the
//! old backing store are not notified; rebind after reallocating.
//!
//! # Typed handles
//!
//! [`VertexBuffer`], [`Texture2D`], [`RenderTarget`] and friends wrap a
//! [`Resource`] of the matching [`ResourceKind`] and deref to it, so the
//! shared queries are available on every handle.

pub mod buffer;
pub mod texture;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, Weak};

use anvil_core::{AnvilError, Format, PixelFormat, Result, ShaderStages, Usage};
use anvil_device::{ResourceKey, TextureDimension, ViewKey};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::owner::{DeviceRef, InstanceId, next_object_id};

/// Closed set of resource variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    VertexBuffer,
    IndexBuffer,
    ConstantBuffer,
    StructuredBuffer,
    RawBuffer,
    InstanceBuffer,
    Texture1D,
    Texture2D,
    Texture3D,
    RenderTarget,
    DepthBuffer,
}

impl ResourceKind {
    #[must_use]
    pub const fn is_buffer(self) -> bool {
        matches!(
            self,
            Self::VertexBuffer
                | Self::IndexBuffer
                | Self::ConstantBuffer
                | Self::StructuredBuffer
                | Self::RawBuffer
                | Self::InstanceBuffer
        )
    }
}

/// Native views created alongside a backing store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ResourceViews {
    pub srv: Option<ViewKey>,
    pub uav: Option<ViewKey>,
    pub rtv: Option<ViewKey>,
    pub dsv: Option<ViewKey>,
}

impl ResourceViews {
    pub fn keys(self) -> impl Iterator<Item = ViewKey> {
        [self.srv, self.uav, self.rtv, self.dsv].into_iter().flatten()
    }
}

pub(crate) struct BufferLayout {
    pub type_size: u32,
    pub num_elements: u32,
    /// Element format of raw buffers.
    pub format: Option<Format>,
    pub index_format: PixelFormat,
    pub unordered_access: bool,
    /// Index buffer bound together with a vertex buffer. Never keeps it alive.
    pub linked_index: Option<Weak<ResourceInner>>,
}

/// Shape and format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureLayout {
    pub dimension: TextureDimension,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub format: Format,
    /// Concrete format of the backing store. Typeless for depth buffers.
    pub pixel_format: PixelFormat,
    pub sample_count: u32,
    pub sample_quality: u32,
}

pub(crate) enum ResourceLayout {
    Buffer(BufferLayout),
    Texture(TextureLayout),
}

pub(crate) struct ResourceState {
    pub backing: ResourceKey,
    pub views: ResourceViews,
    pub usage: Usage,
    pub default_slot: u32,
    pub default_stages: ShaderStages,
    pub mapped: bool,
    pub layout: ResourceLayout,
}

impl ResourceState {
    pub fn buffer(&self) -> Option<&BufferLayout> {
        match &self.layout {
            ResourceLayout::Buffer(layout) => Some(layout),
            ResourceLayout::Texture(_) => None,
        }
    }

    pub fn buffer_mut(&mut self) -> Option<&mut BufferLayout> {
        match &mut self.layout {
            ResourceLayout::Buffer(layout) => Some(layout),
            ResourceLayout::Texture(_) => None,
        }
    }

    pub fn texture(&self) -> Option<&TextureLayout> {
        match &self.layout {
            ResourceLayout::Texture(layout) => Some(layout),
            ResourceLayout::Buffer(_) => None,
        }
    }
}

pub(crate) struct ResourceInner {
    id: u64,
    kind: ResourceKind,
    owner: DeviceRef,
    state: RwLock<ResourceState>,
}

impl Drop for ResourceInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let device = &self.owner.device;
        for view in state.views.keys() {
            device.release_view(view);
        }
        device.release_resource(state.backing);
        log::debug!("Released {:?} #{}", self.kind, self.id);
    }
}

/// Shared handle to a buffer or texture.
#[derive(Clone)]
pub struct Resource(pub(crate) Arc<ResourceInner>);

impl Resource {
    pub(crate) fn new(owner: DeviceRef, kind: ResourceKind, state: ResourceState) -> Self {
        let id = next_object_id();
        log::debug!("Created {kind:?} #{id} ({:?})", state.usage);
        Self(Arc::new(ResourceInner {
            id,
            kind,
            owner,
            state: RwLock::new(state),
        }))
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ResourceState> {
        self.0.state.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ResourceState> {
        self.0.state.write()
    }

    #[inline]
    pub(crate) fn owner(&self) -> &DeviceRef {
        &self.0.owner
    }

    pub(crate) fn downgrade(&self) -> Weak<ResourceInner> {
        Arc::downgrade(&self.0)
    }

    /// Native key of the current backing store. Changes on reallocation.
    #[must_use]
    pub fn backing(&self) -> ResourceKey {
        self.read().backing
    }

    pub(crate) fn views(&self) -> ResourceViews {
        self.read().views
    }

    #[must_use]
    pub fn shader_resource_view(&self) -> Option<ViewKey> {
        self.read().views.srv
    }

    #[must_use]
    pub fn unordered_access_view(&self) -> Option<ViewKey> {
        self.read().views.uav
    }

    #[must_use]
    pub fn render_target_view(&self) -> Option<ViewKey> {
        self.read().views.rtv
    }

    #[must_use]
    pub fn depth_stencil_view(&self) -> Option<ViewKey> {
        self.read().views.dsv
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.0.kind
    }

    /// The instance that created this resource.
    #[inline]
    #[must_use]
    pub fn instance(&self) -> InstanceId {
        self.0.owner.instance
    }

    /// Number of live handles sharing this resource.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    #[must_use]
    pub fn usage(&self) -> Usage {
        self.read().usage
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.usage() == Usage::Static
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.usage() == Usage::Dynamic
    }

    #[must_use]
    pub fn is_staging(&self) -> bool {
        self.usage() == Usage::Staging
    }

    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.usage() == Usage::Immutable
    }

    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.read().mapped
    }

    /// Slot used when a bind call leaves the slot out.
    #[must_use]
    pub fn default_slot(&self) -> u32 {
        self.read().default_slot
    }

    pub fn set_default_slot(&self, slot: u32) {
        self.write().default_slot = slot;
    }

    /// Stages used when a bind call leaves the stage mask out.
    #[must_use]
    pub fn default_stages(&self) -> ShaderStages {
        self.read().default_stages
    }

    pub fn set_default_stages(&self, stages: ShaderStages) {
        self.write().default_stages = stages;
    }

    #[must_use]
    pub fn has_shader_resource_view(&self) -> bool {
        self.read().views.srv.is_some()
    }

    #[must_use]
    pub fn has_unordered_access_view(&self) -> bool {
        self.read().views.uav.is_some()
    }

    /// Bytes per element. Textures report 0.
    #[must_use]
    pub fn type_size(&self) -> u32 {
        self.read().buffer().map_or(0, |b| b.type_size)
    }

    /// Element count. Textures report 0.
    #[must_use]
    pub fn num_elements(&self) -> u32 {
        self.read().buffer().map_or(0, |b| b.num_elements)
    }

    /// `type_size * num_elements`. Textures report 0.
    #[must_use]
    pub fn byte_width(&self) -> u32 {
        self.read().buffer().map_or(0, |b| b.type_size * b.num_elements)
    }

    #[must_use]
    pub fn texture_layout(&self) -> Option<TextureLayout> {
        self.read().texture().copied()
    }

    /// Texture width. Buffers report 0.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.read().texture().map_or(0, |t| t.width)
    }

    /// Texture height. Buffers report 0.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.read().texture().map_or(0, |t| t.height)
    }

    /// Texture depth. Buffers report 0.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.read().texture().map_or(0, |t| t.depth)
    }

    /// Copies the backing store out, bypassing CPU access rules.
    ///
    /// Only built with the `read_back` feature, for tests and diagnostics.
    /// Readback that follows the device contract goes through a staging copy
    /// and [`Context::map_resource`](crate::Context::map_resource).
    #[cfg(feature = "read_back")]
    #[doc(hidden)]
    pub fn read_back(&self) -> Result<Vec<u8>> {
        self.owner().device.read_back(self.backing())
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("kind", &self.0.kind)
            .field("id", &self.0.id)
            .field("instance", &self.0.owner.instance)
            .finish_non_exhaustive()
    }
}

impl AsRef<Resource> for Resource {
    fn as_ref(&self) -> &Resource {
        self
    }
}

macro_rules! typed_resource {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash)]
        pub struct $name(Resource);

        impl $name {
            pub(crate) fn wrap(resource: Resource) -> Self {
                Self(resource)
            }

            #[inline]
            #[must_use]
            pub fn resource(&self) -> &Resource {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = Resource;

            fn deref(&self) -> &Resource {
                &self.0
            }
        }

        impl AsRef<Resource> for $name {
            fn as_ref(&self) -> &Resource {
                &self.0
            }
        }

        impl From<$name> for Resource {
            fn from(handle: $name) -> Resource {
                handle.0
            }
        }

        impl TryFrom<Resource> for $name {
            type Error = AnvilError;

            fn try_from(resource: Resource) -> Result<Self> {
                if resource.kind() == ResourceKind::$name {
                    Ok(Self(resource))
                } else {
                    Err(AnvilError::InvalidUsage(format!(
                        "{:?} is not a {}",
                        resource.kind(),
                        stringify!($name)
                    )))
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0.id()).finish()
            }
        }
    };
}

typed_resource!(
    /// Per-vertex stream data, optionally linked to an index buffer.
    VertexBuffer
);
typed_resource!(IndexBuffer);
typed_resource!(
    /// Shader constants. Always exactly one element.
    ConstantBuffer
);
typed_resource!(StructuredBuffer);
typed_resource!(
    /// Typed element buffer read through a formatted shader-resource view.
    RawBuffer
);
typed_resource!(
    /// Per-instance stream data bound at vertex slot 1.
    InstanceBuffer
);
typed_resource!(Texture1D);
typed_resource!(Texture2D);
typed_resource!(Texture3D);
typed_resource!(
    /// 2D texture that can be rendered to.
    RenderTarget
);
typed_resource!(
    /// Depth (and optionally stencil) target, readable by shaders.
    DepthBuffer
);
