//! Generation-checked handles into the device's object arenas.

use slotmap::new_key_type;

new_key_type! {
    /// A buffer or texture backing store.
    pub struct ResourceKey;
    /// A typed view over a resource.
    pub struct ViewKey;
    /// A sampler, rasterizer, blend or depth-stencil state object.
    pub struct StateKey;
    pub struct ShaderKey;
    pub struct LayoutKey;
    /// An immediate or deferred command stream.
    pub struct ContextKey;
    /// A sealed list of recorded commands.
    pub struct CommandListKey;
    pub struct SwapChainKey;
}
