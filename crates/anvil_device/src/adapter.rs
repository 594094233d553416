//! Physical adapter enumeration.

/// Read-only descriptor of a physical adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor_id: u32,
    pub device_id: u32,
    pub subsys_id: u32,
    pub revision: u32,
    pub dedicated_video_memory: u64,
    pub dedicated_system_memory: u64,
    pub shared_system_memory: u64,
    /// Resolution of the adapter's primary output.
    pub output_width: u32,
    pub output_height: u32,
}

impl AdapterInfo {
    /// The in-process reference adapter.
    #[must_use]
    pub fn reference() -> Self {
        Self {
            name: "Anvil Reference Device".to_owned(),
            vendor_id: 0xA7C1,
            device_id: 0x0001,
            subsys_id: 0,
            revision: 1,
            dedicated_video_memory: 512 << 20,
            dedicated_system_memory: 0,
            shared_system_memory: 4 << 30,
            output_width: 1920,
            output_height: 1080,
        }
    }
}

impl Default for AdapterInfo {
    fn default() -> Self {
        Self::reference()
    }
}

/// Lists the adapters a device can be created on.
#[must_use]
pub fn enumerate_adapters() -> Vec<AdapterInfo> {
    vec![AdapterInfo::reference()]
}
