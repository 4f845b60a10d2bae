//! GPU device bring-up.
//!
//! [`GraphicsDevice::create`] is all-or-nothing: it either returns a device with a chosen
//! adapter, a logical device and its queue, or a typed [`DeviceError`]. No partially
//! initialized device is ever handed out, so nothing can be created against one.

use crate::error_info;
use crate::rendering::ErrorCode;
use bon::Builder;
use futures::executor::block_on;
use log::{debug, info, warn};
use snafu::Snafu;
use std::fmt::{Display, Formatter};
use wgpu::{
    Adapter, AdapterInfo, Backends, Device, DeviceDescriptor, DeviceType, ExperimentalFeatures,
    Features, Instance, InstanceDescriptor, InstanceFlags, Limits, MemoryHints, PollType, Queue,
    Trace,
};

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum DeviceError {
    #[snafu(display("Failed to create the GPU instance [{code}]: {message}"))]
    CreateFactoryFailed { code: ErrorCode, message: String },

    #[snafu(display("No usable GPU adapter after filtering [{code}]: {message}"))]
    EnumAdapterFailed { code: ErrorCode, message: String },

    #[snafu(display("Failed to create the logical device [{code}]: {message}"))]
    CreateDeviceFailed { code: ErrorCode, message: String },

    #[snafu(display("Failed to obtain the device queue [{code}]: {message}"))]
    CreateContextFailed { code: ErrorCode, message: String },

    #[snafu(display("No feature level at or above the requested minimum [{code}]: {message}"))]
    UnsupportedFeatureLevel { code: ErrorCode, message: String },

    #[snafu(display("No GPU adapter found [{code}]: {message}"))]
    AdapterNotFound { code: ErrorCode, message: String },
}

error_info!(DeviceError {
    CreateFactoryFailed,
    EnumAdapterFailed,
    CreateDeviceFailed,
    CreateContextFailed,
    UnsupportedFeatureLevel,
    AdapterNotFound,
});

pub type Result<T, E = DeviceError> = std::result::Result<T, E>;

/// Capability tiers a device can be created at, ordered from weakest to strongest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureLevel {
    WebGl2,
    Downlevel,
    Full,
}

impl FeatureLevel {
    /// All levels, strongest first. Device creation walks this list.
    pub const DESCENDING: [FeatureLevel; 3] =
        [FeatureLevel::Full, FeatureLevel::Downlevel, FeatureLevel::WebGl2];

    pub fn limits(self) -> Limits {
        match self {
            FeatureLevel::Full => Limits::default(),
            FeatureLevel::Downlevel => Limits::downlevel_defaults(),
            FeatureLevel::WebGl2 => Limits::downlevel_webgl2_defaults(),
        }
    }

    /// Levels that are tried for a given minimum, strongest first.
    pub fn candidates(minimum: FeatureLevel) -> impl Iterator<Item = FeatureLevel> {
        Self::DESCENDING
            .into_iter()
            .filter(move |level| *level >= minimum)
    }

    /// Candidates for `minimum` whose limits fit within `adapter_limits`.
    pub fn reachable(
        minimum: FeatureLevel,
        adapter_limits: &Limits,
    ) -> impl Iterator<Item = FeatureLevel> + '_ {
        Self::candidates(minimum).filter(move |level| {
            let fits = level.limits().check_limits(adapter_limits);
            if !fits {
                debug!("Adapter does not reach feature level {level}");
            }
            fits
        })
    }
}

impl Display for FeatureLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeatureLevel::Full => "full",
            FeatureLevel::Downlevel => "downlevel",
            FeatureLevel::WebGl2 => "webgl2",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Builder)]
pub struct DeviceDesc {
    #[builder(default)]
    pub enable_debug_layer: bool,
    #[builder(default = cfg!(debug_assertions))]
    pub enable_validation: bool,
    #[builder(default)]
    pub preferred_adapter: usize,
    #[builder(default = FeatureLevel::Downlevel)]
    pub min_feature_level: FeatureLevel,
    /// Also consider CPU/software rasterizers.
    #[builder(default)]
    pub allow_software: bool,
    #[builder(default = Backends::all())]
    pub backends: Backends,
}

impl Default for DeviceDesc {
    fn default() -> Self {
        DeviceDesc {
            enable_debug_layer: false,
            enable_validation: cfg!(debug_assertions),
            preferred_adapter: 0,
            min_feature_level: FeatureLevel::Downlevel,
            allow_software: false,
            backends: Backends::all(),
        }
    }
}

impl DeviceDesc {
    fn instance_flags(&self) -> InstanceFlags {
        let mut flags = InstanceFlags::empty();
        if self.enable_debug_layer {
            flags |= InstanceFlags::DEBUG;
        }
        if self.enable_validation {
            flags |= InstanceFlags::VALIDATION;
        }
        flags
    }
}

#[derive(Debug)]
pub struct GraphicsDevice {
    instance: Instance,
    adapter: Adapter,
    device: Device,
    queue: Queue,
    feature_level: FeatureLevel,
    tried_levels: Vec<FeatureLevel>,
}

impl GraphicsDevice {
    pub fn create(desc: &DeviceDesc) -> Result<GraphicsDevice> {
        let instance = create_instance(desc)?;
        let adapter = select_adapter(&instance, desc)?;

        let info = adapter.get_info();
        info!(
            "Using GPU adapter \"{}\" ({:?}, {:?})",
            info.name, info.device_type, info.backend
        );

        let (device, queue, feature_level, tried_levels) = create_device(&adapter, desc)?;
        info!("Created logical device at feature level {feature_level}");

        Ok(GraphicsDevice {
            instance,
            adapter,
            device,
            queue,
            feature_level,
            tried_levels,
        })
    }

    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    #[inline]
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn adapter_info(&self) -> AdapterInfo {
        self.adapter.get_info()
    }

    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The queue doubles as the immediate context: every upload and submission goes through it.
    #[inline]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    #[inline]
    pub fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    /// True iff a device was requested at `level` before or when the achieved one was reached.
    /// Levels the adapter's limits ruled out were never requested.
    pub fn supports_feature_level(&self, level: FeatureLevel) -> bool {
        self.tried_levels.contains(&level)
    }

    /// Blocks until all submitted GPU work is done.
    pub fn flush(&self) {
        if let Err(e) = self.device.poll(PollType::wait_indefinitely()) {
            warn!("Failed to wait for the GPU queue to drain: {e}");
        }
    }

    /// Logs the resources wgpu still tracks for this device. Diagnostic only.
    pub fn report_live_objects(&self, flush: bool) {
        if flush {
            self.flush();
        }

        let info = self.adapter.get_info();
        let counters = self.device.get_internal_counters();
        let hal = &counters.hal;

        info!(
            "Live GPU objects on \"{}\": {} buffers, {} textures, {} texture views, \
             {} bind groups, {} render pipelines, {} shader modules",
            info.name,
            hal.buffers.read(),
            hal.textures.read(),
            hal.texture_views.read(),
            hal.bind_groups.read(),
            hal.render_pipelines.read(),
            hal.shader_modules.read(),
        );
    }
}

fn create_instance(desc: &DeviceDesc) -> Result<Instance> {
    let compiled = Instance::enabled_backend_features();
    if !compiled.intersects(desc.backends) {
        return CreateFactoryFailedErr {
            code: ErrorCode::UNSUPPORTED,
            message: format!(
                "requested backends {:?} but only {:?} are available",
                desc.backends, compiled
            ),
        }
        .fail();
    }

    Ok(Instance::new(&InstanceDescriptor {
        backends: desc.backends,
        flags: desc.instance_flags(),
        ..Default::default()
    }))
}

fn select_adapter(instance: &Instance, desc: &DeviceDesc) -> Result<Adapter> {
    let adapters = block_on(instance.enumerate_adapters(desc.backends));
    if adapters.is_empty() {
        return AdapterNotFoundErr {
            code: ErrorCode::NOT_FOUND,
            message: format!("no adapters for backends {:?}", desc.backends),
        }
        .fail();
    }

    let total = adapters.len();
    let mut adapters: Vec<Adapter> = adapters
        .into_iter()
        .filter(|adapter| {
            let info = adapter.get_info();
            let usable = desc.allow_software || info.device_type != DeviceType::Cpu;
            if !usable {
                debug!("Skipping software adapter \"{}\"", info.name);
            }
            usable
        })
        .collect();

    if adapters.is_empty() {
        return EnumAdapterFailedErr {
            code: ErrorCode::NOT_FOUND,
            message: format!("all {total} adapters are software rasterizers"),
        }
        .fail();
    }

    let index = if desc.preferred_adapter < adapters.len() {
        desc.preferred_adapter
    } else {
        warn!(
            "Preferred adapter #{} is out of range ({} usable), falling back to #0",
            desc.preferred_adapter,
            adapters.len()
        );
        0
    };

    Ok(adapters.swap_remove(index))
}

fn create_device(
    adapter: &Adapter,
    desc: &DeviceDesc,
) -> Result<(Device, Queue, FeatureLevel, Vec<FeatureLevel>)> {
    let adapter_limits = adapter.limits();
    let mut tried = Vec::new();
    let mut last_error = None;

    for level in FeatureLevel::reachable(desc.min_feature_level, &adapter_limits) {
        tried.push(level);

        let limits = level.limits();
        let request = adapter.request_device(&DeviceDescriptor {
            label: Some("Vitrail Device"),
            required_features: Features::empty(),
            required_limits: limits,
            experimental_features: ExperimentalFeatures::disabled(),
            memory_hints: MemoryHints::Performance,
            trace: Trace::Off,
        });

        match block_on(request) {
            Ok((device, queue)) => return Ok((device, queue, level, tried)),
            Err(e) => {
                warn!("Device creation at feature level {level} failed: {e}");
                last_error = Some(e.to_string());
            }
        }
    }

    match last_error {
        Some(message) => CreateDeviceFailedErr {
            code: ErrorCode::FAIL,
            message,
        }
        .fail(),
        None => UnsupportedFeatureLevelErr {
            code: ErrorCode::UNSUPPORTED,
            message: format!("adapter is below feature level {}", desc.min_feature_level),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_descend_to_minimum() {
        let levels: Vec<_> = FeatureLevel::candidates(FeatureLevel::Downlevel).collect();
        assert_eq!(levels, vec![FeatureLevel::Full, FeatureLevel::Downlevel]);

        let levels: Vec<_> = FeatureLevel::candidates(FeatureLevel::Full).collect();
        assert_eq!(levels, vec![FeatureLevel::Full]);

        let levels: Vec<_> = FeatureLevel::candidates(FeatureLevel::WebGl2).collect();
        assert_eq!(levels.len(), 3);
    }

    #[test]
    fn only_levels_within_adapter_limits_are_requested() {
        let webgl = Limits::downlevel_webgl2_defaults();
        let levels: Vec<_> = FeatureLevel::reachable(FeatureLevel::WebGl2, &webgl).collect();
        assert_eq!(levels, vec![FeatureLevel::WebGl2]);

        let levels: Vec<_> = FeatureLevel::reachable(FeatureLevel::Downlevel, &webgl).collect();
        assert!(levels.is_empty());

        let full = Limits::default();
        let levels: Vec<_> = FeatureLevel::reachable(FeatureLevel::WebGl2, &full).collect();
        assert_eq!(levels, FeatureLevel::DESCENDING);
    }

    #[test]
    fn levels_order_weakest_first() {
        assert!(FeatureLevel::Full > FeatureLevel::Downlevel);
        assert!(FeatureLevel::Downlevel > FeatureLevel::WebGl2);
        assert_eq!(FeatureLevel::Full.to_string(), "full");
    }

    #[test]
    fn desc_defaults_and_builder_agree() {
        let built = DeviceDesc::builder().build();
        let default = DeviceDesc::default();

        assert_eq!(built.preferred_adapter, default.preferred_adapter);
        assert_eq!(built.min_feature_level, default.min_feature_level);
        assert_eq!(built.enable_validation, default.enable_validation);
        assert_eq!(built.backends, default.backends);
        assert!(!built.allow_software);
    }

    #[test]
    fn validation_flags_follow_desc() {
        let desc = DeviceDesc::builder()
            .enable_debug_layer(true)
            .enable_validation(false)
            .build();
        let flags = desc.instance_flags();
        assert!(flags.contains(InstanceFlags::DEBUG));
        assert!(!flags.contains(InstanceFlags::VALIDATION));
    }

    #[test]
    fn errors_expose_code_and_message() {
        let err = AdapterNotFoundErr {
            code: ErrorCode::NOT_FOUND,
            message: "none",
        }
        .build();
        assert_eq!(err.code(), ErrorCode::NOT_FOUND);
        assert_eq!(err.message(), "none");
        assert!(matches!(err, DeviceError::AdapterNotFound { .. }));
    }
}
