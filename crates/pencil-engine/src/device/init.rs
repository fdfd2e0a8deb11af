/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode used when vsync is on.
    ///
    /// With vsync off the runtime requests `AutoNoVsync` instead.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features. Nothing the renderer draws needs any.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface (a hint).
    pub desired_maximum_frame_latency: u32,
}

impl GpuInit {
    /// Returns a copy with the present mode chosen for `vsync`.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        if !vsync {
            self.present_mode = wgpu::PresentMode::AutoNoVsync;
        } else if self.present_mode == wgpu::PresentMode::AutoNoVsync {
            self.present_mode = wgpu::PresentMode::Fifo;
        }
        self
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            desired_maximum_frame_latency: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_off_disables_fifo() {
        let init = GpuInit::default().with_vsync(false);
        assert_eq!(init.present_mode, wgpu::PresentMode::AutoNoVsync);
    }

    #[test]
    fn vsync_on_restores_fifo() {
        let init = GpuInit::default().with_vsync(false).with_vsync(true);
        assert_eq!(init.present_mode, wgpu::PresentMode::Fifo);
    }

    #[test]
    fn vsync_on_keeps_explicit_mode() {
        let init = GpuInit {
            present_mode: wgpu::PresentMode::Mailbox,
            ..Default::default()
        }
        .with_vsync(true);
        assert_eq!(init.present_mode, wgpu::PresentMode::Mailbox);
    }
}
