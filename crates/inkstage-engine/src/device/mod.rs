//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue without a window
//! - handing out a [`WgpuBackend`](crate::render::WgpuBackend) bound to that device

mod gpu;
mod init;

pub use gpu::Gpu;
pub use init::GpuInit;
