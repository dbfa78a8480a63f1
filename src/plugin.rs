//! Decoder ("input") and sound-device ("output") backends.
//!
//! Backends are trait objects registered at start-up in a
//! [`PluginRegistry`]; the registry resolves a file to its decoder by
//! extension and priority, and an output backend by name.

use std::path::Path;

use crate::error::{Error, Result};
use crate::track::{Metadata, SampleFormat};

mod null_output;
mod registry;
mod rodio_input;
mod rodio_output;

pub use null_output::NullOutput;
pub use registry::{DEFAULT_OUTPUT, OutputFactory, PluginRegistry};
pub use rodio_input::RodioInput;
pub use rodio_output::RodioOutput;

/// A decoder backend.
pub trait InputPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Lower-case file extensions this backend claims, without the dot.
    fn extensions(&self) -> &[&str];

    /// Lower values win when several backends claim an extension.
    fn priority(&self) -> i32 {
        0
    }

    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Decoder>>;

    fn metadata(&self, path: &Path) -> Result<Metadata>;
}

/// An open decoder stream.
pub trait Decoder: Send {
    fn format(&self) -> SampleFormat;

    /// Decode into `buf` and return the number of samples written; 0 means
    /// end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Seek to `position` seconds.
    fn seek(&mut self, position: u32) -> Result<()>;

    /// Current position in seconds.
    fn position(&self) -> Result<u32>;

    fn close(self: Box<Self>) {}
}

/// A sound-device backend.
pub trait OutputPlugin: Send {
    fn name(&self) -> &str;

    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn open(&mut self) -> Result<()>;

    fn close(&mut self);

    fn start(&mut self, format: SampleFormat) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Preferred write size in bytes for the started format.
    fn buffer_size(&self) -> usize;

    fn volume_support(&self) -> bool {
        false
    }

    fn volume(&self) -> Result<u8> {
        Err(Error::backend(self.name(), "volume not supported"))
    }

    fn set_volume(&mut self, _level: u8) -> Result<()> {
        Err(Error::backend(self.name(), "volume not supported"))
    }
}

#[cfg(test)]
pub(crate) mod mock;
