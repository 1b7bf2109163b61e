//! Audio capture, file decoding and playback

pub mod input;
pub mod output;
pub mod buffer;
pub mod decode;
pub mod resample;
pub mod source;

pub use input::{AudioDeviceInfo, AudioInput};
pub use output::AudioOutput;
pub use buffer::AudioRingBuffer;
pub use decode::{decode_file, AudioFormat};
pub use source::{CaptureHandle, CaptureStream, DeviceSource, Playback, SampleSource};
