//! Audio collaborators: decoding, rendering backends and outputs

pub mod backend;
pub mod decoder;
pub mod mixer;
pub mod output;
pub mod types;
pub mod wav;

pub use backend::{CompletionCallback, RenderBackend, RenderHandle};
pub use decoder::{AudioDecoder, SymphoniaDecoder};
pub use mixer::{CompletionDispatcher, Mixer, MixerBackend};
pub use output::AudioOutput;
pub use types::DecodedBuffer;
pub use wav::{RenderStats, WavRenderer};
