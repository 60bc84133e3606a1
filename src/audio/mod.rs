pub mod automation;
pub mod engine;
pub mod filter;
pub mod mixer;
pub mod output;
pub mod patches;
pub mod pink;
pub mod track;
pub mod voice;

pub use engine::{SynthEngine, VoiceHandle};
pub use mixer::{Mixer, MixerCommand};
pub use voice::{Voice, VoiceId};
