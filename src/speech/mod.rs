pub mod client;
pub mod output;
pub mod phrase;
pub mod scheduler;

pub use client::PhraseClient;
pub use output::{SayCommand, SilentSpeech, SpeechOutput, Utterance};
pub use phrase::{PhraseOrigin, PhraseRequest, PhraseSource};
pub use scheduler::GuideScheduler;
