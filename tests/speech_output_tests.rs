use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use breathwork::config::GuideConfig;
use breathwork::kernel::event::{Event, SpeechSignal};
use breathwork::speech::output::{parse_voice_list, select_voice, SayCommand, SpeechOutput, Utterance};

#[test]
fn test_voice_list_and_selection() {
    let listing = "Alex                en_US    # Most people recognize me by my voice.\n\
                   Amélie              fr_CA    # Bonjour, je m'appelle Amélie.\n\
                   Karen               en_AU    # Hello, my name is Karen.\n";
    let voices = parse_voice_list(listing);
    assert_eq!(voices.len(), 3);
    assert_eq!(voices[1].name, "Amélie");
    assert_eq!(voices[1].lang, "fr_CA");

    // 1. First preferred voice that is installed.
    let preferred = GuideConfig::default().preferred_voices;
    assert_eq!(select_voice(&voices, &preferred).as_deref(), Some("Karen"));

    // 2. No preferred match: first English voice.
    assert_eq!(select_voice(&voices, &[]).as_deref(), Some("Alex"));
    assert_eq!(select_voice(&[], &preferred), None);
}

#[tokio::test]
async fn test_speak_returns_before_process_starts() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut say = SayCommand::new("/nonexistent/speech-program", None, tx);

    // 1. An id comes back immediately even though the program is missing.
    let id = say.speak(Utterance::new("Soften the shoulders.", &GuideConfig::default())).unwrap();

    // 2. The failure surfaces as an end signal, never as a start.
    let signal = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(signal, Event::Speech(SpeechSignal::Ended { utterance }) if utterance == id));
}

#[tokio::test]
async fn test_utterance_runs_to_completion() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut say = SayCommand::new("true", None, tx);
    let id = say.speak(Utterance::new("Let the exhale be long.", &GuideConfig::default())).unwrap();

    let started = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(started, Event::Speech(SpeechSignal::Started { utterance }) if utterance == id));
    let ended = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(ended, Event::Speech(SpeechSignal::Ended { utterance }) if utterance == id));
}
