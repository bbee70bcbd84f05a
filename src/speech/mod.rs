//! Voice input and output
//!
//! [`SpeechBridge`] is the single entry point the chat views use: it owns the
//! process-wide mute flag, keeps at most one utterance playing, guards against
//! overlapping recognition sessions and turns engine failures into messages
//! the user can act on. Share one bridge through `Arc` across every view.
//!
//! Engines sit behind [`SynthesisEngine`] and [`RecognitionEngine`]; the
//! microphone check behind [`MicrophoneProbe`].

use crate::config::SpeechConfig;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub mod error;
pub mod microphone;
mod process;
pub mod recognition;
pub mod synthesis;

pub use error::{RecognitionError, SynthesisError};
pub use microphone::{MicrophoneProbe, MicrophoneStatus, ProbeChain};
pub use recognition::{resolve_recognizer, CommandRecognizer, RecognitionEngine};
pub use synthesis::{resolve_synthesizer, CommandSynthesizer, SynthesisEngine};

/// Fixed voice parameters applied to every utterance
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
}

impl From<&SpeechConfig> for VoiceSettings {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            language: config.language.clone(),
            rate: config.rate,
            pitch: config.pitch,
        }
    }
}

/// Result of [`SpeechBridge::toggle_speech`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechToggle {
    Paused,
    Resumed,
    /// Nothing was playing
    Idle,
}

/// Locate an executable on `PATH`
pub(crate) fn find_on_path(program: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then_some(candidate);
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let full = dir.join(program);
        if full.is_file() {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", program));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Clears the recognition flag when a session ends, however it ends
struct ListeningGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for ListeningGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Shared controller for speech recognition and synthesis
pub struct SpeechBridge {
    enabled: bool,
    voice: VoiceSettings,
    recognition_timeout: Duration,
    synthesizer: Option<Arc<dyn SynthesisEngine>>,
    recognizer: Option<Arc<dyn RecognitionEngine>>,
    microphone: Arc<dyn MicrophoneProbe>,
    muted: AtomicBool,
    paused: AtomicBool,
    listening: Arc<AtomicBool>,
}

impl SpeechBridge {
    /// Assemble a bridge from explicit engines
    pub fn new(
        config: &SpeechConfig,
        synthesizer: Option<Arc<dyn SynthesisEngine>>,
        recognizer: Option<Arc<dyn RecognitionEngine>>,
        microphone: Arc<dyn MicrophoneProbe>,
    ) -> Self {
        Self {
            enabled: config.enabled,
            voice: VoiceSettings::from(config),
            recognition_timeout: Duration::from_secs(config.recognition_timeout_seconds),
            synthesizer,
            recognizer,
            microphone,
            muted: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Resolve engines installed on this system
    pub fn from_config(config: &SpeechConfig) -> Self {
        if !config.enabled {
            tracing::info!("Speech is disabled");
            return Self::new(config, None, None, Arc::new(ProbeChain::new(Vec::new())));
        }

        let synthesizer = resolve_synthesizer(&config.synthesizers)
            .map(|s| Arc::new(s) as Arc<dyn SynthesisEngine>);
        let recognizer = resolve_recognizer(&config.recognizers)
            .map(|r| Arc::new(r) as Arc<dyn RecognitionEngine>);

        if synthesizer.is_none() {
            tracing::warn!("No speech synthesizer found; replies will not be read aloud");
        }

        Self::new(
            config,
            synthesizer,
            recognizer,
            Arc::new(ProbeChain::system_default()),
        )
    }

    /// A bridge that never speaks or listens
    pub fn disabled() -> Self {
        let config = SpeechConfig {
            enabled: false,
            ..SpeechConfig::default()
        };
        Self::new(&config, None, None, Arc::new(ProbeChain::new(Vec::new())))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn voice(&self) -> &VoiceSettings {
        &self.voice
    }

    // ------------------------------------------------------------------
    // Synthesis
    // ------------------------------------------------------------------

    /// Read `text` aloud, replacing whatever is playing
    ///
    /// Does nothing when muted, disabled or given blank text. Returns the
    /// task driving the utterance when one was started.
    pub fn speak_text<E, F>(&self, text: &str, on_end: E, on_error: F) -> Option<JoinHandle<()>>
    where
        E: FnOnce() + Send + 'static,
        F: FnOnce(SynthesisError) + Send + 'static,
    {
        if !self.enabled || self.is_muted() || text.trim().is_empty() {
            tracing::debug!("Speech output skipped (muted, disabled or empty)");
            return None;
        }

        let Some(engine) = self.synthesizer.clone() else {
            tracing::warn!("Speech synthesis is not available");
            on_error(SynthesisError::Unsupported);
            return None;
        };

        engine.cancel();
        self.paused.store(false, Ordering::SeqCst);

        let text = text.to_string();
        let voice = self.voice.clone();
        Some(tokio::spawn(async move {
            match engine.speak(&text, &voice).await {
                Ok(()) => {
                    tracing::debug!("Utterance finished");
                    on_end();
                }
                Err(e) => {
                    if e == SynthesisError::Interrupted {
                        tracing::debug!("Utterance interrupted");
                    } else {
                        tracing::error!("Speech synthesis error: {}", e);
                    }
                    on_error(e);
                }
            }
        }))
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Silence output for every view and stop the current utterance
    pub fn mute_speech(&self) {
        self.muted.store(true, Ordering::SeqCst);
        self.stop_all_speech();
        tracing::info!("Speech muted");
    }

    pub fn unmute_speech(&self) {
        self.muted.store(false, Ordering::SeqCst);
        tracing::info!("Speech unmuted");
    }

    /// Flip the mute flag; returns the new state
    pub fn toggle_mute(&self) -> bool {
        if self.is_muted() {
            self.unmute_speech();
            false
        } else {
            self.mute_speech();
            true
        }
    }

    /// Stop the current utterance, if any
    pub fn stop_all_speech(&self) {
        if let Some(engine) = &self.synthesizer {
            engine.cancel();
        }
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Pause playing speech, or resume paused speech
    pub fn toggle_speech(&self) -> SpeechToggle {
        let Some(engine) = &self.synthesizer else {
            return SpeechToggle::Idle;
        };

        if self.paused.load(Ordering::SeqCst) {
            engine.resume();
            self.paused.store(false, Ordering::SeqCst);
            SpeechToggle::Resumed
        } else if engine.is_speaking() && engine.pause() {
            self.paused.store(true, Ordering::SeqCst);
            SpeechToggle::Paused
        } else {
            SpeechToggle::Idle
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.synthesizer
            .as_ref()
            .map(|e| e.is_speaking())
            .unwrap_or(false)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Recognition
    // ------------------------------------------------------------------

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    fn begin_listening(&self) -> Result<ListeningGuard, RecognitionError> {
        self.listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| RecognitionError::Busy)?;
        Ok(ListeningGuard {
            flag: Arc::clone(&self.listening),
        })
    }

    /// Listen for one phrase
    ///
    /// `Ok(None)` means the user said nothing, which is not an error.
    pub async fn recognize(&self) -> Result<Option<String>, RecognitionError> {
        let guard = self.begin_listening()?;
        let result = self.listen_once().await;
        drop(guard);
        result
    }

    /// Callback form of [`SpeechBridge::recognize`]
    ///
    /// `on_end` always runs last. A busy bridge reports `Busy` through
    /// `on_error` without starting a task.
    pub fn start_speech_recognition<R, E, D>(
        self: &Arc<Self>,
        on_result: R,
        on_error: E,
        on_end: D,
    ) -> Option<JoinHandle<()>>
    where
        R: FnOnce(String) + Send + 'static,
        E: FnOnce(RecognitionError) + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        let guard = match self.begin_listening() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!("{}", e);
                on_error(e);
                on_end();
                return None;
            }
        };

        let bridge = Arc::clone(self);
        Some(tokio::spawn(async move {
            let result = bridge.listen_once().await;
            drop(guard);
            match result {
                Ok(Some(transcript)) => on_result(transcript),
                Ok(None) => tracing::debug!("No speech detected"),
                Err(e) => on_error(e),
            }
            on_end();
        }))
    }

    async fn listen_once(&self) -> Result<Option<String>, RecognitionError> {
        if !self.enabled {
            return Err(RecognitionError::Disabled);
        }

        let Some(engine) = self.recognizer.clone() else {
            return Err(RecognitionError::Unsupported);
        };

        // The microphone check counts against the recognition timeout
        let session = async {
            match self.microphone.check().await {
                MicrophoneStatus::Denied => return Err(RecognitionError::NotAllowed),
                MicrophoneStatus::Missing => return Err(RecognitionError::NoMicrophone),
                MicrophoneStatus::Available | MicrophoneStatus::Unknown => {}
            }
            tracing::info!(engine = engine.name(), "Speech recognition started");
            engine.listen(&self.voice.language).await
        };

        match tokio::time::timeout(self.recognition_timeout, session).await {
            Ok(Ok(transcript)) => {
                tracing::info!("Speech recognition finished");
                Ok(transcript)
            }
            Ok(Err(e)) => {
                tracing::error!("Speech recognition error: {}", e);
                Err(e)
            }
            Err(_) => {
                engine.abort();
                tracing::warn!(
                    "Speech recognition timed out after {}s",
                    self.recognition_timeout.as_secs()
                );
                Err(RecognitionError::Timeout(self.recognition_timeout.as_secs()))
            }
        }
    }
}
