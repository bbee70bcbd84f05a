//! Text-to-speech engines
//!
//! [`CommandSynthesizer`] drives a platform speech program (`say`,
//! `espeak-ng`, `espeak`, `spd-say`). [`resolve_synthesizer`] picks the first
//! candidate installed on `PATH`.

use super::error::SynthesisError;
use super::process::{ProcessOutcome, ProcessSlot};
use super::{find_on_path, VoiceSettings};

use async_trait::async_trait;
use tokio::process::Command;

/// Something that can read text aloud, one utterance at a time
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Speak `text`, resolving when the utterance ends
    ///
    /// An utterance stopped through [`SynthesisEngine::cancel`] resolves with
    /// [`SynthesisError::Interrupted`].
    async fn speak(&self, text: &str, voice: &VoiceSettings) -> Result<(), SynthesisError>;

    /// Stop the current utterance, if any
    fn cancel(&self);

    /// Suspend the current utterance; false when nothing is playing
    fn pause(&self) -> bool;

    /// Continue a suspended utterance
    fn resume(&self) -> bool;

    fn is_speaking(&self) -> bool;
}

/// Speech through an external program
#[derive(Debug)]
pub struct CommandSynthesizer {
    program: String,
    slot: ProcessSlot,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            slot: ProcessSlot::new(),
        }
    }

    /// Command-line arguments for `text` in the dialect of the program
    pub fn arguments(&self, text: &str, voice: &VoiceSettings) -> Vec<String> {
        let words_per_minute = (175.0 * voice.rate).round() as i64;
        let base = std::path::Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.clone());

        match base.as_str() {
            "say" => vec![
                "-r".to_string(),
                words_per_minute.to_string(),
                text.to_string(),
            ],
            "espeak" | "espeak-ng" => vec![
                "-v".to_string(),
                espeak_voice(&voice.language),
                "-s".to_string(),
                words_per_minute.to_string(),
                "-p".to_string(),
                ((50.0 * voice.pitch).round() as i64).clamp(0, 99).to_string(),
                text.to_string(),
            ],
            "spd-say" => vec![
                "-w".to_string(),
                "-l".to_string(),
                voice.language.clone(),
                "-r".to_string(),
                (((voice.rate - 1.0) * 100.0).round() as i64)
                    .clamp(-100, 100)
                    .to_string(),
                "-p".to_string(),
                (((voice.pitch - 1.0) * 100.0).round() as i64)
                    .clamp(-100, 100)
                    .to_string(),
                text.to_string(),
            ],
            _ => vec![text.to_string()],
        }
    }
}

/// `zh-CN` -> `cmn`, `en-US` -> `en-us`
fn espeak_voice(language: &str) -> String {
    let lower = language.to_lowercase();
    if lower.starts_with("zh") {
        "cmn".to_string()
    } else {
        lower
    }
}

#[async_trait]
impl SynthesisEngine for CommandSynthesizer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn speak(&self, text: &str, voice: &VoiceSettings) -> Result<(), SynthesisError> {
        let mut command = Command::new(&self.program);
        command.args(self.arguments(text, voice));

        tracing::debug!(program = %self.program, "Speaking {} chars", text.chars().count());

        match self.slot.run(command).await {
            Ok(ProcessOutcome::Finished { status, .. }) if status.success() => Ok(()),
            Ok(ProcessOutcome::Finished { status, stderr, .. }) => Err(SynthesisError::Failed(
                format!("{} exited with {}: {}", self.program, status, stderr.trim()),
            )),
            Ok(ProcessOutcome::Cancelled) => Err(SynthesisError::Interrupted),
            Err(e) => Err(SynthesisError::Failed(format!(
                "failed to run {}: {}",
                self.program, e
            ))),
        }
    }

    fn cancel(&self) {
        self.slot.cancel();
    }

    fn pause(&self) -> bool {
        self.slot.pause()
    }

    fn resume(&self) -> bool {
        self.slot.resume()
    }

    fn is_speaking(&self) -> bool {
        self.slot.is_running()
    }
}

/// First candidate program found on `PATH`
pub fn resolve_synthesizer(candidates: &[String]) -> Option<CommandSynthesizer> {
    let found = candidates.iter().find(|c| find_on_path(c).is_some())?;
    tracing::info!("Using speech synthesizer: {}", found);
    Some(CommandSynthesizer::new(found.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(language: &str, rate: f32, pitch: f32) -> VoiceSettings {
        VoiceSettings {
            language: language.to_string(),
            rate,
            pitch,
        }
    }

    #[test]
    fn test_espeak_arguments() {
        let synth = CommandSynthesizer::new("espeak-ng");
        let args = synth.arguments("你好", &voice("zh-CN", 1.0, 1.0));
        assert_eq!(args, vec!["-v", "cmn", "-s", "175", "-p", "50", "你好"]);
    }

    #[test]
    fn test_say_arguments_scale_rate() {
        let synth = CommandSynthesizer::new("/usr/bin/say");
        let args = synth.arguments("hi", &voice("en-US", 2.0, 1.0));
        assert_eq!(args, vec!["-r", "350", "hi"]);
    }

    #[test]
    fn test_spd_say_arguments() {
        let synth = CommandSynthesizer::new("spd-say");
        let args = synth.arguments("hi", &voice("en-US", 1.5, 0.5));
        assert_eq!(args, vec!["-w", "-l", "en-US", "-r", "50", "-p", "-50", "hi"]);
    }

    #[test]
    fn test_unknown_program_gets_text_only() {
        let synth = CommandSynthesizer::new("my-tts");
        assert_eq!(synth.arguments("x", &voice("en", 1.0, 1.0)), vec!["x"]);
    }

    #[test]
    fn test_resolve_synthesizer_none_found() {
        let candidates = vec!["definitely-not-a-real-tts-binary".to_string()];
        assert!(resolve_synthesizer(&candidates).is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_program_reports_error() {
        let synth = CommandSynthesizer::new("false");
        let result = synth.speak("x", &voice("en", 1.0, 1.0)).await;
        assert!(matches!(result, Err(SynthesisError::Failed(_))));
        assert!(!synth.is_speaking());
    }
}
