//! Speech-to-text engines
//!
//! A recognizer command listens once and prints the transcript on stdout.
//! Entries in `speech.recognizers` are full command lines; `{lang}` in an
//! argument is replaced by the configured language, which is also exported
//! as `ROLEPLAY_SPEECH_LANG`.

use super::error::RecognitionError;
use super::find_on_path;
use super::process::{ProcessOutcome, ProcessSlot};

use async_trait::async_trait;
use tokio::process::Command;

/// Something that can listen for one spoken phrase
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Listen once; `Ok(None)` means nothing was said
    async fn listen(&self, language: &str) -> Result<Option<String>, RecognitionError>;

    /// Stop listening; a pending `listen` resolves with `Aborted`
    fn abort(&self);
}

/// Recognition through an external program
#[derive(Debug)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    slot: ProcessSlot,
}

impl CommandRecognizer {
    /// Build from a command line such as `whisper-listen --lang {lang}`
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            slot: ProcessSlot::new(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn arguments(&self, language: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace("{lang}", language))
            .collect()
    }
}

/// Map a recognizer's stderr to an error kind
///
/// A "no speech" report is not an error and maps to `None`.
pub fn classify_failure(stderr: &str) -> Option<RecognitionError> {
    let lower = stderr.to_lowercase();
    if lower.contains("no speech") || lower.contains("no-speech") {
        None
    } else if lower.contains("not-allowed")
        || lower.contains("not allowed")
        || lower.contains("permission")
    {
        Some(RecognitionError::NotAllowed)
    } else if lower.contains("audio-capture")
        || lower.contains("no microphone")
        || lower.contains("no capture device")
        || lower.contains("no such device")
    {
        Some(RecognitionError::NoMicrophone)
    } else if lower.contains("network") || lower.contains("connection") {
        Some(RecognitionError::Network)
    } else if lower.contains("language") {
        Some(RecognitionError::LanguageNotSupported)
    } else if lower.contains("abort") {
        Some(RecognitionError::Aborted)
    } else {
        let trimmed = stderr.trim();
        Some(RecognitionError::Other(if trimmed.is_empty() {
            "recognizer exited with an error".to_string()
        } else {
            trimmed.to_string()
        }))
    }
}

#[async_trait]
impl RecognitionEngine for CommandRecognizer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn listen(&self, language: &str) -> Result<Option<String>, RecognitionError> {
        let mut command = Command::new(&self.program);
        command
            .args(self.arguments(language))
            .env("ROLEPLAY_SPEECH_LANG", language);

        tracing::debug!(program = %self.program, language, "Listening for speech");

        match self.slot.run(command).await {
            Ok(ProcessOutcome::Finished {
                status, stdout, ..
            }) if status.success() => {
                let transcript = stdout.trim();
                if transcript.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(transcript.to_string()))
                }
            }
            Ok(ProcessOutcome::Finished { stderr, .. }) => match classify_failure(&stderr) {
                Some(err) => Err(err),
                None => Ok(None),
            },
            Ok(ProcessOutcome::Cancelled) => Err(RecognitionError::Aborted),
            Err(e) => Err(RecognitionError::Other(format!(
                "failed to run {}: {}",
                self.program, e
            ))),
        }
    }

    fn abort(&self) {
        self.slot.cancel();
    }
}

/// First configured recognizer whose program is on `PATH`
pub fn resolve_recognizer(candidates: &[String]) -> Option<CommandRecognizer> {
    candidates
        .iter()
        .filter_map(|c| CommandRecognizer::from_command_line(c))
        .find(|r| find_on_path(r.program()).is_some())
        .map(|r| {
            tracing::info!("Using speech recognizer: {}", r.program());
            r
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line_splits_args() {
        let recognizer = CommandRecognizer::from_command_line("stt --lang {lang} --once").unwrap();
        assert_eq!(recognizer.program(), "stt");
        assert_eq!(
            recognizer.arguments("zh-CN"),
            vec!["--lang", "zh-CN", "--once"]
        );
        assert!(CommandRecognizer::from_command_line("   ").is_none());
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(classify_failure("error: no-speech"), None);
        assert_eq!(
            classify_failure("Permission denied opening device"),
            Some(RecognitionError::NotAllowed)
        );
        assert_eq!(
            classify_failure("audio-capture failed"),
            Some(RecognitionError::NoMicrophone)
        );
        assert_eq!(
            classify_failure("network unreachable"),
            Some(RecognitionError::Network)
        );
        assert_eq!(
            classify_failure("language-not-supported"),
            Some(RecognitionError::LanguageNotSupported)
        );
        assert_eq!(classify_failure("aborted"), Some(RecognitionError::Aborted));
        assert_eq!(
            classify_failure(""),
            Some(RecognitionError::Other(
                "recognizer exited with an error".to_string()
            ))
        );
    }

    #[test]
    fn test_resolve_recognizer_skips_missing_programs() {
        let candidates = vec!["definitely-not-a-real-stt --x".to_string()];
        assert!(resolve_recognizer(&candidates).is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_listen_reads_transcript() {
        let recognizer = CommandRecognizer {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "printf 'hello {lang}'".to_string()],
            slot: ProcessSlot::new(),
        };
        let transcript = recognizer.listen("en-US").await.unwrap();
        assert_eq!(transcript.as_deref(), Some("hello en-US"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_listen_empty_output_is_no_speech() {
        let recognizer = CommandRecognizer::from_command_line("true").unwrap();
        assert_eq!(recognizer.listen("en-US").await.unwrap(), None);
    }
}
