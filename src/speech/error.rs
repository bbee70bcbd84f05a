//! Error types for voice input and output

use thiserror::Error;

/// Why a speech-recognition attempt produced no transcript
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("Microphone access was denied.")]
    NotAllowed,

    #[error("No microphone was found.")]
    NoMicrophone,

    #[error("Speech recognition failed because of a network problem.")]
    Network,

    #[error("The selected language is not supported for speech recognition.")]
    LanguageNotSupported,

    #[error("Speech recognition was aborted.")]
    Aborted,

    #[error("No speech was recognized within {0} seconds.")]
    Timeout(u64),

    #[error("Speech recognition is not available on this system.")]
    Unsupported,

    #[error("Voice input is disabled.")]
    Disabled,

    #[error("Speech recognition is already running.")]
    Busy,

    #[error("Speech recognition failed: {0}")]
    Other(String),
}

impl RecognitionError {
    /// Message plus a remediation hint for the current platform
    pub fn user_message(&self) -> String {
        match self.remediation_hint() {
            Some(hint) => format!("{} {}", self, hint),
            None => self.to_string(),
        }
    }

    /// Platform-specific advice, if there is any to give
    pub fn remediation_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotAllowed => Some(permission_hint()),
            Self::NoMicrophone => {
                Some("Connect a microphone and make sure it is the default input device.")
            }
            Self::Network => Some("Check your network connection and try again."),
            Self::LanguageNotSupported => {
                Some("Set speech.language to a language your recognizer supports.")
            }
            Self::Timeout(_) => Some("Start speaking right after voice input begins."),
            Self::Unsupported => {
                Some("Add a recognizer command under speech.recognizers in the config file.")
            }
            Self::Aborted | Self::Disabled | Self::Busy | Self::Other(_) => None,
        }
    }
}

#[cfg(target_os = "macos")]
fn permission_hint() -> &'static str {
    "Allow your terminal to use the microphone in System Settings > Privacy & Security > Microphone."
}

#[cfg(target_os = "windows")]
fn permission_hint() -> &'static str {
    "Enable microphone access for desktop apps in Settings > Privacy & security > Microphone."
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn permission_hint() -> &'static str {
    "Make sure your user is in the 'audio' group or that PipeWire/PulseAudio allows capture."
}

/// Why an utterance did not finish normally
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Speech synthesis is not available on this system")]
    Unsupported,

    #[error("Speech was interrupted")]
    Interrupted,

    #[error("Speech synthesis failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_appends_hint() {
        let msg = RecognitionError::NoMicrophone.user_message();
        assert!(msg.starts_with("No microphone was found."));
        assert!(msg.contains("default input device"));
    }

    #[test]
    fn test_user_message_without_hint() {
        assert_eq!(
            RecognitionError::Busy.user_message(),
            "Speech recognition is already running."
        );
        assert!(RecognitionError::Aborted.remediation_hint().is_none());
    }

    #[test]
    fn test_permission_hint_present() {
        assert!(RecognitionError::NotAllowed.remediation_hint().is_some());
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(
            RecognitionError::Timeout(10).to_string(),
            "No speech was recognized within 10 seconds."
        );
    }
}
