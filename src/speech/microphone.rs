//! Microphone availability checks
//!
//! Probes are consulted in order; the first one that reaches a verdict wins.
//! The device-node probe inspects ALSA capture nodes directly, the legacy
//! probe falls back to parsing `arecord -l`.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Outcome of a microphone check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrophoneStatus {
    /// A capture device exists and can be opened
    Available,
    /// A capture device exists but the current user may not open it
    Denied,
    /// No capture device exists
    Missing,
    /// The probe cannot tell on this system
    Unknown,
}

/// A way of finding out whether a microphone can be used
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MicrophoneProbe: Send + Sync {
    async fn check(&self) -> MicrophoneStatus;
}

/// Looks for `pcmC*D*c` capture nodes under `/dev/snd`
#[derive(Debug, Clone)]
pub struct DeviceNodeProbe {
    root: PathBuf,
}

impl DeviceNodeProbe {
    pub fn new() -> Self {
        Self::with_root("/dev/snd")
    }

    /// Probe a different device directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for DeviceNodeProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceNodeProbe {
    fn scan(&self) -> MicrophoneStatus {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return MicrophoneStatus::Denied
            }
            Err(_) => return MicrophoneStatus::Unknown,
        };

        let captures: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name();
                let name = name.to_string_lossy();
                name.starts_with("pcm") && name.ends_with('c')
            })
            .map(|e| e.path())
            .collect();

        if captures.is_empty() {
            return MicrophoneStatus::Missing;
        }

        let mut denied = false;
        for path in &captures {
            match std::fs::OpenOptions::new().read(true).open(path) {
                Ok(_) => return MicrophoneStatus::Available,
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => denied = true,
                // Busy or otherwise unopenable devices still exist
                Err(_) => return MicrophoneStatus::Available,
            }
        }

        if denied {
            MicrophoneStatus::Denied
        } else {
            MicrophoneStatus::Unknown
        }
    }
}

#[async_trait]
impl MicrophoneProbe for DeviceNodeProbe {
    async fn check(&self) -> MicrophoneStatus {
        let probe = self.clone();
        tokio::task::spawn_blocking(move || probe.scan())
            .await
            .unwrap_or(MicrophoneStatus::Unknown)
    }
}

/// Parses the output of `arecord -l`
#[derive(Debug, Clone, Default)]
pub struct ArecordProbe;

impl ArecordProbe {
    fn classify(stdout: &str, stderr: &str) -> MicrophoneStatus {
        let stderr = stderr.to_lowercase();
        if stdout.lines().any(|l| l.starts_with("card ")) {
            MicrophoneStatus::Available
        } else if stderr.contains("no soundcards") {
            MicrophoneStatus::Missing
        } else if stderr.contains("permission denied") {
            MicrophoneStatus::Denied
        } else {
            MicrophoneStatus::Unknown
        }
    }
}

#[async_trait]
impl MicrophoneProbe for ArecordProbe {
    async fn check(&self) -> MicrophoneStatus {
        let output = Command::new("arecord")
            .arg("-l")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;
        match output {
            Ok(output) => Self::classify(
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            ),
            Err(_) => MicrophoneStatus::Unknown,
        }
    }
}

/// Ordered list of probes
pub struct ProbeChain {
    probes: Vec<Box<dyn MicrophoneProbe>>,
}

impl ProbeChain {
    pub fn new(probes: Vec<Box<dyn MicrophoneProbe>>) -> Self {
        Self { probes }
    }

    /// Device nodes first, then the legacy `arecord` listing
    pub fn system_default() -> Self {
        Self::new(vec![
            Box::new(DeviceNodeProbe::new()),
            Box::new(ArecordProbe),
        ])
    }
}

#[async_trait]
impl MicrophoneProbe for ProbeChain {
    async fn check(&self) -> MicrophoneStatus {
        for probe in &self.probes {
            let status = probe.check().await;
            if status != MicrophoneStatus::Unknown {
                return status;
            }
        }
        MicrophoneStatus::Unknown
    }
}
