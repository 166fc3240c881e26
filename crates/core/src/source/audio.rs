use std::sync::Arc;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("audio device unavailable: {0}")]
    Unavailable(String),
}

/// Frequency-domain view over a live audio stream.
pub trait FrequencyAnalyser: Send {
    fn frequency_bin_count(&self) -> usize;

    /// Fills `out` with the current magnitude spectrum, one byte per bin.
    fn byte_frequency_data(&mut self, out: &mut [u8]);
}

/// A live audio stream handle.
pub trait AudioStream: Send + Sync {
    /// Attaches a new analyser node. Fails when the stream cannot be acquired.
    fn create_analyser(&self) -> Result<Box<dyn FrequencyAnalyser>, AudioError>;
}

/// Replays prepared spectra, one per read, cycling at the end.
#[derive(Clone, Debug)]
pub struct ScriptedAudioStream {
    spectra: Arc<Vec<Vec<u8>>>,
    bins: usize,
    denied: Option<AudioError>,
}

impl ScriptedAudioStream {
    pub fn new(spectra: Vec<Vec<u8>>) -> Self {
        let bins = spectra.iter().map(Vec::len).max().unwrap_or(0).max(1);
        Self {
            spectra: Arc::new(spectra),
            bins,
            denied: None,
        }
    }

    /// A stream whose acquisition always fails with `err`.
    pub fn failing(err: AudioError) -> Self {
        Self {
            spectra: Arc::new(Vec::new()),
            bins: 1,
            denied: Some(err),
        }
    }
}

impl AudioStream for ScriptedAudioStream {
    fn create_analyser(&self) -> Result<Box<dyn FrequencyAnalyser>, AudioError> {
        if let Some(err) = &self.denied {
            return Err(err.clone());
        }
        Ok(Box::new(ScriptedAnalyser {
            spectra: self.spectra.clone(),
            bins: self.bins,
            cursor: 0,
        }))
    }
}

struct ScriptedAnalyser {
    spectra: Arc<Vec<Vec<u8>>>,
    bins: usize,
    cursor: usize,
}

impl FrequencyAnalyser for ScriptedAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.bins
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        out.fill(0);
        if self.spectra.is_empty() {
            return;
        }
        let spectrum = &self.spectra[self.cursor % self.spectra.len()];
        self.cursor = self.cursor.wrapping_add(1);
        let n = spectrum.len().min(out.len());
        out[..n].copy_from_slice(&spectrum[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyser_pads_short_spectra_with_silence() {
        let stream = ScriptedAudioStream::new(vec![vec![255, 255, 255, 255], vec![9]]);
        let mut analyser = stream.create_analyser().expect("acquired");
        let mut buf = vec![7u8; analyser.frequency_bin_count()];

        analyser.byte_frequency_data(&mut buf);
        assert_eq!(buf, vec![255; 4]);
        analyser.byte_frequency_data(&mut buf);
        assert_eq!(buf, vec![9, 0, 0, 0]);
    }

    #[test]
    fn failing_stream_reports_acquisition_error() {
        let stream = ScriptedAudioStream::failing(AudioError::PermissionDenied("user".into()));
        assert!(matches!(
            stream.create_analyser(),
            Err(AudioError::PermissionDenied(_))
        ));
    }
}
