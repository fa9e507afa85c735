use anyhow::{Context, Result};
use std::path::Path;

/// Mono 16-bit PCM held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    sample_rate: u32,
    samples: Vec<i16>,
}

impl AudioClip {
    pub fn empty(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn silence(sample_rate: u32, duration_ms: u64) -> Self {
        let mut clip = Self::empty(sample_rate);
        clip.append_silence(duration_ms);
        clip
    }

    pub fn from_samples(sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Interprets raw little-endian signed 16-bit mono PCM.
    pub fn from_pcm_le(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Self::from_samples(sample_rate, samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[cfg(test)]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)
    }

    fn samples_for(&self, duration_ms: u64) -> usize {
        (u64::from(self.sample_rate) * duration_ms / 1000) as usize
    }

    /// Appends `other`, resampling it to this clip's rate if they differ.
    /// An empty clip takes over the rate of whatever is appended first.
    pub fn append(&mut self, other: &AudioClip) {
        if self.samples.is_empty() {
            self.sample_rate = other.sample_rate;
        }

        if other.sample_rate == self.sample_rate {
            self.samples.extend_from_slice(&other.samples);
        } else {
            self.samples
                .extend(resample(&other.samples, other.sample_rate, self.sample_rate));
        }
    }

    pub fn append_silence(&mut self, duration_ms: u64) {
        let count = self.samples_for(duration_ms);
        self.samples.resize(self.samples.len() + count, 0);
    }

    /// Splices silence in at `offset_ms`, clamped to the end of the clip.
    pub fn insert_silence_at(&mut self, offset_ms: u64, duration_ms: u64) {
        let at = self.samples_for(offset_ms).min(self.samples.len());
        let count = self.samples_for(duration_ms);
        self.samples
            .splice(at..at, std::iter::repeat_n(0, count));
    }

    pub fn read_wav(path: &Path) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
        let spec = reader.spec();

        let interleaved: Vec<i16> = match spec.sample_format {
            hound::SampleFormat::Int if spec.bits_per_sample <= 16 => reader
                .samples::<i16>()
                .map(|sample| sample.map(|value| value << (16 - spec.bits_per_sample)))
                .collect::<Result<_, _>>(),
            hound::SampleFormat::Int => {
                let shift = spec.bits_per_sample - 16;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| (value >> shift) as i16))
                    .collect::<Result<_, _>>()
            }
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|sample| {
                    sample.map(|value| (value.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
                })
                .collect::<Result<_, _>>(),
        }
        .with_context(|| format!("Failed to decode WAV samples from {}", path.display()))?;

        let channels = usize::from(spec.channels.max(1));
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| {
                    (frame.iter().map(|&value| i32::from(value)).sum::<i32>()
                        / frame.len() as i32) as i16
                })
                .collect()
        };

        Ok(Self::from_samples(spec.sample_rate, samples))
    }

    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file {}", path.display()))?;
        for &sample in &self.samples {
            writer
                .write_sample(sample)
                .context("Failed to write WAV sample")?;
        }
        writer.finalize().context("Failed to finalize WAV file")?;

        Ok(())
    }
}

/// Linear interpolation between neighbouring samples.
fn resample(samples: &[i16], from: u32, to: u32) -> Vec<i16> {
    if samples.is_empty() || from == 0 || to == 0 {
        return Vec::new();
    }

    let ratio = f64::from(from) / f64::from(to);
    let target_len = (samples.len() as f64 / ratio) as usize;

    (0..target_len)
        .map(|index| {
            let position = index as f64 * ratio;
            let base = position as usize;
            let fraction = position - base as f64;
            match (samples.get(base), samples.get(base + 1)) {
                (Some(&a), Some(&b)) => {
                    (f64::from(a) * (1.0 - fraction) + f64::from(b) * fraction) as i16
                }
                (Some(&a), None) => a,
                _ => 0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_requested_duration() {
        let clip = AudioClip::silence(16_000, 500);

        assert_eq!(clip.samples().len(), 8_000);
        assert_eq!(clip.duration_ms(), 500);
        assert!(clip.samples().iter().all(|&sample| sample == 0));
    }

    #[test]
    fn decodes_little_endian_pcm() {
        let clip = AudioClip::from_pcm_le(&[0x01, 0x00, 0xff, 0xff, 0x00], 8_000);

        assert_eq!(clip.samples(), &[1, -1]);
    }

    #[test]
    fn empty_clip_adopts_rate_of_first_append() {
        let mut buffer = AudioClip::empty(8_000);
        buffer.append(&AudioClip::from_samples(22_050, vec![1, 2, 3]));

        assert_eq!(buffer.sample_rate(), 22_050);
        assert_eq!(buffer.samples(), &[1, 2, 3]);
    }

    #[test]
    fn append_resamples_mismatched_rates() {
        let mut buffer = AudioClip::from_samples(8_000, vec![0; 8_000]);
        buffer.append(&AudioClip::from_samples(16_000, vec![100; 16_000]));

        assert_eq!(buffer.duration_ms(), 2_000);
        assert!(buffer.samples()[8_000..].iter().all(|&sample| sample == 100));
    }

    #[test]
    fn inserts_silence_inside_clip() {
        let mut clip = AudioClip::from_samples(1_000, vec![7; 10]);
        clip.insert_silence_at(4, 3);

        assert_eq!(clip.samples(), &[7, 7, 7, 7, 0, 0, 0, 7, 7, 7, 7, 7, 7]);
    }

    #[test]
    fn insertion_offset_is_clamped() {
        let mut clip = AudioClip::from_samples(1_000, vec![7; 2]);
        clip.insert_silence_at(50, 1);

        assert_eq!(clip.samples(), &[7, 7, 0]);
    }

    #[test]
    fn wav_files_round_trip() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("clip.wav");
        let clip = AudioClip::from_samples(24_000, vec![0, 1_000, -1_000, i16::MAX]);

        clip.write_wav(&path).unwrap();

        assert_eq!(AudioClip::read_wav(&path).unwrap(), clip);
    }

    #[test]
    fn stereo_wav_is_downmixed() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for sample in [100i16, 300, -200, -400] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let clip = AudioClip::read_wav(&path).unwrap();

        assert_eq!(clip.samples(), &[200, -300]);
        assert_eq!(clip.sample_rate(), 8_000);
    }
}
