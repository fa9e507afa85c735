use crate::audio::AudioClip;
use crate::chunker::Boundary;

const SENTENCE_MARKS: &[char] = &['.', '!', '?'];
const CLAUSE_MARKS: &[char] = &[',', ';', ':'];

#[derive(Debug, Clone, Copy)]
pub struct Pauses {
    pub sentence_ms: u64,
    pub clause_ms: u64,
}

impl Pauses {
    /// Silence to put between two chunks of the same turn.
    pub fn after(&self, boundary: Boundary) -> u64 {
        match boundary {
            Boundary::Sentence => self.sentence_ms,
            Boundary::Clause => self.clause_ms,
            Boundary::Hard => 0,
        }
    }

    /// Inserts pauses after interior punctuation of `text` into `clip`,
    /// which is the synthesized audio of exactly that text. Character `i`
    /// of `n` is taken to end at `(i + 1) / n` of the clip.
    pub fn insert(&self, text: &str, clip: &mut AudioClip) {
        let chars: Vec<char> = text.chars().collect();
        let duration = clip.duration_ms();
        if chars.is_empty() || duration == 0 {
            return;
        }

        let is_mark = |c: char| SENTENCE_MARKS.contains(&c) || CLAUSE_MARKS.contains(&c);
        let Some(last_spoken) = chars
            .iter()
            .rposition(|&c| !c.is_whitespace() && !is_mark(c))
        else {
            return;
        };

        let total = chars.len() as u64;
        let insertions: Vec<(u64, u64)> = chars[..last_spoken]
            .iter()
            .enumerate()
            .filter(|&(index, _)| chars[index + 1].is_whitespace())
            .filter_map(|(index, &c)| {
                let pause = if SENTENCE_MARKS.contains(&c) {
                    self.sentence_ms
                } else if CLAUSE_MARKS.contains(&c) {
                    self.clause_ms
                } else {
                    return None;
                };
                Some(((index as u64 + 1) * duration / total, pause))
            })
            .collect();

        // Back to front so the offsets computed on the original timeline hold.
        for &(offset, pause) in insertions.iter().rev() {
            clip.insert_silence_at(offset, pause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAUSES: Pauses = Pauses {
        sentence_ms: 300,
        clause_ms: 150,
    };

    /// 10 ms of non-silent audio per character at 1 kHz.
    fn spoken(text: &str) -> AudioClip {
        AudioClip::from_samples(1_000, vec![1; text.chars().count() * 10])
    }

    fn runs(clip: &AudioClip) -> Vec<(i16, usize)> {
        let mut runs: Vec<(i16, usize)> = Vec::new();
        for &sample in clip.samples() {
            match runs.last_mut() {
                Some((value, count)) if *value == sample => *count += 1,
                _ => runs.push((sample, 1)),
            }
        }
        runs
    }

    #[test]
    fn pauses_follow_interior_punctuation() {
        let text = "Hi, there. Bye.";
        let mut clip = spoken(text);

        PAUSES.insert(text, &mut clip);

        assert_eq!(runs(&clip), vec![(1, 30), (0, 150), (1, 70), (0, 300), (1, 50)]);
    }

    #[test]
    fn trailing_punctuation_adds_nothing() {
        let text = "Really?!  ";
        let mut clip = spoken(text);

        PAUSES.insert(text, &mut clip);

        assert_eq!(clip, spoken(text));
    }

    #[test]
    fn punctuation_runs_pause_once_and_decimals_not_at_all() {
        let text = "Wait... pi is 3.14 ok";
        let mut clip = spoken(text);

        PAUSES.insert(text, &mut clip);

        assert_eq!(runs(&clip), vec![(1, 70), (0, 300), (1, 140)]);
    }

    #[test]
    fn chunk_gaps_follow_boundaries() {
        assert_eq!(PAUSES.after(Boundary::Sentence), 300);
        assert_eq!(PAUSES.after(Boundary::Clause), 150);
        assert_eq!(PAUSES.after(Boundary::Hard), 0);
    }
}
