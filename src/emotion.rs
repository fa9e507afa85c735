use strum::Display;

/// Delivery style guessed from the wording of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Excited,
    Thoughtful,
}

const EXCITED_WORDS: &[&str] = &["excited", "great", "amazing"];
const THOUGHTFUL_WORDS: &[&str] = &["think", "perhaps", "maybe"];

impl Emotion {
    pub fn detect(text: &str) -> Self {
        let lowercase = text.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|word| lowercase.contains(word));

        if text.contains('!') || mentions(EXCITED_WORDS) {
            Emotion::Excited
        } else if text.contains('?') || mentions(THOUGHTFUL_WORDS) {
            Emotion::Thoughtful
        } else {
            Emotion::Neutral
        }
    }

    /// Speaking rate passed to the synthesizer.
    pub fn speed(self) -> f32 {
        match self {
            Emotion::Neutral => 1.0,
            Emotion::Excited => 1.1,
            Emotion::Thoughtful => 0.95,
        }
    }
}
