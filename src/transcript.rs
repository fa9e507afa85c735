use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Speaker {
    Host,
    Expert,
}

impl Speaker {
    fn from_label(label: &str) -> Self {
        match label {
            "Host" => Speaker::Host,
            _ => Speaker::Expert,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

// `T.E` is the label older prompts used for the expert.
static SPEAKER_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(Host|Expert|T\.E):").expect("valid speaker regex"));

/// Splits a speaker-tagged transcript into turns.
///
/// A turn runs from its label to the next label. Text before the first
/// label and turns left empty after trimming are dropped.
pub fn split_turns(text: &str) -> Vec<Turn> {
    let labels: Vec<_> = SPEAKER_LABEL.captures_iter(text).collect();

    labels
        .iter()
        .enumerate()
        .filter_map(|(index, captures)| {
            let label = captures.get(1)?;
            let start = captures.get(0)?.end();
            let end = labels
                .get(index + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |next| next.start());

            let words = text[start..end].trim_matches(|c: char| c.is_whitespace() || c == '*');
            (!words.is_empty()).then(|| Turn {
                speaker: Speaker::from_label(label.as_str()),
                text: words.to_owned(),
            })
        })
        .collect()
}

/// Joins generated dialogue pieces the way they are persisted: each one
/// followed by a blank line.
pub fn assemble<S: AsRef<str>>(conversations: &[S]) -> String {
    conversations
        .iter()
        .flat_map(|conversation| [conversation.as_ref(), "\n\n"])
        .collect()
}

pub async fn save<S: AsRef<str>>(conversations: &[S], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create transcript directory")?;
    }

    tokio::fs::write(path, assemble(conversations))
        .await
        .with_context(|| format!("Error saving conversations to {}", path.display()))
}

pub async fn load(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read transcript {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(speaker: Speaker, text: &str) -> Turn {
        Turn {
            speaker,
            text: text.to_owned(),
        }
    }

    #[test]
    fn splits_alternating_speakers() {
        let turns = split_turns(
            "Host: Welcome to the show!\nExpert: Thanks for having me.\n\nHost: Let's begin?",
        );

        assert_eq!(
            turns,
            vec![
                turn(Speaker::Host, "Welcome to the show!"),
                turn(Speaker::Expert, "Thanks for having me."),
                turn(Speaker::Host, "Let's begin?"),
            ]
        );
    }

    #[test]
    fn turn_spans_multiple_lines() {
        let turns = split_turns("Expert: First line.\nSecond line.\nHost: Ok.");

        assert_eq!(turns[0], turn(Speaker::Expert, "First line.\nSecond line."));
        assert_eq!(turns.len(), 2);
    }

    #[test]
    fn drops_preamble_and_empty_turns() {
        let turns = split_turns("Here is your podcast:\n\nHost:   \nExpert: Hi.");

        assert_eq!(turns, vec![turn(Speaker::Expert, "Hi.")]);
    }

    #[test]
    fn accepts_legacy_expert_label_and_markdown() {
        let turns = split_turns("**Host:** Rachel here.\n**T.E:** Kevin here.");

        assert_eq!(
            turns,
            vec![
                turn(Speaker::Host, "Rachel here."),
                turn(Speaker::Expert, "Kevin here."),
            ]
        );
    }

    #[test]
    fn label_must_start_a_word() {
        let turns = split_turns("Host: The ghost said Ghost: boo.");

        assert_eq!(turns, vec![turn(Speaker::Host, "The ghost said Ghost: boo.")]);
    }

    #[test]
    fn malformed_output_yields_no_turns() {
        assert!(split_turns("Just some prose without labels.").is_empty());
    }

    #[test]
    fn speaker_roles_round_trip_through_strings() {
        assert_eq!(Speaker::Host.to_string(), "host");
        assert_eq!("expert".parse::<Speaker>().unwrap(), Speaker::Expert);
    }

    #[tokio::test]
    async fn saved_transcript_separates_pieces_with_blank_lines() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("nested").join("output.txt");

        save(&["Host: A.", "Expert: B."], &path).await.unwrap();

        assert_eq!(load(&path).await.unwrap(), "Host: A.\n\nExpert: B.\n\n");
    }
}
