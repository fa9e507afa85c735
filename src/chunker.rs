use itertools::Itertools;

const SENTENCE_MARKS: &[char] = &['.', '!', '?'];
const CLAUSE_MARKS: &[char] = &[',', ';', ':'];

/// Where a chunk ends, which decides the pause that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Sentence,
    Clause,
    Hard,
}

impl Boundary {
    fn of(text: &str) -> Self {
        match text.chars().last() {
            Some(c) if SENTENCE_MARKS.contains(&c) => Boundary::Sentence,
            Some(c) if CLAUSE_MARKS.contains(&c) => Boundary::Clause,
            _ => Boundary::Hard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub boundary: Boundary,
}

impl TextChunk {
    fn new(text: String) -> Self {
        let boundary = Boundary::of(&text);
        Self { text, boundary }
    }
}

/// Cuts `text` into chunks of at most `max_chars` characters, preferring
/// sentence ends, then clause marks, then spaces.
pub fn split(text: &str, max_chars: usize) -> Vec<TextChunk> {
    let max_chars = max_chars.max(1);
    let normalized = text.split_whitespace().join(" ");

    let mut units = Vec::new();
    for sentence in split_after(&normalized, SENTENCE_MARKS) {
        if char_len(sentence) <= max_chars {
            units.push(sentence.to_owned());
            continue;
        }
        for clause in split_after(sentence, CLAUSE_MARKS) {
            if char_len(clause) <= max_chars {
                units.push(clause.to_owned());
            } else {
                units.extend(pack_words(clause, max_chars));
            }
        }
    }

    pack(units, max_chars).into_iter().map(TextChunk::new).collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits after every run of `marks` that is followed by whitespace or the
/// end of the text, so decimals like "3.5" stay whole.
fn split_after<'a>(text: &'a str, marks: &[char]) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if !marks.contains(&c) {
            continue;
        }
        let next = chars.peek().map(|&(_, next)| next);
        if next.is_none_or(char::is_whitespace) {
            let end = index + c.len_utf8();
            pieces.push(text[start..end].trim());
            start = end;
        }
    }
    pieces.push(text[start..].trim());

    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn pack_words(text: &str, max_chars: usize) -> Vec<String> {
    let words = text.split_whitespace().flat_map(|word| {
        let chars: Vec<char> = word.chars().collect();
        chars
            .chunks(max_chars)
            .map(|piece| piece.iter().collect::<String>())
            .collect::<Vec<_>>()
    });

    pack(words, max_chars)
}

/// Greedily joins pieces with single spaces while they fit.
fn pack(pieces: impl IntoIterator<Item = String>, max_chars: usize) -> Vec<String> {
    let mut packed = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        if current.is_empty() {
            current = piece;
        } else if char_len(&current) + 1 + char_len(&piece) <= max_chars {
            current.push(' ');
            current.push_str(&piece);
        } else {
            packed.push(std::mem::replace(&mut current, piece));
        }
    }
    if !current.is_empty() {
        packed.push(current);
    }

    packed
}
