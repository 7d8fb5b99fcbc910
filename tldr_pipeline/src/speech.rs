/// Splits narration into pieces short enough for one speech request.
///
/// Pieces break at sentence ends where possible, then at whitespace, and
/// only split inside a word when a single word exceeds `max_chars`. Every
/// returned piece is at most `max_chars` characters and none is empty.
#[must_use]
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);

    let pieces = sentences(text)
        .into_iter()
        .flat_map(|sentence| split_long_sentence(sentence, max_chars));

    pack(pieces, max_chars)
}

fn sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '.' | '!' | '?' => chars
                .peek()
                .is_none_or(|(_, next)| next.is_whitespace()),
            '\n' => true,
            _ => false,
        };

        if boundary {
            let end = i + c.len_utf8();
            sentences.push(&text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

fn split_long_sentence(sentence: &str, max_chars: usize) -> Vec<String> {
    if sentence.chars().count() <= max_chars {
        return vec![sentence.to_string()];
    }

    let words = sentence.split_whitespace().flat_map(|word| {
        let chars: Vec<char> = word.chars().collect();
        chars
            .chunks(max_chars)
            .map(|chunk| chunk.iter().collect::<String>())
            .collect::<Vec<_>>()
    });

    pack(words, max_chars)
}

// Greedily joins pieces with single spaces while they fit.
fn pack(pieces: impl Iterator<Item = String>, max_chars: usize) -> Vec<String> {
    let mut packed = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for piece in pieces {
        let piece_len = piece.chars().count();
        if current_len > 0 && current_len + 1 + piece_len > max_chars {
            packed.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(&piece);
        current_len += piece_len;
    }

    if !current.is_empty() {
        packed.push(current);
    }

    packed
}
