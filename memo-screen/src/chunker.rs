use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Inclusive word-count bounds for a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    min_words: usize,
    max_words: usize,
}

impl ChunkRange {
    pub fn new(min_words: usize, max_words: usize) -> Self {
        let min_words = min_words.max(1);
        Self {
            min_words,
            max_words: max_words.max(min_words),
        }
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }
}

/// Short inputs get smaller chunks so they still decompose into several pieces.
pub fn chunk_range_for(word_count: usize) -> ChunkRange {
    if word_count < 20 {
        ChunkRange::new(3, 7)
    } else {
        ChunkRange::new(5, 10)
    }
}

/// Source of chunk sizes.
///
/// Production draws uniformly at random; tests plug in a seeded or fixed sequence.
pub trait SizeSource: Send {
    /// Draw a size in `[min, max]`, inclusive.
    fn draw(&mut self, min: usize, max: usize) -> usize;
}

pub struct RandomSizes<R: Rng + Send> {
    rng: R,
}

impl<R: Rng + Send> RandomSizes<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomSizes<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> SizeSource for RandomSizes<R> {
    fn draw(&mut self, min: usize, max: usize) -> usize {
        self.rng.gen_range(min..=max.max(min))
    }
}

/// Replays a fixed list of sizes, cycling when exhausted.
///
/// Replayed values are clamped into the requested range.
#[derive(Debug, Clone)]
pub struct FixedSizes {
    sizes: Vec<usize>,
    next: usize,
}

impl FixedSizes {
    pub fn new(sizes: Vec<usize>) -> Self {
        Self { sizes, next: 0 }
    }
}

impl SizeSource for FixedSizes {
    fn draw(&mut self, min: usize, max: usize) -> usize {
        if self.sizes.is_empty() {
            return min;
        }
        let size = self.sizes[self.next % self.sizes.len()];
        self.next += 1;
        size.clamp(min, max.max(min))
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split `text` into word-contiguous chunks whose sizes are drawn from `sizes`.
///
/// The chunks partition the words of `text` in order. A tail shorter than
/// `range.min_words` is appended to the previous chunk instead of standing alone.
pub fn chunk_text(text: &str, range: ChunkRange, sizes: &mut dyn SizeSource) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks: Vec<Vec<&str>> = Vec::new();
    let mut i = 0;

    while i < words.len() {
        let size = sizes.draw(range.min_words, range.max_words).max(1);
        let remaining = words.len() - i;

        if remaining < range.min_words && !chunks.is_empty() {
            if let Some(last) = chunks.last_mut() {
                last.extend_from_slice(&words[i..]);
            }
            i = words.len();
        } else if remaining <= size {
            chunks.push(words[i..].to_vec());
            i = words.len();
        } else {
            chunks.push(words[i..i + size].to_vec());
            i += size;
        }
    }

    let chunks: Vec<String> = chunks.into_iter().map(|chunk| chunk.join(" ")).collect();
    debug!("Split {} words into {} chunks", words.len(), chunks.len());
    chunks
}
