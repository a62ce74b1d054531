mod common;

use common::numbered_words;
use memo_screen::{
    chunk_range_for, chunk_text, round_count_for, ChunkRange, FixedSizes, RandomSizes, SizeSource,
};

fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[test]
fn test_chunks_partition_the_text() {
    for seed in 0..40u64 {
        let mut sizes = RandomSizes::seeded(seed);
        for length in 1..=80 {
            let text = numbered_words(length);
            let range = chunk_range_for(length);
            let chunks = chunk_text(&text, range, &mut sizes);

            let rejoined: Vec<String> = chunks.iter().flat_map(|chunk| tokens(chunk)).collect();
            assert_eq!(rejoined, tokens(&text), "seed {} length {}", seed, length);
            assert!(chunks.iter().all(|chunk| !chunk.trim().is_empty()));
        }
    }
}

#[test]
fn test_chunk_sizes_respect_range() {
    for seed in 0..40u64 {
        let mut sizes = RandomSizes::seeded(seed);
        for length in [3, 7, 12, 19, 20, 33, 64, 150] {
            let range = chunk_range_for(length);
            let chunks = chunk_text(&numbered_words(length), range, &mut sizes);

            for chunk in &chunks {
                let words = tokens(chunk).len();
                if chunks.len() > 1 {
                    assert!(words >= range.min_words(), "chunk '{}' below minimum", chunk);
                }
                assert!(words <= range.max_words() + range.min_words() - 1, "chunk '{}' too long", chunk);
            }
        }
    }
}

#[test]
fn test_short_remainder_merges_into_previous_chunk() {
    let text = numbered_words(12);
    let range = ChunkRange::new(5, 10);

    // 10 words taken, 2 left over: they join the first chunk.
    let chunks = chunk_text(&text, range, &mut FixedSizes::new(vec![10]));
    assert_eq!(chunks, vec![text.clone()]);

    let chunks = chunk_text(&text, range, &mut FixedSizes::new(vec![5]));
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], "w1 w2 w3 w4 w5");
    assert_eq!(chunks[1], "w6 w7 w8 w9 w10 w11 w12");
}

#[test]
fn test_remainder_within_draw_becomes_final_chunk() {
    let chunks = chunk_text(&numbered_words(9), ChunkRange::new(3, 7), &mut FixedSizes::new(vec![4, 7]));
    assert_eq!(chunks, vec!["w1 w2 w3 w4", "w5 w6 w7 w8 w9"]);
}

#[test]
fn test_text_shorter_than_minimum_is_one_chunk() {
    let chunks = chunk_text("just two", ChunkRange::new(3, 7), &mut FixedSizes::new(vec![3]));
    assert_eq!(chunks, vec!["just two"]);
}

#[test]
fn test_whitespace_is_normalised() {
    let chunks = chunk_text("  one\ttwo \n three  ", ChunkRange::new(3, 7), &mut FixedSizes::new(vec![3]));
    assert_eq!(chunks, vec!["one two three"]);
}

#[test]
fn test_empty_text_has_no_chunks() {
    let chunks = chunk_text("   ", ChunkRange::new(3, 7), &mut FixedSizes::new(vec![3]));
    assert!(chunks.is_empty());
}

#[test]
fn test_chunk_range_normalises_bounds() {
    let inverted = ChunkRange::new(5, 3);
    assert_eq!((inverted.min_words(), inverted.max_words()), (5, 5));

    let zero = ChunkRange::new(0, 0);
    assert_eq!((zero.min_words(), zero.max_words()), (1, 1));
}

#[test]
fn test_size_sources_stay_within_bounds() {
    let mut fixed = FixedSizes::new(vec![0, 2, 5, 9]);
    let drawn: Vec<usize> = (0..4).map(|_| fixed.draw(3, 7)).collect();
    assert_eq!(drawn, vec![3, 3, 5, 7]);

    // Inverted bounds collapse to the minimum rather than panicking.
    assert_eq!(fixed.draw(5, 3), 5);
    let mut random = RandomSizes::seeded(7);
    assert_eq!(random.draw(5, 3), 5);
}

#[test]
fn test_out_of_range_fixed_sizes_are_clamped_when_chunking() {
    let chunks = chunk_text(&numbered_words(20), ChunkRange::new(3, 7), &mut FixedSizes::new(vec![50]));
    let lengths: Vec<usize> = chunks.iter().map(|chunk| tokens(chunk).len()).collect();
    assert_eq!(lengths, vec![7, 7, 6]);

    let chunks = chunk_text(&numbered_words(9), ChunkRange::new(3, 7), &mut FixedSizes::new(vec![1]));
    assert_eq!(chunks, vec!["w1 w2 w3", "w4 w5 w6", "w7 w8 w9"]);
}

#[test]
fn test_chunk_range_switches_at_twenty_words() {
    assert_eq!(chunk_range_for(1), ChunkRange::new(3, 7));
    assert_eq!(chunk_range_for(19), ChunkRange::new(3, 7));
    assert_eq!(chunk_range_for(20), ChunkRange::new(5, 10));
    assert_eq!(chunk_range_for(5000), ChunkRange::new(5, 10));
}

#[test]
fn test_round_count_for_short_texts() {
    assert_eq!(round_count_for(1), 1);
    assert_eq!(round_count_for(2), 1);
    assert_eq!(round_count_for(3), 1);
    assert_eq!(round_count_for(5), 3);
    assert_eq!(round_count_for(9), 7);
    assert_eq!(round_count_for(19), 17);
}

#[test]
fn test_round_count_table() {
    let expected = [
        (20, 13), (29, 13), (30, 12), (40, 11), (59, 11), (60, 10), (80, 9), (100, 8),
        (149, 8), (150, 7), (200, 6), (300, 5), (499, 5), (500, 4), (699, 4), (700, 3),
        (899, 3), (900, 2), (999, 2), (1000, 2), (25_000, 2),
    ];
    for (words, rounds) in expected {
        assert_eq!(round_count_for(words), rounds, "{} words", words);
    }
}

#[test]
fn test_round_count_is_non_increasing_from_twenty_words() {
    let mut previous = round_count_for(20);
    for words in 21..3000 {
        let rounds = round_count_for(words);
        assert!(rounds <= previous, "round count rose at {} words", words);
        previous = rounds;
    }
    assert!(round_count_for(25) >= round_count_for(250));
    assert!(round_count_for(250) >= round_count_for(1500));
}
