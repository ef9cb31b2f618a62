//! Common test utilities and fixtures

#![allow(dead_code)]

use evalsense_core::config::SentimentConfig;
use evalsense_core::types::QUESTION_BANK;
use evalsense_core::{LabeledText, RatingMap, RatingScale, SentimentAnalyzer, SentimentLabel};

const POSITIVE: [&str; 8] = [
    "excellent course",
    "clear explanations",
    "great instructor",
    "helpful feedback",
    "engaging discussions",
    "organized material",
    "inspiring sessions",
    "knowledgeable professor",
];

const NEGATIVE: [&str; 8] = [
    "terrible course",
    "confusing lectures",
    "disorganized lectures",
    "boring slides",
    "unclear grading",
    "unhelpful instructor",
    "frustrating assignments",
    "awful pacing",
];

const NEUTRAL: [&str; 8] = [
    "average workload",
    "okay schedule",
    "adequate textbook",
    "standard syllabus",
    "typical quizzes",
    "acceptable pace",
    "moderate difficulty",
    "regular meetings",
];

fn documents(phrases: &[&str; 8], label: SentimentLabel, count: usize) -> Vec<LabeledText> {
    (0..count)
        .map(|i| {
            let text = format!(
                "{}. {}, {}.",
                phrases[i % 8],
                phrases[(i + 3) % 8],
                phrases[(i + 5) % 8]
            );
            LabeledText::new(text, label)
        })
        .collect()
}

/// Balanced three-class corpus, 30 documents per label
pub fn fixture_corpus() -> Vec<LabeledText> {
    let mut corpus = documents(&POSITIVE, SentimentLabel::Positive, 30);
    corpus.extend(documents(&NEGATIVE, SentimentLabel::Negative, 30));
    corpus.extend(documents(&NEUTRAL, SentimentLabel::Neutral, 30));
    corpus
}

pub fn trained_analyzer() -> SentimentAnalyzer {
    let (analyzer, _) =
        SentimentAnalyzer::train(&fixture_corpus(), &SentimentConfig::default()).expect("Failed to train fixture model");
    analyzer
}

pub fn ratings(pairs: &[(&str, i64)]) -> RatingMap {
    RatingMap::new(pairs.iter().map(|(k, v)| (*k, *v)), &RatingScale::default()).expect("Invalid fixture ratings")
}

/// A full question-bank evaluation whose value at position `i` is `value(i)`
pub fn full_evaluation(value: impl Fn(usize) -> i64) -> RatingMap {
    RatingMap::new(
        QUESTION_BANK.iter().enumerate().map(|(i, (id, _))| (*id, value(i))),
        &RatingScale::default(),
    )
    .expect("Invalid fixture evaluation")
}
