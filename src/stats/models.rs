// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Built-in reference models
//!
//! Lightweight, dependency-free scorers so a server can run without any heavy
//! model loaded. Real deployments register their own [`StatsModel`]s.

use super::metric::{MetricMap, MetricValue};
use super::registry::{StatsError, StatsModel};
use std::sync::Arc;

pub fn builtin_models() -> Vec<Arc<dyn StatsModel>> {
    vec![
        Arc::new(TextShapeModel),
        Arc::new(LexiconSentimentModel),
        Arc::new(ReadabilityModel),
    ]
}

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect()
}

fn sentence_count(text: &str) -> usize {
    let n = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    n.max(usize::from(!text.trim().is_empty()))
}

/// Length and word-shape statistics
pub struct TextShapeModel;

impl StatsModel for TextShapeModel {
    fn name(&self) -> &str {
        "shape"
    }

    fn compute(&self, text: &str) -> Result<MetricMap, StatsError> {
        let words = words(text);
        let letters: usize = words.iter().map(|w| w.chars().count()).sum();
        let avg = if words.is_empty() {
            0.0
        } else {
            letters as f64 / words.len() as f64
        };

        let mut out = MetricMap::new();
        out.insert("char_count".into(), text.chars().count().into());
        out.insert("word_count".into(), words.len().into());
        out.insert("sentence_count".into(), sentence_count(text).into());
        out.insert("avg_word_length".into(), avg.into());
        Ok(out)
    }
}

const POSITIVE: &[&str] = &[
    "good", "great", "excellent", "happy", "love", "like", "nice", "thanks", "thank",
    "awesome", "glad", "wonderful", "agree", "helpful", "well", "fun",
];

const NEGATIVE: &[&str] = &[
    "bad", "terrible", "awful", "sad", "hate", "dislike", "angry", "wrong", "poor",
    "problem", "fail", "failed", "worse", "worst", "sorry", "annoying",
];

/// Word-list polarity: positive and negative hit counts and a score in [-1, 1]
pub struct LexiconSentimentModel;

impl StatsModel for LexiconSentimentModel {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn compute(&self, text: &str) -> Result<MetricMap, StatsError> {
        let mut pos = 0usize;
        let mut neg = 0usize;
        for w in words(text) {
            let w = w.to_lowercase();
            if POSITIVE.contains(&w.as_str()) {
                pos += 1;
            } else if NEGATIVE.contains(&w.as_str()) {
                neg += 1;
            }
        }
        let polarity = if pos + neg == 0 {
            0.0
        } else {
            (pos as f64 - neg as f64) / (pos + neg) as f64
        };

        let mut out = MetricMap::new();
        out.insert("sentiment_positive".into(), pos.into());
        out.insert("sentiment_negative".into(), neg.into());
        out.insert("sentiment_polarity".into(), polarity.into());
        Ok(out)
    }
}

/// Flesch reading ease with a vowel-group syllable estimate
///
/// Empty text has no defined score and yields null.
pub struct ReadabilityModel;

fn syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let mut count = 0;
    let mut prev_vowel = false;
    for c in lower.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }
    if lower.ends_with('e') && count > 1 {
        count -= 1;
    }
    count.max(1)
}

impl StatsModel for ReadabilityModel {
    fn name(&self) -> &str {
        "readability"
    }

    fn compute(&self, text: &str) -> Result<MetricMap, StatsError> {
        let words = words(text);
        let score = if words.is_empty() {
            None
        } else {
            let syllable_total: usize = words.iter().map(|w| syllables(w)).sum();
            let wps = words.len() as f64 / sentence_count(text) as f64;
            let spw = syllable_total as f64 / words.len() as f64;
            Some(206.835 - 1.015 * wps - 84.6 * spw)
        };

        let mut out = MetricMap::new();
        out.insert("flesch_reading_ease".into(), MetricValue::from(score));
        Ok(out)
    }
}
