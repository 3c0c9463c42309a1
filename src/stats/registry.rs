// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scoring model registry
//!
//! Models are looked up by name; the reserved name [`ALL_MODELS`] selects every
//! registered model and merges their metrics into one mapping per text.

use super::metric::{MetricMap, MetricValue, TEXT_ID_FIELD};
use std::sync::Arc;
use thiserror::Error;

pub const ALL_MODELS: &str = "all";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Model '{model}' not found (available: {available:?})")]
    UnknownModel {
        model: String,
        available: Vec<String>,
    },

    #[error("Model '{model}' failed: {reason}")]
    ModelFailed { model: String, reason: String },

    #[error("Got {texts} texts but {ids} ids")]
    IdCountMismatch { texts: usize, ids: usize },
}

/// A text scoring model
pub trait StatsModel: Send + Sync {
    fn name(&self) -> &str;

    fn compute(&self, text: &str) -> Result<MetricMap, StatsError>;
}

#[derive(Clone, Default)]
pub struct StatsRegistry {
    models: Vec<Arc<dyn StatsModel>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Registry preloaded with the built-in reference models
    pub fn with_builtin_models() -> Self {
        let mut registry = Self::new();
        for model in super::models::builtin_models() {
            registry.register(model);
        }
        registry
    }

    /// Register a model, replacing any model with the same name
    pub fn register(&mut self, model: Arc<dyn StatsModel>) {
        self.models.retain(|m| m.name() != model.name());
        tracing::info!("Registered stats model '{}'", model.name());
        self.models.push(model);
    }

    /// Keep only the named models; unknown names are an error
    pub fn retain_named(&mut self, names: &[String]) -> Result<(), StatsError> {
        for name in names {
            self.select(name)?;
        }
        self.models.retain(|m| names.iter().any(|n| n == m.name()));
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn select(&self, name: &str) -> Result<Vec<Arc<dyn StatsModel>>, StatsError> {
        if name == ALL_MODELS {
            return Ok(self.models.clone());
        }
        self.models
            .iter()
            .find(|m| m.name() == name)
            .map(|m| vec![m.clone()])
            .ok_or_else(|| StatsError::UnknownModel {
                model: name.to_string(),
                available: self.names(),
            })
    }

    /// Every registered model over one text
    pub fn compute_all(&self, text: &str) -> Result<MetricMap, StatsError> {
        self.compute_with(ALL_MODELS, text)
    }

    /// A single named model over one text
    pub fn compute_one(&self, model: &str, text: &str) -> Result<MetricMap, StatsError> {
        self.compute_with(model, text)
    }

    fn compute_with(&self, model: &str, text: &str) -> Result<MetricMap, StatsError> {
        let mut merged = MetricMap::new();
        for m in self.select(model)? {
            merged.extend(m.compute(text)?);
        }
        Ok(merged)
    }

    /// Score each text and tag its mapping with the matching id
    ///
    /// When `ids` is empty, positional indices are used.
    pub fn score_texts(
        &self,
        model: &str,
        texts: &[String],
        ids: &[String],
    ) -> Result<Vec<MetricMap>, StatsError> {
        if !ids.is_empty() && ids.len() != texts.len() {
            return Err(StatsError::IdCountMismatch {
                texts: texts.len(),
                ids: ids.len(),
            });
        }
        let models = self.select(model)?;

        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let id = ids.get(i).cloned().unwrap_or_else(|| i.to_string());
                let mut result = MetricMap::new();
                result.insert(TEXT_ID_FIELD.to_string(), MetricValue::Text(id));
                for m in &models {
                    result.extend(m.compute(text)?);
                }
                Ok(result)
            })
            .collect()
    }
}
