//! Token-by-token static/dynamic classification from conditional n-gram
//! frequencies, template rendering and template id resolution.
use crate::error::ConfigError;
use crate::gram_engine::GramEngine;
use crate::histogram::RatioHistogram;
use crate::masker::PLACEHOLDER;
use crate::template_registry::TemplateRegistry;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Ascending positions classified dynamic.
pub type DynamicIndices = SmallVec<[usize; 8]>;

/// Result of parsing one tokenized line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTemplate {
    pub template: String,
    pub template_id: u64,
    /// Position → original token, for every dynamic position. A pre-masked
    /// `<*>` in position 0 is listed too, though classification keeps that
    /// position static.
    pub dynamic_tokens: BTreeMap<usize, String>,
}

/// Classify every position of `tokens` against the current statistics.
///
/// * position 0 is always static, nothing precedes it;
/// * position 1 is judged by `count(t0^t1) / count(t0)`;
/// * position i >= 2 is judged by `count(t[i-2]^t[i-1]^t[i]) / count(t[i-2]^t[i-1])`,
///   unless i-2 is already dynamic, in which case the bigram ratio of
///   `t[i-1], t[i]` is used instead.
///
/// A position is dynamic when its ratio is `<= threshold`. Pre-masked `<*>`
/// tokens are dynamic without a lookup. `observe` receives every computed ratio.
pub fn classify<S, F>(
    engine: &mut GramEngine,
    tokens: &[S],
    threshold: f64,
    mut observe: F,
) -> DynamicIndices
where
    S: AsRef<str>,
    F: FnMut(f64),
{
    let mut dynamic = DynamicIndices::new();

    for (i, token) in tokens.iter().enumerate().skip(1) {
        let token = token.as_ref();
        if token == PLACEHOLDER {
            dynamic.push(i);
            continue;
        }

        let prev = tokens[i - 1].as_ref();
        let ratio = if i >= 2 && !dynamic.contains(&(i - 2)) {
            engine.trigram_frequency(tokens[i - 2].as_ref(), prev, token)
        } else {
            engine.bigram_frequency(prev, token)
        };

        observe(ratio);
        if ratio <= threshold {
            dynamic.push(i);
        }
    }

    dynamic
}

/// Join tokens with a single trailing space each, substituting `<*>` at
/// dynamic positions.
pub fn render<S: AsRef<str>>(tokens: &[S], dynamic: &[usize]) -> String {
    let mut template = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if dynamic.contains(&i) {
            template.push_str(PLACEHOLDER);
        } else {
            template.push_str(token.as_ref());
        }
        template.push(' ');
    }
    template
}

/// Owns the threshold, the template registry and the ratio histogram of
/// one stream-processing instance.
#[derive(Debug, Clone)]
pub struct TemplateMiner {
    threshold: f64,
    registry: TemplateRegistry,
    ratios: RatioHistogram,
}

impl TemplateMiner {
    pub fn new(threshold: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }

        Ok(Self {
            threshold,
            registry: TemplateRegistry::new(),
            ratios: RatioHistogram::new(),
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn ratio_histogram(&self) -> &RatioHistogram {
        &self.ratios
    }

    pub fn classify<S: AsRef<str>>(&mut self, engine: &mut GramEngine, tokens: &[S]) -> DynamicIndices {
        let ratios = &mut self.ratios;
        classify(engine, tokens, self.threshold, |ratio| ratios.add(ratio))
    }

    /// Classify, render and register a line.
    ///
    /// The engine is only read here. The caller ingests the same tokens
    /// afterwards so a line is never judged against its own counts.
    pub fn parse<S: AsRef<str>>(&mut self, engine: &mut GramEngine, tokens: &[S]) -> ParsedTemplate {
        let dynamic = self.classify(engine, tokens);
        let template = render(tokens, &dynamic);

        let leading_mask = match tokens.first() {
            Some(first) if first.as_ref() == PLACEHOLDER => Some(0),
            _ => None,
        };

        let dynamic_tokens = leading_mask
            .into_iter()
            .chain(dynamic.iter().copied())
            .map(|i| (i, tokens[i].as_ref().to_string()))
            .collect();

        let template_id = self.registry.get_or_assign(&template);

        ParsedTemplate {
            template,
            template_id,
            dynamic_tokens,
        }
    }
}
