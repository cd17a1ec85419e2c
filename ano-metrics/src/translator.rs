use std::collections::BTreeMap;

use ano_filter::LabelFilters;

use crate::{CanonicalMetric, RawSample};

/// Converts accepted samples into Anodot 2.0 records.
///
/// The translator holds the label filters and the static tags added to every record. It is
/// immutable after construction and can be shared between threads.
#[derive(Clone, Debug, Default)]
pub struct Translator {
    filters: LabelFilters,
    static_tags: BTreeMap<String, Vec<String>>,
}

impl Translator {
    /// Creates a translator applying the given filters.
    pub fn new(filters: LabelFilters) -> Self {
        Self {
            filters,
            static_tags: BTreeMap::new(),
        }
    }

    /// Adds static tags to every translated record and returns the translator.
    pub fn with_static_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = String>,
    {
        for (key, values) in tags {
            self.static_tags
                .entry(key.into())
                .or_default()
                .extend(values);
        }
        self
    }

    /// The filters applied before translation.
    pub fn filters(&self) -> &LabelFilters {
        &self.filters
    }

    /// Translates a single sample.
    ///
    /// Returns `None` if the sample is rejected by the filters or has a non-finite value. The
    /// metric name becomes the `what` property and every label becomes a property. A label
    /// named `what` is ignored.
    ///
    /// Labels whose keys sanitize to the same property collapse into one. Labels are applied in
    /// key order, so the value of the label with the greatest raw key wins, e.g. `a_b` over `a.b`.
    pub fn translate(&self, sample: &RawSample) -> Option<CanonicalMetric> {
        if let Err(reason) = ano_filter::should_filter(sample, &self.filters) {
            ano_log::trace!(metric = sample.name(), %reason, "dropped sample");
            return None;
        }

        let mut metric =
            CanonicalMetric::new(sample.name(), sample.timestamp(), sample.value()).ok()?;
        for (key, value) in sample.labels() {
            metric.insert_property(key, value);
        }
        for (key, values) in &self.static_tags {
            metric.extend_tag(key, values.iter().map(String::as_str));
        }

        Some(metric)
    }

    /// Translates a batch of samples, skipping rejected ones.
    pub fn translate_all<'a, I>(&self, samples: I) -> Vec<CanonicalMetric>
    where
        I: IntoIterator<Item = &'a RawSample>,
    {
        let mut total = 0;
        let metrics: Vec<_> = samples
            .into_iter()
            .inspect(|_| total += 1)
            .filter_map(|sample| self.translate(sample))
            .collect();

        ano_log::debug!(
            total,
            translated = metrics.len(),
            "translated samples into anodot metrics"
        );

        metrics
    }
}
