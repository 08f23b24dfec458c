use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::adapters::MetricAdapter;
use crate::error::AdapterError;
use crate::metrics::{MetricMap, MetricValue};
use crate::roster::Resolver;

/// Team stats delivered as category blocks with parallel name/value arrays.
///
/// The stat vocabulary comes back with the payload, either once at the top
/// level (`categories[].names`) or inside each team's category block.
#[derive(Debug, Clone)]
pub struct JsonCategoryAdapter {
    pub name: String,
    /// Metric key the category map is stored under, e.g. `powerIndexes`.
    pub target_key: String,
}

impl JsonCategoryAdapter {
    pub fn new(name: impl Into<String>, target_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_key: target_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CategoryFeed {
    #[serde(default)]
    categories: Vec<CategoryVocabulary>,
    teams: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct CategoryVocabulary {
    name: String,
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TeamEntry {
    team: TeamRef,
    #[serde(default)]
    categories: Vec<TeamCategory>,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    abbreviation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamCategory {
    name: String,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    values: Vec<Option<Value>>,
}

impl MetricAdapter for JsonCategoryAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(
        &self,
        raw: &str,
        resolver: &Resolver<'_>,
    ) -> Result<Vec<(String, MetricMap)>, AdapterError> {
        let feed: CategoryFeed =
            serde_json::from_str(raw.trim()).map_err(|source| AdapterError::Json {
                feed: self.name.clone(),
                source,
            })?;
        let teams = feed
            .teams
            .ok_or_else(|| AdapterError::missing(&self.name, "teams"))?;

        let vocabulary: HashMap<&str, &[String]> = feed
            .categories
            .iter()
            .map(|c| (c.name.as_str(), c.names.as_slice()))
            .collect();

        let mut out = Vec::with_capacity(teams.len());
        for (idx, entry) in teams.into_iter().enumerate() {
            let entry: TeamEntry = match serde_json::from_value(entry) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(feed = %self.name, row = idx, %err, "malformed team entry, skipping");
                    continue;
                }
            };

            let id = entry.team.id.as_ref().and_then(crate::roster::pick_id);
            let Some(team_id) = resolver.resolve_id_or_abbreviation(
                id.as_deref(),
                entry.team.abbreviation.as_deref(),
                &self.name,
            ) else {
                continue;
            };

            let mut categories = MetricMap::new();
            for category in &entry.categories {
                let names: &[String] = if category.names.is_empty() {
                    vocabulary.get(category.name.as_str()).copied().unwrap_or(&[])
                } else {
                    &category.names
                };
                if names.is_empty() {
                    warn!(
                        feed = %self.name,
                        team = %team_id,
                        category = %category.name,
                        "category has no stat names, skipping"
                    );
                    continue;
                }
                if names.len() != category.values.len() {
                    warn!(
                        feed = %self.name,
                        team = %team_id,
                        category = %category.name,
                        names = names.len(),
                        values = category.values.len(),
                        "stat names and values differ in length, zipping what lines up"
                    );
                }
                let stats = zip_stats(names, &category.values);
                if !stats.is_empty() {
                    categories.insert(category.name.clone(), MetricValue::Map(stats));
                }
            }

            let mut metrics = MetricMap::new();
            metrics.insert(self.target_key.clone(), MetricValue::Map(categories));
            out.push((team_id, metrics));
        }

        Ok(out)
    }
}

fn zip_stats(names: &[String], values: &[Option<Value>]) -> MetricMap {
    names
        .iter()
        .zip(values)
        .filter_map(|(name, value)| {
            let value = match value.as_ref()? {
                Value::Number(n) => MetricValue::Number(n.as_f64()?),
                Value::String(s) => MetricValue::from_cell(s)?,
                _ => return None,
            };
            Some((name.clone(), value))
        })
        .collect()
}
