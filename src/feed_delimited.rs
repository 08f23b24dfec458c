use csv::{ReaderBuilder, StringRecord};
use tracing::warn;

use crate::adapters::MetricAdapter;
use crate::error::AdapterError;
use crate::metrics::{MetricMap, MetricValue};
use crate::roster::Resolver;

/// Header line, then one team per line keyed by the provider abbreviation in
/// the first field.
#[derive(Debug, Clone)]
pub struct DelimitedAdapter {
    pub name: String,
    pub target_key: String,
    pub category: String,
    pub delimiter: u8,
}

impl MetricAdapter for DelimitedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(
        &self,
        raw: &str,
        resolver: &Resolver<'_>,
    ) -> Result<Vec<(String, MetricMap)>, AdapterError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());

        let headers = reader
            .headers()
            .map_err(|source| AdapterError::Delimited {
                feed: self.name.clone(),
                source,
            })?
            .clone();
        if headers.len() < 2 || headers.iter().all(str::is_empty) {
            return Err(AdapterError::missing(&self.name, "header row"));
        }

        let mut out = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    warn!(feed = %self.name, row = idx + 1, %err, "malformed line, skipping");
                    continue;
                }
            };
            let Some(abbreviation) = record.get(0).filter(|s| !s.is_empty()) else {
                warn!(feed = %self.name, row = idx + 1, "line has no team abbreviation, skipping");
                continue;
            };
            let Some(team_id) = resolver.resolve(abbreviation, &self.name) else {
                continue;
            };

            let stats = zip_record(&headers, &record);
            let mut category = MetricMap::new();
            category.insert(self.category.clone(), MetricValue::Map(stats));
            let mut metrics = MetricMap::new();
            metrics.insert(self.target_key.clone(), MetricValue::Map(category));
            out.push((team_id, metrics));
        }

        Ok(out)
    }
}

fn zip_record(headers: &StringRecord, record: &StringRecord) -> MetricMap {
    headers
        .iter()
        .zip(record.iter())
        .skip(1)
        .filter(|(h, _)| !h.is_empty())
        .filter_map(|(h, cell)| MetricValue::from_cell(cell).map(|v| (h.to_string(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::lookup_f64;
    use crate::model::{Sport, Team};
    use crate::roster::Roster;

    fn roster() -> Roster {
        let teams = [("10", "NYY"), ("19", "LAD"), ("25", "SD")].map(|(id, abbr)| Team {
            id: id.to_string(),
            abbreviation: abbr.to_string(),
            ..Team::default()
        });
        Roster::new(Sport::Mlb, teams)
    }

    fn adapter(delimiter: u8) -> DelimitedAdapter {
        DelimitedAdapter {
            name: "ratings".to_string(),
            target_key: "powerIndexes".to_string(),
            category: "ratings".to_string(),
            delimiter,
        }
    }

    #[test]
    fn first_field_identifies_team() {
        let raw = "Team,W,L,Rating\nNYY,94,68,1.8\nSDP,90,72,0.9\nXXX,1,1,0\nLAD,98,64\n";
        let roster = roster();
        let resolver = Resolver::new(Sport::Mlb, &roster);
        let rows = adapter(b',').parse(raw, &resolver).expect("csv should parse");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "10");
        assert_eq!(lookup_f64(&rows[0].1, &["powerIndexes", "ratings", "Rating"]), Some(1.8));
        assert_eq!(rows[1].0, "25");
        // Short line keeps the columns it has.
        assert_eq!(rows[2].0, "19");
        assert_eq!(lookup_f64(&rows[2].1, &["powerIndexes", "ratings", "W"]), Some(98.0));
        assert_eq!(lookup_f64(&rows[2].1, &["powerIndexes", "ratings", "Rating"]), None);
    }

    #[test]
    fn tab_delimiter_is_honored() {
        let raw = "Team\tRating\nLAD\t2.4\n";
        let roster = roster();
        let resolver = Resolver::new(Sport::Mlb, &roster);
        let rows = adapter(b'\t').parse(raw, &resolver).expect("tsv should parse");
        assert_eq!(lookup_f64(&rows[0].1, &["powerIndexes", "ratings", "Rating"]), Some(2.4));
    }

    #[test]
    fn headerless_payload_is_a_parse_failure() {
        let roster = roster();
        let resolver = Resolver::new(Sport::Mlb, &roster);
        assert!(adapter(b',').parse("", &resolver).is_err());
    }
}
