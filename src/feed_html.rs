use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::adapters::MetricAdapter;
use crate::error::AdapterError;
use crate::metrics::{MetricMap, MetricValue};
use crate::roster::Resolver;

/// Reads one named table out of an HTML page.
///
/// Rows are located by position: the first `skip_rows` rows are headers,
/// `header_row` is the one whose cells name the columns. Team identity comes
/// from the path of the first link in a row, never from its text.
#[derive(Debug, Clone)]
pub struct HtmlTableAdapter {
    pub name: String,
    pub target_key: String,
    /// Key the row map is stored under inside `target_key`.
    pub category: String,
    pub table_selector: String,
    pub skip_rows: usize,
    pub header_row: usize,
    /// Index into the non-empty segments of the link path, e.g. `1` for
    /// `/teams/BOS/2025.html`.
    pub link_segment: usize,
}

impl MetricAdapter for HtmlTableAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(
        &self,
        raw: &str,
        resolver: &Resolver<'_>,
    ) -> Result<Vec<(String, MetricMap)>, AdapterError> {
        let table_selector = selector(&self.name, &self.table_selector)?;
        let row_selector = selector(&self.name, "tr")?;
        let cell_selector = selector(&self.name, "th, td")?;
        let link_selector = selector(&self.name, "a[href]")?;

        let document = Html::parse_document(raw);
        let table = document
            .select(&table_selector)
            .next()
            .ok_or_else(|| AdapterError::missing(&self.name, format!("table {}", self.table_selector)))?;

        let rows: Vec<ElementRef<'_>> = table.select(&row_selector).collect();
        let header = rows
            .get(self.header_row)
            .ok_or_else(|| AdapterError::missing(&self.name, "header row"))?;
        let headers: Vec<String> = header.select(&cell_selector).map(cell_text).collect();
        if headers.iter().all(String::is_empty) {
            return Err(AdapterError::missing(&self.name, "column headers"));
        }

        let mut out = Vec::new();
        for (idx, row) in rows.iter().enumerate().skip(self.skip_rows) {
            let Some(abbreviation) = row
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| path_segment(href, self.link_segment))
            else {
                debug!(feed = %self.name, row = idx, "row has no team link, skipping");
                continue;
            };
            let Some(team_id) = resolver.resolve(&abbreviation, &self.name) else {
                continue;
            };

            let cells: Vec<String> = row.select(&cell_selector).map(cell_text).collect();
            if cells.len() != headers.len() {
                warn!(
                    feed = %self.name,
                    row = idx,
                    cells = cells.len(),
                    headers = headers.len(),
                    "row width differs from header, zipping what lines up"
                );
            }
            let stats: MetricMap = headers
                .iter()
                .zip(&cells)
                .filter(|(h, _)| !h.is_empty())
                .filter_map(|(h, c)| MetricValue::from_cell(c).map(|v| (h.clone(), v)))
                .collect();

            let mut category = MetricMap::new();
            category.insert(self.category.clone(), MetricValue::Map(stats));
            let mut metrics = MetricMap::new();
            metrics.insert(self.target_key.clone(), MetricValue::Map(category));
            out.push((team_id, metrics));
        }

        Ok(out)
    }
}

fn selector(feed: &str, css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css)
        .map_err(|e| AdapterError::missing(feed, format!("valid selector {css}: {e}")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn path_segment(href: &str, index: usize) -> Option<String> {
    let path = href.split(['?', '#']).next()?;
    let path = path
        .split_once("://")
        .and_then(|(_, rest)| rest.find('/').map(|i| &rest[i..]))
        .unwrap_or(path);
    path.split('/')
        .filter(|s| !s.is_empty())
        .nth(index)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::lookup_f64;
    use crate::model::{Sport, Team};
    use crate::roster::Roster;

    fn adapter() -> HtmlTableAdapter {
        HtmlTableAdapter {
            name: "srs".to_string(),
            target_key: "powerIndexes".to_string(),
            category: "srs".to_string(),
            table_selector: "table#ratings".to_string(),
            skip_rows: 2,
            header_row: 1,
            link_segment: 1,
        }
    }

    fn roster() -> Roster {
        let teams = [("1", "BOS"), ("4", "TBL")].map(|(id, abbr)| Team {
            id: id.to_string(),
            abbreviation: abbr.to_string(),
            ..Team::default()
        });
        Roster::new(Sport::Nhl, teams)
    }

    const PAGE: &str = r#"<html><body>
        <table id="other"><tr><td>ignore</td></tr></table>
        <table id="ratings">
          <thead>
            <tr><th colspan="4">Team Ratings</th></tr>
            <tr><th>Rk</th><th>Team</th><th>SRS</th><th>SOS</th></tr>
          </thead>
          <tbody>
            <tr><td>1</td><td><a href="/teams/TBL/2025.html">Lightning</a></td><td>0.85</td><td>-0.02</td></tr>
            <tr><td>2</td><td><a href="https://example.com/teams/BOS/2025.html">Bruins</a></td><td>0.41</td><td>0.03</td></tr>
            <tr><td>3</td><td><a href="/teams/XXX/2025.html">Nowhere</a></td><td>0.1</td><td>0.0</td></tr>
            <tr><td></td><td>League Average</td><td>0.00</td><td>0.00</td></tr>
          </tbody>
        </table></body></html>"#;

    #[test]
    fn reads_rows_against_designated_header() {
        let roster = roster();
        let resolver = Resolver::new(Sport::Nhl, &roster);
        let rows = adapter().parse(PAGE, &resolver).expect("page should parse");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "4");
        assert_eq!(lookup_f64(&rows[0].1, &["powerIndexes", "srs", "SRS"]), Some(0.85));
        assert_eq!(rows[1].0, "1");
        assert_eq!(lookup_f64(&rows[1].1, &["powerIndexes", "srs", "SOS"]), Some(0.03));
    }

    #[test]
    fn missing_table_is_a_parse_failure() {
        let roster = roster();
        let resolver = Resolver::new(Sport::Nhl, &roster);
        let err = adapter()
            .parse("<html><body><p>maintenance</p></body></html>", &resolver)
            .unwrap_err();
        assert!(matches!(err, AdapterError::Missing { .. }));
    }

    #[test]
    fn link_segments_ignore_host_and_query() {
        assert_eq!(path_segment("/teams/BOS/2025.html", 1).as_deref(), Some("BOS"));
        assert_eq!(
            path_segment("https://x.test/teams/NYR/2025.html?x=1", 1).as_deref(),
            Some("NYR")
        );
        assert_eq!(path_segment("/teams/", 1), None);
    }
}
