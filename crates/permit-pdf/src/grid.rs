//! Structured table detection
//!
//! A grid is built from column edges and row bands. Each axis can take its
//! edges from ruling lines or infer them from text placement, which gives
//! four strategy combinations. Every combination is tried on every page.

use crate::types::{ExtractionConfig, Orientation, PageLayout, TextItem};
use permit_types::{unique_column_names, CellValue, RecordTable, TableError};
use serde::{Deserialize, Serialize};

/// Where an axis takes its separators from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeSource {
    Lines,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridStrategy {
    pub vertical: EdgeSource,
    pub horizontal: EdgeSource,
}

impl GridStrategy {
    pub const ALL: [GridStrategy; 4] = [
        GridStrategy {
            vertical: EdgeSource::Lines,
            horizontal: EdgeSource::Lines,
        },
        GridStrategy {
            vertical: EdgeSource::Lines,
            horizontal: EdgeSource::Text,
        },
        GridStrategy {
            vertical: EdgeSource::Text,
            horizontal: EdgeSource::Lines,
        },
        GridStrategy {
            vertical: EdgeSource::Text,
            horizontal: EdgeSource::Text,
        },
    ];
}

/// Cell text of one detected table, header first
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub page_number: u32,
    pub strategy: GridStrategy,
    pub cells: Vec<Vec<String>>,
}

impl Grid {
    pub fn header(&self) -> &[String] {
        self.cells.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Header row becomes column names (`col_N` for blanks), the rest rows
    pub fn into_table(self) -> Result<RecordTable, TableError> {
        let mut rows = self.cells.into_iter();
        let header = rows.next().unwrap_or_default();
        let columns = unique_column_names(&header);
        let body = rows
            .map(|row| row.iter().map(|cell| CellValue::from_text(cell)).collect())
            .collect();
        RecordTable::from_rows(columns, body)
    }
}

/// Cluster sorted positions lying within `tolerance` of their neighbour.
/// Returns (mean position, member count) per cluster.
fn snap(mut values: Vec<f64>, tolerance: f64) -> Vec<(f64, usize)> {
    values.sort_by(|a, b| a.total_cmp(b));
    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for value in values {
        match clusters.last_mut() {
            Some(cluster) if cluster.last().is_some_and(|last| value - last <= tolerance) => {
                cluster.push(value)
            }
            _ => clusters.push(vec![value]),
        }
    }
    clusters
        .into_iter()
        .map(|c| (c.iter().sum::<f64>() / c.len() as f64, c.len()))
        .collect()
}

/// Left boundaries of each column plus a final right boundary
fn column_edges(page: &PageLayout, source: EdgeSource, config: &ExtractionConfig) -> Option<Vec<f64>> {
    let edges: Vec<f64> = match source {
        EdgeSource::Lines => {
            let positions = page
                .rules_of(Orientation::Vertical)
                .map(|r| r.position)
                .collect();
            snap(positions, config.snap_tolerance)
                .into_iter()
                .map(|(x, _)| x)
                .collect()
        }
        EdgeSource::Text => {
            let lefts = page.items.iter().map(|i| i.x).collect();
            let mut edges: Vec<f64> = snap(lefts, config.snap_tolerance)
                .into_iter()
                .filter(|(_, support)| *support >= config.min_aligned_rows)
                .map(|(x, _)| x)
                .collect();
            let right = page.items.iter().map(TextItem::right).fold(f64::MIN, f64::max);
            if edges.last().is_some_and(|last| right > *last) {
                edges.push(right + config.snap_tolerance);
            }
            edges
        }
    };

    (edges.len() >= 3).then_some(edges)
}

/// Row bands as (top, bottom), ordered top of page first
fn row_bands(page: &PageLayout, source: EdgeSource, config: &ExtractionConfig) -> Option<Vec<(f64, f64)>> {
    let bands: Vec<(f64, f64)> = match source {
        EdgeSource::Lines => {
            let positions = page
                .rules_of(Orientation::Horizontal)
                .map(|r| r.position)
                .collect();
            let mut edges: Vec<f64> = snap(positions, config.snap_tolerance)
                .into_iter()
                .map(|(y, _)| y)
                .collect();
            edges.reverse();
            edges.windows(2).map(|w| (w[0], w[1])).collect()
        }
        EdgeSource::Text => {
            let baselines = page.items.iter().map(|i| i.y).collect();
            let mut centers: Vec<f64> = snap(baselines, config.row_tolerance)
                .into_iter()
                .map(|(y, _)| y)
                .collect();
            centers.reverse();
            let lift = config.row_tolerance;
            (0..centers.len())
                .map(|i| {
                    let top = if i == 0 {
                        f64::INFINITY
                    } else {
                        (centers[i - 1] + centers[i]) / 2.0 + lift
                    };
                    let bottom = if i + 1 == centers.len() {
                        f64::NEG_INFINITY
                    } else {
                        (centers[i] + centers[i + 1]) / 2.0 + lift
                    };
                    (top, bottom)
                })
                .collect()
        }
    };

    (bands.len() >= 2).then_some(bands)
}

/// Text strategies band on baselines, ruled strategies on the glyph middle
fn vertical_anchor(item: &TextItem, source: EdgeSource) -> f64 {
    match source {
        EdgeSource::Lines => item.center_y(),
        EdgeSource::Text => item.y,
    }
}

/// Detect one grid on a page with a single strategy
pub fn detect_grid(page: &PageLayout, strategy: GridStrategy, config: &ExtractionConfig) -> Option<Grid> {
    let edges = column_edges(page, strategy.vertical, config)?;
    let bands = row_bands(page, strategy.horizontal, config)?;
    let tolerance = config.snap_tolerance;
    let column_count = edges.len() - 1;

    let mut buckets: Vec<Vec<Vec<&TextItem>>> = vec![vec![Vec::new(); column_count]; bands.len()];
    for item in &page.items {
        let anchor = vertical_anchor(item, strategy.horizontal);
        let Some(row) = bands.iter().position(|(top, bottom)| anchor <= *top && anchor > *bottom) else {
            continue;
        };
        let Some(column) = (0..column_count)
            .find(|&c| item.x >= edges[c] - tolerance && item.x < edges[c + 1] - tolerance)
        else {
            continue;
        };
        buckets[row][column].push(item);
    }

    let mut cells: Vec<Vec<String>> = buckets
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|mut items| {
                    items.sort_by(|a, b| a.x.total_cmp(&b.x));
                    items
                        .iter()
                        .map(|i| i.text.trim())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect()
        })
        .collect();

    cells.retain(|row| row.iter().any(|c| !c.is_empty()));
    drop_empty_columns(&mut cells);

    // Title and caption lines above the table occupy a single cell
    let first_table_row = cells
        .iter()
        .position(|row| row.iter().filter(|c| !c.is_empty()).count() >= 2)?;
    cells.drain(..first_table_row);

    let columns = cells.first().map(Vec::len).unwrap_or(0);
    let header_present = cells.first().is_some_and(|h| h.iter().any(|c| !c.is_empty()));
    if cells.len() < 2 || columns < 2 || !header_present {
        return None;
    }

    Some(Grid {
        page_number: page.page_number,
        strategy,
        cells,
    })
}

fn drop_empty_columns(cells: &mut [Vec<String>]) {
    let width = cells.first().map(Vec::len).unwrap_or(0);
    let keep: Vec<bool> = (0..width)
        .map(|c| cells.iter().any(|row| !row[c].is_empty()))
        .collect();
    for row in cells.iter_mut() {
        let mut column = 0;
        row.retain(|_| {
            let kept = keep[column];
            column += 1;
            kept
        });
    }
}

/// Run every strategy on a page. Grids with identical content are kept once.
pub fn page_grids(page: &PageLayout, config: &ExtractionConfig) -> Vec<Grid> {
    let mut grids: Vec<Grid> = Vec::new();
    for strategy in GridStrategy::ALL {
        if let Some(grid) = detect_grid(page, strategy, config) {
            if !grids.iter().any(|kept| kept.cells == grid.cells) {
                grids.push(grid);
            }
        }
    }
    grids
}
