use chrono::{Datelike, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::filters::ranges::{
    day_range, heatmap_timestamp, to_wire, utc_selection_instant, year_range,
    EVOLUTION_FALLBACK_DAY, EVOLUTION_FALLBACK_HOUR,
};
use crate::filters::{DataType, Selection};
use crate::grid::palette::{color_for, status_color_for, text_color_for};
use crate::grid::{category_of, grid_cell_number, Category};
use crate::pricing::{
    AggregatedStats, CongestionPoint, MonthlyComparison, PricingClient, PricingError,
    RankedNodePrice, StatusIndicator, VoronoiMap,
};

/// Parameters for the map, status and distribution endpoints, which all
/// key on a single representative instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotQuery {
    pub timestamp: String,
    pub market: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionQuery {
    pub node_id: i64,
    pub year: i32,
    pub day: u32,
    pub hour: u32,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionQuery {
    pub node1_id: i64,
    pub node2_id: i64,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsQuery {
    pub node_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub data_type: DataType,
}

/// The per-panel parameter sets derived from one selection snapshot.
/// Map and status are always fetched; the time-series panels carry
/// their gating in the Option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub map: SnapshotQuery,
    pub status: SnapshotQuery,
    pub evolution: Option<EvolutionQuery>,
    pub distribution: Option<SnapshotQuery>,
    pub congestion: Option<CongestionQuery>,
    pub stats: Option<StatsQuery>,
}

impl QueryPlan {
    /// Derive every panel's parameters from the selection as it stands
    /// right now. Gating rules:
    ///
    /// - evolution, distribution and stats need node1 and a year;
    /// - congestion additionally needs node2 and one of the three
    ///   price-family data types;
    /// - the grid-cell identifier mode feeds only the map and status
    ///   panels, so it suppresses all of the above.
    pub fn derive(selection: &Selection) -> Self {
        let snapshot = SnapshotQuery {
            timestamp: to_wire(heatmap_timestamp(selection.year, selection.month)),
            market: selection.market.clone(),
            data_type: selection.data_type,
        };

        let time_series_active = selection.node1.is_some()
            && selection.year.is_some()
            && selection.data_type != DataType::Nodes;

        let evolution = match (time_series_active, selection.node1, selection.year) {
            (true, Some(node_id), Some(year)) => Some(EvolutionQuery {
                node_id,
                year,
                day: selection.day.unwrap_or(EVOLUTION_FALLBACK_DAY),
                hour: selection.hour.unwrap_or(EVOLUTION_FALLBACK_HOUR),
                data_type: selection.data_type,
            }),
            _ => None,
        };

        let distribution = time_series_active.then(|| snapshot.clone());

        let congestion = match (time_series_active, selection.node1, selection.node2) {
            (true, Some(node1_id), Some(node2_id))
                if selection.data_type.is_price_family() =>
            {
                let range = day_range(selection.year, selection.month, selection.day);
                // The sentinel range means no year is selected; never
                // send it over the wire.
                (!range.is_empty()).then(|| CongestionQuery {
                    node1_id,
                    node2_id,
                    start_date: range.start,
                    end_date: range.end,
                })
            }
            _ => None,
        };

        let stats = match (time_series_active, selection.node1) {
            (true, Some(node_id)) => {
                let range = year_range(selection.year);
                Some(StatsQuery {
                    node_id,
                    start_date: range.start,
                    end_date: range.end,
                    data_type: selection.data_type,
                })
            }
            _ => None,
        };

        Self {
            map: snapshot.clone(),
            status: snapshot,
            evolution,
            distribution,
            congestion,
            stats,
        }
    }
}

/// Outcome of one panel's fetch. Failures stay local to the panel, and
/// an empty result is a state of its own, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    Empty,
    Failed(String),
    NotRequested,
}

impl<T> Panel<T> {
    fn from_fetch(
        name: &str,
        result: Result<T, PricingError>,
        is_empty: impl FnOnce(&T) -> bool,
    ) -> Self {
        match result {
            Ok(data) if is_empty(&data) => Panel::Empty,
            Ok(data) => Panel::Ready(data),
            Err(err) => {
                tracing::warn!(panel = name, error = %err, "panel fetch failed");
                Panel::Failed(err.to_string())
            }
        }
    }
}

/// One status circle: the measured (or overridden) value plus its
/// presentation colors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEntry {
    pub node_id: i64,
    pub code: String,
    pub name: String,
    pub value: Option<f64>,
    pub color: &'static str,
    pub fill: &'static str,
    pub text_color: &'static str,
}

/// The three status columns, in server feature order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusPanel {
    pub hubs: Vec<StatusEntry>,
    pub load_zones: Vec<StatusEntry>,
    pub reserves: Vec<StatusEntry>,
}

/// In grid-cell identifier mode the displayed scalar is the fixed cell
/// number, never the measured quantity. Kept apart from the measured
/// path on purpose.
fn display_value(name: &str, measured: Option<f64>, data_type: DataType) -> Option<f64> {
    if data_type == DataType::Nodes {
        grid_cell_number(name).map(f64::from)
    } else {
        measured
    }
}

/// Bucket the flat indicator list into the hub/load-zone/reserve
/// columns, attaching status and palette colors. Stable with respect to
/// input order; unclassified names are dropped.
pub fn build_status_panel(indicators: &[StatusIndicator], data_type: DataType) -> StatusPanel {
    let mut panel = StatusPanel::default();
    for indicator in indicators {
        let Some(category) = category_of(&indicator.name) else {
            continue;
        };
        let value = display_value(&indicator.name, indicator.value, data_type);
        let entry = StatusEntry {
            node_id: indicator.node_id,
            code: indicator.code.clone(),
            name: indicator.name.clone(),
            value,
            color: status_color_for(value),
            fill: color_for(value),
            text_color: text_color_for(value),
        };
        match category {
            Category::Hub => panel.hubs.push(entry),
            Category::LoadZone => panel.load_zones.push(entry),
            Category::Reserve => panel.reserves.push(entry),
        }
    }
    panel
}

/// Everything the dashboard shows for one selection snapshot, each
/// panel resolved independently.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub plan: QueryPlan,
    pub map: Panel<VoronoiMap>,
    pub status: Panel<StatusPanel>,
    pub evolution: Panel<MonthlyComparison>,
    pub distribution: Panel<Vec<RankedNodePrice>>,
    pub congestion: Panel<Vec<CongestionPoint>>,
    pub stats: Panel<AggregatedStats>,
}

/// Fan out all panel fetches for the given selection and collect their
/// independent outcomes. Requests run concurrently with no ordering,
/// deduplication or cancellation between them; each panel reflects only
/// its own response.
pub async fn refresh_dashboard(client: &PricingClient, selection: &Selection) -> DashboardSnapshot {
    let plan = QueryPlan::derive(selection);
    let data_type = selection.data_type;

    let map_fut = async {
        Panel::from_fetch(
            "map",
            client
                .voronoi_map(&plan.map.timestamp, &plan.map.market, plan.map.data_type)
                .await,
            |map| map.features.is_empty(),
        )
    };

    let status_fut = async {
        match client
            .status_indicators(&plan.status.timestamp, &plan.status.market, plan.status.data_type)
            .await
        {
            Ok(list) if list.is_empty() => Panel::Empty,
            Ok(list) => Panel::Ready(build_status_panel(&list, data_type)),
            Err(err) => {
                tracing::warn!(panel = "status", error = %err, "panel fetch failed");
                Panel::Failed(err.to_string())
            }
        }
    };

    let evolution_fut = async {
        match &plan.evolution {
            None => Panel::NotRequested,
            Some(q) => Panel::from_fetch(
                "evolution",
                client
                    .monthly_comparison(q.node_id, q.year, q.day, q.hour, q.data_type)
                    .await,
                |c| c.data.is_empty(),
            ),
        }
    };

    let distribution_fut = async {
        match &plan.distribution {
            None => Panel::NotRequested,
            Some(q) => Panel::from_fetch(
                "distribution",
                client
                    .all_nodes_distribution(&q.timestamp, &q.market, q.data_type)
                    .await,
                |ranked| ranked.is_empty(),
            ),
        }
    };

    let congestion_fut = async {
        match &plan.congestion {
            None => Panel::NotRequested,
            Some(q) => Panel::from_fetch(
                "congestion",
                client
                    .congestion(q.node1_id, q.node2_id, &q.start_date, &q.end_date)
                    .await,
                |points| points.is_empty(),
            ),
        }
    };

    let stats_fut = async {
        match &plan.stats {
            None => Panel::NotRequested,
            Some(q) => Panel::from_fetch(
                "stats",
                client
                    .aggregated_stats(q.node_id, &q.start_date, &q.end_date, q.data_type)
                    .await,
                |stats| stats.count == 0,
            ),
        }
    };

    let (map, status, evolution, distribution, congestion, stats) = tokio::join!(
        map_fut,
        status_fut,
        evolution_fut,
        distribution_fut,
        congestion_fut,
        stats_fut
    );

    DashboardSnapshot {
        plan,
        map,
        status,
        evolution,
        distribution,
        congestion,
        stats,
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("select at least one node before exporting")]
    MissingNode1,
}

/// Body of an export request; the spreadsheet itself is produced
/// elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub node_ids: Vec<i64>,
    pub start_date: String,
    pub end_date: String,
    pub data_type: DataType,
    pub include_aggregations: bool,
}

/// Derive the export request from the selection, rejecting it before
/// any request goes out when no primary node is chosen. The range spans
/// the selected (or current) year, closed at the next Jan 1.
pub fn export_request(selection: &Selection) -> Result<ExportRequest, SelectionError> {
    let Some(node1) = selection.node1 else {
        return Err(SelectionError::MissingNode1);
    };

    let mut node_ids = vec![node1];
    if let Some(node2) = selection.node2 {
        node_ids.push(node2);
    }

    let year = selection.year.unwrap_or_else(|| Utc::now().year());
    Ok(ExportRequest {
        node_ids,
        start_date: to_wire(utc_selection_instant(year, 1, 1, 0)),
        end_date: to_wire(utc_selection_instant(year + 1, 1, 1, 0)),
        data_type: selection.data_type,
        include_aggregations: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::AggregationType;

    fn selection() -> Selection {
        Selection {
            year: Some(2024),
            month: Some(3),
            day: None,
            hour: None,
            node1: Some(10),
            node2: Some(20),
            data_type: DataType::Price,
            aggregation: AggregationType::Avg,
            market: "ERCOT".to_string(),
        }
    }

    #[test]
    fn test_full_plan() {
        let plan = QueryPlan::derive(&selection());

        assert_eq!(plan.map.timestamp, "2024-03-01T01:00:00Z");
        assert_eq!(plan.map.market, "ERCOT");
        assert_eq!(plan.status, plan.map);

        let evolution = plan.evolution.unwrap();
        assert_eq!(evolution.node_id, 10);
        assert_eq!(evolution.year, 2024);
        assert_eq!(evolution.day, EVOLUTION_FALLBACK_DAY);
        assert_eq!(evolution.hour, EVOLUTION_FALLBACK_HOUR);

        assert_eq!(plan.distribution.unwrap().timestamp, "2024-03-01T01:00:00Z");

        let congestion = plan.congestion.unwrap();
        assert_eq!(congestion.node1_id, 10);
        assert_eq!(congestion.node2_id, 20);
        assert_eq!(congestion.start_date, "2024-03-01T00:00:00Z");
        assert_eq!(congestion.end_date, "2024-03-31T23:59:59Z");

        let stats = plan.stats.unwrap();
        assert_eq!(stats.start_date, "2024-01-01T00:00:00Z");
        assert_eq!(stats.end_date, "2024-12-31T23:59:59Z");
    }

    #[test]
    fn test_selected_day_and_hour_flow_into_the_plan() {
        let mut sel = selection();
        sel.day = Some(15);
        sel.hour = Some(9);
        let plan = QueryPlan::derive(&sel);

        let evolution = plan.evolution.unwrap();
        assert_eq!(evolution.day, 15);
        assert_eq!(evolution.hour, 9);

        let congestion = plan.congestion.unwrap();
        assert_eq!(congestion.start_date, "2024-03-15T00:00:00Z");
        assert_eq!(congestion.end_date, "2024-03-15T23:59:59Z");
    }

    #[test]
    fn test_grid_cell_mode_suppresses_all_time_series_panels() {
        let mut sel = selection();
        sel.data_type = DataType::Nodes;
        let plan = QueryPlan::derive(&sel);

        assert!(plan.evolution.is_none());
        assert!(plan.distribution.is_none());
        assert!(plan.congestion.is_none());
        assert!(plan.stats.is_none());
        // The map and status snapshots still go out.
        assert_eq!(plan.map.data_type, DataType::Nodes);
    }

    #[test]
    fn test_node1_and_year_gate() {
        let mut sel = selection();
        sel.node1 = None;
        let plan = QueryPlan::derive(&sel);
        assert!(plan.evolution.is_none());
        assert!(plan.distribution.is_none());
        assert!(plan.congestion.is_none());
        assert!(plan.stats.is_none());

        let mut sel = selection();
        sel.year = None;
        let plan = QueryPlan::derive(&sel);
        assert!(plan.evolution.is_none());
        assert!(plan.stats.is_none());
    }

    #[test]
    fn test_congestion_gates() {
        let mut sel = selection();
        sel.node2 = None;
        assert!(QueryPlan::derive(&sel).congestion.is_none());
        assert!(QueryPlan::derive(&sel).evolution.is_some());

        let mut sel = selection();
        sel.data_type = DataType::NegativeHours;
        let plan = QueryPlan::derive(&sel);
        assert!(plan.congestion.is_none());
        assert!(plan.evolution.is_some());

        sel.data_type = DataType::WindCapture;
        assert!(QueryPlan::derive(&sel).congestion.is_some());
    }

    fn indicator(node_id: i64, name: &str, value: Option<f64>) -> StatusIndicator {
        StatusIndicator {
            node_id,
            code: name.to_string(),
            name: name.to_string(),
            zone: None,
            value,
        }
    }

    #[test]
    fn test_status_panel_assembly() {
        let indicators = vec![
            indicator(1, "HB_WEST", Some(-4.2)),
            indicator(2, "LZ_NORTH", Some(61.0)),
            indicator(3, "UNKNOWN_RN", Some(10.0)),
            indicator(4, "RRS", None),
        ];
        let panel = build_status_panel(&indicators, DataType::Price);

        assert_eq!(panel.hubs.len(), 1);
        assert_eq!(panel.load_zones.len(), 1);
        assert_eq!(panel.reserves.len(), 1);

        let hub = &panel.hubs[0];
        assert_eq!(hub.value, Some(-4.2));
        assert_eq!(hub.color, "#FF0000");
        assert_eq!(hub.fill, "#4169E1");
        assert_eq!(hub.text_color, "#1A1A1A");

        let zone = &panel.load_zones[0];
        assert_eq!(zone.color, "#00FF00");
        assert_eq!(zone.fill, "#FF8C00");
        assert_eq!(zone.text_color, "#FFFFFF");

        let reserve = &panel.reserves[0];
        assert_eq!(reserve.value, None);
        assert_eq!(reserve.color, "#CCCCCC");
    }

    #[test]
    fn test_grid_cell_mode_overrides_measured_values() {
        let indicators = vec![
            indicator(1, "HB_HUSTON", Some(-99.0)),
            indicator(2, "Non-Spin", None),
        ];
        let panel = build_status_panel(&indicators, DataType::Nodes);

        // Cell numbers replace the measured values entirely.
        assert_eq!(panel.hubs[0].value, Some(151.0));
        assert_eq!(panel.hubs[0].color, "#00FF00");
        assert_eq!(panel.hubs[0].fill, "#8B0000");
        assert_eq!(panel.reserves[0].value, Some(166.0));
    }

    #[test]
    fn test_export_request_requires_node1() {
        let mut sel = selection();
        sel.node1 = None;
        assert_eq!(export_request(&sel), Err(SelectionError::MissingNode1));
    }

    #[test]
    fn test_export_request_spans_the_selected_year() {
        let request = export_request(&selection()).unwrap();
        assert_eq!(request.node_ids, vec![10, 20]);
        assert_eq!(request.start_date, "2024-01-01T00:00:00Z");
        assert_eq!(request.end_date, "2025-01-01T00:00:00Z");
        assert!(request.include_aggregations);

        let mut sel = selection();
        sel.node2 = None;
        assert_eq!(export_request(&sel).unwrap().node_ids, vec![10]);
    }
}
