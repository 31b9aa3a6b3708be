pub(crate) mod ranges;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::filters::ranges::utc_selection_instant;

/// Which measured quantity (or display mode) the dashboard is showing.
/// The wire tokens are fixed by the pricing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Price,
    SolarCapture,
    WindCapture,
    NegativeHours,
    Nodes,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Price => "price",
            DataType::SolarCapture => "solar_capture",
            DataType::WindCapture => "wind_capture",
            DataType::NegativeHours => "negative_hours",
            DataType::Nodes => "nodes",
        }
    }

    /// The three price-family types are the only ones the congestion
    /// panel accepts.
    pub fn is_price_family(&self) -> bool {
        matches!(
            self,
            DataType::Price | DataType::SolarCapture | DataType::WindCapture
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    Avg,
    Max,
    Min,
    Sum,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Avg => "avg",
            AggregationType::Max => "max",
            AggregationType::Min => "min",
            AggregationType::Sum => "sum",
        }
    }
}

/// The current filter selection. Query parameters are always derived
/// from a snapshot of this record at request time, never cached.
///
/// There is deliberately no stored `date` field: the single-instant
/// view is computed on read by [`Selection::selected_instant`], so the
/// calendar fields and the instant can never drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub node1: Option<i64>,
    pub node2: Option<i64>,
    pub data_type: DataType,
    pub aggregation: AggregationType,
    pub market: String,
}

impl Selection {
    /// Hardcoded process-start defaults: the current UTC year, prices,
    /// averages, ERCOT.
    pub fn defaults() -> Self {
        Self {
            year: Some(Utc::now().year()),
            month: None,
            day: None,
            hour: None,
            node1: None,
            node2: None,
            data_type: DataType::Price,
            aggregation: AggregationType::Avg,
            market: "ERCOT".to_string(),
        }
    }

    /// The four calendar fields combined into one instant, or `None`
    /// when no year is selected. Month and day default to 1, hour to 0.
    pub fn selected_instant(&self) -> Option<DateTime<Utc>> {
        self.year.map(|year| {
            utc_selection_instant(
                year,
                self.month.unwrap_or(1),
                self.day.unwrap_or(1),
                self.hour.unwrap_or(0),
            )
        })
    }
}

/// Owner of the live selection. Setters replace a single field each and
/// do no cross-field recomputation; `reset` restores a fresh clone of
/// the construction-time defaults.
#[derive(Debug, Clone)]
pub struct FilterStore {
    current: Selection,
    defaults: Selection,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterStore {
    pub fn new() -> Self {
        let defaults = Selection::defaults();
        Self {
            current: defaults.clone(),
            defaults,
        }
    }

    /// Owned copy of the current selection. Readers derive everything
    /// from such a snapshot, so they never observe a half-applied
    /// update.
    pub fn snapshot(&self) -> Selection {
        self.current.clone()
    }

    pub fn set_year(&mut self, year: Option<i32>) {
        self.current.year = year;
    }

    pub fn set_month(&mut self, month: Option<u32>) {
        self.current.month = month;
    }

    pub fn set_day(&mut self, day: Option<u32>) {
        self.current.day = day;
    }

    pub fn set_hour(&mut self, hour: Option<u32>) {
        self.current.hour = hour;
    }

    pub fn set_node1(&mut self, node: Option<i64>) {
        self.current.node1 = node;
    }

    pub fn set_node2(&mut self, node: Option<i64>) {
        self.current.node2 = node;
    }

    pub fn set_data_type(&mut self, data_type: DataType) {
        self.current.data_type = data_type;
    }

    pub fn set_aggregation(&mut self, aggregation: AggregationType) {
        self.current.aggregation = aggregation;
    }

    pub fn set_market(&mut self, market: String) {
        self.current.market = market;
    }

    /// Spread an instant across the four calendar fields, truncated to
    /// the whole hour (the date picker never carries minutes).
    pub fn set_datetime(&mut self, instant: DateTime<Utc>) {
        self.current.year = Some(instant.year());
        self.current.month = Some(instant.month());
        self.current.day = Some(instant.day());
        self.current.hour = Some(instant.hour());
    }

    pub fn reset(&mut self) {
        self.current = self.defaults.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_defaults() {
        let store = FilterStore::new();
        let sel = store.snapshot();
        assert_eq!(sel.year, Some(Utc::now().year()));
        assert_eq!(sel.month, None);
        assert_eq!(sel.node1, None);
        assert_eq!(sel.data_type, DataType::Price);
        assert_eq!(sel.aggregation, AggregationType::Avg);
        assert_eq!(sel.market, "ERCOT");
    }

    #[test]
    fn test_wire_tokens() {
        assert_eq!(
            serde_json::to_string(&DataType::SolarCapture).unwrap(),
            "\"solar_capture\""
        );
        assert_eq!(serde_json::to_string(&DataType::Nodes).unwrap(), "\"nodes\"");
        assert_eq!(
            serde_json::to_string(&AggregationType::Sum).unwrap(),
            "\"sum\""
        );
        assert_eq!(DataType::NegativeHours.as_str(), "negative_hours");
    }

    #[test]
    fn test_setters_touch_one_field_each() {
        let mut store = FilterStore::new();
        store.set_year(Some(2022));
        store.set_month(Some(6));
        store.set_node1(Some(42));
        store.set_market("MDA".to_string());

        let sel = store.snapshot();
        assert_eq!(sel.year, Some(2022));
        assert_eq!(sel.month, Some(6));
        assert_eq!(sel.day, None);
        assert_eq!(sel.node1, Some(42));
        assert_eq!(sel.node2, None);
        assert_eq!(sel.market, "MDA");
    }

    #[test]
    fn test_reset_restores_initial_snapshot() {
        let mut store = FilterStore::new();
        let initial = store.snapshot();

        store.set_year(Some(1999));
        store.set_month(Some(12));
        store.set_day(Some(31));
        store.set_hour(Some(23));
        store.set_node1(Some(1));
        store.set_node2(Some(2));
        store.set_data_type(DataType::WindCapture);
        store.set_aggregation(AggregationType::Max);
        store.set_market("CAISO".to_string());

        store.reset();
        assert_eq!(store.snapshot(), initial);

        // A post-reset snapshot is its own object: mutating the store
        // afterwards must not reach through it.
        let after_reset = store.snapshot();
        store.set_year(Some(1970));
        assert_eq!(after_reset, initial);
    }

    #[test]
    fn test_set_datetime_truncates_to_hour() {
        let mut store = FilterStore::new();
        let picked = Utc.with_ymd_and_hms(2025, 12, 1, 9, 45, 30).unwrap();
        store.set_datetime(picked);

        let sel = store.snapshot();
        assert_eq!(sel.year, Some(2025));
        assert_eq!(sel.month, Some(12));
        assert_eq!(sel.day, Some(1));
        assert_eq!(sel.hour, Some(9));

        // Round-trips through the derived instant with minutes zeroed.
        let instant = sel.selected_instant().unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_selected_instant_defaults_and_sentinel() {
        let mut store = FilterStore::new();
        store.set_year(Some(2024));
        store.set_month(None);
        store.set_day(None);
        store.set_hour(None);
        assert_eq!(
            store.snapshot().selected_instant().unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );

        store.set_year(None);
        assert_eq!(store.snapshot().selected_instant(), None);
    }
}
