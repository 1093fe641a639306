//! Persisted UI state: chart layout order, per-chart display settings and
//! the catalog status filter.

use crate::chart::{ChartId, ChartPreference};
use crate::store::{KvStore, Result};

const ORDER_KEY: &str = "prefs:chartOrder";
const STATUS_FILTER_KEY: &str = "prefs:statusFilter";
const CHART_PREFIX: &str = "prefs:chart:";

pub struct Preferences<S> {
    store: S,
}

impl<S: KvStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Saved chart order. Unknown ids are dropped and charts missing from
    /// the saved list are appended in default order.
    pub fn chart_order(&self) -> Result<Vec<ChartId>> {
        let saved: Vec<String> = self.store.get_json(ORDER_KEY)?.unwrap_or_default();
        let mut order: Vec<ChartId> = Vec::with_capacity(ChartId::ALL.len());
        for raw in &saved {
            match raw.parse::<ChartId>() {
                Ok(id) if !order.contains(&id) => order.push(id),
                Ok(_) => {}
                Err(e) => log::debug!("Dropping saved chart order entry: {e}"),
            }
        }
        for id in ChartId::ALL {
            if !order.contains(&id) {
                order.push(id);
            }
        }
        Ok(order)
    }

    pub fn set_chart_order(&mut self, order: &[ChartId]) -> Result<()> {
        let names: Vec<&str> = order.iter().map(ChartId::as_str).collect();
        self.store.set_json(ORDER_KEY, &names)
    }

    /// Move one chart to `position` (clamped), shifting the rest.
    pub fn move_chart(&mut self, id: ChartId, position: usize) -> Result<Vec<ChartId>> {
        let mut order = self.chart_order()?;
        order.retain(|c| *c != id);
        order.insert(position.min(order.len()), id);
        self.set_chart_order(&order)?;
        Ok(order)
    }

    pub fn reset_chart_order(&mut self) -> Result<()> {
        self.store.clear(ORDER_KEY)
    }

    fn chart_key(id: ChartId) -> String {
        format!("{CHART_PREFIX}{id}")
    }

    /// Stored settings for a chart, defaults when none are saved.
    pub fn chart_pref(&self, id: ChartId) -> Result<ChartPreference> {
        Ok(self.store.get_json(&Self::chart_key(id))?.unwrap_or_default())
    }

    pub fn set_chart_pref(&mut self, id: ChartId, pref: &ChartPreference) -> Result<()> {
        self.store.set_json(&Self::chart_key(id), pref)
    }

    pub fn reset_chart_pref(&mut self, id: ChartId) -> Result<()> {
        self.store.clear(&Self::chart_key(id))
    }

    pub fn status_filter(&self) -> Result<Option<String>> {
        Ok(self.store.get(STATUS_FILTER_KEY)?.filter(|s| !s.is_empty()))
    }

    /// `None` clears the filter.
    pub fn set_status_filter(&mut self, status: Option<&str>) -> Result<()> {
        match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => self.store.set(STATUS_FILTER_KEY, s),
            None => self.store.clear(STATUS_FILTER_KEY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartSize, LegendPosition};
    use crate::store::MemoryStore;

    #[test]
    fn test_default_order() {
        let prefs = Preferences::new(MemoryStore::new());
        assert_eq!(prefs.chart_order().unwrap(), ChartId::ALL.to_vec());
    }

    #[test]
    fn test_saved_order_is_repaired() {
        let mut store = MemoryStore::new();
        store
            .set(ORDER_KEY, r#"["monthly-minutes", "retired-chart", "yearly-hours", "monthly-minutes"]"#)
            .unwrap();
        let prefs = Preferences::new(store);
        let order = prefs.chart_order().unwrap();

        assert_eq!(order.len(), ChartId::ALL.len());
        assert_eq!(order[0], ChartId::MonthlyMinutes);
        assert_eq!(order[1], ChartId::YearlyHours);
        assert_eq!(order[2], ChartId::YearlyEpisodes);
    }

    #[test]
    fn test_garbage_order_falls_back() {
        let mut store = MemoryStore::new();
        store.set(ORDER_KEY, "{not json").unwrap();
        let prefs = Preferences::new(store);
        assert_eq!(prefs.chart_order().unwrap(), ChartId::ALL.to_vec());
    }

    #[test]
    fn test_move_chart() {
        let mut prefs = Preferences::new(MemoryStore::new());
        let order = prefs.move_chart(ChartId::DailyMinutes, 0).unwrap();
        assert_eq!(order[0], ChartId::DailyMinutes);
        assert_eq!(prefs.chart_order().unwrap(), order);

        let order = prefs.move_chart(ChartId::DailyMinutes, 999).unwrap();
        assert_eq!(order.last(), Some(&ChartId::DailyMinutes));

        prefs.reset_chart_order().unwrap();
        assert_eq!(prefs.chart_order().unwrap(), ChartId::ALL.to_vec());
    }

    #[test]
    fn test_chart_pref_round_trip() {
        let mut prefs = Preferences::new(MemoryStore::new());
        assert_eq!(prefs.chart_pref(ChartId::TopGenres).unwrap(), ChartPreference::default());

        let pref = ChartPreference {
            size: ChartSize::Small,
            legend: LegendPosition::Right,
            y_max: Some(10.0),
            ..Default::default()
        };
        prefs.set_chart_pref(ChartId::TopGenres, &pref).unwrap();
        assert_eq!(prefs.chart_pref(ChartId::TopGenres).unwrap(), pref);
        assert_eq!(prefs.chart_pref(ChartId::TopStudios).unwrap(), ChartPreference::default());

        prefs.reset_chart_pref(ChartId::TopGenres).unwrap();
        assert_eq!(prefs.chart_pref(ChartId::TopGenres).unwrap(), ChartPreference::default());
    }

    #[test]
    fn test_status_filter() {
        let mut prefs = Preferences::new(MemoryStore::new());
        assert_eq!(prefs.status_filter().unwrap(), None);
        prefs.set_status_filter(Some(" Finished ")).unwrap();
        assert_eq!(prefs.status_filter().unwrap().as_deref(), Some("Finished"));
        prefs.set_status_filter(None).unwrap();
        assert_eq!(prefs.status_filter().unwrap(), None);
    }
}
