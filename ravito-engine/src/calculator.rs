//! Replenishment calculation.
//!
//! Joins the active orders, stock, and transit sessions on (depot, article)
//! and computes what must leave the central warehouse over the requested
//! horizon:
//!
//! - demand   = ordered_qty × days (the orders file carries no dates, so
//!              the demand window degenerates to one reference day)
//! - supply   = free depot stock + quantity already in transit
//! - to_ship  = max(0, demand − supply)
//! - pallets  = ceil(to_ship / K) with the article's pallet size K
//!
//! Every depot rolls up into pallet totals and whole trucks of
//! [`TRUCK_CAPACITY`]. All arithmetic is integer; output order is fixed
//! (depot ascending, article ascending); a call either produces the whole
//! result or fails.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::config::DepotConfiguration;
use crate::error::{EngineError, EngineResult};
use crate::session::{Session, SessionStore};
use crate::types::{Packaging, Records, SessionKind, Sourcing, TRUCK_CAPACITY};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
pub struct CalculationRequest {
    /// Planning horizon in days. Must be ≥ 1.
    pub days: i64,
    /// Case-insensitive substring match on the article code.
    #[serde(default)]
    pub product_filter: Option<String>,
    /// Exact packaging family.
    #[serde(default)]
    pub packaging_filter: Option<String>,
}

/// Row status after comparing demand with supply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    /// Demand fully covered, nothing to ship.
    Ok,
    /// Shipment required and coverable from central stock.
    Ship,
    /// Shipment required but central on-hand cannot cover it.
    Critical,
}

/// One (depot, article) output row.
#[derive(Clone, Debug, Serialize)]
pub struct CalculationRow {
    pub depot: String,
    pub article: String,
    pub packaging: Packaging,
    pub ordered_qty: i64,
    pub free_stock_qty: i64,
    pub in_transit_qty: i64,
    pub demand: i64,
    pub quantity_to_ship: i64,
    pub products_per_pallet: i64,
    pub pallets_needed: i64,
    /// Whole days the current supply covers at the observed daily rate.
    /// `None` when the daily rate is zero (coverage is unbounded).
    pub days_of_coverage: Option<i64>,
    pub status: RowStatus,
    pub sourcing: Sourcing,
    pub sourcing_label: String,
}

/// Whether a depot's plan fills at least one whole truck.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryEfficiency {
    Efficient,
    Inefficient,
}

/// Per-depot roll-up.
#[derive(Clone, Debug, Serialize)]
pub struct DepotSummary {
    pub depot: String,
    pub total_items: usize,
    pub total_quantity: i64,
    pub total_pallets: i64,
    pub trucks_needed: i64,
    /// Pallets in the last, partially loaded truck (`total_pallets mod 24`).
    pub fill_ratio: i64,
    pub delivery_efficiency: DeliveryEfficiency,
}

/// Whole-call statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CalculationStats {
    pub total_depots: usize,
    pub total_items: usize,
    pub total_quantity_to_ship: i64,
    pub total_pallets: i64,
    pub requested_days: i64,
    pub local_items: usize,
    pub external_items: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct CalculationResult {
    pub calculations: Vec<CalculationRow>,
    pub depot_summary: Vec<DepotSummary>,
    pub summary: CalculationStats,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Ceiling division for non-negative quantities.
fn ceil_div(quantity: i64, per_pallet: i64) -> i64 {
    if quantity <= 0 || per_pallet <= 0 {
        return 0;
    }
    (quantity + per_pallet - 1) / per_pallet
}

/// Demand aggregated over the order lines of one (depot, article) pair.
#[derive(Debug)]
struct OrderAggregate {
    ordered_qty: i64,
    free_stock_qty: i64,
    packaging: Packaging,
    products_per_pallet: i64,
}

/// Run the calculation against the store's current active sessions.
///
/// The orders session is required; stock and transit default to all-zero.
/// Snapshots are taken once at entry, so a concurrent upload never mixes
/// into a running calculation.
pub fn calculate(
    store: &SessionStore,
    config: &DepotConfiguration,
    request: &CalculationRequest,
) -> EngineResult<CalculationResult> {
    if request.days < 1 {
        return Err(EngineError::InvalidParameter {
            name: "days",
            reason: format!("must be ≥ 1, got {}", request.days),
        });
    }
    let packaging_filter = match request.packaging_filter.as_deref() {
        None | Some("") => None,
        Some(token) => Some(Packaging::parse(token).ok_or_else(|| {
            EngineError::InvalidParameter {
                name: "packaging_filter",
                reason: format!("unknown packaging '{token}'"),
            }
        })?),
    };

    let orders = store
        .get_active(SessionKind::Orders)
        .ok_or(EngineError::MissingInputs(SessionKind::Orders))?;
    let stock = store.get_active(SessionKind::Stock);
    let transit = store.get_active(SessionKind::Transit);

    let central_stock = stock_index(stock.as_deref());
    let transit_qty = transit_index(transit.as_deref());

    let Records::Orders(order_lines) = &orders.records else {
        return Err(EngineError::Internal(
            "orders session does not hold order records".into(),
        ));
    };

    // Aggregate order lines per (depot, article). BTreeMap keys give the
    // fixed (depot asc, article asc) output order for free.
    let product_filter = request
        .product_filter
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_lowercase);

    let mut aggregates: BTreeMap<(String, String), OrderAggregate> = BTreeMap::new();
    for line in order_lines {
        if let Some(ref needle) = product_filter {
            if !line.article.to_lowercase().contains(needle) {
                continue;
            }
        }
        if let Some(packaging) = packaging_filter {
            if line.packaging != packaging {
                continue;
            }
        }
        if !config.allows(&line.depot, &line.article) {
            continue;
        }

        aggregates
            .entry((line.depot.clone(), line.article.clone()))
            .and_modify(|agg| {
                agg.ordered_qty += line.ordered_qty;
                // Free stock is a level, not a flow: the latest line wins.
                agg.free_stock_qty = line.free_stock_qty;
            })
            .or_insert(OrderAggregate {
                ordered_qty: line.ordered_qty,
                free_stock_qty: line.free_stock_qty,
                // Packaging and pallet size tie-break on first-seen.
                packaging: line.packaging,
                products_per_pallet: line.products_per_pallet,
            });
    }

    let mut calculations = Vec::with_capacity(aggregates.len());
    for ((depot, article), agg) in aggregates {
        let daily_rate = agg.ordered_qty;
        let demand = daily_rate * request.days;
        let in_transit_qty = transit_qty
            .get(&(article.clone(), depot.clone()))
            .copied()
            .unwrap_or(0);
        let supply = agg.free_stock_qty + in_transit_qty;
        let quantity_to_ship = (demand - supply).max(0);
        let pallets_needed = ceil_div(quantity_to_ship, agg.products_per_pallet);

        let central_on_hand = central_stock.get(article.as_str()).copied().unwrap_or(0);
        let status = if quantity_to_ship == 0 {
            RowStatus::Ok
        } else if central_on_hand < quantity_to_ship {
            RowStatus::Critical
        } else {
            RowStatus::Ship
        };

        let days_of_coverage = if daily_rate > 0 {
            Some(supply / daily_rate)
        } else {
            None
        };

        let sourcing = catalog::classify(&article);
        calculations.push(CalculationRow {
            depot,
            article,
            packaging: agg.packaging,
            ordered_qty: agg.ordered_qty,
            free_stock_qty: agg.free_stock_qty,
            in_transit_qty,
            demand,
            quantity_to_ship,
            products_per_pallet: agg.products_per_pallet,
            pallets_needed,
            days_of_coverage,
            status,
            sourcing,
            sourcing_label: sourcing.label().to_string(),
        });
    }

    let depot_summary = summarize_depots(&calculations);
    let summary = CalculationStats {
        total_depots: depot_summary.len(),
        total_items: calculations.len(),
        total_quantity_to_ship: calculations.iter().map(|r| r.quantity_to_ship).sum(),
        total_pallets: calculations.iter().map(|r| r.pallets_needed).sum(),
        requested_days: request.days,
        local_items: calculations
            .iter()
            .filter(|r| r.sourcing == Sourcing::Local)
            .count(),
        external_items: calculations
            .iter()
            .filter(|r| r.sourcing == Sourcing::External)
            .count(),
    };

    Ok(CalculationResult {
        calculations,
        depot_summary,
        summary,
    })
}

/// Central on-hand quantity per article. Missing session reads as empty.
fn stock_index(session: Option<&Session>) -> HashMap<String, i64> {
    let mut index = HashMap::new();
    if let Some(Records::Stock(stocks)) = session.map(|s| &s.records) {
        for stock in stocks {
            *index.entry(stock.article.clone()).or_insert(0) += stock.on_hand_qty;
        }
    }
    index
}

/// In-transit quantity per (article, destination depot), summed across
/// shipment lines. Missing session reads as empty.
fn transit_index(session: Option<&Session>) -> HashMap<(String, String), i64> {
    let mut index = HashMap::new();
    if let Some(Records::Transit(lines)) = session.map(|s| &s.records) {
        for line in lines {
            *index
                .entry((line.article.clone(), line.dest_depot.clone()))
                .or_insert(0) += line.in_transit_qty;
        }
    }
    index
}

/// Roll rows up per depot. Rows arrive depot-sorted, so one linear pass
/// suffices and the summary inherits the ordering.
fn summarize_depots(rows: &[CalculationRow]) -> Vec<DepotSummary> {
    let mut summaries: Vec<DepotSummary> = Vec::new();
    for row in rows {
        match summaries.last_mut() {
            Some(summary) if summary.depot == row.depot => {
                summary.total_items += 1;
                summary.total_quantity += row.quantity_to_ship;
                summary.total_pallets += row.pallets_needed;
            }
            _ => summaries.push(DepotSummary {
                depot: row.depot.clone(),
                total_items: 1,
                total_quantity: row.quantity_to_ship,
                total_pallets: row.pallets_needed,
                trucks_needed: 0,
                fill_ratio: 0,
                delivery_efficiency: DeliveryEfficiency::Inefficient,
            }),
        }
    }

    for summary in &mut summaries {
        summary.trucks_needed = ceil_div(summary.total_pallets, TRUCK_CAPACITY);
        summary.fill_ratio = summary.total_pallets % TRUCK_CAPACITY;
        summary.delivery_efficiency = if summary.total_pallets >= TRUCK_CAPACITY {
            DeliveryEfficiency::Efficient
        } else {
            DeliveryEfficiency::Inefficient
        };
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CentralStock, OrderLine, Summary, TransitLine};

    fn order(
        article: &str,
        depot: &str,
        ordered: i64,
        free: i64,
        packaging: Packaging,
        k: i64,
    ) -> OrderLine {
        OrderLine {
            article: article.into(),
            depot: depot.into(),
            ordered_qty: ordered,
            free_stock_qty: free,
            packaging,
            products_per_pallet: k,
        }
    }

    fn store_with(
        orders: Vec<OrderLine>,
        stock: Vec<CentralStock>,
        transit: Vec<TransitLine>,
    ) -> SessionStore {
        let store = SessionStore::new();
        store.put(Records::Orders(orders), "commandes.xlsx", Summary::default());
        if !stock.is_empty() {
            store.put(Records::Stock(stock), "stock.xlsx", Summary::default());
        }
        if !transit.is_empty() {
            store.put(Records::Transit(transit), "transit.xlsx", Summary::default());
        }
        store
    }

    fn days(n: i64) -> CalculationRequest {
        CalculationRequest {
            days: n,
            product_filter: None,
            packaging_filter: None,
        }
    }

    #[test]
    fn ceil_div_covers_quantity_in_whole_pallets() {
        assert_eq!(ceil_div(0, 30), 0);
        assert_eq!(ceil_div(1, 30), 1);
        assert_eq!(ceil_div(30, 30), 1);
        assert_eq!(ceil_div(31, 30), 2);
        assert_eq!(ceil_div(10_000, 10), 1000);
    }

    #[test]
    fn missing_orders_session_fails() {
        let store = SessionStore::new();
        let err = calculate(&store, &DepotConfiguration::default(), &days(10)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingInputs(SessionKind::Orders)
        ));
    }

    #[test]
    fn invalid_horizon_fails() {
        let store = store_with(
            vec![order("A", "M211", 10, 0, Packaging::Verre, 30)],
            vec![],
            vec![],
        );
        let err = calculate(&store, &DepotConfiguration::default(), &days(0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "days", .. }));
    }

    #[test]
    fn stock_and_transit_default_to_zero() {
        let store = store_with(
            vec![order("A", "M211", 100, 0, Packaging::Verre, 30)],
            vec![],
            vec![],
        );
        let result = calculate(&store, &DepotConfiguration::default(), &days(1)).unwrap();
        assert_eq!(result.calculations.len(), 1);
        let row = &result.calculations[0];
        assert_eq!(row.in_transit_qty, 0);
        assert_eq!(row.quantity_to_ship, 100);
        // No central stock at all: anything to ship is critical.
        assert_eq!(row.status, RowStatus::Critical);
    }

    #[test]
    fn supply_subtracts_free_stock_and_transit() {
        let store = store_with(
            vec![order("A", "M211", 100, 30, Packaging::Verre, 10)],
            vec![CentralStock {
                article: "A".into(),
                on_hand_qty: 10_000,
            }],
            vec![
                TransitLine {
                    article: "A".into(),
                    dest_depot: "M211".into(),
                    in_transit_qty: 20,
                },
                TransitLine {
                    article: "A".into(),
                    dest_depot: "M211".into(),
                    in_transit_qty: 15,
                },
            ],
        );
        let result = calculate(&store, &DepotConfiguration::default(), &days(1)).unwrap();
        let row = &result.calculations[0];
        // transit lines sum: 20 + 15 = 35; supply = 30 + 35 = 65
        assert_eq!(row.in_transit_qty, 35);
        assert_eq!(row.quantity_to_ship, 35);
        assert_eq!(row.pallets_needed, 4);
        assert_eq!(row.status, RowStatus::Ship);
    }

    #[test]
    fn covered_demand_is_ok_with_zero_pallets() {
        let store = store_with(
            vec![order("A", "M211", 50, 200, Packaging::Pet, 30)],
            vec![],
            vec![],
        );
        let result = calculate(&store, &DepotConfiguration::default(), &days(2)).unwrap();
        let row = &result.calculations[0];
        assert_eq!(row.demand, 100);
        assert_eq!(row.quantity_to_ship, 0);
        assert_eq!(row.pallets_needed, 0);
        assert_eq!(row.status, RowStatus::Ok);
        // 200 supply at 50/day covers 4 days.
        assert_eq!(row.days_of_coverage, Some(4));
    }

    #[test]
    fn critical_when_central_stock_cannot_cover() {
        let store = store_with(
            vec![order("A", "M211", 100, 0, Packaging::Verre, 30)],
            vec![CentralStock {
                article: "A".into(),
                on_hand_qty: 50,
            }],
            vec![],
        );
        let result = calculate(&store, &DepotConfiguration::default(), &days(1)).unwrap();
        assert_eq!(result.calculations[0].status, RowStatus::Critical);
    }

    #[test]
    fn repeated_order_lines_sum_demand_and_keep_first_pallet_size() {
        let store = store_with(
            vec![
                order("A", "M211", 60, 10, Packaging::Verre, 20),
                order("A", "M211", 40, 25, Packaging::Pet, 50),
            ],
            vec![],
            vec![],
        );
        let result = calculate(&store, &DepotConfiguration::default(), &days(1)).unwrap();
        assert_eq!(result.calculations.len(), 1);
        let row = &result.calculations[0];
        assert_eq!(row.ordered_qty, 100);
        // Free stock is a level: the latest line wins.
        assert_eq!(row.free_stock_qty, 25);
        // K and packaging tie-break on first-seen.
        assert_eq!(row.products_per_pallet, 20);
        assert_eq!(row.packaging, Packaging::Verre);
    }

    #[test]
    fn output_is_ordered_depot_then_article() {
        let store = store_with(
            vec![
                order("B", "M213", 10, 0, Packaging::Verre, 5),
                order("A", "M213", 10, 0, Packaging::Verre, 5),
                order("Z", "M211", 10, 0, Packaging::Verre, 5),
            ],
            vec![],
            vec![],
        );
        let result = calculate(&store, &DepotConfiguration::default(), &days(1)).unwrap();
        let keys: Vec<(&str, &str)> = result
            .calculations
            .iter()
            .map(|r| (r.depot.as_str(), r.article.as_str()))
            .collect();
        assert_eq!(keys, vec![("M211", "Z"), ("M213", "A"), ("M213", "B")]);
    }

    #[test]
    fn product_filter_is_case_insensitive_substring() {
        let store = store_with(
            vec![
                order("TEST001", "M211", 10, 0, Packaging::Verre, 5),
                order("OTHER", "M211", 10, 0, Packaging::Verre, 5),
            ],
            vec![],
            vec![],
        );
        let request = CalculationRequest {
            days: 1,
            product_filter: Some("test".into()),
            packaging_filter: None,
        };
        let result = calculate(&store, &DepotConfiguration::default(), &request).unwrap();
        assert_eq!(result.calculations.len(), 1);
        assert_eq!(result.calculations[0].article, "TEST001");
    }

    #[test]
    fn packaging_filter_matches_exactly() {
        let store = store_with(
            vec![
                order("A", "M211", 10, 0, Packaging::Verre, 5),
                order("B", "M211", 10, 0, Packaging::Pet, 5),
            ],
            vec![],
            vec![],
        );
        let request = CalculationRequest {
            days: 1,
            product_filter: None,
            packaging_filter: Some("pet".into()),
        };
        let result = calculate(&store, &DepotConfiguration::default(), &request).unwrap();
        assert_eq!(result.calculations.len(), 1);
        assert_eq!(result.calculations[0].article, "B");
    }

    #[test]
    fn unknown_packaging_filter_is_invalid() {
        let store = store_with(
            vec![order("A", "M211", 10, 0, Packaging::Verre, 5)],
            vec![],
            vec![],
        );
        let request = CalculationRequest {
            days: 1,
            product_filter: None,
            packaging_filter: Some("carton".into()),
        };
        let err = calculate(&store, &DepotConfiguration::default(), &request).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidParameter {
                name: "packaging_filter",
                ..
            }
        ));
    }

    #[test]
    fn configuration_restricts_depot_articles() {
        let store = store_with(
            vec![
                order("1011", "M211", 10, 0, Packaging::Verre, 5),
                order("9999", "M211", 10, 0, Packaging::Verre, 5),
                order("1011", "M212", 10, 0, Packaging::Verre, 5),
            ],
            vec![],
            vec![],
        );
        let mut mapping = HashMap::new();
        mapping.insert("M211".to_string(), vec!["1011".to_string()]);
        let config = DepotConfiguration {
            enabled: true,
            mapping,
        };
        let result = calculate(&store, &config, &days(1)).unwrap();
        let keys: Vec<(&str, &str)> = result
            .calculations
            .iter()
            .map(|r| (r.depot.as_str(), r.article.as_str()))
            .collect();
        // M211 admits only 1011; M212 is not in the mapping at all.
        assert_eq!(keys, vec![("M211", "1011")]);
    }

    #[test]
    fn depot_summary_rolls_up_pallets_and_trucks() {
        let store = store_with(
            vec![
                order("A", "M211", 900, 0, Packaging::Verre, 30),
                order("B", "M211", 600, 0, Packaging::Pet, 30),
                order("C", "M213", 150, 0, Packaging::Verre, 30),
            ],
            vec![],
            vec![],
        );
        let result = calculate(&store, &DepotConfiguration::default(), &days(1)).unwrap();
        assert_eq!(result.depot_summary.len(), 2);

        let m211 = &result.depot_summary[0];
        assert_eq!(m211.depot, "M211");
        // 900/30 + 600/30 = 30 + 20 = 50 pallets → 3 trucks, 2 left over
        assert_eq!(m211.total_pallets, 50);
        assert_eq!(m211.trucks_needed, 3);
        assert_eq!(m211.fill_ratio, 2);
        assert_eq!(m211.delivery_efficiency, DeliveryEfficiency::Efficient);

        let m213 = &result.depot_summary[1];
        assert_eq!(m213.total_pallets, 5);
        assert_eq!(m213.trucks_needed, 1);
        assert_eq!(m213.fill_ratio, 5);
        assert_eq!(m213.delivery_efficiency, DeliveryEfficiency::Inefficient);
    }

    #[test]
    fn sourcing_annotations_follow_the_catalog() {
        let store = store_with(
            vec![
                order("1011", "M211", 10, 0, Packaging::Verre, 5),
                order("9999", "M211", 10, 0, Packaging::Verre, 5),
            ],
            vec![],
            vec![],
        );
        let result = calculate(&store, &DepotConfiguration::default(), &days(1)).unwrap();
        let local = result
            .calculations
            .iter()
            .find(|r| r.article == "1011")
            .unwrap();
        assert_eq!(local.sourcing, Sourcing::Local);
        assert_eq!(local.sourcing_label, "Production Locale");
        let external = result
            .calculations
            .iter()
            .find(|r| r.article == "9999")
            .unwrap();
        assert_eq!(external.sourcing, Sourcing::External);
        assert_eq!(external.sourcing_label, "Sourcing Externe");
        assert_eq!(result.summary.local_items, 1);
        assert_eq!(result.summary.external_items, 1);
    }

    #[test]
    fn snapshot_is_taken_at_entry() {
        let store = store_with(
            vec![order("A", "M211", 100, 0, Packaging::Verre, 10)],
            vec![],
            vec![],
        );
        let before = calculate(&store, &DepotConfiguration::default(), &days(1)).unwrap();
        // Supersede the orders session; previous result is untouched.
        store.put(
            Records::Orders(vec![order("B", "M299", 5, 0, Packaging::Pet, 5)]),
            "new.xlsx",
            Summary::default(),
        );
        assert_eq!(before.calculations[0].article, "A");
        let after = calculate(&store, &DepotConfiguration::default(), &days(1)).unwrap();
        assert_eq!(after.calculations[0].article, "B");
    }
}
