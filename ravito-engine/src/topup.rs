//! Truck-fill suggestions.
//!
//! A depot whose pallet total is not a multiple of the truck capacity ships
//! a partially loaded last truck. This module proposes additional articles
//! from central stock, ones the depot has not already ordered, to fill
//! the remaining slots. Greedy allocation: richest central stock first,
//! ties broken by article code so the output is reproducible.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::calculator::{self, CalculationRequest};
use crate::catalog;
use crate::config::DepotConfiguration;
use crate::error::{EngineError, EngineResult};
use crate::session::SessionStore;
use crate::types::{
    Packaging, Records, SessionKind, Sourcing, DEFAULT_PRODUCTS_PER_PALLET, TRUCK_CAPACITY,
};

/// One proposed addition to the depot's load.
#[derive(Clone, Debug, Serialize)]
pub struct TopUpSuggestion {
    pub article: String,
    /// Packaging from the first order line mentioning the article; absent
    /// for articles that only exist in central stock.
    pub packaging: Option<Packaging>,
    pub on_hand_qty: i64,
    pub suggested_pallets: i64,
    pub suggested_quantity: i64,
    pub sourcing: Sourcing,
    pub sourcing_label: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct TopUpResult {
    pub depot: String,
    pub current_pallets: i64,
    pub target_pallets: i64,
    pub slots_filled: i64,
    pub suggestions: Vec<TopUpSuggestion>,
    /// Informational note when no proposal is possible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Propose articles filling the depot's last truck after a `days`-horizon
/// calculation.
///
/// Fails with [`EngineError::InvalidParameter`] when the depot appears on
/// no order line, and propagates the calculator's own errors (missing
/// orders session, bad horizon).
pub fn suggest(
    store: &SessionStore,
    config: &DepotConfiguration,
    depot: &str,
    days: i64,
) -> EngineResult<TopUpResult> {
    let depot = depot.trim().to_string();
    if depot.is_empty() {
        return Err(EngineError::InvalidParameter {
            name: "depot_name",
            reason: "must not be empty".into(),
        });
    }

    let request = CalculationRequest {
        days,
        product_filter: None,
        packaging_filter: None,
    };
    let calculation = calculator::calculate(store, config, &request)?;

    // The depot must exist in the uploaded orders, even if the current
    // configuration filters all of its rows out.
    let orders = store
        .get_active(SessionKind::Orders)
        .ok_or(EngineError::MissingInputs(SessionKind::Orders))?;
    let Records::Orders(order_lines) = &orders.records else {
        return Err(EngineError::Internal(
            "orders session does not hold order records".into(),
        ));
    };
    if !order_lines.iter().any(|l| l.depot == depot) {
        return Err(EngineError::InvalidParameter {
            name: "depot_name",
            reason: format!("unknown depot '{depot}'"),
        });
    }

    let current_pallets = calculation
        .depot_summary
        .iter()
        .find(|s| s.depot == depot)
        .map(|s| s.total_pallets)
        .unwrap_or(0);

    // Slots left in the last truck; a depot sitting exactly on a truck
    // boundary gets a full additional truck proposed.
    let fill_ratio = current_pallets % TRUCK_CAPACITY;
    let available_slots = if fill_ratio == 0 {
        TRUCK_CAPACITY
    } else {
        TRUCK_CAPACITY - fill_ratio
    };

    let Some(stock_session) = store.get_active(SessionKind::Stock) else {
        return Ok(TopUpResult {
            depot,
            current_pallets,
            target_pallets: current_pallets + available_slots,
            slots_filled: 0,
            suggestions: Vec::new(),
            note: Some("no central stock session uploaded".into()),
        });
    };
    let Records::Stock(stocks) = &stock_session.records else {
        return Err(EngineError::Internal(
            "stock session does not hold stock records".into(),
        ));
    };

    // Pallet size and packaging per article, first order line wins.
    let mut pallet_sizes: HashMap<&str, i64> = HashMap::new();
    let mut packagings: HashMap<&str, Packaging> = HashMap::new();
    for line in order_lines {
        pallet_sizes
            .entry(line.article.as_str())
            .or_insert(line.products_per_pallet);
        packagings.entry(line.article.as_str()).or_insert(line.packaging);
    }

    let ordered_here: HashSet<&str> = order_lines
        .iter()
        .filter(|l| l.depot == depot)
        .map(|l| l.article.as_str())
        .collect();

    // Candidates: central stock not already ordered for this depot,
    // richest first, article code breaking ties.
    let mut candidates: Vec<_> = stocks
        .iter()
        .filter(|s| !ordered_here.contains(s.article.as_str()))
        .collect();
    candidates.sort_by(|a, b| {
        b.on_hand_qty
            .cmp(&a.on_hand_qty)
            .then_with(|| a.article.cmp(&b.article))
    });

    let mut suggestions = Vec::new();
    let mut slots_remaining = available_slots;
    for candidate in candidates {
        if slots_remaining == 0 {
            break;
        }
        let k = pallet_sizes
            .get(candidate.article.as_str())
            .copied()
            .unwrap_or(DEFAULT_PRODUCTS_PER_PALLET);
        let max_pallets_by_stock = candidate.on_hand_qty / k;
        let suggested_pallets = max_pallets_by_stock.min(slots_remaining);
        if suggested_pallets == 0 {
            // Not even one full pallet in central stock.
            continue;
        }
        slots_remaining -= suggested_pallets;

        let sourcing = catalog::classify(&candidate.article);
        suggestions.push(TopUpSuggestion {
            article: candidate.article.clone(),
            packaging: packagings.get(candidate.article.as_str()).copied(),
            on_hand_qty: candidate.on_hand_qty,
            suggested_pallets,
            suggested_quantity: suggested_pallets * k,
            sourcing,
            sourcing_label: sourcing.label().to_string(),
        });
    }

    let slots_filled = available_slots - slots_remaining;
    let note = if suggestions.is_empty() {
        Some("no eligible central-stock article can add a full pallet".into())
    } else {
        None
    };

    Ok(TopUpResult {
        depot,
        current_pallets,
        target_pallets: current_pallets + available_slots,
        slots_filled,
        suggestions,
        note,
    })
}
