//! Spreadsheet normalization.
//!
//! Binds raw positional rows to canonical records, one binder per upload
//! kind. Columns are located by position, never by name: the source files
//! come from different export tools and their headers do not agree. The
//! operator-facing column letters are:
//!
//! - Orders: B article, D depot, F ordered qty, G free stock, I packaging,
//!   K products-per-pallet
//! - Stock: A division, B article, D on-hand qty
//! - Transit: A article, C destination depot, G source depot, I quantity
//!
//! Rows that fail a filtering rule are dropped and counted in
//! `Summary::discarded`; a file where nothing survives is an error, not an
//! empty session.

use std::collections::BTreeSet;

use crate::error::{EngineError, EngineResult};
use crate::sheet::{self, Cell, RawRow};
use crate::types::{
    CentralStock, OrderLine, Packaging, Records, SessionKind, Summary, TransitLine,
    CENTRAL_WAREHOUSE,
};

// Zero-based positional bindings.
const ORDERS_ARTICLE: usize = 1;
const ORDERS_DEPOT: usize = 3;
const ORDERS_ORDERED_QTY: usize = 5;
const ORDERS_FREE_STOCK: usize = 6;
const ORDERS_PACKAGING: usize = 8;
const ORDERS_PALLET_SIZE: usize = 10;
const ORDERS_WIDTH: usize = 11;

const STOCK_DIVISION: usize = 0;
const STOCK_ARTICLE: usize = 1;
const STOCK_ON_HAND: usize = 3;
const STOCK_WIDTH: usize = 4;

const TRANSIT_ARTICLE: usize = 0;
const TRANSIT_DEST_DEPOT: usize = 2;
const TRANSIT_SOURCE_DEPOT: usize = 6;
const TRANSIT_QTY: usize = 8;
const TRANSIT_WIDTH: usize = 9;

/// Normalize an uploaded buffer into canonical records plus a summary.
///
/// Fails with [`EngineError::MalformedInput`] when the buffer is not a
/// readable spreadsheet or no row reaches the kind's required width, and
/// with [`EngineError::EmptyInput`] when rows were present but none
/// survived the filters.
pub fn normalize(
    kind: SessionKind,
    bytes: &[u8],
    file_name: &str,
) -> EngineResult<(Records, Summary)> {
    let rows = sheet::decode(bytes, file_name).map_err(|e| EngineError::MalformedInput {
        kind,
        reason: e.to_string(),
    })?;

    let width = required_width(kind);
    if !rows.is_empty() && rows.iter().all(|r| r.len() < width) {
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
        return Err(EngineError::MalformedInput {
            kind,
            reason: format!(
                "layout does not match {kind}: expected at least {width} columns, found {widest}"
            ),
        });
    }

    let (records, summary) = match kind {
        SessionKind::Orders => bind_orders(&rows),
        SessionKind::Stock => bind_stock(&rows),
        SessionKind::Transit => bind_transit(&rows),
    };

    if records.is_empty() {
        return Err(EngineError::EmptyInput {
            kind,
            discarded: summary.discarded,
        });
    }

    tracing::debug!(
        %kind,
        retained = summary.total_records,
        discarded = summary.discarded,
        "normalized upload"
    );
    Ok((records, summary))
}

fn required_width(kind: SessionKind) -> usize {
    match kind {
        SessionKind::Orders => ORDERS_WIDTH,
        SessionKind::Stock => STOCK_WIDTH,
        SessionKind::Transit => TRANSIT_WIDTH,
    }
}

/// Missing trailing columns read as empty cells.
fn cell(row: &RawRow, idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&Cell::Empty)
}

/// Quantities are clamped to zero rather than dropped: a negative stock
/// cell is an accounting artifact, not a reason to erase the order line.
fn quantity(row: &RawRow, idx: usize) -> Option<i64> {
    cell(row, idx).as_int().map(|v| v.max(0))
}

fn bind_orders(rows: &[RawRow]) -> (Records, Summary) {
    let mut lines = Vec::new();
    let mut discarded = 0usize;
    let mut depots = BTreeSet::new();
    let mut articles = BTreeSet::new();
    let mut packagings = BTreeSet::new();
    let mut total_quantity = 0i64;

    for row in rows {
        let bound = (|| {
            let article = cell(row, ORDERS_ARTICLE).as_text()?;
            let depot = cell(row, ORDERS_DEPOT).as_text()?;
            let ordered_qty = quantity(row, ORDERS_ORDERED_QTY)?;
            let free_stock_qty = quantity(row, ORDERS_FREE_STOCK)?;
            let packaging = Packaging::parse(&cell(row, ORDERS_PACKAGING).as_text()?)?;
            let products_per_pallet = cell(row, ORDERS_PALLET_SIZE)
                .as_whole_int()
                .filter(|k| *k >= 1)?;
            Some(OrderLine {
                article,
                depot,
                ordered_qty,
                free_stock_qty,
                packaging,
                products_per_pallet,
            })
        })();

        match bound {
            Some(line) => {
                depots.insert(line.depot.clone());
                articles.insert(line.article.clone());
                packagings.insert(line.packaging.as_str().to_string());
                total_quantity += line.ordered_qty;
                lines.push(line);
            }
            None => discarded += 1,
        }
    }

    let summary = Summary {
        total_records: lines.len(),
        depots: depots.into_iter().collect(),
        articles: articles.into_iter().collect(),
        packagings: packagings.into_iter().collect(),
        discarded,
        total_quantity,
    };
    (Records::Orders(lines), summary)
}

fn bind_stock(rows: &[RawRow]) -> (Records, Summary) {
    let mut stocks: Vec<CentralStock> = Vec::new();
    let mut discarded = 0usize;
    let mut articles = BTreeSet::new();
    let mut total_quantity = 0i64;

    for row in rows {
        let bound = (|| {
            let division = cell(row, STOCK_DIVISION).as_text()?;
            if division != CENTRAL_WAREHOUSE {
                return None;
            }
            let article = cell(row, STOCK_ARTICLE).as_text()?;
            let on_hand_qty = quantity(row, STOCK_ON_HAND)?;
            Some(CentralStock {
                article,
                on_hand_qty,
            })
        })();

        match bound {
            Some(stock) => {
                articles.insert(stock.article.clone());
                total_quantity += stock.on_hand_qty;
                // (article) is unique per session: repeated rows merge.
                match stocks.iter_mut().find(|s| s.article == stock.article) {
                    Some(existing) => existing.on_hand_qty += stock.on_hand_qty,
                    None => stocks.push(stock),
                }
            }
            None => discarded += 1,
        }
    }

    let summary = Summary {
        total_records: stocks.len(),
        depots: Vec::new(),
        articles: articles.into_iter().collect(),
        packagings: Vec::new(),
        discarded,
        total_quantity,
    };
    (Records::Stock(stocks), summary)
}

fn bind_transit(rows: &[RawRow]) -> (Records, Summary) {
    let mut lines = Vec::new();
    let mut discarded = 0usize;
    let mut depots = BTreeSet::new();
    let mut articles = BTreeSet::new();
    let mut total_quantity = 0i64;

    for row in rows {
        let bound = (|| {
            let article = cell(row, TRANSIT_ARTICLE).as_text()?;
            let dest_depot = cell(row, TRANSIT_DEST_DEPOT).as_text()?;
            let source = cell(row, TRANSIT_SOURCE_DEPOT).as_text()?;
            if source != CENTRAL_WAREHOUSE {
                return None;
            }
            let in_transit_qty = quantity(row, TRANSIT_QTY)?;
            Some(TransitLine {
                article,
                dest_depot,
                in_transit_qty,
            })
        })();

        match bound {
            Some(line) => {
                depots.insert(line.dest_depot.clone());
                articles.insert(line.article.clone());
                total_quantity += line.in_transit_qty;
                lines.push(line);
            }
            None => discarded += 1,
        }
    }

    let summary = Summary {
        total_records: lines.len(),
        depots: depots.into_iter().collect(),
        articles: articles.into_iter().collect(),
        packagings: Vec::new(),
        discarded,
        total_quantity,
    };
    (Records::Transit(lines), summary)
}
