//! Canonical data model shared by the whole engine.
//!
//! Three record kinds come out of the normalizer, one per upload kind:
//! order lines, central-warehouse stock, and in-transit shipments. They are
//! the only representation of operator data the rest of the engine sees;
//! the calculator and the truck-fill suggester never touch raw cells.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Engine constants
// ---------------------------------------------------------------------------

/// The central warehouse every shipment originates from.
pub const CENTRAL_WAREHOUSE: &str = "M210";

/// Fixed truck capacity, in pallets.
pub const TRUCK_CAPACITY: i64 = 24;

/// Fallback products-per-pallet for articles that never appear on an order
/// line. This is the only defaulting the engine performs.
pub const DEFAULT_PRODUCTS_PER_PALLET: i64 = 30;

// ---------------------------------------------------------------------------
// Upload kinds
// ---------------------------------------------------------------------------

/// The three spreadsheet kinds an operator can upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Open customer orders ("commandes").
    Orders,
    /// Central-warehouse stock at M210.
    Stock,
    /// Shipments dispatched from M210 but not yet arrived.
    Transit,
}

impl SessionKind {
    /// Stable lowercase token used in logs and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Orders => "commandes",
            SessionKind::Stock => "stock",
            SessionKind::Transit => "transit",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Packaging
// ---------------------------------------------------------------------------

/// Packaging family of an article.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Packaging {
    Verre,
    Pet,
    Ciel,
}

impl Packaging {
    /// Parse an operator-provided token, case-insensitively.
    ///
    /// Returns `None` for anything outside the three known families; the
    /// normalizer drops such rows.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "verre" => Some(Packaging::Verre),
            "pet" => Some(Packaging::Pet),
            "ciel" => Some(Packaging::Ciel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Packaging::Verre => "verre",
            Packaging::Pet => "pet",
            Packaging::Ciel => "ciel",
        }
    }
}

impl fmt::Display for Packaging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sourcing
// ---------------------------------------------------------------------------

/// Whether an article is produced in-house or bought externally.
///
/// Purely informational: the classification annotates output rows but never
/// changes the arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sourcing {
    Local,
    External,
}

impl Sourcing {
    /// Operator-facing label shown next to every output row.
    pub fn label(&self) -> &'static str {
        match self {
            Sourcing::Local => "Production Locale",
            Sourcing::External => "Sourcing Externe",
        }
    }
}

impl fmt::Display for Sourcing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sourcing::Local => f.write_str("local"),
            Sourcing::External => f.write_str("external"),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical records
// ---------------------------------------------------------------------------

/// One open order line: a (depot, article) demand observation.
///
/// `(depot, article)` may repeat across lines; the calculator sums them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderLine {
    pub article: String,
    /// Destination depot ("point d'expédition").
    pub depot: String,
    pub ordered_qty: i64,
    /// Free-to-use stock already at the depot.
    pub free_stock_qty: i64,
    pub packaging: Packaging,
    /// Article-specific pallet size ("K"). Always ≥ 1 after normalization.
    pub products_per_pallet: i64,
}

/// On-hand quantity for one article at the central warehouse.
///
/// Only rows whose division equals [`CENTRAL_WAREHOUSE`] survive ingestion,
/// so the division is implicit. One record per article per session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CentralStock {
    pub article: String,
    pub on_hand_qty: i64,
}

/// Quantity dispatched from the central warehouse toward a depot but not
/// yet arrived. Rows whose source depot is not M210 are dropped at
/// ingestion; multiple rows per (article, destination) are summed by the
/// calculator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransitLine {
    pub article: String,
    pub dest_depot: String,
    pub in_transit_qty: i64,
}

/// Tagged record sets, one variant per session kind.
#[derive(Clone, Debug, Serialize)]
pub enum Records {
    Orders(Vec<OrderLine>),
    Stock(Vec<CentralStock>),
    Transit(Vec<TransitLine>),
}

impl Records {
    pub fn kind(&self) -> SessionKind {
        match self {
            Records::Orders(_) => SessionKind::Orders,
            Records::Stock(_) => SessionKind::Stock,
            Records::Transit(_) => SessionKind::Transit,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Records::Orders(r) => r.len(),
            Records::Stock(r) => r.len(),
            Records::Transit(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Per-file summary
// ---------------------------------------------------------------------------

/// Ingestion summary returned with every upload.
///
/// `depots` and `articles` feed the UI filter dropdowns and are therefore
/// deduplicated and sorted. `discarded` counts rows the filtering rules
/// rejected; `total_quantity` sums the kind's quantity column (ordered,
/// on-hand, or in-transit).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_records: usize,
    pub depots: Vec<String>,
    pub articles: Vec<String>,
    pub packagings: Vec<String>,
    pub discarded: usize,
    pub total_quantity: i64,
}
