//! Excel export of selected plan rows.
//!
//! The operator picks rows from the calculation screen and downloads them
//! as a flat worksheet for the transport team. Rendering is deliberately
//! plain: one header row, one row per selected item.

use rust_xlsxwriter::{Format, Workbook};
use serde::Deserialize;

use crate::error::ApiError;

/// One selected calculation row, as echoed back by the UI.
#[derive(Clone, Debug, Deserialize)]
pub struct ExportItem {
    pub depot: String,
    pub article: String,
    #[serde(default)]
    pub packaging: Option<String>,
    pub quantity_to_ship: i64,
    pub pallets_needed: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sourcing_label: Option<String>,
}

const HEADERS: &[&str] = &[
    "Dépôt",
    "Article",
    "Emballage",
    "Quantité à envoyer",
    "Palettes",
    "Statut",
    "Sourcing",
];

/// Render selected items into xlsx bytes.
pub fn render(items: &[ExportItem]) -> Result<Vec<u8>, ApiError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name("Plan de réapprovisionnement")
        .map_err(|e| ApiError::Export(e.to_string()))?;

    let bold = Format::new().set_bold();
    for (col, header) in HEADERS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &bold)
            .map_err(|e| ApiError::Export(e.to_string()))?;
    }

    for (idx, item) in items.iter().enumerate() {
        let row = (idx + 1) as u32;
        let write = |sheet: &mut rust_xlsxwriter::Worksheet,
                     col: u16,
                     value: &str|
         -> Result<(), ApiError> {
            sheet
                .write_string(row, col, value)
                .map(|_| ())
                .map_err(|e| ApiError::Export(e.to_string()))
        };
        write(sheet, 0, &item.depot)?;
        write(sheet, 1, &item.article)?;
        write(sheet, 2, item.packaging.as_deref().unwrap_or(""))?;
        sheet
            .write_number(row, 3, item.quantity_to_ship as f64)
            .map_err(|e| ApiError::Export(e.to_string()))?;
        sheet
            .write_number(row, 4, item.pallets_needed as f64)
            .map_err(|e| ApiError::Export(e.to_string()))?;
        write(sheet, 5, item.status.as_deref().unwrap_or(""))?;
        write(sheet, 6, item.sourcing_label.as_deref().unwrap_or(""))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ApiError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(depot: &str, article: &str, qty: i64, pallets: i64) -> ExportItem {
        ExportItem {
            depot: depot.into(),
            article: article.into(),
            packaging: Some("verre".into()),
            quantity_to_ship: qty,
            pallets_needed: pallets,
            status: Some("ship".into()),
            sourcing_label: Some("Production Locale".into()),
        }
    }

    #[test]
    fn render_produces_an_xlsx_archive() {
        let bytes = render(&[item("M211", "1011", 300, 10), item("M212", "1016", 90, 3)])
            .unwrap();
        // xlsx is a zip container.
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn render_accepts_items_with_missing_optional_fields() {
        let sparse = ExportItem {
            depot: "M213".into(),
            article: "9999".into(),
            packaging: None,
            quantity_to_ship: 10,
            pallets_needed: 1,
            status: None,
            sourcing_label: None,
        };
        assert!(render(&[sparse]).is_ok());
    }

    #[test]
    fn export_item_deserializes_from_calculation_row_json() {
        let json = r#"{
            "depot": "M211",
            "article": "1011",
            "packaging": "verre",
            "ordered_qty": 150,
            "quantity_to_ship": 130,
            "pallets_needed": 5,
            "status": "ship",
            "sourcing_label": "Production Locale"
        }"#;
        let item: ExportItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.depot, "M211");
        assert_eq!(item.pallets_needed, 5);
    }
}
