use std::{fs, path::Path};

use anyhow::{Context, Result};
use tracing::info;

use crate::database::{product::check_unique_ids, Product};

pub(crate) const EXPORT_FILE_NAME: &str = "filtered_products.csv";

const CSV_HEADER: [&str; 9] = [
    "id",
    "name",
    "category",
    "price",
    "rating",
    "review_count",
    "value_score",
    "popularity_index",
    "price_category",
];

/// Writes `records` as comma-separated text with a header row, quoting fields
/// that contain delimiters.
pub(crate) fn export_csv(records: &[Product]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub(crate) fn parse_csv(text: &str) -> Result<Vec<Product>> {
    csv::Reader::from_reader(text.as_bytes())
        .deserialize::<Product>()
        .enumerate()
        .map(|(line, row)| row.with_context(|| format!("malformed CSV row {}", line + 1)))
        .collect()
}

/// Reads a product file in the export format, rejecting it as a whole if any
/// row is out of range or two rows share an id.
pub(crate) fn import_csv(path: &Path) -> Result<Vec<Product>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let products = parse_csv(&text)?;
    check_unique_ids(&products)?;
    for product in &products {
        product.validate()?;
    }
    info!("Read {} products from {}", products.len(), path.display());
    Ok(products)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn catalog() -> Vec<Product> {
        vec![
            Product {
                id: 1,
                name: "USB-C Hub, 7-in-1".to_string(),
                category: "Electronics".to_string(),
                price: 23.99,
                rating: 4.6,
                review_count: 1_204,
                value_score: 0.191_746_561,
                popularity_index: 55.4,
                price_category: "Budget".to_string(),
            },
            Product {
                id: 9,
                name: "Robot \"Rex\" kit".to_string(),
                category: "Toys".to_string(),
                price: 0.0,
                rating: 0.0,
                review_count: 0,
                value_score: 0.0,
                popularity_index: 0.0,
                price_category: String::new(),
            },
        ]
    }

    #[test]
    fn header_comes_first_and_commas_are_quoted() {
        let text = export_csv(&catalog()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,name,category,price,rating,review_count,value_score,popularity_index,price_category")
        );
        assert!(lines.next().unwrap().starts_with("1,\"USB-C Hub, 7-in-1\",Electronics,"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn export_then_parse_yields_same_records() {
        let records = catalog();
        let parsed = parse_csv(&export_csv(&records).unwrap()).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn empty_export_still_has_header() {
        let text = export_csv(&[]).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(parse_csv(&text).unwrap().is_empty());
    }

    #[test]
    fn import_rejects_out_of_range_rating() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut records = catalog();
        records[1].rating = 9.0;
        file.write_all(export_csv(&records).unwrap().as_bytes())
            .unwrap();

        assert!(import_csv(file.path()).is_err());
    }

    #[test]
    fn import_rejects_repeated_id() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut records = catalog();
        records[1].id = records[0].id;
        file.write_all(export_csv(&records).unwrap().as_bytes())
            .unwrap();

        let err = import_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate id"));
    }

    #[test]
    fn import_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(export_csv(&catalog()).unwrap().as_bytes())
            .unwrap();

        assert_eq!(import_csv(file.path()).unwrap(), catalog());
    }

    #[test]
    fn malformed_row_is_reported() {
        let text = "id,name,category,price,rating,review_count,value_score,popularity_index,price_category\n\
                    x,Lamp,Home,1,1,1,1,1,Budget\n";
        assert!(parse_csv(text).is_err());
    }
}
