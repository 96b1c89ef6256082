//! Bulk ingredient import from CSV.

use std::io::Read;

use sea_orm::*;
use thiserror::Error;
use tracing::info;

use crate::entity::{ingredient, ingredient_recipe};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRow {
    pub name: String,
    pub measurement_unit: String,
}

/// Parse headerless `name,measurement_unit` rows. Row numbers in errors are 1-based.
pub fn parse_ingredients_csv<R: Read>(reader: R) -> Result<Vec<IngredientRow>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let row = idx + 1;
        let invalid = |reason: &str| ImportError::InvalidRow {
            row,
            reason: reason.to_string(),
        };

        if record.len() != 2 {
            return Err(invalid("expected exactly two columns"));
        }
        let name = record.get(0).unwrap_or_default();
        let unit = record.get(1).unwrap_or_default();
        if name.is_empty() {
            return Err(invalid("ingredient name is empty"));
        }

        rows.push(IngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        });
    }
    Ok(rows)
}

/// Replace the whole ingredient catalog with `rows` in one transaction.
///
/// Recipe ingredient lines reference the catalog, so they are removed too.
pub async fn import_ingredients(
    db: &DatabaseConnection,
    rows: Vec<IngredientRow>,
) -> Result<u64, ImportError> {
    let txn = db.begin().await?;

    let lines = ingredient_recipe::Entity::delete_many().exec(&txn).await?;
    let removed = ingredient::Entity::delete_many().exec(&txn).await?;
    info!(
        lines = lines.rows_affected,
        ingredients = removed.rows_affected,
        "Cleared ingredient catalog"
    );

    let count = rows.len() as u64;
    // Keep each statement well under the Postgres bind parameter limit.
    for chunk in rows.chunks(1000) {
        let models = chunk.iter().map(|row| ingredient::ActiveModel {
            name: Set(row.name.clone()),
            measurement_unit: Set(row.measurement_unit.clone()),
            ..Default::default()
        });
        ingredient::Entity::insert_many(models)
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;
    info!("Imported {} ingredients", count);
    Ok(count)
}
