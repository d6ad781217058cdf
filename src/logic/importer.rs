use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::model::Id;
use crate::store::ProductCache;

/// Advisory lock key guarding the import pipeline. Concurrent admin
/// invocations must not interleave; the second caller gets
/// `ImportInProgress` instead of queueing.
const IMPORT_LOCK_KEY: i64 = 0x7061_636b_6c69_6e65; // "packline"

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Inventory file not found: {0}")]
    FeedNotFound(String),
    #[error("Inventory feed is malformed: {0}")]
    FeedMalformed(String),
    #[error("Cannot proceed: products is referenced by foreign keys outside the storefront schema: {0}")]
    ForeignReferenceConflict(String),
    #[error("Another inventory import is already running")]
    ImportInProgress,
    #[error("Catalog swap failed: {0}")]
    SwapFailed(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ImportError {
    /// Pipeline stage name, surfaced to the administrative caller
    pub fn stage(&self) -> &'static str {
        match self {
            ImportError::FeedNotFound(_) | ImportError::FeedMalformed(_) => "feed",
            ImportError::ForeignReferenceConflict(_) => "preflight",
            ImportError::ImportInProgress => "lock",
            ImportError::SwapFailed(_) => "swap",
            ImportError::Store(_) => "store",
        }
    }

    /// User errors are fixable by the operator (bad feed, external
    /// referrer); the rest are operational failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ImportError::FeedNotFound(_)
                | ImportError::FeedMalformed(_)
                | ImportError::ForeignReferenceConflict(_)
                | ImportError::ImportInProgress
        )
    }
}

/// One entry of the external product feed, normalized
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub name: String,
    pub description: String,
    pub price: f64,
}

/// The staged replacement catalog, computed before any write:
/// dense identifiers assigned in case-insensitive name order.
#[derive(Debug)]
pub struct RebuildPlan {
    /// (new id, entry) pairs, ids dense from 1, ordered by name
    pub rows: Vec<(Id, FeedEntry)>,
    /// name -> new id, used to remap historical line items
    pub name_to_id: HashMap<String, Id>,
    /// Duplicate-name notes; duplicates are a warning, not an error
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub products: usize,
    pub remapped_line_items: u64,
    /// Old identifiers whose name vanished from the feed; their line
    /// items keep pointing at these now-retired ids
    pub retired_product_ids: Vec<Id>,
    pub warnings: Vec<String>,
}

/// Read and parse the feed file
pub fn load_feed(path: &str) -> Result<Vec<FeedEntry>, ImportError> {
    if !Path::new(path).exists() {
        return Err(ImportError::FeedNotFound(path.to_string()));
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read inventory feed {}", path))?;
    parse_feed(&bytes)
}

/// Parse the feed: a JSON array of objects with a required non-empty
/// `name`, optional `description` (defaults to empty) and optional
/// `price` (defaults to 0, clamped to be non-negative).
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>, ImportError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ImportError::FeedMalformed(format!("not valid JSON: {}", e)))?;

    let Value::Array(items) = value else {
        return Err(ImportError::FeedMalformed(
            "expected a list of product entries".to_string(),
        ));
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(ImportError::FeedMalformed(format!(
                "entry {} is not an object",
                index
            )));
        };

        let name = match map.get("name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                return Err(ImportError::FeedMalformed(format!(
                    "entry {} has no usable name",
                    index
                )))
            }
        };

        let description = map
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let price = map
            .get("price")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .max(0.0);

        entries.push(FeedEntry {
            name,
            description,
            price,
        });
    }

    Ok(entries)
}

/// Plan the rebuilt catalog: stable case-insensitive sort by name,
/// duplicates collapsed keeping the last entry in sorted order, dense
/// identifiers assigned from 1 in name order.
pub fn plan_rebuild(entries: Vec<FeedEntry>) -> RebuildPlan {
    let sorted: Vec<FeedEntry> = entries
        .into_iter()
        .sorted_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .collect();

    let mut warnings = Vec::new();
    let mut deduped: Vec<FeedEntry> = Vec::with_capacity(sorted.len());
    for entry in sorted {
        match deduped.last_mut() {
            // Tie-break for identical names: last in sorted order wins
            Some(last) if last.name == entry.name => {
                warnings.push(format!(
                    "duplicate feed entry for '{}': keeping the later one",
                    entry.name
                ));
                *last = entry;
            }
            _ => deduped.push(entry),
        }
    }

    let mut name_to_id = HashMap::with_capacity(deduped.len());
    let rows: Vec<(Id, FeedEntry)> = deduped
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let id = index as Id + 1;
            name_to_id.insert(entry.name.clone(), id);
            (id, entry)
        })
        .collect();

    RebuildPlan {
        rows,
        name_to_id,
        warnings,
    }
}

/// Compute (old id -> new id) rewrites from the pre-import snapshot.
/// Names absent from the feed produce no rewrite: their line items
/// deliberately keep pointing at the retired identifier.
pub fn compute_rewrites(
    snapshot: &[(Id, String)],
    name_to_id: &HashMap<String, Id>,
) -> Vec<(Id, Id)> {
    snapshot
        .iter()
        .filter_map(|(old_id, name)| match name_to_id.get(name) {
            Some(&new_id) if new_id != *old_id => Some((*old_id, new_id)),
            _ => None,
        })
        .collect()
}

/// Run the full import pipeline against the store.
///
/// The whole sequence executes inside one transaction: snapshot, upsert,
/// staging rebuild, line-item remap, and the drop/rename swap either all
/// become visible at commit or none do. Readers see the fully-old or
/// fully-new catalog, never a partial one.
pub async fn run_import(
    pool: &PgPool,
    cache: &ProductCache,
    feed_path: &str,
) -> Result<ImportReport, ImportError> {
    let entries = load_feed(feed_path)?;
    let plan = plan_rebuild(entries);

    let mut report = ImportReport {
        products: plan.rows.len(),
        warnings: plan.warnings.clone(),
        ..Default::default()
    };

    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin import transaction")?;

    // Exclusive pipeline lock, released automatically at commit/rollback
    let locked: bool = sqlx::query("SELECT pg_try_advisory_xact_lock($1) AS locked")
        .bind(IMPORT_LOCK_KEY)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to acquire import lock")?
        .get("locked");
    if !locked {
        return Err(ImportError::ImportInProgress);
    }

    // Preflight: refuse to drop the table out from under an external referrer.
    // order_items is ours and is remapped below, anything else aborts.
    let referrers: Vec<String> = sqlx::query(
        r#"
        SELECT conrelid::regclass::text AS referrer
        FROM pg_constraint
        WHERE contype = 'f'
          AND confrelid = 'products'::regclass
          AND conrelid <> 'order_items'::regclass
        "#,
    )
    .fetch_all(&mut *tx)
    .await
    .context("Failed to check for external foreign keys")?
    .into_iter()
    .map(|row| row.get("referrer"))
    .collect();
    if !referrers.is_empty() {
        return Err(ImportError::ForeignReferenceConflict(referrers.join(", ")));
    }

    // Snapshot the pre-import catalog: the remap pre-image and the backup
    let snapshot_rows = sqlx::query("SELECT id, name, description, price FROM products ORDER BY id")
        .fetch_all(&mut *tx)
        .await
        .context("Failed to snapshot products")?;
    let snapshot: Vec<(Id, String)> = snapshot_rows
        .iter()
        .map(|row| (row.get("id"), row.get("name")))
        .collect();

    write_backup(feed_path, &snapshot_rows, &mut report);

    // Upsert pass: guarantee every feed name has some identifier before
    // the rebuild. Superseded by the staging table below.
    let mut next_id: Id = snapshot.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
    for (_, entry) in &plan.rows {
        let updated = sqlx::query("UPDATE products SET description = $2, price = $3 WHERE name = $1")
            .bind(&entry.name)
            .bind(&entry.description)
            .bind(entry.price)
            .execute(&mut *tx)
            .await
            .context("Failed to upsert product")?;
        if updated.rows_affected() == 0 {
            sqlx::query("INSERT INTO products (id, name, description, price) VALUES ($1, $2, $3, $4)")
                .bind(next_id)
                .bind(&entry.name)
                .bind(&entry.description)
                .bind(entry.price)
                .execute(&mut *tx)
                .await
                .context("Failed to insert product")?;
            next_id += 1;
        }
    }

    // Staging rebuild: dense ids in name order
    sqlx::query("DROP TABLE IF EXISTS products_staging")
        .execute(&mut *tx)
        .await
        .context("Failed to drop stale staging table")?;
    sqlx::query("CREATE TABLE products_staging (LIKE products INCLUDING ALL)")
        .execute(&mut *tx)
        .await
        .context("Failed to create staging table")?;
    for (id, entry) in &plan.rows {
        sqlx::query("INSERT INTO products_staging (id, name, description, price) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(&entry.name)
            .bind(&entry.description)
            .bind(entry.price)
            .execute(&mut *tx)
            .await
            .context("Failed to populate staging table")?;
    }

    // Patch line items in one statement. Applying the whole mapping at
    // once means a new id colliding with a different old id cannot
    // chain into a double rewrite.
    let rewrites = compute_rewrites(&snapshot, &plan.name_to_id);
    if !rewrites.is_empty() {
        let result = sqlx::query(REMAP_STATEMENT)
            .bind(
                rewrites
                    .iter()
                    .map(|(old, _)| *old)
                    .collect::<Vec<Id>>(),
            )
            .bind(
                rewrites
                    .iter()
                    .map(|(_, new)| *new)
                    .collect::<Vec<Id>>(),
            )
            .execute(&mut *tx)
            .await
            .context("Failed to remap line items")?;
        report.remapped_line_items = result.rows_affected();
    }

    report.retired_product_ids = snapshot
        .iter()
        .filter(|(_, name)| !plan.name_to_id.contains_key(name))
        .map(|(id, _)| *id)
        .collect();

    // Atomic swap: transactional DDL, so a failure here rolls everything
    // back including the remap above
    sqlx::query("DROP TABLE products")
        .execute(&mut *tx)
        .await
        .map_err(|e| ImportError::SwapFailed(e.to_string()))?;
    sqlx::query("ALTER TABLE products_staging RENAME TO products")
        .execute(&mut *tx)
        .await
        .map_err(|e| ImportError::SwapFailed(e.to_string()))?;

    tx.commit()
        .await
        .context("Failed to commit import transaction")?;

    // Only after a successful commit: stale listings must not outlive the swap
    cache.invalidate().await;

    log::info!(
        "inventory import complete: {} products, {} line items remapped, {} retired ids",
        report.products,
        report.remapped_line_items,
        report.retired_product_ids.len()
    );

    Ok(report)
}

/// UPDATE applying every (old -> new) pair at once via unnested arrays
const REMAP_STATEMENT: &str = r#"
    UPDATE order_items
    SET product_id = mapping.new_id
    FROM (SELECT unnest($1::bigint[]) AS old_id, unnest($2::bigint[]) AS new_id) AS mapping
    WHERE order_items.product_id = mapping.old_id
"#;

/// Best-effort pre-swap backup of the old catalog next to the feed file.
/// The transaction already guarantees rollback; the artifact is for
/// operators and may be left on disk.
fn write_backup(feed_path: &str, rows: &[sqlx::postgres::PgRow], report: &mut ImportReport) {
    let products: Vec<Value> = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "id": row.get::<Id, _>("id"),
                "name": row.get::<String, _>("name"),
                "description": row.get::<String, _>("description"),
                "price": row.get::<f64, _>("price"),
            })
        })
        .collect();

    let backup_path = format!("{}.bak", feed_path);
    match serde_json::to_vec_pretty(&products)
        .map_err(anyhow::Error::new)
        .and_then(|bytes| std::fs::write(&backup_path, bytes).map_err(anyhow::Error::new))
    {
        Ok(()) => log::debug!("wrote catalog backup to {}", backup_path),
        Err(e) => {
            let warning = format!("could not write catalog backup {}: {}", backup_path, e);
            log::warn!("{}", warning);
            report.warnings.push(warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, price: f64) -> FeedEntry {
        FeedEntry {
            name: name.to_string(),
            description: String::new(),
            price,
        }
    }

    #[test]
    fn test_parse_feed_defaults() {
        let feed = br#"[{"name": "BOX-A"}, {"name": "TAPE-B", "description": "48mm", "price": 2.5}]"#;
        let entries = parse_feed(feed).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "BOX-A");
        assert_eq!(entries[0].description, "");
        assert_eq!(entries[0].price, 0.0);
        assert_eq!(entries[1].description, "48mm");
        assert_eq!(entries[1].price, 2.5);
    }

    #[test]
    fn test_parse_feed_clamps_negative_price() {
        let entries = parse_feed(br#"[{"name": "BOX-A", "price": -3.0}]"#).unwrap();
        assert_eq!(entries[0].price, 0.0);
    }

    #[test]
    fn test_parse_feed_rejects_non_list() {
        assert!(matches!(
            parse_feed(br#"{"name": "BOX-A"}"#),
            Err(ImportError::FeedMalformed(_))
        ));
        assert!(matches!(
            parse_feed(b"not json"),
            Err(ImportError::FeedMalformed(_))
        ));
    }

    #[test]
    fn test_parse_feed_rejects_missing_name() {
        assert!(matches!(
            parse_feed(br#"[{"price": 1.0}]"#),
            Err(ImportError::FeedMalformed(_))
        ));
        assert!(matches!(
            parse_feed(br#"[{"name": "   "}]"#),
            Err(ImportError::FeedMalformed(_))
        ));
    }

    #[test]
    fn test_plan_rebuild_dense_ids_in_name_order() {
        let plan = plan_rebuild(vec![
            entry("tape-b", 2.0),
            entry("BOX-A", 1.0),
            entry("Wrap-C", 3.0),
        ]);

        let names: Vec<&str> = plan.rows.iter().map(|(_, e)| e.name.as_str()).collect();
        assert_eq!(names, vec!["BOX-A", "tape-b", "Wrap-C"]);
        let ids: Vec<Id> = plan.rows.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(plan.name_to_id["BOX-A"], 1);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_plan_rebuild_duplicate_name_last_wins() {
        let plan = plan_rebuild(vec![entry("DUP", 1.0), entry("DUP", 9.0)]);

        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.rows[0].1.price, 9.0);
        assert_eq!(plan.warnings.len(), 1);
    }

    #[test]
    fn test_plan_rebuild_is_deterministic() {
        let feed = || vec![entry("B", 2.0), entry("a", 1.0), entry("C", 3.0)];
        let first = plan_rebuild(feed());
        let second = plan_rebuild(feed());
        assert_eq!(first.rows, second.rows);
    }

    #[test]
    fn test_compute_rewrites_scenario_a() {
        // Existing store: BOX-A (id 5), OLD-X (id 6, not in feed)
        let snapshot = vec![(5, "BOX-A".to_string()), (6, "OLD-X".to_string())];
        let plan = plan_rebuild(vec![entry("BOX-A", 1.0), entry("TAPE-B", 2.0)]);

        let rewrites = compute_rewrites(&snapshot, &plan.name_to_id);

        // BOX-A moves 5 -> 1; OLD-X vanished so its id is left alone
        assert_eq!(rewrites, vec![(5, 1)]);

        // Applying the mapping atomically per line item: L1 follows
        // BOX-A, L2 keeps the retired identifier
        let line_items = vec![5, 6];
        let patched: Vec<Id> = line_items
            .iter()
            .map(|pid| {
                rewrites
                    .iter()
                    .find(|(old, _)| old == pid)
                    .map(|(_, new)| *new)
                    .unwrap_or(*pid)
            })
            .collect();
        assert_eq!(patched, vec![1, 6]);
    }

    #[test]
    fn test_compute_rewrites_handles_id_collisions() {
        // Old ids swap places in the new ordering: a row-by-row patch
        // applied in sequence would rewrite a line item twice
        let snapshot = vec![(1, "beta".to_string()), (2, "alpha".to_string())];
        let plan = plan_rebuild(vec![entry("beta", 1.0), entry("alpha", 1.0)]);

        let mut rewrites = compute_rewrites(&snapshot, &plan.name_to_id);
        rewrites.sort();
        assert_eq!(rewrites, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn test_compute_rewrites_no_change_no_rewrite() {
        let snapshot = vec![(1, "BOX-A".to_string())];
        let plan = plan_rebuild(vec![entry("BOX-A", 5.0)]);
        assert!(compute_rewrites(&snapshot, &plan.name_to_id).is_empty());
    }

    #[test]
    fn test_error_classification() {
        assert!(ImportError::FeedNotFound("x".into()).is_user_error());
        assert!(ImportError::ForeignReferenceConflict("y".into()).is_user_error());
        assert!(!ImportError::SwapFailed("z".into()).is_user_error());
        assert_eq!(ImportError::SwapFailed("z".into()).stage(), "swap");
    }
}
