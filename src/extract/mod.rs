//! Extraction dispatcher.
//!
//! For each classified asset of a newly-fetched bundle, locates the one
//! object matching the record's file signature and routes it to the right
//! capability by category range: `[0,100)` image export, `[100,200)`
//! scripted-document assembly. The signature must identify exactly one
//! object; zero or multiple matches is a consistency failure.

pub mod bundle;
pub mod error;
pub mod ripper;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

pub use bundle::{BundleDump, BundleReader, ObjectDump};
pub use error::ExtractError;
pub use ripper::RipperCommand;

use crate::classify::{self, Category, CATEGORY_LIMIT, SCRIPTED_CATEGORY_BASE};
use crate::state::{AssetRecord, FileSignature};

/// Engine type names that carry exportable image data.
const IMAGE_TYPES: &[&str] = &["Texture2D", "Sprite"];

/// Entry object type name for scripted assets.
const SCRIPTED_TYPE: &str = "MonoBehaviour";

/// Accepted spellings of the ordered-child-list field. Two spellings exist
/// in published data; both name the same semantic field, so they are kept
/// as permanent aliases (first spelling preferred).
const ORDER_LIST_FIELDS: &[&str] = &["m_odrlist", "m_ordrlist"];

/// Key wrapping the assembled child documents in the output file.
const ORDER_LIST_KEY: &str = "order_list";

fn is_image_category(category: Category) -> bool {
    category < SCRIPTED_CATEGORY_BASE
}

fn is_scripted_category(category: Category) -> bool {
    (SCRIPTED_CATEGORY_BASE..CATEGORY_LIMIT).contains(&category)
}

/// Extract every supported asset of the newly fetched bundles.
///
/// Reads each bundle in `new_bundles` once and dispatches its records in
/// persisted order. Unchanged bundles are never re-opened.
pub fn extract_new_assets<R: BundleReader>(
    reader: &R,
    assets: &[AssetRecord],
    new_bundles: &BTreeSet<String>,
    cache_dir: &Path,
    output_dir: &Path,
) -> Result<u64, ExtractError> {
    let mut by_bundle: BTreeMap<&str, Vec<&AssetRecord>> = BTreeMap::new();
    for record in assets {
        if new_bundles.contains(&record.bundle) {
            by_bundle.entry(&record.bundle).or_default().push(record);
        }
    }

    let mut extracted = 0u64;
    for (bundle_name, records) in by_bundle {
        let bundle_path = cache_dir.join(bundle_name);
        let dump = reader.read(&bundle_path)?;
        for record in records {
            let out_path = output_path(output_dir, record);
            tracing::info!(
                bundle = %bundle_name,
                out = %out_path.display(),
                "Extracting asset"
            );
            extract_record(reader, &dump, &bundle_path, record, &out_path)?;
            extracted += 1;
        }
    }
    Ok(extracted)
}

/// Extract a single record from an already-read bundle.
pub fn extract_record<R: BundleReader>(
    reader: &R,
    dump: &BundleDump,
    bundle_path: &Path,
    record: &AssetRecord,
    out_path: &Path,
) -> Result<(), ExtractError> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let signature = record.signature();
    if is_image_category(record.category) {
        let object = find_image_object(dump, &signature, bundle_path)?;
        reader.export_image(bundle_path, object.path_id, out_path)
    } else if is_scripted_category(record.category) {
        let entry = find_scripted_entry(dump, &signature, bundle_path)?;
        let document = assemble_ordered_document(dump, entry)?;
        fs::write(out_path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    } else {
        Err(ExtractError::UnknownCategory {
            category: record.category,
        })
    }
}

/// Where a record's output lands under the output directory.
fn output_path(output_dir: &Path, record: &AssetRecord) -> PathBuf {
    let mut path = output_dir.join(&record.out_dir);
    if !record.out_subdir.is_empty() {
        path.push(&record.out_subdir);
    }
    path.push(&record.file_name);
    path
}

/// Find the single image object whose container path classifies to the
/// signature.
fn find_image_object<'a>(
    dump: &'a BundleDump,
    signature: &FileSignature<'_>,
    bundle_path: &Path,
) -> Result<&'a ObjectDump, ExtractError> {
    let candidates = dump
        .objects
        .iter()
        .filter(|o| IMAGE_TYPES.contains(&o.type_name.as_str()));
    unique_signature_match(candidates, signature, bundle_path)
}

/// Find the single scripted entry object: a named `MonoBehaviour` whose
/// container path classifies to the signature.
fn find_scripted_entry<'a>(
    dump: &'a BundleDump,
    signature: &FileSignature<'_>,
    bundle_path: &Path,
) -> Result<&'a ObjectDump, ExtractError> {
    let candidates = dump.objects.iter().filter(|o| {
        o.type_name == SCRIPTED_TYPE && o.name.as_deref().is_some_and(|n| !n.is_empty())
    });
    unique_signature_match(candidates, signature, bundle_path)
}

fn unique_signature_match<'a>(
    candidates: impl Iterator<Item = &'a ObjectDump>,
    signature: &FileSignature<'_>,
    bundle_path: &Path,
) -> Result<&'a ObjectDump, ExtractError> {
    let mut found: Option<&ObjectDump> = None;
    for object in candidates {
        let Some(container) = object.container.as_deref() else {
            continue;
        };
        let Some(classification) = classify::classify(container)? else {
            continue;
        };
        if !signature.matches(&classification) {
            continue;
        }
        if found.is_some() {
            return Err(ExtractError::DuplicateSignature {
                signature: describe(signature),
                bundle: bundle_path.display().to_string(),
            });
        }
        found = Some(object);
    }
    found.ok_or_else(|| ExtractError::SignatureNotFound {
        signature: describe(signature),
        bundle: bundle_path.display().to_string(),
    })
}

fn describe(signature: &FileSignature<'_>) -> String {
    format!(
        "({}, {}, {}, {})",
        signature.category, signature.out_dir, signature.out_subdir, signature.file_name
    )
}

/// Walk the entry object's ordered child list and assemble the output
/// document: each child's decoded typetree wrapped under its script class
/// name, in list order, under a single `order_list` key.
fn assemble_ordered_document(
    dump: &BundleDump,
    entry: &ObjectDump,
) -> Result<Value, ExtractError> {
    let entry_name = entry.name.clone().unwrap_or_default();
    let tree = entry
        .typetree
        .as_ref()
        .ok_or(ExtractError::MissingTypetree {
            path_id: entry.path_id,
        })?;

    let order_list = ORDER_LIST_FIELDS
        .iter()
        .find_map(|field| tree.get(field))
        .and_then(Value::as_array)
        .ok_or_else(|| ExtractError::MissingOrderList {
            name: entry_name.clone(),
        })?;

    let mut children = Vec::with_capacity(order_list.len());
    for reference in order_list {
        let path_id = reference
            .get("m_PathID")
            .and_then(Value::as_i64)
            .ok_or_else(|| ExtractError::MissingChildReference {
                name: entry_name.clone(),
            })?;
        let child = dump
            .object(path_id)
            .ok_or(ExtractError::MissingChild { path_id })?;
        let child_tree = child
            .typetree
            .clone()
            .ok_or(ExtractError::MissingTypetree { path_id })?;
        let script = child
            .script
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ExtractError::MissingScriptName { path_id })?;

        let mut wrapper = serde_json::Map::new();
        wrapper.insert(script.to_string(), child_tree);
        children.push(Value::Object(wrapper));
    }

    let mut document = serde_json::Map::new();
    document.insert(ORDER_LIST_KEY.to_string(), Value::Array(children));
    Ok(Value::Object(document))
}
