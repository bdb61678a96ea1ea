//! Creator financial dataset: loading and subject selection.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use creatorlens_shared::{CreatorLensError, Financials, Result, Subject, types::lenient};

/// One element of the dataset array, in its upstream camelCase shape.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorRecord {
    /// Free-form social links; only `farcaster.username` is used.
    #[serde(default)]
    pub socials: Option<Value>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub total_earnings_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub coin_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub market_cap: Option<f64>,
    /// Handle on the token platform.
    #[serde(default, deserialize_with = "lenient::text")]
    pub handle: Option<String>,
}

impl CreatorRecord {
    /// Content-platform username, if the record links one.
    pub fn farcaster_username(&self) -> Option<&str> {
        self.socials
            .as_ref()?
            .pointer("/farcaster/username")?
            .as_str()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn financials(&self) -> Financials {
        Financials {
            earnings_usd: self.total_earnings_usd,
            coin_address: self.coin_address.clone(),
            market_cap: self.market_cap,
            zora_handle: self.handle.clone(),
        }
    }
}

/// Load the dataset. The file must hold a JSON array; null elements and
/// elements of the wrong shape are kept as `None`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_creators(path: &Path) -> Result<Vec<Option<CreatorRecord>>> {
    let content = std::fs::read_to_string(path).map_err(|e| CreatorLensError::io(path, e))?;

    let rows: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
        CreatorLensError::parse(format!(
            "creator dataset {} is not a JSON array: {e}",
            path.display()
        ))
    })?;

    let records: Vec<Option<CreatorRecord>> = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Null => None,
            row => match serde_json::from_value(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(index, error = %e, "skipping malformed creator record");
                    None
                }
            },
        })
        .collect();

    info!(count = records.len(), "loaded creator dataset");
    Ok(records)
}

/// Subjects for every record that links a content-platform username, in
/// dataset order. The first record wins when a username repeats.
pub fn linked_subjects(records: &[Option<CreatorRecord>]) -> Vec<Subject> {
    let mut seen = HashSet::new();
    let mut subjects = Vec::new();

    for record in records.iter().flatten() {
        let Some(username) = record.farcaster_username() else {
            continue;
        };
        if !seen.insert(username.to_string()) {
            debug!(username, "duplicate username in dataset, keeping first record");
            continue;
        }
        subjects.push(Subject {
            username: username.to_string(),
            financials: record.financials(),
        });
    }

    subjects
}
