//! CSV parsers for the retail store and county FIPS tables.

use csv::{ReaderBuilder, StringRecord};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::analyzers::types::{CountyFipsMap, StoreRecord};
use crate::error::{ReportError, Result};
use crate::fetch::{HttpClient, fetch_source};

pub const ENTITY_NAME: &str = "Entity Name";
pub const TRADE_NAME: &str = "DBA Name";
pub const COUNTY: &str = "County";
pub const SQUARE_FOOTAGE: &str = "Square Footage";

pub const FIPS_COUNTY_NAME: &str = "County Name";
pub const FIPS_CODE: &str = "County FIPS";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Fetches and parses the retail store table.
pub async fn load_stores<C: HttpClient>(client: &C, locator: &str) -> Result<Vec<StoreRecord>> {
    let bytes = fetch_source(client, locator).await?;
    let stores = parse_stores(locator, &bytes)?;
    info!(source = %locator, rows = stores.len(), "Store table loaded");
    Ok(stores)
}

/// Fetches and parses the county FIPS table.
pub async fn load_fips<C: HttpClient>(client: &C, locator: &str) -> Result<CountyFipsMap> {
    let bytes = fetch_source(client, locator).await?;
    let fips = parse_fips(locator, &bytes)?;
    info!(source = %locator, counties = fips.len(), "FIPS table loaded");
    Ok(fips)
}

/// Decodes store rows from CSV bytes.
///
/// # Errors
///
/// `SchemaMismatch` when a required column is absent, `SourceUnavailable`
/// when the bytes are not valid CSV.
pub fn parse_stores(locator: &str, bytes: &[u8]) -> Result<Vec<StoreRecord>> {
    let mut rdr = ReaderBuilder::new().from_reader(strip_bom(bytes));
    let headers = read_headers(locator, &mut rdr)?;
    let [entity, trade, county, footage] =
        require_columns(locator, &headers, [ENTITY_NAME, TRADE_NAME, COUNTY, SQUARE_FOOTAGE])?;

    let mut stores = Vec::new();
    let mut unparsed_footage = 0usize;

    for result in rdr.records() {
        let record = result.map_err(|e| ReportError::source_unavailable(locator, e))?;
        // Text cells are kept verbatim; the join and grouping match exactly.
        let field = |idx: usize| record.get(idx).unwrap_or("").to_string();

        let raw_footage = record.get(footage).unwrap_or("");
        let square_footage = parse_footage(raw_footage);
        if square_footage.is_none() && !raw_footage.trim().is_empty() {
            unparsed_footage += 1;
        }

        let extra = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| ![entity, trade, county, footage].contains(i))
            .map(|(i, h)| (h.trim().to_string(), record.get(i).unwrap_or("").to_string()))
            .collect::<BTreeMap<_, _>>();

        stores.push(StoreRecord {
            entity_name: field(entity),
            trade_name: field(trade),
            county: field(county),
            square_footage,
            extra,
        });
    }

    if unparsed_footage > 0 {
        debug!(unparsed_footage, "Non-numeric square footage treated as unset");
    }
    Ok(stores)
}

/// Decodes the county FIPS table, one code per county name.
///
/// Rows with an empty or non-numeric code are skipped.
pub fn parse_fips(locator: &str, bytes: &[u8]) -> Result<CountyFipsMap> {
    let mut rdr = ReaderBuilder::new().from_reader(strip_bom(bytes));
    let headers = read_headers(locator, &mut rdr)?;
    let [name, code] = require_columns(locator, &headers, [FIPS_COUNTY_NAME, FIPS_CODE])?;

    let mut pairs = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        let record = result.map_err(|e| ReportError::source_unavailable(locator, e))?;
        let county = record.get(name).unwrap_or("");
        match record.get(code).unwrap_or("").trim().parse::<u32>() {
            Ok(fips) if !county.is_empty() => pairs.push((county.to_string(), fips)),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "FIPS rows without a usable code");
    }
    Ok(CountyFipsMap::from_pairs(pairs))
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

fn read_headers<R: std::io::Read>(locator: &str, rdr: &mut csv::Reader<R>) -> Result<StringRecord> {
    rdr.headers()
        .cloned()
        .map_err(|e| ReportError::source_unavailable(locator, e))
}

/// Resolves the index of each required column, naming every missing one.
fn require_columns<const N: usize>(
    locator: &str,
    headers: &StringRecord,
    columns: [&str; N],
) -> Result<[usize; N]> {
    let mut indices = [0usize; N];
    let mut missing = Vec::new();

    for (slot, column) in indices.iter_mut().zip(columns) {
        match headers.iter().position(|h| h.trim() == column) {
            Some(idx) => *slot = idx,
            None => missing.push(column.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(ReportError::SchemaMismatch {
            locator: locator.to_string(),
            missing,
        })
    }
}

/// Parses a footage cell; thousands separators are accepted.
fn parse_footage(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORES: &str = "\
County,License Number,Entity Name,DBA Name,Square Footage
Albany,1,ACME LLC,Acme Market,\"1,200\"
Bronx,2,BETA INC,Beta,0
Bronx,3,BETA INC,Beta Two,
Kings,4,GAMMA,Gamma,n/a
";

    #[test]
    fn test_parse_stores() {
        let stores = parse_stores("stores.csv", STORES.as_bytes()).unwrap();
        assert_eq!(stores.len(), 4);

        assert_eq!(stores[0].entity_name, "ACME LLC");
        assert_eq!(stores[0].trade_name, "Acme Market");
        assert_eq!(stores[0].county, "Albany");
        assert_eq!(stores[0].square_footage, Some(1200.0));
        assert_eq!(stores[0].extra.get("License Number").map(String::as_str), Some("1"));

        assert_eq!(stores[1].square_footage, Some(0.0));
        assert_eq!(stores[2].square_footage, None);
        assert_eq!(stores[3].square_footage, None);
    }

    #[test]
    fn test_parse_stores_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(STORES.as_bytes());
        let stores = parse_stores("stores.csv", &bytes).unwrap();
        assert_eq!(stores[0].county, "Albany");
    }

    #[test]
    fn test_parse_stores_missing_columns() {
        let csv = "County,Entity Name\nAlbany,ACME\n";
        match parse_stores("stores.csv", csv.as_bytes()) {
            Err(ReportError::SchemaMismatch { missing, .. }) => {
                assert_eq!(missing, vec![TRADE_NAME.to_string(), SQUARE_FOOTAGE.to_string()]);
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_stores_ragged_row_is_source_error() {
        let csv = "County,Entity Name,DBA Name,Square Footage\nAlbany,ACME\n";
        assert!(matches!(
            parse_stores("stores.csv", csv.as_bytes()),
            Err(ReportError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_parse_stores_header_only() {
        let csv = "County,Entity Name,DBA Name,Square Footage\n";
        assert!(parse_stores("stores.csv", csv.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_fips_dedupes() {
        let csv = "\
County Name,State FIPS,County Code,County FIPS,ZIP Code
Albany,36,1,36001,12007
Albany,36,1,36001,12009
Bronx,36,5,36005,10451
Broken,36,,,10000
";
        let fips = parse_fips("fips.csv", csv.as_bytes()).unwrap();
        assert_eq!(fips.len(), 2);
        assert_eq!(fips.get("Albany"), Some(36001));
        assert_eq!(fips.get("Bronx"), Some(36005));
        assert_eq!(fips.get("Broken"), None);
    }

    #[test]
    fn test_text_cells_keep_surrounding_whitespace() {
        let csv = "Entity Name,DBA Name,County,Square Footage\n\
ACME ,Acme, Albany ,10\n\
ACME,Acme,Albany,20\n";
        let stores = parse_stores("stores.csv", csv.as_bytes()).unwrap();
        assert_eq!(stores[0].entity_name, "ACME ");
        assert_eq!(stores[0].county, " Albany ");
        assert_eq!(stores[1].entity_name, "ACME");

        let csv = "County Name,County FIPS\n Albany, 36001\n";
        let fips = parse_fips("fips.csv", csv.as_bytes()).unwrap();
        assert_eq!(fips.get(" Albany"), Some(36001), "codes may be padded");
        assert_eq!(fips.get("Albany"), None);
    }

    #[test]
    fn test_parse_fips_missing_column() {
        let csv = "County,FIPS\nAlbany,36001\n";
        match parse_fips("fips.csv", csv.as_bytes()) {
            Err(ReportError::SchemaMismatch { missing, locator }) => {
                assert_eq!(locator, "fips.csv");
                assert_eq!(missing.len(), 2);
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }
}
