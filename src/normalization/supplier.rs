//! Supplier record decomposition.
//!
//! Supplier exports pack several columns into two strings:
//! - `contact`: `"<name>, <title>"`
//! - `address`: `"<country>;<region>;<postal code>;<city>;<street>"`
//!
//! Everything here is pure; reading the export file is the only I/O and lives
//! in [`read_supplier_file`].
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{IngestError, Result};

const CONTACT_DELIMITER: &str = ", ";
const ADDRESS_DELIMITER: char = ';';

/// One object of the supplier JSON export, as found on disk.
///
/// Every field is optional at the serde level. Objects are converted one at a
/// time by [`decompose_values`], so a wrongly typed field only rejects its own
/// record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawSupplierRecord {
    pub company_name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub homepage: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub products: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A supplier with its compound fields split into columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedSupplier {
    pub company_name: String,
    pub contact_name: String,
    pub contact_title: String,
    pub address: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub phone: String,
    pub fax: Option<String>,
    pub homepage: Option<String>,
    /// Product names used to link `products` rows; only lives until backfill.
    pub products: Vec<String>,
}

/// A record left out of the batch, with its position in the input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub company_name: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Decomposed {
    pub suppliers: Vec<NormalizedSupplier>,
    pub skipped: Vec<SkippedRecord>,
}

/// Split one raw record into a [`NormalizedSupplier`].
pub fn decompose(raw: &RawSupplierRecord) -> Result<NormalizedSupplier> {
    let company_name = required("company_name", raw.company_name.as_deref())?;
    let phone = required("phone", raw.phone.as_deref())?;

    let contact = raw
        .contact
        .as_deref()
        .ok_or_else(|| IngestError::malformed("missing contact"))?;
    let (contact_name, contact_title) = split_contact(contact)?;

    let address = raw
        .address
        .as_deref()
        .ok_or_else(|| IngestError::malformed("missing address"))?;
    let parts = split_address(address)?;

    Ok(NormalizedSupplier {
        company_name,
        contact_name,
        contact_title,
        address: parts.street,
        city: parts.city,
        region: parts.region,
        postal_code: parts.postal_code,
        country: parts.country,
        phone,
        fax: passthrough(raw.fax.as_deref()),
        homepage: passthrough(raw.homepage.as_deref()),
        products: raw.products.clone(),
    })
}

/// Decompose a whole export. Malformed records are logged and collected in
/// `skipped`; they never abort the batch. Output order follows input order.
pub fn decompose_all(records: &[RawSupplierRecord]) -> Decomposed {
    let mut out = Decomposed::default();
    for (index, raw) in records.iter().enumerate() {
        out.push(index, raw.company_name.as_deref(), decompose(raw));
    }
    out
}

/// Like [`decompose_all`], for objects straight out of the export file.
///
/// An element that does not deserialize as a [`RawSupplierRecord`] (say a
/// numeric `phone`) is a malformed record like any other.
pub fn decompose_values(values: &[Value]) -> Decomposed {
    let mut out = Decomposed::default();
    for (index, value) in values.iter().enumerate() {
        let company = value.get("company_name").and_then(Value::as_str);
        let outcome = RawSupplierRecord::deserialize(value)
            .map_err(|e| IngestError::malformed(format!("invalid supplier object: {e}")))
            .and_then(|raw| decompose(&raw));
        out.push(index, company, outcome);
    }
    out
}

impl Decomposed {
    fn push(&mut self, index: usize, company: Option<&str>, outcome: Result<NormalizedSupplier>) {
        match outcome {
            Ok(supplier) => self.suppliers.push(supplier),
            Err(err) => {
                warn!(
                    index,
                    company = company.unwrap_or("<none>"),
                    error = %err,
                    "skipping supplier record"
                );
                self.skipped.push(SkippedRecord {
                    index,
                    company_name: company.map(str::to_string),
                    reason: err.to_string(),
                });
            }
        }
    }
}

/// Read the JSON array of supplier objects at `path`.
///
/// Only a file that is not a JSON array fails here; each element is checked
/// later by [`decompose_values`].
pub fn read_supplier_file(path: &Path) -> Result<Vec<Value>> {
    let raw = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| IngestError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, PartialEq, Eq)]
struct AddressParts {
    country: String,
    region: Option<String>,
    postal_code: Option<String>,
    city: String,
    street: Option<String>,
}

fn split_contact(contact: &str) -> Result<(String, String)> {
    // Name and title are the first two parts; any further parts are dropped.
    let mut parts = contact.split(CONTACT_DELIMITER);
    let (Some(name), Some(title)) = (parts.next(), parts.next()) else {
        return Err(IngestError::malformed(format!(
            "contact {contact:?} is not \"name, title\""
        )));
    };
    Ok((
        required("contact_name", Some(name))?,
        required("contact_title", Some(title))?,
    ))
}

fn split_address(address: &str) -> Result<AddressParts> {
    let (country, region, postal_code, city, street) = address
        .split(ADDRESS_DELIMITER)
        .map(str::trim)
        .collect_tuple()
        .ok_or_else(|| {
            IngestError::malformed(format!(
                "address {address:?} does not have 5 ';'-separated segments"
            ))
        })?;

    Ok(AddressParts {
        country: required("country", Some(country))?,
        region: non_blank(region),
        postal_code: non_blank(postal_code),
        city: required("city", Some(city))?,
        street: non_blank(street),
    })
}

fn required(field: &str, value: Option<&str>) -> Result<String> {
    value
        .and_then(non_blank)
        .ok_or_else(|| IngestError::malformed(format!("{field} is missing or blank")))
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// fax and homepage keep their original spelling, only blank values are dropped.
fn passthrough(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> RawSupplierRecord {
        RawSupplierRecord {
            company_name: Some("Acme".into()),
            contact: Some("Jane Doe, Manager".into()),
            address: Some("USA;;94105;SF;123 Main St".into()),
            phone: Some("555-1234".into()),
            fax: Some(String::new()),
            homepage: Some(String::new()),
            products: vec!["Gadget".into()],
        }
    }

    fn assert_malformed(result: Result<NormalizedSupplier>) {
        match result {
            Err(IngestError::MalformedRecord { .. }) => {}
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn decomposes_example_record() {
        let s = decompose(&acme()).unwrap();
        assert_eq!(s.company_name, "Acme");
        assert_eq!(s.contact_name, "Jane Doe");
        assert_eq!(s.contact_title, "Manager");
        assert_eq!(s.country, "USA");
        assert_eq!(s.region, None);
        assert_eq!(s.postal_code.as_deref(), Some("94105"));
        assert_eq!(s.city, "SF");
        assert_eq!(s.address.as_deref(), Some("123 Main St"));
        assert_eq!(s.phone, "555-1234");
        assert_eq!(s.fax, None);
        assert_eq!(s.homepage, None);
        assert_eq!(s.products, vec!["Gadget".to_string()]);
    }

    #[test]
    fn blank_optional_segments_are_absent_not_empty() {
        let mut raw = acme();
        raw.address = Some(" Germany ;  ; ;Berlin;   ".into());
        raw.fax = Some("   ".into());
        let s = decompose(&raw).unwrap();
        assert_eq!(s.country, "Germany");
        assert_eq!(s.city, "Berlin");
        assert_eq!(s.region, None);
        assert_eq!(s.postal_code, None);
        assert_eq!(s.address, None);
        assert_eq!(s.fax, None);
    }

    #[test]
    fn segments_are_trimmed() {
        let mut raw = acme();
        raw.contact = Some("  Charlotte Cooper ,  Purchasing Manager ".into());
        raw.address = Some("UK; ; EC1 4SD ;London; 49 Gilbert St. ".into());
        let s = decompose(&raw).unwrap();
        assert_eq!(s.contact_name, "Charlotte Cooper");
        assert_eq!(s.contact_title, "Purchasing Manager");
        assert_eq!(s.postal_code.as_deref(), Some("EC1 4SD"));
        assert_eq!(s.address.as_deref(), Some("49 Gilbert St."));
    }

    #[test]
    fn fax_and_homepage_pass_through_verbatim() {
        let mut raw = acme();
        raw.fax = Some("(171) 555-2222".into());
        raw.homepage = Some("#CAJUN.HTM#".into());
        let s = decompose(&raw).unwrap();
        assert_eq!(s.fax.as_deref(), Some("(171) 555-2222"));
        assert_eq!(s.homepage.as_deref(), Some("#CAJUN.HTM#"));
    }

    #[test]
    fn missing_and_null_optionals_are_absent() {
        let raw: RawSupplierRecord = serde_json::from_str(
            r#"{"company_name":"Acme","contact":"Jane Doe, Manager",
                "address":"USA;CA;94105;SF;1 Main","phone":"1","fax":null}"#,
        )
        .unwrap();
        let s = decompose(&raw).unwrap();
        assert_eq!(s.fax, None);
        assert_eq!(s.homepage, None);
        assert!(s.products.is_empty());
    }

    #[test]
    fn extra_contact_parts_are_dropped() {
        let mut raw = acme();
        raw.contact = Some("Jane Doe, Manager, Sales".into());
        let s = decompose(&raw).unwrap();
        assert_eq!(s.contact_name, "Jane Doe");
        assert_eq!(s.contact_title, "Manager");
    }

    #[test]
    fn one_part_contact_is_malformed() {
        let mut raw = acme();
        raw.contact = Some("Jane Doe".into());
        assert_malformed(decompose(&raw));
    }

    #[test]
    fn blank_contact_title_is_malformed() {
        let mut raw = acme();
        raw.contact = Some("Jane Doe,  ".into());
        assert_malformed(decompose(&raw));
    }

    #[test]
    fn short_address_is_malformed() {
        let mut raw = acme();
        raw.address = Some("USA;;94105;SF".into());
        assert_malformed(decompose(&raw));
    }

    #[test]
    fn long_address_is_malformed() {
        let mut raw = acme();
        raw.address = Some("USA;;94105;SF;123 Main St;Suite 4".into());
        assert_malformed(decompose(&raw));
    }

    #[test]
    fn blank_country_or_city_is_malformed() {
        let mut raw = acme();
        raw.address = Some(" ;;94105;SF;123 Main St".into());
        assert_malformed(decompose(&raw));

        let mut raw = acme();
        raw.address = Some("USA;;94105; ;123 Main St".into());
        assert_malformed(decompose(&raw));
    }

    #[test]
    fn missing_required_scalars_are_malformed() {
        let mut raw = acme();
        raw.company_name = None;
        assert_malformed(decompose(&raw));

        let mut raw = acme();
        raw.phone = Some(" ".into());
        assert_malformed(decompose(&raw));

        let mut raw = acme();
        raw.contact = None;
        assert_malformed(decompose(&raw));
    }

    #[test]
    fn products_keep_order() {
        let mut raw = acme();
        raw.products = vec!["b".into(), "a".into(), "b".into()];
        let s = decompose(&raw).unwrap();
        assert_eq!(s.products, vec!["b", "a", "b"]);
    }

    #[test]
    fn decompose_all_skips_bad_records_and_keeps_order() {
        let mut bad = acme();
        bad.company_name = Some("Broken".into());
        bad.contact = Some("nobody".into());
        let mut second = acme();
        second.company_name = Some("Second".into());

        let out = decompose_all(&[acme(), bad, second]);
        let names: Vec<_> = out.suppliers.iter().map(|s| s.company_name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Second"]);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].index, 1);
        assert_eq!(out.skipped[0].company_name.as_deref(), Some("Broken"));
        assert!(out.skipped[0].reason.contains("contact"));
    }

    #[test]
    fn null_products_are_empty() {
        let raw: RawSupplierRecord =
            serde_json::from_str(r#"{"company_name":"Acme","products":null}"#).unwrap();
        assert!(raw.products.is_empty());
    }

    #[test]
    fn mistyped_object_is_skipped_not_fatal() {
        let path = std::env::temp_dir().join(format!(
            "northwind_suppliers_{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"[
                {"company_name":"Acme","contact":"Jane Doe, Manager","address":"USA;;94105;SF;1 Main","phone":"555-1234","products":["Gadget"]},
                {"company_name":"Tokyo Traders","contact":"Yoshi Nagase, Marketing Manager","address":"Japan;;100;Tokyo;9-8 Sekimai","phone":5551234,"products":null}
            ]"#,
        )
        .unwrap();

        let values = read_supplier_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        let out = decompose_values(&values);

        assert_eq!(out.suppliers.len(), 1);
        assert_eq!(out.suppliers[0].company_name, "Acme");
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].index, 1);
        assert_eq!(out.skipped[0].company_name.as_deref(), Some("Tokyo Traders"));
        assert!(out.skipped[0].reason.contains("integer"), "{}", out.skipped[0].reason);
    }

    #[test]
    fn non_array_file_is_invalid_json() {
        let path = std::env::temp_dir().join(format!(
            "northwind_not_array_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"company_name":"Acme"}"#).unwrap();
        let err = read_supplier_file(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, IngestError::InvalidJson { .. }), "{err:?}");
    }
}
