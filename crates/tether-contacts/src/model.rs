//! Wire shape of the contact-sync payload and the normalized graph built
//! from it.
//!
//! The phone ships three flat record sets (contacts, raw contacts, data
//! rows) plus the third-party schema declarations. Row ids are the
//! phone's own database ids; columns beyond the ones named here are kept
//! as an untyped bag so schema resolution can read any column a
//! declaration points at.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::schema::{DataKind, DatumFields, ThirdPartySchema};

/// The complete contact-sync payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactsPayload {
    #[serde(rename = "thirdPartyData", default)]
    pub third_party_data: HashMap<String, ThirdPartyPackage>,
    #[serde(default)]
    pub contacts: Vec<ContactRow>,
    #[serde(rename = "rawContacts", default)]
    pub raw_contacts: Vec<RawContactRow>,
    #[serde(default)]
    pub data: Vec<DataRow>,
}

/// Third-party schema declarations of one phone-side package.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThirdPartyPackage {
    pub account_type: Option<String>,
    #[serde(default)]
    pub has_edit_schema: bool,
    #[serde(default)]
    pub data_kinds: HashMap<String, ThirdPartySchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRow {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name_raw_contact_id: Option<i64>,
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawContactRow {
    #[serde(rename = "_id")]
    pub id: i64,
    pub contact_id: i64,
    #[serde(default, deserialize_with = "truthy")]
    pub deleted: bool,
    pub account_type: Option<String>,
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataRow {
    #[serde(rename = "_id")]
    pub id: i64,
    pub raw_contact_id: i64,
    pub mimetype: String,
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

impl DataRow {
    /// Read one raw column as text. Numbers are stringified, since the
    /// phone is inconsistent about whether type codes arrive as strings.
    pub fn col(&self, name: &str) -> Option<String> {
        column_text(&self.columns, name)
    }
}

fn column_text(columns: &Map<String, Value>, name: &str) -> Option<String> {
    match columns.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// The deleted flag arrives as 0/1, a bool, or is absent entirely.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0",
        _ => false,
    })
}

/// One data row with its schema resolution attached.
#[derive(Debug, Clone, Serialize)]
pub struct ContactDatum {
    pub id: i64,
    pub raw_contact_id: i64,
    pub mimetype: String,
    /// The raw column bag, untouched by resolution.
    #[serde(skip)]
    pub columns: Map<String, Value>,
    pub kind: DataKind,
    pub fields: DatumFields,
}

/// One account-scoped slice of a contact.
#[derive(Debug, Clone, Serialize)]
pub struct RawContact {
    pub id: i64,
    pub contact_id: i64,
    pub account_type: Option<String>,
    #[serde(skip)]
    pub columns: Map<String, Value>,
    pub data: BTreeMap<i64, ContactDatum>,
}

/// One aggregated person.
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: i64,
    pub name_raw_contact_id: Option<i64>,
    #[serde(skip)]
    pub columns: Map<String, Value>,
    pub raw_contacts: BTreeMap<i64, RawContact>,
}

/// The whole normalized dataset of one sync. Replaced wholesale on every
/// sync; never merged incrementally.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactGraph {
    pub contacts: BTreeMap<i64, Contact>,
}

impl ContactGraph {
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn get(&self, id: i64) -> Option<&Contact> {
        self.contacts.get(&id)
    }
}
