//! Builds the normalized contact graph from one sync payload.
//!
//! Normalization is total over well-formed rows and lossy over broken
//! ones: a row that cannot be placed or typed is logged and dropped, and
//! the rest of the sync continues. Re-running over the same payload
//! produces the same graph.

use std::collections::HashMap;

use tracing::{debug, warn};

use tether_shared::error::SchemaError;

use crate::model::{Contact, ContactDatum, ContactGraph, ContactsPayload, RawContact, ThirdPartyPackage};
use crate::schema::SchemaRegistry;

/// Everything one sync produced: the graph plus the session schema table
/// and the third-party package index the derived views need.
#[derive(Debug, Clone, Default)]
pub struct NormalizedContacts {
    pub graph: ContactGraph,
    pub registry: SchemaRegistry,
    /// account type -> declaring package name.
    pub packages: HashMap<String, String>,
    /// package name -> its declarations, as received.
    pub third_party: HashMap<String, ThirdPartyPackage>,
}

impl NormalizedContacts {
    pub fn package_for_account(&self, account_type: &str) -> Option<&ThirdPartyPackage> {
        self.packages
            .get(account_type)
            .and_then(|name| self.third_party.get(name))
    }
}

/// Normalize one contact-sync payload into the session contact set.
pub fn normalize(payload: ContactsPayload) -> NormalizedContacts {
    let mut registry = SchemaRegistry::new();
    let mut packages = HashMap::new();

    // 1. Register every peer-declared schema row for the session.
    for (package_name, package) in &payload.third_party_data {
        if let Some(account_type) = &package.account_type {
            packages.insert(account_type.clone(), package_name.clone());
        }
        for (mimetype, schema) in &package.data_kinds {
            registry.register_third_party(mimetype.clone(), schema.clone());
        }
    }

    // 2. Index every contact.
    let mut graph = ContactGraph::default();
    for row in payload.contacts {
        graph.contacts.insert(
            row.id,
            Contact {
                id: row.id,
                name_raw_contact_id: row.name_raw_contact_id,
                columns: row.columns,
                raw_contacts: Default::default(),
            },
        );
    }

    // 3. Attach raw contacts, excluding deleted ones entirely.
    let mut owner_of: HashMap<i64, i64> = HashMap::new();
    for row in payload.raw_contacts {
        if row.deleted {
            debug!(raw_contact = row.id, "Skipping deleted raw contact");
            continue;
        }
        let Some(contact) = graph.contacts.get_mut(&row.contact_id) else {
            warn!(
                error = %SchemaError::OrphanedRawContact {
                    raw_contact_id: row.id,
                    contact_id: row.contact_id,
                },
                "Dropping raw contact"
            );
            continue;
        };
        owner_of.insert(row.id, row.contact_id);
        contact.raw_contacts.insert(
            row.id,
            RawContact {
                id: row.id,
                contact_id: row.contact_id,
                account_type: row.account_type,
                columns: row.columns,
                data: Default::default(),
            },
        );
    }

    // 4. Resolve and attach data rows. Rows pointing at deleted or
    // unknown raw contacts are orphans; rows with unresolvable
    // mimetypes are untypable. Both drop without aborting the sync.
    let mut dropped = 0usize;
    for row in payload.data {
        let Some(contact_id) = owner_of.get(&row.raw_contact_id) else {
            warn!(
                error = %SchemaError::OrphanedRow {
                    data_id: row.id,
                    raw_contact_id: row.raw_contact_id,
                },
                "Dropping data row"
            );
            dropped += 1;
            continue;
        };

        let fields = match registry.resolve(&row.mimetype, |name| row.col(name)) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(data = row.id, error = %e, "Dropping data row");
                dropped += 1;
                continue;
            }
        };

        let raw_contact = graph
            .contacts
            .get_mut(contact_id)
            .and_then(|c| c.raw_contacts.get_mut(&row.raw_contact_id))
            .expect("owner_of only indexes attached raw contacts");

        raw_contact.data.insert(
            row.id,
            ContactDatum {
                id: row.id,
                raw_contact_id: row.raw_contact_id,
                mimetype: row.mimetype,
                kind: fields.kind(),
                columns: row.columns,
                fields,
            },
        );
    }

    debug!(
        contacts = graph.contact_count(),
        dropped, "Contact normalization finished"
    );

    NormalizedContacts {
        graph,
        registry,
        packages,
        third_party: payload.third_party_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataKind, DatumFields, PhoneFields};
    use serde_json::json;

    fn payload(value: serde_json::Value) -> ContactsPayload {
        serde_json::from_value(value).unwrap()
    }

    fn sample() -> serde_json::Value {
        json!({
            "thirdPartyData": {
                "com.example.chat": {
                    "account_type": "com.example",
                    "has_edit_schema": true,
                    "data_kinds": {
                        "vnd.com.example.chat/handle": {
                            "summaryColumn": "data1",
                            "detailColumn": "data2"
                        }
                    }
                }
            },
            "contacts": [
                {"_id": 1, "name_raw_contact_id": 10},
                {"_id": 2, "name_raw_contact_id": 20}
            ],
            "rawContacts": [
                {"_id": 10, "contact_id": 1, "deleted": 0, "account_type": "com.example"},
                {"_id": 20, "contact_id": 2, "deleted": 1, "account_type": "com.example"}
            ],
            "data": [
                {"_id": 100, "raw_contact_id": 10,
                 "mimetype": "vnd.android.cursor.item/phone_v2",
                 "data1": "555-1234", "data2": "2", "data3": null},
                {"_id": 101, "raw_contact_id": 10,
                 "mimetype": "vnd.com.example.chat/handle",
                 "data1": "alice", "data2": "away"},
                {"_id": 102, "raw_contact_id": 10,
                 "mimetype": "vnd.never.heard/of-it", "data1": "x"},
                {"_id": 103, "raw_contact_id": 20,
                 "mimetype": "vnd.android.cursor.item/phone_v2", "data1": "999"}
            ]
        })
    }

    #[test]
    fn test_phone_row_normalizes_to_typed_fields() {
        let set = normalize(payload(sample()));
        let datum = &set.graph.contacts[&1].raw_contacts[&10].data[&100];
        assert_eq!(datum.kind, DataKind::Phone);
        assert_eq!(
            datum.fields,
            DatumFields::Phone(PhoneFields {
                number: Some("555-1234".to_string()),
                type_code: Some("2".to_string()),
                label: None,
            })
        );
        // The raw column bag survives resolution.
        assert_eq!(datum.columns.get("data1"), Some(&json!("555-1234")));
    }

    #[test]
    fn test_third_party_row_resolves_via_declaration() {
        let set = normalize(payload(sample()));
        let datum = &set.graph.contacts[&1].raw_contacts[&10].data[&101];
        assert_eq!(datum.kind, DataKind::ThirdParty);
        match &datum.fields {
            DatumFields::ThirdParty(tp) => {
                assert_eq!(tp.summary.as_deref(), Some("alice"));
                assert_eq!(tp.detail.as_deref(), Some("away"));
            }
            other => panic!("expected third-party fields, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_mimetype_dropped_sync_continues() {
        let set = normalize(payload(sample()));
        let data = &set.graph.contacts[&1].raw_contacts[&10].data;
        assert!(!data.contains_key(&102));
        // The resolvable siblings still made it.
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_deleted_raw_contact_excluded_and_orphans_harmless() {
        let set = normalize(payload(sample()));
        // Deleted raw contact 20 is gone entirely, not tombstoned.
        assert!(set.graph.contacts[&2].raw_contacts.is_empty());
        // Its data row 103 was orphaned and dropped without a panic.
        let all: usize = set
            .graph
            .contacts
            .values()
            .flat_map(|c| c.raw_contacts.values())
            .map(|r| r.data.len())
            .sum();
        assert_eq!(all, 2);
    }

    #[test]
    fn test_raw_contact_with_unknown_owner_dropped() {
        let set = normalize(payload(json!({
            "contacts": [],
            "rawContacts": [{"_id": 10, "contact_id": 42}],
            "data": []
        })));
        assert_eq!(set.graph.contact_count(), 0);
    }

    #[test]
    fn test_normalization_idempotent() {
        let a = normalize(payload(sample()));
        let b = normalize(payload(sample()));
        assert_eq!(
            serde_json::to_value(&a.graph).unwrap(),
            serde_json::to_value(&b.graph).unwrap()
        );
    }

    #[test]
    fn test_package_index() {
        let set = normalize(payload(sample()));
        let pkg = set.package_for_account("com.example").unwrap();
        assert!(pkg.has_edit_schema);
        assert_eq!(set.packages["com.example"], "com.example.chat");
    }
}
