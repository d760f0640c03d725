//! Collapsed per-contact view for the UI layer.
//!
//! A contact aggregates several account-scoped raw contacts; the view
//! flattens them into one logical record: exactly one name, at most one
//! organization/nickname/SIP/note (first match wins, in datum-id order),
//! and ordered lists for the repeatable kinds.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::model::{Contact, ContactDatum};
use crate::normalize::NormalizedContacts;
use crate::schema::{
    DatumFields, EmailFields, EventFields, PhoneFields, RelationFields, StructuredName,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizationSummary {
    pub company: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressEntry {
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImEntry {
    pub data: Option<String>,
    pub protocol: Option<String>,
    pub custom_protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebsiteEntry {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactDetails {
    pub name: StructuredName,
    pub organization: OrganizationSummary,
    pub nickname: Option<String>,
    pub sip: Option<String>,
    pub note: Option<String>,
    pub phone: Vec<PhoneFields>,
    pub email: Vec<EmailFields>,
    pub address: Vec<AddressEntry>,
    pub im: Vec<ImEntry>,
    pub website: Vec<WebsiteEntry>,
    pub event: Vec<EventFields>,
    pub relation: Vec<RelationFields>,
}

/// Collapse one contact's raw contacts into a single logical record.
pub fn contact_details(set: &NormalizedContacts, contact: &Contact) -> ContactDetails {
    let mut details = ContactDetails {
        name: resolve_name(contact),
        ..Default::default()
    };

    // Gather every datum from raw contacts whose declaring package has an
    // edit schema; keyed by datum id so iteration order is stable.
    let mut all_data: BTreeMap<i64, &ContactDatum> = BTreeMap::new();
    for raw_contact in contact.raw_contacts.values() {
        let package = raw_contact
            .account_type
            .as_deref()
            .and_then(|account| set.package_for_account(account));
        let Some(package) = package else {
            debug!(
                raw_contact = raw_contact.id,
                account = ?raw_contact.account_type,
                "No package declaration for raw contact, skipping its data"
            );
            continue;
        };
        if !package.has_edit_schema {
            continue;
        }
        for (id, datum) in &raw_contact.data {
            all_data.insert(*id, datum);
        }
    }

    for datum in all_data.values() {
        match &datum.fields {
            DatumFields::Organization(org) => {
                if details.organization.company.is_none() && details.organization.title.is_none() {
                    details.organization = OrganizationSummary {
                        company: org.company.clone(),
                        title: org.title.clone(),
                    };
                }
            }
            DatumFields::Nickname(nick) => {
                if details.nickname.is_none() {
                    details.nickname = nick.name.clone();
                }
            }
            DatumFields::SipAddress(sip) => {
                if details.sip.is_none() {
                    details.sip = sip.address.clone();
                }
            }
            DatumFields::Note(note) => {
                if details.note.is_none() {
                    details.note = note.note.clone();
                }
            }
            DatumFields::Phone(phone) => details.phone.push(phone.clone()),
            DatumFields::Email(email) => details.email.push(email.clone()),
            DatumFields::Address(addr) => details.address.push(AddressEntry {
                address: addr.address.clone(),
                type_code: addr.type_code.clone(),
                label: addr.label.clone(),
            }),
            DatumFields::Im(im) => details.im.push(ImEntry {
                data: im.data.clone(),
                protocol: im.protocol.clone(),
                custom_protocol: im.custom_protocol.clone(),
            }),
            DatumFields::Website(site) => details.website.push(WebsiteEntry {
                url: site.url.clone(),
            }),
            DatumFields::Event(event) => details.event.push(event.clone()),
            DatumFields::Relation(rel) => details.relation.push(rel.clone()),
            _ => {}
        }
    }

    details
}

/// Submit edits for one contact back to the phone.
///
/// Write-back is out of scope for the sync core; the interface exists so
/// the UI layer has a seam to build the batch transaction against.
pub fn save_contact(_set: &NormalizedContacts, _contact_id: i64, _edited: &ContactDetails) {
    debug!("Contact write-back is not implemented");
}

// The name always comes from the contact's designated name raw contact,
// regardless of edit-schema declarations.
fn resolve_name(contact: &Contact) -> StructuredName {
    let name_row = contact
        .name_raw_contact_id
        .and_then(|id| contact.raw_contacts.get(&id))
        .and_then(|raw| {
            raw.data.values().find_map(|datum| match &datum.fields {
                DatumFields::Name(name) => Some(name.clone()),
                _ => None,
            })
        });

    name_row.unwrap_or_default()
}
