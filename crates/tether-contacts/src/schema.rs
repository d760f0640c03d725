//! Record-kind schemas for the phone's contact data rows.
//!
//! Each data row arrives as a flat bag of generic columns (`data1` ..
//! `data15`, plus a few named ones) tagged with a mimetype. A schema maps
//! those columns onto semantic fields for one kind of record. Built-in
//! schemas cover the stock Android kinds; third-party kinds are declared
//! by the peer at session setup with their own summary/detail columns and
//! resolve through the per-session [`SchemaRegistry`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use tether_shared::error::SchemaError;

/// Every record kind a datum can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    ThirdParty,
    Email,
    Event,
    GroupMembership,
    Identity,
    Im,
    Nickname,
    Note,
    Organization,
    Phone,
    Photo,
    Relation,
    SipAddress,
    Name,
    Address,
    Website,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailFields {
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFields {
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembershipFields {
    pub row_id: Option<String>,
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFields {
    pub identity: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImFields {
    pub data: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
    pub protocol: Option<String>,
    pub custom_protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicknameFields {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFields {
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationFields {
    pub company: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub job_description: Option<String>,
    pub symbol: Option<String>,
    pub phonetic_name: Option<String>,
    pub office_location: Option<String>,
    pub phonetic_name_style: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneFields {
    pub number: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoFields {
    pub file_id: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationFields {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipAddressFields {
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
}

/// The decomposed name record. Also produced by
/// [`crate::name::from_short_name`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredName {
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub prefix: Option<String>,
    pub middle_name: Option<String>,
    pub suffix: Option<String>,
    pub phonetic_given_name: Option<String>,
    pub phonetic_middle_name: Option<String>,
    pub phonetic_family_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFields {
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
    pub street: Option<String>,
    pub pobox: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteFields {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub label: Option<String>,
}

/// Fields of a peer-declared kind: one summary column, one detail column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyFields {
    pub summary: Option<String>,
    pub detail: Option<String>,
}

/// The resolved, typed fields of one data row. One variant per kind; the
/// mimetype decides which constructor runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatumFields {
    Email(EmailFields),
    Event(EventFields),
    GroupMembership(GroupMembershipFields),
    Identity(IdentityFields),
    Im(ImFields),
    Nickname(NicknameFields),
    Note(NoteFields),
    Organization(OrganizationFields),
    Phone(PhoneFields),
    Photo(PhotoFields),
    Relation(RelationFields),
    SipAddress(SipAddressFields),
    Name(StructuredName),
    Address(AddressFields),
    Website(WebsiteFields),
    ThirdParty(ThirdPartyFields),
}

impl DatumFields {
    pub fn kind(&self) -> DataKind {
        match self {
            Self::Email(_) => DataKind::Email,
            Self::Event(_) => DataKind::Event,
            Self::GroupMembership(_) => DataKind::GroupMembership,
            Self::Identity(_) => DataKind::Identity,
            Self::Im(_) => DataKind::Im,
            Self::Nickname(_) => DataKind::Nickname,
            Self::Note(_) => DataKind::Note,
            Self::Organization(_) => DataKind::Organization,
            Self::Phone(_) => DataKind::Phone,
            Self::Photo(_) => DataKind::Photo,
            Self::Relation(_) => DataKind::Relation,
            Self::SipAddress(_) => DataKind::SipAddress,
            Self::Name(_) => DataKind::Name,
            Self::Address(_) => DataKind::Address,
            Self::Website(_) => DataKind::Website,
            Self::ThirdParty(_) => DataKind::ThirdParty,
        }
    }
}

/// Column mapping declared by the peer for one third-party mimetype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartySchema {
    #[serde(rename = "summaryColumn")]
    pub summary_column: String,
    #[serde(rename = "detailColumn")]
    pub detail_column: String,
}

/// Per-session schema table: the built-in kinds plus everything the peer
/// declared at session setup. Immutable once the sync payload has been
/// registered.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    third_party: HashMap<String, ThirdPartySchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer-declared mimetype. Built-in mimetypes always win
    /// during resolution, so a colliding declaration is harmless.
    pub fn register_third_party(&mut self, mimetype: String, schema: ThirdPartySchema) {
        self.third_party.insert(mimetype, schema);
    }

    pub fn third_party(&self, mimetype: &str) -> Option<&ThirdPartySchema> {
        self.third_party.get(mimetype)
    }

    /// Resolve one row's mimetype to typed fields, reading raw columns
    /// through `col`. Unresolvable mimetypes are an error the caller
    /// drops per-row; they never abort the sync.
    pub fn resolve<F>(&self, mimetype: &str, col: F) -> Result<DatumFields, SchemaError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(fields) = resolve_builtin(mimetype, &col) {
            return Ok(fields);
        }
        if let Some(schema) = self.third_party.get(mimetype) {
            return Ok(DatumFields::ThirdParty(ThirdPartyFields {
                summary: col(&schema.summary_column),
                detail: col(&schema.detail_column),
            }));
        }
        Err(SchemaError::UnknownMimetype(mimetype.to_string()))
    }
}

fn resolve_builtin<F>(mimetype: &str, col: &F) -> Option<DatumFields>
where
    F: Fn(&str) -> Option<String>,
{
    let fields = match mimetype {
        "vnd.android.cursor.item/email_v2" => DatumFields::Email(EmailFields {
            address: col("data1"),
            type_code: col("data2"),
            label: col("data3"),
        }),
        "vnd.android.cursor.item/contact_event" => DatumFields::Event(EventFields {
            date: col("data1"),
            type_code: col("data2"),
            label: col("data3"),
        }),
        "vnd.android.cursor.item/group_membership" => {
            DatumFields::GroupMembership(GroupMembershipFields {
                row_id: col("data1"),
                source_id: col("group_sourceid"),
            })
        }
        "vnd.android.cursor.item/identity" => DatumFields::Identity(IdentityFields {
            identity: col("data1"),
            namespace: col("data2"),
        }),
        "vnd.android.cursor.item/im" => DatumFields::Im(ImFields {
            data: col("data1"),
            type_code: col("data2"),
            label: col("data3"),
            protocol: col("data5"),
            custom_protocol: col("data6"),
        }),
        "vnd.android.cursor.item/nickname" => DatumFields::Nickname(NicknameFields {
            name: col("data1"),
            type_code: col("data2"),
            label: col("data3"),
        }),
        "vnd.android.cursor.item/note" => DatumFields::Note(NoteFields { note: col("data1") }),
        "vnd.android.cursor.item/organization" => {
            DatumFields::Organization(OrganizationFields {
                company: col("data1"),
                type_code: col("data2"),
                label: col("data3"),
                title: col("data4"),
                department: col("data5"),
                job_description: col("data6"),
                symbol: col("data7"),
                phonetic_name: col("data8"),
                office_location: col("data9"),
                phonetic_name_style: col("data10"),
            })
        }
        "vnd.android.cursor.item/phone_v2" => DatumFields::Phone(PhoneFields {
            number: col("data1"),
            type_code: col("data2"),
            label: col("data3"),
        }),
        "vnd.android.cursor.item/photo" => DatumFields::Photo(PhotoFields {
            file_id: col("data14"),
            photo: col("data15"),
        }),
        "vnd.android.cursor.item/relation" => DatumFields::Relation(RelationFields {
            name: col("data1"),
            type_code: col("data2"),
            label: col("data3"),
        }),
        "vnd.android.cursor.item/sip_address" => DatumFields::SipAddress(SipAddressFields {
            address: col("data1"),
            type_code: col("data2"),
            label: col("data3"),
        }),
        "vnd.android.cursor.item/name" => DatumFields::Name(StructuredName {
            display_name: col("data1"),
            given_name: col("data2"),
            family_name: col("data3"),
            prefix: col("data4"),
            middle_name: col("data5"),
            suffix: col("data6"),
            phonetic_given_name: col("data7"),
            phonetic_middle_name: col("data8"),
            phonetic_family_name: col("data9"),
        }),
        "vnd.android.cursor.item/postal-address_v2" => DatumFields::Address(AddressFields {
            address: col("data1"),
            type_code: col("data2"),
            label: col("data3"),
            street: col("data4"),
            pobox: col("data5"),
            neighborhood: col("data6"),
            city: col("data7"),
            region: col("data8"),
            postcode: col("data9"),
            country: col("data10"),
        }),
        "vnd.android.cursor.item/website" => DatumFields::Website(WebsiteFields {
            url: col("data1"),
            type_code: col("data2"),
            label: col("data3"),
        }),
        _ => return None,
    };
    Some(fields)
}

// Custom, Home, Work, Other -- shared by IM and postal address types.
const CHWO: &[(&str, &str)] = &[("0", ""), ("1", "Home"), ("2", "Work"), ("3", "Other")];

/// Display label for a kind's numeric type code, e.g. phone type `"2"`
/// is "Mobile". Codes the tables don't know map to `None`; the UI falls
/// back to the row's custom label field.
pub fn type_label(kind: DataKind, code: &str) -> Option<&'static str> {
    let table: &[(&str, &str)] = match kind {
        DataKind::Email => &[
            ("0", ""),
            ("1", "Home"),
            ("2", "Work"),
            ("3", "Other"),
            ("4", "Mobile"),
        ],
        DataKind::Event => &[
            ("0", ""),
            ("1", "Anniversary"),
            ("2", "Other"),
            ("3", "Birthday"),
        ],
        DataKind::Im => CHWO,
        DataKind::Nickname => &[
            ("0", ""),
            ("1", "Default"),
            ("2", "Other Name"),
            ("3", "Maiden Name"),
            ("4", "Short Name"),
            ("5", "Initials"),
        ],
        DataKind::Organization => &[("0", ""), ("1", "Work"), ("2", "Other")],
        DataKind::Phone => &[
            ("0", ""),
            ("1", "Home"),
            ("2", "Mobile"),
            ("3", "Work"),
            ("4", "Work (Fax)"),
            ("5", "Home (Fax)"),
            ("6", "Pager"),
            ("7", "Other"),
            ("8", "Callback"),
            ("9", "Car"),
            ("10", "Company"),
            ("11", "ISDN"),
            ("12", "Main"),
            ("13", "Fax (Other)"),
            ("14", "Radio"),
            ("15", "Telex"),
            ("16", "TTY/TTD"),
            ("17", "Work (Mobile)"),
            ("18", "Work (Pager)"),
            ("19", "Assistant"),
            ("20", "MMS"),
        ],
        DataKind::Relation => &[
            ("0", ""),
            ("1", "Assistant"),
            ("2", "Brother"),
            ("3", "Child"),
            ("4", "Domestic Partner"),
            ("5", "Father"),
            ("6", "Friend"),
            ("7", "Manager"),
            ("8", "Mother"),
            ("9", "Parent"),
            ("10", "Partner"),
            ("11", "Referred By"),
            ("12", "Relative"),
            ("13", "Sister"),
            ("14", "Spouse"),
        ],
        DataKind::Address => CHWO,
        DataKind::Website => &[
            ("0", ""),
            ("1", "Homepage"),
            ("2", "Blog"),
            ("3", "Profile"),
            ("4", "Home"),
            ("5", "Work"),
            ("6", "FTP"),
            ("7", "Other"),
        ],
        _ => return None,
    };
    table.iter().find(|(c, _)| *c == code).map(|(_, l)| *l)
}

/// Display label for an IM protocol code (`data5`).
pub fn im_protocol_label(code: &str) -> Option<&'static str> {
    let table: &[(&str, &str)] = &[
        ("-1", ""),
        ("0", "AIM"),
        ("1", "MSN"),
        ("2", "Yahoo"),
        ("3", "Skype"),
        ("4", "QQ"),
        ("5", "Google Talk"),
        ("6", "ICQ"),
        ("7", "Jabber"),
        ("8", "Netmeeting"),
    ];
    table.iter().find(|(c, _)| *c == code).map(|(_, l)| *l)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(c, _)| *c == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_phone_row_resolves() {
        let registry = SchemaRegistry::new();
        let fields = registry
            .resolve(
                "vnd.android.cursor.item/phone_v2",
                columns(&[("data1", "555-1234"), ("data2", "2")]),
            )
            .unwrap();

        assert_eq!(
            fields,
            DatumFields::Phone(PhoneFields {
                number: Some("555-1234".to_string()),
                type_code: Some("2".to_string()),
                label: None,
            })
        );
        assert_eq!(fields.kind(), DataKind::Phone);
    }

    #[test]
    fn test_group_membership_uses_named_column() {
        let registry = SchemaRegistry::new();
        let fields = registry
            .resolve(
                "vnd.android.cursor.item/group_membership",
                columns(&[("data1", "7"), ("group_sourceid", "starred")]),
            )
            .unwrap();
        assert_eq!(
            fields,
            DatumFields::GroupMembership(GroupMembershipFields {
                row_id: Some("7".to_string()),
                source_id: Some("starred".to_string()),
            })
        );
    }

    #[test]
    fn test_third_party_resolution() {
        let mut registry = SchemaRegistry::new();
        registry.register_third_party(
            "vnd.com.example.messenger/handle".to_string(),
            ThirdPartySchema {
                summary_column: "data1".to_string(),
                detail_column: "data4".to_string(),
            },
        );

        let fields = registry
            .resolve(
                "vnd.com.example.messenger/handle",
                columns(&[("data1", "alice"), ("data4", "online")]),
            )
            .unwrap();
        assert_eq!(
            fields,
            DatumFields::ThirdParty(ThirdPartyFields {
                summary: Some("alice".to_string()),
                detail: Some("online".to_string()),
            })
        );
    }

    #[test]
    fn test_builtin_wins_over_third_party() {
        let mut registry = SchemaRegistry::new();
        registry.register_third_party(
            "vnd.android.cursor.item/phone_v2".to_string(),
            ThirdPartySchema {
                summary_column: "data3".to_string(),
                detail_column: "data3".to_string(),
            },
        );
        let fields = registry
            .resolve(
                "vnd.android.cursor.item/phone_v2",
                columns(&[("data1", "555")]),
            )
            .unwrap();
        assert_eq!(fields.kind(), DataKind::Phone);
    }

    #[test]
    fn test_unknown_mimetype_is_error() {
        let registry = SchemaRegistry::new();
        let err = registry
            .resolve("vnd.unheard.of/thing", columns(&[]))
            .unwrap_err();
        assert!(err.to_string().contains("vnd.unheard.of/thing"));
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(type_label(DataKind::Phone, "2"), Some("Mobile"));
        assert_eq!(type_label(DataKind::Phone, "16"), Some("TTY/TTD"));
        assert_eq!(type_label(DataKind::Email, "4"), Some("Mobile"));
        assert_eq!(type_label(DataKind::Event, "3"), Some("Birthday"));
        assert_eq!(type_label(DataKind::Address, "1"), Some("Home"));
        assert_eq!(type_label(DataKind::Phone, "99"), None);
        assert_eq!(type_label(DataKind::Note, "1"), None);
        assert_eq!(im_protocol_label("3"), Some("Skype"));
        assert_eq!(im_protocol_label("-1"), Some(""));
    }
}
