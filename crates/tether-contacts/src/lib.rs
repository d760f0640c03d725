// Schema-driven normalization of the phone's raw contact tables into a
// structured, typed in-memory graph, plus the derived per-contact views
// the UI layer consumes.

pub mod model;
pub mod name;
pub mod normalize;
pub mod schema;
pub mod views;

pub use model::{Contact, ContactDatum, ContactGraph, ContactsPayload, RawContact};
pub use name::{from_short_name, to_display_name, to_short_name};
pub use normalize::{normalize, NormalizedContacts};
pub use schema::{DataKind, DatumFields, SchemaRegistry, StructuredName, ThirdPartySchema};
pub use views::{contact_details, ContactDetails};
