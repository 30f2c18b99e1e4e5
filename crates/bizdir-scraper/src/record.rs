use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::fields::{Field, FieldSet};
use crate::jsonld::text_value;

/// One row of output, holding only the selected fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BusinessRecord(BTreeMap<Field, Option<String>>);

impl BusinessRecord {
    /// Projects a business entity onto the selected fields.
    pub fn project(entity: &Value, fields: &FieldSet, source_url: &str) -> Self {
        let postal = address(entity);

        let values = fields
            .iter()
            .map(|field| {
                let value = match field {
                    Field::SourceUrl => Some(source_url.to_string()),
                    f if f.in_address() => postal
                        .and_then(|a| a.get(f.as_str()))
                        .and_then(text_value),
                    f => entity.get(f.as_str()).and_then(text_value),
                };
                (field, value)
            })
            .collect();

        Self(values)
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).and_then(|v| v.as_deref())
    }

    /// Cells in column order, absent values are empty.
    pub fn row<'a>(&'a self, fields: &'a FieldSet) -> impl Iterator<Item = &'a str> + 'a {
        fields.iter().map(|f| self.get(f).unwrap_or_default())
    }
}

/// The entity's postal address, the first one when several are given.
fn address(entity: &Value) -> Option<&Value> {
    match entity.get("address")? {
        address @ Value::Object(_) => Some(address),
        Value::Array(addresses) => addresses.iter().find(|a| a.is_object()),
        _ => None,
    }
}
