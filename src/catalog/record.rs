use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A single product, either freshly scraped or loaded from the catalog
///
/// `id` is the identity key. Records without one are kept in the raw scrape
/// snapshot but can never be merged into the catalog.
///
/// Keys the crawler does not know about (`brand`, `stock`, `category`, ...)
/// are carried in `extra` so that rewriting the catalog never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<u64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reads `null` as the field's default value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `7`, `"7"` or `null`; anything else, and `0`, is treated as no id
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(id.filter(|id| *id != 0))
}

/// Accepts `12.5`, `"12,50"` or `null`
fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    })
}

/// The product catalog: records in file order, at most one per id
///
/// Serializes as a plain JSON array. Records without an id are kept where
/// they are but are invisible to lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<ProductRecord>,
    index: HashMap<u64, usize>,
}

impl Catalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a list of records
    ///
    /// When an id appears more than once the later record replaces the
    /// earlier one in the earlier one's position.
    pub fn from_records(records: Vec<ProductRecord>) -> Self {
        let mut catalog = Self::new();
        for record in records {
            match record.id.and_then(|id| catalog.index.get(&id).copied()) {
                Some(pos) => {
                    tracing::debug!("Duplicate catalog id {:?}, keeping the later entry", record.id);
                    catalog.records[pos] = record;
                }
                None => catalog.push(record),
            }
        }
        catalog
    }

    /// Number of records, including records without an id
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the catalog holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true if a record with this id exists
    pub fn contains(&self, id: u64) -> bool {
        self.index.contains_key(&id)
    }

    /// Looks up a record by id
    pub fn get(&self, id: u64) -> Option<&ProductRecord> {
        self.index.get(&id).map(|&pos| &self.records[pos])
    }

    /// Looks up a record by id for in-place updates
    pub fn get_mut(&mut self, id: u64) -> Option<&mut ProductRecord> {
        let pos = *self.index.get(&id)?;
        self.records.get_mut(pos)
    }

    /// Appends a record whose id is not in the catalog yet
    ///
    /// Returns false, leaving the catalog untouched, if the record has no id
    /// or its id is already present.
    pub fn insert(&mut self, record: ProductRecord) -> bool {
        match record.id {
            Some(id) if !self.contains(id) => {
                self.push(record);
                true
            }
            _ => false,
        }
    }

    /// All records in catalog order
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    /// Consumes the catalog, returning its records in order
    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }

    fn push(&mut self, record: ProductRecord) {
        if let Some(id) = record.id {
            self.index.insert(id, self.records.len());
        }
        self.records.push(record);
    }
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<ProductRecord>::deserialize(deserializer).map(Self::from_records)
    }
}
