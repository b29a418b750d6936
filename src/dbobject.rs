//! Oracle database object type support
//!
//! This module provides types for Oracle user-defined types (UDTs), including:
//! - Object types (CREATE TYPE)
//! - Collection types (VARRAY, nested tables)
//! - PL/SQL index-by tables
//!
//! Object instances own their attribute and element values. Nested objects
//! and LOB attributes are stored inline, so reading one through a
//! [`Context`](crate::Context) hands out an independent copy.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use oracle_vars::{DbObject, DbObjectAttr, DbObjectType, AttrValue, OracleType};
//!
//! let mut emp_type = DbObjectType::new("HR", "EMPLOYEE_TYPE");
//! emp_type.add_attribute(DbObjectAttr::new("ID", OracleType::Number));
//! emp_type.add_attribute(DbObjectAttr::new("NAME", OracleType::Varchar).with_max_size(100));
//!
//! let mut obj = DbObject::new(Arc::new(emp_type));
//! obj.set("ID", AttrValue::Int64(7)).unwrap();
//! obj.set("name", AttrValue::from("John")).unwrap();
//! assert!(matches!(obj.get("ID").unwrap(), AttrValue::Int64(7)));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use indexmap::IndexMap;

use crate::constants::{NativeType, OracleType};
use crate::error::{Error, Result};
use crate::types::{encode_oracle_number, IntervalDs, IntervalYm, Lob, Timestamp};

/// Collection type for Oracle collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionType {
    /// PL/SQL index-by table
    PlsqlIndexTable,
    /// Nested table
    NestedTable,
    /// VARRAY
    Varray,
}

/// An attribute of a database object type
#[derive(Debug, Clone)]
pub struct DbObjectAttr {
    /// Attribute name
    pub name: String,
    /// Oracle data type
    pub oracle_type: OracleType,
    /// Maximum size in bytes (for strings/raw), 0 for unbounded
    pub max_size: u32,
    /// Precision (for numbers)
    pub precision: u8,
    /// Scale (for numbers)
    pub scale: i8,
    /// Whether the attribute is nullable
    pub nullable: bool,
    /// Nested object type (for object attributes)
    pub object_type: Option<Arc<DbObjectType>>,
}

impl DbObjectAttr {
    /// Create a new attribute
    pub fn new(name: impl Into<String>, oracle_type: OracleType) -> Self {
        Self {
            name: name.into(),
            oracle_type,
            max_size: 0,
            precision: 0,
            scale: 0,
            nullable: true,
            object_type: None,
        }
    }

    /// Set maximum size
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size;
        self
    }

    /// Set precision and scale
    pub fn with_precision(mut self, precision: u8, scale: i8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Set as not nullable
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set nested object type
    pub fn with_object_type(mut self, object_type: Arc<DbObjectType>) -> Self {
        self.object_type = Some(object_type);
        self
    }
}

/// A database object type definition
#[derive(Debug, Clone)]
pub struct DbObjectType {
    /// Schema name
    pub schema: String,
    /// Type name
    pub name: String,
    /// Package name (for PL/SQL types)
    pub package_name: Option<String>,
    /// Collection type (if this is a collection)
    pub collection_type: Option<CollectionType>,
    /// Element type for collections
    pub element_type: Option<OracleType>,
    /// Element object type for collections of objects
    pub element_object_type: Option<Arc<DbObjectType>>,
    /// Maximum number of elements (VARRAY)
    pub max_elements: Option<u32>,
    /// Attributes (for object types)
    pub attributes: Vec<DbObjectAttr>,
}

impl DbObjectType {
    /// Create a new object type
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            package_name: None,
            collection_type: None,
            element_type: None,
            element_object_type: None,
            max_elements: None,
            attributes: Vec::new(),
        }
    }

    /// Create a collection type
    pub fn collection(
        schema: impl Into<String>,
        name: impl Into<String>,
        collection_type: CollectionType,
        element_type: OracleType,
    ) -> Self {
        let mut t = Self::new(schema, name);
        t.collection_type = Some(collection_type);
        t.element_type = Some(element_type);
        t
    }

    /// Limit the number of elements (VARRAY)
    pub fn with_max_elements(mut self, max: u32) -> Self {
        self.max_elements = Some(max);
        self
    }

    /// Check if this is a collection type
    pub fn is_collection(&self) -> bool {
        self.collection_type.is_some()
    }

    /// Get the fully qualified name
    pub fn full_name(&self) -> String {
        if let Some(ref pkg) = self.package_name {
            format!("{}.{}.{}", self.schema, pkg, self.name)
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    /// Add an attribute
    pub fn add_attribute(&mut self, attr: DbObjectAttr) {
        self.attributes.push(attr);
    }

    /// Get an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&DbObjectAttr> {
        self.attributes.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Get the number of attributes
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}

/// Value of an object attribute or collection element
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum AttrValue {
    Null,
    Int64(i64),
    Uint64(u64),
    Float(f32),
    Double(f64),
    Bytes(Bytes),
    Timestamp(Timestamp),
    IntervalDs(IntervalDs),
    IntervalYm(IntervalYm),
    Boolean(bool),
    Lob(Lob),
    Object(Box<DbObject>),
}

impl AttrValue {
    /// Native type of the value, or `None` for null
    pub fn native_type(&self) -> Option<NativeType> {
        Some(match self {
            AttrValue::Null => return None,
            AttrValue::Int64(_) => NativeType::Int64,
            AttrValue::Uint64(_) => NativeType::Uint64,
            AttrValue::Float(_) => NativeType::Float,
            AttrValue::Double(_) => NativeType::Double,
            AttrValue::Bytes(_) => NativeType::Bytes,
            AttrValue::Timestamp(_) => NativeType::Timestamp,
            AttrValue::IntervalDs(_) => NativeType::IntervalDs,
            AttrValue::IntervalYm(_) => NativeType::IntervalYm,
            AttrValue::Boolean(_) => NativeType::Boolean,
            AttrValue::Lob(_) => NativeType::Lob,
            AttrValue::Object(_) => NativeType::Object,
        })
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Validate the value against the declared type of an attribute or element
    fn check(&self, oracle_type: OracleType, max_size: u32, object_type: Option<&DbObjectType>) -> Result<()> {
        let Some(native) = self.native_type() else {
            return Ok(());
        };
        if !oracle_type.accepts(native) {
            return Err(Error::UnhandledConversion {
                oracle_type,
                native_type: native,
            });
        }
        match self {
            AttrValue::Bytes(b) if oracle_type == OracleType::Number => {
                let text = std::str::from_utf8(b)
                    .map_err(|_| Error::InvalidNumber(String::from_utf8_lossy(b).into_owned()))?;
                encode_oracle_number(text)?;
            }
            AttrValue::Bytes(b) if max_size > 0 && b.len() > max_size as usize => {
                return Err(Error::BufferTooSmall {
                    needed: b.len(),
                    capacity: max_size as usize,
                });
            }
            AttrValue::Lob(lob) if lob.oracle_type() != oracle_type => {
                return Err(Error::UnhandledConversion {
                    oracle_type,
                    native_type: native,
                });
            }
            AttrValue::Object(obj) => {
                if let Some(expected) = object_type {
                    if obj.object_type().full_name() != expected.full_name() {
                        return Err(Error::WrongAttribute {
                            attribute: obj.object_type().full_name(),
                            type_name: expected.full_name(),
                        });
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Bytes(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int64(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Double(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Boolean(v)
    }
}

impl From<Timestamp> for AttrValue {
    fn from(v: Timestamp) -> Self {
        AttrValue::Timestamp(v)
    }
}

impl From<DbObject> for AttrValue {
    fn from(v: DbObject) -> Self {
        AttrValue::Object(Box::new(v))
    }
}

/// An instance of a database object or collection
#[derive(Debug, Clone, PartialEq)]
pub struct DbObject {
    object_type: Arc<DbObjectType>,
    attributes: IndexMap<String, AttrValue>,
    elements: BTreeMap<i32, AttrValue>,
}

impl PartialEq for DbObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.full_name() == other.full_name()
    }
}

impl DbObject {
    /// Create a new object instance with every attribute null
    pub fn new(object_type: Arc<DbObjectType>) -> Self {
        let attributes = object_type
            .attributes
            .iter()
            .map(|a| (a.name.to_uppercase(), AttrValue::Null))
            .collect();
        Self {
            object_type,
            attributes,
            elements: BTreeMap::new(),
        }
    }

    /// The object's type
    pub fn object_type(&self) -> &Arc<DbObjectType> {
        &self.object_type
    }

    fn not_collection(&self) -> Error {
        Error::NotCollection(self.object_type.full_name())
    }

    fn element_type(&self) -> Result<OracleType> {
        self.object_type
            .element_type
            .filter(|_| self.object_type.is_collection())
            .ok_or_else(|| self.not_collection())
    }

    fn check_element(&self, value: &AttrValue) -> Result<()> {
        let element_type = self.element_type()?;
        value.check(element_type, 0, self.object_type.element_object_type.as_deref())
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Set an attribute value
    pub fn set(&mut self, name: &str, value: AttrValue) -> Result<()> {
        let attr = self.object_type.attribute(name).ok_or_else(|| Error::WrongAttribute {
            attribute: name.to_string(),
            type_name: self.object_type.full_name(),
        })?;
        value.check(attr.oracle_type, attr.max_size, attr.object_type.as_deref())?;
        self.attributes.insert(attr.name.to_uppercase(), value);
        Ok(())
    }

    /// Get an attribute value
    pub fn get(&self, name: &str) -> Result<&AttrValue> {
        self.attributes
            .get(&name.to_uppercase())
            .ok_or_else(|| Error::WrongAttribute {
                attribute: name.to_string(),
                type_name: self.object_type.full_name(),
            })
    }

    /// Iterate over attribute names and values in declaration order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Append an element after the last index
    pub fn append_element(&mut self, value: AttrValue) -> Result<()> {
        self.check_element(&value)?;
        if let Some(max) = self.object_type.max_elements {
            if self.elements.len() as u32 >= max {
                return Err(Error::ElementCountTooLarge {
                    count: self.elements.len() as u32 + 1,
                    max,
                });
            }
        }
        let index = self.elements.keys().next_back().map(|i| i + 1).unwrap_or(0);
        self.elements.insert(index, value);
        Ok(())
    }

    /// Get the element at an index
    pub fn get_element(&self, index: i32) -> Result<&AttrValue> {
        self.element_type()?;
        self.elements
            .get(&index)
            .ok_or(Error::InvalidIndex(index as i64))
    }

    /// Replace the element at an index
    ///
    /// PL/SQL index-by tables accept any index; other collections only
    /// replace existing elements.
    pub fn set_element(&mut self, index: i32, value: AttrValue) -> Result<()> {
        self.check_element(&value)?;
        let sparse = self.object_type.collection_type == Some(CollectionType::PlsqlIndexTable);
        if !sparse && !self.elements.contains_key(&index) {
            return Err(Error::InvalidIndex(index as i64));
        }
        self.elements.insert(index, value);
        Ok(())
    }

    /// Delete the element at an index, leaving a gap
    pub fn delete_element(&mut self, index: i32) -> Result<()> {
        self.element_type()?;
        if self.object_type.collection_type == Some(CollectionType::Varray) {
            return Err(Error::NotSupported(
                "elements cannot be deleted from a VARRAY".to_string(),
            ));
        }
        self.elements
            .remove(&index)
            .map(|_| ())
            .ok_or(Error::InvalidIndex(index as i64))
    }

    /// Check if an element exists at an index
    pub fn element_exists(&self, index: i32) -> Result<bool> {
        self.element_type()?;
        Ok(self.elements.contains_key(&index))
    }

    /// First index in use
    pub fn first_index(&self) -> Result<Option<i32>> {
        self.element_type()?;
        Ok(self.elements.keys().next().copied())
    }

    /// Last index in use
    pub fn last_index(&self) -> Result<Option<i32>> {
        self.element_type()?;
        Ok(self.elements.keys().next_back().copied())
    }

    /// Index following `index`
    pub fn next_index(&self, index: i32) -> Result<Option<i32>> {
        self.element_type()?;
        Ok(self.elements.range(index.saturating_add(1)..).next().map(|(i, _)| *i))
    }

    /// Index preceding `index`
    pub fn prev_index(&self, index: i32) -> Result<Option<i32>> {
        self.element_type()?;
        Ok(self.elements.range(..index).next_back().map(|(i, _)| *i))
    }

    /// Number of elements in the collection
    pub fn size(&self) -> Result<u32> {
        self.element_type()?;
        Ok(self.elements.len() as u32)
    }

    /// Remove `count` elements from the end of the collection
    pub fn trim(&mut self, count: u32) -> Result<()> {
        self.element_type()?;
        if count as usize > self.elements.len() {
            return Err(Error::InvalidIndex(count as i64));
        }
        for _ in 0..count {
            self.elements.pop_last();
        }
        Ok(())
    }

    /// Iterate over index/element pairs in index order
    pub fn elements(&self) -> impl Iterator<Item = (i32, &AttrValue)> {
        self.elements.iter().map(|(i, v)| (*i, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee_type() -> Arc<DbObjectType> {
        let mut obj_type = DbObjectType::new("HR", "EMPLOYEE_TYPE");
        obj_type.add_attribute(DbObjectAttr::new("ID", OracleType::Number));
        obj_type.add_attribute(DbObjectAttr::new("NAME", OracleType::Varchar).with_max_size(10));
        obj_type.add_attribute(DbObjectAttr::new("HIRED", OracleType::Date));
        Arc::new(obj_type)
    }

    fn number_table(kind: CollectionType) -> Arc<DbObjectType> {
        Arc::new(DbObjectType::collection("HR", "NUMBER_LIST", kind, OracleType::Number))
    }

    #[test]
    fn test_object_type_with_attributes() {
        let obj_type = employee_type();
        assert_eq!(obj_type.full_name(), "HR.EMPLOYEE_TYPE");
        assert_eq!(obj_type.attribute_count(), 3);
        assert!(obj_type.attribute("name").is_some());
        assert!(!obj_type.is_collection());
    }

    #[test]
    fn test_object_attributes() {
        let mut obj = DbObject::new(employee_type());
        assert!(obj.get("ID").unwrap().is_null());
        obj.set("id", AttrValue::Int64(123)).unwrap();
        obj.set("NAME", AttrValue::from("John")).unwrap();
        assert_eq!(obj.get("ID").unwrap(), &AttrValue::Int64(123));
        let names: Vec<&str> = obj.attributes().map(|(n, _)| n).collect();
        assert_eq!(names, ["ID", "NAME", "HIRED"]);
    }

    #[test]
    fn test_wrong_attribute() {
        let mut obj = DbObject::new(employee_type());
        assert!(matches!(
            obj.set("SALARY", AttrValue::Int64(1)),
            Err(Error::WrongAttribute { .. })
        ));
        assert!(obj.get("SALARY").is_err());
    }

    #[test]
    fn test_attribute_type_checks() {
        let mut obj = DbObject::new(employee_type());
        assert!(matches!(
            obj.set("HIRED", AttrValue::Int64(1)),
            Err(Error::UnhandledConversion { .. })
        ));
        assert!(matches!(
            obj.set("NAME", AttrValue::from("much too long")),
            Err(Error::BufferTooSmall { .. })
        ));
        assert!(matches!(
            obj.set("ID", AttrValue::from("1.2.3")),
            Err(Error::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_collection_on_plain_object_fails() {
        let mut obj = DbObject::new(employee_type());
        assert!(matches!(
            obj.append_element(AttrValue::Int64(1)),
            Err(Error::NotCollection(_))
        ));
        assert!(matches!(obj.size(), Err(Error::NotCollection(_))));
    }

    #[test]
    fn test_sparse_nested_table() {
        let mut coll = DbObject::new(number_table(CollectionType::NestedTable));
        for i in 0..4 {
            coll.append_element(AttrValue::Int64(i * 10)).unwrap();
        }
        coll.delete_element(1).unwrap();
        assert_eq!(coll.size().unwrap(), 3);
        assert!(!coll.element_exists(1).unwrap());
        assert_eq!(coll.first_index().unwrap(), Some(0));
        assert_eq!(coll.next_index(0).unwrap(), Some(2));
        assert_eq!(coll.prev_index(2).unwrap(), Some(0));
        assert_eq!(coll.last_index().unwrap(), Some(3));
        assert_eq!(coll.next_index(3).unwrap(), None);
        assert!(matches!(coll.get_element(1), Err(Error::InvalidIndex(1))));
        assert!(matches!(coll.set_element(1, AttrValue::Int64(5)), Err(Error::InvalidIndex(1))));
        coll.trim(2).unwrap();
        assert_eq!(coll.last_index().unwrap(), Some(0));
        assert!(coll.trim(5).is_err());
    }

    #[test]
    fn test_index_table_accepts_any_index() {
        let mut coll = DbObject::new(number_table(CollectionType::PlsqlIndexTable));
        coll.set_element(-5, AttrValue::Int64(1)).unwrap();
        coll.set_element(100, AttrValue::Int64(2)).unwrap();
        assert_eq!(coll.first_index().unwrap(), Some(-5));
        coll.append_element(AttrValue::Int64(3)).unwrap();
        assert_eq!(coll.last_index().unwrap(), Some(101));
    }

    #[test]
    fn test_varray_limits() {
        let t = DbObjectType::collection("HR", "NUMS", CollectionType::Varray, OracleType::Number)
            .with_max_elements(2);
        let mut coll = DbObject::new(Arc::new(t));
        coll.append_element(AttrValue::Int64(1)).unwrap();
        coll.append_element(AttrValue::Null).unwrap();
        assert!(matches!(
            coll.append_element(AttrValue::Int64(3)),
            Err(Error::ElementCountTooLarge { count: 3, max: 2 })
        ));
        assert!(matches!(coll.delete_element(0), Err(Error::NotSupported(_))));
    }
}
