use serde::ser::Serialize;

use crate::value::{List, Map};
use crate::{to_value, Error, Result, Value};

/// Collects `E::V(a, b)` into `{V: [a, b]}`.
pub struct SerializeTupleVariant {
    pub variant: &'static str,
    pub items: List<Value>,
}

/// Collects `E::V { a, b }` into `{V: {a: .., b: ..}}`.
pub struct SerializeStructVariant {
    pub variant: &'static str,
    pub fields: Map<String, Value>,
}

fn wrap(variant: &'static str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(variant.to_owned(), value);
    Value::Map(map)
}

impl serde::ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(wrap(self.variant, Value::List(self.items)))
    }
}

impl serde::ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.fields.insert(key.to_owned(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(wrap(self.variant, Value::Map(self.fields)))
    }
}
