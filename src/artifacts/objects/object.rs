use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use bytes::Bytes;
use std::io::{BufRead, Cursor};

pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

/// An object as stored in the database: its type and inflated content (header stripped)
#[derive(Debug, Clone)]
pub struct RawObject {
    pub object_type: ObjectType,
    pub content: Bytes,
}

impl RawObject {
    pub fn new(object_type: ObjectType, content: Bytes) -> Self {
        RawObject {
            object_type,
            content,
        }
    }

    pub fn reader(&self) -> impl BufRead + '_ {
        Cursor::new(&self.content[..])
    }

    pub fn parse<T: Unpackable>(&self) -> Result<T> {
        T::deserialize(self.reader())
    }
}
