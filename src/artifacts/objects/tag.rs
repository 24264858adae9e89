//! Annotated tag object
//!
//! Only the target is kept: tags are peeled to the commit they point to
//! whenever a ref is resolved.

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    target: ObjectId,
    target_type: ObjectType,
}

impl Tag {
    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn target_type(&self) -> ObjectType {
        self.target_type
    }
}

impl Unpackable for Tag {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut target = None;
        let mut target_type = None;

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                break;
            }

            match line.split_once(' ') {
                Some(("object", oid)) => target = Some(ObjectId::try_parse(oid.to_string())?),
                Some(("type", kind)) => target_type = Some(ObjectType::try_from(kind)?),
                _ => {}
            }
        }

        Ok(Tag {
            target: target.context("Invalid tag object: missing object line")?,
            target_type: target_type.context("Invalid tag object: missing type line")?,
        })
    }
}
