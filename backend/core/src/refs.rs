//! Object references.
//!
//! Metadata objects are addressed either by identifier (optionally qualified by
//! object type) or by URI. Two refs are equal when their values are equal.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjRef {
    Identifier {
        identifier: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        object_type: Option<String>,
    },
    Uri {
        uri: String,
    },
}

impl ObjRef {
    pub fn id(identifier: impl Into<String>) -> Self {
        ObjRef::Identifier {
            identifier: identifier.into(),
            object_type: None,
        }
    }

    pub fn typed(identifier: impl Into<String>, object_type: impl Into<String>) -> Self {
        ObjRef::Identifier {
            identifier: identifier.into(),
            object_type: Some(object_type.into()),
        }
    }

    pub fn uri(uri: impl Into<String>) -> Self {
        ObjRef::Uri { uri: uri.into() }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjRef::Identifier {
                identifier,
                object_type: Some(t),
            } => write!(f, "{t}/{identifier}"),
            ObjRef::Identifier { identifier, .. } => f.write_str(identifier),
            ObjRef::Uri { uri } => f.write_str(uri),
        }
    }
}

/// Stable string key for a ref, used by slices keyed by object.
pub fn serialize_obj_ref(obj_ref: &ObjRef) -> String {
    match obj_ref {
        ObjRef::Identifier {
            identifier,
            object_type,
        } => format!("id:{}:{}", object_type.as_deref().unwrap_or(""), identifier),
        ObjRef::Uri { uri } => format!("uri:{uri}"),
    }
}
