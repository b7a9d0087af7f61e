//! Explicit gun schema and the validator that consults it.
//!
//! Each [`FieldDescriptor`] names a dotted path into a [`FieldBag`], the kind
//! of value expected there, and whether it must be present. A required
//! nested field is only required when its parent section is present, so
//! `general.rate` is checked only for documents that carry a `general` bag.
//! Fields not named here are ignored.

use crate::field_bag::{FieldBag, Value};
use crate::gun::GunConfig;
use crate::id::EntityId;
use crate::loader::DraftRecord;

// ===========================================================================
// Errors
// ===========================================================================

/// Reasons a draft fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field is absent or has the wrong type.
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// An optional field is present with the wrong type.
    #[error("field '{field}' should be {expected}, found {found}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A field has the right type but an unacceptable value.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

// ===========================================================================
// Descriptors
// ===========================================================================

/// The kind of value a field must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    /// Accepts integers as well.
    Float,
    Str,
    /// A string that parses as an [`EntityId`].
    Id,
    /// A string drawn from a fixed set of literals.
    Enum(&'static [&'static str]),
    Bag,
    /// A list whose elements are all strings.
    StrList,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Str => "string",
            FieldKind::Id => "id",
            FieldKind::Enum(_) => "enum",
            FieldKind::Bag => "bag",
            FieldKind::StrList => "string list",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Bool => matches!(value, Value::Bool(_)),
            FieldKind::Int => matches!(value, Value::Int(_)),
            FieldKind::Float => matches!(value, Value::Int(_) | Value::Float(_)),
            FieldKind::Str | FieldKind::Id | FieldKind::Enum(_) => matches!(value, Value::Str(_)),
            FieldKind::Bag => matches!(value, Value::Bag(_)),
            FieldKind::StrList => value
                .as_list()
                .is_some_and(|items| items.iter().all(|v| matches!(v, Value::Str(_)))),
        }
    }
}

/// One entry of a schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub path: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn required(path: &'static str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor {
        path,
        kind,
        required: true,
    }
}

const fn optional(path: &'static str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor {
        path,
        kind,
        required: false,
    }
}

/// Literal grip type names accepted by `general.gripType`.
pub const GRIP_TYPES: &[&str] = &["one_handed", "two_handed", "mini_gun", "bazooka"];

/// Schema for a gun document. Parents are listed before their children.
pub const GUN_SCHEMA: &[FieldDescriptor] = &[
    required("damage", FieldKind::Float),
    optional("reloadSpeed", FieldKind::Int),
    optional("attachments", FieldKind::StrList),
    optional("general", FieldKind::Bag),
    optional("general.auto", FieldKind::Bool),
    required("general.rate", FieldKind::Int),
    optional("general.gripType", FieldKind::Enum(GRIP_TYPES)),
    optional("general.maxAmmo", FieldKind::Int),
    optional("general.reloadAmount", FieldKind::Int),
    optional("general.recoilAngle", FieldKind::Float),
    optional("general.recoilKick", FieldKind::Float),
    optional("general.spread", FieldKind::Float),
    optional("general.projectileAmount", FieldKind::Int),
    optional("general.alwaysSpread", FieldKind::Bool),
    optional("projectile", FieldKind::Bag),
    required("projectile.item", FieldKind::Id),
    optional("projectile.size", FieldKind::Float),
    optional("projectile.speed", FieldKind::Float),
    optional("projectile.life", FieldKind::Int),
    optional("projectile.gravity", FieldKind::Bool),
    optional("projectile.damageReduceOverLife", FieldKind::Bool),
    optional("projectile.visible", FieldKind::Bool),
    optional("sounds", FieldKind::Bag),
    optional("sounds.fire", FieldKind::Id),
    optional("sounds.reload", FieldKind::Id),
    optional("sounds.cock", FieldKind::Id),
    optional("display", FieldKind::Bag),
    optional("display.flash", FieldKind::Bag),
    required("display.flash.size", FieldKind::Float),
];

// ===========================================================================
// Checking
// ===========================================================================

/// Check a bag against a schema. Returns the first violation found, in
/// descriptor order.
pub fn check(bag: &FieldBag, schema: &[FieldDescriptor]) -> Result<(), ValidationError> {
    for desc in schema {
        // A nested field only applies when its parent is a present bag.
        if let Some((parent, _)) = desc.path.rsplit_once('.') {
            if !matches!(bag.get_path(parent), Some(Value::Bag(_))) {
                continue;
            }
        }

        let Some(value) = bag.get_path(desc.path) else {
            if desc.required {
                return Err(ValidationError::MissingField(desc.path.to_string()));
            }
            continue;
        };

        if !desc.kind.accepts(value) {
            if desc.required {
                return Err(ValidationError::MissingField(desc.path.to_string()));
            }
            return Err(ValidationError::WrongType {
                field: desc.path.to_string(),
                expected: desc.kind.name(),
                found: value.kind_name(),
            });
        }

        check_value(desc, value)?;
    }
    Ok(())
}

fn check_value(desc: &FieldDescriptor, value: &Value) -> Result<(), ValidationError> {
    match (desc.kind, value) {
        (FieldKind::Id, Value::Str(s)) => s.parse::<EntityId>().map(|_| ()).map_err(|e| {
            ValidationError::InvalidValue {
                field: desc.path.to_string(),
                reason: e.to_string(),
            }
        }),
        (FieldKind::Enum(allowed), Value::Str(s)) if !allowed.contains(&s.as_str()) => {
            Err(ValidationError::InvalidValue {
                field: desc.path.to_string(),
                reason: format!("'{s}' is not one of {allowed:?}"),
            })
        }
        _ => Ok(()),
    }
}

/// Validate a draft and reconstruct the gun it describes.
pub fn validate(draft: &DraftRecord) -> Result<GunConfig, ValidationError> {
    GunConfig::from_bag(&draft.bag)
}
