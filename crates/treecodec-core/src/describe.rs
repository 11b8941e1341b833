//! Typed layer: Rust types that know their descriptor.
//!
//! [`Describe`] connects a Rust type to the dynamic engine. It is implemented
//! for the primitives, the standard collections and small tuples; user
//! records and enumerations get it from the [`record!`](crate::record) and
//! [`enumeration!`](crate::enumeration) macros.
//!
//! # Examples
//!
//! ```rust
//! use treecodec_core::{record, Codec};
//!
//! record! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Name {
//!         pub first: String,
//!         pub last: String,
//!         pub middle: Option<String> = None,
//!     }
//! }
//!
//! let codec = Codec::new();
//! let name = Name { first: "Ann".into(), last: "Lee".into(), middle: None };
//! let tree = codec.to_tree(&name).unwrap();
//! assert_eq!(tree.to_string(), r#"{"first":"Ann","last":"Lee"}"#);
//! assert_eq!(codec.from_tree::<Name>(&tree).unwrap(), name);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use indexmap::IndexMap;
use serde_json::Value;

use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::value::{Dynamic, EnumMember};

/// A Rust type with a descriptor and a lossless mapping to dynamic values.
pub trait Describe: Sized {
    fn descriptor() -> TypeDescriptor;

    fn to_dynamic(&self) -> Dynamic;

    fn from_dynamic(value: Dynamic) -> Result<Self>;
}

macro_rules! describe_int {
    ($($t:ty),*) => {
        $(
            impl Describe for $t {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::integer()
                }

                fn to_dynamic(&self) -> Dynamic {
                    Dynamic::Int(i64::from(*self))
                }

                fn from_dynamic(value: Dynamic) -> Result<Self> {
                    match value {
                        Dynamic::Int(i) => <$t>::try_from(i).map_err(|_| Error::Conversion {
                            expected: stringify!($t).to_string(),
                            found: format!("out of range integer {i}"),
                        }),
                        other => Err(other.conversion_error(stringify!($t))),
                    }
                }
            }
        )*
    };
}

describe_int!(i8, i16, i32, i64, u8, u16, u32);

impl Describe for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::float()
    }

    fn to_dynamic(&self) -> Dynamic {
        Dynamic::Float(*self)
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| value.conversion_error("f64"))
    }
}

impl Describe for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::float()
    }

    fn to_dynamic(&self) -> Dynamic {
        Dynamic::Float(f64::from(*self))
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        value
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| value.conversion_error("f32"))
    }
}

impl Describe for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::boolean()
    }

    fn to_dynamic(&self) -> Dynamic {
        Dynamic::Bool(*self)
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        value.as_bool().ok_or_else(|| value.conversion_error("bool"))
    }
}

impl Describe for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::text()
    }

    fn to_dynamic(&self) -> Dynamic {
        Dynamic::Text(self.clone())
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        match value {
            Dynamic::Text(s) => Ok(s),
            other => Err(other.conversion_error("String")),
        }
    }
}

impl<T: Describe> Describe for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional(T::descriptor())
    }

    fn to_dynamic(&self) -> Dynamic {
        self.as_ref().map_or(Dynamic::Null, T::to_dynamic)
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        match value {
            Dynamic::Null => Ok(None),
            other => T::from_dynamic(other).map(Some),
        }
    }
}

impl<T: Describe> Describe for Box<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }

    fn to_dynamic(&self) -> Dynamic {
        (**self).to_dynamic()
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        T::from_dynamic(value).map(Box::new)
    }
}

fn elements_of(value: Dynamic, expected: &str) -> Result<Vec<Dynamic>> {
    match value {
        Dynamic::Sequence(items) | Dynamic::Set(items) | Dynamic::Tuple(items) => Ok(items),
        other => Err(other.conversion_error(expected)),
    }
}

fn entries_of(value: Dynamic, expected: &str) -> Result<Vec<(Dynamic, Dynamic)>> {
    match value {
        Dynamic::Map(entries) => Ok(entries),
        other => Err(other.conversion_error(expected)),
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::sequence(T::descriptor())
    }

    fn to_dynamic(&self) -> Dynamic {
        Dynamic::Sequence(self.iter().map(T::to_dynamic).collect())
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        elements_of(value, "Vec")?
            .into_iter()
            .map(T::from_dynamic)
            .collect()
    }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::sequence(T::descriptor())
    }

    fn to_dynamic(&self) -> Dynamic {
        Dynamic::Sequence(self.iter().map(T::to_dynamic).collect())
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        elements_of(value, "VecDeque")?
            .into_iter()
            .map(T::from_dynamic)
            .collect()
    }
}

impl<T: Describe + Eq + Hash> Describe for HashSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::set(T::descriptor())
    }

    fn to_dynamic(&self) -> Dynamic {
        Dynamic::Set(self.iter().map(T::to_dynamic).collect())
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        elements_of(value, "HashSet")?
            .into_iter()
            .map(T::from_dynamic)
            .collect()
    }
}

impl<T: Describe + Ord> Describe for BTreeSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::set(T::descriptor())
    }

    fn to_dynamic(&self) -> Dynamic {
        Dynamic::Set(self.iter().map(T::to_dynamic).collect())
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        elements_of(value, "BTreeSet")?
            .into_iter()
            .map(T::from_dynamic)
            .collect()
    }
}

macro_rules! describe_map {
    ($map:ident, $name:literal, $($bound:path),+) => {
        impl<K, V> Describe for $map<K, V>
        where
            K: Describe $(+ $bound)+,
            V: Describe,
        {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::mapping(K::descriptor(), V::descriptor())
            }

            fn to_dynamic(&self) -> Dynamic {
                Dynamic::Map(
                    self.iter()
                        .map(|(k, v)| (k.to_dynamic(), v.to_dynamic()))
                        .collect(),
                )
            }

            fn from_dynamic(value: Dynamic) -> Result<Self> {
                entries_of(value, $name)?
                    .into_iter()
                    .map(|(k, v)| Ok((K::from_dynamic(k)?, V::from_dynamic(v)?)))
                    .collect()
            }
        }
    };
}

describe_map!(HashMap, "HashMap", Eq, Hash);
describe_map!(BTreeMap, "BTreeMap", Ord);
describe_map!(IndexMap, "IndexMap", Eq, Hash);

macro_rules! describe_tuple {
    ($len:literal; $($name:ident : $idx:tt),+) => {
        impl<$($name: Describe),+> Describe for ($($name,)+) {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::tuple(vec![$($name::descriptor()),+])
            }

            fn to_dynamic(&self) -> Dynamic {
                Dynamic::Tuple(vec![$(self.$idx.to_dynamic()),+])
            }

            fn from_dynamic(value: Dynamic) -> Result<Self> {
                match value {
                    Dynamic::Tuple(items) | Dynamic::Sequence(items) if items.len() == $len => {
                        let mut items = items.into_iter();
                        Ok(($($name::from_dynamic(items.next().unwrap_or(Dynamic::Null))?,)+))
                    }
                    other => Err(other.conversion_error(&Self::descriptor().type_name())),
                }
            }
        }
    };
}

describe_tuple!(1; A: 0);
describe_tuple!(2; A: 0, B: 1);
describe_tuple!(3; A: 0, B: 1, C: 2);
describe_tuple!(4; A: 0, B: 1, C: 2, D: 3);

/// Untyped JSON: described as `Any`.
impl Describe for Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::any()
    }

    fn to_dynamic(&self) -> Dynamic {
        Dynamic::from_tree(self)
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        crate::ser::serialize(&value, None, false)
    }
}

impl Describe for Dynamic {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::any()
    }

    fn to_dynamic(&self) -> Dynamic {
        self.clone()
    }

    fn from_dynamic(value: Dynamic) -> Result<Self> {
        Ok(value)
    }
}

/// Declare a record struct together with its [`Describe`] impl.
///
/// Fields may carry a default after `=`; it is used when the field is
/// missing from the tree.
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(= $default:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Describe for $name {
            fn descriptor() -> $crate::TypeDescriptor {
                let def = $crate::RecordType::new(stringify!($name))
                    $(
                        .field_with_default(
                            stringify!($field),
                            <$ty as $crate::Describe>::descriptor(),
                            $crate::__field_default!($ty $(, $default)?),
                        )
                    )*;
                $crate::TypeDescriptor::record(::std::sync::Arc::new(def))
            }

            fn to_dynamic(&self) -> $crate::Dynamic {
                $crate::Dynamic::Record(
                    $crate::DynamicRecord::new(stringify!($name))
                        $(.with(stringify!($field), $crate::Describe::to_dynamic(&self.$field)))*
                )
            }

            #[allow(unused_mut)]
            fn from_dynamic(value: $crate::Dynamic) -> $crate::Result<Self> {
                let mut record = value.into_record(stringify!($name))?;
                Ok($name {
                    $($field: record.take_as::<$ty>(stringify!($field))?,)*
                })
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __field_default {
    ($ty:ty) => {
        ::core::option::Option::None
    };
    ($ty:ty, $default:expr) => {{
        let default: $ty = $default;
        ::core::option::Option::Some(<$ty as $crate::Describe>::to_dynamic(&default))
    }};
}

/// Declare a fieldless enum together with its [`Describe`] impl.
///
/// Each variant may carry a member value after `=` (anything convertible
/// into a [`Dynamic`](crate::Dynamic), including opaque values). A variant
/// without one takes its own name as text. Trees always carry the member
/// name, never the value.
#[macro_export]
macro_rules! enumeration {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident $(= $value:expr)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($variant,)*
        }

        impl $crate::Describe for $name {
            fn descriptor() -> $crate::TypeDescriptor {
                let def = $crate::EnumType::new(stringify!($name))
                    $(.member(stringify!($variant), $crate::__member_value!($variant $(, $value)?)))*;
                $crate::TypeDescriptor::enumeration(::std::sync::Arc::new(def))
            }

            fn to_dynamic(&self) -> $crate::Dynamic {
                let member = match self {
                    $($name::$variant => stringify!($variant),)*
                };
                $crate::describe::__enum_member(Self::descriptor(), member)
            }

            fn from_dynamic(value: $crate::Dynamic) -> $crate::Result<Self> {
                let member = value.into_enum_member(stringify!($name))?;
                match member.name() {
                    $(n if n == stringify!($variant) => Ok($name::$variant),)*
                    other => Err($crate::Error::Conversion {
                        expected: stringify!($name).to_string(),
                        found: format!("member '{other}'"),
                    }),
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __member_value {
    ($variant:ident) => {
        $crate::Dynamic::Text(stringify!($variant).to_string())
    };
    ($variant:ident, $value:expr) => {
        $crate::Dynamic::from($value)
    };
}

#[doc(hidden)]
pub fn __enum_member(descriptor: TypeDescriptor, name: &str) -> Dynamic {
    match descriptor {
        TypeDescriptor::Enumeration(def) => {
            EnumMember::new(def, name).map_or(Dynamic::Null, Dynamic::Enum)
        }
        _ => Dynamic::Null,
    }
}
