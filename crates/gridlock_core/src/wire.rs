//! Byte-sized enums shared by rows, actions and data files.
//!
//! Stored rows need every enum to occupy exactly one byte, while RON data
//! files and the JSON protocol read better with variant names. The
//! [`wire_enum!`] macro derives a serde representation that picks between
//! the two based on `is_human_readable`.

use thiserror::Error;

/// A byte or name that does not map to any variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} discriminant {value}")]
pub struct UnknownVariant {
    /// Name of the enum being decoded.
    pub kind: &'static str,
    /// The rejected value, rendered for display.
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(u8)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )+
        }

        impl $name {
            /// Every variant in discriminant order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Variant name as written in data files.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }

            /// Look a variant up by name.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($variant) => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = $crate::wire::UnknownVariant;

            fn try_from(value: u8) -> ::std::result::Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err($crate::wire::UnknownVariant {
                        kind: stringify!($name),
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(
                &self,
                serializer: S,
            ) -> ::std::result::Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(self.name())
                } else {
                    serializer.serialize_u8(u8::from(*self))
                }
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(
                deserializer: D,
            ) -> ::std::result::Result<Self, D::Error> {
                use ::serde::de::Error as _;
                if deserializer.is_human_readable() {
                    let name = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                    Self::from_name(&name).ok_or_else(|| {
                        D::Error::custom($crate::wire::UnknownVariant {
                            kind: stringify!($name),
                            value: name,
                        })
                    })
                } else {
                    let byte = <u8 as ::serde::Deserialize>::deserialize(deserializer)?;
                    Self::try_from(byte).map_err(D::Error::custom)
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    wire_enum! {
        /// Test enum.
        pub enum Shade {
            #[default]
            Light = 0,
            Dark = 3,
        }
    }

    #[test]
    fn test_byte_round_trip() {
        assert_eq!(u8::from(Shade::Dark), 3);
        assert_eq!(Shade::try_from(3), Ok(Shade::Dark));
        assert!(Shade::try_from(1).is_err());
    }

    #[test]
    fn test_binary_form_is_one_byte() {
        let bytes = bincode::serialize(&Shade::Dark).unwrap();
        assert_eq!(bytes, vec![3]);
    }

    #[test]
    fn test_text_form_is_name() {
        let text = ron::to_string(&Shade::Dark).unwrap();
        assert_eq!(text, "\"Dark\"");
        let back: Shade = ron::from_str("\"Light\"").unwrap();
        assert_eq!(back, Shade::Light);
    }
}
