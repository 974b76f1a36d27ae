//! String conversions for the small label enums stored in the database
//! (`Classification`, `RuleSource`, `SummaryKind`, `Role`).
//!
//! # Example
//!
//! ```rust
//! use focusledger_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Shade {
//!     Light,
//!     Dark,
//! }
//!
//! impl_label_conversions!(Shade {
//!     Light => "light",
//!     Dark => "dark",
//! });
//!
//! assert_eq!(Shade::Dark.as_str(), "dark");
//! assert_eq!(" LIGHT ".parse::<Shade>().unwrap(), Shade::Light);
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum.
///
/// Parsing trims surrounding whitespace, ignores case and treats `_` the
/// same as `-`, so `"NON_BILLABLE"` parses to the variant labelled
/// `"non-billable"`.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase label.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let label = s.trim().to_lowercase().replace('_', "-");
                match label.as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
