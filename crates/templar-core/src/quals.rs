//! Qualification and value-category metadata.
//!
//! Every use-site argument carries cv-qualification and a value category.
//! Forwarding parameters preserve both exactly; fixed-reference and by-value
//! parameters apply a fixed conversion instead (see the argument binder).

use std::fmt::{self, Display, Formatter};

use bitflags::bitflags;

bitflags! {
    /// cv-qualification of a type or argument.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Quals: u8 {
        const CONST    = 0b01;
        const VOLATILE = 0b10;
    }
}

impl Display for Quals {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if self.contains(Quals::CONST) {
            write!(f, "const")?;
            sep = " ";
        }
        if self.contains(Quals::VOLATILE) {
            write!(f, "{sep}volatile")?;
        }
        Ok(())
    }
}

/// Value category of a use-site argument.
///
/// Only the lvalue/rvalue distinction matters for binding; prvalues and
/// xvalues behave identically here and are both folded into [`Rvalue`].
///
/// [`Rvalue`]: ValueCategory::Rvalue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueCategory {
    /// A named object or reference-to-lvalue result.
    Lvalue,
    /// A temporary or moved-from value.
    #[default]
    Rvalue,
}

impl Display for ValueCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValueCategory::Lvalue => write!(f, "lvalue"),
            ValueCategory::Rvalue => write!(f, "rvalue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quals_display() {
        assert_eq!(Quals::CONST.to_string(), "const");
        assert_eq!((Quals::CONST | Quals::VOLATILE).to_string(), "const volatile");
        assert_eq!(Quals::empty().to_string(), "");
    }

    #[test]
    fn quals_subset() {
        assert!(Quals::CONST.contains(Quals::empty()));
        assert!((Quals::CONST | Quals::VOLATILE).contains(Quals::CONST));
        assert!(!Quals::CONST.contains(Quals::VOLATILE));
    }

    #[test]
    fn default_category_is_rvalue() {
        assert_eq!(ValueCategory::default(), ValueCategory::Rvalue);
    }
}
