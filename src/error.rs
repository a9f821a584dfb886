//! Error taxonomy for the CPM engine.
//!
//! Grounded on `cellular_raza_concepts::errors`'s `define_errors!` macro: small message-carrying
//! structs rather than a `thiserror` enum.

use core::fmt::Display;
use std::error::Error;

macro_rules! define_errors {
    ($(($err_name: ident, $err_descr: expr)),+) => {
        $(
            #[doc = $err_descr]
            #[derive(Debug, Clone)]
            pub struct $err_name {
                #[doc = "Error message associated with this error."]
                pub message: String,
            }

            impl $err_name {
                /// Construct this error from anything that can be turned into a message.
                pub fn new(message: impl Into<String>) -> Self {
                    Self { message: message.into() }
                }
            }

            impl Display for $err_name {
                fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(f, "{}", self.message)
                }
            }

            impl Error for $err_name {}
        )+
    }
}

define_errors!(
    (ConfigError, "Raised when CLI arguments or a configuration record fail to parse"),
    (InvalidId, "Raised when a super-cell id is referenced that does not exist in the registry"),
    (TooSmall, "Raised when a division is attempted on a super-cell with at most one site"),
    (
        DivisionLandLocked,
        "Raised when a trophectoderm division finds no site with an empty-space neighbour"
    ),
    (
        NoFreeICMForCavity,
        "Raised when cavity seeding cannot find any ICM-labelled site after exhausting its search budget"
    )
);
