use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Price of one megawatt-hour of energy, or of one megawatt of reserve held for one hour.
pub type Price = Quantity<{ -1 }, { -1 }, 1>;

impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} $/MWh", self.0)
    }
}

impl Debug for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}$/MWh", self.0)
    }
}
