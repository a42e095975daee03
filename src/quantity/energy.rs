use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Div, Mul},
};

use crate::quantity::{Quantity, cost::Cost, power::Megawatts, price::Price, time::Hours};

pub type MegawattHours = Quantity<1, 1, 0>;

impl Display for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} MWh", self.0)
    }
}

impl Debug for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}MWh", self.0)
    }
}

impl Div<Hours> for MegawattHours {
    type Output = Megawatts;

    fn div(self, rhs: Hours) -> Self::Output {
        assert!(rhs.0.is_finite() && rhs.0 > 0.0);
        Quantity(self.0 / rhs.0)
    }
}

impl Mul<Price> for MegawattHours {
    type Output = Cost;

    fn mul(self, rhs: Price) -> Self::Output {
        Quantity(self.0 * rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn power_energy_cost_chain() {
        let energy = Megawatts::from(2.5) * Hours::from(2.0);
        assert_abs_diff_eq!(energy.0, 5.0);
        assert_abs_diff_eq!((energy / Hours::from(2.0)).0, 2.5);
        let cost: Cost = energy * Price::from(40.0);
        assert_abs_diff_eq!(cost.0, 200.0);
    }
}
