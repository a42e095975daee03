use average::Mean;

use crate::{
    core::{decision::Decision, point::Point},
    prelude::*,
    quantity::{Quantity, price::Price},
};

/// Executes energy trades only when the forecast shows a clear edge.
///
/// A discharge goes through when the forecast current price is at least `edge` above the horizon
/// mean, and a charge when it is at least `edge` below. Reserves are never filtered.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct EnergyEdge {
    pub edge: Price,
}

impl EnergyEdge {
    pub fn is_enabled(self) -> bool {
        self.edge.0 > 0.0
    }

    /// Suppressed flows execute as zero, and the solar meant for the battery is curtailed.
    pub fn apply(self, decision: Decision, path: &[Point]) -> Decision {
        if !self.is_enabled() {
            return decision;
        }
        let Some(now) = path.first().map(|point| point.prices.energy) else {
            return decision;
        };
        let mean = {
            let mean: Mean = path.iter().map(|point| point.prices.energy.0).collect();
            Price::from(mean.mean())
        };

        let mut decision = decision;
        if decision.discharge > Quantity::ZERO && now < mean + self.edge {
            debug!(%now, %mean, discharge = %decision.discharge, "suppressed the discharge");
            decision.discharge = Quantity::ZERO;
        }
        if decision.charge > Quantity::ZERO && now > mean - self.edge {
            debug!(%now, %mean, charge = %decision.charge, "suppressed the charge");
            decision.solar_curtailed += decision.solar_to_battery;
            decision.solar_to_battery = Quantity::ZERO;
            decision.grid_charge = Quantity::ZERO;
            decision.charge = Quantity::ZERO;
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::point::tests::path,
        quantity::{energy::MegawattHours, power::Megawatts},
    };

    fn charging() -> Decision {
        let mut decision = Decision::idle(0, MegawattHours::ZERO, Megawatts::from(3.0));
        decision.charge = Quantity(5.0);
        decision.grid_charge = Quantity(3.0);
        decision.solar_to_battery = Quantity(2.0);
        decision.solar_curtailed = Quantity(1.0);
        decision
    }

    fn discharging() -> Decision {
        let mut decision = Decision::idle(0, MegawattHours::ZERO, Megawatts::ZERO);
        decision.discharge = Quantity(4.0);
        decision
    }

    #[test]
    fn disabled_keeps_everything() {
        let path = path(0, &[(50.0, &[]), (10.0, &[])]);
        let filter = EnergyEdge { edge: Price::ZERO };
        assert_eq!(filter.apply(charging(), &path), charging());
    }

    #[test]
    fn charge_needs_a_low_price() {
        // Mean is 30, the current price of 10 is 20 below it:
        let path = path(0, &[(10.0, &[]), (50.0, &[])]);
        assert_eq!(EnergyEdge { edge: Price::from(15.0) }.apply(charging(), &path), charging());

        let suppressed = EnergyEdge { edge: Price::from(25.0) }.apply(charging(), &path);
        assert_eq!(suppressed.charge, Megawatts::ZERO);
        assert_eq!(suppressed.grid_charge, Megawatts::ZERO);
        assert_eq!(suppressed.solar_to_battery, Megawatts::ZERO);
        assert_eq!(suppressed.solar_curtailed, Megawatts::from(3.0));
        assert_eq!(suppressed.solar(), charging().solar());
    }

    #[test]
    fn discharge_needs_a_high_price() {
        let path = path(0, &[(50.0, &[]), (10.0, &[])]);
        assert_eq!(
            EnergyEdge { edge: Price::from(20.0) }.apply(discharging(), &path),
            discharging(),
        );
        let suppressed = EnergyEdge { edge: Price::from(20.1) }.apply(discharging(), &path);
        assert_eq!(suppressed.discharge, Megawatts::ZERO);
    }
}
