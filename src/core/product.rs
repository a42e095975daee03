use std::{
    fmt::{Display, Formatter},
    ops::{Index, IndexMut},
    str::FromStr,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{prelude::*, quantity::price::Price};

/// Which energy headroom a reserve commitment consumes when activated.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Activation discharges the battery, so the energy must already be stored.
    Up,

    /// Activation charges the battery, so there must be room left for the energy.
    Down,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Ancillary reserve product, paid for committed capacity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reserve {
    pub name: String,
    pub direction: Direction,
}

impl FromStr for Reserve {
    type Err = Error;

    /// Parse `<name>:<up|down>`, for example `RegUp:up`.
    fn from_str(s: &str) -> Result<Self> {
        let (name, direction) =
            s.split_once(':').with_context(|| format!("expected `<name>:<up|down>`, got `{s}`"))?;
        let name = name.trim();
        ensure!(!name.is_empty(), "empty reserve product name in `{s}`");
        let direction = match direction.trim().to_ascii_lowercase().as_str() {
            "up" => Direction::Up,
            "down" => Direction::Down,
            other => bail!("unknown reserve direction `{other}` in `{s}`"),
        };
        Ok(Self { name: name.to_string(), direction })
    }
}

/// Product handle, valid for the [`ProductSet`] it came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Product {
    Energy,

    /// Index into [`ProductSet::reserves`].
    Reserve(usize),
}

impl Product {
    /// Position in [`ProductSet::iter`], the energy product first.
    pub const fn index(self) -> usize {
        match self {
            Self::Energy => 0,
            Self::Reserve(index) => index + 1,
        }
    }
}

/// The energy product and the ancillary reserves, fixed for a run.
#[must_use]
#[derive(Clone, Debug)]
pub struct ProductSet {
    pub energy: String,
    pub reserves: Vec<Reserve>,
}

impl ProductSet {
    pub fn validate(&self) -> Result {
        ensure!(!self.energy.trim().is_empty(), "the energy product name is empty");
        let duplicates = self
            .names()
            .counts()
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name)
            .sorted()
            .collect_vec();
        ensure!(duplicates.is_empty(), "duplicate products: {}", duplicates.join(", "));
        Ok(())
    }

    pub const fn len(&self) -> usize {
        self.reserves.len() + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = Product> + use<> {
        std::iter::once(Product::Energy).chain((0..self.reserves.len()).map(Product::Reserve))
    }

    pub fn name(&self, product: Product) -> &str {
        match product {
            Product::Energy => &self.energy,
            Product::Reserve(index) => &self.reserves[index].name,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|product| self.name(product))
    }

    pub fn reserve_products(&self) -> impl Iterator<Item = Product> + use<> {
        (0..self.reserves.len()).map(Product::Reserve)
    }
}

/// Price of every product in one time step.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Prices {
    pub energy: Price,

    /// Aligned with [`ProductSet::reserves`].
    pub reserves: Vec<Price>,
}

impl Prices {
    pub fn zeros(n_reserves: usize) -> Self {
        Self { energy: Price::ZERO, reserves: vec![Price::ZERO; n_reserves] }
    }

    #[cfg(test)]
    pub fn map(&self, f: impl Fn(Price) -> Price) -> Self {
        Self { energy: f(self.energy), reserves: self.reserves.iter().copied().map(f).collect() }
    }
}

impl Index<Product> for Prices {
    type Output = Price;

    fn index(&self, product: Product) -> &Self::Output {
        match product {
            Product::Energy => &self.energy,
            Product::Reserve(index) => &self.reserves[index],
        }
    }
}

impl IndexMut<Product> for Prices {
    fn index_mut(&mut self, product: Product) -> &mut Self::Output {
        match product {
            Product::Energy => &mut self.energy,
            Product::Reserve(index) => &mut self.reserves[index],
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Energy plus a single up-type reserve.
    pub fn single_reserve() -> ProductSet {
        ProductSet {
            energy: "SP15".to_string(),
            reserves: vec![Reserve { name: "RegUp".to_string(), direction: Direction::Up }],
        }
    }

    pub fn caiso() -> ProductSet {
        ProductSet {
            energy: "SP15".to_string(),
            reserves: vec![
                "RegUp:up".parse().unwrap(),
                "RegDown:down".parse().unwrap(),
                "Spin:up".parse().unwrap(),
                "NonSpin:up".parse().unwrap(),
            ],
        }
    }

    #[test]
    fn parse_reserve() {
        let reserve: Reserve = "RegDown:Down".parse().unwrap();
        assert_eq!(reserve.name, "RegDown");
        assert_eq!(reserve.direction, Direction::Down);
    }

    #[test]
    fn parse_reserve_errors() {
        assert!("RegDown".parse::<Reserve>().is_err());
        assert!(":up".parse::<Reserve>().is_err());
        assert!("RegDown:sideways".parse::<Reserve>().is_err());
    }

    #[test]
    fn iterate_products() {
        let products = caiso();
        assert_eq!(products.len(), 5);
        assert_eq!(
            products.names().collect_vec(),
            ["SP15", "RegUp", "RegDown", "Spin", "NonSpin"],
        );
        assert_eq!(products.reserve_products().count(), 4);
    }

    #[test]
    fn reject_duplicates() {
        let mut products = caiso();
        products.reserves.push("Spin:up".parse().unwrap());
        assert!(products.validate().is_err());
        assert!(caiso().validate().is_ok());
    }

    #[test]
    fn index_prices() {
        let mut prices = Prices::zeros(2);
        prices[Product::Reserve(1)] = Price::from(7.0);
        prices[Product::Energy] = Price::from(30.0);
        assert_eq!(prices.reserves, [Price::ZERO, Price::from(7.0)]);
        assert_eq!(prices[Product::Energy], Price::from(30.0));
    }
}
