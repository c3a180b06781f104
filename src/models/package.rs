use async_graphql::{Enum, SimpleObject};
use serde::{Deserialize, Serialize};

/// The longest term a single registration or payment can cover.
pub const MAX_MONTHS: i32 = 120;

/// The membership tiers the gym sells
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Enum, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "package_tier", rename_all = "snake_case")]
pub enum PackageTier {
    /// Gym floor access
    Basic,
    /// Gym floor and group classes
    Standard,
    /// Everything in standard plus the pool and sauna
    Premium,
    /// Everything, plus personal training sessions
    Elite,
}

impl PackageTier {
    pub const ALL: [PackageTier; 4] = [
        PackageTier::Basic,
        PackageTier::Standard,
        PackageTier::Premium,
        PackageTier::Elite,
    ];

    pub fn monthly_price(self) -> i64 {
        match self {
            PackageTier::Basic => 30,
            PackageTier::Standard => 50,
            PackageTier::Premium => 80,
            PackageTier::Elite => 120,
        }
    }

    pub fn price_for(self, months: i32) -> i64 {
        self.monthly_price() * i64::from(months)
    }

    pub fn name(self) -> &'static str {
        match self {
            PackageTier::Basic => "Basic",
            PackageTier::Standard => "Standard",
            PackageTier::Premium => "Premium",
            PackageTier::Elite => "Elite",
        }
    }

    fn description(self) -> &'static str {
        match self {
            PackageTier::Basic => "Gym floor access during staffed hours",
            PackageTier::Standard => "Gym floor access and all group classes",
            PackageTier::Premium => "Standard access plus pool and sauna",
            PackageTier::Elite => "Premium access plus weekly personal training",
        }
    }
}

#[derive(SimpleObject)]
pub struct Package {
    /// Which tier this is
    pub tier: PackageTier,
    /// The display name of the package
    pub name: String,
    /// What the package includes
    pub description: String,
    /// The fixed price per month
    pub monthly_price: i64,
}

impl Package {
    pub fn all() -> Vec<Self> {
        PackageTier::ALL.iter().copied().map(Self::from).collect()
    }
}

impl From<PackageTier> for Package {
    fn from(tier: PackageTier) -> Self {
        Self {
            tier,
            name: tier.name().to_owned(),
            description: tier.description().to_owned(),
            monthly_price: tier.monthly_price(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_scales_with_months() {
        assert_eq!(PackageTier::Basic.price_for(1), 30);
        assert_eq!(PackageTier::Premium.price_for(6), 480);
    }

    #[test]
    fn tiers_are_listed_cheapest_first() {
        let prices: Vec<i64> = Package::all().iter().map(|p| p.monthly_price).collect();
        let mut sorted = prices.clone();
        sorted.sort();

        assert_eq!(prices.len(), 4);
        assert_eq!(prices, sorted);
    }
}
